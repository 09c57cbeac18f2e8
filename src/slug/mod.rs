//! Slug generation: display name -> URL-safe identifier.
//!
//! Transliterates Cyrillic letters to Latin, then normalizes to
//! `[a-z0-9-]`. Deterministic; uniqueness is enforced by the guest
//! store, not here.

/// Cyrillic to Latin transliteration table. Ukrainian letters plus the
/// Russian-only ones that show up in mixed guest lists. Soft and hard
/// signs map to nothing.
const TRANSLIT: &[(char, &str)] = &[
    ('а', "a"),
    ('б', "b"),
    ('в', "v"),
    ('г', "h"),
    ('ґ', "g"),
    ('д', "d"),
    ('е', "e"),
    ('є', "ie"),
    ('ж', "zh"),
    ('з', "z"),
    ('и', "y"),
    ('і', "i"),
    ('ї', "i"),
    ('й', "i"),
    ('к', "k"),
    ('л', "l"),
    ('м', "m"),
    ('н', "n"),
    ('о', "o"),
    ('п', "p"),
    ('р', "r"),
    ('с', "s"),
    ('т', "t"),
    ('у', "u"),
    ('ф', "f"),
    ('х', "kh"),
    ('ц', "ts"),
    ('ч', "ch"),
    ('ш', "sh"),
    ('щ', "shch"),
    ('ь', ""),
    ('ъ', ""),
    ('э', "e"),
    ('ю', "iu"),
    ('я', "ia"),
    ('ё', "io"),
];

fn transliterate(ch: char) -> Option<&'static str> {
    TRANSLIT
        .iter()
        .find(|(from, _)| *from == ch)
        .map(|(_, to)| *to)
}

/// Derive a URL-safe slug from a display name.
///
/// Lowercases, transliterates each character through [`TRANSLIT`]
/// (unmapped characters pass through), drops everything outside
/// `[a-z0-9\s-]`, turns whitespace runs into single hyphens, collapses
/// repeated hyphens and trims hyphens from both ends.
pub fn slugify(name: &str) -> String {
    let mut mapped = String::with_capacity(name.len());
    for ch in name.trim().to_lowercase().chars() {
        match transliterate(ch) {
            Some(latin) => mapped.push_str(latin),
            None => mapped.push(ch),
        }
    }

    let mut slug = String::with_capacity(mapped.len());
    for ch in mapped.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '-' {
            if !slug.ends_with('-') {
                slug.push('-');
            }
        }
        // everything else is dropped
    }

    slug.trim_matches('-').to_string()
}
