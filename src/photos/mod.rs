//! Photo storage: paired web/download artifacts on the filesystem.
//!
//! Every upload yields two files sharing one base name,
//! `photo_<millis>_<rand6>.webp` (web copy, quality 85) and
//! `photo_<millis>_<rand6>.jpg` (download copy, quality 90). The
//! directory itself is the index: listings enumerate it directly.

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Extension of the compressed in-browser copy.
pub const WEB_EXT: &str = "webp";
/// Extension of the higher-fidelity bulk-download copy.
pub const DOWNLOAD_EXT: &str = "jpg";

const WEB_QUALITY: f32 = 85.0;
const DOWNLOAD_QUALITY: u8 = 90;

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("invalid photo name: {0}")]
    InvalidName(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type PhotoResult<T> = Result<T, PhotoError>;

/// A photo's web-format listing entry.
#[derive(Debug, Clone)]
pub struct PhotoEntry {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Filesystem-backed photo store over a single directory.
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    /// Open a store over the given directory, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Enumerate web-format files, newest first by modification time.
    /// Any enumeration error logs and yields an empty listing.
    pub fn list(&self) -> Vec<PhotoEntry> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("photo directory read error: {}", e);
                return Vec::new();
            }
        };

        let mut photos = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if Path::new(&name).extension() != Some(OsStr::new(WEB_EXT)) {
                continue;
            }
            let created_at = entry
                .metadata()
                .and_then(|m| m.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            photos.push(PhotoEntry { name, created_at });
        }

        photos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        photos
    }

    /// Transcode an uploaded image into its artifact pair and write
    /// both files. Returns the web copy's file name.
    pub fn save(&self, data: &[u8]) -> PhotoResult<String> {
        let image = image::load_from_memory(data)?;
        // JPEG has no alpha channel, and the webp encoder wants raw
        // RGB anyway, so flatten once up front.
        let rgb = image.to_rgb8();

        let base = generate_base_name();
        let web_name = format!("{}.{}", base, WEB_EXT);
        let download_name = format!("{}.{}", base, DOWNLOAD_EXT);

        let encoded =
            webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()).encode(WEB_QUALITY);
        fs::write(self.dir.join(&web_name), &*encoded)?;

        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, DOWNLOAD_QUALITY))?;
        fs::write(self.dir.join(&download_name), &jpeg)?;

        Ok(web_name)
    }

    /// Delete a photo by its web-format name, removing the paired
    /// download copy as well. A missing file (or pair) is not an
    /// error, so deletes are idempotent.
    pub fn delete(&self, name: &str) -> PhotoResult<()> {
        validate_name(name)?;

        let web = self.dir.join(name);
        let download = web.with_extension(DOWNLOAD_EXT);

        for path in [web, download] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Enumerate the download-format files. Propagates the error so
    /// the caller can fail before any response bytes are produced.
    pub fn download_names(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if Path::new(&name).extension() == Some(OsStr::new(DOWNLOAD_EXT)) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Assemble a zip of the named download files into an anonymous
    /// temp file and rewind it for streaming. The archive never lives
    /// in memory.
    pub fn zip_archive(&self, names: &[String]) -> PhotoResult<File> {
        let file = tempfile::tempfile()?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(9));

        for name in names {
            zip.start_file(name.clone(), options)?;
            let mut source = File::open(self.dir.join(name))?;
            io::copy(&mut source, &mut zip)?;
        }

        let mut file = zip.finish()?;
        file.seek(SeekFrom::Start(0))?;
        Ok(file)
    }
}

fn generate_base_name() -> String {
    let timestamp = Utc::now().timestamp_millis();
    let token: String = Uuid::new_v4().simple().to_string().chars().take(6).collect();
    format!("photo_{}_{}", timestamp, token)
}

/// Photo names come straight from the URL; refuse anything that could
/// escape the storage directory.
fn validate_name(name: &str) -> PhotoResult<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(PhotoError::InvalidName(name.to_string()));
    }
    Ok(())
}
