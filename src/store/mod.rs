use chrono::Utc;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::models::{Guest, Settings};
use crate::slug::slugify;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("slug already exists: {0}")]
    Conflict(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence backend for a single JSON document.
///
/// `load` returns `Ok(None)` when the document does not exist yet.
/// `store` must replace the whole document atomically.
pub trait DocumentBackend: Send + Sync {
    fn load(&self) -> io::Result<Option<Vec<u8>>>;
    fn store(&self, bytes: &[u8]) -> io::Result<()>;
}

/// File-backed document. Writes go to a temp file in the same
/// directory and are renamed over the target, so readers never see a
/// half-written document.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentBackend for FileBackend {
    fn load(&self) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, bytes: &[u8]) -> io::Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-memory document for tests.
#[derive(Default)]
pub struct MemoryBackend {
    doc: Mutex<Option<Vec<u8>>>,
}

impl DocumentBackend for MemoryBackend {
    fn load(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.doc.lock().unwrap().clone())
    }

    fn store(&self, bytes: &[u8]) -> io::Result<()> {
        *self.doc.lock().unwrap() = Some(bytes.to_vec());
        Ok(())
    }
}

/// Guest collection, stored as one JSON array document.
///
/// Every mutation reads the full collection, applies the change and
/// rewrites the whole document under the store's mutex, so concurrent
/// requests cannot lose each other's updates.
pub struct GuestStore {
    backend: Box<dyn DocumentBackend>,
    lock: Mutex<()>,
}

impl GuestStore {
    /// Create a file-backed store at the given document path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_backend(Box::new(FileBackend::new(path)))
    }

    /// Create an in-memory store for testing.
    pub fn in_memory() -> Self {
        Self::with_backend(Box::<MemoryBackend>::default())
    }

    pub fn with_backend(backend: Box<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            lock: Mutex::new(()),
        }
    }

    /// Read and parse the collection. An unreadable or unparsable
    /// document logs and yields an empty collection; callers are never
    /// failed by a bad read.
    fn load(&self) -> Vec<Guest> {
        match self.backend.load() {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(guests) => guests,
                Err(e) => {
                    log::error!("guest document parse error: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                log::error!("guest document read error: {}", e);
                Vec::new()
            }
        }
    }

    fn persist(&self, guests: &[Guest]) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(guests)?;
        self.backend.store(&json)?;
        Ok(())
    }

    pub fn list(&self) -> Vec<Guest> {
        let _guard = self.lock.lock().unwrap();
        self.load()
    }

    pub fn find_by_slug(&self, slug: &str) -> Option<Guest> {
        self.list().into_iter().find(|g| g.slug == slug)
    }

    /// Add a guest. The slug is derived from the name; a duplicate
    /// slug rejects the whole operation without touching the document.
    pub fn create(&self, name: &str, phone: Option<String>) -> StoreResult<Guest> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Validation("name required".to_string()));
        }

        let _guard = self.lock.lock().unwrap();
        let mut guests = self.load();

        let slug = slugify(name);
        if guests.iter().any(|g| g.slug == slug) {
            return Err(StoreError::Conflict(slug));
        }

        let id = guests.iter().map(|g| g.id).max().map_or(1, |max| max + 1);
        let guest = Guest {
            id,
            name: name.to_string(),
            slug,
            phone: phone.unwrap_or_default(),
            confirmed: false,
            confirmed_at: None,
        };

        guests.push(guest.clone());
        self.persist(&guests)?;
        Ok(guest)
    }

    /// Update a guest's phone number. An empty or absent phone is a
    /// no-op rather than a clear.
    pub fn update_phone(&self, slug: &str, phone: Option<String>) -> StoreResult<Guest> {
        let _guard = self.lock.lock().unwrap();
        let mut guests = self.load();

        let guest = guests
            .iter_mut()
            .find(|g| g.slug == slug)
            .ok_or_else(|| StoreError::NotFound(format!("guest {}", slug)))?;

        if let Some(phone) = phone.filter(|p| !p.is_empty()) {
            guest.phone = phone;
        }
        let updated = guest.clone();

        self.persist(&guests)?;
        Ok(updated)
    }

    pub fn delete(&self, slug: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut guests = self.load();

        let index = guests
            .iter()
            .position(|g| g.slug == slug)
            .ok_or_else(|| StoreError::NotFound(format!("guest {}", slug)))?;

        guests.remove(index);
        self.persist(&guests)?;
        Ok(())
    }

    /// Mark a guest as confirmed with the current timestamp. An
    /// unknown slug fails before anything is written.
    pub fn confirm_rsvp(&self, slug: &str) -> StoreResult<Guest> {
        let _guard = self.lock.lock().unwrap();
        let mut guests = self.load();

        let guest = guests
            .iter_mut()
            .find(|g| g.slug == slug)
            .ok_or_else(|| StoreError::NotFound(format!("guest {}", slug)))?;

        guest.confirmed = true;
        guest.confirmed_at = Some(Utc::now());
        let confirmed = guest.clone();

        self.persist(&guests)?;
        Ok(confirmed)
    }
}

/// Settings singleton, stored as one JSON object document.
pub struct SettingsStore {
    backend: Box<dyn DocumentBackend>,
    lock: Mutex<()>,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_backend(Box::new(FileBackend::new(path)))
    }

    pub fn in_memory() -> Self {
        Self::with_backend(Box::<MemoryBackend>::default())
    }

    pub fn with_backend(backend: Box<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Settings {
        match self.backend.load() {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("settings document parse error: {}", e);
                    Settings::default()
                }
            },
            Ok(None) => Settings::default(),
            Err(e) => {
                log::warn!("settings document read error: {}", e);
                Settings::default()
            }
        }
    }

    /// Current settings; falls back to defaults on any read failure.
    pub fn get(&self) -> Settings {
        let _guard = self.lock.lock().unwrap();
        self.load()
    }

    /// Merge the recognized fields into the current document and
    /// persist the whole merged document.
    pub fn update(&self, photos_enabled: Option<bool>) -> StoreResult<Settings> {
        let _guard = self.lock.lock().unwrap();
        let mut settings = self.load();

        if let Some(enabled) = photos_enabled {
            settings.photos_enabled = enabled;
        }

        let json = serde_json::to_vec_pretty(&settings)?;
        self.backend.store(&json)?;
        Ok(settings)
    }
}
