//! Session entries stored as a JSON object in a single file.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use directories::ProjectDirs;
use fs2::FileExt;
use tracing::{debug, trace};

use passage_core::{ClientStorage, Error, Result};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

type Entries = BTreeMap<String, String>;

/// [`ClientStorage`] over a JSON file.
///
/// Mutations take an exclusive lock on a sibling `.lock` file so two CLI
/// processes never interleave a read-modify-write. The file is written with
/// owner-only permissions on Unix.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `session.json` in the user data directory.
    pub fn default_location() -> anyhow::Result<Self> {
        let dirs = ProjectDirs::from("", "", "passage")
            .context("Could not determine data directory")?;
        Ok(Self::new(dirs.data_dir().join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn read_entries(&self) -> io::Result<Entries> {
        match fs::read_to_string(&self.path) {
            Ok(json) if json.trim().is_empty() => Ok(Entries::new()),
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e),
        }
    }

    fn write_entries(&self, entries: &Entries) -> io::Result<()> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            };
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json)?;

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&tmp)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&tmp, perms)?;
        }

        fs::rename(&tmp, &self.path)
    }

    /// Run `f` over the entries with the lock held, then persist them.
    fn update(&self, f: impl FnOnce(&mut Entries)) -> io::Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock.lock_exclusive()?;

        let result = self.read_entries().and_then(|mut entries| {
            f(&mut entries);
            self.write_entries(&entries)
        });

        lock.unlock()?;
        result
    }
}

#[async_trait]
impl ClientStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        trace!(key, path = %self.path.display(), "Reading session entry");
        let entries = self.read_entries().map_err(Error::storage)?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!(key, "Writing session entry");
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
        .map_err(Error::storage)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
        .map_err(Error::storage)
    }
}
