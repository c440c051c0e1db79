//! File-backed session persistence for the CLI.

pub mod storage;

use std::sync::Arc;

use anyhow::Result;

use passage_core::SessionStore;

use crate::cli::Target;

pub use storage::FileStorage;

/// Open the session store for `target`.
pub fn open_store(target: &Target) -> Result<SessionStore> {
    let storage = match &target.session_file {
        Some(path) => FileStorage::new(path.clone()),
        None => FileStorage::default_location()?,
    };
    Ok(SessionStore::new(Arc::new(storage)))
}
