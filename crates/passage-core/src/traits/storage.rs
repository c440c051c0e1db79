//! Client-side key/value storage trait.

use async_trait::async_trait;

use crate::Result;

/// Persistent key/value storage reachable from the client.
///
/// In a browser this is local storage; the CLI uses a JSON file; tests use
/// [`MemoryStorage`](crate::MemoryStorage).
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
