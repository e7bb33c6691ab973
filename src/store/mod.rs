//! External key-value store seam.
//!
//! The production deployment talks to a Redis-compatible server over the
//! network; everything in this crate reaches it through the [`KeyValue`]
//! trait so local development and tests run against [`MemoryKv`] instead.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

mod memory;

pub use memory::MemoryKv;

/// String-keyed store with per-key expiry and unordered string sets.
///
/// Values are JSON documents or plain strings; callers own the
/// (de)serialization. The store offers no multi-key transactions, so
/// multi-key mutations order their writes with the gating key last on
/// create and first on delete.
#[async_trait]
pub trait KeyValue: Send + Sync {
    /// Fetch a value, `None` when the key is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value without expiry, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Store a value that disappears after `ttl`.
    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    async fn del(&self, key: &str) -> Result<()>;

    /// List keys matching a glob pattern with at most one `*`.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// All members of a set, empty when the key is absent.
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    /// Add a member to a set, creating the set if needed. Idempotent.
    async fn sadd(&self, key: &str, member: &str) -> Result<()>;

    /// Remove a member from a set. Idempotent.
    async fn srem(&self, key: &str, member: &str) -> Result<()>;
}
