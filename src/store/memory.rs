//! In-process [`KeyValue`] implementation with lazy expiry.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::KeyValue;

enum Entry {
    Value(String),
    Set(HashSet<String>),
}

struct Stored {
    entry: Entry,
    expires_at: Option<Instant>,
}

impl Stored {
    fn live(&self) -> bool {
        self.expires_at.is_none_or(|at| Instant::now() < at)
    }
}

/// Development and test store. Keys never change type in this domain, so a
/// plain-value write over a set (or the reverse) simply replaces the entry.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Stored>>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValue for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(stored) if !stored.live() => {
                entries.remove(key);
                Ok(None)
            }
            Some(Stored {
                entry: Entry::Value(value),
                ..
            }) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Stored {
                entry: Entry::Value(value.to_string()),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Stored {
                entry: Entry::Value(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        Ok(())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, stored| stored.live());
        let matched = entries
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect();
        Ok(matched)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(stored) if !stored.live() => {
                entries.remove(key);
                Ok(Vec::new())
            }
            Some(Stored {
                entry: Entry::Set(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            _ => Ok(Vec::new()),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        match entries.get_mut(key) {
            Some(Stored {
                entry: Entry::Set(members),
                ..
            }) => {
                members.insert(member.to_string());
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    Stored {
                        entry: Entry::Set(HashSet::from([member.to_string()])),
                        expires_at: None,
                    },
                );
            }
        }
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if let Some(Stored {
            entry: Entry::Set(members),
            ..
        }) = entries.get_mut(key)
        {
            members.remove(member);
        }
        Ok(())
    }
}

/// Glob with at most one `*`, which is all the key shapes here ever need.
fn glob_match(pattern: &str, key: &str) -> bool {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            key.len() >= prefix.len() + suffix.len()
                && key.starts_with(prefix)
                && key.ends_with(suffix)
        }
        None => pattern == key,
    }
}
