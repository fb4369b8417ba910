//! Read-through cache for query results.
//!
//! Entries are stored as JSON, carry a lifetime bucket, and are indexed by
//! tag so a mutation can drop every cached query touching an entity.
//! Invalidation is best effort: a load racing with an invalidation may
//! repopulate a stale value until its lifetime runs out.

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Lifetime bucket for a cached query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLife {
    Minutes,
    Hours,
    Weeks,
}

impl CacheLife {
    pub fn ttl(self) -> Duration {
        match self {
            Self::Minutes => Duration::from_secs(60),
            Self::Hours => Duration::from_secs(60 * 60),
            Self::Weeks => Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

/// Tag names shared by readers and writers.
pub mod tags {
    pub const BUSINESSES: &str = "businesses";
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const PLANS: &str = "plans";

    pub fn business(id: i32) -> String {
        format!("business:{id}")
    }

    pub fn product(id: i32) -> String {
        format!("product:{id}")
    }

    pub fn user(id: i32) -> String {
        format!("user:{id}")
    }
}

struct Entry {
    value: serde_json::Value,
    expires_at: Instant,
}

pub struct QueryCache {
    enabled: bool,
    entries: DashMap<String, Entry>,
    tags: DashMap<String, HashSet<String>>,
}

impl QueryCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: DashMap::new(),
            tags: DashMap::new(),
        }
    }

    /// Return the cached value for `key`, or run `load` and cache its result.
    ///
    /// Errors from `load` are returned as-is and never cached.
    pub async fn get_or_load<T, E, F, Fut>(
        &self,
        key: &str,
        tags: &[String],
        life: CacheLife,
        load: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_load_for(key, tags, life.ttl(), load).await
    }

    async fn get_or_load_for<T, E, F, Fut>(
        &self,
        key: &str,
        tags: &[String],
        ttl: Duration,
        load: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.enabled {
            return load().await;
        }

        if let Some(hit) = self.get(key) {
            debug!(key, "cache hit");
            return Ok(hit);
        }

        let value = load().await?;
        self.insert(key, tags, ttl, &value);
        Ok(value)
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let lookup = {
            let entry = self.entries.get(key)?;
            if Instant::now() >= entry.expires_at {
                None
            } else {
                Some(entry.value.clone())
            }
        };

        let Some(value) = lookup else {
            self.entries.remove(key);
            return None;
        };

        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "Dropping undecodable cache entry");
                self.entries.remove(key);
                None
            }
        }
    }

    fn insert<T: Serialize>(&self, key: &str, tags: &[String], ttl: Duration, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "Skipping cache insert for unserializable value");
                return;
            }
        };

        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        for tag in tags {
            self.tags
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }
    }

    /// Drop every entry tagged with `tag`. Returns the number of entries removed.
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let Some((_, keys)) = self.tags.remove(tag) else {
            return 0;
        };
        let removed = keys
            .iter()
            .filter(|key| self.entries.remove(key.as_str()).is_some())
            .count();
        debug!(tag, removed, "cache tag invalidated");
        removed
    }

    pub fn invalidate_tags<S: AsRef<str>>(&self, tags: &[S]) {
        for tag in tags {
            self.invalidate_tag(tag.as_ref());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
