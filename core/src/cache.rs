//! In-memory TTL cache for GET responses.
//!
//! Entries are evicted oldest-insertion first once `max_entries` is reached.
//! Expired entries are dropped lazily when looked up.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::CacheConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub enabled: bool,
    pub size: usize,
    pub max_entries: usize,
    pub ttl: Duration,
}

#[derive(Debug)]
struct Entry {
    value: Value,
    stored_at: Instant,
}

#[derive(Debug)]
pub struct ResponseCache {
    config: CacheConfig,
    entries: HashMap<String, Entry>,
    order: VecDeque<String>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: String, value: Value) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.config.enabled,
            size: self.entries.len(),
            max_entries: self.config.max_entries,
            ttl: self.config.ttl,
        }
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<Value> {
        if !self.config.enabled {
            return None;
        }
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => now.duration_since(entry.stored_at) > self.config.ttl,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    fn insert_at(&mut self, key: String, value: Value, now: Instant) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }
        if self.entries.contains_key(&key) {
            self.remove(&key);
        }
        while self.entries.len() >= self.config.max_entries {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: now,
            },
        );
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.order.retain(|k| k != key);
    }
}
