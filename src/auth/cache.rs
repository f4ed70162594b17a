//! Token validation cache.
//!
//! # Responsibilities
//! - Remember positive validations until their (capped) expiry
//! - Remember provider rejections briefly so replayed bad tokens do not
//!   hammer the introspection endpoint
//! - Evict the least recently used entry under capacity pressure
//!
//! # Design Decisions
//! - Keys are SHA-256 hashes of the raw token; the token itself is never
//!   stored or logged
//! - An expired entry is a miss, not a cached failure: it is removed on
//!   read and the caller re-validates remotely

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::auth::claims::Claims;

/// Cache key for a raw bearer token.
pub fn token_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// The result of a cache lookup.
#[derive(Debug)]
pub enum CacheOutcome {
    /// A live positive entry.
    Valid(Claims),
    /// A live negative entry: the provider rejected this token recently.
    Rejected,
    /// Nothing usable cached.
    Miss,
}

#[derive(Debug)]
struct CacheEntry {
    /// None marks a negative entry.
    claims: Option<Claims>,
    /// Unix timestamp (seconds) after which the entry is dead.
    expires_at: u64,
    /// Unix timestamp (milliseconds) of the last read, for LRU eviction.
    last_used: AtomicU64,
}

/// Concurrent validation cache keyed by token hash.
pub struct TokenCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
}

impl TokenCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    pub fn get(&self, key: &str) -> CacheOutcome {
        let now = unix_now();

        let expired = match self.entries.get(key) {
            None => return CacheOutcome::Miss,
            Some(entry) => {
                if entry.expires_at <= now {
                    true
                } else {
                    entry.last_used.store(now_millis(), Ordering::Relaxed);
                    return match &entry.claims {
                        Some(claims) => CacheOutcome::Valid(claims.clone()),
                        None => CacheOutcome::Rejected,
                    };
                }
            }
        };

        if expired {
            self.entries.remove(key);
        }
        CacheOutcome::Miss
    }

    /// Cache a positive validation. `claims.expires_at` is already capped
    /// by the validator.
    pub fn store_validated(&self, key: String, claims: Claims) {
        let expires_at = claims.expires_at;
        self.insert(
            key,
            CacheEntry {
                claims: Some(claims),
                expires_at,
                last_used: AtomicU64::new(now_millis()),
            },
        );
    }

    /// Cache a provider rejection until `expires_at`.
    pub fn store_rejected(&self, key: String, expires_at: u64) {
        self.insert(
            key,
            CacheEntry {
                claims: None,
                expires_at,
                last_used: AtomicU64::new(now_millis()),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&self, key: String, entry: CacheEntry) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.entries.insert(key, entry);
    }

    /// Remove the least recently used entry. O(n), acceptable because it
    /// only runs when the cache is full.
    fn evict_oldest(&self) {
        let mut oldest: Option<(String, u64)> = None;
        for entry in self.entries.iter() {
            let used = entry.last_used.load(Ordering::Relaxed);
            if oldest.as_ref().map(|(_, t)| used < *t).unwrap_or(true) {
                oldest = Some((entry.key().clone(), used));
            }
        }
        if let Some((key, _)) = oldest {
            self.entries.remove(&key);
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
