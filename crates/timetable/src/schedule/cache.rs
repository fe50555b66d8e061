//! TTL cache for per-semester subject lists, and idempotency keys for
//! session writes.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use super::types::SessionIdentity;
use crate::api::{SessionUpsert, Subject};

/// Key derived from a session write, sent as `Idempotency-Key`.
///
/// Two writes with the same identity and the same payload share a key, so a
/// resubmitted cell is recognisable server-side.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn for_upsert(identity: &SessionIdentity, body: &SessionUpsert) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(identity.to_string().as_bytes());
        hasher.update([0u8]);
        // Serializing a plain struct of strings and numbers cannot fail
        if let Ok(payload) = serde_json::to_vec(body) {
            hasher.update(&payload);
        }
        let result = hasher.finalize();
        // Use first 16 bytes as hex string
        Self(hex::encode(&result[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Helper module for hex encoding.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct SubjectKey {
    pub department: String,
    pub semester: u8,
}

impl SubjectKey {
    pub fn new(department: impl Into<String>, semester: u8) -> Self {
        Self {
            department: department.into(),
            semester,
        }
    }
}

#[derive(Clone)]
struct CachedSubjects {
    subjects: Vec<Subject>,
    cached_at: Instant,
}

/// Subject lists per `(department, semester)`.
pub struct SubjectCache {
    entries: DashMap<SubjectKey, CachedSubjects>,
    ttl: Duration,
}

impl SubjectCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns a cached list if present and not expired.
    pub fn get(&self, key: &SubjectKey) -> Option<Vec<Subject>> {
        self.entries.get(key).and_then(|entry| {
            if entry.cached_at.elapsed() < self.ttl {
                Some(entry.subjects.clone())
            } else {
                // Entry expired, remove it
                drop(entry);
                self.entries.remove(key);
                None
            }
        })
    }

    pub fn insert(&self, key: SubjectKey, subjects: Vec<Subject>) {
        self.entries.insert(
            key,
            CachedSubjects {
                subjects,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &SubjectKey) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SubjectCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(5 * 60))
    }
}
