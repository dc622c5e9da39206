//! Round-robin credential pool
//!
//! Spreads generation traffic across multiple provider keys. The cursor
//! advances exactly once per `next()` call, whether or not the request that
//! follows succeeds, so every caller sees a different key.

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};

/// Highest numbered `PROMPTFORGE_IMAGE_API_KEY_<n>` variable probed
const MAX_NUMBERED_KEYS: usize = 16;

/// Ordered pool of provider credentials with a round-robin cursor
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.keys.len())
            .field("position", &self.position())
            .finish()
    }
}

impl CredentialPool {
    /// Create a pool from an ordered key list. Blank entries are dropped.
    pub fn new(keys: Vec<String>) -> Self {
        let keys = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Load the pool from `PROMPTFORGE_IMAGE_API_KEY_1..` numbered variables,
    /// falling back to the comma-separated `PROMPTFORGE_IMAGE_API_KEYS`.
    pub fn from_env() -> Self {
        let mut keys: Vec<String> = (1..=MAX_NUMBERED_KEYS)
            .filter_map(|i| env::var(format!("PROMPTFORGE_IMAGE_API_KEY_{}", i)).ok())
            .collect();

        if keys.is_empty()
            && let Ok(list) = env::var("PROMPTFORGE_IMAGE_API_KEYS")
        {
            keys = list.split(',').map(|k| k.to_string()).collect();
        }

        Self::new(keys)
    }

    /// Take the next credential, advancing the cursor.
    pub fn next(&self) -> Result<String> {
        if self.keys.is_empty() {
            return Err(Error::NoCredentials);
        }
        let len = self.keys.len();
        let index = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
                Some((c + 1) % len)
            })
            .unwrap_or(0);
        Ok(self.keys[index].clone())
    }

    /// Number of credentials in the pool
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index the next `next()` call will hand out
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}
