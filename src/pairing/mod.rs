//! Pairing key store
//!
//! Issues short-lived keys bound to a device identifier and resolves a
//! presented key back to its device exactly once.
//!
//! ## Lifecycle:
//! 1. A device asks for a key → any key it held before is dropped and a
//!    fresh, currently unique key is bound to it
//! 2. A controller presents the key → the record is consumed and the device
//!    id is returned if the key had not expired
//! 3. Expired records linger until something touches them: a redeem, a
//!    colliding candidate during generation, or an explicit purge

pub mod clock;
pub mod dictionary;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use clock::{Clock, SystemClock};
use dictionary::{Dictionary, KeyRenderer};

/// Initial index capacity (expected number of concurrent keys)
const INITIAL_CAPACITY: usize = 100;

pub const DEFAULT_KEY_LENGTH: usize = 6;
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// One live pairing key
#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub device_id: String,
    pub key: String,
    pub issued_at: DateTime<Utc>,
}

/// Both indexes over the same record set; always mutated together.
#[derive(Debug)]
struct Indexes {
    /// device id → key
    by_device: HashMap<String, String>,
    /// key → record
    by_key: HashMap<String, KeyRecord>,
}

impl Indexes {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            by_device: HashMap::with_capacity(capacity),
            by_key: HashMap::with_capacity(capacity),
        }
    }

    fn remove_key(&mut self, key: &str) -> Option<KeyRecord> {
        let record = self.by_key.remove(key)?;
        self.by_device.remove(&record.device_id);
        Some(record)
    }

    fn remove_device(&mut self, device_id: &str) -> Option<KeyRecord> {
        let key = self.by_device.remove(device_id)?;
        self.by_key.remove(&key)
    }

    fn insert(&mut self, record: KeyRecord) {
        self.by_device
            .insert(record.device_id.clone(), record.key.clone());
        self.by_key.insert(record.key.clone(), record);
    }
}

/// Snapshot of store size and settings
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    /// Indexed records, including expired ones not yet purged
    pub records: usize,
    pub ttl_secs: u64,
    pub key_length: usize,
    pub max_attempts: u32,
}

/// Thread-safe pairing key store
///
/// A single mutex serializes every operation; nothing inside the critical
/// section blocks or awaits.
pub struct KeyStore {
    renderer: Box<dyn KeyRenderer>,
    clock: Box<dyn Clock>,
    length: usize,
    ttl: chrono::Duration,
    max_attempts: u32,
    inner: Mutex<Indexes>,
}

impl KeyStore {
    pub fn builder() -> KeyStoreBuilder {
        KeyStoreBuilder::default()
    }

    /// Issue a new key for `device_id`
    ///
    /// Any key the device held before is invalidated first, even when no
    /// new key can be produced. Returns `None` for an empty device id or
    /// when every attempt collided with a live key.
    pub fn generate(&self, device_id: &str) -> Option<String> {
        if device_id.is_empty() {
            warn!("Refusing to issue a pairing key for an empty device id");
            return None;
        }

        let mut idx = self.inner.lock();

        if idx.remove_device(device_id).is_some() {
            debug!("Dropped previous pairing key for device {}", device_id);
        }

        for attempt in 1..=self.max_attempts {
            let candidate = self.renderer.render(self.length);
            let now = self.clock.now();

            if let Some(existing) = idx.by_key.get(&candidate) {
                if now - existing.issued_at < self.ttl {
                    continue;
                }
                let stale = existing.device_id.clone();
                idx.remove_key(&candidate);
                debug!("Reclaimed expired pairing key of device {}", stale);
            }

            idx.insert(KeyRecord {
                device_id: device_id.to_string(),
                key: candidate.clone(),
                issued_at: now,
            });
            info!(
                "Issued pairing key for device {} (attempt {})",
                device_id, attempt
            );
            return Some(candidate);
        }

        warn!(
            "Key space exhausted: no free key for device {} after {} attempts",
            device_id, self.max_attempts
        );
        None
    }

    /// Consume `key` and return its device id if it had not expired
    ///
    /// A key that is found is removed whether or not it expired, so it can
    /// never be redeemed twice. Unknown and expired keys look the same.
    pub fn redeem(&self, key: &str) -> Option<String> {
        let mut idx = self.inner.lock();
        let record = idx.remove_key(key)?;

        if self.clock.now() - record.issued_at < self.ttl {
            info!("Pairing key redeemed for device {}", record.device_id);
            Some(record.device_id)
        } else {
            debug!("Expired pairing key presented for device {}", record.device_id);
            None
        }
    }

    /// Drop every expired record; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut idx = self.inner.lock();
        let now = self.clock.now();
        let ttl = self.ttl;

        let expired: Vec<String> = idx
            .by_key
            .values()
            .filter(|r| now - r.issued_at >= ttl)
            .map(|r| r.key.clone())
            .collect();
        for key in &expired {
            idx.remove_key(key);
        }

        if !expired.is_empty() {
            debug!("Purged {} expired pairing key(s)", expired.len());
        }
        expired.len()
    }

    /// Number of indexed records (live or not yet purged)
    pub fn len(&self) -> usize {
        self.inner.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn key_length(&self) -> usize {
        self.length
    }

    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(DEFAULT_TTL)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            records: self.len(),
            ttl_secs: self.ttl().as_secs(),
            key_length: self.length,
            max_attempts: self.max_attempts,
        }
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("length", &self.length)
            .field("ttl", &self.ttl)
            .field("max_attempts", &self.max_attempts)
            .field("records", &self.len())
            .finish()
    }
}

/// Builder for [`KeyStore`]; unset or zero settings fall back to defaults
#[derive(Default)]
pub struct KeyStoreBuilder {
    renderer: Option<Box<dyn KeyRenderer>>,
    clock: Option<Box<dyn Clock>>,
    length: Option<usize>,
    ttl: Option<Duration>,
    max_attempts: Option<u32>,
}

impl KeyStoreBuilder {
    pub fn renderer(mut self, renderer: impl KeyRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn dictionary(self, dictionary: Dictionary) -> Self {
        self.renderer(dictionary)
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn key_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn build(self) -> anyhow::Result<KeyStore> {
        let ttl = self
            .ttl
            .filter(|t| !t.is_zero())
            .unwrap_or(DEFAULT_TTL);
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| anyhow::anyhow!("TTL {:?} out of range: {}", ttl, e))?;

        Ok(KeyStore {
            renderer: self
                .renderer
                .unwrap_or_else(|| Box::new(Dictionary::alpha())),
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
            length: self
                .length
                .filter(|&l| l > 0)
                .unwrap_or(DEFAULT_KEY_LENGTH),
            ttl,
            max_attempts: self
                .max_attempts
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            inner: Mutex::new(Indexes::with_capacity(INITIAL_CAPACITY)),
        })
    }
}
