//! Short-lived, single-use pairing keys
//!
//! A device asks for a key with [`KeyStore::generate`]; a controller later
//! trades the key for the device id with [`KeyStore::redeem`]. Keys expire
//! after a TTL and can be redeemed once.

pub mod config;
pub mod console;
pub mod pairing;

pub use pairing::dictionary::{Dictionary, KeyRenderer};
pub use pairing::{KeyRecord, KeyStore, KeyStoreBuilder, StoreStats};
