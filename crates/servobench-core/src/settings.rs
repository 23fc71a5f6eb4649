//! Settings storage abstraction.
//!
//! This module provides the key-value capability the persistence adapter
//! writes through. Implementations map it onto platform storage:
//! - Linux: a JSON file (see the server crate's `FileSettings`)
//! - ESP32: an NVS namespace
//!
//! All methods are synchronous to support embedded platforms. Each put is
//! individually durable once the call returns; implementations must
//! release the underlying store handle on every exit path, including
//! failures mid-burst. An absent key is `Ok(None)`, never an error --
//! callers treat it as "use the documented default". A value of the
//! wrong type reads as absent for the same reason.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during settings storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to read from the backing store.
    #[error("failed to read settings: {0}")]
    Read(String),

    /// Failed to write to the backing store.
    #[error("failed to write settings: {0}")]
    Write(String),

    /// The backing store could not be opened.
    #[error("settings store unavailable: {0}")]
    Unavailable(String),
}

/// Abstract namespaced key-value settings store.
///
/// The namespace is fixed per store instance; keys are flat strings
/// within it.
pub trait SettingsStore: Send + Sync {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError>;
    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError>;

    fn get_i32(&self, key: &str) -> Result<Option<i32>, StorageError>;
    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), StorageError>;

    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError>;
    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError>;

    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn put_string(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// In-memory settings store.
///
/// Clones share the same backing map, which lets tests hand one store to
/// a bank and keep a handle for inspection or for a second bank in
/// round-trip tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values
            .read()
            .expect("settings map poisoned")
            .get(key)
            .cloned()
    }

    fn put(&self, key: &str, value: Value) {
        self.values
            .write()
            .expect("settings map poisoned")
            .insert(key.to_string(), value);
    }
}

impl SettingsStore for MemorySettings {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        Ok(self.get(key).and_then(|v| v.as_bool()))
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        self.put(key, Value::Bool(value));
        Ok(())
    }

    fn get_i32(&self, key: &str) -> Result<Option<i32>, StorageError> {
        Ok(self
            .get(key)
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok()))
    }

    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), StorageError> {
        self.put(key, Value::from(value));
        Ok(())
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError> {
        Ok(self
            .get(key)
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok()))
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        self.put(key, Value::from(value));
        Ok(())
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key).and_then(|v| v.as_str().map(String::from)))
    }

    fn put_string(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.put(key, Value::String(value.to_string()));
        Ok(())
    }
}
