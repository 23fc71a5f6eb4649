//! File-backed settings store for Linux hosts.
//!
//! Maps the [`SettingsStore`] capability onto a single JSON file holding
//! one object per namespace. Every put re-reads the file, updates the
//! key and writes the result through a temp-file rename, so each call is
//! individually durable and the file handle is released on every exit
//! path. An absent file reads as an empty store.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde_json::{Map, Value};

use servobench_core::persist::SETTINGS_NAMESPACE;
use servobench_core::{SettingsStore, StorageError};

/// JSON-file settings store.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
    namespace: String,
}

impl FileSettings {
    /// Store backed by `path`, scoped under the servo settings namespace.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_namespace(path, SETTINGS_NAMESPACE)
    }

    /// Store backed by `path`, scoped under an explicit namespace.
    pub fn with_namespace(path: impl Into<PathBuf>, namespace: &str) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.to_string(),
        }
    }

    fn read_namespace(&self) -> Result<Map<String, Value>, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(StorageError::Read(err.to_string())),
        };
        let root: Value =
            serde_json::from_str(&text).map_err(|err| StorageError::Read(err.to_string()))?;
        Ok(root
            .get(&self.namespace)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default())
    }

    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.read_namespace()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut root = match fs::read_to_string(&self.path) {
            Ok(text) => serde_json::from_str::<Value>(&text)
                .map_err(|err| StorageError::Read(err.to_string()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => Value::Object(Map::new()),
            Err(err) => return Err(StorageError::Read(err.to_string())),
        };
        if !root.is_object() {
            root = Value::Object(Map::new());
        }

        let namespace = root
            .as_object_mut()
            .expect("root is an object")
            .entry(self.namespace.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !namespace.is_object() {
            *namespace = Value::Object(Map::new());
        }
        namespace
            .as_object_mut()
            .expect("namespace is an object")
            .insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| StorageError::Write(err.to_string()))?;
        }
        let text = serde_json::to_string_pretty(&root)
            .map_err(|err| StorageError::Write(err.to_string()))?;

        // Write-then-rename keeps a power loss from truncating the file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|err| StorageError::Write(err.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|err| StorageError::Write(err.to_string()))?;
        Ok(())
    }
}

impl SettingsStore for FileSettings {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        Ok(self.get(key)?.and_then(|v| v.as_bool()))
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        self.put(key, Value::Bool(value))
    }

    fn get_i32(&self, key: &str) -> Result<Option<i32>, StorageError> {
        Ok(self
            .get(key)?
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok()))
    }

    fn put_i32(&mut self, key: &str, value: i32) -> Result<(), StorageError> {
        self.put(key, Value::from(value))
    }

    fn get_u32(&self, key: &str) -> Result<Option<u32>, StorageError> {
        Ok(self
            .get(key)?
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok()))
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), StorageError> {
        self.put(key, Value::from(value))
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get(key)?.and_then(|v| v.as_str().map(String::from)))
    }

    fn put_string(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.put(key, Value::String(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(test: &str) -> FileSettings {
        let path = std::env::temp_dir().join(format!(
            "servobench-{}-{}.json",
            test,
            std::process::id()
        ));
        let _ = fs::remove_file(&path);
        FileSettings::new(path)
    }

    #[test]
    fn test_absent_file_reads_empty() {
        let store = temp_store("absent");
        assert_eq!(store.get_bool("hasSettings").unwrap(), None);
        assert_eq!(store.get_u32("freq").unwrap(), None);
    }

    #[test]
    fn test_round_trip_through_file() {
        let mut store = temp_store("roundtrip");
        store.put_bool("hasSettings", true).unwrap();
        store.put_u32("freq", 60).unwrap();
        store.put_i32("servo0_center", -7).unwrap();
        store.put_string("servo0_name", "Base").unwrap();

        // A second instance over the same path sees the durable state.
        let reopened = FileSettings::new(store.path.clone());
        assert_eq!(reopened.get_bool("hasSettings").unwrap(), Some(true));
        assert_eq!(reopened.get_u32("freq").unwrap(), Some(60));
        assert_eq!(reopened.get_i32("servo0_center").unwrap(), Some(-7));
        assert_eq!(
            reopened.get_string("servo0_name").unwrap(),
            Some("Base".to_string())
        );

        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn test_namespace_isolation() {
        let mut store = temp_store("namespace");
        store.put_u32("freq", 60).unwrap();

        let other = FileSettings::with_namespace(store.path.clone(), "other-config");
        assert_eq!(other.get_u32("freq").unwrap(), None);

        let _ = fs::remove_file(&store.path);
    }

    #[test]
    fn test_wrong_type_reads_as_absent() {
        let mut store = temp_store("types");
        store.put_string("freq", "fast").unwrap();
        assert_eq!(store.get_u32("freq").unwrap(), None);

        let _ = fs::remove_file(&store.path);
    }
}
