use super::KeyValueStore;
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Store backed by a JSON object file on disk. Every write is flushed
/// immediately.
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    data: BTreeMap<String, String>,
}

impl LocalStore {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("failed to read store {:?}", path))?;
            if contents.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&contents)
                    .with_context(|| format!("store {:?} is not a JSON object of strings", path))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(LocalStore { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {:?}", parent))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(&self.path, json).with_context(|| format!("failed to write store {:?}", self.path))
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        self.data.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        if self.data.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("state.json")).unwrap();
        assert_eq!(store.get("anything"), None);
    }

    #[test]
    fn test_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let mut store = LocalStore::open(&path).unwrap();
        store.set("iitc-base-map", "Google Roads".into()).unwrap();
        store.set("other", "1".into()).unwrap();
        store.remove("other").unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        assert_eq!(reopened.get("iitc-base-map").as_deref(), Some("Google Roads"));
        assert_eq!(reopened.get("other"), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").unwrap();
        assert!(LocalStore::open(&path).is_err());
    }
}
