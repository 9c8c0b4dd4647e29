//! Extension-state store: a persistent `section -> key -> value` string map.
//!
//! The host application normally owns this store. Here it is modelled as the
//! [`ExtStateStore`] trait so the workflows can run against the YAML-backed
//! [`YamlExtStateStore`] in production and [`MemoryExtStateStore`] in tests.
//!
//! Empty values are treated as unset: [`ExtStateStore::get`] never returns
//! `Some("")`.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::fs;
use thiserror::Error;

type Sections = IndexMap<String, IndexMap<String, String>>;

/// Errors raised while reading or persisting the extension-state file
#[derive(Error, Debug)]
pub enum ExtStateError {
    #[error("Failed to read extension state {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse extension state {path}: {source}")]
    Parse {
        path: Utf8PathBuf,
        source: serde_yaml_ng::Error,
    },

    #[error("Failed to serialize extension state: {0}")]
    Serialize(#[from] serde_yaml_ng::Error),

    #[error("Failed to write extension state {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
}

/// Key-value persistence scoped by section name.
pub trait ExtStateStore {
    /// Value for `key` in `section`, or `None` when missing or empty.
    fn get(&self, section: &str, key: &str) -> Option<String>;

    /// Store `value`; the last write wins.
    fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), ExtStateError>;

    /// Remove `key` from `section`. Removing a missing key is not an error.
    fn delete(&mut self, section: &str, key: &str) -> Result<(), ExtStateError>;

    /// All non-empty keys of `section` in insertion order.
    fn entries(&self, section: &str) -> Vec<(String, String)>;
}

fn lookup(sections: &Sections, section: &str, key: &str) -> Option<String> {
    sections
        .get(section)
        .and_then(|keys| keys.get(key))
        .filter(|value| !value.is_empty())
        .cloned()
}

fn collect_entries(sections: &Sections, section: &str) -> Vec<(String, String)> {
    sections
        .get(section)
        .map(|keys| {
            keys.iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Store persisted to a YAML file, rewritten on every mutation.
#[derive(Debug, Clone)]
pub struct YamlExtStateStore {
    path: Utf8PathBuf,
    sections: Sections,
}

impl YamlExtStateStore {
    /// Open the store at `path`. A missing file yields an empty store.
    pub fn open<P: AsRef<Utf8Path>>(path: P) -> Result<Self, ExtStateError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            tracing::debug!("Extension state not found at {}, starting empty", path);
            return Ok(Self {
                path,
                sections: Sections::new(),
            });
        }

        let contents = fs::read_to_string(&path).map_err(|source| ExtStateError::Read {
            path: path.clone(),
            source,
        })?;

        let sections: Sections = if contents.trim().is_empty() {
            Sections::new()
        } else {
            serde_yaml_ng::from_str(&contents).map_err(|source| ExtStateError::Parse {
                path: path.clone(),
                source,
            })?
        };

        tracing::debug!("Loaded extension state from {}", path);
        Ok(Self { path, sections })
    }

    fn persist(&self) -> Result<(), ExtStateError> {
        let yaml = serde_yaml_ng::to_string(&self.sections)?;
        fs::write(&self.path, yaml).map_err(|source| ExtStateError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl ExtStateStore for YamlExtStateStore {
    fn get(&self, section: &str, key: &str) -> Option<String> {
        lookup(&self.sections, section, key)
    }

    fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), ExtStateError> {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        self.persist()
    }

    fn delete(&mut self, section: &str, key: &str) -> Result<(), ExtStateError> {
        let removed = self
            .sections
            .get_mut(section)
            .and_then(|keys| keys.shift_remove(key))
            .is_some();

        if removed { self.persist() } else { Ok(()) }
    }

    fn entries(&self, section: &str) -> Vec<(String, String)> {
        collect_entries(&self.sections, section)
    }
}

/// Non-persistent store for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryExtStateStore {
    sections: Sections,
}

impl MemoryExtStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExtStateStore for MemoryExtStateStore {
    fn get(&self, section: &str, key: &str) -> Option<String> {
        lookup(&self.sections, section, key)
    }

    fn set(&mut self, section: &str, key: &str, value: &str) -> Result<(), ExtStateError> {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, section: &str, key: &str) -> Result<(), ExtStateError> {
        if let Some(keys) = self.sections.get_mut(section) {
            keys.shift_remove(key);
        }
        Ok(())
    }

    fn entries(&self, section: &str) -> Vec<(String, String)> {
        collect_entries(&self.sections, section)
    }
}
