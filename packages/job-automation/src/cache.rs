//! Instruction → descriptor cache.
//!
//! One JSON document per workflow, mapping the exact instruction text to the
//! descriptor it last resolved to. Loaded once into memory; every `set` writes
//! the whole document back atomically. Entries never expire. Assumes a single
//! writer per document.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::Result;
use crate::stores::write_json_atomic;
use crate::types::descriptor::ActionDescriptor;

#[derive(Debug)]
pub struct ActionCache {
    /// `None` for a cache that is never persisted.
    path: Option<PathBuf>,
    entries: RwLock<HashMap<String, ActionDescriptor>>,
}

impl ActionCache {
    /// Load the document at `path`.
    ///
    /// A missing document is an empty cache. So is one that does not parse;
    /// it will be replaced on the next `set`.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_document(&path, &content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "action cache loaded");
        Ok(Self {
            path: Some(path),
            entries: RwLock::new(entries),
        })
    }

    /// A cache that lives only for the current process.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Descriptor stored for this exact instruction text.
    pub fn get(&self, instruction: &str) -> Option<ActionDescriptor> {
        self.entries.read().unwrap().get(instruction).cloned()
    }

    /// Store a descriptor, replacing any previous one, and persist.
    pub async fn set(&self, instruction: &str, descriptor: ActionDescriptor) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(instruction.to_string(), descriptor);
        self.flush().await
    }

    /// Write the whole document back.
    pub async fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let snapshot: BTreeMap<String, ActionDescriptor> = self
            .entries
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        write_json_atomic(path, &snapshot).await
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_document(path: &Path, content: &str) -> HashMap<String, ActionDescriptor> {
    let raw: Map<String, Value> = match serde_json::from_str(content) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable action cache, starting empty");
            return HashMap::new();
        }
    };

    raw.into_iter()
        .filter_map(|(instruction, value)| match ActionDescriptor::from_value(&value) {
            Some(descriptor) => Some((instruction, descriptor)),
            None => {
                tracing::warn!(instruction = %instruction, "dropping cache entry without a selector");
                None
            }
        })
        .collect()
}
