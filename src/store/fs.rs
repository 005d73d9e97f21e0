//! One pretty-printed JSON file per set: `<dir>/<id>.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::store::{fresh_id, validate_id, StoredVariableSet, VariableSet, VariableSetStore};

pub struct FsVariableStore {
    root: PathBuf,
}

impl FsVariableStore {
    /// Creates `root` if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }

    fn read_set(path: &Path) -> Result<VariableSet, StoreError> {
        let raw = std::fs::read(path)?;
        let set: VariableSet = serde_json::from_slice(&raw)?;
        Ok(set)
    }
}

#[async_trait]
impl VariableSetStore for FsVariableStore {
    async fn list_variable_sets(&self) -> Result<BTreeMap<String, VariableSet>, StoreError> {
        let mut sets = BTreeMap::new();
        if !self.root.exists() {
            return Ok(sets);
        }
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match Self::read_set(&path) {
                Ok(set) => {
                    sets.insert(id.to_string(), set);
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable variable set");
                }
            }
        }
        debug!(count = sets.len(), root = %self.root.display(), "loaded variable sets");
        Ok(sets)
    }

    async fn create_or_update(
        &self,
        id: Option<&str>,
        variable_set: VariableSet,
    ) -> Result<StoredVariableSet, StoreError> {
        variable_set.validate()?;
        let id = match id {
            Some(id) => {
                validate_id(id)?;
                id.to_string()
            }
            None => fresh_id(|candidate| self.path_for(candidate).exists()),
        };
        let body = serde_json::to_string_pretty(&variable_set)?;
        std::fs::write(self.path_for(&id), body)?;
        info!(id = %id, name = %variable_set.name, "saved variable set");
        Ok(StoredVariableSet { id, variable_set })
    }

    async fn delete_variable_set(&self, id: &str) -> Result<(), StoreError> {
        validate_id(id)?;
        let path = self.path_for(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        std::fs::remove_file(path)?;
        info!(id = %id, "deleted variable set");
        Ok(())
    }
}
