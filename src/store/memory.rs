//! In-process store for simulations and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::StoreError;
use crate::store::{fresh_id, validate_id, StoredVariableSet, VariableSet, VariableSetStore};

#[derive(Default)]
pub struct MemoryVariableStore {
    sets: Mutex<BTreeMap<String, VariableSet>>,
}

impl MemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sets(sets: impl IntoIterator<Item = (String, VariableSet)>) -> Self {
        Self {
            sets: Mutex::new(sets.into_iter().collect()),
        }
    }
}

#[async_trait]
impl VariableSetStore for MemoryVariableStore {
    async fn list_variable_sets(&self) -> Result<BTreeMap<String, VariableSet>, StoreError> {
        Ok(self.sets.lock().clone())
    }

    async fn create_or_update(
        &self,
        id: Option<&str>,
        variable_set: VariableSet,
    ) -> Result<StoredVariableSet, StoreError> {
        variable_set.validate()?;
        let mut sets = self.sets.lock();
        let id = match id {
            Some(id) => {
                validate_id(id)?;
                id.to_string()
            }
            None => fresh_id(|candidate| sets.contains_key(candidate)),
        };
        sets.insert(id.clone(), variable_set.clone());
        Ok(StoredVariableSet { id, variable_set })
    }

    async fn delete_variable_set(&self, id: &str) -> Result<(), StoreError> {
        self.sets
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}
