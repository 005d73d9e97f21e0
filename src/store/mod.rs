//! Variable-set storage: named JSON variable bags the host pushes to content
//! pages.
//!
//! A set id is the creation time in milliseconds, as a decimal string. An
//! update addressed to an id that does not exist creates it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::StoreError;
use crate::protocol::Variables;

pub mod fs;
pub mod http;
pub mod memory;

pub use fs::FsVariableStore;
pub use http::HttpVariableStore;
pub use memory::MemoryVariableStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSet {
    pub name: String,
    pub variables: Variables,
}

impl VariableSet {
    pub fn new(name: impl Into<String>, variables: Variables) -> Self {
        Self {
            name: name.into(),
            variables,
        }
    }

    /// A fresh set with the placeholder keys content pages expect.
    pub fn seeded(name: impl Into<String>) -> Self {
        let mut variables = Variables::new();
        variables.insert("sessionData".to_string(), Value::Null);
        variables.insert("constants".to_string(), Value::Null);
        Self::new(name, variables)
    }

    /// Builds a set from user-supplied JSON; `variables` must be an object.
    pub fn from_parts(name: &str, variables: Value) -> Result<Self, StoreError> {
        match variables {
            Value::Object(map) => {
                let set = Self::new(name, map);
                set.validate()?;
                Ok(set)
            }
            other => Err(StoreError::Validation(format!(
                "variables must be a JSON object, got {}",
                json_type(&other)
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Validation(
                "variable set name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_value(&self) -> Value {
        json!({ "name": self.name, "variables": self.variables })
    }
}

/// Response shape of create and update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVariableSet {
    pub id: String,
    pub variable_set: VariableSet,
}

#[async_trait]
pub trait VariableSetStore: Send + Sync {
    async fn list_variable_sets(&self) -> Result<BTreeMap<String, VariableSet>, StoreError>;

    /// Creates a set under a fresh id when `id` is `None`, otherwise writes
    /// the set under `id`.
    async fn create_or_update(
        &self,
        id: Option<&str>,
        variable_set: VariableSet,
    ) -> Result<StoredVariableSet, StoreError>;

    async fn delete_variable_set(&self, id: &str) -> Result<(), StoreError>;
}

/// Ids end up in file names and URL paths.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::Validation(format!("invalid variable set id '{}'", id)))
    }
}

/// Next creation-time id not already in use.
pub(crate) fn fresh_id(taken: impl Fn(&str) -> bool) -> String {
    let mut millis = Utc::now().timestamp_millis();
    loop {
        let id = millis.to_string();
        if !taken(&id) {
            return id;
        }
        millis += 1;
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
