//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{CoordinatorError, HostError, StoreError};

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &HostError) -> String {
    match e {
        HostError::Store(StoreError::NotFound(id))
        | HostError::Coordinator(CoordinatorError::StoreOperationFailed(StoreError::NotFound(id))) => {
            format!("No variable set with id '{}'", id)
        }
        HostError::Coordinator(CoordinatorError::TransportUnavailable) => {
            "Detached mode is unavailable: this platform has no broadcast channels".to_string()
        }
        other => other.to_string(),
    }
}
