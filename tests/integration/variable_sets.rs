//! Variable-set management through the coordinator and the file store.

use std::sync::Arc;

use pagehost::config::HandshakeConfig;
use pagehost::coordinator::{Coordinator, CoordinatorSettings};
use pagehost::error::{CoordinatorError, StoreError};
use pagehost::event_log::Direction;
use pagehost::platform::memory::MemoryEnvironment;
use pagehost::state::{ActiveStateStore, DisplayMode};
use pagehost::store::{FsVariableStore, VariableSet, VariableSetStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use url::Url;

use crate::integration::test_utils::catalog;
use crate::integration::CHANNEL;

fn file_backed(env: &MemoryEnvironment, temp: &TempDir) -> (Coordinator, Arc<FsVariableStore>) {
    let store = Arc::new(FsVariableStore::open(temp.path().join("variable_sets")).unwrap());
    let settings = CoordinatorSettings::new(
        Url::parse("http://localhost:5000").unwrap(),
        CHANNEL,
        HandshakeConfig::default(),
    );
    let coordinator = Coordinator::new(
        env.host(),
        settings,
        ActiveStateStore::new(DisplayMode::Inline),
        store.clone(),
    )
    .with_pages(catalog());
    (coordinator, store)
}

fn outbound_count(coordinator: &Coordinator) -> usize {
    coordinator
        .log()
        .iter()
        .filter(|e| e.direction == Direction::Outbound)
        .count()
}

#[tokio::test]
async fn created_set_is_pushed_when_selected_on_a_loaded_page() {
    let temp = TempDir::new().unwrap();
    let env = MemoryEnvironment::new(CHANNEL);
    let (mut coordinator, store) = file_backed(&env, &temp);

    coordinator.select_page("welcome").unwrap();
    let stored = coordinator
        .save_variable_set(None, VariableSet::from_parts("demo", json!({ "a": 1 })).unwrap())
        .await
        .unwrap();
    assert!(coordinator.select_variable_set(Some(&stored.id)).unwrap());

    assert_eq!(
        env.frame.received(),
        vec![json!({ "event": "message", "variables": { "a": 1 } })]
    );
    let on_disk: Value = serde_json::from_str(
        &std::fs::read_to_string(store.root().join(format!("{}.json", stored.id))).unwrap(),
    )
    .unwrap();
    assert_eq!(on_disk, json!({ "name": "demo", "variables": { "a": 1 } }));
}

#[tokio::test]
async fn editing_the_selected_set_updates_state_without_pushing() {
    let temp = TempDir::new().unwrap();
    let env = MemoryEnvironment::new(CHANNEL);
    let (mut coordinator, _store) = file_backed(&env, &temp);

    coordinator.select_page("welcome").unwrap();
    let stored = coordinator
        .save_variable_set(None, VariableSet::from_parts("demo", json!({ "a": 1 })).unwrap())
        .await
        .unwrap();
    coordinator.select_variable_set(Some(&stored.id)).unwrap();
    coordinator
        .save_variable_set(
            Some(&stored.id),
            VariableSet::from_parts("demo", json!({ "a": 2 })).unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(outbound_count(&coordinator), 1);
    assert_eq!(
        coordinator.state().current_variables,
        json!({ "a": 2 }).as_object().cloned()
    );
}

#[tokio::test]
async fn deleting_the_selected_set_clears_variables() {
    let temp = TempDir::new().unwrap();
    let env = MemoryEnvironment::new(CHANNEL);
    let (mut coordinator, _store) = file_backed(&env, &temp);

    let stored = coordinator
        .save_variable_set(None, VariableSet::seeded("demo"))
        .await
        .unwrap();
    coordinator.select_variable_set(Some(&stored.id)).unwrap();
    coordinator.delete_variable_set(&stored.id).await.unwrap();

    assert_eq!(coordinator.selected_variable_set(), None);
    assert_eq!(coordinator.state().current_variables, None);
    assert!(coordinator.variable_sets().is_empty());
    assert!(matches!(
        coordinator.delete_variable_set(&stored.id).await,
        Err(CoordinatorError::StoreOperationFailed(StoreError::NotFound(_)))
    ));
}

#[tokio::test]
async fn reload_picks_up_outside_changes() {
    let temp = TempDir::new().unwrap();
    let env = MemoryEnvironment::new(CHANNEL);
    let (mut coordinator, store) = file_backed(&env, &temp);

    let outside = store
        .create_or_update(None, VariableSet::seeded("from elsewhere"))
        .await
        .unwrap();
    assert!(coordinator.variable_sets().is_empty());
    assert_eq!(coordinator.reload_variable_sets().await.unwrap(), 1);
    coordinator.select_variable_set(Some(&outside.id)).unwrap();
    assert_eq!(
        coordinator.state().current_variables,
        json!({ "sessionData": null, "constants": null }).as_object().cloned()
    );

    store.delete_variable_set(&outside.id).await.unwrap();
    coordinator.reload_variable_sets().await.unwrap();
    assert_eq!(coordinator.selected_variable_set(), None);
    assert_eq!(coordinator.state().current_variables, None);
}

#[tokio::test]
async fn invalid_sets_never_reach_the_store() {
    let temp = TempDir::new().unwrap();
    let env = MemoryEnvironment::new(CHANNEL);
    let (mut coordinator, store) = file_backed(&env, &temp);

    let err = coordinator
        .save_variable_set(None, VariableSet::seeded("   "))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::StoreOperationFailed(StoreError::Validation(_))
    ));
    assert!(store.list_variable_sets().await.unwrap().is_empty());
}
