//! Scripted sessions replayed against the in-process host.

use std::sync::Arc;

use pagehost::cli::script::{run_script, SimulationScript};
use pagehost::config::HandshakeConfig;
use pagehost::coordinator::{CoordinatorSettings, Notice};
use pagehost::event_log::{Direction, EventKind};
use pagehost::state::DisplayMode;
use pagehost::store::MemoryVariableStore;
use serde_json::json;
use url::Url;

use crate::integration::test_utils::catalog;
use crate::integration::CHANNEL;

fn settings() -> CoordinatorSettings {
    CoordinatorSettings::new(
        Url::parse("http://localhost:5000").unwrap(),
        CHANNEL,
        HandshakeConfig::default(),
    )
}

fn script(raw: serde_json::Value) -> SimulationScript {
    serde_json::from_value(raw).unwrap()
}

#[tokio::test(start_paused = true)]
async fn inline_then_detached_session() {
    let script = script(json!({
        "steps": [
            { "action": "select_page", "page": "welcome" },
            { "action": "create_set", "name": "demo", "variables": { "a": 1 } },
            { "action": "emit", "event": { "event": "CLICK", "page": "welcome" } },
            { "action": "mode", "mode": "detached" },
            { "action": "select_page", "page": "enter-code" },
            { "action": "wait", "ms": 200 }
        ]
    }));

    let report = run_script(
        &script,
        settings(),
        catalog(),
        Arc::new(MemoryVariableStore::new()),
    )
    .await
    .unwrap();

    let summary: Vec<(String, Direction, Option<String>)> = report
        .events
        .iter()
        .map(|e| (e.name.clone(), e.direction, e.page_id.clone()))
        .collect();
    let page = |p: &str| Some(p.to_string());
    assert_eq!(
        summary,
        vec![
            ("READY".to_string(), Direction::Inbound, None),
            ("message".to_string(), Direction::Outbound, page("welcome")),
            ("message".to_string(), Direction::Outbound, page("welcome")),
            ("CLICK".to_string(), Direction::Inbound, page("welcome")),
            ("CONFIG_CHANGE".to_string(), Direction::Inbound, None),
            ("READY".to_string(), Direction::Inbound, None),
            ("message".to_string(), Direction::Outbound, page("enter-code")),
        ]
    );
    assert_eq!(report.events[2].variables, json!({ "a": 1 }).as_object().cloned());
    assert_eq!(report.events[6].variables, json!({ "a": 1 }).as_object().cloned());
    assert_eq!(report.state.display_mode, DisplayMode::Detached);
    assert!(report.notices.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_steps_become_notices() {
    let script = script(json!({
        "steps": [
            { "action": "select_page", "page": "missing" },
            { "action": "select_set", "id": "nope" },
            { "action": "emit", "event": "garbage" }
        ]
    }));

    let report = run_script(
        &script,
        settings(),
        catalog(),
        Arc::new(MemoryVariableStore::new()),
    )
    .await
    .unwrap();

    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].kind, EventKind::Generic);
    assert_eq!(report.events[0].raw, Some(json!("garbage")));
    assert_eq!(report.notices.len(), 3);
    assert!(matches!(report.notices[0], Notice::MalformedPayload(_)));
    assert!(
        matches!(&report.notices[1], Notice::Failed(detail) if detail.starts_with("step 1:"))
    );
    assert!(
        matches!(&report.notices[2], Notice::Failed(detail) if detail.starts_with("step 2:"))
    );
}
