//! Switching between inline and detached display modes.

use std::time::Duration;

use pagehost::coordinator::Notice;
use pagehost::error::CoordinatorError;
use pagehost::event_log::EventKind;
use pagehost::platform::memory::MemoryEnvironment;
use pagehost::platform::{ContentFrame, TabWindow, BLANK_PAGE};
use pagehost::preferences::Preferences;
use pagehost::state::DisplayMode;
use pagehost::tabs::{CloseReason, TabState};
use pagehost::viewer::tab_id_from_url;
use serde_json::json;

use crate::integration::{coordinator, CHANNEL};

#[tokio::test(start_paused = true)]
async fn leaving_detached_closes_the_tab_and_ignores_it_afterwards() {
    let env = MemoryEnvironment::new(CHANNEL);
    env.browser.set_viewer_enabled(false);
    let hub = env.hub.clone().unwrap();
    // Stands in for the tab's page viewer.
    let mut spy = hub.open(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    let tab_id = tab_id_from_url(env.browser.latest_tab().unwrap().url()).unwrap();
    spy.post(json!({ "type": "TAB_READY", "data": { "tab": tab_id } }));
    coordinator.run_for(Duration::from_millis(150)).await;
    assert_eq!(coordinator.tab_state(), TabState::Ready);
    assert_eq!(
        spy.try_recv(),
        Some(json!({
            "type": "LOAD_PAGE",
            "data": { "url": "http://localhost:5000/pages/welcome/" }
        }))
    );

    coordinator.set_display_mode(DisplayMode::Inline).unwrap();
    assert_eq!(spy.try_recv(), Some(json!({ "type": "CLOSE_TAB", "data": {} })));
    assert!(env.browser.latest_tab().unwrap().is_closed());
    assert_eq!(coordinator.tab_state(), TabState::Closed);
    assert_eq!(coordinator.transport_mode(), DisplayMode::Inline);
    assert_eq!(coordinator.state().selected_page_id, None);

    // Late traffic from the old tab goes nowhere.
    spy.post(json!({ "type": "IFRAME_MESSAGE", "data": { "event": "READY" } }));
    spy.post(json!({ "type": "TAB_CLOSED", "data": { "tab": tab_id } }));
    coordinator.run_for(Duration::from_millis(50)).await;

    let kinds: Vec<EventKind> = coordinator.log().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::ConfigChange]);
    assert_eq!(hub.subscriber_count(CHANNEL), 1);
    assert_eq!(env.window.listener_count(), 1);
    assert_eq!(
        coordinator.drain_notices(),
        vec![Notice::TabClosed(CloseReason::Host)]
    );
}

#[test]
fn entering_detached_blanks_the_frame_and_drops_inline_listener() {
    let env = MemoryEnvironment::new(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Inline);
    coordinator.select_page("welcome").unwrap();
    assert_eq!(env.window.listener_count(), 1);

    coordinator.set_display_mode(DisplayMode::Detached).unwrap();

    assert_eq!(env.frame.source(), BLANK_PAGE);
    assert_eq!(env.window.listener_count(), 0);
    assert_eq!(env.hub.as_ref().unwrap().subscriber_count(CHANNEL), 1);
    assert_eq!(coordinator.transport_mode(), DisplayMode::Detached);
    assert!(coordinator.transport_subscribed());

    // Inline traffic after the switch is not ours any more.
    env.frame.emit(json!({ "event": "READY" }));
    assert_eq!(coordinator.process_pending(), 0);
    assert!(env.frame.received().is_empty());
}

#[test]
fn saving_the_same_mode_twice_keeps_one_transport() {
    let env = MemoryEnvironment::new(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Inline);

    coordinator.set_display_mode(DisplayMode::Detached).unwrap();
    coordinator.set_display_mode(DisplayMode::Detached).unwrap();

    assert_eq!(env.hub.as_ref().unwrap().subscriber_count(CHANNEL), 1);
    assert_eq!(env.window.listener_count(), 0);
    let log = coordinator.log().to_vec();
    assert_eq!(log.len(), 2);
    assert!(log
        .iter()
        .all(|e| e.variables == json!({ "displayInline": false }).as_object().cloned()));
}

#[test]
fn mode_changes_are_persisted() {
    let env = MemoryEnvironment::new(CHANNEL);
    let preferences = Preferences::temporary().unwrap();
    let mut coordinator =
        coordinator(&env, DisplayMode::Inline).with_preferences(preferences.clone());

    coordinator.set_display_mode(DisplayMode::Detached).unwrap();
    assert_eq!(preferences.display_mode().unwrap(), DisplayMode::Detached);

    coordinator.set_display_mode(DisplayMode::Inline).unwrap();
    assert_eq!(preferences.display_mode().unwrap(), DisplayMode::Inline);
}

#[test]
fn detached_is_disabled_without_broadcast() {
    let env = MemoryEnvironment::without_broadcast(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Inline);

    assert!(matches!(
        coordinator.set_display_mode(DisplayMode::Detached),
        Err(CoordinatorError::TransportUnavailable)
    ));
    assert!(!coordinator.detached_available());
    assert!(matches!(
        coordinator.set_display_mode(DisplayMode::Detached),
        Err(CoordinatorError::DetachedModeDisabled)
    ));

    // Inline keeps working.
    coordinator.select_page("welcome").unwrap();
    env.frame.emit(json!({ "event": "READY" }));
    assert_eq!(coordinator.process_pending(), 1);
    assert_eq!(env.frame.received().len(), 1);
    assert!(coordinator
        .log()
        .iter()
        .all(|e| e.kind != EventKind::ConfigChange));
}

#[tokio::test(start_paused = true)]
async fn quick_round_trip_discards_the_old_handshake() {
    let env = MemoryEnvironment::new(CHANNEL);
    env.browser.set_viewer_delay(Duration::from_millis(250));
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    coordinator.set_display_mode(DisplayMode::Inline).unwrap();
    coordinator.set_display_mode(DisplayMode::Detached).unwrap();
    coordinator.select_page("enter-code").unwrap();

    coordinator.run_for(Duration::from_millis(500)).await;

    let tabs = env.browser.tabs();
    assert_eq!(tabs.len(), 2);
    assert!(tabs[0].is_closed());
    assert!(tabs[0].frame().history().is_empty());
    assert_eq!(
        tabs[1].frame().history(),
        vec!["http://localhost:5000/pages/enter-code/".to_string()]
    );
    assert_eq!(coordinator.tab_state(), TabState::Ready);
}
