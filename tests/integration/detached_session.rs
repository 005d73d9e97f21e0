//! Detached mode: the content page lives in a tab reached over the broadcast
//! channel, behind the page viewer.

use std::time::Duration;

use pagehost::config::HandshakeConfig;
use pagehost::coordinator::Notice;
use pagehost::error::CoordinatorError;
use pagehost::event_log::{Direction, EventKind};
use pagehost::platform::memory::MemoryEnvironment;
use pagehost::platform::{ContentFrame, TabWindow};
use pagehost::state::DisplayMode;
use pagehost::store::VariableSet;
use pagehost::tabs::{CloseReason, TabState};
use serde_json::json;

use crate::integration::test_utils::coordinator_with;
use crate::integration::{coordinator, CHANNEL};

#[tokio::test(start_paused = true)]
async fn page_loads_only_after_handshake() {
    let env = MemoryEnvironment::with_auto_ready(CHANNEL);
    env.browser.set_viewer_delay(Duration::from_millis(350));
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    assert_eq!(coordinator.tab_state(), TabState::Opening);
    let tab = env.browser.latest_tab().unwrap();
    assert!(tab.url().starts_with("http://localhost:5000/page-viewer?tab="));

    coordinator.run_for(Duration::from_millis(300)).await;
    assert_eq!(coordinator.tab_state(), TabState::Opening);
    assert!(tab.frame().history().is_empty());

    coordinator.run_for(Duration::from_millis(200)).await;
    assert_eq!(coordinator.tab_state(), TabState::Ready);
    assert_eq!(tab.frame().source(), "http://localhost:5000/pages/welcome/");
    assert_eq!(
        tab.frame().received(),
        vec![json!({ "event": "message", "variables": {} })]
    );

    let log = coordinator.log().to_vec();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].kind, EventKind::Ready);
    assert_eq!(log[1].direction, Direction::Outbound);
    assert_eq!(log[1].page_id.as_deref(), Some("welcome"));
}

#[tokio::test(start_paused = true)]
async fn pages_selected_while_opening_load_in_order() {
    let env = MemoryEnvironment::new(CHANNEL);
    env.browser.set_viewer_delay(Duration::from_millis(150));
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    coordinator.select_page("enter-code").unwrap();
    assert_eq!(env.browser.tabs().len(), 1);

    coordinator.run_for(Duration::from_millis(400)).await;
    assert_eq!(coordinator.tab_state(), TabState::Ready);
    let tab = env.browser.latest_tab().unwrap();
    assert_eq!(
        tab.frame().history(),
        vec![
            "http://localhost:5000/pages/welcome/".to_string(),
            "http://localhost:5000/pages/enter-code/".to_string(),
        ]
    );
    assert_eq!(tab.focus_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn ready_tab_is_reused_and_focused() {
    let env = MemoryEnvironment::new(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    coordinator.run_for(Duration::from_millis(200)).await;
    assert_eq!(coordinator.tab_state(), TabState::Ready);

    coordinator.select_page("enter-code").unwrap();
    coordinator.run_for(Duration::from_millis(10)).await;

    assert_eq!(env.browser.tabs().len(), 1);
    let tab = env.browser.latest_tab().unwrap();
    assert_eq!(tab.focus_count(), 1);
    assert_eq!(tab.frame().source(), "http://localhost:5000/pages/enter-code/");
}

#[tokio::test(start_paused = true)]
async fn selecting_a_set_pushes_over_the_channel() {
    let env = MemoryEnvironment::new(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Detached);
    let stored = coordinator
        .save_variable_set(None, VariableSet::from_parts("demo", json!({ "a": 1 })).unwrap())
        .await
        .unwrap();

    coordinator.select_page("welcome").unwrap();
    coordinator.run_for(Duration::from_millis(200)).await;
    assert!(coordinator.select_variable_set(Some(&stored.id)).unwrap());
    coordinator.run_for(Duration::from_millis(10)).await;

    let tab = env.browser.latest_tab().unwrap();
    assert_eq!(
        tab.frame().received(),
        vec![json!({ "event": "message", "variables": { "a": 1 } })]
    );
}

#[tokio::test(start_paused = true)]
async fn content_output_is_relayed_back_to_the_host() {
    let env = MemoryEnvironment::new(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    coordinator.run_for(Duration::from_millis(200)).await;

    let tab = env.browser.latest_tab().unwrap();
    tab.frame().emit(json!({
        "event": "EMAIL_ENTERED",
        "page": "welcome",
        "variables": { "email": "a@b.com" }
    }));
    coordinator.run_for(Duration::from_millis(10)).await;

    let last = coordinator.log().last().cloned().unwrap();
    assert_eq!(last.name, "EMAIL_ENTERED");
    assert_eq!(last.page_id.as_deref(), Some("welcome"));
    assert_eq!(coordinator.state().known_email.as_deref(), Some("a@b.com"));
}

#[tokio::test(start_paused = true)]
async fn handshake_gives_up_after_max_attempts() {
    let env = MemoryEnvironment::new(CHANNEL);
    env.browser.set_viewer_enabled(false);
    let mut coordinator = coordinator_with(
        &env,
        DisplayMode::Detached,
        HandshakeConfig {
            interval_ms: 100,
            max_attempts: 5,
        },
    );

    coordinator.select_page("welcome").unwrap();
    coordinator.run_for(Duration::from_millis(450)).await;
    assert_eq!(coordinator.tab_state(), TabState::Opening);

    coordinator.run_for(Duration::from_millis(100)).await;
    assert_eq!(coordinator.tab_state(), TabState::Closed);
    assert!(env.browser.latest_tab().unwrap().is_closed());
    assert_eq!(
        coordinator.drain_notices(),
        vec![
            Notice::TabClosed(CloseReason::HandshakeTimeout),
            Notice::HandshakeTimeout { attempts: 5 },
        ]
    );

    // The next selection opens a fresh tab.
    coordinator.select_page("welcome").unwrap();
    assert_eq!(env.browser.tabs().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn blocked_popup_keeps_previous_selection() {
    let env = MemoryEnvironment::new(CHANNEL);
    env.browser.set_block_popups(true);
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    let err = coordinator.select_page("welcome").unwrap_err();
    assert!(matches!(err, CoordinatorError::TabCreationBlocked(_)));
    assert_eq!(coordinator.state().selected_page_id, None);
    assert_eq!(coordinator.tab_state(), TabState::Closed);

    env.browser.set_block_popups(false);
    coordinator.select_page("welcome").unwrap();
    assert_eq!(coordinator.tab_state(), TabState::Opening);
}

#[tokio::test(start_paused = true)]
async fn user_closed_tab_is_replaced_on_next_selection() {
    let env = MemoryEnvironment::new(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    coordinator.run_for(Duration::from_millis(200)).await;
    let first = env.browser.latest_tab().unwrap();
    first.close();
    coordinator.run_for(Duration::from_millis(10)).await;

    assert_eq!(coordinator.tab_state(), TabState::Closed);
    assert_eq!(
        coordinator.drain_notices(),
        vec![Notice::TabClosed(CloseReason::Remote)]
    );

    coordinator.select_page("enter-code").unwrap();
    assert_eq!(env.browser.tabs().len(), 2);
    assert_eq!(coordinator.tab_state(), TabState::Opening);
}

#[tokio::test(start_paused = true)]
async fn host_close_sends_close_tab() {
    let env = MemoryEnvironment::new(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    coordinator.run_for(Duration::from_millis(200)).await;
    coordinator.close_tab();

    assert_eq!(coordinator.tab_state(), TabState::Closed);
    assert!(env.browser.latest_tab().unwrap().is_closed());
    assert_eq!(
        coordinator.drain_notices(),
        vec![Notice::TabClosed(CloseReason::Host)]
    );
}

#[tokio::test(start_paused = true)]
async fn late_close_from_the_previous_tab_keeps_the_new_one() {
    let env = MemoryEnvironment::new(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    coordinator.run_for(Duration::from_millis(200)).await;
    assert_eq!(coordinator.tab_state(), TabState::Ready);

    coordinator.close_tab();
    tokio::task::yield_now().await;
    coordinator.select_page("enter-code").unwrap();
    // The old viewer's TAB_CLOSED arrives while the new tab is opening.
    coordinator.run_for(Duration::from_millis(500)).await;

    assert_eq!(coordinator.tab_state(), TabState::Ready);
    assert_eq!(
        coordinator.drain_notices(),
        vec![Notice::TabClosed(CloseReason::Host)]
    );

    coordinator.select_page("welcome").unwrap();
    coordinator.run_for(Duration::from_millis(10)).await;
    let tabs = env.browser.tabs();
    assert_eq!(tabs.len(), 2);
    assert_eq!(tabs.iter().filter(|tab| !tab.is_closed()).count(), 1);
    assert_eq!(
        tabs[1].frame().history(),
        vec![
            "http://localhost:5000/pages/enter-code/".to_string(),
            "http://localhost:5000/pages/welcome/".to_string(),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn another_host_on_the_channel_does_not_complete_the_handshake() {
    let env = MemoryEnvironment::new(CHANNEL);
    env.browser.set_viewer_delay(Duration::from_millis(350));
    let _other_host = env.hub.clone().unwrap().open(CHANNEL);
    let mut coordinator = coordinator(&env, DisplayMode::Detached);

    coordinator.select_page("welcome").unwrap();
    coordinator.run_for(Duration::from_millis(120)).await;
    assert_eq!(coordinator.tab_state(), TabState::Opening);

    coordinator.run_for(Duration::from_millis(500)).await;
    assert_eq!(coordinator.tab_state(), TabState::Ready);
    let tab = env.browser.latest_tab().unwrap();
    assert_eq!(
        tab.frame().history(),
        vec!["http://localhost:5000/pages/welcome/".to_string()]
    );
}
