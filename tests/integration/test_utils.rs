//! Shared test utilities for integration tests
//!
//! Builds coordinators over the in-process platform and isolates the
//! environment variables the config loader reads.

use std::sync::{Arc, Mutex};

use pagehost::config::HandshakeConfig;
use pagehost::coordinator::{Coordinator, CoordinatorSettings};
use pagehost::pages::{PageCatalog, PageLink};
use pagehost::platform::memory::MemoryEnvironment;
use pagehost::state::{ActiveStateStore, DisplayMode};
use pagehost::store::MemoryVariableStore;
use tempfile::TempDir;
use url::Url;

pub const CHANNEL: &str = "custom-page-handler";

/// Coordinator over `env` with the `welcome` and `enter-code` pages and an
/// empty in-memory store.
pub fn coordinator(env: &MemoryEnvironment, mode: DisplayMode) -> Coordinator {
    coordinator_with(env, mode, HandshakeConfig::default())
}

pub fn coordinator_with(
    env: &MemoryEnvironment,
    mode: DisplayMode,
    handshake: HandshakeConfig,
) -> Coordinator {
    let settings = CoordinatorSettings::new(
        Url::parse("http://localhost:5000").unwrap(),
        CHANNEL,
        handshake,
    );
    Coordinator::new(
        env.host(),
        settings,
        ActiveStateStore::new(mode),
        Arc::new(MemoryVariableStore::new()),
    )
    .with_pages(catalog())
}

pub fn catalog() -> PageCatalog {
    PageCatalog::from_links(vec![
        PageLink::from_directory("welcome"),
        PageLink::from_directory("enter-code"),
    ])
}

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const ISOLATED_VARS: [&str; 5] = [
    "HOME",
    "XDG_CONFIG_HOME",
    "PAGEHOST_ENV",
    "PAGEHOST_CHANNEL_NAME",
    "PAGEHOST_HANDSHAKE__MAX_ATTEMPTS",
];

/// Environment variable state to restore after test
struct EnvState {
    saved: Vec<(&'static str, Option<String>)>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            saved: ISOLATED_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        for (name, value) in self.saved {
            match value {
                Some(orig) => std::env::set_var(name, orig),
                None => std::env::remove_var(name),
            }
        }
    }
}

/// Runs `f` with HOME and XDG_CONFIG_HOME pointed into `test_dir` and the
/// PAGEHOST_* variables unset, restoring the environment afterwards.
pub fn with_config_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_home = test_dir.path().join("home");
    let test_config_home = test_dir.path().join("xdg");
    std::fs::create_dir_all(&test_home).unwrap();
    std::fs::create_dir_all(&test_config_home).unwrap();

    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", &test_config_home);
    for name in &ISOLATED_VARS[2..] {
        std::env::remove_var(name);
    }

    let result = f();

    env_state.restore();

    result
}
