//! Scripted sessions for `pagehost simulate`: a JSON list of UI actions and
//! content-page emissions replayed against the in-process host.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::coordinator::{Coordinator, CoordinatorSettings, Notice};
use crate::error::HostError;
use crate::event_log::Event;
use crate::pages::PageCatalog;
use crate::platform::memory::MemoryEnvironment;
use crate::platform::TabWindow;
use crate::state::{ActiveState, ActiveStateStore, DisplayMode};
use crate::store::{VariableSet, VariableSetStore};

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationScript {
    /// Display mode the session starts in.
    #[serde(default)]
    pub mode: DisplayMode,
    /// Delay before a new tab's page viewer comes up.
    #[serde(default = "default_viewer_delay_ms")]
    pub viewer_delay_ms: u64,
    pub steps: Vec<Step>,
}

fn default_viewer_delay_ms() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    SelectPage { page: String },
    SelectSet { id: Option<String> },
    /// Creates a set through the store and selects it.
    CreateSet { name: String, variables: Option<Value> },
    Mode { mode: DisplayMode },
    /// The content page posts `event` to the host.
    Emit { event: Value },
    Wait { ms: u64 },
    ClearLog,
    /// The user closes the detached tab.
    CloseTab,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub events: Vec<Event>,
    #[serde(skip)]
    pub notices: Vec<Notice>,
    #[serde(skip)]
    pub state: ActiveState,
}

impl SimulationScript {
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| HostError::Script(format!("{}: {}", path.display(), e)))
    }
}

/// Replays `script`. Step failures become notices; the session goes on.
pub async fn run_script(
    script: &SimulationScript,
    settings: CoordinatorSettings,
    pages: PageCatalog,
    store: Arc<dyn VariableSetStore>,
) -> Result<SimulationReport, HostError> {
    let env = MemoryEnvironment::with_auto_ready(&settings.channel_name);
    env.browser
        .set_viewer_delay(Duration::from_millis(script.viewer_delay_ms));

    let mut coordinator = Coordinator::new(
        env.host(),
        settings,
        ActiveStateStore::new(script.mode),
        store,
    )
    .with_pages(pages);
    coordinator.reload_variable_sets().await?;

    let mut failures = Vec::new();
    for (index, step) in script.steps.iter().enumerate() {
        debug!(index, ?step, "simulation step");
        if let Err(err) = apply(&mut coordinator, &env, step).await {
            warn!(index, error = %err, "simulation step failed");
            failures.push(Notice::Failed(format!("step {}: {}", index + 1, err)));
        }
        coordinator.run_for(Duration::ZERO).await;
    }

    let mut notices = coordinator.drain_notices();
    notices.extend(failures);
    info!(events = coordinator.log().len(), "simulation finished");
    Ok(SimulationReport {
        events: coordinator.log().to_vec(),
        notices,
        state: coordinator.state(),
    })
}

async fn apply(
    coordinator: &mut Coordinator,
    env: &MemoryEnvironment,
    step: &Step,
) -> Result<(), HostError> {
    match step {
        Step::SelectPage { page } => coordinator.select_page(page)?,
        Step::SelectSet { id } => {
            coordinator.select_variable_set(id.as_deref())?;
        }
        Step::CreateSet { name, variables } => {
            let set = match variables {
                Some(variables) => VariableSet::from_parts(name, variables.clone())?,
                None => VariableSet::seeded(name.as_str()),
            };
            let stored = coordinator.save_variable_set(None, set).await?;
            coordinator.select_variable_set(Some(&stored.id))?;
        }
        Step::Mode { mode } => coordinator.set_display_mode(*mode)?,
        Step::Emit { event } => match coordinator.transport_mode() {
            DisplayMode::Inline => {
                env.frame.emit(event.clone());
            }
            DisplayMode::Detached => {
                let tab = env
                    .browser
                    .latest_tab()
                    .filter(|tab| !tab.is_closed())
                    .ok_or_else(|| HostError::Script("no detached tab is open".to_string()))?;
                tab.frame().emit(event.clone());
                // The relay runs on its own task.
                tokio::task::yield_now().await;
            }
        },
        Step::Wait { ms } => coordinator.run_for(Duration::from_millis(*ms)).await,
        Step::ClearLog => coordinator.clear_log(),
        Step::CloseTab => {
            if let Some(tab) = env.browser.latest_tab() {
                tab.close();
            }
        }
    }
    Ok(())
}
