//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::cli::parse::{Commands, SetCommands};
use crate::cli::presentation::{
    format_pages_json, format_pages_text, format_session_json, format_session_text,
    format_set_detail, format_sets_json, format_sets_text, format_stored_set,
};
use crate::cli::script::{run_script, SimulationScript};
use crate::config::{ConfigLoader, HostConfig};
use crate::coordinator::CoordinatorSettings;
use crate::error::{HostError, StoreError};
use crate::pages::PageCatalog;
use crate::preferences::Preferences;
use crate::state::DisplayMode;
use crate::store::{FsVariableStore, HttpVariableStore, VariableSet, VariableSetStore};

/// Runtime context for CLI execution: workspace root and the merged configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: HostConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, HostError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        debug!(workspace = %workspace_root.display(), "run context ready");
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn with_config(workspace_root: PathBuf, config: HostConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub async fn execute(&self, command: &Commands) -> Result<String, HostError> {
        match command {
            Commands::Pages { format } => {
                let catalog = self.page_catalog()?;
                match format.as_str() {
                    "json" => format_pages_json(&catalog),
                    _ => Ok(format_pages_text(&catalog)),
                }
            }
            Commands::Sets { remote, command } => {
                let store = self.variable_store(remote.as_deref())?;
                self.handle_set_command(store.as_ref(), command).await
            }
            Commands::Mode { mode } => self.handle_mode(mode.as_deref()),
            Commands::Simulate { script, format } => {
                let script = SimulationScript::load(script)?;
                let settings = CoordinatorSettings::from_config(&self.config)?;
                let store: Arc<dyn VariableSetStore> = self.variable_store(None)?;
                let report = run_script(&script, settings, self.page_catalog()?, store).await?;
                match format.as_str() {
                    "json" => format_session_json(&report),
                    _ => Ok(format_session_text(&report)),
                }
            }
        }
    }

    async fn handle_set_command(
        &self,
        store: &dyn VariableSetStore,
        command: &SetCommands,
    ) -> Result<String, HostError> {
        match command {
            SetCommands::List { format } => {
                let sets = store.list_variable_sets().await?;
                match format.as_str() {
                    "json" => format_sets_json(&sets),
                    _ => Ok(format_sets_text(&sets)),
                }
            }
            SetCommands::Show { id } => {
                let sets = store.list_variable_sets().await?;
                let set = sets
                    .get(id)
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                format_set_detail(id, set)
            }
            SetCommands::Create { name, variables } => {
                let set = match variables {
                    Some(raw) => VariableSet::from_parts(name, parse_variables(raw)?)?,
                    None => VariableSet::seeded(name.as_str()),
                };
                let stored = store.create_or_update(None, set).await?;
                info!(id = %stored.id, "variable set created");
                Ok(format_stored_set("Created", &stored))
            }
            SetCommands::Update {
                id,
                name,
                variables,
            } => {
                let set = VariableSet::from_parts(name, parse_variables(variables)?)?;
                let stored = store.create_or_update(Some(id), set).await?;
                Ok(format_stored_set("Updated", &stored))
            }
            SetCommands::Delete { id } => {
                store.delete_variable_set(id).await?;
                Ok(format!("Deleted variable set {}", id))
            }
        }
    }

    fn handle_mode(&self, mode: Option<&str>) -> Result<String, HostError> {
        let path = self.config.preferences_path(&self.workspace_root);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let preferences = Preferences::open(&path)?;
        match mode {
            Some(raw) => {
                let mode: DisplayMode = raw.parse().map_err(HostError::InvalidArgument)?;
                preferences.set_display_mode(mode)?;
                Ok(format!("Display mode saved: {}", mode))
            }
            None => Ok(format!("Display mode: {}", preferences.display_mode()?)),
        }
    }

    fn page_catalog(&self) -> Result<PageCatalog, HostError> {
        Ok(PageCatalog::scan(&self.config.pages_path(&self.workspace_root))?)
    }

    fn variable_store(&self, remote: Option<&str>) -> Result<Arc<dyn VariableSetStore>, HostError> {
        match remote {
            Some(raw) => {
                let url = Url::parse(raw)
                    .map_err(|e| HostError::InvalidArgument(format!("--remote {}: {}", raw, e)))?;
                Ok(Arc::new(HttpVariableStore::new(&url)?))
            }
            None => Ok(Arc::new(FsVariableStore::open(
                self.config.variable_sets_path(&self.workspace_root),
            )?)),
        }
    }
}

fn parse_variables(raw: &str) -> Result<serde_json::Value, HostError> {
    serde_json::from_str(raw)
        .map_err(|e| HostError::InvalidArgument(format!("variables are not valid JSON: {}", e)))
}
