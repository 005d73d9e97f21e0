//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("base_url", "http://localhost:5000")?
        .set_default("channel_name", "custom-page-handler")?
        .set_default("pages_dir", "pages")?
        .set_default("handshake.interval_ms", 100)?
        .set_default("handshake.max_attempts", 50)?
        .set_default("storage.variable_sets_dir", "variable_sets")?
        .set_default("storage.preferences_path", ".pagehost/preferences")
}
