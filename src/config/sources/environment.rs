//! Environment source: PAGEHOST_CHANNEL_NAME, PAGEHOST_HANDSHAKE__MAX_ATTEMPTS, ...

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("PAGEHOST")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
