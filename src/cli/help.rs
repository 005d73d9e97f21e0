//! CLI command-name contract for logging spans.

use crate::cli::parse::{Commands, SetCommands};

/// Command name string for logs (e.g. "pages", "sets.create").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Pages { .. } => "pages".to_string(),
        Commands::Sets { command, .. } => format!("sets.{}", set_command_name(command)),
        Commands::Mode { .. } => "mode".to_string(),
        Commands::Simulate { .. } => "simulate".to_string(),
    }
}

pub fn set_command_name(command: &SetCommands) -> &'static str {
    match command {
        SetCommands::List { .. } => "list",
        SetCommands::Show { .. } => "show",
        SetCommands::Create { .. } => "create",
        SetCommands::Update { .. } => "update",
        SetCommands::Delete { .. } => "delete",
    }
}
