//! CLI parse: clap types for pagehost. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pagehost CLI - drive custom content pages inline or in a detached tab
#[derive(Parser)]
#[command(name = "pagehost")]
#[command(about = "Cross-context messaging host for custom content pages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the content pages found in the pages directory
    Pages {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Manage stored variable sets
    Sets {
        /// Use the variable-set service at this URL instead of local files
        #[arg(long, global = true)]
        remote: Option<String>,

        #[command(subcommand)]
        command: SetCommands,
    },
    /// Show or save the display-mode preference
    Mode {
        /// inline or detached (omit to show the current preference)
        mode: Option<String>,
    },
    /// Run a scripted session against the in-process host and print the event log
    Simulate {
        /// Path to the JSON script
        script: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum SetCommands {
    /// List variable sets
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show one variable set
    Show {
        /// Variable set id
        id: String,
    },
    /// Create a variable set
    Create {
        /// Display name
        #[arg(long)]
        name: String,
        /// Variables as a JSON object (default: sessionData and constants set to null)
        #[arg(long)]
        variables: Option<String>,
    },
    /// Replace a variable set
    Update {
        /// Variable set id
        id: String,
        /// Display name
        #[arg(long)]
        name: String,
        /// Variables as a JSON object
        #[arg(long)]
        variables: String,
    },
    /// Delete a variable set
    Delete {
        /// Variable set id
        id: String,
    },
}
