// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tagflip::output::OutputMode;
use tagflip::types::Action;

#[derive(Parser)]
#[command(name = "tagflip")]
#[command(about = "Mutable-tag deployment control: guarded updates and one-step rollbacks")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: discover tagflip.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output mode
    #[arg(long, global = true, value_enum, default_value_t = OutputMode::Normal)]
    pub output: OutputMode,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new tagflip.yml configuration file
    Init {
        /// Pipeline name written into the template
        #[arg(short, long)]
        pipeline: Option<String>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Start the pipeline for a new image and record the version bump
    Update {
        /// Image repository
        repository: String,
    },

    /// Point the mutable tag back at the newest version tag
    Rollback {
        /// Image repository
        repository: String,
    },

    /// Handle a JSON trigger event
    Handle {
        /// Action the event asks for
        #[arg(value_enum)]
        action: TriggerAction,

        /// Event file, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: String,
    },

    /// Show recorded updates and rollbacks
    History {
        /// Only records for this repository
        #[arg(short, long)]
        repository: Option<String>,

        /// Show at most this many of the newest records
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TriggerAction {
    Update,
    Rollback,
}

impl From<TriggerAction> for Action {
    fn from(action: TriggerAction) -> Self {
        match action {
            TriggerAction::Update => Action::Update,
            TriggerAction::Rollback => Action::Rollback,
        }
    }
}
