pub mod command_runner;
pub mod config;
pub mod dependency_checker;
pub mod file_finder;
pub mod processor;
pub mod rule;
pub mod selector;

pub use command_runner::*;
pub use config::{Config, FilterValue, ListingConfig, RuleConfig};
pub use dependency_checker::check_dependencies;

pub use file_finder::{CliArgs, Command, CompletionArgs, DirectoryStore, ImageStore, ImanipArgs};

pub use processor::{MemoryReporter, Pipeline, Reporter, RunOutcome};
pub use rule::{FolderCandidates, Rule, compile_rules, evaluate};
pub use selector::{FileList, FilterSpec, Parity, select, select_by_kind};

#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("Invalid {group} value '{value}': expected an integer")]
    InvalidFilterValue { group: &'static str, value: String },

    #[error("Invalid command template '{template}': {reason}")]
    InvalidCommandTemplate { template: String, reason: String },

    #[error("Cannot resolve folder '{folder}': {reason}")]
    FolderResolution { folder: String, reason: String },

    #[error("Failed to launch '{command}': {source}")]
    ProcessLaunch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Waiting for '{command}' was interrupted: {source}")]
    ProcessInterrupted {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error in {path}: {message}")]
    Config { path: String, message: String },
}
