//! Command-line interface for tasktree
//!
//! This module defines the CLI structure using clap derive macros.
//! Command handlers live in [`task`].

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::api::HttpTaskApi;
use crate::config::Config;
use crate::coordinator::MutationCoordinator;
use crate::error::Result;
use crate::events::EventDestination;
use crate::output::OutputOptions;

mod task;

/// tasktree - task hierarchy client
///
/// Fetches the flat task list from a task API, shows it as a tree with
/// status summaries, and creates, updates or deletes tasks.
#[derive(Parser, Debug)]
#[command(name = "tasktree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to ./.tasktree.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Task API base URL
    #[arg(long, global = true, env = "TASKTREE_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for the task API
    #[arg(long, global = true, env = "TASKTREE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write notifications as JSONL to a file, or '-' for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show tasks as a tree
    Tree {
        /// Only tasks in this project
        #[arg(long)]
        project: Option<String>,
    },

    /// List tasks in snapshot order
    List {
        /// Only tasks in this project
        #[arg(long)]
        project: Option<String>,

        /// Only tasks with this status
        #[arg(long)]
        status: Option<String>,
    },

    /// Status counts per project group
    Summary,

    /// Show one task with its subtree
    Show {
        /// Task id
        id: String,
    },

    /// Create a task
    Create {
        /// Task id (must be unique)
        #[arg(long)]
        id: String,

        /// Task title
        #[arg(long)]
        title: String,

        /// Project id
        #[arg(long)]
        project: Option<String>,

        /// Parent task id
        #[arg(long)]
        parent: Option<String>,

        /// Status: new, in_progress, completed, blocked, pending
        #[arg(long, default_value = "new")]
        status: String,

        /// Priority: p0..p3
        #[arg(long)]
        priority: Option<String>,

        /// Task type (e.g. task, epic)
        #[arg(long = "type", default_value = "task")]
        task_type: String,

        /// Assignee
        #[arg(long)]
        owner: Option<String>,
    },

    /// Update fields of a task
    Update {
        /// Task id
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long, conflicts_with = "clear_priority")]
        priority: Option<String>,

        /// Remove the priority
        #[arg(long)]
        clear_priority: bool,

        #[arg(long, conflicts_with = "clear_parent")]
        parent: Option<String>,

        /// Make the task a root
        #[arg(long)]
        clear_parent: bool,

        #[arg(long, conflicts_with = "clear_project")]
        project: Option<String>,

        /// Remove the task from its project
        #[arg(long)]
        clear_project: bool,

        #[arg(long = "type")]
        task_type: Option<String>,

        #[arg(long, conflicts_with = "clear_owner")]
        owner: Option<String>,

        /// Unassign the task
        #[arg(long)]
        clear_owner: bool,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: String,
    },
}

impl Commands {
    /// Subcommand name used in output envelopes.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Tree { .. } => "tree",
            Commands::List { .. } => "list",
            Commands::Summary => "summary",
            Commands::Show { .. } => "show",
            Commands::Create { .. } => "create",
            Commands::Update { .. } => "update",
            Commands::Delete { .. } => "delete",
        }
    }
}

impl Cli {
    /// Run the selected command on a single-threaded runtime.
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.execute())
    }

    /// True when `--events -` claims stdout for JSONL.
    pub fn events_to_stdout(&self) -> bool {
        EventDestination::parse(self.events.as_deref())
            .map(|destination| destination.is_stdout())
            .unwrap_or(false)
    }

    fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_from_dir(&std::env::current_dir()?)?,
        };
        config.with_overrides(self.api_url.clone(), self.token.clone())
    }

    async fn execute(self) -> Result<()> {
        let config = self.load_config()?;
        let events_to_stdout = self.events_to_stdout();
        let mut sink = EventDestination::parse(self.events.as_deref())
            .map(|destination| destination.open())
            .transpose()?;

        let api = HttpTaskApi::new(&config.api)?;
        let coordinator = MutationCoordinator::new(Arc::new(api));
        let mut notifications = coordinator.subscribe();
        let options = OutputOptions {
            json: self.json && !events_to_stdout,
            quiet: self.quiet || events_to_stdout,
        };

        let result = task::dispatch(&coordinator, &config, options, self.command).await;

        let mut drained = Ok(());
        if let Some(sink) = sink.as_mut() {
            while let Ok(notification) = notifications.try_recv() {
                drained = sink.emit(&notification);
                if drained.is_err() {
                    break;
                }
            }
        }

        result.and(drained)
    }
}
