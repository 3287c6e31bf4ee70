//! Notifications for the presentation layer.
//!
//! The coordinator broadcasts a [`Notification`] whenever the tree or the
//! selection changes, or a mutation fails. Consumers subscribe to the
//! broadcast channel; the CLI can also write them out as JSON lines.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

pub const EVENT_SCHEMA_VERSION: &str = "tasktree.event.v1";

/// Which mutation an outcome or failure refers to.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Refresh,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// A new snapshot was applied and the forest rebuilt.
    TreeChanged {
        generation: u64,
        tasks: usize,
        roots: usize,
    },
    /// The stored selection id changed.
    SelectionChanged { task_id: Option<String> },
    MutationFailed {
        operation: Operation,
        #[serde(skip_serializing_if = "Option::is_none")]
        task_id: Option<String>,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn is_stdout(&self) -> bool {
        matches!(self, EventDestination::Stdout)
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

/// One JSONL record.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord<'a> {
    pub schema_version: &'static str,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub notification: &'a Notification,
}

impl<'a> EventRecord<'a> {
    pub fn new(notification: &'a Notification) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            timestamp: Utc::now(),
            notification,
        }
    }
}

/// Event sink that writes JSONL output to a destination.
pub struct EventSink {
    writer: Box<dyn Write + Send>,
}

impl EventSink {
    /// Emit events to stdout.
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Emit events to a file, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }

    /// Write a single notification as JSONL.
    pub fn emit(&mut self, notification: &Notification) -> Result<()> {
        let serialized = serde_json::to_vec(&EventRecord::new(notification))?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }
}
