//! The external systems a convoy run talks to.
//!
//! The executor only sees these traits. CLI-backed implementations live in
//! [`crate::backends`]; tests use in-memory fakes.

use std::fmt;

use serde::Serialize;

use crate::command::Result;

/// Kind of tracked record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Convoy,
    Task,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Convoy => "convoy",
            Self::Task => "task",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relationship between two tracked records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// The parent tracks the child as part of its group.
    Tracks,
    /// The first record cannot start until the second is done.
    Blocks,
}

/// A record to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecord {
    pub kind: RecordKind,
    pub id: String,
    pub title: String,
    pub description: String,
}

/// Tracked work-item store.
pub trait WorkStore {
    fn create(&mut self, record: &NewRecord) -> Result<()>;

    /// Link `from` to `to`. With [`Relation::Blocks`], `from` waits on `to`.
    fn link(&mut self, from: &str, to: &str, relation: Relation) -> Result<()>;

    fn comment(&mut self, id: &str, text: &str) -> Result<()>;
}

/// Hands a record to a worker on the target.
pub trait Dispatcher {
    fn dispatch(&mut self, record_id: &str, target: &str, summary: &str, body: &str) -> Result<()>;
}

/// One file touched by a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    pub path: String,
    pub additions: u64,
    pub deletions: u64,
}

/// Pull-request metadata. Empty when nothing could be fetched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PrInfo {
    pub title: String,
    pub changed_files: Vec<ChangedFile>,
}

/// Best-effort pull-request metadata lookup.
pub trait PrSource {
    fn fetch(&self, number: u32) -> PrInfo;
}
