//! [`WorkStore`], [`Dispatcher`], and [`PrSource`] backed by the `bd`,
//! `gt`, and `gh` command-line tools.

use std::path::PathBuf;

use tracing::debug;

use crate::collab::{ChangedFile, Dispatcher, NewRecord, PrInfo, PrSource, Relation, WorkStore};
use crate::command::{Result, run_command};

/// Records created with a multi-segment prefix (`hq-cv-abcde`) need
/// `--force`, since the store only recognizes single-segment prefixes.
pub fn needs_force_for_id(id: &str) -> bool {
    id.matches('-').count() > 1
}

// ---------------------------------------------------------------------------
// bd
// ---------------------------------------------------------------------------

/// The `bd` CLI, run inside the town's `.beads` directory.
pub struct BdStore {
    beads_dir: PathBuf,
}

impl BdStore {
    pub fn new(beads_dir: impl Into<PathBuf>) -> Self {
        Self {
            beads_dir: beads_dir.into(),
        }
    }

    fn bd(&self, args: &[&str]) -> Result<String> {
        run_command("bd", args, Some(&self.beads_dir))
    }
}

/// Arguments for `bd create`.
fn create_args(record: &NewRecord) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        format!("--type={}", record.kind),
        format!("--id={}", record.id),
        format!("--title={}", record.title),
        format!("--description={}", record.description),
    ];
    if needs_force_for_id(&record.id) {
        args.push("--force".to_string());
    }
    args
}

fn link_args<'a>(from: &'a str, to: &'a str, relation: Relation) -> Vec<&'a str> {
    let mut args = vec!["dep", "add", from, to];
    if relation == Relation::Tracks {
        args.push("--type=tracks");
    }
    args
}

impl WorkStore for BdStore {
    fn create(&mut self, record: &NewRecord) -> Result<()> {
        let args = create_args(record);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.bd(&args).map(drop)
    }

    fn link(&mut self, from: &str, to: &str, relation: Relation) -> Result<()> {
        self.bd(&link_args(from, to, relation)).map(drop)
    }

    fn comment(&mut self, id: &str, text: &str) -> Result<()> {
        self.bd(&["comment", id, text]).map(drop)
    }
}

// ---------------------------------------------------------------------------
// gt sling
// ---------------------------------------------------------------------------

/// Dispatches through `gt sling`.
pub struct SlingDispatcher {
    program: String,
}

impl SlingDispatcher {
    pub fn new() -> Self {
        Self {
            program: "gt".to_string(),
        }
    }
}

impl Default for SlingDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for SlingDispatcher {
    fn dispatch(&mut self, record_id: &str, target: &str, summary: &str, body: &str) -> Result<()> {
        let out = run_command(
            &self.program,
            &["sling", record_id, target, "-a", body, "-s", summary],
            None,
        )?;
        if !out.is_empty() {
            debug!(record_id, output = %out, "sling output");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// gh
// ---------------------------------------------------------------------------

/// Pull-request metadata from `gh pr view`.
#[derive(Default)]
pub struct GhPrSource;

const FILES_JQ: &str = r#".files[] | "\(.path) \(.additions) \(.deletions)""#;

impl PrSource for GhPrSource {
    fn fetch(&self, number: u32) -> PrInfo {
        let n = number.to_string();
        let title = run_command("gh", &["pr", "view", &n, "--json", "title", "--jq", ".title"], None)
            .unwrap_or_else(|e| {
                debug!(pr = number, error = %e, "could not fetch PR title");
                String::new()
            });
        let changed_files = run_command("gh", &["pr", "view", &n, "--json", "files", "--jq", FILES_JQ], None)
            .map(|out| parse_changed_files(&out))
            .unwrap_or_else(|e| {
                debug!(pr = number, error = %e, "could not fetch PR files");
                Vec::new()
            });
        PrInfo { title, changed_files }
    }
}

/// Parse `path additions deletions` lines, skipping malformed ones.
pub fn parse_changed_files(out: &str) -> Vec<ChangedFile> {
    out.lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let path = parts.next()?;
            let additions = parts.next()?.parse().ok()?;
            let deletions = parts.next()?.parse().ok()?;
            Some(ChangedFile {
                path: path.to_string(),
                additions,
                deletions,
            })
        })
        .collect()
}
