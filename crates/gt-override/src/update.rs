//! Merge a newer built-in into an existing override.

use std::io::{self, Write};
use std::path::PathBuf;

use gt_formula::builtin::{extract_base_hash, override_header, strip_override_header, truncate_hash};
use serde::Serialize;
use tracing::info;

use crate::manager::OverrideManager;
use crate::{OverrideError, Result};

const HEAVY_RULE: &str = "═══════════════════════════════════════════════════════════";

/// Something that can merge two formula versions given a prompt.
pub trait MergeAgent {
    fn name(&self) -> &str;

    /// Return the merged formula text.
    fn merge(&mut self, prompt: &str) -> io::Result<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Write the merge into the override instead of printing it.
    pub apply: bool,
}

/// An override that needs merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub name: String,
    pub path: PathBuf,
    /// `None` when the override has no managed header.
    pub base_hash: Option<String>,
    pub current_hash: String,
    pub builtin: String,
    pub override_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCheck {
    UpToDate { path: PathBuf },
    Needed(PendingUpdate),
}

/// What a finished update did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UpdateOutcome {
    UpToDate { path: PathBuf },
    Proposed { path: PathBuf, merged: String },
    Applied { path: PathBuf, backup: PathBuf, base_hash: String },
}

impl OverrideManager {
    /// Compare the active override's recorded base with the current
    /// built-in.
    pub fn check_update(&self, name: &str) -> Result<UpdateCheck> {
        if !self.builtins.exists(name) {
            return Err(OverrideError::NotBuiltin(name.to_string()));
        }
        let chain = self.chain(name);
        let active = chain
            .active()
            .ok_or_else(|| OverrideError::NothingToUpdate(name.to_string()))?;

        let override_text = std::fs::read_to_string(&active.path)?;
        let base_hash = extract_base_hash(&override_text);
        let current_hash = self.builtins.hash(name)?;
        if base_hash.as_deref() == Some(current_hash.as_str()) {
            return Ok(UpdateCheck::UpToDate {
                path: active.path.clone(),
            });
        }

        Ok(UpdateCheck::Needed(PendingUpdate {
            name: name.to_string(),
            path: active.path.clone(),
            base_hash,
            current_hash,
            builtin: self.builtins.get(name)?.to_string(),
            override_text,
        }))
    }
}

/// The instructions handed to the merge agent.
pub fn build_merge_prompt(update: &PendingUpdate) -> String {
    let mut p = String::new();
    p.push_str("You are merging a formula override with an updated embedded version.\n\n");
    p.push_str(
        "TASK: Produce a merged formula that incorporates the upstream changes from the new \
         embedded version while preserving the user's customizations from their override.\n\n",
    );
    p.push_str(&format!("FORMULA: {}\n\n", update.name));

    match &update.base_hash {
        Some(base) => {
            p.push_str(&format!(
                "The override was originally based on embedded version sha256:{}\n",
                truncate_hash(base)
            ));
            p.push_str(&format!(
                "The embedded version has been updated to sha256:{}\n\n",
                truncate_hash(&update.current_hash)
            ));
        }
        None => p.push_str(
            "The override has no recorded base version. Compare it directly against the current \
             embedded version.\n\n",
        ),
    }

    p.push_str("=== CURRENT EMBEDDED VERSION (new upstream) ===\n");
    p.push_str(&update.builtin);
    p.push_str("\n=== END EMBEDDED ===\n\n");

    p.push_str("=== USER'S OVERRIDE (preserve their customizations) ===\n");
    p.push_str(&update.override_text);
    p.push_str("\n=== END OVERRIDE ===\n\n");

    p.push_str("RULES:\n");
    p.push_str("1. Preserve all user customizations from the override\n");
    p.push_str("2. Incorporate new additions/improvements from the embedded version\n");
    p.push_str("3. If there are conflicts, prefer the user's override version\n");
    p.push_str("4. Output ONLY the merged TOML content, no explanation or markdown fences\n");
    p.push_str(
        "5. Do NOT include the '# Based on embedded version' header comments - those are managed \
         automatically\n",
    );
    p
}

pub fn write_update_status(update: &PendingUpdate, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "Your override: {}", update.path.display())?;
    match &update.base_hash {
        Some(base) => writeln!(out, "Based on:      sha256:{}", truncate_hash(base))?,
        None => writeln!(out, "Based on:      (unknown - no base version recorded)")?,
    }
    writeln!(out, "Current:       sha256:{}\n", truncate_hash(&update.current_hash))
}

/// Ask `agent` for a merge, then apply it or print it for review.
pub fn merge_update(
    update: &PendingUpdate,
    agent: &mut dyn MergeAgent,
    opts: UpdateOptions,
    out: &mut dyn Write,
) -> Result<UpdateOutcome> {
    writeln!(out, "Invoking {} to merge changes...\n", agent.name())?;

    let merged = agent
        .merge(&build_merge_prompt(update))
        .map_err(|e| OverrideError::AgentFailed {
            name: update.name.clone(),
            path: update.path.clone(),
            reason: e.to_string(),
        })?;
    let merged = merged.trim();
    if merged.is_empty() {
        return Err(OverrideError::AgentEmpty {
            name: update.name.clone(),
            path: update.path.clone(),
        });
    }

    if !opts.apply {
        writeln!(out, "{HEAVY_RULE}")?;
        writeln!(out, "PROPOSED MERGE")?;
        writeln!(out, "{HEAVY_RULE}\n")?;
        writeln!(out, "{merged}")?;
        writeln!(out, "\n{HEAVY_RULE}\n")?;
        writeln!(out, "Review the proposed merge above.")?;
        writeln!(out, "Run 'gt formula update {} --apply' to apply it.", update.name)?;
        return Ok(UpdateOutcome::Proposed {
            path: update.path.clone(),
            merged: merged.to_string(),
        });
    }

    let mut backup = update.path.clone().into_os_string();
    backup.push(".bak");
    let backup = PathBuf::from(backup);
    std::fs::write(&backup, &update.override_text)?;
    writeln!(out, "Backup created: {}", backup.display())?;

    let content = format!(
        "{}{}",
        override_header(&update.name, &update.current_hash),
        strip_override_header(merged)
    );
    std::fs::write(&update.path, content)?;
    info!(name = %update.name, path = %update.path.display(), "applied merged override");
    writeln!(out, "Override updated: {}", update.path.display())?;
    writeln!(
        out,
        "\nBase version updated to current embedded (sha256:{}).",
        truncate_hash(&update.current_hash)
    )?;

    Ok(UpdateOutcome::Applied {
        path: update.path.clone(),
        backup,
        base_hash: update.current_hash.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ModifyTarget;
    use gt_formula::BuiltinSet;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Returns a fixed reply and keeps the prompts it saw.
    struct ScriptedAgent {
        reply: io::Result<String>,
        prompts: Vec<String>,
    }

    impl ScriptedAgent {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: Vec::new(),
            }
        }
    }

    impl MergeAgent for ScriptedAgent {
        fn name(&self) -> &str {
            "scripted"
        }

        fn merge(&mut self, prompt: &str) -> io::Result<String> {
            self.prompts.push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    fn town() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("mayor")).unwrap();
        dir
    }

    fn manager(t: &TempDir, content: &str) -> OverrideManager {
        OverrideManager::new(
            t.path(),
            BuiltinSet::from_entries([("shiny".to_string(), content.to_string())]),
        )
    }

    fn needed(check: UpdateCheck) -> PendingUpdate {
        match check {
            UpdateCheck::Needed(p) => p,
            other => panic!("expected pending update, got {other:?}"),
        }
    }

    #[test]
    fn unchanged_builtin_needs_no_update() {
        let t = town();
        let mgr = manager(&t, "formula = \"shiny\"\n");
        let path = mgr.modify("shiny", &ModifyTarget::Town).unwrap();
        assert_eq!(mgr.check_update("shiny").unwrap(), UpdateCheck::UpToDate { path });
    }

    #[test]
    fn one_byte_change_triggers_update() {
        let t = town();
        manager(&t, "formula = \"shiny\"\n").modify("shiny", &ModifyTarget::Town).unwrap();
        let mgr = manager(&t, "formula = \"shiny\"\n\n");
        let pending = needed(mgr.check_update("shiny").unwrap());
        assert!(pending.base_hash.is_some());
        assert_ne!(pending.base_hash.as_deref(), Some(pending.current_hash.as_str()));
    }

    #[test]
    fn missing_override_or_builtin() {
        let t = town();
        let mgr = manager(&t, "x");
        assert!(matches!(mgr.check_update("shiny"), Err(OverrideError::NothingToUpdate(_))));
        assert!(matches!(mgr.check_update("nope"), Err(OverrideError::NotBuiltin(_))));
    }

    #[test]
    fn headerless_override_always_needs_update() {
        let t = town();
        let dir = t.path().join(".beads/formulas");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("shiny.formula.toml"), "x").unwrap();
        let pending = needed(manager(&t, "x").check_update("shiny").unwrap());
        assert_eq!(pending.base_hash, None);
        assert!(build_merge_prompt(&pending).contains("no recorded base version"));
    }

    #[test]
    fn prompt_carries_both_versions_and_rules() {
        let pending = PendingUpdate {
            name: "shiny".into(),
            path: "/t/shiny.formula.toml".into(),
            base_hash: Some("a".repeat(64)),
            current_hash: "b".repeat(64),
            builtin: "NEW".into(),
            override_text: "MINE".into(),
        };
        let prompt = build_merge_prompt(&pending);
        assert!(prompt.contains("FORMULA: shiny\n\n"));
        assert!(prompt.contains(&format!("sha256:{}\n", "a".repeat(12))));
        assert!(prompt.contains("=== CURRENT EMBEDDED VERSION (new upstream) ===\nNEW\n=== END EMBEDDED ==="));
        assert!(prompt.contains("=== USER'S OVERRIDE (preserve their customizations) ===\nMINE\n"));
        assert!(prompt.ends_with("those are managed automatically\n"));
    }

    #[test]
    fn apply_backs_up_and_rewrites_header() {
        let t = town();
        manager(&t, "formula = \"shiny\"\n").modify("shiny", &ModifyTarget::Town).unwrap();
        let mgr = manager(&t, "formula = \"shiny\"\nversion = 2\n");
        let pending = needed(mgr.check_update("shiny").unwrap());
        let original = pending.override_text.clone();

        let mut agent = ScriptedAgent::replying(
            "# Based on embedded version: sha256:stale\n\nformula = \"shiny\"\nversion = 2\n",
        );
        let mut out: Vec<u8> = Vec::new();
        let outcome = merge_update(&pending, &mut agent, UpdateOptions { apply: true }, &mut out).unwrap();

        let UpdateOutcome::Applied { path, backup, base_hash } = outcome else {
            panic!("expected applied");
        };
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), original);
        assert!(backup.to_string_lossy().ends_with(".formula.toml.bak"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(extract_base_hash(&written), Some(base_hash.clone()));
        assert!(written.ends_with("formula = \"shiny\"\nversion = 2"));
        assert_eq!(written.matches("# Based on embedded version").count(), 1);

        assert_eq!(mgr.check_update("shiny").unwrap(), UpdateCheck::UpToDate { path });
        assert_eq!(agent.prompts.len(), 1);
    }

    #[test]
    fn without_apply_the_merge_is_only_printed() {
        let t = town();
        manager(&t, "a\n").modify("shiny", &ModifyTarget::Town).unwrap();
        let mgr = manager(&t, "b\n");
        let pending = needed(mgr.check_update("shiny").unwrap());

        let mut out: Vec<u8> = Vec::new();
        let outcome = merge_update(
            &pending,
            &mut ScriptedAgent::replying("merged"),
            UpdateOptions::default(),
            &mut out,
        )
        .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Proposed { .. }));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("PROPOSED MERGE"));
        assert!(text.contains("Run 'gt formula update shiny --apply' to apply it."));
        assert_eq!(std::fs::read_to_string(&pending.path).unwrap(), pending.override_text);
    }

    #[test]
    fn empty_or_failed_agent_output_is_an_error() {
        let t = town();
        manager(&t, "a\n").modify("shiny", &ModifyTarget::Town).unwrap();
        let pending = needed(manager(&t, "b\n").check_update("shiny").unwrap());

        let err = merge_update(
            &pending,
            &mut ScriptedAgent::replying("  \n"),
            UpdateOptions { apply: true },
            &mut io::sink(),
        )
        .unwrap_err();
        assert!(matches!(err, OverrideError::AgentEmpty { .. }));

        let mut failing = ScriptedAgent {
            reply: Err(io::Error::other("boom")),
            prompts: Vec::new(),
        };
        let err = merge_update(&pending, &mut failing, UpdateOptions::default(), &mut io::sink()).unwrap_err();
        assert!(err.to_string().starts_with("agent merge failed: boom"));
        assert!(err.to_string().contains("gt formula show shiny"));
    }
}
