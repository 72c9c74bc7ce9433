//! One-shot AI agent invocation for override merges.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::update::MergeAgent;
use crate::{OverrideError, Result};

/// Environment variable naming the preferred agent.
pub const AGENT_ENV: &str = "GT_DEFAULT_AGENT";

/// Agents tried, in order, when nothing is configured.
pub const CANDIDATES: [&str; 4] = ["claude", "opencode", "gemini", "codex"];

/// Program and leading arguments for a known agent's one-shot mode.
fn preset(name: &str) -> Option<(&'static str, &'static [&'static str])> {
    match name {
        "claude" => Some(("claude", &["-p"])),
        "opencode" => Some(("opencode", &["run"])),
        "gemini" => Some(("gemini", &["-p"])),
        "codex" => Some(("codex", &["exec"])),
        _ => None,
    }
}

/// A resolved agent command line; the prompt is appended as the last
/// argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentCommand {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
}

impl MergeAgent for AgentCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn merge(&mut self, prompt: &str) -> io::Result<String> {
        debug!(agent = %self.name, program = %self.program, "invoking merge agent");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(prompt)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!("{} exited with {}", self.program, output.status)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Turn an agent name into a command line. `on_path` reports whether a
/// program can be found.
pub fn resolve_agent(name: &str, on_path: &dyn Fn(&str) -> bool) -> Result<AgentCommand> {
    match preset(name) {
        Some((program, args)) => {
            if !on_path(program) {
                return Err(OverrideError::AgentCommandNotOnPath {
                    agent: name.to_string(),
                    command: program.to_string(),
                });
            }
            Ok(AgentCommand {
                name: name.to_string(),
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
            })
        }
        None => {
            if !on_path(name) {
                return Err(OverrideError::AgentNotOnPath(name.to_string()));
            }
            Ok(AgentCommand {
                name: name.to_string(),
                program: name.to_string(),
                args: vec!["-p".to_string()],
            })
        }
    }
}

/// Pick the merge agent.
///
/// An explicit `env_choice` must resolve. A configured default is skipped
/// if it does not. Otherwise the first candidate found on `PATH` wins.
pub fn detect_agent(
    env_choice: Option<&str>,
    configured: Option<&str>,
    on_path: &dyn Fn(&str) -> bool,
) -> Result<AgentCommand> {
    if let Some(name) = env_choice.filter(|n| !n.is_empty()) {
        return resolve_agent(name, on_path);
    }
    if let Some(name) = configured.filter(|n| !n.is_empty()) {
        match resolve_agent(name, on_path) {
            Ok(agent) => return Ok(agent),
            Err(e) => debug!(agent = name, error = %e, "configured agent unavailable"),
        }
    }
    CANDIDATES
        .into_iter()
        .find(|c| on_path(*c))
        .map_or(Err(OverrideError::NoAgent), |c| resolve_agent(c, on_path))
}

/// Locate `program` the way a shell would: as given when it contains a
/// path separator, else in each `PATH` entry.
pub fn find_on_path(program: &str) -> Option<PathBuf> {
    if program.contains(std::path::MAIN_SEPARATOR) {
        let path = Path::new(program);
        return is_executable(path).then(|| path.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(windows)]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn only(available: &'static [&'static str]) -> impl Fn(&str) -> bool {
        move |p| available.contains(&p)
    }

    #[test]
    fn presets_carry_one_shot_args() {
        let all = only(&["claude", "opencode", "gemini", "codex"]);
        let args = |n| resolve_agent(n, &all).unwrap().args;
        assert_eq!(args("claude"), vec!["-p"]);
        assert_eq!(args("opencode"), vec!["run"]);
        assert_eq!(args("gemini"), vec!["-p"]);
        assert_eq!(args("codex"), vec!["exec"]);
    }

    #[test]
    fn unknown_agent_runs_as_raw_command() {
        let agent = resolve_agent("aider", &only(&["aider"])).unwrap();
        assert_eq!(agent.program, "aider");
        assert_eq!(agent.args, vec!["-p"]);

        let err = resolve_agent("aider", &only(&[])).unwrap_err();
        assert_eq!(err.to_string(), "agent 'aider' not found on PATH");
        let err = resolve_agent("codex", &only(&[])).unwrap_err();
        assert_eq!(err.to_string(), "agent 'codex' command 'codex' not found on PATH");
    }

    #[test]
    fn env_choice_must_resolve() {
        let err = detect_agent(Some("codex"), None, &only(&["claude"])).unwrap_err();
        assert!(matches!(err, OverrideError::AgentCommandNotOnPath { .. }));
    }

    #[test]
    fn unresolvable_configured_default_falls_through() {
        let agent = detect_agent(None, Some("codex"), &only(&["gemini"])).unwrap();
        assert_eq!(agent.name, "gemini");
        let agent = detect_agent(None, Some("opencode"), &only(&["gemini", "opencode"])).unwrap();
        assert_eq!(agent.name, "opencode");
    }

    #[test]
    fn candidates_in_order() {
        let agent = detect_agent(None, None, &only(&["codex", "opencode"])).unwrap();
        assert_eq!(agent.name, "opencode");
        assert!(matches!(detect_agent(None, None, &only(&[])), Err(OverrideError::NoAgent)));
    }

    #[cfg(unix)]
    #[test]
    fn command_agent_captures_trimmed_stdout() {
        let mut agent = AgentCommand {
            name: "echo".into(),
            program: "sh".into(),
            args: vec!["-c".into(), "printf '  merged\\n'; :".into()],
        };
        assert_eq!(agent.merge("ignored").unwrap(), "merged");

        let mut failing = AgentCommand {
            name: "false".into(),
            program: "sh".into(),
            args: vec!["-c".into(), "exit 3".into()],
        };
        assert!(failing.merge("x").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn finds_sh_on_path() {
        assert!(find_on_path("sh").is_some());
        assert!(find_on_path("definitely-not-a-real-program-xyz").is_none());
    }
}
