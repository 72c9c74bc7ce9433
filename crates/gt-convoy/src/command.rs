//! Subprocess wrapper for the external tools a convoy talks to.

use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be found or spawned.
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program exited with a non-zero status.
    #[error("{program} failed (exit code {code:?}): {stderr}")]
    Failed {
        program: String,
        /// `None` when killed by a signal.
        code: Option<i32>,
        stderr: String,
    },
}

pub type Result<T> = std::result::Result<T, CommandError>;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `program` with `args`, optionally in `cwd`, and return trimmed stdout.
pub fn run_command(program: &str, args: &[&str], cwd: Option<&Path>) -> Result<String> {
    debug!(program, ?args, cwd = ?cwd, "running command");
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd.output().map_err(|source| CommandError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(CommandError::Failed {
            program: program.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_spawn_error() {
        let err = run_command("gt-definitely-not-installed", &[], None).unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
        assert!(err.to_string().contains("gt-definitely-not-installed"));
    }

    #[cfg(unix)]
    #[test]
    fn stdout_is_trimmed_and_failures_carry_stderr() {
        assert_eq!(run_command("sh", &["-c", "echo '  hi  '"], None).unwrap(), "hi");

        match run_command("sh", &["-c", "echo oops >&2; exit 3"], None).unwrap_err() {
            CommandError::Failed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = run_command("pwd", &[], Some(dir.path())).unwrap();
        assert_eq!(
            std::path::PathBuf::from(out).canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
