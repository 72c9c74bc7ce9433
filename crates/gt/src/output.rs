//! Output helpers for the `gt` CLI.

use std::io::{self, Write};

use serde::Serialize;

use crate::context::RuntimeContext;

/// Print `value` as pretty JSON on stdout.
pub fn output_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore broken pipe errors (e.g., piped to `head`)
            let _ = writeln!(handle, "{}", json);
        }
        Err(e) => {
            eprintln!("Error: failed to serialize JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Where human-readable progress goes: stdout normally, nowhere when the
/// result is emitted as JSON instead.
pub fn progress_writer(ctx: &RuntimeContext) -> Box<dyn Write> {
    if ctx.json {
        Box::new(io::sink())
    } else {
        Box::new(io::stdout())
    }
}
