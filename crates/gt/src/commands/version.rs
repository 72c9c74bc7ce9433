//! `gt version` -- what this binary is and what it can see from here.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use gt_formula::BuiltinSet;
use serde::Serialize;

use crate::context::RuntimeContext;
use crate::output::output_json;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build identifier, overridable at compile time with `GT_BUILD`.
const BUILD: &str = {
    match option_env!("GT_BUILD") {
        Some(b) => b,
        None => "dev",
    }
};

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: &'static str,
    build: &'static str,
    /// `os/arch`.
    platform: String,
    /// Formulas compiled into this binary.
    builtin_formulas: usize,
    /// Town discovered from the working directory.
    town_root: Option<PathBuf>,
}

impl VersionInfo {
    fn collect(ctx: &RuntimeContext) -> Self {
        Self {
            version: VERSION,
            build: BUILD,
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
            builtin_formulas: BuiltinSet::bundled().names().len(),
            town_root: ctx.town_root.clone(),
        }
    }
}

fn write_text(info: &VersionInfo, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "gt {} ({}) {}", info.version, info.build, info.platform)?;
    writeln!(out, "  Built-in formulas: {}", info.builtin_formulas)?;
    match &info.town_root {
        Some(town) => writeln!(out, "  Town: {}", town.display()),
        None => writeln!(out, "  Town: (none found)"),
    }
}

pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let info = VersionInfo::collect(ctx);
    if ctx.json {
        output_json(&info);
    } else {
        write_text(&info, &mut io::stdout())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(town: Option<&str>) -> VersionInfo {
        VersionInfo {
            version: "1.2.3",
            build: "abc",
            platform: "linux/x86_64".into(),
            builtin_formulas: 4,
            town_root: town.map(PathBuf::from),
        }
    }

    #[test]
    fn text_layout_reports_formulas_and_town() {
        let mut buf = Vec::new();
        write_text(&info(Some("/srv/town")), &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "gt 1.2.3 (abc) linux/x86_64\n  Built-in formulas: 4\n  Town: /srv/town\n"
        );
    }

    #[test]
    fn text_layout_outside_a_town() {
        let mut buf = Vec::new();
        write_text(&info(None), &mut buf).unwrap();
        assert!(String::from_utf8(buf).unwrap().ends_with("  Town: (none found)\n"));
    }

    #[test]
    fn collect_counts_bundled_formulas() {
        let ctx = RuntimeContext {
            json: true,
            verbose: false,
            quiet: false,
            cwd: PathBuf::from("/"),
            town_root: None,
        };
        let info = VersionInfo::collect(&ctx);
        assert_eq!(info.builtin_formulas, BuiltinSet::bundled().names().len());
        assert!(info.builtin_formulas > 0);
        assert!(!BUILD.is_empty());
    }
}
