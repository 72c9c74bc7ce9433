//! Built-in formulas compiled into the binary, and the managed header that
//! records which built-in version an override was copied from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::types::{FORMULA_SUFFIX, FormulaError, Result};

const BUNDLED: &[(&str, &str)] = &[
    ("code-review", include_str!("../formulas/code-review.formula.toml")),
    ("mol-deacon-patrol", include_str!("../formulas/mol-deacon-patrol.formula.toml")),
    ("security-audit", include_str!("../formulas/security-audit.formula.toml")),
    ("shiny", include_str!("../formulas/shiny.formula.toml")),
];

const HEADER_AUTHOR: &str = "# Formula override created by gt formula modify";
const HEADER_BASE: &str = "# Based on embedded version: sha256:";
const HEADER_UPDATE: &str = "# To update: gt formula update";

/// The set of built-in formulas, keyed by name.
#[derive(Debug, Clone)]
pub struct BuiltinSet {
    formulas: BTreeMap<String, String>,
}

impl BuiltinSet {
    /// The formulas shipped with gt.
    pub fn bundled() -> Self {
        Self::from_entries(BUNDLED.iter().map(|(n, c)| (n.to_string(), c.to_string())))
    }

    /// A set with the given `(name, content)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            formulas: entries.into_iter().collect(),
        }
    }

    /// Formula names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.formulas.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    /// `name` may carry the `.formula.toml` suffix.
    pub fn exists(&self, name: &str) -> bool {
        self.formulas.contains_key(strip_suffix(name))
    }

    pub fn get(&self, name: &str) -> Result<&str> {
        self.formulas
            .get(strip_suffix(name))
            .map(String::as_str)
            .ok_or_else(|| FormulaError::BuiltinNotFound(name.to_string()))
    }

    /// Hex SHA-256 of the built-in's exact bytes.
    pub fn hash(&self, name: &str) -> Result<String> {
        self.get(name).map(|c| content_hash(c.as_bytes()))
    }

    /// Copy a built-in into `dest_dir` as an override, prefixed with the
    /// managed header. Refuses to overwrite an existing file.
    pub fn copy_to(&self, name: &str, dest_dir: &Path) -> Result<PathBuf> {
        let name = strip_suffix(name);
        let content = self.get(name)?;
        let dest = dest_dir.join(format!("{name}{FORMULA_SUFFIX}"));
        if dest.exists() {
            return Err(FormulaError::AlreadyExists(dest));
        }

        std::fs::create_dir_all(dest_dir)?;
        let header = override_header(name, &content_hash(content.as_bytes()));
        std::fs::write(&dest, format!("{header}{content}"))?;
        debug!(name, dest = %dest.display(), "copied built-in formula");
        Ok(dest)
    }
}

fn strip_suffix(name: &str) -> &str {
    match name.strip_suffix(FORMULA_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Hex-encoded SHA-256 digest.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// The three managed comment lines plus a blank line.
pub fn override_header(name: &str, hash: &str) -> String {
    format!("{HEADER_AUTHOR}\n{HEADER_BASE}{hash}\n{HEADER_UPDATE} {name}\n\n")
}

/// The baseline hash recorded in an override's header, if any.
pub fn extract_base_hash(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(HEADER_BASE))
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

/// Remove leading managed header lines and the blank lines after them.
///
/// Returns the input unchanged if nothing would be left.
pub fn strip_override_header(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut start = 0;
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with("# Formula override created by")
            || trimmed.starts_with("# Based on embedded version:")
            || trimmed.starts_with(HEADER_UPDATE)
        {
            start = i + 1;
            continue;
        }
        break;
    }
    while start < lines.len() && lines[start].trim().is_empty() {
        start += 1;
    }

    if start >= lines.len() {
        return content.to_string();
    }
    lines[start..].join("\n")
}

/// First 12 characters of a hash, for display.
pub fn truncate_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}
