//! Formula data model.
//!
//! Covers the fields the gt tooling reads from a formula: identity, type,
//! convoy legs, the synthesis step, prompt fragments, and the output policy.
//! Anything else in a formula file is ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Recognized formula file extensions, in lookup order.
pub const FORMULA_EXTENSIONS: [&str; 2] = [".formula.toml", ".formula.json"];

/// Suffix of the structured-text variant; built-ins and overrides use it.
pub const FORMULA_SUFFIX: &str = ".formula.toml";

/// Key of the prompt fragment rendered into each convoy leg.
pub const BASE_PROMPT: &str = "base";

/// A parsed formula.
///
/// Documents are cheap to build and never persisted; every command parses
/// the bytes it resolved and drops the result when done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaDocument {
    /// Formula identifier (the `formula` key).
    #[serde(rename = "formula", alias = "name", default)]
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Declared type; `None` when the file does not say.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub formula_type: Option<FormulaType>,

    /// Parallel units of a convoy, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legs: Vec<Leg>,

    /// Convergence step of a convoy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<Synthesis>,

    /// Named prompt fragments. Only [`BASE_PROMPT`] is consumed today.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub prompts: BTreeMap<String, String>,

    /// Where convoy results should be written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Output>,
}

impl FormulaDocument {
    /// Only convoy documents are executable.
    pub fn is_convoy(&self) -> bool {
        matches!(self.formula_type, Some(FormulaType::Convoy))
    }

    /// The declared type as written, or `""` when absent.
    pub fn type_name(&self) -> &str {
        self.formula_type.as_ref().map_or("", FormulaType::as_str)
    }

    pub fn base_prompt(&self) -> Option<&str> {
        self.prompts.get(BASE_PROMPT).map(String::as_str)
    }

    /// Drop constructs that carry no recognized data: legs without an id,
    /// a synthesis with neither title nor description, an empty output
    /// policy, and empty prompt fragments.
    pub(crate) fn normalize(mut self) -> Self {
        self.legs.retain(|leg| !leg.id.is_empty());
        if self.synthesis.as_ref().is_some_and(Synthesis::is_empty) {
            self.synthesis = None;
        }
        if self.output.as_ref().is_some_and(Output::is_empty) {
            self.output = None;
        }
        self.prompts.retain(|_, text| !text.is_empty());
        self
    }
}

/// Formula type.
///
/// Unknown values are preserved verbatim so they can be reported back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FormulaType {
    Task,
    Workflow,
    Convoy,
    Patrol,
    Aspect,
    Expansion,
    Other(String),
}

impl FormulaType {
    pub fn parse(s: &str) -> Self {
        match s {
            "task" => Self::Task,
            "workflow" => Self::Workflow,
            "convoy" => Self::Convoy,
            "patrol" => Self::Patrol,
            "aspect" => Self::Aspect,
            "expansion" => Self::Expansion,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Task => "task",
            Self::Workflow => "workflow",
            Self::Convoy => "convoy",
            Self::Patrol => "patrol",
            Self::Aspect => "aspect",
            Self::Expansion => "expansion",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for FormulaType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<FormulaType> for String {
    fn from(t: FormulaType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for FormulaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parallel unit of a convoy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    /// Unique within the document. Legs without one are discarded.
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Free-text guidance for whoever works the leg.
    #[serde(default)]
    pub focus: String,

    #[serde(default)]
    pub description: String,
}

/// The step that converges a convoy's legs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Declared leg ids. Informational: execution always makes the
    /// synthesis depend on every leg record that was actually created.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Synthesis {
    fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty()
    }
}

/// Output locations for convoy results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Template for the run's output directory.
    #[serde(default)]
    pub directory: String,

    /// Template for each leg's findings file, relative to `directory`.
    #[serde(default)]
    pub leg_pattern: String,

    /// Literal filename of the synthesis result.
    #[serde(default)]
    pub synthesis: String,
}

impl Output {
    fn is_empty(&self) -> bool {
        self.directory.is_empty() && self.leg_pattern.is_empty() && self.synthesis.is_empty()
    }
}

/// Where a resolved formula comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormulaSource {
    File,
    BuiltIn,
}

impl fmt::Display for FormulaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::BuiltIn => f.write_str("built-in"),
        }
    }
}

/// Result of resolving a formula name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaLocation {
    /// File path, or the bare formula name for built-ins.
    pub path: PathBuf,
    pub source: FormulaSource,
}

impl FormulaLocation {
    pub fn is_builtin(&self) -> bool {
        self.source == FormulaSource::BuiltIn
    }
}

/// Errors from formula lookup and loading.
#[derive(Debug, thiserror::Error)]
pub enum FormulaError {
    #[error("formula '{0}' not found in search paths or built-ins")]
    NotFound(String),

    #[error("built-in formula '{0}' not found")]
    BuiltinNotFound(String),

    #[error("formula override already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormulaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_type_roundtrips_known_and_unknown() {
        assert_eq!(FormulaType::parse("convoy"), FormulaType::Convoy);
        assert_eq!(FormulaType::parse("patrol").as_str(), "patrol");
        let odd = FormulaType::parse("swarm");
        assert_eq!(odd, FormulaType::Other("swarm".into()));
        assert_eq!(odd.to_string(), "swarm");
    }

    #[test]
    fn normalize_drops_empty_constructs() {
        let doc = FormulaDocument {
            legs: vec![
                Leg { id: "a".into(), ..Default::default() },
                Leg { title: "no id".into(), ..Default::default() },
            ],
            synthesis: Some(Synthesis {
                depends_on: vec!["a".into()],
                ..Default::default()
            }),
            output: Some(Output::default()),
            ..Default::default()
        }
        .normalize();

        assert_eq!(doc.legs.len(), 1);
        assert!(doc.synthesis.is_none());
        assert!(doc.output.is_none());
    }

    #[test]
    fn type_name_is_empty_when_undeclared() {
        let doc = FormulaDocument::default();
        assert_eq!(doc.type_name(), "");
        assert!(!doc.is_convoy());
    }
}
