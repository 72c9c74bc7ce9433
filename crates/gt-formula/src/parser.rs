//! Build [`FormulaDocument`]s from raw formula bytes, and write them back.
//!
//! Parsing never fails on content: well-formed TOML is decoded with the
//! `toml` crate, and anything it rejects goes through the structural
//! extractor, which leaves unrecognized or malformed fields at their
//! defaults. Only reading a file can fail.

use std::path::Path;

use tracing::debug;

use crate::extract::extract;
use crate::types::{FormulaDocument, FormulaType, Leg, Output, Result, Synthesis};

/// Parse formula bytes.
///
/// Input that looks like a JSON object is decoded as the plain-object
/// variant first; anything else, including JSON that fails to decode, is
/// handled by [`parse_text`].
pub fn parse(raw: &[u8]) -> FormulaDocument {
    let text = String::from_utf8_lossy(raw);
    if text.trim_start().starts_with('{') {
        match parse_json(&text) {
            Ok(doc) => return doc,
            Err(e) => debug!(error = %e, "formula is not valid JSON, using text parser"),
        }
    }
    parse_text(&text)
}

/// Decode the plain-object variant.
pub fn parse_json(text: &str) -> std::result::Result<FormulaDocument, serde_json::Error> {
    serde_json::from_str::<FormulaDocument>(text).map(FormulaDocument::normalize)
}

/// Decode the structured-text variant.
pub fn parse_toml(text: &str) -> std::result::Result<FormulaDocument, toml::de::Error> {
    toml::from_str::<FormulaDocument>(text).map(|doc| doc.trim_text().normalize())
}

/// Parse the structured-text variant, falling back to the extractor when
/// the text is not valid TOML or a field has the wrong shape.
pub fn parse_text(text: &str) -> FormulaDocument {
    match parse_toml(text) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e.message(), "formula is not valid TOML, using text extractor");
            extract_text(text)
        }
    }
}

/// Recover the recognized fields from text the strict decoder rejected.
pub fn extract_text(text: &str) -> FormulaDocument {
    let ex = extract(text);

    let formula_type = match ex.root.str("type") {
        "" => None,
        t => Some(FormulaType::parse(t)),
    };

    let legs = ex
        .blocks("legs")
        .map(|t| Leg {
            id: t.str("id").to_string(),
            title: t.str("title").to_string(),
            focus: t.str("focus").to_string(),
            description: t.str("description").to_string(),
        })
        .collect();

    let synthesis = ex.section("synthesis").map(|t| Synthesis {
        title: t.str("title").to_string(),
        description: t.str("description").to_string(),
        depends_on: t.get("depends_on").map(|v| v.to_list()).unwrap_or_default(),
    });

    let prompts = ex
        .section("prompts")
        .map(|t| {
            t.entries()
                .map(|(k, v)| (k.to_string(), v.as_str().to_string()))
                .collect()
        })
        .unwrap_or_default();

    let output = ex.section("output").map(|t| Output {
        directory: t.str("directory").to_string(),
        leg_pattern: t.str("leg_pattern").to_string(),
        synthesis: t.str("synthesis").to_string(),
    });

    FormulaDocument {
        name: ex.root.str("formula").to_string(),
        description: ex.root.str("description").to_string(),
        formula_type,
        legs,
        synthesis,
        prompts,
        output,
    }
    .normalize()
}

/// Read and parse a formula file.
pub fn load(path: &Path) -> Result<FormulaDocument> {
    let raw = std::fs::read(path)?;
    debug!(path = %path.display(), bytes = raw.len(), "loaded formula");
    Ok(parse(&raw))
}

impl FormulaDocument {
    /// Trim the free-text fields. A `"""` block keeps the line break before
    /// its closing delimiter, which the extractor never reports.
    fn trim_text(mut self) -> Self {
        trim_in_place(&mut self.description);
        for leg in &mut self.legs {
            trim_in_place(&mut leg.description);
        }
        if let Some(syn) = &mut self.synthesis {
            trim_in_place(&mut syn.description);
        }
        for text in self.prompts.values_mut() {
            trim_in_place(text);
        }
        self
    }

    /// Render the document in the structured-text form, using only the
    /// recognized fields.
    pub fn to_source(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}
