//! Positional line comparison used by `gt formula diff`.
//!
//! Lines are compared index-for-index. This is not an LCS diff: an inserted
//! line shifts every later line and shows up as a run of changes.

use serde::Serialize;

/// Maximum number of differences shown before collapsing the rest.
pub const MAX_SHOWN: usize = 20;

/// Display width of one side of a diff column.
pub const COLUMN_WIDTH: usize = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDiff {
    pub kind: DiffKind,
    pub line: usize,
    pub left: String,
    pub right: String,
}

/// Compare two texts line by line.
///
/// Pairs that are equal after trimming are skipped, which also skips a
/// blank line facing a missing one.
pub fn line_differences(left: &str, right: &str) -> Vec<LineDiff> {
    let l: Vec<&str> = left.split('\n').collect();
    let r: Vec<&str> = right.split('\n').collect();

    (0..l.len().max(r.len()))
        .filter_map(|i| {
            let a = l.get(i).copied().unwrap_or("");
            let b = r.get(i).copied().unwrap_or("");
            if a.trim() == b.trim() {
                return None;
            }
            let kind = if i >= l.len() {
                DiffKind::Added
            } else if i >= r.len() {
                DiffKind::Removed
            } else {
                DiffKind::Changed
            };
            Some(LineDiff {
                kind,
                line: i + 1,
                left: a.to_string(),
                right: b.to_string(),
            })
        })
        .collect()
}

/// Trim a line and cut it to `width` characters, ending in `...` when cut.
pub fn truncate_line(line: &str, width: usize) -> String {
    let line = line.trim();
    if line.chars().count() <= width {
        return line.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = line.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(diffs: &[LineDiff]) -> Vec<(usize, DiffKind)> {
        diffs.iter().map(|d| (d.line, d.kind)).collect()
    }

    #[test]
    fn identical_and_whitespace_only_changes_are_skipped() {
        assert!(line_differences("a\nb", "a\nb").is_empty());
        assert!(line_differences("  a\nb  ", "a\n  b").is_empty());
    }

    #[test]
    fn positional_classification() {
        let d = line_differences("a\nb\nc", "a\nB");
        assert_eq!(kinds(&d), vec![(2, DiffKind::Changed), (3, DiffKind::Removed)]);

        let d = line_differences("a", "a\nnew");
        assert_eq!(kinds(&d), vec![(2, DiffKind::Added)]);
        assert_eq!(d[0].left, "");
        assert_eq!(d[0].right, "new");
    }

    #[test]
    fn trailing_blank_against_missing_is_skipped() {
        assert!(line_differences("a\n", "a").is_empty());
    }

    #[test]
    fn insertion_shifts_following_lines() {
        let d = line_differences("x\ny\nz", "w\nx\ny\nz");
        assert_eq!(
            kinds(&d),
            vec![
                (1, DiffKind::Changed),
                (2, DiffKind::Changed),
                (3, DiffKind::Changed),
                (4, DiffKind::Added),
            ]
        );
    }

    #[test]
    fn truncate_line_widths() {
        assert_eq!(truncate_line("  short  ", COLUMN_WIDTH), "short");
        let long = "x".repeat(40);
        let cut = truncate_line(&long, COLUMN_WIDTH);
        assert_eq!(cut.chars().count(), COLUMN_WIDTH);
        assert!(cut.ends_with("..."));
        assert_eq!(truncate_line("ééééé", 4), "é...");
    }
}
