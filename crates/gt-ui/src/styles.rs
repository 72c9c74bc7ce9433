//! Colours and symbols for gt output.
//!
//! Palette is Ayu Dark (<https://github.com/ayu-theme/ayu-colors>). Only
//! states that need attention get colour; paths and hints are muted.

use owo_colors::OwoColorize;

use crate::terminal::supports_color;

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

const PASS: (u8, u8, u8) = (0xc2, 0xd9, 0x4c); // #c2d94c
const WARN: (u8, u8, u8) = (0xff, 0xb4, 0x54); // #ffb454
const MUTED: (u8, u8, u8) = (0x6c, 0x76, 0x80); // #6c7680
const ACCENT: (u8, u8, u8) = (0x59, 0xc2, 0xff); // #59c2ff

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

pub const ICON_PASS: &str = "\u{2713}"; // ✓
pub const ICON_ACTIVE: &str = "\u{25C4}"; // ◄
pub const BULLET: &str = "\u{2022}"; // •

/// Light rule under list headings.
pub const RULE_LIGHT: &str = "──────────────────────";

// ---------------------------------------------------------------------------
// Render helpers
// ---------------------------------------------------------------------------

fn paint(s: &str, rgb: (u8, u8, u8), enabled: bool) -> String {
    if enabled {
        s.truecolor(rgb.0, rgb.1, rgb.2).to_string()
    } else {
        s.to_string()
    }
}

pub fn render_pass(s: &str) -> String {
    paint(s, PASS, supports_color())
}

pub fn render_warn(s: &str) -> String {
    paint(s, WARN, supports_color())
}

/// Secondary text: paths, hints, counts.
pub fn render_muted(s: &str) -> String {
    paint(s, MUTED, supports_color())
}

pub fn render_accent(s: &str) -> String {
    paint(s, ACCENT, supports_color())
}

pub fn render_bold(s: &str) -> String {
    if supports_color() {
        s.bold().to_string()
    } else {
        s.to_string()
    }
}

/// Section heading: bold accent.
pub fn render_heading(s: &str) -> String {
    if supports_color() {
        s.truecolor(ACCENT.0, ACCENT.1, ACCENT.2).bold().to_string()
    } else {
        s.to_string()
    }
}

/// `✓ msg` in the pass colour.
pub fn render_success(msg: &str) -> String {
    format!("{} {msg}", render_pass(ICON_PASS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn paint_is_identity_without_color() {
        assert_eq!(paint("path", MUTED, false), "path");
    }

    #[test]
    fn paint_wraps_in_truecolor_escape() {
        let s = paint("ok", PASS, true);
        assert!(s.starts_with("\u{1b}[38;2;194;217;76m"));
        assert!(s.contains("ok"));
    }

    #[test]
    fn rule_is_twenty_two_columns() {
        assert_eq!(RULE_LIGHT.chars().count(), 22);
    }
}
