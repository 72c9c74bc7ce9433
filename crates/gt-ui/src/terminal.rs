//! Terminal detection.

use std::env;

/// Whether stdout is a terminal.
pub fn is_tty() -> bool {
    crossterm::tty::IsTty::is_tty(&std::io::stdout())
}

/// Whether to emit ANSI colour.
///
/// `NO_COLOR` (any value), `CLICOLOR=0` and `TERM=dumb` disable colour;
/// `CLICOLOR_FORCE` enables it even when piped. Otherwise colour follows
/// [`is_tty`].
pub fn supports_color() -> bool {
    color_from_env(|key| env::var(key).ok(), is_tty)
}

fn color_from_env(var: impl Fn(&str) -> Option<String>, tty: impl Fn() -> bool) -> bool {
    if var("NO_COLOR").is_some() {
        return false;
    }
    if var("CLICOLOR").as_deref() == Some("0") {
        return false;
    }
    if var("TERM").as_deref() == Some("dumb") {
        return false;
    }
    if var("CLICOLOR_FORCE").is_some() {
        return true;
    }
    tty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(vars: &'static [(&'static str, &'static str)], tty: bool) -> bool {
        color_from_env(
            |key| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string()),
            || tty,
        )
    }

    #[test]
    fn no_color_wins_over_force() {
        assert!(!with(&[("NO_COLOR", ""), ("CLICOLOR_FORCE", "1")], true));
    }

    #[test]
    fn dumb_terminal_and_clicolor_zero_disable() {
        assert!(!with(&[("TERM", "dumb")], true));
        assert!(!with(&[("CLICOLOR", "0")], true));
    }

    #[test]
    fn force_enables_when_piped() {
        assert!(with(&[("CLICOLOR_FORCE", "1")], false));
        assert!(!with(&[], false));
        assert!(with(&[], true));
    }
}
