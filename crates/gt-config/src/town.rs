//! Discovery of the town root.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Environment variable naming the town root explicitly.
pub const TOWN_ROOT_ENV: &str = "GT_ROOT";

/// Marker file, relative to the town root.
const TOWN_MARKER: [&str; 2] = ["mayor", "town.json"];

/// Find the town root for `start`.
///
/// `$GT_ROOT` wins when it names an existing directory. Otherwise walk up
/// from `start` until a directory containing `mayor/town.json` is found.
pub fn find_town_root(start: &Path) -> Option<PathBuf> {
    if let Ok(env_root) = std::env::var(TOWN_ROOT_ENV) {
        let env_root = PathBuf::from(env_root);
        if env_root.is_dir() {
            debug!(root = %env_root.display(), "town root from {TOWN_ROOT_ENV}");
            return Some(env_root);
        }
    }
    walk_up_for_town(start)
}

fn walk_up_for_town(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().ok()?;
    let found = start
        .ancestors()
        .find(|dir| dir.join(TOWN_MARKER[0]).join(TOWN_MARKER[1]).is_file())
        .map(Path::to_path_buf);
    if let Some(root) = &found {
        debug!(root = %root.display(), "found town root");
    }
    found
}

/// The user's home directory.
pub fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}
