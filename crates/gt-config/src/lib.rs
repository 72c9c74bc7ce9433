//! Configuration for gt.
//!
//! A **town** is the root of a gt workspace, marked by `mayor/town.json`
//! (or named by `$GT_ROOT`). A **rig** is a project directory directly
//! under the town, registered in `mayor/rigs.json`. Settings are read from
//! `settings/config.json` at the town and rig levels.

pub mod rigs;
pub mod settings;
pub mod town;

use thiserror::Error;

pub use rigs::RigRegistry;
pub use settings::Settings;
pub use town::{find_town_root, home_dir};

/// Errors from configuration discovery and loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("not in a gt workspace (no mayor/town.json found; set GT_ROOT to override)")]
    TownNotFound,

    #[error("cannot determine home directory")]
    NoHomeDir,

    #[error("invalid settings: {0}")]
    Settings(#[from] Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
