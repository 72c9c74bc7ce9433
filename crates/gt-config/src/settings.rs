//! Layered `settings/config.json` values.
//!
//! Defaults are overlaid by `<town>/settings/config.json`, then by
//! `<town>/<rig>/settings/config.json`. Missing files are skipped; keys gt
//! does not know about are ignored.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Json, Serialized};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Agent used for one-shot work such as `gt formula update`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_agent: Option<String>,

    #[serde(default)]
    pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Formula `gt formula run` uses when none is named.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_formula: Option<String>,
}

/// `<dir>/settings/config.json`.
pub fn settings_path(dir: &Path) -> PathBuf {
    dir.join("settings").join("config.json")
}

impl Settings {
    /// Town-level settings only.
    pub fn load_town(town_root: &Path) -> Result<Self> {
        Self::load_layers(&[settings_path(town_root)])
    }

    /// Town settings overlaid by a rig's settings.
    pub fn load_rig(town_root: &Path, rig_dir: &Path) -> Result<Self> {
        Self::load_layers(&[settings_path(town_root), settings_path(rig_dir)])
    }

    fn load_layers(files: &[PathBuf]) -> Result<Self> {
        let figment = files.iter().fold(
            Figment::from(Serialized::defaults(Settings::default())),
            |fig, file| {
                debug!(path = %file.display(), exists = file.is_file(), "settings layer");
                fig.merge(Json::file(file))
            },
        );
        Ok(figment.extract().map_err(Box::new)?)
    }

    pub fn default_formula(&self) -> Option<&str> {
        self.workflow.default_formula.as_deref().filter(|s| !s.is_empty())
    }

    pub fn default_agent(&self) -> Option<&str> {
        self.default_agent.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_settings(dir: &Path, json: &str) {
        let path = settings_path(dir);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, json).unwrap();
    }

    #[test]
    fn missing_files_give_defaults() {
        let town = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load_town(town.path()).unwrap(), Settings::default());
    }

    #[test]
    fn rig_layer_overrides_town() {
        let town = tempfile::tempdir().unwrap();
        let rig = town.path().join("gastown");
        write_settings(
            town.path(),
            r#"{"default_agent": "claude", "workflow": {"default_formula": "town-one"}, "theme": "dark"}"#,
        );
        write_settings(&rig, r#"{"workflow": {"default_formula": "code-review"}}"#);

        let s = Settings::load_rig(town.path(), &rig).unwrap();
        assert_eq!(s.default_formula(), Some("code-review"));
        assert_eq!(s.default_agent(), Some("claude"));

        let t = Settings::load_town(town.path()).unwrap();
        assert_eq!(t.default_formula(), Some("town-one"));
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let town = tempfile::tempdir().unwrap();
        write_settings(town.path(), r#"{"default_agent": "", "workflow": {"default_formula": ""}}"#);
        let s = Settings::load_town(town.path()).unwrap();
        assert_eq!(s.default_agent(), None);
        assert_eq!(s.default_formula(), None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let town = tempfile::tempdir().unwrap();
        write_settings(town.path(), "{ nope");
        assert!(Settings::load_town(town.path()).is_err());
    }
}
