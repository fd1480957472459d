use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::io;

/// Name of the optional per-project override file, looked up in the root.
pub const OVERRIDES_FILE: &str = "drobo.json";

/// Layout and tool settings that can be overridden via drobo.json.
///
/// Every field has a default matching the standard Drupal project template,
/// so most projects never need the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Drush binary, relative to the project root unless absolute or bare.
    pub drush: String,
    pub npm: String,
    pub composer: String,
    /// Program used to launch parallel members; defaults to this executable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,

    pub web_dir: String,
    pub config_sync_dir: String,
    pub custom_translations_dir: String,
    pub backups_dir: String,
    pub themes_dir: String,

    pub base_langcode: String,
    pub base_theme: String,
    pub install_profile: String,

    pub database: DatabaseDefaults,
}

/// Settings for importing external dumps with `external-db`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseDefaults {
    pub dump_glob: String,
    pub user: String,
    pub password: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            drush: "vendor/bin/drush".to_string(),
            npm: "vendor/bin/npm".to_string(),
            composer: "composer".to_string(),
            runner: None,
            web_dir: "web".to_string(),
            config_sync_dir: "config/sync".to_string(),
            custom_translations_dir: "custom_translations".to_string(),
            backups_dir: "backups".to_string(),
            themes_dir: "web/themes/custom".to_string(),
            base_langcode: "en".to_string(),
            base_theme: "bartik".to_string(),
            install_profile: "kickstart".to_string(),
            database: DatabaseDefaults::default(),
        }
    }
}

impl Default for DatabaseDefaults {
    fn default() -> Self {
        Self {
            dump_glob: "myblobs/*.mysql.bck.gz".to_string(),
            user: "db".to_string(),
            password: "db".to_string(),
        }
    }
}

/// Load defaults, applying `<root>/drobo.json` when present.
pub fn load(root: &Path) -> Result<Defaults> {
    let path = root.join(OVERRIDES_FILE);
    match io::read_optional_file(&path)? {
        Some(content) => serde_json::from_str(&content)
            .map_err(|e| Error::config_invalid_json(path.display().to_string(), e)),
        None => Ok(Defaults::default()),
    }
}
