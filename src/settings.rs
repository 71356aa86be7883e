//! Program settings, read from `settings.toml` in the user's config directory.
//!
//! Settings apply to every run, whichever model is being solved. The equivalent command-line flags
//! can switch `overwrite` and `debug_model` on for a single run.
use crate::get_resite_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::Result;
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for resite.
# Every setting is optional. Uncomment a line to change its value.
";

/// Location of the settings file
pub fn get_settings_file_path() -> PathBuf {
    get_resite_config_dir().join(SETTINGS_FILE_NAME)
}

/// Settings shared by all runs
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Log level used unless `RESITE_LOG_LEVEL` is set
    pub log_level: String,
    /// Replace an existing output folder instead of failing
    pub overwrite: bool,
    /// Also write the existing capacity fractions and generation potentials used in the model
    pub debug_model: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            overwrite: false,
            debug_model: false,
        }
    }
}

impl Settings {
    /// Load the settings file, falling back to defaults if there isn't one
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if file_path.is_file() {
            read_toml(file_path)
        } else {
            Ok(Settings::default())
        }
    }

    /// A settings file listing every setting with its documentation and default value.
    ///
    /// Values are commented out, so the file is equivalent to having no settings file.
    pub fn default_file_contents() -> String {
        let defaults = toml::Table::try_from(Settings::default())
            .expect("Settings always serialise to a TOML table");

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for (field, value) in defaults {
            let docs = Settings::get_field_docs(&field).expect("Every setting has a doc comment");
            out.push('\n');
            for line in docs.lines() {
                out.push_str(&format!("# # {}\n", line.trim()));
            }
            out.push_str(&format!("# {field} = {value}\n"));
        }

        out
    }
}
