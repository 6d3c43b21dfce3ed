use log::{LevelFilter, debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::document::DocumentIdentity;
use crate::highlight::HighlightColor;
use crate::selection::MIN_HIGHLIGHT_SIZE;
use crate::zoom::Zoom;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
pub const APP_NAME: &str = "pagemark";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Root for the highlights/ and bookmarks/ sidecar directories
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_scale")]
    pub default_scale: f64,

    #[serde(default)]
    pub default_color: HighlightColor,

    #[serde(default = "default_min_highlight_size")]
    pub min_highlight_size: f64,

    #[serde(default)]
    pub document_identity: DocumentIdentity,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_scale() -> f64 {
    Zoom::DEFAULT_SCALE
}

fn default_min_highlight_size() -> f64 {
    MIN_HIGHLIGHT_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            data_dir: None,
            default_scale: default_scale(),
            default_color: HighlightColor::default(),
            min_highlight_size: default_min_highlight_size(),
            document_identity: DocumentIdentity::default(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            LevelFilter::Info
        })
    }

    /// Replace out-of-range values with defaults
    fn sanitize(&mut self) {
        let scale = Zoom::clamp_factor(self.default_scale);
        if scale != self.default_scale {
            warn!(
                "default_scale {} out of range, using {scale}",
                self.default_scale
            );
            self.default_scale = scale;
        }
        if !(self.min_highlight_size.is_finite() && self.min_highlight_size > 0.0) {
            warn!(
                "min_highlight_size {} must be positive, using {MIN_HIGHLIGHT_SIZE}",
                self.min_highlight_size
            );
            self.min_highlight_size = MIN_HIGHLIGHT_SIZE;
        }
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from `path`, or from the default location when `None`.
/// A missing file is created with defaults.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match preferred_config_path() {
            Some(path) => path,
            None => {
                warn!("Could not determine config directory, using default settings");
                return Settings::default();
            }
        },
    };

    if path.exists() {
        load_settings_from_path(&path)
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        let settings = Settings::default();
        save_settings_to_file(&settings, &path);
        settings
    }
}

fn load_settings_from_path(path: &Path) -> Settings {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
            return Settings::default();
        }
    };

    match serde_yaml::from_str::<Settings>(&content) {
        Ok(mut settings) => {
            debug!("Loaded settings from {path:?}");
            if settings.version < CURRENT_VERSION {
                migrate_settings(&mut settings);
                save_settings_to_file(&settings, path);
            }
            settings.sanitize();
            settings
        }
        Err(e) => {
            error!("Failed to parse settings file {path:?}: {e}");
            Settings::default()
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );
    settings.version = CURRENT_VERSION;
}

pub fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    match fs::write(path, generate_settings_yaml(settings)) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

/// YAML single-quoted scalar: no escape sequences, `'` is doubled
fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn generate_settings_yaml(settings: &Settings) -> String {
    let mut content = String::new();

    content.push_str(&format!("version: {}\n", settings.version));
    content.push('\n');
    content.push_str("# Where highlights/ and bookmarks/ are stored. Empty uses the\n");
    content.push_str("# platform data directory.\n");
    match &settings.data_dir {
        Some(dir) => content.push_str(&format!(
            "data_dir: {}\n",
            single_quoted(&dir.to_string_lossy())
        )),
        None => content.push_str("data_dir: ~\n"),
    }
    content.push('\n');
    content.push_str("# Render scale for newly opened documents (0.5 - 3.0)\n");
    content.push_str(&format!("default_scale: {}\n", settings.default_scale));
    content.push_str("# yellow, green, blue, pink, orange or purple\n");
    content.push_str(&format!(
        "default_color: \"{}\"\n",
        settings.default_color.name()
    ));
    content.push_str("# Smallest drag, in screen pixels, that creates a highlight\n");
    content.push_str(&format!(
        "min_highlight_size: {}\n",
        settings.min_highlight_size
    ));
    content.push('\n');
    content.push_str("# base_name: documents with the same file name share annotations\n");
    content.push_str("# path_hash: annotations are keyed by the document's full path\n");
    let identity = match settings.document_identity {
        DocumentIdentity::BaseName => "base_name",
        DocumentIdentity::PathHash => "path_hash",
    };
    content.push_str(&format!("document_identity: {identity}\n"));
    content.push('\n');
    content.push_str(&format!("log_level: {}\n", settings.log_level));

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("pagemark").join("config.yaml");

        let settings = load_settings(Some(path.as_path()));
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
    }

    #[test]
    fn test_generated_yaml_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        let settings = Settings {
            data_dir: Some(PathBuf::from("/srv/annotations")),
            default_scale: 2.0,
            default_color: HighlightColor::Orange,
            document_identity: DocumentIdentity::PathHash,
            log_level: "debug".to_string(),
            ..Settings::default()
        };

        save_settings_to_file(&settings, &path);
        assert_eq!(load_settings(Some(path.as_path())), settings);
    }

    #[test]
    fn test_data_dir_with_backslashes_and_quotes_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");

        for dir in [r"C:\Users\me\notes", r#"/srv/it's "quoted"\dir"#] {
            let settings = Settings {
                data_dir: Some(PathBuf::from(dir)),
                ..Settings::default()
            };
            save_settings_to_file(&settings, &path);
            assert_eq!(load_settings(Some(path.as_path())).data_dir, Some(PathBuf::from(dir)));
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "version: 1\ndefault_color: \"#87CEEB\"\n").unwrap();

        let settings = load_settings(Some(path.as_path()));
        assert_eq!(settings.default_color, HighlightColor::Blue);
        assert_eq!(settings.default_scale, 1.5);
        assert_eq!(settings.document_identity, DocumentIdentity::BaseName);
    }

    #[test]
    fn test_out_of_range_values_sanitized() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "default_scale: 9.0\nmin_highlight_size: -2\n").unwrap();

        let settings = load_settings(Some(path.as_path()));
        assert_eq!(settings.default_scale, 3.0);
        assert_eq!(settings.min_highlight_size, MIN_HIGHLIGHT_SIZE);
    }

    #[test]
    fn test_unparsable_file_falls_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(&path, "default_scale: [not, a, number]\n").unwrap();

        assert_eq!(load_settings(Some(path.as_path())), Settings::default());
    }

    #[test]
    fn test_log_level_filter() {
        let settings = Settings {
            log_level: "warn".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.log_level_filter(), LevelFilter::Warn);

        let settings = Settings {
            log_level: "chatty".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.log_level_filter(), LevelFilter::Info);
    }
}
