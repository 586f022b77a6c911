use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{FALLBACK_DEFAULT_FONT, NAME_MAX_LENGTH, NAME_MIN_LENGTH};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderSettings,
    #[serde(default)]
    pub host: HostSettings,
    /// Extra generic-family substitutions, added to the built-in ones.
    #[serde(default)]
    pub substitutions: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderSettings {
    /// Application-private font directory, scanned after the system fonts.
    pub fonts_dir: Option<PathBuf>,
    pub fallback_family: String,
    pub name_max_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HostSettings {
    pub font_dirs: Vec<PathBuf>,
    pub include_system_dirs: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            fonts_dir: None,
            fallback_family: FALLBACK_DEFAULT_FONT.to_owned(),
            name_max_length: NAME_MAX_LENGTH,
        }
    }
}

impl ProviderSettings {
    /// The configured name buffer size, or the default when it is too small
    /// to hold any name.
    pub fn effective_name_max_length(&self) -> usize {
        if self.name_max_length < NAME_MIN_LENGTH {
            NAME_MAX_LENGTH
        } else {
            self.name_max_length
        }
    }
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            font_dirs: Vec::new(),
            include_system_dirs: true,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Config::default(),
        }
    }

    pub fn load_from(config_path: &Path) -> Self {
        if !config_path.exists() {
            return Config::default();
        }

        let content = match fs::read_to_string(config_path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Failed to read config file: {}", e);
                return Config::default();
            }
        };

        match toml::from_str::<Config>(&content) {
            Ok(mut config) => {
                let length = config.provider.name_max_length;
                if length < NAME_MIN_LENGTH {
                    log::warn!(
                        "name_max_length = {} is below {}, using {}",
                        length,
                        NAME_MIN_LENGTH,
                        NAME_MAX_LENGTH
                    );
                    config.provider.name_max_length = NAME_MAX_LENGTH;
                }
                config
            }
            Err(e) => {
                log::warn!("Failed to parse config file: {}", e);
                Config::default()
            }
        }
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fontbridge").join("config.toml"))
}
