use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::Level;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_COMMAND: &str = "kscreen-doctor";
const DEFAULT_STORE: &str = "~/.config/monitor_config";

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

fn default_store() -> String {
    DEFAULT_STORE.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_command")]
    pub command: String,

    #[serde(default = "default_store")]
    store: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command: default_command(),
            store: default_store(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(expand_filename(&self.store))
    }

    // Unknown names fall back to the default level
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::WARN)
    }
}

pub fn parse(config_str: &str) -> anyhow::Result<Settings> {
    Ok(toml::from_str(config_str)?)
}

/// Loads settings from the given file, or from the default location if none
/// is given. A missing default file means default settings.
pub fn load(config_option: Option<&Path>) -> anyhow::Result<Settings> {
    let config_filename = match config_option {
        Some(path) => {
            let path = expand_filename(&path.to_string_lossy());

            if !Path::new(&path).exists() {
                bail!("Config file {path} doesn't exist");
            }

            path
        }

        None => match locate_config_file() {
            Some(path) => path,
            None => return Ok(Settings::default()),
        },
    };

    let config_str = fs::read_to_string(&config_filename)
        .with_context(|| format!("Failed to open config file {config_filename}"))?;

    parse(&config_str)
        .with_context(|| format!("Failed to parse config file {config_filename}"))
}

fn locate_config_file() -> Option<String> {
    if let Ok(default_dir) = env::var("XDG_CONFIG_HOME") {
        let default_config =
            format!("{default_dir}/kscreen-layout/kscreen-layout.toml");

        if Path::new(&default_config).exists() {
            return Some(default_config);
        }
    }

    if let Ok(specified_config) = env::var("KSCREEN_LAYOUT_CONFIG_PATH") {
        if Path::new(&specified_config).exists() {
            return Some(specified_config);
        }
    }

    None
}

// Expands environment variables and `~`; anything that can't be expanded is
// kept as is
pub fn expand_filename(filename: &str) -> String {
    let filename = shellexpand::env(filename)
        .map(|x| x.into_owned())
        .unwrap_or_else(|_| filename.to_string());

    shellexpand::tilde(&filename).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        assert_eq!(parse("").unwrap(), Settings::default());
    }

    #[test]
    fn parse_config_works() {
        let settings = parse(
            r#"
            command = "/usr/bin/kscreen-doctor"
            store = "/tmp/monitors"
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(settings.command, "/usr/bin/kscreen-doctor");
        assert_eq!(settings.store_path(), PathBuf::from("/tmp/monitors"));
        assert_eq!(settings.level(), Level::DEBUG);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse("colour = \"red\"").is_err());
    }

    #[test]
    fn bad_log_level_falls_back() {
        let settings = parse("log_level = \"chatty\"").unwrap();

        assert_eq!(settings.level(), Level::WARN);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/kscreen-layout.toml"))).is_err());
    }

    #[test]
    fn expand_filename_works() {
        env::set_var("KSCREEN_LAYOUT_TEST_DIR", "/data");

        assert_eq!(
            expand_filename("$KSCREEN_LAYOUT_TEST_DIR/monitor_config"),
            "/data/monitor_config"
        );
        assert_eq!(
            expand_filename("$KSCREEN_LAYOUT_UNSET_VAR/x"),
            "$KSCREEN_LAYOUT_UNSET_VAR/x"
        );
    }
}
