//! Parses config file
use std::{
    env,
    fs::OpenOptions,
    io::Read,
    path::{Path, PathBuf},
    str::FromStr,
};

use eyre::eyre;
use log::LevelFilter;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub log_level: String,
    /// Where `atlas` and `frames` write when no output is given.
    pub output_dir: Option<PathBuf>,
    pub pretty_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            output_dir: None,
            pretty_json: true,
        }
    }
}

impl Config {
    pub fn level_filter(&self) -> eyre::Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| eyre!("Unknown log level `{}`", self.log_level))
    }
}

pub static CONFIG_FILE_NAME: &str = "config.toml";

/// Parse `config.toml` in the same folder as the binary, if there is one.
pub fn parse_config() -> eyre::Result<Config> {
    let path = match env::current_exe() {
        Ok(path) => path
            .parent()
            .map(|parent| parent.join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
        Err(_) => PathBuf::from(CONFIG_FILE_NAME),
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    parse_config_from_file(path.as_path())
}

pub fn parse_config_from_file(path: &Path) -> eyre::Result<Config> {
    let mut file = OpenOptions::new().read(true).open(path.as_os_str())?;
    let mut buffer = String::new();

    file.read_to_string(&mut buffer)?;

    parse_config_from_str(&buffer)
}

pub fn parse_config_from_str(s: &str) -> eyre::Result<Config> {
    let config: Config = toml::from_str(s)?;

    // fail early rather than when the logger starts
    config.level_filter()?;

    Ok(config)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(parse_config_from_str("").unwrap(), Config::default());
    }

    #[test]
    fn all_fields() {
        let config = parse_config_from_str(
            "\
log_level = \"debug\"
output_dir = \"out\"
pretty_json = false
",
        )
        .unwrap();

        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert!(!config.pretty_json);
    }

    #[test]
    fn bad_level() {
        assert!(parse_config_from_str("log_level = \"loud\"").is_err());
    }
}
