use crate::artifact::TimeSource;
use crate::error::Result;
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Base directory holding one sub-directory per collection.
    pub image_dir: PathBuf,
    #[serde(default)]
    pub time_source: TimeSource,
    #[serde(default = "default_slush_secs")]
    pub slush_secs: u64,
    #[serde(default = "default_future_slack_secs")]
    pub future_slack_secs: u64,
    #[serde(default = "default_max_empty_days")]
    pub max_empty_days: u32,
    #[serde(default = "default_max_lookback_days")]
    pub max_lookback_days: u32,
    #[serde(default)]
    pub collections: BTreeMap<String, CollectionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    #[serde(default)]
    pub display_name: Option<String>,
    /// Glob matched against file names inside a day partition.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            display_name: None,
            file_pattern: default_file_pattern(),
        }
    }
}

fn default_slush_secs() -> u64 {
    120
}

fn default_future_slack_secs() -> u64 {
    600
}

fn default_max_empty_days() -> u32 {
    31
}

fn default_max_lookback_days() -> u32 {
    3 * 365
}

fn default_file_pattern() -> String {
    "*".to_string()
}

impl AppConfig {
    /// Config with every tunable at its default and no collections.
    pub fn new(image_dir: impl Into<PathBuf>) -> Self {
        Self {
            image_dir: image_dir.into(),
            time_source: TimeSource::default(),
            slush_secs: default_slush_secs(),
            future_slack_secs: default_future_slack_secs(),
            max_empty_days: default_max_empty_days(),
            max_lookback_days: default_max_lookback_days(),
            collections: BTreeMap::new(),
        }
    }

    pub fn with_collection(mut self, id: &str, collection: CollectionConfig) -> Self {
        self.collections.insert(id.to_string(), collection);
        self
    }
}

/// Load `Config.toml` (or `path`, when given) overlaid by `CAPTURE_INDEX__*`
/// environment variables.
pub fn load_configuration(path: Option<&str>) -> Result<AppConfig> {
    let file_source = match path {
        Some(path) => ConfigFile::with_name(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(Environment::with_prefix("CAPTURE_INDEX").separator("__"))
        .build()?;
    Ok(builder.try_deserialize::<AppConfig>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn parse(toml: &str) -> AppConfig {
        Config::builder()
            .add_source(ConfigFile::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = parse(
            r#"
            image_dir = "/tmp/infrasound"

            [collections.pavlof]
            display_name = "Pavlof"
            "#,
        );
        assert_eq!(config.image_dir, PathBuf::from("/tmp/infrasound"));
        assert_eq!(config.time_source, TimeSource::Name);
        assert_eq!(config.slush_secs, 120);
        assert_eq!(config.future_slack_secs, 600);
        assert_eq!(config.max_empty_days, 31);
        assert_eq!(config.max_lookback_days, 1095);
        assert_eq!(config.collections["pavlof"].file_pattern, "*");
        assert_eq!(
            config.collections["pavlof"].display_name.as_deref(),
            Some("Pavlof")
        );
    }

    #[test]
    fn test_explicit_values() {
        let config = parse(
            r#"
            image_dir = "/srv/images"
            time_source = "mtime"
            slush_secs = 30
            max_empty_days = 3

            [collections.semi]
            display_name = "Semisopochnoi"
            file_pattern = "*.png"
            "#,
        );
        assert_eq!(config.time_source, TimeSource::Mtime);
        assert_eq!(config.slush_secs, 30);
        assert_eq!(config.max_empty_days, 3);
        let semi = &config.collections["semi"];
        assert_eq!(semi.display_name.as_deref(), Some("Semisopochnoi"));
        assert_eq!(semi.file_pattern, "*.png");
    }

    #[test]
    fn test_missing_config_file_is_a_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("absent.toml");
        let result = load_configuration(path.to_str());
        assert!(matches!(result, Err(crate::error::Error::Config(_))));
    }

    #[test]
    fn test_missing_image_dir_is_an_error() {
        let result = Config::builder()
            .add_source(ConfigFile::from_str("slush_secs = 5", FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<AppConfig>();
        assert!(result.is_err());
    }
}
