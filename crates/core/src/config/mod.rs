//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (FEEDTR_*)
//! 2. Feed config file (JSON, or TOML for `.toml` files) or JSON on stdin
//! 3. Built-in defaults

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// A configured output to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    /// Name of the output to be written (typically a file name).
    #[serde(alias = "Name")]
    pub name: String,

    /// URL of the source feed to be fetched and transformed.
    #[serde(alias = "Source")]
    pub source: String,

    /// Transforms to apply to the feed, in order (file names under the
    /// transforms directory).
    #[serde(alias = "Transforms", default)]
    pub transforms: Vec<String>,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (FEEDTR_*)
/// 2. The feed config file or stdin document
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// The outputs to be produced.
    // Skipped when empty so the serialized defaults never collide with the
    // legacy `Outputs` spelling.
    #[serde(alias = "Outputs", default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Output>,

    /// Directory holding cached source feeds.
    ///
    /// Set via FEEDTR_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Directory transformed outputs are written to.
    ///
    /// Set via FEEDTR_OUTPUTS_DIR environment variable.
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: PathBuf,

    /// Directory transforms are loaded from.
    ///
    /// Set via FEEDTR_TRANSFORMS_DIR environment variable.
    #[serde(default = "default_transforms_dir")]
    pub transforms_dir: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via FEEDTR_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via FEEDTR_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per source.
    ///
    /// Set via FEEDTR_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Maximum number of sources fetched concurrently.
    ///
    /// Set via FEEDTR_FETCH_LIMIT environment variable.
    #[serde(default = "default_limit")]
    pub fetch_limit: usize,

    /// Maximum number of outputs processed concurrently.
    ///
    /// Set via FEEDTR_PROCESS_LIMIT environment variable.
    #[serde(default = "default_limit")]
    pub process_limit: usize,

    /// Command used to apply `.xsl`/`.xslt` transforms.
    ///
    /// Set via FEEDTR_XSLT_COMMAND environment variable.
    #[serde(default = "default_xslt_command")]
    pub xslt_command: String,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_outputs_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_transforms_dir() -> PathBuf {
    PathBuf::from("transforms")
}

fn default_user_agent() -> String {
    "FeedTransformer/1 (https://github.com/philr/feedtransformer)".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_limit() -> usize {
    100
}

fn default_xslt_command() -> String {
    "xsltproc".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            cache_dir: default_cache_dir(),
            outputs_dir: default_outputs_dir(),
            transforms_dir: default_transforms_dir(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            fetch_limit: default_limit(),
            process_limit: default_limit(),
            xslt_command: default_xslt_command(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Returns the deduplicated source URLs referenced by the outputs.
    pub fn distinct_sources(&self) -> BTreeSet<String> {
        self.outputs.iter().map(|o| o.source.clone()).collect()
    }

    /// Load configuration from a feed config file, then environment overrides.
    ///
    /// Relative directories from the file (or its defaults) are resolved
    /// against the directory containing the config file. Directories set
    /// through `FEEDTR_*` variables are used as given.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be read or parsed, or if
    /// validation fails after loading.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.display(), e)))?;

        let is_toml = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let figment = Figment::from(Serialized::defaults(Self::default()));
        let figment =
            if is_toml { figment.merge(Toml::string(&contents)) } else { figment.merge(Json::string(&contents)) };

        let mut from_file: Self = figment
            .extract()
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.display(), e)))?;

        // Only directories written in the file are rebased; environment
        // overrides keep the working directory as their base.
        if let Some(base) = path.parent() {
            from_file.resolve_relative_to(base);
        }

        let config = Self::extract(Figment::from(Serialized::defaults(from_file)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON document (typically read from stdin),
    /// then environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the document cannot be parsed or validation
    /// fails.
    pub fn load_json(json: &str) -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Self::default())).merge(Json::string(json));
        let config = Self::extract(figment)?;
        config.validate()?;
        Ok(config)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let figment = figment.merge(
            Env::prefixed("FEEDTR_")
                .filter(|key| !key.as_str().eq_ignore_ascii_case("config_file"))
                .map(|key| key.as_str().to_lowercase().into()),
        );
        figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))
    }

    /// Rebase relative store directories onto `base`.
    fn resolve_relative_to(&mut self, base: &Path) {
        for dir in [&mut self.cache_dir, &mut self.outputs_dir, &mut self.transforms_dir] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(name: &str, source: &str) -> Output {
        Output { name: name.into(), source: source.into(), transforms: Vec::new() }
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.outputs.is_empty());
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.outputs_dir, PathBuf::from("outputs"));
        assert_eq!(config.transforms_dir, PathBuf::from("transforms"));
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.fetch_limit, 100);
        assert_eq!(config.process_limit, 100);
        assert_eq!(config.xslt_command, "xsltproc");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_distinct_sources_deduplicates() {
        let config = AppConfig {
            outputs: vec![
                output("a.xml", "https://example.com/feed"),
                output("b.xml", "https://example.com/feed"),
                output("c.xml", "https://example.org/other"),
            ],
            ..Default::default()
        };

        let sources = config.distinct_sources();
        assert_eq!(sources.len(), 2);
        assert!(sources.contains("https://example.com/feed"));
        assert!(sources.contains("https://example.org/other"));
    }

    #[test]
    fn test_load_json_legacy_keys() {
        figment::Jail::expect_with(|_jail| {
            let json = r#"{
                "Outputs": [
                    {"Name": "news.xml", "Source": "https://example.com/rss", "Transforms": ["strip.xsl", "sort.xsl"]}
                ]
            }"#;

            let config = AppConfig::load_json(json).map_err(|e| e.to_string())?;

            assert_eq!(config.outputs.len(), 1);
            assert_eq!(config.outputs[0].name, "news.xml");
            assert_eq!(config.outputs[0].transforms, vec!["strip.xsl", "sort.xsl"]);
            Ok(())
        });
    }

    #[test]
    fn test_load_json_missing_transforms_defaults_to_empty() {
        figment::Jail::expect_with(|_jail| {
            let json = r#"{"outputs": [{"name": "raw.xml", "source": "https://example.com/rss"}]}"#;
            let config = AppConfig::load_json(json).map_err(|e| e.to_string())?;
            assert!(config.outputs[0].transforms.is_empty());
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FEEDTR_FETCH_LIMIT", "7");
            let config = AppConfig::load_json(r#"{"fetch_limit": 3}"#).map_err(|e| e.to_string())?;
            assert_eq!(config.fetch_limit, 7);
            Ok(())
        });
    }

    #[test]
    fn test_load_file_resolves_relative_dirs() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "feeds.json",
                r#"{"outputs": [{"name": "a.xml", "source": "https://example.com/a"}], "outputs_dir": "/srv/www"}"#,
            )?;
            let path = jail.directory().join("feeds.json");

            let config = AppConfig::load_file(&path).map_err(|e| e.to_string())?;

            assert_eq!(config.cache_dir, jail.directory().join("cache"));
            assert_eq!(config.transforms_dir, jail.directory().join("transforms"));
            assert_eq!(config.outputs_dir, PathBuf::from("/srv/www"));
            Ok(())
        });
    }

    #[test]
    fn test_load_file_env_dirs_not_rebased() {
        figment::Jail::expect_with(|jail| {
            let conf = jail.directory().join("conf");
            std::fs::create_dir(&conf).map_err(|e| e.to_string())?;
            let path = conf.join("feeds.json");
            std::fs::write(&path, r#"{"outputs_dir": "public"}"#).map_err(|e| e.to_string())?;
            jail.set_env("FEEDTR_CACHE_DIR", "state/cache");

            let config = AppConfig::load_file(&path).map_err(|e| e.to_string())?;

            assert_eq!(config.cache_dir, PathBuf::from("state/cache"));
            assert_eq!(config.outputs_dir, conf.join("public"));
            assert_eq!(config.transforms_dir, conf.join("transforms"));
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "feeds.toml",
                r#"
                process_limit = 4

                [[outputs]]
                name = "a.xml"
                source = "https://example.com/a"
                transforms = ["one.xsl"]
                "#,
            )?;
            let path = jail.directory().join("feeds.toml");

            let config = AppConfig::load_file(&path).map_err(|e| e.to_string())?;

            assert_eq!(config.process_limit, 4);
            assert_eq!(config.outputs[0].transforms, vec!["one.xsl"]);
            Ok(())
        });
    }

    #[test]
    fn test_load_file_missing() {
        figment::Jail::expect_with(|jail| {
            let path = jail.directory().join("absent.json");
            let result = AppConfig::load_file(&path);
            assert!(matches!(result, Err(ConfigError::LoadFailed(_))));
            Ok(())
        });
    }
}
