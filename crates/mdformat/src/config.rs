//! `.mdformat.toml` configuration
//!
//! The file is looked up from the formatted file's directory upwards. Its
//! values override the defaults and are in turn overridden by command line
//! flags.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use mdformat_core::{EndOfLine, Options, PluginOptions, WrapMode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = ".mdformat.toml";

const KEYS: &[&str] = &["wrap", "number", "end_of_line", "exclude", "plugin"];

/// Errors raised while loading `.mdformat.toml`
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid TOML syntax in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid key '{key}' in {}. Keys must be one of {}.", .path.display(), KEYS.join(", "))]
    UnknownKey { key: String, path: PathBuf },

    #[error("Invalid '{key}' value in {}", .path.display())]
    InvalidValue { key: String, path: PathBuf },
}

/// `wrap` is either a mode name or a column count
#[derive(Deserialize)]
#[serde(untagged)]
enum RawWrap {
    Width(i64),
    Mode(String),
}

/// Options read from a configuration file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    pub wrap: Option<WrapMode>,
    pub number: Option<bool>,
    pub end_of_line: Option<EndOfLine>,

    /// Glob patterns of files to skip, relative to the file's directory
    pub exclude: Vec<String>,

    /// Per-plugin options from `[plugin.<id>]` tables
    pub plugin: IndexMap<String, PluginOptions>,

    /// The file the options were read from
    pub path: Option<PathBuf>,
}

impl FileConfig {
    /// Parse the content of a configuration file located at `path`
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let table: toml::Table = text.parse().map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(key) = table.keys().find(|key| !KEYS.contains(&key.as_str())) {
            return Err(ConfigError::UnknownKey {
                key: key.clone(),
                path: path.to_path_buf(),
            });
        }

        let wrap = match value::<RawWrap>(&table, "wrap", path)? {
            None => None,
            Some(RawWrap::Width(width)) if width >= 1 => Some(WrapMode::Width(width as usize)),
            Some(RawWrap::Mode(mode)) if mode == "keep" => Some(WrapMode::Keep),
            Some(RawWrap::Mode(mode)) if mode == "no" => Some(WrapMode::NoWrap),
            Some(_) => return Err(invalid("wrap", path)),
        };
        let end_of_line = value::<String>(&table, "end_of_line", path)?
            .map(|eol| eol.parse().map_err(|_| invalid("end_of_line", path)))
            .transpose()?;

        let mut plugin = IndexMap::new();
        for (id, settings) in value::<toml::Table>(&table, "plugin", path)?.unwrap_or_default() {
            let toml::Value::Table(settings) = settings else {
                return Err(invalid("plugin", path));
            };
            let settings: PluginOptions = settings
                .into_iter()
                .map(|(key, value)| match value {
                    toml::Value::String(text) => (key, text),
                    other => (key, other.to_string()),
                })
                .collect();
            plugin.insert(id, settings);
        }

        Ok(Self {
            wrap,
            number: value(&table, "number", path)?,
            end_of_line,
            exclude: value(&table, "exclude", path)?.unwrap_or_default(),
            plugin,
            path: Some(path.to_path_buf()),
        })
    }

    /// Read a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Load the nearest configuration file in `dir` or its ancestors.
    ///
    /// Returns the empty configuration when there is none.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        match find_config_file(dir) {
            Some(path) => {
                debug!(path = %path.display(), "Using configuration file");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Directory the `exclude` patterns are relative to
    pub fn root(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    /// Override `options` with the values set in this file
    pub fn apply(&self, mut options: Options) -> Options {
        if let Some(wrap) = self.wrap {
            options.wrap = wrap;
        }
        if let Some(number) = self.number {
            options.number = number;
        }
        if let Some(end_of_line) = self.end_of_line {
            options.end_of_line = end_of_line;
        }
        for (id, settings) in &self.plugin {
            options
                .plugin
                .entry(id.clone())
                .or_default()
                .extend(settings.clone());
        }
        options
    }
}

/// Find the nearest `.mdformat.toml` in `dir` or its ancestors
pub fn find_config_file(dir: &Path) -> Option<PathBuf> {
    dir.ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

fn invalid(key: &str, path: &Path) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        path: path.to_path_buf(),
    }
}

fn value<T: DeserializeOwned>(
    table: &toml::Table,
    key: &str,
    path: &Path,
) -> Result<Option<T>, ConfigError> {
    table
        .get(key)
        .cloned()
        .map(|value| value.try_into().map_err(|_| invalid(key, path)))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(text: &str) -> Result<FileConfig, ConfigError> {
        FileConfig::parse(text, Path::new("/project/.mdformat.toml"))
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
wrap = 80
number = true
end_of_line = "crlf"
exclude = ["venv/**", "*.txt"]

[plugin.tables]
compact = true
style = "grid"
"#,
        )
        .unwrap();

        assert_eq!(config.wrap, Some(WrapMode::Width(80)));
        assert_eq!(config.number, Some(true));
        assert_eq!(config.end_of_line, Some(EndOfLine::Crlf));
        assert_eq!(config.exclude, ["venv/**", "*.txt"]);
        assert_eq!(config.plugin["tables"]["compact"], "true");
        assert_eq!(config.plugin["tables"]["style"], "grid");
        assert_eq!(config.root(), Some(Path::new("/project")));
    }

    #[test]
    fn test_empty_config() {
        let config = parse("").unwrap();
        assert_eq!(config.wrap, None);
        assert!(config.exclude.is_empty());
    }

    #[rstest]
    #[case("wrap = \"keep\"", WrapMode::Keep)]
    #[case("wrap = \"no\"", WrapMode::NoWrap)]
    #[case("wrap = 1", WrapMode::Width(1))]
    fn test_wrap_values(#[case] text: &str, #[case] expected: WrapMode) {
        assert_eq!(parse(text).unwrap().wrap, Some(expected));
    }

    #[rstest]
    #[case("wrap = 0", "wrap")]
    #[case("wrap = \"sometimes\"", "wrap")]
    #[case("number = \"yes\"", "number")]
    #[case("end_of_line = \"cr\"", "end_of_line")]
    #[case("exclude = \"*.md\"", "exclude")]
    #[case("exclude = [1]", "exclude")]
    #[case("plugin = { tables = 1 }", "plugin")]
    fn test_invalid_values(#[case] text: &str, #[case] expected_key: &str) {
        match parse(text) {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_key() {
        let err = parse("wrapp = 80").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { ref key, .. } if key == "wrapp"));
        assert!(err.to_string().contains("Keys must be one of"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(parse("wrap = "), Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn test_apply_overrides_defaults() {
        let config = parse("wrap = \"no\"\n[plugin.x]\nkey = \"v\"\n").unwrap();
        let options = config.apply(Options::default().with_number(true));
        assert_eq!(options.wrap, WrapMode::NoWrap);
        assert!(options.number);
        assert_eq!(options.plugin_option("x", "key"), Some("v"));
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "number = true\n").unwrap();

        let config = FileConfig::discover(&nested).unwrap();
        assert_eq!(config.number, Some(true));
        assert_eq!(config.root(), Some(dir.path()));
    }

    #[test]
    fn test_discover_without_file() {
        let dir = tempfile::tempdir().unwrap();
        // A config file above the temp dir would be picked up
        if find_config_file(dir.path()).is_none() {
            assert_eq!(FileConfig::discover(dir.path()).unwrap(), FileConfig::default());
        }
    }
}
