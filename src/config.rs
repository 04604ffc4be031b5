//! Configuration file support
//!
//! Loads settings from ~/.hilite.toml (or %USERPROFILE%\.hilite.toml on Windows)
//!
//! Example:
//! ```toml
//! grammar_dir = "/usr/share/hilite/grammars"
//! debounce_ms = 150
//! default_language = "cpp"
//!
//! [aliases]
//! h = "cpp"
//!
//! [grammars]
//! rust = "/path/to/rust.xml"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{debug, warn};

use crate::error::{HiliteError, Result};
use crate::syntax::Registry;

const CONFIG_FILE: &str = ".hilite.toml";
const MAX_DEBOUNCE_MS: u64 = 5000;

/// Configuration settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory scanned for `*.xml` grammars
    pub grammar_dir: Option<PathBuf>,
    /// Quiet period before the background worker highlights
    pub debounce_ms: u64,
    /// Language used when none is given on the command line
    pub default_language: Option<String>,
    /// Extra `(alias, language)` pairs
    pub aliases: Vec<(String, String)>,
    /// Individually listed `(language, path)` grammar files
    pub grammars: Vec<(String, PathBuf)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grammar_dir: None,
            debounce_ms: 150,
            default_language: None,
            aliases: Vec::new(),
            grammars: Vec::new(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            std::env::var("USERPROFILE")
                .ok()
                .map(|home| PathBuf::from(home).join(CONFIG_FILE))
        }

        #[cfg(not(windows))]
        {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(CONFIG_FILE))
        }
    }

    /// Load configuration from the default location
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| HiliteError::io(path, e))?;
        debug!(path = %path.display(), "loading configuration");
        Self::from_toml(&contents)
    }

    /// Build a configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let settings = Self::parse(contents)?;
        let mut config = Config::default();
        config.apply(&settings)?;
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Table> {
        contents
            .parse::<Table>()
            .map_err(|e| HiliteError::Config(e.to_string()))
    }

    /// Apply settings from a parsed table
    fn apply(&mut self, settings: &Table) -> Result<()> {
        for (key, value) in settings {
            match key.as_str() {
                "grammar_dir" => self.grammar_dir = Some(PathBuf::from(expect_str(key, value)?)),
                "debounce_ms" => {
                    let ms = value
                        .as_integer()
                        .ok_or_else(|| type_error(key, "an integer"))?;
                    self.debounce_ms = (ms.max(0) as u64).min(MAX_DEBOUNCE_MS);
                }
                "default_language" => self.default_language = Some(expect_str(key, value)?.to_string()),
                "aliases" => {
                    for (alias, target) in expect_table(key, value)? {
                        let target = expect_str(alias, target)?;
                        self.aliases.push((alias.clone(), target.to_string()));
                    }
                }
                "grammars" => {
                    for (name, path) in expect_table(key, value)? {
                        let path = expect_str(name, path)?;
                        self.grammars.push((name.clone(), PathBuf::from(path)));
                    }
                }
                _ => warn!(key = %key, "ignoring unknown configuration key"),
            }
        }
        Ok(())
    }

    /// Build a registry from the configured grammars
    ///
    /// `grammar_dir` is loaded first, then `extra_dirs` in order, then the
    /// individually listed grammars, so later sources replace earlier
    /// ones of the same name. Aliases are applied last.
    pub fn build_registry(&self, extra_dirs: &[PathBuf]) -> Result<Registry> {
        let mut registry = Registry::new();
        for dir in self.grammar_dir.iter().chain(extra_dirs) {
            let count = registry.load_dir(dir)?;
            debug!(dir = %dir.display(), count, "loaded grammar directory");
        }
        for (name, path) in &self.grammars {
            registry.load_file(name, path)?;
        }
        for (alias, target) in &self.aliases {
            registry.add_alias(alias, target);
        }
        Ok(registry)
    }
}

fn type_error(key: &str, expected: &str) -> HiliteError {
    HiliteError::Config(format!("`{}` must be {}", key, expected))
}

fn expect_str<'v>(key: &str, value: &'v Value) -> Result<&'v str> {
    value.as_str().ok_or_else(|| type_error(key, "a string"))
}

fn expect_table<'v>(key: &str, value: &'v Value) -> Result<&'v Table> {
    value.as_table().ok_or_else(|| type_error(key, "a table"))
}
