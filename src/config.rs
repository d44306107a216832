//! Configuration file support
//!
//! Loads settings from ~/.lexmode.toml (or %USERPROFILE%\.lexmode.toml on Windows)
//!
//! Example:
//! ```toml
//! tab_width = 4
//! indent_unit = 2
//! default_mode = "text/x-rustsrc"
//!
//! [mime]
//! "text/x-myc" = { name = "clike", dialect = "c", keywords = ["defer"] }
//!
//! [extensions]
//! ino = "text/x-c++src"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::mode::{ModeOptions, ModeRegistry, ModeSpec};
use crate::syntax::mime_for_extension;

/// Configuration settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tab width for column computations
    pub tab_width: usize,
    /// Width of one indentation level
    pub indent_unit: usize,
    /// Mode used when no other selection applies
    pub default_mode: Option<ModeSpec>,
    /// Extra MIME aliases
    pub mime: BTreeMap<String, ModeSpec>,
    /// Mode by file extension, consulted before the built-in table
    pub extensions: BTreeMap<String, ModeSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tab_width: 4,
            indent_unit: 2,
            default_mode: None,
            mime: BTreeMap::new(),
            extensions: BTreeMap::new(),
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
                .map(|home| PathBuf::from(home).join(".lexmode.toml"))
        }

        #[cfg(not(windows))]
        {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".lexmode.toml"))
        }
    }

    /// Load configuration from the default location
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.display(), %err, "ignoring config file");
                Self::default()
            }
        }
    }

    /// Load configuration from a file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                debug!(path = %path.display(), "loading config");
                Self::parse(&contents)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    /// Parse config file contents
    pub fn parse(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;
        config.tab_width = config.tab_width.clamp(1, 16); // Between 1 and 16
        config.indent_unit = config.indent_unit.clamp(1, 16);
        config.extensions = config
            .extensions
            .into_iter()
            .map(|(ext, spec)| (ext.to_lowercase(), spec))
            .collect();
        Ok(config)
    }

    /// Options handed to mode factories
    pub fn mode_options(&self) -> ModeOptions {
        ModeOptions {
            tab_size: self.tab_width,
            indent_unit: self.indent_unit,
        }
    }

    /// Register the configured MIME aliases and default mode
    pub fn apply(&self, registry: &mut ModeRegistry) {
        for (mime, spec) in &self.mime {
            registry.define_mime(mime, spec.clone());
        }
        if let Some(ModeSpec::Name(name)) = &self.default_mode {
            if registry.has_mode(name) {
                registry.set_default_mode(name);
            }
        }
    }

    /// Mode spec for a file, by its extension
    pub fn mode_for_path(&self, path: &Path) -> Option<ModeSpec> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.extensions
            .get(&ext)
            .cloned()
            .or_else(|| mime_for_extension(&ext).map(ModeSpec::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModeError;
    use crate::mode::ModeConfig;
    use tempfile::tempdir;

    #[test]
    fn test_parse_config() {
        let contents = r#"
# Comment
tab_width = 2
indent_unit = 4
default_mode = "toml"

[mime]
"text/x-myc" = { name = "clike", dialect = "c" }

[extensions]
INO = "text/x-c++src"
"#;
        let config = Config::parse(contents).unwrap();
        assert_eq!(config.tab_width, 2);
        assert_eq!(config.indent_unit, 4);
        assert_eq!(config.default_mode, Some(ModeSpec::from("toml")));
        assert_eq!(
            config.mime.get("text/x-myc"),
            Some(&ModeSpec::from(ModeConfig::new("clike").with_option("dialect", "c")))
        );
        assert_eq!(config.extensions.get("ino"), Some(&ModeSpec::from("text/x-c++src")));
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_values_clamped() {
        let config = Config::parse("tab_width = 0\nindent_unit = 100").unwrap();
        assert_eq!(config.tab_width, 1);
        assert_eq!(config.indent_unit, 16);
    }

    #[test]
    fn test_invalid_config() {
        let err = Config::parse("tab_width = \"wide\"").unwrap_err();
        assert!(matches!(err, ModeError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lexmode.toml");
        fs::write(&path, "tab_width = 8\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().tab_width, 8);

        let missing = dir.path().join("missing.toml");
        assert_eq!(Config::load_from(&missing).unwrap(), Config::default());
    }

    #[test]
    fn test_apply_registers_aliases() {
        let config = Config::parse(
            r#"
default_mode = "toml"
[mime]
"text/x-myc" = { name = "clike", dialect = "c" }
"#,
        )
        .unwrap();
        let mut registry = ModeRegistry::with_builtins();
        config.apply(&mut registry);
        assert_eq!(registry.default_mode(), Some("toml"));
        let mode = registry.get_mode(&config.mode_options(), "text/x-myc");
        assert_eq!(mode.name(), "clike");
    }

    #[test]
    fn test_mode_for_path() {
        let config = Config::parse("[extensions]\nrs = \"toml\"").unwrap();
        assert_eq!(config.mode_for_path(Path::new("main.rs")), Some(ModeSpec::from("toml")));
        assert_eq!(
            config.mode_for_path(Path::new("page.HTML")),
            Some(ModeSpec::from("text/html"))
        );
        assert_eq!(config.mode_for_path(Path::new("README")), None);
    }
}
