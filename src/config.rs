//! Scan configuration.
//!
//! A configuration file is optional; every field has a default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Config file names searched for in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["nodescan.yaml", ".nodescan.yaml"];

/// Commented template written by `nodescan init`.
pub const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");

/// What to do when two files register the same node name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Keep the later record and log a warning.
    #[default]
    Warn,
    /// Keep the later record silently.
    Ignore,
    /// Abort the scan.
    Error,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::Warn => write!(f, "warn"),
            CollisionPolicy::Ignore => write!(f, "ignore"),
            CollisionPolicy::Error => write!(f, "error"),
        }
    }
}

impl FromStr for CollisionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "warn" => Ok(CollisionPolicy::Warn),
            "ignore" => Ok(CollisionPolicy::Ignore),
            "error" => Ok(CollisionPolicy::Error),
            other => anyhow::bail!(
                "invalid collision policy {:?}, must be 'warn', 'ignore', or 'error'",
                other
            ),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    /// Locale directory the output is written to (`locales/<language>/`).
    #[serde(default = "default_language")]
    pub language: String,
    /// File extensions to scan, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Glob patterns, relative to the scan root, for paths to skip (e.g. "**/tests/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    /// Follow symbolic links while walking (default: true)
    #[serde(default = "default_true")]
    pub follow_links: bool,
    /// Emit `category` in nodeDefs.json (default: false)
    #[serde(default)]
    pub include_category: bool,
    /// Scan files whose tree contains syntax errors instead of skipping them
    #[serde(default)]
    pub allow_partial_parse: bool,
    #[serde(default)]
    pub collisions: CollisionPolicy,
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_extensions() -> Vec<String> {
    vec!["py".to_string()]
}

fn default_true() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            extensions: default_extensions(),
            excluded_paths: Vec::new(),
            follow_links: true,
            include_category: false,
            allow_partial_parse: false,
            collisions: CollisionPolicy::default(),
        }
    }
}

impl ScanConfig {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ScanConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load `explicit` if given, else the first discovered file, else defaults.
    ///
    /// Returns the config and the file it came from.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => discover_config(),
        };
        match path {
            Some(p) => {
                let config = Self::parse_file(&p)
                    .map_err(|e| anyhow::anyhow!("error parsing config {}: {}", p.display(), e))?;
                validate(&config)?;
                Ok((config, Some(p)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    /// Whether an extension (without the dot) is scanned.
    pub fn handles_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.trim_start_matches('.') == ext)
    }
}

/// Find a config file: working directory first, then the user config dir.
pub fn discover_config() -> Option<PathBuf> {
    for name in DEFAULT_CONFIG_NAMES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Some(path);
        }
    }
    user_config_path().filter(|p| p.exists())
}

/// `<config_dir>/config.yaml` for the current user.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "nodescan").map(|d| d.config_dir().join("config.yaml"))
}

/// Validate a configuration for correctness.
pub fn validate(config: &ScanConfig) -> anyhow::Result<()> {
    // Language codes end up as a directory name
    let lang = &config.language;
    if lang.is_empty()
        || !lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        anyhow::bail!(
            "invalid language {:?}, expected a locale code such as 'zh' or 'pt-BR'",
            lang
        );
    }

    if config.extensions.is_empty() {
        anyhow::bail!("extensions must not be empty");
    }

    // Validate excluded_paths glob patterns compile
    for pattern in &config.excluded_paths {
        globset::Glob::new(pattern)
            .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
    }

    Ok(())
}
