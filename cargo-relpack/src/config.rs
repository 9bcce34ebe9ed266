use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::cli::Args;
use crate::error::{RelpackError, Result};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default: DefaultConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct DefaultConfig {
    pub target: Option<String>,

    pub profile: Option<String>,

    pub out_dir: Option<PathBuf>,

    #[serde(default)]
    pub bins: Vec<String>,

    pub product: Option<String>,

    #[serde(default)]
    pub strict_args: bool,
}

/// Command prefixes used to reach the Rust toolchain.
///
/// `cargo = ["cross"]` or `cargo = ["cargo", "+1.80"]` both work; the
/// packager appends `build ...` to whatever is configured here.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct ToolchainConfig {
    #[serde(default)]
    pub cargo: Vec<String>,

    #[serde(default)]
    pub rustc: Vec<String>,
}

/// Resolved toolchain commands, each a program followed by leading args.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub cargo: Vec<OsString>,
    pub rustc: Vec<OsString>,
}

impl Toolchain {
    /// Toolchain from `CARGO` / `RUSTC`, which cargo sets for subcommands.
    pub fn from_env() -> Self {
        Self {
            cargo: vec![std::env::var_os("CARGO").unwrap_or_else(|| "cargo".into())],
            rustc: vec![std::env::var_os("RUSTC").unwrap_or_else(|| "rustc".into())],
        }
    }

    /// Replace environment defaults with configured command prefixes.
    pub fn with_overrides(mut self, config: &ToolchainConfig) -> Self {
        if !config.cargo.is_empty() {
            self.cargo = config.cargo.iter().map(OsString::from).collect();
        }
        if !config.rustc.is_empty() {
            self.rustc = config.rustc.iter().map(OsString::from).collect();
        }
        self
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| RelpackError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load `path` if it exists, otherwise the user-wide file, otherwise defaults.
    pub fn discover(path: &Path) -> Result<Self> {
        if path.exists() {
            tracing::debug!("Loading configuration from {}", path.display());
            return Self::load(path);
        }
        tracing::debug!(
            "No configuration at {}, falling back to user configuration",
            path.display()
        );

        let user_path = Self::default_path();
        if user_path.exists() {
            tracing::debug!("Loading user configuration from {}", user_path.display());
            return Self::load(&user_path);
        }

        Ok(Config::default())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("relpack.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/relpack.toml"))
    }

    /// Merge configuration with command line arguments
    pub fn merge_with_args(&self, args: &mut Args) {
        if args.target.is_none() {
            args.target = self.default.target.clone();
        }

        if args.profile.is_none() {
            args.profile = self.default.profile.clone();
        }

        if args.out_dir.is_none() {
            args.out_dir = self.default.out_dir.clone();
        }

        if args.bins.is_empty() && !self.default.bins.is_empty() {
            args.bins = self.default.bins.clone();
        }

        if args.product.is_none() {
            args.product = self.default.product.clone();
        }

        if !args.strict_args && self.default.strict_args {
            args.strict_args = true;
        }
    }
}
