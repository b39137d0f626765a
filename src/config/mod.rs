pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_extension, validate_ip_address, validate_path, validate_positive_number,
    validate_range, Validate,
};
use cli::CliArgs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_PORT_START: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_TARGET_EXTENSION: &str = "azw3";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

#[cfg(target_os = "macos")]
pub const DEFAULT_CONVERTER_PATH: &str = "/Applications/calibre.app/Contents/MacOS/ebook-convert";
#[cfg(target_os = "windows")]
pub const DEFAULT_CONVERTER_PATH: &str = r"C:\Program Files\Calibre2\ebook-convert.exe";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub const DEFAULT_CONVERTER_PATH: &str = "/usr/bin/ebook-convert";

/// Fully resolved settings: defaults, then the TOML file, then CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub serve_dir: PathBuf,
    pub port_start: u16,
    pub bind_address: String,
    pub converter_path: PathBuf,
    pub conversion_timeout_secs: u64,
    pub target_extension: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            serve_dir: default_serve_dir(),
            port_start: DEFAULT_PORT_START,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            converter_path: PathBuf::from(DEFAULT_CONVERTER_PATH),
            conversion_timeout_secs: DEFAULT_TIMEOUT_SECS,
            target_extension: DEFAULT_TARGET_EXTENSION.to_string(),
        }
    }
}

/// `~/kindle_drop`, or `./kindle_drop` when no home directory is known.
pub fn default_serve_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kindle_drop")
}

impl AppConfig {
    pub fn load(args: &CliArgs) -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = &args.config {
            tracing::debug!("Loading configuration from {}", path.display());
            config.merge_toml(TomlConfig::from_file(path)?);
        }
        config.apply_cli(args);
        config.validate()?;
        Ok(config)
    }

    pub fn merge_toml(&mut self, toml: TomlConfig) {
        if let Some(server) = toml.server {
            if let Some(port) = server.port_start {
                self.port_start = port;
            }
            if let Some(bind) = server.bind_address {
                self.bind_address = bind;
            }
        }
        if let Some(dir) = toml.library.and_then(|l| l.serve_dir) {
            self.serve_dir = dir;
        }
        if let Some(converter) = toml.converter {
            if let Some(path) = converter.path {
                self.converter_path = path;
            }
            if let Some(secs) = converter.timeout_secs {
                self.conversion_timeout_secs = secs;
            }
            if let Some(ext) = converter.target_extension {
                self.target_extension = ext;
            }
        }
    }

    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(dir) = &args.serve_dir {
            self.serve_dir = dir.clone();
        }
        if let Some(port) = args.port_start {
            self.port_start = port;
        }
        if let Some(bind) = &args.bind {
            self.bind_address = bind.clone();
        }
        if let Some(converter) = &args.converter {
            self.converter_path = converter.clone();
        }
        if let Some(secs) = args.timeout_secs {
            self.conversion_timeout_secs = secs;
        }
        if let Some(ext) = &args.target_ext {
            self.target_extension = ext.clone();
        }
    }

    pub fn conversion_timeout(&self) -> Duration {
        Duration::from_secs(self.conversion_timeout_secs)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_path("serve_dir", &self.serve_dir)?;
        validate_path("converter_path", &self.converter_path)?;
        validate_range("port_start", self.port_start, 1, u16::MAX)?;
        validate_ip_address("bind_address", &self.bind_address)?;
        validate_positive_number("conversion_timeout_secs", self.conversion_timeout_secs, 1)?;
        validate_extension("target_extension", &self.target_extension)?;
        Ok(())
    }
}
