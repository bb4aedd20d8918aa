//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present). Upload and output directories are passed explicitly to every
//! consumer instead of living in process-wide constants.
//!
//! | Variable                     | Default     |
//! |------------------------------|-------------|
//! | `GRADELOAD_UPLOAD_DIR`       | `uploads`   |
//! | `GRADELOAD_PROCESSED_DIR`    | `processed` |
//! | `GRADELOAD_PORT`             | `3000`      |
//! | `GRADELOAD_MAX_UPLOAD_BYTES` | 16 MiB      |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_PROCESSED_DIR: &str = "processed";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Where uploaded spreadsheets are saved
    pub upload_dir: PathBuf,
    /// Where artifacts are written and served from
    pub processed_dir: PathBuf,
    pub port: u16,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            processed_dir: PathBuf::from(DEFAULT_PROCESSED_DIR),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Settings {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from any key lookup; missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            upload_dir: lookup("GRADELOAD_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            processed_dir: lookup("GRADELOAD_PROCESSED_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_dir),
            port: parse_or(&lookup, "GRADELOAD_PORT", defaults.port)?,
            max_upload_bytes: parse_or(
                &lookup,
                "GRADELOAD_MAX_UPLOAD_BYTES",
                defaults.max_upload_bytes,
            )?,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.processed_dir = dir.into();
        self
    }

    /// Create both directories if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.upload_dir)?;
        std::fs::create_dir_all(&self.processed_dir)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
    }
}
