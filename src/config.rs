// src/config.rs
//! Service configuration resolved from the environment (`.env` is loaded by
//! the binary via `dotenvy` before this runs).

use std::path::PathBuf;
use std::str::FromStr;

use crate::batch::DEFAULT_MAX_UPLOAD_BYTES;
use crate::lexicon::{DEFAULT_LEXICON_CONFIG_PATH, ENV_LEXICON_CONFIG_PATH};

pub const ENV_BATCH_WORKERS: &str = "BATCH_WORKERS";
pub const ENV_MAX_UPLOAD_BYTES: &str = "MAX_UPLOAD_BYTES";
pub const ENV_LEXICON_HOT_RELOAD: &str = "LEXICON_HOT_RELOAD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub lexicon_path: PathBuf,
    /// Threads used for one batch; at least 1.
    pub batch_workers: usize,
    pub max_upload_bytes: usize,
    /// Poll the lexicon file and reload on change (dev environments only).
    pub hot_reload: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            lexicon_path: PathBuf::from(DEFAULT_LEXICON_CONFIG_PATH),
            batch_workers: default_workers(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            hot_reload: false,
        }
    }
}

impl ServiceConfig {
    /// Read overrides from env; unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lexicon_path: std::env::var(ENV_LEXICON_CONFIG_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.lexicon_path),
            batch_workers: parse_env::<usize>(ENV_BATCH_WORKERS)
                .filter(|&n| n > 0)
                .unwrap_or(defaults.batch_workers),
            max_upload_bytes: parse_env::<usize>(ENV_MAX_UPLOAD_BYTES)
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_upload_bytes),
            hot_reload: std::env::var(ENV_LEXICON_HOT_RELOAD).ok().as_deref() == Some("1")
                && is_dev_env(),
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Debug build, or SHUTTLE_ENV in {local, development, dev}.
pub fn is_dev_env() -> bool {
    cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        )
}
