//! Shared pieces of the docrag binaries: logging setup, configuration
//! loading and terminal delivery of answers.

pub mod delivery;
pub mod logging;

use std::path::PathBuf;

use docrag_core::config::{Config, Settings};

/// Load settings from `config_dir` (default: current directory), applying CLI overrides.
pub fn load_settings(config_dir: Option<PathBuf>, input_dir: Option<PathBuf>) -> anyhow::Result<Settings> {
    let config = match config_dir {
        Some(dir) => Config::load_in(&dir)?,
        None => Config::load()?,
    };
    let mut settings = config.settings()?;
    if let Some(dir) = input_dir {
        // Command-line paths are relative to where the command runs.
        let dir = if dir.is_absolute() { dir } else { std::env::current_dir()?.join(dir) };
        settings.paths.input_dir = dir.to_string_lossy().into_owned();
    }
    Ok(settings)
}
