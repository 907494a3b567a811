//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::CaptureConfig;
use tracing::info;

use crate::error::CliError;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

/// Load `path`, or fall back to built-in defaults when no path is given
fn load_config(path: Option<&Path>) -> Result<CaptureConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(CaptureConfig::default());
    };

    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
