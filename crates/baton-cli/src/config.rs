//! `baton.toml` loading
//!
//! ```toml
//! [scheduler]
//! time_quantum = 2
//! device_count = 1
//! max_tasks = 64      # optional
//! ```

use anyhow::Context;
use baton::SchedulerConfig;
use serde::Deserialize;
use std::path::Path;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "baton.toml";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    scheduler: SchedulerConfig,
}

/// Parse and validate a config document
pub fn parse(source: &str) -> anyhow::Result<SchedulerConfig> {
    let file: ConfigFile = toml::from_str(source)?;
    file.scheduler.validate()?;
    Ok(file.scheduler)
}

/// Load and validate a config file
pub fn load(path: &Path) -> anyhow::Result<SchedulerConfig> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse(&source).with_context(|| format!("invalid config {}", path.display()))
}

/// Resolve the effective configuration: explicit file, else `baton.toml` if
/// present, else defaults; command-line overrides apply last
pub fn resolve(
    path: Option<&Path>,
    quantum: Option<u32>,
    devices: Option<usize>,
) -> anyhow::Result<SchedulerConfig> {
    let mut config = match path {
        Some(path) => load(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => load(Path::new(DEFAULT_CONFIG_FILE))?,
        None => SchedulerConfig::default(),
    };
    if let Some(quantum) = quantum {
        config.time_quantum = quantum;
    }
    if let Some(devices) = devices {
        config.device_count = devices;
    }
    config.validate()?;
    log::debug!("effective config: {:?}", config);
    Ok(config)
}
