//! `baton check`: load and validate a config file.

use crate::config::{self, DEFAULT_CONFIG_FILE};
use crate::output::StyledOutput;
use std::path::Path;

pub fn execute(out: &mut StyledOutput, file: Option<&Path>) -> anyhow::Result<()> {
    let path = file.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
    let config = config::load(path)?;

    out.heading(&format!("{}", path.display()));
    out.field("time_quantum", config.time_quantum);
    out.field("device_count", config.device_count);
    out.field("max_tasks", config.max_tasks);
    out.info(&format!(
        "priorities 0..={}, quantum at most {}, at most {} devices",
        baton::MAX_PRIORITY,
        baton::MAX_TIME_QUANTUM,
        baton::MAX_DEVICES
    ));
    out.success("config is valid");
    Ok(())
}
