use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use inetvm::ReduceConfig;

/// Defaults, then the optional JSON file, then command-line overrides.
pub(crate) fn load_config(
    path: Option<&Path>,
    max_steps: Option<usize>,
    timeout_ms: Option<u64>,
) -> Result<ReduceConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<ReduceConfig>(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => ReduceConfig::default(),
    };
    if let Some(steps) = max_steps {
        config.max_steps = steps;
    }
    if let Some(ms) = timeout_ms {
        config.max_wall_time_ms = ms;
    }
    if config.max_steps == 0 {
        bail!("max_steps must be at least 1");
    }
    Ok(config)
}
