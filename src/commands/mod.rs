use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chapterseg::oracle::OracleConfig;
use chapterseg::segment::{RetryPolicy, StructureValidator};
use chapterseg::{StructureCandidate, ValidationReport};
use serde_json::Value;
use tracing::warn;

use crate::cli::OracleArgs;

pub mod chunk;
pub mod repair;
pub mod segment;
pub mod skeleton;
pub mod status;
pub mod structure;

fn oracle_config(args: &OracleArgs) -> OracleConfig {
    OracleConfig {
        base_url: args.oracle_base_url.clone(),
        model: args.oracle_model.clone(),
        api_key_env: args.api_key_env.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        requests_per_minute: args.requests_per_minute,
        ..OracleConfig::default()
    }
}

fn retry_policy(args: &OracleArgs) -> RetryPolicy {
    RetryPolicy {
        max_attempts: args.max_retries,
        delay: Duration::from_millis(args.retry_delay_ms),
    }
}

// Accepts either a bare hierarchy or the full output of `structure`.
fn load_hierarchy(path: &Path) -> Result<StructureCandidate> {
    let raw = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let (hierarchy, report) = hierarchy_from_value(value, &StructureValidator::new()?)
        .with_context(|| format!("{} does not contain a topic hierarchy", path.display()))?;

    for issue in &report.issues {
        warn!(path = %path.display(), issue = %issue, "hierarchy issue");
    }

    Ok(hierarchy)
}

fn hierarchy_from_value(
    value: Value,
    validator: &StructureValidator,
) -> Result<(StructureCandidate, ValidationReport)> {
    let value = value.get("candidate").cloned().unwrap_or(value);
    let report = validator.validate_value(&value);
    let hierarchy = serde_json::from_value(value).context("topic schema mismatch")?;
    Ok((hierarchy, report))
}
