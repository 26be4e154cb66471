use anyhow::{Context, Result};
use chapterseg::oracle::{OracleClient, SystemClock};
use chapterseg::segment::{
    CancellationToken, StructureConfig, StructureDetector, TracingProgress,
};
use chapterseg::util::{read_text, write_json_pretty};
use tracing::{info, warn};

use super::{oracle_config, retry_policy};
use crate::cli::StructureArgs;

pub fn run(args: StructureArgs) -> Result<()> {
    let text = read_text(&args.input)?;
    let client =
        OracleClient::new(oracle_config(&args.oracle)).context("failed to build oracle client")?;
    let config = StructureConfig {
        max_sample_chars: args.max_sample_chars,
        max_attempts: args.max_attempts,
        retry: retry_policy(&args.oracle),
    };
    let detector = StructureDetector::new(&client, &SystemClock, &TracingProgress, config)?;

    info!(
        input = %args.input.display(),
        subject = %args.subject,
        model = %client.config().model,
        "detecting structure"
    );
    let outcome = detector
        .detect(&text, &args.subject, &CancellationToken::new())
        .context("structure detection failed")?;

    if outcome.report.is_valid {
        info!(
            topics = outcome.candidate.topics().len(),
            attempts = outcome.attempts,
            "structure is valid"
        );
    } else {
        for issue in &outcome.report.issues {
            warn!(issue = %issue, "structure issue");
        }
    }

    write_json_pretty(&args.output, &outcome)?;
    info!(path = %args.output.display(), "wrote structure outcome");

    Ok(())
}
