use anyhow::{Context, Result};
use chapterseg::segment::JsonRepairer;
use chapterseg::util::read_text;
use tracing::info;

use crate::cli::RepairArgs;

pub fn run(args: RepairArgs) -> Result<()> {
    let raw = read_text(&args.input)?;
    let repairer = JsonRepairer::with_record_markers(args.record_markers.iter().cloned());
    let repaired = repairer
        .repair(&raw)
        .with_context(|| format!("failed to repair {}", args.input.display()))?;

    info!(
        input_chars = raw.chars().count(),
        repaired_chars = repaired.chars().count(),
        unchanged = raw == repaired,
        "repaired json"
    );
    println!("{repaired}");

    Ok(())
}
