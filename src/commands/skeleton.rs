use anyhow::Result;
use chapterseg::segment::StructuralLineExtractor;
use chapterseg::util::{read_text, write_json_pretty};
use tracing::info;

use crate::cli::SkeletonArgs;

pub fn run(args: SkeletonArgs) -> Result<()> {
    let text = read_text(&args.input)?;
    let extractor = StructuralLineExtractor::new()?;
    let lines = extractor.extract(&text);

    info!(
        input = %args.input.display(),
        total_lines = text.lines().count(),
        structural_lines = lines.len(),
        "extracted structural lines"
    );

    match args.output {
        Some(path) => {
            write_json_pretty(&path, &lines)?;
            info!(path = %path.display(), "wrote structural lines");
        }
        None => {
            for line in &lines {
                println!("L{}: {}", line.line_index, line.text);
            }
        }
    }

    Ok(())
}
