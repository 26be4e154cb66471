use anyhow::{Context, Result};
use chapterseg::model::Document;
use chapterseg::oracle::{OracleClient, SystemClock};
use chapterseg::segment::{
    CancellationToken, ChunkerConfig, ContentExtractor, ExtractorConfig, MarkdownChunker,
    TracingProgress, segment_document,
};
use chapterseg::store;
use chapterseg::util::{read_text, utc_compact_string, write_json_pretty};
use chrono::Utc;
use tracing::{info, warn};

use super::{load_hierarchy, oracle_config, retry_policy};
use crate::cli::SegmentArgs;

pub fn run(args: SegmentArgs) -> Result<()> {
    let document = Document::new(read_text(&args.input)?);
    let hierarchy = load_hierarchy(&args.hierarchy)?;
    let client =
        OracleClient::new(oracle_config(&args.oracle)).context("failed to build oracle client")?;

    let chunker = MarkdownChunker::new(ChunkerConfig {
        title_search_min_line: args.title_search_min_line,
    })?;
    let extractor = ContentExtractor::new(
        &client,
        &SystemClock,
        &TracingProgress,
        ExtractorConfig {
            retry: retry_policy(&args.oracle),
            min_content_length: args.min_content_length,
        },
    )?;

    info!(
        input = %args.input.display(),
        source_id = %document.source_id,
        subject = %args.subject,
        chapters = hierarchy.topics().len(),
        "starting segmentation"
    );

    let run = segment_document(
        &document,
        &hierarchy,
        &chunker,
        &extractor,
        &args.subject,
        &CancellationToken::new(),
    )?;

    let mut connection = store::open(&args.db_path)?;
    let counts = store::persist_run(&mut connection, &document, &run.chunking, &run.summary)?;

    let report_path = args.report_path.clone().unwrap_or_else(|| {
        args.db_path
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join("reports")
            .join(format!("segment_{}.json", utc_compact_string(Utc::now())))
    });
    write_json_pretty(&report_path, &run.summary)?;

    if run.summary.needs_review {
        for issue in &run.summary.issues {
            warn!(issue = %issue, "needs review");
        }
    }
    info!(
        expected = run.summary.total_expected,
        found = run.summary.total_found,
        complete = run.summary.total_complete,
        chapters_stored = counts.chapters,
        subtopics_stored = counts.subtopics,
        needs_review = run.summary.needs_review,
        report = %report_path.display(),
        "segmentation completed"
    );

    Ok(())
}
