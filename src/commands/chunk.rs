use anyhow::Result;
use chapterseg::segment::{ChunkerConfig, MarkdownChunker, chunk_large_chapter};
use chapterseg::util::{read_text, write_json_pretty};
use serde::Serialize;
use tracing::{info, warn};

use super::load_hierarchy;
use crate::cli::ChunkArgs;

#[derive(Debug, Serialize)]
struct ChapterReport {
    chapter_number: u32,
    title: String,
    start_line: usize,
    end_line: usize,
    char_count: usize,
    pieces: usize,
}

#[derive(Debug, Serialize)]
struct ChunkReport<'a> {
    input: String,
    total_lines: usize,
    chapters: Vec<ChapterReport>,
    missing: &'a [chapterseg::model::MissingChapter],
    warnings: &'a [String],
}

pub fn run(args: ChunkArgs) -> Result<()> {
    let text = read_text(&args.input)?;
    let hierarchy = load_hierarchy(&args.hierarchy)?;
    let chunker = MarkdownChunker::new(ChunkerConfig {
        title_search_min_line: args.title_search_min_line,
    })?;

    let outcome = chunker.chunk(&text, &hierarchy.expected_chapters())?;
    for warning in &outcome.warnings {
        warn!(warning = %warning, "chunking warning");
    }
    for missing in &outcome.missing {
        warn!(chapter = missing.chapter_number, title = %missing.title, "chapter missing");
    }

    let mut chapters = Vec::with_capacity(outcome.chunks.len());
    for chunk in outcome.chunks.values() {
        let pieces = match args.max_chunk_chars {
            Some(max_chars) => chunk_large_chapter(&chunk.content, max_chars),
            None => vec![chunk.content.clone()],
        };
        for (index, piece) in pieces.iter().enumerate() {
            let path = args.output_dir.join(format!(
                "chapter_{:03}_part_{:02}.json",
                chunk.chapter_number,
                index + 1
            ));
            write_json_pretty(
                &path,
                &serde_json::json!({
                    "chapter_number": chunk.chapter_number,
                    "title": chunk.title,
                    "part": index + 1,
                    "parts": pieces.len(),
                    "content": piece,
                }),
            )?;
        }

        chapters.push(ChapterReport {
            chapter_number: chunk.chapter_number,
            title: chunk.title.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            char_count: chunk.char_count,
            pieces: pieces.len(),
        });
    }

    let report = ChunkReport {
        input: args.input.display().to_string(),
        total_lines: outcome.total_lines,
        chapters,
        missing: &outcome.missing,
        warnings: &outcome.warnings,
    };
    let report_path = args.output_dir.join("chunk_report.json");
    write_json_pretty(&report_path, &report)?;

    info!(
        resolved = outcome.chunks.len(),
        missing = outcome.missing.len(),
        path = %report_path.display(),
        "chunking completed"
    );

    Ok(())
}
