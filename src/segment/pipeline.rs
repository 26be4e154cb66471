use super::*;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentRun {
    pub chunking: ChunkingOutcome,
    pub summary: DocumentSummary,
}

/// Chunks the whole document first, then extracts chapter by chapter.
/// A failing chapter is recorded in the summary and the run moves on.
pub fn segment_document(
    document: &Document,
    hierarchy: &StructureCandidate,
    chunker: &MarkdownChunker,
    extractor: &ContentExtractor<'_>,
    subject_name: &str,
    cancel: &CancellationToken,
) -> Result<DocumentRun, ChunkError> {
    let expected_chapters = hierarchy.expected_chapters();
    let chunking = chunker.chunk(&document.text, &expected_chapters)?;

    let mut chapters = Vec::<ExtractionResult>::with_capacity(chunking.chunks.len());
    let mut run_issues = Vec::<String>::new();

    for chunk in chunking.chunks.values() {
        if cancel.is_cancelled() {
            warn!(chapter = chunk.chapter_number, "run cancelled before chapter");
            run_issues.push(format!(
                "Run cancelled before chapter {} '{}'",
                chunk.chapter_number, chunk.title
            ));
            break;
        }

        let titles = hierarchy.subtopic_titles(chunk.chapter_number);
        let result = extractor.extract_chapter(
            &chunk.content,
            &chunk.title,
            chunk.chapter_number,
            &titles,
            subject_name,
            cancel,
        );

        let report = validate_extraction(&result, extractor.config().min_content_length);
        info!(
            chapter = chunk.chapter_number,
            expected = result.total_expected,
            found = result.total_found,
            complete = result.total_complete,
            valid = report.is_valid,
            "chapter extracted"
        );
        chapters.push(result);
    }

    let mut summary = DocumentSummary::new(
        &document.source_id,
        now_utc_string(),
        chapters,
        chunking.missing.clone(),
    );
    summary.issues.extend(chunking.warnings.iter().cloned());
    summary.issues.extend(run_issues);
    summary.needs_review = summary.needs_review || !summary.issues.is_empty();

    Ok(DocumentRun { chunking, summary })
}
