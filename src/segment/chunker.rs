use super::*;

pub const DEFAULT_TITLE_SEARCH_MIN_LINE: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// First line scanned by the heading-title fallback; skips a front table
    /// of contents that repeats chapter titles.
    pub title_search_min_line: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            title_search_min_line: DEFAULT_TITLE_SEARCH_MIN_LINE,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChunkingOutcome {
    pub chunks: BTreeMap<u32, ChapterChunk>,
    pub missing: Vec<MissingChapter>,
    pub warnings: Vec<String>,
    pub total_lines: usize,
}

impl ChunkingOutcome {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartSource {
    SectionOne,
    TitleSearch,
    LowestSection(u32),
}

#[derive(Debug, Clone)]
struct SectionHeader {
    line_index: usize,
    chapter: u32,
    section: u32,
}

#[derive(Debug)]
pub struct MarkdownChunker {
    config: ChunkerConfig,
    section_header: Regex,
    toc_line: Regex,
}

impl MarkdownChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        Ok(Self {
            config,
            section_header: Regex::new(r"^#{1,2}\s+(\d+)\.(\d+)(?:\s+(.+?))?\s*$")
                .context("failed to compile section header regex")?,
            toc_line: Regex::new(r"\.{3,}\s*\d+\s*$")
                .context("failed to compile table-of-contents line regex")?,
        })
    }

    pub fn chunk(
        &self,
        document_text: &str,
        expected_chapters: &[ExpectedChapter],
    ) -> Result<ChunkingOutcome, ChunkError> {
        if document_text.trim().is_empty() {
            return Err(ChunkError::EmptyDocument);
        }
        if expected_chapters.is_empty() {
            return Err(ChunkError::NoExpectedChapters);
        }

        let line_starts = document_text
            .split_inclusive('\n')
            .scan(0usize, |offset, line| {
                let start = *offset;
                *offset += line.len();
                Some(start)
            })
            .collect::<Vec<usize>>();
        let lines = document_text.lines().collect::<Vec<&str>>();
        let total_lines = line_starts.len();
        let byte_offset = |line_index: usize| {
            line_starts
                .get(line_index)
                .copied()
                .unwrap_or(document_text.len())
        };

        let headers = self.scan_section_headers(&lines);
        let mut section_one_line = HashMap::<u32, usize>::new();
        let mut lowest_section = HashMap::<u32, (u32, usize)>::new();
        for header in &headers {
            if header.section == 1 {
                section_one_line
                    .entry(header.chapter)
                    .or_insert(header.line_index);
            }
            lowest_section
                .entry(header.chapter)
                .and_modify(|current| {
                    if header.section < current.0 {
                        *current = (header.section, header.line_index);
                    }
                })
                .or_insert((header.section, header.line_index));
        }
        debug!(
            section_headers = headers.len(),
            chapters_with_headers = lowest_section.len(),
            "scanned section headers"
        );

        let mut outcome = ChunkingOutcome {
            total_lines,
            ..ChunkingOutcome::default()
        };
        let mut seen = HashSet::<u32>::new();
        let mut starts = Vec::<(&ExpectedChapter, usize)>::new();

        for chapter in expected_chapters {
            if !seen.insert(chapter.chapter_number) {
                outcome.warnings.push(format!(
                    "Chapter {} listed more than once; later entry '{}' ignored",
                    chapter.chapter_number, chapter.title
                ));
                continue;
            }

            let located = section_one_line
                .get(&chapter.chapter_number)
                .map(|line| (*line, StartSource::SectionOne))
                .or_else(|| {
                    self.find_title_line(&lines, &chapter.title)
                        .map(|line| (line, StartSource::TitleSearch))
                })
                .or_else(|| {
                    lowest_section
                        .get(&chapter.chapter_number)
                        .map(|(section, line)| (*line, StartSource::LowestSection(*section)))
                });

            let Some((start_line, source)) = located else {
                warn!(
                    chapter = chapter.chapter_number,
                    title = %chapter.title,
                    "chapter start not located"
                );
                outcome.missing.push(MissingChapter {
                    chapter_number: chapter.chapter_number,
                    title: chapter.title.clone(),
                    reason: format!(
                        "no '{}.1' section header and no heading containing the title",
                        chapter.chapter_number
                    ),
                });
                continue;
            };

            match source {
                StartSource::SectionOne => {}
                StartSource::TitleSearch => outcome.warnings.push(format!(
                    "Chapter {} located by title search at line {}",
                    chapter.chapter_number, start_line
                )),
                StartSource::LowestSection(section) => outcome.warnings.push(format!(
                    "Chapter {} has no '{}.1' header; starting at section {}.{}",
                    chapter.chapter_number, chapter.chapter_number, chapter.chapter_number, section
                )),
            }
            starts.push((chapter, start_line));
        }

        starts.sort_by_key(|(chapter, _)| chapter.chapter_number);

        for (index, (chapter, start_line)) in starts.iter().enumerate() {
            let next_start = starts
                .get(index + 1)
                .map(|(_, line)| *line)
                .unwrap_or(total_lines);
            let end_line = if next_start < *start_line {
                outcome.warnings.push(format!(
                    "Chapter {} starts at line {} after the next chapter (line {}); document order differs from numbering",
                    chapter.chapter_number, start_line, next_start
                ));
                *start_line
            } else {
                next_start
            };

            let content =
                document_text[byte_offset(*start_line)..byte_offset(end_line)].to_string();
            outcome.chunks.insert(
                chapter.chapter_number,
                ChapterChunk {
                    chapter_number: chapter.chapter_number,
                    title: chapter.title.clone(),
                    char_count: content.chars().count(),
                    content,
                    start_line: *start_line,
                    end_line,
                },
            );
        }

        info!(
            resolved = outcome.chunks.len(),
            missing = outcome.missing.len(),
            total_lines,
            "chunked document"
        );

        Ok(outcome)
    }

    fn scan_section_headers(&self, lines: &[&str]) -> Vec<SectionHeader> {
        lines
            .iter()
            .enumerate()
            .filter_map(|(line_index, line)| {
                let line = line.trim();
                if self.toc_line.is_match(line) {
                    return None;
                }
                let captures = self.section_header.captures(line)?;
                let chapter = captures.get(1)?.as_str().parse::<u32>().ok()?;
                let section = captures.get(2)?.as_str().parse::<u32>().ok()?;
                Some(SectionHeader {
                    line_index,
                    chapter,
                    section,
                })
            })
            .collect()
    }

    fn find_title_line(&self, lines: &[&str], title: &str) -> Option<usize> {
        let needle = normalize_whitespace(title).to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let first_line = if self.config.title_search_min_line >= lines.len() {
            0
        } else {
            self.config.title_search_min_line
        };

        lines
            .iter()
            .enumerate()
            .skip(first_line)
            .find(|(_, line)| {
                let line = line.trim();
                line.starts_with('#')
                    && !self.toc_line.is_match(line)
                    && normalize_whitespace(line).to_lowercase().contains(&needle)
            })
            .map(|(line_index, _)| line_index)
    }
}

/// Splits chapter content on line boundaries into pieces of at most
/// `max_chunk_size` characters. A single longer line becomes its own piece.
pub fn chunk_large_chapter(content: &str, max_chunk_size: usize) -> Vec<String> {
    let mut chunks = Vec::<String>::new();
    let mut current = String::new();
    let mut current_chars = 0usize;

    for line in content.split_inclusive('\n') {
        let line_chars = line.chars().count();
        if current_chars > 0 && current_chars + line_chars > max_chunk_size {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        current.push_str(line);
        current_chars += line_chars;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
