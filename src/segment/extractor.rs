use super::*;

pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 200;

const ALL_ATTEMPTS_FAILED: &str = "All API attempts failed";
const API_FAILURE_NOTE: &str = "API extraction failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorConfig {
    pub retry: RetryPolicy,
    pub min_content_length: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            min_content_length: DEFAULT_MIN_CONTENT_LENGTH,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    extractions: Vec<RawExtraction>,
    #[serde(default)]
    chapter_summary: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    subtopic_title: String,
    #[serde(default)]
    found: Option<bool>,
    #[serde(default)]
    complete: Option<bool>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    char_count: Option<usize>,
    #[serde(default)]
    notes: String,
}

pub struct ContentExtractor<'a> {
    oracle: &'a dyn ContentOracle,
    clock: &'a dyn Clock,
    progress: &'a dyn ProgressSink,
    config: ExtractorConfig,
    repairer: JsonRepairer,
    chapter_heading: Regex,
}

impl<'a> ContentExtractor<'a> {
    pub fn new(
        oracle: &'a dyn ContentOracle,
        clock: &'a dyn Clock,
        progress: &'a dyn ProgressSink,
        config: ExtractorConfig,
    ) -> Result<Self> {
        Ok(Self {
            oracle,
            clock,
            progress,
            config,
            repairer: JsonRepairer::with_record_markers(["notes"]),
            chapter_heading: Regex::new(r"(?m)^#\s+(\d+)[.\s]")
                .context("failed to compile chapter heading regex")?,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Always yields one entry per expected title, in the expected order,
    /// whatever the oracle returns or fails to return.
    pub fn extract_chapter(
        &self,
        chapter_text: &str,
        chapter_title: &str,
        chapter_number: u32,
        expected_subtopic_titles: &[String],
        subject_name: &str,
        cancel: &CancellationToken,
    ) -> ExtractionResult {
        self.progress.report(
            ProgressLevel::Info,
            &format!(
                "Extracting chapter {chapter_number} '{chapter_title}' ({} subtopics, {} chars)",
                expected_subtopic_titles.len(),
                chapter_text.chars().count()
            ),
        );

        if expected_subtopic_titles.is_empty() {
            return ExtractionResult::new(
                chapter_number,
                chapter_title,
                Vec::new(),
                vec!["No expected subtopics supplied".to_string()],
            );
        }

        let request = ContentRequest {
            chapter_number,
            chapter_title,
            chapter_text,
            expected_subtopics: expected_subtopic_titles,
            subject_name,
        };

        let mut attempts = 0;
        let raw = match with_retry(
            &self.config.retry,
            self.clock,
            cancel,
            self.progress,
            &format!("chapter {chapter_number} extraction"),
            |attempt| {
                attempts = attempt;
                self.oracle.extract(&request)
            },
        ) {
            Ok(raw) => raw,
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(chapter = chapter_number, attempts, error = %last, "content oracle exhausted");
                let mut result = failed_result(
                    chapter_number,
                    chapter_title,
                    expected_subtopic_titles,
                    API_FAILURE_NOTE,
                    vec![
                        ALL_ATTEMPTS_FAILED.to_string(),
                        format!("Last oracle error: {last}"),
                    ],
                );
                result.attempts = attempts;
                return result;
            }
            Err(RetryError::Cancelled { attempts }) => {
                let mut result = failed_result(
                    chapter_number,
                    chapter_title,
                    expected_subtopic_titles,
                    "Extraction cancelled",
                    vec!["Extraction cancelled before the oracle answered".to_string()],
                );
                result.attempts = attempts;
                return result;
            }
        };

        let response = match self.repairer.parse::<ContentResponse>(&raw) {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    chapter = chapter_number,
                    error = %err,
                    raw_chars = raw.chars().count(),
                    repaired_chars = err.repaired_text().chars().count(),
                    "content response unusable"
                );
                let mut result = failed_result(
                    chapter_number,
                    chapter_title,
                    expected_subtopic_titles,
                    "Malformed oracle response",
                    vec![format!("Oracle response could not be parsed: {err}")],
                );
                result.attempts = attempts;
                return result;
            }
        };

        let mut result = self.assemble(
            chapter_number,
            chapter_title,
            expected_subtopic_titles,
            response.extractions,
        );
        result.attempts = attempts;
        result.chapter_summary = response.chapter_summary;

        self.progress.report(
            ProgressLevel::Info,
            &format!(
                "Chapter {chapter_number}: {}/{} found, {} complete",
                result.total_found, result.total_expected, result.total_complete
            ),
        );

        result
    }

    fn assemble(
        &self,
        chapter_number: u32,
        chapter_title: &str,
        expected_titles: &[String],
        records: Vec<RawExtraction>,
    ) -> ExtractionResult {
        let assignments = match_titles(expected_titles, &records);
        let mut issues = Vec::<String>::new();

        let subtopics = expected_titles
            .iter()
            .zip(&assignments)
            .map(|(title, assigned)| match assigned {
                Some(record_index) => {
                    let record = &records[*record_index];
                    let subtopic = self.build_subtopic(title, record, chapter_number);
                    if !subtopic.found {
                        issues.push(format!("Subtopic '{title}' not found"));
                    } else if !subtopic.complete {
                        issues.push(format!("Subtopic '{title}' incomplete: {}", subtopic.notes));
                    }
                    subtopic
                }
                None => {
                    issues.push(format!("Subtopic '{title}' not found"));
                    ExtractedSubtopic::not_found(title, "Not returned by oracle")
                }
            })
            .collect::<Vec<ExtractedSubtopic>>();

        for (record_index, record) in records.iter().enumerate() {
            if !assignments.contains(&Some(record_index)) {
                issues.push(format!(
                    "Oracle returned unexpected subtopic '{}'",
                    record.subtopic_title
                ));
            }
        }

        ExtractionResult::new(chapter_number, chapter_title, subtopics, issues)
    }

    fn build_subtopic(
        &self,
        title: &str,
        record: &RawExtraction,
        chapter_number: u32,
    ) -> ExtractedSubtopic {
        let mut notes = Vec::<String>::new();
        if !record.notes.trim().is_empty() {
            notes.push(record.notes.trim().to_string());
        }
        if normalize_title(&record.subtopic_title) != normalize_title(title) {
            notes.push(format!("Matched oracle title '{}'", record.subtopic_title));
        }

        let content = record.content.trim();
        let found = record.found.unwrap_or(!content.is_empty());
        if !found || content.is_empty() {
            let reason = if found {
                "Oracle returned empty content"
            } else {
                "Not found in chapter text"
            };
            notes.push(reason.to_string());
            return ExtractedSubtopic::not_found(title, notes.join("; "));
        }

        let char_count = content.chars().count();
        let mut complete = true;
        if record.complete == Some(false) {
            complete = false;
            notes.push("Oracle flagged content as incomplete".to_string());
        }
        if char_count < self.config.min_content_length {
            complete = false;
            notes.push(format!(
                "Content shorter than {} characters",
                self.config.min_content_length
            ));
        }
        if let Some(heading) = self.foreign_chapter_heading(content, chapter_number) {
            complete = false;
            notes.push(format!("Contains heading of another chapter: '{heading}'"));
        }
        if let Some(reported) = record.char_count {
            if reported.abs_diff(char_count) > char_count / 2 {
                debug!(title, reported, char_count, "oracle char_count disagrees with content");
            }
        }

        ExtractedSubtopic {
            title: title.to_string(),
            content: content.to_string(),
            found: true,
            complete,
            char_count,
            notes: notes.join("; "),
        }
    }

    fn foreign_chapter_heading<'t>(&self, content: &'t str, chapter_number: u32) -> Option<&'t str> {
        self.chapter_heading.captures_iter(content).find_map(|captures| {
            let number = captures.get(1)?.as_str().parse::<u32>().ok()?;
            if number == chapter_number {
                return None;
            }
            let start = captures.get(0)?.start();
            content[start..].lines().next()
        })
    }
}

fn normalize_title(title: &str) -> String {
    normalize_whitespace(title).to_lowercase()
}

// Exact matches claim records first so a fuzzy match cannot steal a record
// that another title names precisely.
fn match_titles(expected_titles: &[String], records: &[RawExtraction]) -> Vec<Option<usize>> {
    let returned = records
        .iter()
        .map(|record| normalize_title(&record.subtopic_title))
        .collect::<Vec<String>>();
    let mut used = vec![false; records.len()];
    let mut assignments = vec![None; expected_titles.len()];

    for (title_index, title) in expected_titles.iter().enumerate() {
        let wanted = normalize_title(title);
        if let Some(record_index) =
            (0..records.len()).find(|index| !used[*index] && returned[*index] == wanted)
        {
            used[record_index] = true;
            assignments[title_index] = Some(record_index);
        }
    }

    for (title_index, title) in expected_titles.iter().enumerate() {
        if assignments[title_index].is_some() {
            continue;
        }
        let wanted = normalize_title(title);
        if wanted.is_empty() {
            continue;
        }
        if let Some(record_index) = (0..records.len()).find(|index| {
            let candidate = &returned[*index];
            !used[*index]
                && !candidate.is_empty()
                && (candidate.contains(&wanted) || wanted.contains(candidate.as_str()))
        }) {
            used[record_index] = true;
            assignments[title_index] = Some(record_index);
        }
    }

    assignments
}

fn failed_result(
    chapter_number: u32,
    chapter_title: &str,
    expected_titles: &[String],
    note: &str,
    issues: Vec<String>,
) -> ExtractionResult {
    let subtopics = expected_titles
        .iter()
        .map(|title| ExtractedSubtopic::not_found(title, note))
        .collect();
    ExtractionResult::new(chapter_number, chapter_title, subtopics, issues)
}

/// A subtopic passes when it was found, is not flagged incomplete, and has
/// at least `min_length` characters. Each failing condition is reported.
pub fn validate_extraction(extraction: &ExtractionResult, min_length: usize) -> ValidationReport {
    let mut issues = Vec::<String>::new();

    for subtopic in &extraction.subtopics {
        if !subtopic.found {
            issues.push(format!("'{}': not found in chapter text", subtopic.title));
            continue;
        }
        if !subtopic.complete {
            issues.push(format!(
                "'{}': flagged incomplete (possible truncation or cross-chapter content)",
                subtopic.title
            ));
        }
        if subtopic.char_count < min_length {
            issues.push(format!(
                "'{}': content has {} characters, below minimum {}",
                subtopic.title, subtopic.char_count, min_length
            ));
        }
    }

    ValidationReport::from_issues(issues)
}
