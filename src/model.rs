use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::sha256_text;

#[derive(Debug, Clone)]
pub struct Document {
    pub source_id: String,
    pub text: String,
}

impl Document {
    pub fn new(text: String) -> Self {
        Self {
            source_id: sha256_text(&text),
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralLine {
    pub line_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtopicCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub subtopics: Vec<SubtopicCandidate>,
}

/// Hierarchy as returned by the structure oracle. `topics` stays optional so
/// a response without the key can be reported rather than rejected at parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureCandidate {
    #[serde(default)]
    pub topics: Option<Vec<TopicCandidate>>,
}

impl StructureCandidate {
    pub fn topics(&self) -> &[TopicCandidate] {
        self.topics.as_deref().unwrap_or_default()
    }

    pub fn expected_chapters(&self) -> Vec<ExpectedChapter> {
        self.topics()
            .iter()
            .enumerate()
            .map(|(index, topic)| ExpectedChapter {
                chapter_number: topic_number(index, topic),
                title: topic.name.trim().to_string(),
            })
            .collect()
    }

    pub fn subtopic_titles(&self, chapter_number: u32) -> Vec<String> {
        let Some(topic) = self
            .topics()
            .iter()
            .enumerate()
            .find(|(index, topic)| topic_number(*index, topic) == chapter_number)
            .map(|(_, topic)| topic)
        else {
            return Vec::new();
        };

        let mut ordered = topic
            .subtopics
            .iter()
            .enumerate()
            .map(|(index, subtopic)| {
                let order = if subtopic.order > 0 {
                    subtopic.order
                } else {
                    index as u32 + 1
                };
                (order, subtopic.name.trim())
            })
            .filter(|(_, name)| !name.is_empty())
            .collect::<Vec<(u32, &str)>>();
        ordered.sort_by_key(|(order, _)| *order);

        ordered
            .into_iter()
            .map(|(_, name)| name.to_string())
            .collect()
    }
}

fn topic_number(index: usize, topic: &TopicCandidate) -> u32 {
    if topic.order > 0 {
        topic.order
    } else {
        index as u32 + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<String>) -> Self {
        Self {
            is_valid: issues.is_empty(),
            issues,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedChapter {
    pub chapter_number: u32,
    pub title: String,
}

impl ExpectedChapter {
    pub fn new(chapter_number: u32, title: impl Into<String>) -> Self {
        Self {
            chapter_number,
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterChunk {
    pub chapter_number: u32,
    pub title: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub char_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingChapter {
    pub chapter_number: u32,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedSubtopic {
    pub title: String,
    pub content: String,
    pub found: bool,
    pub complete: bool,
    pub char_count: usize,
    pub notes: String,
}

impl ExtractedSubtopic {
    pub fn not_found(title: &str, notes: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            content: String::new(),
            found: false,
            complete: false,
            char_count: 0,
            notes: notes.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub chapter_number: u32,
    pub chapter_title: String,
    pub subtopics: Vec<ExtractedSubtopic>,
    pub total_expected: usize,
    pub total_found: usize,
    pub total_complete: usize,
    pub issues: Vec<String>,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_summary: Option<Value>,
}

impl ExtractionResult {
    pub fn new(
        chapter_number: u32,
        chapter_title: &str,
        subtopics: Vec<ExtractedSubtopic>,
        issues: Vec<String>,
    ) -> Self {
        let total_found = subtopics.iter().filter(|subtopic| subtopic.found).count();
        let total_complete = subtopics
            .iter()
            .filter(|subtopic| subtopic.found && subtopic.complete)
            .count();

        Self {
            chapter_number,
            chapter_title: chapter_title.to_string(),
            total_expected: subtopics.len(),
            total_found,
            total_complete,
            subtopics,
            issues,
            attempts: 0,
            chapter_summary: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub source_id: String,
    pub generated_at: String,
    pub total_expected: usize,
    pub total_found: usize,
    pub total_complete: usize,
    pub needs_review: bool,
    pub issues: Vec<String>,
    pub missing_chapters: Vec<MissingChapter>,
    pub chapters: Vec<ExtractionResult>,
}

impl DocumentSummary {
    pub fn new(
        source_id: &str,
        generated_at: String,
        chapters: Vec<ExtractionResult>,
        missing_chapters: Vec<MissingChapter>,
    ) -> Self {
        let mut issues = missing_chapters
            .iter()
            .map(|missing| {
                format!(
                    "Chapter {} '{}' not located: {}",
                    missing.chapter_number, missing.title, missing.reason
                )
            })
            .collect::<Vec<String>>();
        for chapter in &chapters {
            issues.extend(
                chapter
                    .issues
                    .iter()
                    .map(|issue| format!("Chapter {}: {}", chapter.chapter_number, issue)),
            );
        }

        let total_expected = chapters.iter().map(|chapter| chapter.total_expected).sum();
        let total_found = chapters.iter().map(|chapter| chapter.total_found).sum();
        let total_complete = chapters.iter().map(|chapter| chapter.total_complete).sum();

        Self {
            source_id: source_id.to_string(),
            generated_at,
            total_expected,
            total_found,
            total_complete,
            needs_review: !issues.is_empty() || total_complete < total_expected,
            issues,
            missing_chapters,
            chapters,
        }
    }
}
