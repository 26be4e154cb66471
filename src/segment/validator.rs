use super::*;

const MAX_TOPIC_NAME_CHARS: usize = 60;
const MAX_SUBTOPICS_PER_TOPIC: usize = 15;
const METADATA_KEYWORDS: [&str; 8] = [
    "KEY WORD",
    "KEYWORDS",
    "ACTIVITY",
    "INTRODUCTION",
    "EXERCISE",
    "LEARNING OBJECTIVES",
    "REVISION QUESTIONS",
    "SYLLABUS",
];

/// Quality checks for an oracle-proposed hierarchy. Every violated rule
/// contributes its own issue; the candidate is never modified.
#[derive(Debug)]
pub struct StructureValidator {
    syllabus_code: Regex,
}

impl StructureValidator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            syllabus_code: Regex::new(r"\b[A-Z]{2,4}\d{3,4}[A-Z]?\b")
                .context("failed to compile syllabus code regex")?,
        })
    }

    pub fn validate(&self, candidate: &StructureCandidate) -> ValidationReport {
        let Some(topics) = candidate.topics.as_ref() else {
            return ValidationReport::from_issues(vec![
                "Missing 'topics' key in structure response".to_string(),
            ]);
        };

        let mut issues = Vec::<String>::new();
        if topics.is_empty() {
            issues.push("No topics found".to_string());
        }

        for (index, topic) in topics.iter().enumerate() {
            let position = index + 1;
            let name = topic.name.trim();
            let label = if name.is_empty() {
                format!("Topic {position}")
            } else {
                format!("Topic {position} '{name}'")
            };

            if name.is_empty() {
                issues.push(format!("{label}: missing name"));
            } else {
                self.check_topic_name(&label, name, &mut issues);
            }

            match topic.subtopics.len() {
                0 => issues.push(format!("{label}: no subtopics")),
                1 => issues.push(format!(
                    "{label}: only one subtopic, consider merging it into a neighbouring topic"
                )),
                count if count > MAX_SUBTOPICS_PER_TOPIC => issues.push(format!(
                    "{label}: {count} subtopics exceeds {MAX_SUBTOPICS_PER_TOPIC}, likely several chapters merged into one"
                )),
                _ => {}
            }

            for (subtopic_index, subtopic) in topic.subtopics.iter().enumerate() {
                if subtopic.name.trim().is_empty() {
                    issues.push(format!(
                        "{label}: subtopic {} missing name",
                        subtopic_index + 1
                    ));
                }
            }
        }

        ValidationReport::from_issues(issues)
    }

    pub fn validate_value(&self, value: &Value) -> ValidationReport {
        match serde_json::from_value::<StructureCandidate>(value.clone()) {
            Ok(candidate) => self.validate(&candidate),
            Err(err) => ValidationReport::from_issues(vec![format!(
                "Structure response does not match the topic schema: {err}"
            )]),
        }
    }

    fn check_topic_name(&self, label: &str, name: &str, issues: &mut Vec<String>) {
        let char_count = name.chars().count();
        if char_count > MAX_TOPIC_NAME_CHARS {
            issues.push(format!(
                "{label}: name is {char_count} characters, likely a paragraph rather than a title"
            ));
        }

        let upper = name.to_uppercase();
        for keyword in METADATA_KEYWORDS {
            if upper.contains(keyword) {
                issues.push(format!("{label}: name contains metadata keyword '{keyword}'"));
            }
        }

        if let Some(code) = self.syllabus_code.find(name) {
            issues.push(format!(
                "{label}: name contains syllabus code '{}'",
                code.as_str()
            ));
        }
    }
}
