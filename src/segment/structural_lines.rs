use super::*;

const HEADING_KEYWORDS: [&str; 7] = [
    "chapter", "part", "unit", "section", "module", "topic", "lesson",
];
const SHORT_TITLE_MAX_CHARS: usize = 85;
const UPPERCASE_MIN_CHARS: usize = 9;
const UPPERCASE_MAX_CHARS: usize = 99;

/// Flags lines that look like headings. Deliberately permissive; structure
/// validation is where noise gets rejected.
#[derive(Debug)]
pub struct StructuralLineExtractor {
    multi_level_number: Regex,
    chapter_number: Regex,
}

impl StructuralLineExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            multi_level_number: Regex::new(r"^\d+(?:\.\d+)+\s")
                .context("failed to compile multi-level number regex")?,
            chapter_number: Regex::new(r"^\d+\s+[A-Z]")
                .context("failed to compile chapter number regex")?,
        })
    }

    pub fn extract(&self, document_text: &str) -> Vec<StructuralLine> {
        document_text
            .lines()
            .enumerate()
            .filter_map(|(line_index, raw_line)| {
                let line = raw_line.trim();
                if line.is_empty() || !self.is_structural(line) {
                    return None;
                }
                Some(StructuralLine {
                    line_index,
                    text: line.to_string(),
                })
            })
            .collect()
    }

    pub fn is_structural(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }

        line.starts_with('#')
            || line.starts_with("**")
            || self.multi_level_number.is_match(line)
            || self.chapter_number.is_match(line)
            || starts_with_heading_keyword(line)
            || is_uppercase_heading(line)
            || is_short_title(line)
    }
}

fn starts_with_heading_keyword(line: &str) -> bool {
    let lower = line.to_lowercase();
    HEADING_KEYWORDS.iter().any(|keyword| {
        lower.strip_prefix(keyword).is_some_and(|rest| {
            rest.chars()
                .next()
                .is_none_or(|next| !next.is_alphanumeric())
        })
    })
}

fn is_uppercase_heading(line: &str) -> bool {
    let char_count = line.chars().count();
    (UPPERCASE_MIN_CHARS..=UPPERCASE_MAX_CHARS).contains(&char_count)
        && line.chars().any(char::is_alphabetic)
        && line == line.to_uppercase()
}

// Sentence punctuation at the end marks body text ("Normal body text."),
// which would otherwise pass on length and capitalization alone.
fn is_short_title(line: &str) -> bool {
    let Some(first) = line.chars().next() else {
        return false;
    };

    line.chars().count() < SHORT_TITLE_MAX_CHARS
        && (first.is_uppercase() || first.is_ascii_digit())
        && !line.ends_with(['.', ',', ';', '!', '?'])
}
