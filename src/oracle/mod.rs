use crate::error::OracleError;

mod client;
mod rate_limit;
#[cfg(test)]
pub mod testing;

pub use client::{
    DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL, OracleClient, OracleConfig,
    extract_message_content,
};
pub use rate_limit::{Clock, RateLimiter, SystemClock};

/// Text-generation call that proposes a topic/subtopic hierarchy. The
/// response is raw text and may be truncated or wrapped in prose.
pub trait StructureOracle {
    fn detect_structure(&self, text_sample: &str, subject_name: &str)
    -> Result<String, OracleError>;
}

#[derive(Debug, Clone, Copy)]
pub struct ContentRequest<'a> {
    pub chapter_number: u32,
    pub chapter_title: &'a str,
    pub chapter_text: &'a str,
    pub expected_subtopics: &'a [String],
    pub subject_name: &'a str,
}

/// Text-generation call that returns verbatim subtopic content for one
/// chapter chunk.
pub trait ContentOracle {
    fn extract(&self, request: &ContentRequest<'_>) -> Result<String, OracleError>;
}
