use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{ChunkError, JsonRepairError, OracleError, RetryError, StructureError};
use crate::model::{
    ChapterChunk, Document, DocumentSummary, ExpectedChapter, ExtractedSubtopic,
    ExtractionResult, MissingChapter, StructuralLine, StructureCandidate, ValidationReport,
};
use crate::oracle::{Clock, ContentOracle, ContentRequest, StructureOracle};
use crate::util::{normalize_whitespace, now_utc_string};

mod chunker;
mod extractor;
mod json_repair;
mod pipeline;
mod progress;
mod retry;
mod structural_lines;
mod structure;
mod validator;

pub use chunker::{
    ChunkerConfig, ChunkingOutcome, DEFAULT_TITLE_SEARCH_MIN_LINE, MarkdownChunker,
    chunk_large_chapter,
};
pub use extractor::{
    ContentExtractor, DEFAULT_MIN_CONTENT_LENGTH, ExtractorConfig, validate_extraction,
};
pub use json_repair::{JsonRepairer, parse_repaired, repair_json};
pub use pipeline::{DocumentRun, segment_document};
pub use progress::{NoopProgress, ProgressLevel, ProgressSink, TracingProgress};
pub use retry::{CancellationToken, RetryPolicy, with_retry};
pub use structural_lines::StructuralLineExtractor;
pub use structure::{StructureConfig, StructureDetector, StructureOutcome};
pub use validator::StructureValidator;
