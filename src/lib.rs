pub mod error;
pub mod model;
pub mod oracle;
pub mod segment;
pub mod store;
pub mod util;

pub use error::{ChunkError, JsonRepairError, OracleError, RetryError, StructureError};
pub use model::{
    ChapterChunk, ExpectedChapter, ExtractedSubtopic, ExtractionResult, StructuralLine,
    StructureCandidate, SubtopicCandidate, TopicCandidate, ValidationReport,
};
