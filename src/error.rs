use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JsonRepairError {
    #[error("oracle output could not be repaired into valid JSON")]
    Malformed { original: String, repaired: String },
    #[error("repaired JSON does not match the expected shape: {source}")]
    Schema {
        repaired: String,
        #[source]
        source: serde_json::Error,
    },
}

impl JsonRepairError {
    pub fn repaired_text(&self) -> &str {
        match self {
            Self::Malformed { repaired, .. } | Self::Schema { repaired, .. } => repaired,
        }
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("oracle response missing generated text: {0}")]
    InvalidResponse(String),
    #[error("oracle misconfigured: {0}")]
    Config(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkError {
    #[error("document is empty")]
    EmptyDocument,
    #[error("no expected chapters supplied")]
    NoExpectedChapters,
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("all {attempts} attempts failed; last error: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: E,
    },
    #[error("cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E: std::error::Error + 'static> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }
}

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("document is empty")]
    EmptyDocument,
    #[error("structure oracle unavailable: {0}")]
    Oracle(#[from] RetryError<OracleError>),
    #[error(transparent)]
    Json(#[from] JsonRepairError),
}
