use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressLevel {
    Info,
    Warning,
    Error,
}

impl ProgressLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Observer for extraction milestones (start, retry, completion). Nothing
/// reported here feeds back into the run.
pub trait ProgressSink {
    fn report(&self, level: ProgressLevel, message: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, level: ProgressLevel, message: &str) {
        match level {
            ProgressLevel::Info => info!("{message}"),
            ProgressLevel::Warning => warn!("{message}"),
            ProgressLevel::Error => tracing::error!("{message}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _level: ProgressLevel, _message: &str) {}
}
