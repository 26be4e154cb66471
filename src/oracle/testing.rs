use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{Clock, ContentOracle, ContentRequest, StructureOracle};
use crate::error::OracleError;

pub struct FakeClock {
    start: Instant,
    offset: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.offset.lock().unwrap() += duration;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock().unwrap()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
        self.advance(duration);
    }
}

/// Replays queued responses in order; once drained every call times out.
pub struct ScriptedOracle {
    responses: RefCell<VecDeque<Result<String, OracleError>>>,
    calls: Cell<u32>,
    last_subject: RefCell<Option<String>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Result<String, OracleError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: Cell::new(0),
            last_subject: RefCell::new(None),
        }
    }

    pub fn always_timing_out() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }

    pub fn last_subject(&self) -> Option<String> {
        self.last_subject.borrow().clone()
    }

    fn next(&self, subject_name: &str) -> Result<String, OracleError> {
        self.calls.set(self.calls.get() + 1);
        *self.last_subject.borrow_mut() = Some(subject_name.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(OracleError::Timeout(Duration::from_secs(30))))
    }
}

impl StructureOracle for ScriptedOracle {
    fn detect_structure(
        &self,
        _text_sample: &str,
        subject_name: &str,
    ) -> Result<String, OracleError> {
        self.next(subject_name)
    }
}

impl ContentOracle for ScriptedOracle {
    fn extract(&self, request: &ContentRequest<'_>) -> Result<String, OracleError> {
        self.next(request.subject_name)
    }
}
