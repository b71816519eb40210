#![forbid(unsafe_code)]

use crate::model::{RunRecord, Session};
use std::path::Path;

/// A persistence backend failed. The gate treats these as soft.
#[derive(Debug, thiserror::Error)]
#[error("store fault: {0}")]
pub struct StoreFault(pub String);

impl StoreFault {
    pub fn new(err: impl std::fmt::Display) -> Self {
        Self(err.to_string())
    }
}

pub trait BaselineStore {
    /// First write wins; returns `false` when a baseline already existed.
    fn record_baseline(&self, session: &Session) -> Result<bool, StoreFault>;
    fn baseline(&self, session_id: &str) -> Result<Option<Session>, StoreFault>;
}

/// Single-slot, last-write-wins cache of the latest verification outcome per root.
pub trait RunCache {
    fn last_run(&self, root: &Path) -> Result<Option<RunRecord>, StoreFault>;
    fn put_last_run(&self, record: &RunRecord) -> Result<(), StoreFault>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: i64,
}

impl RunOutcome {
    pub fn ok(&self) -> bool {
        self.exit_code == 0
    }
}

pub trait VerificationRunner {
    fn command_present(&self, root: &Path, command: &str) -> bool;
    /// Blocks until the command exits. Failing to spawn is reported as a failed outcome.
    fn run(&self, root: &Path, command: &str) -> RunOutcome;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskProbe {
    /// The root does not use task tracking.
    NotTracked,
    /// The tracker exists but could not be queried.
    Unavailable,
    InProgress(usize),
    Idle,
}

pub trait TaskTracker {
    fn probe(&self, root: &Path) -> TaskProbe;
}

pub trait Clock {
    fn now_ms(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        crate::time::now_ms_i64()
    }
}
