#![forbid(unsafe_code)]

use crate::fingerprint::Fingerprint;
use std::path::PathBuf;

/// Session identifier used when the host did not supply one at session start.
pub const UNKNOWN_SESSION_ID: &str = "unknown";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub session_id: String,
    pub root: PathBuf,
    pub started_at_ms: i64,
    /// `None` when the session started outside version control.
    pub baseline: Option<Fingerprint>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRecord {
    pub root: PathBuf,
    pub ran_at_ms: i64,
    pub fingerprint: Fingerprint,
    pub ok: bool,
    pub exit_code: i32,
    pub duration_ms: i64,
    pub output_tail: String,
}

impl RunRecord {
    /// Fresh means recorded for exactly `current` and no older than `ttl_seconds`.
    /// Records stamped in the future are never fresh.
    pub fn is_fresh_for(&self, current: &Fingerprint, now_ms: i64, ttl_seconds: u64) -> bool {
        if &self.fingerprint != current {
            return false;
        }
        let elapsed_ms = now_ms.saturating_sub(self.ran_at_ms);
        if elapsed_ms < 0 {
            return false;
        }
        let ttl_ms = i64::try_from(ttl_seconds.saturating_mul(1000)).unwrap_or(i64::MAX);
        elapsed_ms <= ttl_ms
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointKind {
    SessionStart,
    PreAction,
    Stop,
}

impl CheckpointKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStart => "session-start",
            Self::PreAction => "pre-action",
            Self::Stop => "stop",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointRequest {
    pub kind: CheckpointKind,
    pub session_id: Option<String>,
    pub root: PathBuf,
    /// Set by the host when this checkpoint retries one it previously blocked.
    pub retry_signal: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    AllowWithReminder,
    Block,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::AllowWithReminder => "allow-with-reminder",
            Self::Block => "block",
        }
    }

    pub fn is_block(self) -> bool {
        matches!(self, Self::Block)
    }
}

/// Failure taxonomy. Every condition resolves into a decision; none escapes as an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateCondition {
    ComparisonUnavailable,
    VerificationMissing,
    VerificationFailed,
    MalformedRequest,
}

/// Which rule of the state machine produced a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateBranch {
    BaselineRecorded,
    BoundaryMissingSuite,
    BoundaryWrapped,
    UnverifiableReminder,
    UnverifiableMissingSuite,
    Unchanged,
    MissingSuite,
    CachedPass,
    CachedFailure,
    RanPassed,
    RanFailed,
    TaskUngated,
    TaskTracked,
    TaskUntracked,
    MalformedInput,
}

impl GateBranch {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BaselineRecorded => "baseline_recorded",
            Self::BoundaryMissingSuite => "boundary_missing_suite",
            Self::BoundaryWrapped => "boundary_wrapped",
            Self::UnverifiableReminder => "unverifiable_reminder",
            Self::UnverifiableMissingSuite => "unverifiable_missing_suite",
            Self::Unchanged => "unchanged",
            Self::MissingSuite => "missing_suite",
            Self::CachedPass => "cached_pass",
            Self::CachedFailure => "cached_failure",
            Self::RanPassed => "ran_passed",
            Self::RanFailed => "ran_failed",
            Self::TaskUngated => "task_ungated",
            Self::TaskTracked => "task_tracked",
            Self::TaskUntracked => "task_untracked",
            Self::MalformedInput => "malformed_input",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointResponse {
    pub decision: Decision,
    pub reason: Option<String>,
    pub condition: Option<GateCondition>,
    pub branch: GateBranch,
}

impl CheckpointResponse {
    pub fn allow(branch: GateBranch) -> Self {
        Self {
            decision: Decision::Allow,
            reason: None,
            condition: None,
            branch,
        }
    }

    pub fn remind(branch: GateBranch, reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::AllowWithReminder,
            reason: Some(reason.into()),
            condition: None,
            branch,
        }
    }

    pub fn block(branch: GateBranch, condition: GateCondition, reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Block,
            reason: Some(reason.into()),
            condition: Some(condition),
            branch,
        }
    }

    pub fn with_condition(mut self, condition: GateCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Fail-closed response for input that could not be parsed.
    pub fn malformed(detail: &str) -> Self {
        Self::block(
            GateBranch::MalformedInput,
            GateCondition::MalformedRequest,
            crate::messages::malformed_request(detail),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(rev: &str, ran_at_ms: i64) -> RunRecord {
        RunRecord {
            root: PathBuf::from("/repo"),
            ran_at_ms,
            fingerprint: Fingerprint::new(Some(rev.to_string()), Some("d0".to_string())),
            ok: true,
            exit_code: 0,
            duration_ms: 10,
            output_tail: String::new(),
        }
    }

    #[test]
    fn freshness_boundary_is_inclusive() {
        let rec = record("A", 1_000);
        let current = rec.fingerprint.clone();
        assert!(rec.is_fresh_for(&current, 1_000 + 900_000, 900));
        assert!(!rec.is_fresh_for(&current, 1_000 + 900_001, 900));
        assert!(rec.is_fresh_for(&current, 1_000, 0));
        assert!(!rec.is_fresh_for(&current, 1_001, 0));
    }

    #[test]
    fn freshness_requires_same_fingerprint() {
        let rec = record("A", 1_000);
        let other = Fingerprint::new(Some("B".to_string()), Some("d0".to_string()));
        assert!(!rec.is_fresh_for(&other, 1_000, 900));
    }

    #[test]
    fn future_records_are_not_fresh() {
        let rec = record("A", 5_000);
        let current = rec.fingerprint.clone();
        assert!(!rec.is_fresh_for(&current, 4_999, 900));
    }

    #[test]
    fn malformed_response_blocks() {
        let resp = CheckpointResponse::malformed("expected value at line 1 column 1");
        assert_eq!(resp.decision, Decision::Block);
        assert_eq!(resp.condition, Some(GateCondition::MalformedRequest));
        assert!(
            resp.reason
                .as_deref()
                .unwrap_or_default()
                .contains("expected value at line 1 column 1")
        );
    }
}
