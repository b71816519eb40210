#![forbid(unsafe_code)]

use crate::config::{GateConfig, UnverifiablePolicy};
use crate::fingerprint::{Fingerprint, FingerprintProbe, FingerprintProvider};
use crate::messages;
use crate::model::{
    CheckpointKind, CheckpointRequest, CheckpointResponse, GateBranch, GateCondition, RunRecord,
    Session, UNKNOWN_SESSION_ID,
};
use crate::output::{bound_output, combine_streams};
use crate::ports::{BaselineStore, Clock, RunCache, VerificationRunner};

/// Collaborators the engine consults. All are borrowed for one invocation.
#[derive(Clone, Copy)]
pub struct GatePorts<'a> {
    pub fingerprints: &'a dyn FingerprintProvider,
    pub baselines: &'a dyn BaselineStore,
    pub runs: &'a dyn RunCache,
    pub runner: &'a dyn VerificationRunner,
    pub clock: &'a dyn Clock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeReason {
    NoSessionId,
    NoSession,
    BaselineUnavailable,
    RootMismatch,
    FingerprintDiffers,
}

impl ChangeReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoSessionId => "no_session_id",
            Self::NoSession => "no_session",
            Self::BaselineUnavailable => "baseline_unavailable",
            Self::RootMismatch => "root_mismatch",
            Self::FingerprintDiffers => "fingerprint_differs",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaselineComparison {
    Unchanged,
    Changed(ChangeReason),
}

/// Checkpoint state machine. `evaluate` is total: every request yields a decision.
pub struct GateEngine<'a> {
    config: &'a GateConfig,
    ports: GatePorts<'a>,
}

impl<'a> GateEngine<'a> {
    pub fn new(config: &'a GateConfig, ports: GatePorts<'a>) -> Self {
        Self { config, ports }
    }

    pub fn evaluate(&self, request: &CheckpointRequest) -> CheckpointResponse {
        let response = match request.kind {
            CheckpointKind::SessionStart => self.session_start(request),
            CheckpointKind::PreAction => self.pre_action(request),
            CheckpointKind::Stop => self.stop(request),
        };
        tracing::info!(
            checkpoint = request.kind.as_str(),
            root = %request.root.display(),
            decision = response.decision.as_str(),
            branch = response.branch.as_str(),
            "checkpoint evaluated"
        );
        response
    }

    fn suite_missing(&self, request: &CheckpointRequest) -> bool {
        self.config.require_verification
            && !self
                .ports
                .runner
                .command_present(&request.root, &self.config.verification_command)
    }

    fn missing_block(&self, request: &CheckpointRequest, branch: GateBranch) -> CheckpointResponse {
        CheckpointResponse::block(
            branch,
            GateCondition::VerificationMissing,
            messages::suite_missing(&self.config.verification_command, &request.root),
        )
    }

    fn session_start(&self, request: &CheckpointRequest) -> CheckpointResponse {
        let session_id = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(UNKNOWN_SESSION_ID);
        let session = Session {
            session_id: session_id.to_string(),
            root: request.root.clone(),
            started_at_ms: self.ports.clock.now_ms(),
            baseline: self.ports.fingerprints.probe(&request.root).into_fingerprint(),
        };
        match self.ports.baselines.record_baseline(&session) {
            Ok(true) => tracing::debug!(session_id, "baseline recorded"),
            Ok(false) => tracing::debug!(session_id, "baseline already recorded; keeping first"),
            Err(err) => tracing::warn!(session_id, error = %err, "failed to record baseline"),
        }
        CheckpointResponse::remind(
            GateBranch::BaselineRecorded,
            messages::session_start_reminder(&self.config.verification_command),
        )
    }

    fn pre_action(&self, request: &CheckpointRequest) -> CheckpointResponse {
        if self.suite_missing(request) {
            return self.missing_block(request, GateBranch::BoundaryMissingSuite);
        }
        CheckpointResponse::remind(
            GateBranch::BoundaryWrapped,
            messages::boundary_wrapped(&self.config.verification_command),
        )
    }

    fn stop(&self, request: &CheckpointRequest) -> CheckpointResponse {
        let current = match self.ports.fingerprints.probe(&request.root) {
            FingerprintProbe::Comparable(fp) => fp,
            FingerprintProbe::NotARepository => {
                if self.suite_missing(request) {
                    return self.missing_block(request, GateBranch::UnverifiableMissingSuite);
                }
                return match self.config.unverifiable_policy {
                    UnverifiablePolicy::Remind => CheckpointResponse::remind(
                        GateBranch::UnverifiableReminder,
                        messages::soft_stop_reminder(),
                    )
                    .with_condition(GateCondition::ComparisonUnavailable),
                    UnverifiablePolicy::Verify => self.verify(request, None),
                };
            }
        };

        match self.compare_to_baseline(request, &current) {
            BaselineComparison::Unchanged => CheckpointResponse::allow(GateBranch::Unchanged),
            BaselineComparison::Changed(reason) => {
                tracing::debug!(reason = reason.as_str(), "treating workspace as changed");
                self.verify(request, Some(current))
            }
        }
    }

    pub fn compare_to_baseline(
        &self,
        request: &CheckpointRequest,
        current: &Fingerprint,
    ) -> BaselineComparison {
        let Some(session_id) = request
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        else {
            return BaselineComparison::Changed(ChangeReason::NoSessionId);
        };
        let session = match self.ports.baselines.baseline(session_id) {
            Ok(Some(session)) => session,
            Ok(None) => return BaselineComparison::Changed(ChangeReason::NoSession),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "failed to read baseline");
                return BaselineComparison::Changed(ChangeReason::NoSession);
            }
        };
        if session.root != request.root {
            return BaselineComparison::Changed(ChangeReason::RootMismatch);
        }
        match session.baseline {
            None => BaselineComparison::Changed(ChangeReason::BaselineUnavailable),
            Some(baseline) if &baseline == current => BaselineComparison::Unchanged,
            Some(_) => BaselineComparison::Changed(ChangeReason::FingerprintDiffers),
        }
    }

    /// Missing suite, then cache reuse, then the retry short-circuit, then a fresh run.
    /// With no fingerprint the cache is neither read nor written.
    fn verify(
        &self,
        request: &CheckpointRequest,
        current: Option<Fingerprint>,
    ) -> CheckpointResponse {
        if self.suite_missing(request) {
            return self.missing_block(request, GateBranch::MissingSuite);
        }

        if let Some(current) = current.as_ref() {
            if let Some(record) = self.fresh_record(request, current) {
                if record.ok {
                    return CheckpointResponse::remind(
                        GateBranch::CachedPass,
                        messages::soft_stop_reminder(),
                    );
                }
                if request.retry_signal {
                    return CheckpointResponse::block(
                        GateBranch::CachedFailure,
                        GateCondition::VerificationFailed,
                        messages::suite_still_failing(
                            &request.root,
                            &self.config.verification_command,
                            &record,
                        ),
                    );
                }
            }
        }

        let record = self.run_suite(request, current);
        if record.ok {
            CheckpointResponse::remind(GateBranch::RanPassed, messages::soft_stop_reminder())
        } else {
            CheckpointResponse::block(
                GateBranch::RanFailed,
                GateCondition::VerificationFailed,
                messages::suite_failed(&request.root, &self.config.verification_command, &record),
            )
        }
    }

    fn fresh_record(
        &self,
        request: &CheckpointRequest,
        current: &Fingerprint,
    ) -> Option<RunRecord> {
        let record = match self.ports.runs.last_run(&request.root) {
            Ok(record) => record?,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read run cache");
                return None;
            }
        };
        let now_ms = self.ports.clock.now_ms();
        record
            .is_fresh_for(current, now_ms, self.config.cache_ttl_seconds)
            .then_some(record)
    }

    fn run_suite(&self, request: &CheckpointRequest, current: Option<Fingerprint>) -> RunRecord {
        let command = &self.config.verification_command;
        tracing::info!(root = %request.root.display(), command = %command, "running suite gate");
        let outcome = self.ports.runner.run(&request.root, command);
        let combined = combine_streams(&outcome.stdout, &outcome.stderr);
        let persist = current.is_some();
        let record = RunRecord {
            root: request.root.clone(),
            ran_at_ms: self.ports.clock.now_ms(),
            fingerprint: current.unwrap_or_else(|| Fingerprint::new(None, None)),
            ok: outcome.ok(),
            exit_code: outcome.exit_code,
            duration_ms: outcome.duration_ms,
            output_tail: bound_output(
                &combined,
                self.config.max_output_lines,
                self.config.max_output_chars,
            ),
        };
        tracing::info!(
            exit_code = record.exit_code,
            duration_ms = record.duration_ms,
            "suite gate finished"
        );
        if persist {
            if let Err(err) = self.ports.runs.put_last_run(&record) {
                tracing::warn!(error = %err, "failed to write run cache");
            }
        }
        record
    }
}
