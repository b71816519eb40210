#![forbid(unsafe_code)]

use crate::config::ProveItConfig;
use pv_core::time::{now_ms_i64, ts_ms_to_rfc3339};
use pv_core::{FingerprintProbe, FingerprintProvider, RunRecord, VerificationRunner};
use pv_runner::{GitFingerprintProvider, ShellVerificationRunner};
use pv_storage::{SqliteStore, StoreError};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintView {
    pub revision: Option<String>,
    pub dirty_signature: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunView {
    pub ran_at: String,
    pub ok: bool,
    pub exit_code: i32,
    pub duration_ms: i64,
    pub fresh: bool,
    pub output_tail: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub root: String,
    pub database: String,
    pub is_repo: bool,
    pub fingerprint: Option<FingerprintView>,
    pub suite_command: String,
    pub suite_present: bool,
    pub last_run: Option<RunView>,
}

fn run_view(record: RunRecord, probe: &FingerprintProbe, ttl_seconds: u64) -> RunView {
    let fresh = probe
        .fingerprint()
        .is_some_and(|fp| record.is_fresh_for(fp, now_ms_i64(), ttl_seconds));
    RunView {
        ran_at: ts_ms_to_rfc3339(record.ran_at_ms),
        ok: record.ok,
        exit_code: record.exit_code,
        duration_ms: record.duration_ms,
        fresh,
        output_tail: record.output_tail,
    }
}

pub fn status_report(
    dir: &Path,
    state_dir: &Path,
    config: &ProveItConfig,
) -> Result<StatusReport, StoreError> {
    let git = GitFingerprintProvider::default();
    let root = git.resolve_root(dir);
    let probe = git.probe(&root);
    let store = SqliteStore::open(state_dir)?;
    let last_run = store
        .load_run(&root)?
        .map(|record| run_view(record, &probe, config.stop.cache_seconds));
    let suite_present =
        ShellVerificationRunner::default().command_present(&root, &config.suite_gate.command);

    Ok(StatusReport {
        root: root.display().to_string(),
        database: store.db_path().display().to_string(),
        is_repo: probe.fingerprint().is_some(),
        fingerprint: probe.fingerprint().map(|fp| FingerprintView {
            revision: fp.revision.clone(),
            dirty_signature: fp.dirty_signature.clone(),
        }),
        suite_command: config.suite_gate.command.clone(),
        suite_present,
        last_run,
    })
}
