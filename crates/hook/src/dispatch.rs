#![forbid(unsafe_code)]

use crate::config::{ProveItConfig, load_effective};
use crate::protocol::{
    HookEvent, HookInput, HookReply, decision_reply, parse_input, pre_tool_use_reply,
};
use pv_core::messages;
use pv_core::shell::shell_quote;
use pv_core::task_gate::BASH_TOOL;
use pv_core::{
    BaselineStore, CheckpointKind, CheckpointRequest, CheckpointResponse, GateEngine, GatePorts,
    RunCache, RunRecord, Session, StoreFault, SystemClock, TaskGate,
};
use pv_runner::defaults::{global_config_path, project_dir_from};
use pv_runner::{BeadsTaskTracker, GitFingerprintProvider, ShellVerificationRunner};
use pv_storage::SqliteStore;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Process-level inputs, captured once in `main`.
#[derive(Clone, Debug)]
pub struct HookEnv {
    pub state_dir: PathBuf,
    pub project_dir_env: Option<OsString>,
    pub process_cwd: PathBuf,
}

impl HookEnv {
    pub fn project_dir(&self, request_cwd: Option<&str>) -> PathBuf {
        project_dir_from(self.project_dir_env.clone(), request_cwd, &self.process_cwd)
    }

    pub fn load_config(&self, project_dir: &Path) -> ProveItConfig {
        load_effective(&global_config_path(&self.state_dir), project_dir)
    }
}

/// Stand-in when the database cannot be opened; every call is a soft fault.
struct DetachedStore(String);

impl BaselineStore for DetachedStore {
    fn record_baseline(&self, _session: &Session) -> Result<bool, StoreFault> {
        Err(StoreFault::new(&self.0))
    }

    fn baseline(&self, _session_id: &str) -> Result<Option<Session>, StoreFault> {
        Err(StoreFault::new(&self.0))
    }
}

impl RunCache for DetachedStore {
    fn last_run(&self, _root: &Path) -> Result<Option<RunRecord>, StoreFault> {
        Err(StoreFault::new(&self.0))
    }

    fn put_last_run(&self, _record: &RunRecord) -> Result<(), StoreFault> {
        Err(StoreFault::new(&self.0))
    }
}

enum StoreHandle {
    Sqlite(SqliteStore),
    Detached(DetachedStore),
}

impl StoreHandle {
    fn open(state_dir: &Path) -> Self {
        match SqliteStore::open(state_dir) {
            Ok(store) => Self::Sqlite(store),
            Err(err) => {
                tracing::warn!(dir = %state_dir.display(), error = %err, "state store unavailable");
                Self::Detached(DetachedStore(err.to_string()))
            }
        }
    }

    fn baselines(&self) -> &dyn BaselineStore {
        match self {
            Self::Sqlite(store) => store,
            Self::Detached(store) => store,
        }
    }

    fn runs(&self) -> &dyn RunCache {
        match self {
            Self::Sqlite(store) => store,
            Self::Detached(store) => store,
        }
    }
}

struct Invocation<'a> {
    env: &'a HookEnv,
    input: &'a HookInput,
    project_dir: PathBuf,
    config: ProveItConfig,
    git: GitFingerprintProvider,
}

impl Invocation<'_> {
    fn root(&self) -> PathBuf {
        self.git.resolve_root(&self.project_dir)
    }

    fn checkpoint(&self, kind: CheckpointKind, root: PathBuf) -> CheckpointResponse {
        let gate_config = self.config.gate_config();
        let store = StoreHandle::open(&self.env.state_dir);
        let runner = ShellVerificationRunner::default();
        let clock = SystemClock;
        let engine = GateEngine::new(
            &gate_config,
            GatePorts {
                fingerprints: &self.git,
                baselines: store.baselines(),
                runs: store.runs(),
                runner: &runner,
                clock: &clock,
            },
        );
        engine.evaluate(&CheckpointRequest {
            kind,
            session_id: self.input.session_id.clone(),
            root,
            retry_signal: kind == CheckpointKind::Stop
                && self.input.stop_hook_active.unwrap_or(false),
        })
    }

    fn session_start(&self) -> HookReply {
        let response = self.checkpoint(CheckpointKind::SessionStart, self.root());
        match response.reason {
            Some(reason) => HookReply::Text(reason),
            None => HookReply::Silent,
        }
    }

    fn stop(&self) -> HookReply {
        if !self.config.stop.enabled {
            return HookReply::Silent;
        }
        decision_reply(&self.checkpoint(CheckpointKind::Stop, self.root()))
    }

    fn pre_tool_use(&self) -> HookReply {
        let tool_name = self.input.tool_name.as_deref().unwrap_or_default();
        let command = self.input.tool_command();
        let classifier = self.config.classifier();

        let task_config = self.config.task_gate_config();
        let tracker = BeadsTaskTracker::default();
        let task_gate = TaskGate::new(&task_config, &classifier, &tracker);
        if task_gate.applies_to(tool_name, command) {
            let response = task_gate.evaluate(tool_name, command, &self.root());
            if response.decision.is_block() {
                return pre_tool_use_reply(
                    "block",
                    response.reason.unwrap_or_default(),
                    None,
                );
            }
        }

        if !self.config.pre_tool_use.enabled || tool_name != BASH_TOOL {
            return HookReply::Silent;
        }
        let Some(command) = command.filter(|c| !c.trim().is_empty()) else {
            return HookReply::Silent;
        };
        if !classifier.is_completion_boundary(command) {
            return HookReply::Silent;
        }
        let suite = &self.config.suite_gate.command;
        if command.contains(suite.as_str()) {
            tracing::debug!("command already runs the suite gate; not wrapping");
            return HookReply::Silent;
        }

        let root = self.root();
        let response = self.checkpoint(CheckpointKind::PreAction, root.clone());
        let mut updated = self.input.tool_input_object();
        let permission = self.config.pre_tool_use.permission_decision.clone();
        if response.decision.is_block() {
            let reason = response.reason.unwrap_or_default();
            updated.insert(
                "command".to_string(),
                Value::from(format!("echo {} 1>&2; exit 1", shell_quote(&reason))),
            );
            return pre_tool_use_reply(permission, messages::boundary_missing(), Some(updated));
        }

        let cwd = self
            .input
            .cwd
            .clone()
            .filter(|c| !c.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.project_dir.clone());
        updated.insert(
            "command".to_string(),
            Value::from(wrap_command(&root, suite, &cwd, command)),
        );
        let description = match self.input.tool_description() {
            Some(desc) => format!("{desc} ({}: gated by {suite})", messages::PREFIX),
            None => format!("{}: gated by {suite}", messages::PREFIX),
        };
        updated.insert("description".to_string(), Value::from(description));
        pre_tool_use_reply(
            permission,
            response.reason.unwrap_or_default(),
            Some(updated),
        )
    }
}

/// Runs the suite from `root`, then returns to `cwd` for the original command.
pub fn wrap_command(root: &Path, suite: &str, cwd: &Path, command: &str) -> String {
    format!(
        "cd {} && {suite} && cd {} && {command}",
        shell_quote(&root.display().to_string()),
        shell_quote(&cwd.display().to_string()),
    )
}

/// Entry point for one hook invocation. Never fails: every path ends in a reply.
pub fn handle(raw: &str, event_hint: Option<HookEvent>, env: &HookEnv) -> HookReply {
    let input = match parse_input(raw) {
        Ok(input) => input,
        Err(err) => {
            if event_hint == Some(HookEvent::SessionStart) {
                tracing::warn!(error = %err, "failed to parse SessionStart input");
                return HookReply::Silent;
            }
            tracing::warn!(error = %err, "failed to parse hook input; blocking");
            return decision_reply(&CheckpointResponse::malformed(&err.to_string()));
        }
    };

    let Some(event) = input.event().or(event_hint) else {
        tracing::debug!("hook input has no event name");
        return HookReply::Silent;
    };

    let project_dir = env.project_dir(input.cwd.as_deref());
    let config = env.load_config(&project_dir);
    let invocation = Invocation {
        env,
        input: &input,
        project_dir,
        config,
        git: GitFingerprintProvider::default(),
    };
    tracing::debug!(
        event = ?event,
        project_dir = %invocation.project_dir.display(),
        "hook invoked"
    );

    match event {
        HookEvent::SessionStart => invocation.session_start(),
        HookEvent::PreToolUse => invocation.pre_tool_use(),
        HookEvent::Stop => invocation.stop(),
        HookEvent::Other(name) => {
            tracing::debug!(event = %name, "ignoring hook event");
            HookReply::Silent
        }
    }
}
