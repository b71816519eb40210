#![forbid(unsafe_code)]

use crate::classify::CommandClassifier;
use crate::config::TaskGateConfig;
use crate::messages;
use crate::model::{CheckpointResponse, Decision, GateBranch};
use crate::ports::{TaskProbe, TaskTracker};
use std::path::Path;

pub const BASH_TOOL: &str = "Bash";

/// Requires an in-progress task before file-modifying tools run.
pub struct TaskGate<'a> {
    config: &'a TaskGateConfig,
    classifier: &'a CommandClassifier,
    tracker: &'a dyn TaskTracker,
}

impl<'a> TaskGate<'a> {
    pub fn new(
        config: &'a TaskGateConfig,
        classifier: &'a CommandClassifier,
        tracker: &'a dyn TaskTracker,
    ) -> Self {
        Self {
            config,
            classifier,
            tracker,
        }
    }

    pub fn applies_to(&self, tool_name: &str, bash_command: Option<&str>) -> bool {
        if !self.config.enabled {
            return false;
        }
        if self.config.gated_tools.iter().any(|t| t == tool_name) {
            return true;
        }
        tool_name == BASH_TOOL
            && self.config.gate_bash_writes
            && bash_command.is_some_and(|cmd| self.classifier.is_write(cmd))
    }

    pub fn evaluate(
        &self,
        tool_name: &str,
        bash_command: Option<&str>,
        root: &Path,
    ) -> CheckpointResponse {
        if !self.applies_to(tool_name, bash_command) {
            return CheckpointResponse::allow(GateBranch::TaskUngated);
        }
        let probe = self.tracker.probe(root);
        let response = match probe {
            TaskProbe::NotTracked => CheckpointResponse::allow(GateBranch::TaskUngated),
            TaskProbe::Unavailable => {
                tracing::warn!(root = %root.display(), "task tracker unavailable; allowing");
                CheckpointResponse::allow(GateBranch::TaskTracked)
            }
            TaskProbe::InProgress(count) => {
                tracing::debug!(count, "tasks in progress");
                CheckpointResponse::allow(GateBranch::TaskTracked)
            }
            TaskProbe::Idle => CheckpointResponse {
                decision: Decision::Block,
                reason: Some(messages::no_task_in_progress()),
                condition: None,
                branch: GateBranch::TaskUntracked,
            },
        };
        tracing::info!(
            tool = tool_name,
            decision = response.decision.as_str(),
            branch = response.branch.as_str(),
            "task gate evaluated"
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{DEFAULT_BOUNDARY_PATTERNS, DEFAULT_WRITE_PATTERNS};
    use std::cell::Cell;

    struct FixedTracker {
        probe: TaskProbe,
        calls: Cell<usize>,
    }

    impl FixedTracker {
        fn new(probe: TaskProbe) -> Self {
            Self {
                probe,
                calls: Cell::new(0),
            }
        }
    }

    impl TaskTracker for FixedTracker {
        fn probe(&self, _root: &Path) -> TaskProbe {
            self.calls.set(self.calls.get() + 1);
            self.probe
        }
    }

    fn eval(
        config: &TaskGateConfig,
        probe: TaskProbe,
        tool: &str,
        cmd: Option<&str>,
    ) -> (CheckpointResponse, usize) {
        let classifier =
            CommandClassifier::from_patterns(DEFAULT_BOUNDARY_PATTERNS, DEFAULT_WRITE_PATTERNS);
        let tracker = FixedTracker::new(probe);
        let gate = TaskGate::new(config, &classifier, &tracker);
        let resp = gate.evaluate(tool, cmd, Path::new("/repo"));
        (resp, tracker.calls.get())
    }

    #[test]
    fn idle_tracker_blocks_edits() {
        let (resp, calls) = eval(&TaskGateConfig::default(), TaskProbe::Idle, "Edit", None);
        assert_eq!(resp.decision, Decision::Block);
        assert_eq!(resp.branch, GateBranch::TaskUntracked);
        assert!(resp.reason.as_deref().unwrap_or_default().contains("No bead is tracking"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn in_progress_and_unavailable_allow() {
        let config = TaskGateConfig::default();
        let (resp, _) = eval(&config, TaskProbe::InProgress(2), "Write", None);
        assert_eq!(resp.decision, Decision::Allow);
        assert_eq!(resp.branch, GateBranch::TaskTracked);
        let (resp, _) = eval(&config, TaskProbe::Unavailable, "Write", None);
        assert_eq!(resp.decision, Decision::Allow);
        let (resp, _) = eval(&config, TaskProbe::NotTracked, "NotebookEdit", None);
        assert_eq!(resp.branch, GateBranch::TaskUngated);
    }

    #[test]
    fn ungated_tools_skip_the_tracker() {
        let (resp, calls) = eval(&TaskGateConfig::default(), TaskProbe::Idle, "Read", None);
        assert_eq!(resp.decision, Decision::Allow);
        assert_eq!(calls, 0);
    }

    #[test]
    fn bash_is_gated_only_for_writes() {
        let config = TaskGateConfig::default();
        let (resp, _) = eval(&config, TaskProbe::Idle, BASH_TOOL, Some("echo hi > out.txt"));
        assert_eq!(resp.decision, Decision::Block);
        let (resp, calls) = eval(&config, TaskProbe::Idle, BASH_TOOL, Some("ls -la"));
        assert_eq!(resp.decision, Decision::Allow);
        assert_eq!(calls, 0);
        let (resp, _) = eval(&config, TaskProbe::Idle, BASH_TOOL, None);
        assert_eq!(resp.decision, Decision::Allow);

        let no_bash = TaskGateConfig {
            gate_bash_writes: false,
            ..TaskGateConfig::default()
        };
        let (resp, _) = eval(&no_bash, TaskProbe::Idle, BASH_TOOL, Some("sed -i s/a/b/ f"));
        assert_eq!(resp.decision, Decision::Allow);
    }

    #[test]
    fn disabled_gate_allows_everything() {
        let config = TaskGateConfig {
            enabled: false,
            ..TaskGateConfig::default()
        };
        let (resp, calls) = eval(&config, TaskProbe::Idle, "Edit", None);
        assert_eq!(resp.decision, Decision::Allow);
        assert_eq!(calls, 0);
    }
}
