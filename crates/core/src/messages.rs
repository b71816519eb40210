#![forbid(unsafe_code)]

use crate::model::RunRecord;
use crate::shell::shell_quote;
use crate::time::{format_duration_s, ts_ms_to_rfc3339};
use std::path::Path;

pub const PREFIX: &str = "prove-it";
pub const LOCAL_CONFIG_RELPATH: &str = ".claude/prove_it.local.json";
const NO_OUTPUT: &str = "(no output captured)";

fn tail_or_placeholder(tail: &str) -> &str {
    if tail.is_empty() { NO_OUTPUT } else { tail }
}

pub fn soft_stop_reminder() -> String {
    format!(
        "{PREFIX}: Suite gate passed. Before finishing, verify:\n\
- Did you run every verification command yourself, or did you leave \"Try X\" for the user?\n\
- If you couldn't run something, did you clearly mark it UNVERIFIED?\n\
- Is the user receiving completed, verified work - or a verification TODO list?"
    )
}

pub fn session_start_reminder(suite_command: &str) -> String {
    [
        format!("{PREFIX} active: verifiability-first workflow."),
        String::new(),
        "Before claiming done:".to_string(),
        format!("- Run {suite_command} (or the configured suite gate)"),
        "- Verify to the last mile - if you can run it, run it".to_string(),
        "- Never say 'Try X to verify' - that's handing off your job".to_string(),
        "- If you can't verify something, mark it UNVERIFIED explicitly".to_string(),
        String::new(),
        "The user should receive verified, working code - not a verification checklist."
            .to_string(),
    ]
    .join("\n")
}

pub fn suite_missing(suite_command: &str, root: &Path) -> String {
    let root_display = root.display().to_string();
    let esc = shell_quote(&root_display);
    format!(
        "{PREFIX}: Suite gate not found.\n\
\n\
The suite gate command '{suite_command}' does not exist at:\n  {root_display}\n\
\n\
This is a safety block. You have three options:\n\
\n\
1. CREATE THE SUITE GATE (recommended):\n   prove_it init\n\
\n\
2. USE A DIFFERENT COMMAND (e.g., npm test):\n   mkdir -p {esc}/.claude && echo '{{\"suiteGate\":{{\"command\":\"npm test\"}}}}' > {esc}/{LOCAL_CONFIG_RELPATH}\n\
\n\
3. DISABLE FOR THIS REPO (use with caution):\n   mkdir -p {esc}/.claude && echo '{{\"suiteGate\":{{\"require\":false}}}}' > {esc}/{LOCAL_CONFIG_RELPATH}\n\
\n\
For more info: https://github.com/searlsco/prove-it#configuration"
    )
}

pub fn suite_failed(root: &Path, suite_command: &str, record: &RunRecord) -> String {
    format!(
        "{PREFIX}: suite gate failed; cannot stop or claim completion.\n\
\n\
Repo: {}\n\
Command: {suite_command}\n\
Exit: {}\n\
Duration: {}\n\
\n\
Tail:\n{}\n\
\n\
Next step: fix the failure, then rerun {suite_command} (or attempt to stop; the gate will rerun).",
        root.display(),
        record.exit_code,
        format_duration_s(record.duration_ms),
        tail_or_placeholder(&record.output_tail),
    )
}

pub fn suite_still_failing(root: &Path, suite_command: &str, record: &RunRecord) -> String {
    format!(
        "{PREFIX}: suite gate still failing for current workspace state.\n\
\n\
Repo: {}\n\
Suite gate: {suite_command}\n\
Last run: {}\n\
Exit: {}\n\
\n\
Tail:\n{}\n\
\n\
Fix the failure, then try stopping again (the gate will rerun when the workspace changes).",
        root.display(),
        ts_ms_to_rfc3339(record.ran_at_ms),
        record.exit_code,
        tail_or_placeholder(&record.output_tail),
    )
}

pub fn boundary_wrapped(suite_command: &str) -> String {
    format!("{PREFIX}: running suite gate ({suite_command}) before this command")
}

pub fn boundary_missing() -> String {
    format!("{PREFIX}: suite gate missing; blocking completion boundary")
}

pub fn no_task_in_progress() -> String {
    [
        format!("{PREFIX}: No bead is tracking this work."),
        String::new(),
        "Before making code changes, select or create a bead to track this work:".to_string(),
        String::new(),
        "  bd ready              # Show tasks ready to work on".to_string(),
        "  bd list               # Show all tasks".to_string(),
        "  bd show <id>          # View task details".to_string(),
        "  bd update <id> --status in_progress   # Start working on a task".to_string(),
        "  bd create \"Title\"     # Create a new task".to_string(),
        String::new(),
        "Once you have an in_progress bead, this operation will be allowed.".to_string(),
        String::new(),
        "Tip: If this is exploratory work, you can disable beads enforcement in".to_string(),
        format!("{LOCAL_CONFIG_RELPATH} by setting beads.enabled: false"),
    ]
    .join("\n")
}

pub fn malformed_request(detail: &str) -> String {
    format!(
        "{PREFIX}: Failed to parse hook input.\n\nError: {detail}\n\nThis is a safety block. Please report this issue."
    )
}
