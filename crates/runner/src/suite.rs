#![forbid(unsafe_code)]

use crate::bin_detect::{is_executable, path_contains_separator, program_token, resolve_against};
use pv_core::{RunOutcome, VerificationRunner};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// Runs the suite through `sh -c` in the repository root.
#[derive(Clone, Debug)]
pub struct ShellVerificationRunner {
    shell: PathBuf,
}

impl Default for ShellVerificationRunner {
    fn default() -> Self {
        Self::new("sh")
    }
}

impl ShellVerificationRunner {
    pub fn new(shell: impl Into<PathBuf>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl VerificationRunner for ShellVerificationRunner {
    fn command_present(&self, root: &Path, command: &str) -> bool {
        let Some(token) = program_token(command) else {
            return false;
        };
        if !path_contains_separator(token) {
            return true;
        }
        let path = resolve_against(root, token);
        if !path.exists() {
            return false;
        }
        if !is_executable(&path) {
            tracing::warn!(path = %path.display(), "suite gate exists but is not executable");
        }
        true
    }

    fn run(&self, root: &Path, command: &str) -> RunOutcome {
        let started = Instant::now();
        let result = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .current_dir(root)
            .stdin(Stdio::null())
            .output();
        let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        match result {
            Ok(output) => RunOutcome {
                exit_code: output.status.code().unwrap_or(SIGNAL_EXIT_CODE),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                duration_ms,
            },
            Err(err) => {
                tracing::warn!(
                    shell = %self.shell.display(),
                    error = %err,
                    "failed to spawn suite gate"
                );
                RunOutcome {
                    exit_code: SPAWN_FAILURE_EXIT_CODE,
                    stdout: String::new(),
                    stderr: format!("failed to spawn {}: {err}", self.shell.display()),
                    duration_ms,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_script(root: &Path, rel: &str, body: &str, executable: bool) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdir");
        }
        fs::write(&path, body).expect("write script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = if executable { 0o755 } else { 0o644 };
            let mut perms = fs::metadata(&path).expect("meta").permissions();
            perms.set_mode(mode);
            fs::set_permissions(&path, perms).expect("chmod");
        }
        #[cfg(not(unix))]
        let _ = executable;
    }

    #[test]
    fn presence_checks_path_like_commands_only() {
        let dir = tempfile::tempdir().expect("temp dir");
        let runner = ShellVerificationRunner::default();
        assert!(!runner.command_present(dir.path(), "./script/test"));
        assert!(runner.command_present(dir.path(), "npm test"));
        assert!(!runner.command_present(dir.path(), "   "));

        write_script(dir.path(), "script/test", "#!/bin/sh\nexit 0\n", true);
        assert!(runner.command_present(dir.path(), "./script/test"));
        assert!(runner.command_present(dir.path(), "script/test --quick"));
    }

    #[test]
    fn non_executable_suite_still_counts_as_present() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_script(dir.path(), "scripts/test", "exit 0\n", false);
        let runner = ShellVerificationRunner::default();
        assert!(runner.command_present(dir.path(), "./scripts/test"));
    }

    #[cfg(unix)]
    #[test]
    fn run_captures_exit_code_and_streams_in_root() {
        let dir = tempfile::tempdir().expect("temp dir");
        write_script(
            dir.path(),
            "script/test",
            "#!/bin/sh\necho out-line\necho err-line 1>&2\ntest -f marker || exit 4\n",
            true,
        );
        let runner = ShellVerificationRunner::default();

        let failed = runner.run(dir.path(), "./script/test");
        assert_eq!(failed.exit_code, 4);
        assert!(!failed.ok());
        assert_eq!(failed.stdout.trim(), "out-line");
        assert_eq!(failed.stderr.trim(), "err-line");
        assert!(failed.duration_ms >= 0);

        fs::write(dir.path().join("marker"), "").expect("marker");
        let passed = runner.run(dir.path(), "./script/test");
        assert_eq!(passed.exit_code, 0);
        assert!(passed.ok());
    }

    #[cfg(unix)]
    #[test]
    fn signal_termination_reports_minus_one() {
        let dir = tempfile::tempdir().expect("temp dir");
        let outcome = ShellVerificationRunner::default().run(dir.path(), "kill -9 $$");
        assert_eq!(outcome.exit_code, SIGNAL_EXIT_CODE);
        assert!(!outcome.ok());
    }

    #[test]
    fn spawn_failure_is_an_ordinary_failed_run() {
        let dir = tempfile::tempdir().expect("temp dir");
        let runner = ShellVerificationRunner::new("/nonexistent/shell");
        let outcome = runner.run(dir.path(), "true");
        assert_eq!(outcome.exit_code, SPAWN_FAILURE_EXIT_CODE);
        assert!(outcome.stderr.contains("failed to spawn"));
    }
}
