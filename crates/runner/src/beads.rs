#![forbid(unsafe_code)]

use crate::bin_detect::{find_executable_in_path, path_contains_separator};
use pv_core::{TaskProbe, TaskTracker};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const DEFAULT_BD_BIN: &str = "bd";
const BEADS_DIR: &str = ".beads";
const PROJECT_MARKERS: &[&str] = &["config.yaml", "beads.db", "metadata.json"];

/// A `.beads/` directory only marks a project when it holds project state.
pub fn is_beads_project(root: &Path) -> bool {
    let dir = root.join(BEADS_DIR);
    dir.is_dir() && PROJECT_MARKERS.iter().any(|m| dir.join(m).exists())
}

/// Counts task rows in `bd list` table output.
pub fn count_listed_tasks(stdout: &str) -> usize {
    stdout
        .trim()
        .lines()
        .filter(|line| {
            if line.trim().is_empty() {
                return false;
            }
            if line.contains("───") || line.contains("---") {
                return false;
            }
            let lower = line.to_lowercase();
            if lower.contains("no issues found") {
                return false;
            }
            !(lower.contains("id") && lower.contains("subject"))
        })
        .count()
}

#[derive(Clone, Debug)]
pub struct BeadsTaskTracker {
    bd_bin: PathBuf,
}

impl Default for BeadsTaskTracker {
    fn default() -> Self {
        Self::new(DEFAULT_BD_BIN)
    }
}

impl BeadsTaskTracker {
    pub fn new(bd_bin: impl Into<PathBuf>) -> Self {
        Self {
            bd_bin: bd_bin.into(),
        }
    }

    fn bd_resolvable(&self) -> bool {
        let raw = self.bd_bin.to_string_lossy();
        if path_contains_separator(&raw) {
            self.bd_bin.exists()
        } else {
            find_executable_in_path(&raw).is_some()
        }
    }
}

impl TaskTracker for BeadsTaskTracker {
    fn probe(&self, root: &Path) -> TaskProbe {
        if !is_beads_project(root) {
            return TaskProbe::NotTracked;
        }
        if !self.bd_resolvable() {
            tracing::warn!(
                bd = %self.bd_bin.display(),
                "bd command not found; install beads or disable beads enforcement"
            );
            return TaskProbe::Unavailable;
        }
        let result = Command::new(&self.bd_bin)
            .args(["list", "--status", "in_progress"])
            .current_dir(root)
            .stdin(Stdio::null())
            .output();
        let output = match result {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(error = %err, "bd command failed; beads may need updating");
                return TaskProbe::Unavailable;
            }
        };
        if !output.status.success() {
            tracing::warn!(status = ?output.status.code(), "bd list failed; allowing");
            return TaskProbe::Unavailable;
        }
        match count_listed_tasks(&String::from_utf8_lossy(&output.stdout)) {
            0 => TaskProbe::Idle,
            n => TaskProbe::InProgress(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn beads_root(marker: Option<&str>) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(dir.path().join(BEADS_DIR)).expect("mkdir .beads");
        if let Some(marker) = marker {
            fs::write(dir.path().join(BEADS_DIR).join(marker), "").expect("marker");
        }
        dir
    }

    #[cfg(unix)]
    fn fake_bd(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write fake bd");
        let mut perms = fs::metadata(&path).expect("meta").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[test]
    fn project_detection_needs_a_marker() {
        let registry_only = beads_root(None);
        fs::write(registry_only.path().join(BEADS_DIR).join("registry.json"), "{}").expect("write");
        assert!(!is_beads_project(registry_only.path()));

        for marker in PROJECT_MARKERS {
            assert!(is_beads_project(beads_root(Some(marker)).path()), "{marker}");
        }
    }

    #[test]
    fn table_output_counting_skips_chrome() {
        let table = "ID      SUBJECT          STATUS\n\
                     ──────  ───────────────  ──────\n\
                     bd-1    Fix the parser   in_progress\n\
                     \n\
                     bd-7    Write docs       in_progress\n";
        assert_eq!(count_listed_tasks(table), 2);
        assert_eq!(count_listed_tasks("No issues found.\n"), 0);
        assert_eq!(count_listed_tasks("----\n\n"), 0);
        assert_eq!(count_listed_tasks(""), 0);
    }

    #[test]
    fn untracked_root_skips_bd() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tracker = BeadsTaskTracker::new("/nonexistent/bd");
        assert_eq!(tracker.probe(dir.path()), TaskProbe::NotTracked);
    }

    #[test]
    fn missing_bd_fails_open() {
        let root = beads_root(Some("beads.db"));
        let tracker = BeadsTaskTracker::new("/nonexistent/bd");
        assert_eq!(tracker.probe(root.path()), TaskProbe::Unavailable);
    }

    #[cfg(unix)]
    #[test]
    fn fake_bd_drives_idle_and_in_progress() {
        let root = beads_root(Some("config.yaml"));
        let bin = tempfile::tempdir().expect("bin dir");

        let busy = fake_bd(bin.path(), "bd-busy", "echo 'ID SUBJECT'\necho 'bd-1 Ship it'");
        assert_eq!(BeadsTaskTracker::new(&busy).probe(root.path()), TaskProbe::InProgress(1));

        let idle = fake_bd(bin.path(), "bd-idle", "echo 'No issues found'");
        assert_eq!(BeadsTaskTracker::new(&idle).probe(root.path()), TaskProbe::Idle);

        let broken = fake_bd(bin.path(), "bd-broken", "exit 2");
        assert_eq!(BeadsTaskTracker::new(&broken).probe(root.path()), TaskProbe::Unavailable);
    }
}
