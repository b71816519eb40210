#![forbid(unsafe_code)]

use pv_core::{Fingerprint, FingerprintProbe, FingerprintProvider};
use sha2::Digest as _;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

pub const DEFAULT_GIT_BIN: &str = "git";

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = sha2::Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for b in digest {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Fingerprints a work tree from `HEAD` and `git status --porcelain=v1`.
#[derive(Clone, Debug)]
pub struct GitFingerprintProvider {
    git_bin: PathBuf,
}

impl Default for GitFingerprintProvider {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_BIN)
    }
}

impl GitFingerprintProvider {
    pub fn new(git_bin: impl Into<PathBuf>) -> Self {
        Self {
            git_bin: git_bin.into(),
        }
    }

    fn git(&self, dir: &Path, args: &[&str]) -> Option<Output> {
        let result = Command::new(&self.git_bin)
            .arg("-C")
            .arg(dir)
            .args(args)
            .stdin(Stdio::null())
            .output();
        match result {
            Ok(output) => Some(output),
            Err(err) => {
                tracing::debug!(git = %self.git_bin.display(), error = %err, "git spawn failed");
                None
            }
        }
    }

    fn git_stdout(&self, dir: &Path, args: &[&str]) -> Option<String> {
        let output = self.git(dir, args)?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn is_work_tree(&self, dir: &Path) -> bool {
        self.git_stdout(dir, &["rev-parse", "--is-inside-work-tree"])
            .is_some_and(|out| out.trim() == "true")
    }

    /// Top of the enclosing work tree, or `dir` itself outside version control.
    pub fn resolve_root(&self, dir: &Path) -> PathBuf {
        if !self.is_work_tree(dir) {
            return dir.to_path_buf();
        }
        self.git_stdout(dir, &["rev-parse", "--show-toplevel"])
            .map(|out| out.trim().to_string())
            .filter(|top| !top.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| dir.to_path_buf())
    }
}

impl FingerprintProvider for GitFingerprintProvider {
    fn probe(&self, root: &Path) -> FingerprintProbe {
        if !self.is_work_tree(root) {
            return FingerprintProbe::NotARepository;
        }
        let revision = self
            .git_stdout(root, &["rev-parse", "HEAD"])
            .map(|out| out.trim().to_string())
            .filter(|rev| !rev.is_empty());
        let status = self
            .git_stdout(root, &["status", "--porcelain=v1"])
            .unwrap_or_default();
        let dirty_signature = sha256_hex(status.as_bytes());
        FingerprintProbe::Comparable(Fingerprint::new(revision, Some(dirty_signature)))
    }
}
