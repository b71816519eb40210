#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

pub const SUITE_STUB_RELPATH: &str = "script/test";

const SUITE_STUB: &str = r#"#!/bin/sh
# prove-it suite gate. Replace the body with the command that runs your full test suite.
# A non-zero exit blocks the agent from stopping.
set -e

echo "prove-it: script/test is still the generated stub; edit it to run your tests." 1>&2
exit 1
"#;

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("{path} exists and is not a file")]
    NotAFile { path: PathBuf },
    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InitOutcome {
    Created(PathBuf),
    Overwritten(PathBuf),
    Kept(PathBuf),
}

impl InitOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(path) | Self::Overwritten(path) | Self::Kept(path) => path,
        }
    }

    pub fn describe(&self) -> String {
        let path = self.path().display();
        match self {
            Self::Created(_) => format!("created {path}"),
            Self::Overwritten(_) => format!("overwrote {path}"),
            Self::Kept(_) => format!("kept existing {path} (use --force to replace)"),
        }
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> InitError + '_ {
    move |source| InitError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), InitError> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path).map_err(io_err(path))?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(path, perms).map_err(io_err(path))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), InitError> {
    Ok(())
}

/// Writes a failing `script/test` stub under `root`.
pub fn init_suite(root: &Path, force: bool) -> Result<InitOutcome, InitError> {
    let path = root.join(SUITE_STUB_RELPATH);
    let existed = match std::fs::symlink_metadata(&path) {
        Ok(meta) if meta.is_dir() => return Err(InitError::NotAFile { path }),
        Ok(_) => true,
        Err(_) => false,
    };
    if existed && !force {
        return Ok(InitOutcome::Kept(path));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    std::fs::write(&path, SUITE_STUB).map_err(io_err(&path))?;
    make_executable(&path)?;
    tracing::info!(path = %path.display(), overwritten = existed, "suite gate stub written");
    Ok(if existed {
        InitOutcome::Overwritten(path)
    } else {
        InitOutcome::Created(path)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_executable_failing_stub() {
        let dir = tempfile::tempdir().expect("temp dir");
        let outcome = init_suite(dir.path(), false).expect("init");
        assert_eq!(outcome, InitOutcome::Created(dir.path().join("script/test")));
        let text = std::fs::read_to_string(outcome.path()).expect("read stub");
        assert!(text.starts_with("#!/bin/sh"));
        assert!(text.contains("exit 1"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(outcome.path()).expect("meta").permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn existing_suite_is_kept_unless_forced() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("script/test");
        std::fs::create_dir_all(dir.path().join("script")).expect("mkdir");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").expect("write");

        let kept = init_suite(dir.path(), false).expect("init");
        assert_eq!(kept, InitOutcome::Kept(path.clone()));
        assert!(kept.describe().contains("--force"));
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "#!/bin/sh\nexit 0\n");

        let forced = init_suite(dir.path(), true).expect("init --force");
        assert_eq!(forced, InitOutcome::Overwritten(path.clone()));
        assert!(std::fs::read_to_string(&path).expect("read").contains("generated stub"));
    }

    #[test]
    fn directory_in_the_way_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join("script/test")).expect("mkdir");
        let err = init_suite(dir.path(), true).expect_err("directory must be rejected");
        assert!(matches!(err, InitError::NotAFile { .. }));
    }
}
