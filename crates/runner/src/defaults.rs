#![forbid(unsafe_code)]

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const STATE_DIR_ENV: &str = "PROVE_IT_DIR";
pub const PROJECT_DIR_ENV: &str = "CLAUDE_PROJECT_DIR";
pub const DEFAULT_STATE_DIRNAME: &str = ".claude/prove-it";
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

fn non_empty(value: Option<OsString>) -> Option<PathBuf> {
    value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// `$PROVE_IT_DIR`, else `$HOME/.claude/prove-it`, else a relative `.claude/prove-it`.
pub fn state_dir_from(explicit: Option<OsString>, home: Option<OsString>) -> PathBuf {
    if let Some(dir) = non_empty(explicit) {
        return dir;
    }
    match non_empty(home) {
        Some(home) => home.join(DEFAULT_STATE_DIRNAME),
        None => PathBuf::from(DEFAULT_STATE_DIRNAME),
    }
}

pub fn default_state_dir() -> PathBuf {
    state_dir_from(std::env::var_os(STATE_DIR_ENV), std::env::var_os("HOME"))
}

pub fn global_config_path(state_dir: &Path) -> PathBuf {
    state_dir.join(GLOBAL_CONFIG_FILE)
}

/// Project directory precedence: host env var, then the request's `cwd`, then the process cwd.
pub fn project_dir_from(
    env_dir: Option<OsString>,
    request_cwd: Option<&str>,
    process_cwd: &Path,
) -> PathBuf {
    if let Some(dir) = non_empty(env_dir) {
        return dir;
    }
    match request_cwd.map(str::trim).filter(|cwd| !cwd.is_empty()) {
        Some(cwd) => PathBuf::from(cwd),
        None => process_cwd.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_dir_prefers_explicit_override() {
        assert_eq!(
            state_dir_from(Some("/custom".into()), Some("/home/u".into())),
            PathBuf::from("/custom")
        );
        assert_eq!(
            state_dir_from(Some("".into()), Some("/home/u".into())),
            PathBuf::from("/home/u/.claude/prove-it")
        );
        assert_eq!(state_dir_from(None, None), PathBuf::from(".claude/prove-it"));
        assert_eq!(
            global_config_path(Path::new("/s")),
            PathBuf::from("/s/config.json")
        );
    }

    #[test]
    fn project_dir_precedence() {
        let cwd = Path::new("/proc-cwd");
        assert_eq!(
            project_dir_from(Some("/env".into()), Some("/req"), cwd),
            PathBuf::from("/env")
        );
        assert_eq!(project_dir_from(None, Some("/req"), cwd), PathBuf::from("/req"));
        assert_eq!(project_dir_from(None, Some("  "), cwd), PathBuf::from("/proc-cwd"));
        assert_eq!(project_dir_from(Some("".into()), None, cwd), PathBuf::from("/proc-cwd"));
    }
}
