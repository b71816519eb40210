#![forbid(unsafe_code)]

pub const DEFAULT_SUITE_COMMAND: &str = "./script/test";
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 900;
pub const DEFAULT_MAX_OUTPUT_LINES: usize = 200;
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 12_000;

/// What a stop checkpoint does when the root cannot be fingerprinted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UnverifiablePolicy {
    /// Allow with a reminder; comparability, not repository presence, gates strictness.
    #[default]
    Remind,
    /// Treat the root as changed and require a verification run.
    Verify,
}

impl UnverifiablePolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "remind" => Some(Self::Remind),
            "verify" => Some(Self::Verify),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Remind => "remind",
            Self::Verify => "verify",
        }
    }
}

/// Read-only gate settings, built once per invocation by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateConfig {
    pub verification_command: String,
    pub require_verification: bool,
    pub cache_ttl_seconds: u64,
    pub max_output_lines: usize,
    pub max_output_chars: usize,
    pub unverifiable_policy: UnverifiablePolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            verification_command: DEFAULT_SUITE_COMMAND.to_string(),
            require_verification: true,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            max_output_lines: DEFAULT_MAX_OUTPUT_LINES,
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
            unverifiable_policy: UnverifiablePolicy::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskGateConfig {
    pub enabled: bool,
    pub gated_tools: Vec<String>,
    pub gate_bash_writes: bool,
}

impl Default for TaskGateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gated_tools: ["Edit", "Write", "NotebookEdit"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            gate_bash_writes: true,
        }
    }
}
