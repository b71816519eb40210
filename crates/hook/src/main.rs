#![forbid(unsafe_code)]

//! prove_it - verification gate for Claude Code sessions.
//!
//! Runs as a hook command: one JSON request on stdin, at most one response on stdout.

mod config;
mod dispatch;
mod init;
mod protocol;
mod status;

use clap::{Parser, Subcommand, ValueEnum};
use dispatch::HookEnv;
use protocol::HookEvent;
use pv_runner::GitFingerprintProvider;
use pv_runner::defaults::{PROJECT_DIR_ENV, default_state_dir};
use std::io::{Read as _, Write as _};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "prove_it")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter for stderr (trace, debug, info, warn, error)
    #[arg(long, env = "PROVE_IT_LOG", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Handle one hook request from stdin
    Hook {
        /// Event this command is registered for; used when the payload cannot name it
        #[arg(long, value_enum)]
        event: Option<EventArg>,
    },

    /// Show root, fingerprint and cached suite run as JSON
    Status {
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Create a failing script/test stub in the repository root
    Init {
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Replace an existing script/test
        #[arg(long)]
        force: bool,
    },

    /// Print the effective merged configuration as JSON
    Config {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EventArg {
    SessionStart,
    PreToolUse,
    Stop,
}

impl From<EventArg> for HookEvent {
    fn from(value: EventArg) -> Self {
        match value {
            EventArg::SessionStart => HookEvent::SessionStart,
            EventArg::PreToolUse => HookEvent::PreToolUse,
            EventArg::Stop => HookEvent::Stop,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}: {}", .0.code(), .0)]
    Store(#[from] pv_storage::StoreError),
    #[error(transparent)]
    Init(#[from] init::InitError),
    #[error("encode output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn hook_env() -> HookEnv {
    HookEnv {
        state_dir: default_state_dir(),
        project_dir_env: std::env::var_os(PROJECT_DIR_ENV),
        process_cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn target_dir(env: &HookEnv, dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| env.project_dir(None))
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(text.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn run_hook(event: Option<EventArg>, env: &HookEnv) -> Result<(), CliError> {
    let mut raw = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut raw) {
        tracing::warn!(error = %err, "failed to read hook input");
        raw.clear();
    }
    let reply = dispatch::handle(&raw, event.map(HookEvent::from), env);
    if let Some(text) = reply.render() {
        write_stdout(&text)?;
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    let env = hook_env();
    match cli.command {
        Commands::Hook { event } => run_hook(event, &env),
        Commands::Status { dir } => {
            let dir = target_dir(&env, dir);
            let config = env.load_config(&dir);
            let report = status::status_report(&dir, &env.state_dir, &config)?;
            write_stdout(&format!("{}\n", serde_json::to_string_pretty(&report)?))
        }
        Commands::Init { dir, force } => {
            let dir = target_dir(&env, dir);
            let root = GitFingerprintProvider::default().resolve_root(&dir);
            let outcome = init::init_suite(&root, force)?;
            write_stdout(&format!("prove-it: {}\n", outcome.describe()))
        }
        Commands::Config { dir } => {
            let dir = target_dir(&env, dir);
            let config = env.load_config(&dir);
            write_stdout(&format!("{}\n", serde_json::to_string_pretty(&config)?))
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let is_hook = matches!(cli.command, Commands::Hook { .. });
    if let Err(err) = run(cli) {
        eprintln!("prove_it: {err}");
        // Hook invocations always exit 0.
        std::process::exit(if is_hook { 0 } else { 1 });
    }
}
