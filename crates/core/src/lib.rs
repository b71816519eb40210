#![forbid(unsafe_code)]

pub mod classify;
pub mod config;
pub mod fingerprint;
pub mod gate;
pub mod messages;
pub mod model;
pub mod output;
pub mod ports;
pub mod shell;
pub mod task_gate;
pub mod time;

pub use classify::{CommandCategory, CommandClassifier};
pub use config::{GateConfig, TaskGateConfig, UnverifiablePolicy};
pub use fingerprint::{Fingerprint, FingerprintProbe, FingerprintProvider};
pub use gate::{GateEngine, GatePorts};
pub use model::{
    CheckpointKind, CheckpointRequest, CheckpointResponse, Decision, GateBranch, GateCondition,
    RunRecord, Session,
};
pub use ports::{
    BaselineStore, Clock, RunCache, RunOutcome, StoreFault, SystemClock, TaskProbe, TaskTracker,
    VerificationRunner,
};
pub use task_gate::TaskGate;
