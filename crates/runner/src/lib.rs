#![forbid(unsafe_code)]

mod bin_detect;
pub mod beads;
pub mod defaults;
pub mod git;
pub mod suite;

pub use beads::BeadsTaskTracker;
pub use git::GitFingerprintProvider;
pub use suite::ShellVerificationRunner;
