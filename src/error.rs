//! Error types for the supervisor core.
//!
//! None of these terminate the warden once it is running: a failed spawn is
//! routed through the same restart path as an observed exit, and a failed
//! probe is retried on the next tick.

use std::io;
use thiserror::Error;

/// A child could not be started at all.
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("executable not found in PATH: {0}")]
    NotFound(String),
    #[error("failed to spawn {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// The liveness check itself failed to execute. Distinct from the child
/// having exited: the monitor retries instead of restarting.
#[derive(Debug, Error)]
#[error("liveness probe failed: {0}")]
pub struct ProbeError(#[from] pub io::Error);

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("startup plan could not be executed: no supervised process could be spawned")]
    StartupFailed,
}
