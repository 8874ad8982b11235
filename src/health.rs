//! Health Monitor: one non-destructive probe pass over the process table per
//! tick. Detection only; remediation stays with the supervisor so both sides
//! are testable on their own.

use crate::launcher::{Liveness, ProcessHandle};
use crate::supervisor::{ServiceKind, SupervisedProcess};
use tracing::warn;

/// Liveness of one table entry at check time. Transient: produced each tick,
/// consumed immediately by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub kind: ServiceKind,
    pub alive: bool,
    /// Exit code when the process was newly observed dead.
    pub exit_code: Option<i32>,
}

/// Probe every entry. An entry without a handle (a spawn that failed earlier)
/// reports dead so the restart path picks it up again. A probe error is
/// logged and the entry treated as still running; the next tick retries
/// rather than risking a spurious restart.
pub fn tick<H: ProcessHandle>(table: &mut [SupervisedProcess<H>]) -> Vec<HealthCheckResult> {
    let mut results = Vec::with_capacity(table.len());
    for entry in table.iter_mut() {
        let result = match entry.handle.as_mut() {
            None => HealthCheckResult {
                kind: entry.kind,
                alive: false,
                exit_code: None,
            },
            Some(handle) => match handle.poll_exit() {
                Ok(Liveness::Running) => HealthCheckResult {
                    kind: entry.kind,
                    alive: true,
                    exit_code: None,
                },
                Ok(Liveness::Exited(code)) => HealthCheckResult {
                    kind: entry.kind,
                    alive: false,
                    exit_code: code,
                },
                Err(err) => {
                    warn!(
                        "liveness probe for {} failed, retrying next tick: {err}",
                        entry.kind.name()
                    );
                    HealthCheckResult {
                        kind: entry.kind,
                        alive: true,
                        exit_code: None,
                    }
                }
            },
        };
        if !result.alive {
            entry.note_exit(result.exit_code);
        }
        results.push(result);
    }
    results
}
