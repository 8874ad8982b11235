//! Supervisor (orchestrator): owns the process table, executes the startup
//! plan in order, then loops forever probing and restarting.

use crate::error::SupervisorError;
use crate::health::{self, HealthCheckResult};
use crate::launcher::{CommandSpec, Launcher, ProcessHandle};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// The two supervised services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Web,
    Bot,
}

impl ServiceKind {
    /// Short tag used for log prefixes and lookups.
    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Web => "web",
            ServiceKind::Bot => "bot",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Web => "web dashboard",
            ServiceKind::Bot => "telegram bot",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Exited,
}

/// Exit seen by the monitor, kept for log output on the restart that follows.
#[derive(Debug, Clone, Copy)]
pub struct ExitObservation {
    pub code: Option<i32>,
    pub observed_at: DateTime<Utc>,
}

/// One supervised service. Owned exclusively by the supervisor; the handle is
/// replaced on every restart, the entry itself lives for the whole run.
pub struct SupervisedProcess<H> {
    pub kind: ServiceKind,
    pub spec: CommandSpec,
    /// None between a failed spawn and the next successful restart.
    pub handle: Option<H>,
    pub state: ProcessState,
    pub restart_count: u64,
    pub started_at: DateTime<Utc>,
    pub last_exit: Option<ExitObservation>,
}

impl<H: ProcessHandle> SupervisedProcess<H> {
    pub fn new(kind: ServiceKind, spec: CommandSpec, handle: Option<H>) -> Self {
        let state = if handle.is_some() {
            ProcessState::Running
        } else {
            ProcessState::Exited
        };
        Self {
            kind,
            spec,
            handle,
            state,
            restart_count: 0,
            started_at: Utc::now(),
            last_exit: None,
        }
    }

    /// Record a newly observed exit. A repeat observation (an entry already
    /// waiting for a successful respawn) keeps the original exit record.
    pub fn note_exit(&mut self, code: Option<i32>) {
        if self.state == ProcessState::Running {
            self.state = ProcessState::Exited;
            self.last_exit = Some(ExitObservation {
                code,
                observed_at: Utc::now(),
            });
        }
    }
}

/// One startup step: which service, how to start it, and how long to wait
/// before starting it.
#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub kind: ServiceKind,
    pub spec: CommandSpec,
    pub delay_before: Duration,
}

/// Fixed startup ordering. Delays between entries are the only ordering
/// mechanism; there is no inter-process signaling.
#[derive(Debug, Clone)]
pub struct StartupPlan {
    entries: Vec<PlanEntry>,
}

impl StartupPlan {
    /// The reference plan: web immediately, bot after `bot_delay` so the
    /// web-side health endpoint is up before the bot starts polling.
    pub fn staggered(web: CommandSpec, bot: CommandSpec, bot_delay: Duration) -> Self {
        Self {
            entries: vec![
                PlanEntry {
                    kind: ServiceKind::Web,
                    spec: web,
                    delay_before: Duration::ZERO,
                },
                PlanEntry {
                    kind: ServiceKind::Bot,
                    spec: bot,
                    delay_before: bot_delay,
                },
            ],
        }
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }
}

/// Orchestrator over a launcher and the process table.
pub struct Supervisor<L: Launcher> {
    launcher: L,
    table: Vec<SupervisedProcess<L::Handle>>,
    interval: Duration,
}

impl<L: Launcher> Supervisor<L> {
    /// Execute the startup plan in order, honoring each entry's delay.
    ///
    /// A spawn failure here is not fatal for the entry: it is recorded as an
    /// immediate exit and retried by the monitor loop. Startup fails as a
    /// whole only when no entry could be spawned at all.
    pub async fn start(
        launcher: L,
        plan: StartupPlan,
        interval: Duration,
    ) -> Result<Self, SupervisorError> {
        let mut table = Vec::with_capacity(plan.entries().len());
        for entry in plan.entries() {
            if !entry.delay_before.is_zero() {
                sleep(entry.delay_before).await;
            }
            let handle = match launcher.start(entry.kind.name(), &entry.spec).await {
                Ok(handle) => {
                    info!("started {} ({})", entry.kind.display_name(), entry.spec.command_line());
                    Some(handle)
                }
                Err(err) => {
                    error!("failed to start {}: {err}", entry.kind.display_name());
                    None
                }
            };
            table.push(SupervisedProcess::new(entry.kind, entry.spec.clone(), handle));
        }
        if table.iter().all(|entry| entry.handle.is_none()) {
            return Err(SupervisorError::StartupFailed);
        }
        Ok(Self {
            launcher,
            table,
            interval,
        })
    }

    /// One probe-and-remediate pass: every entry observed dead is restarted
    /// with its original command and environment.
    pub async fn tick(&mut self) -> Vec<HealthCheckResult> {
        let results = health::tick(&mut self.table);
        for result in &results {
            if !result.alive {
                self.restart(result.kind).await;
            }
        }
        results
    }

    /// Run forever: sleep the probe interval, tick, repeat. The loop has no
    /// termination condition; the process ends only on an external signal.
    pub async fn run(mut self) {
        info!(
            "supervising {} processes, probing every {:?}",
            self.table.len(),
            self.interval
        );
        loop {
            sleep(self.interval).await;
            self.tick().await;
        }
    }

    async fn restart(&mut self, kind: ServiceKind) {
        let Some(entry) = self.table.iter_mut().find(|entry| entry.kind == kind) else {
            return;
        };

        match entry.last_exit {
            Some(exit) => warn!(
                "{} exited (code {:?}), restarting",
                entry.kind.display_name(),
                exit.code
            ),
            None => warn!("{} never came up, starting again", entry.kind.display_name()),
        }

        // Drop the dead handle before its replacement exists: at most one
        // live handle per service.
        entry.handle = None;

        match self.launcher.start(kind.name(), &entry.spec).await {
            Ok(handle) => {
                entry.handle = Some(handle);
                entry.state = ProcessState::Running;
                entry.restart_count += 1;
                entry.started_at = Utc::now();
                entry.last_exit = None;
                info!(
                    "{} restarted (restart #{})",
                    entry.kind.display_name(),
                    entry.restart_count
                );
            }
            Err(err) => {
                error!(
                    "failed to restart {}: {err}; retrying next tick",
                    entry.kind.display_name()
                );
            }
        }
    }

    pub fn processes(&self) -> &[SupervisedProcess<L::Handle>] {
        &self.table
    }

    pub fn restart_count(&self, kind: ServiceKind) -> u64 {
        self.table
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.restart_count)
            .unwrap_or(0)
    }
}
