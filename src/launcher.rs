//! Process Launcher: starts a named external command with its output wired
//! into the log multiplexer, and returns a handle for liveness checks.

use crate::error::{ProbeError, SpawnError};
use crate::logmux::{self, LogSink};
use crate::platform;
use crate::signal;
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// How to start one supervised service: program name (resolved on PATH at
/// spawn time), argument list, and environment overrides applied on top of
/// the inherited environment.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    /// Build from an argv-style list. None when the list is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            env: Vec::new(),
        })
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// The command line as one string, for log output.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Result of a non-destructive liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Running,
    Exited(Option<i32>),
}

/// Probe surface of a started child. The probe must not block, and must not
/// report Running once the child has actually exited and been reaped.
pub trait ProcessHandle: Send {
    fn poll_exit(&mut self) -> Result<Liveness, ProbeError>;
    fn pid(&self) -> Option<u32>;
}

/// Handle over a real child process. Holds the reaping side of the child, so
/// `try_wait` stays authoritative after the OS has collected the exit status.
#[derive(Debug)]
pub struct ChildHandle {
    child: Child,
    pid: Option<u32>,
}

impl ChildHandle {
    fn new(child: Child) -> Self {
        let pid = child.id();
        Self { child, pid }
    }
}

impl ProcessHandle for ChildHandle {
    fn poll_exit(&mut self) -> Result<Liveness, ProbeError> {
        match self.child.try_wait() {
            Ok(Some(status)) => Ok(Liveness::Exited(status.code())),
            Ok(None) => Ok(Liveness::Running),
            Err(err) => Err(ProbeError(err)),
        }
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

impl Drop for ChildHandle {
    fn drop(&mut self) {
        if let Some(pid) = self.pid {
            signal::unregister(pid);
        }
    }
}

/// Seam between the orchestrator and actual process creation. Tests supply a
/// mock; production uses [`ProcessLauncher`].
#[async_trait]
pub trait Launcher: Send + Sync {
    type Handle: ProcessHandle;

    async fn start(&self, name: &str, spec: &CommandSpec) -> Result<Self::Handle, SpawnError>;
}

/// Spawns real children with stdout/stderr piped into the log multiplexer.
pub struct ProcessLauncher {
    sink: LogSink,
}

impl ProcessLauncher {
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }

    fn spawn_forwarder(
        &self,
        name: &str,
        stream_label: &'static str,
        reader: impl tokio::io::AsyncRead + Unpin + Send + 'static,
    ) {
        let sink = self.sink.clone();
        let tag = name.to_string();
        tokio::spawn(async move {
            if let Err(err) = logmux::forward(&tag, reader, sink).await {
                warn!("{stream_label} forwarding for {tag} stopped: {err}");
            }
        });
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    type Handle = ChildHandle;

    async fn start(&self, name: &str, spec: &CommandSpec) -> Result<ChildHandle, SpawnError> {
        let program = which::which(&spec.program)
            .map_err(|_| SpawnError::NotFound(spec.program.clone()))?;

        let mut command = Command::new(&program);
        command.args(&spec.args);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        platform::prepare_command(&mut command);

        for (key, value) in &spec.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| SpawnError::Io {
            name: name.to_string(),
            source,
        })?;

        if let Some(pid) = child.id() {
            signal::register(pid);
            debug!("started {name} pid={pid} ({})", spec.command_line());
        }

        if let Some(stdout) = child.stdout.take() {
            self.spawn_forwarder(name, "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            self.spawn_forwarder(name, "stderr", stderr);
        }

        Ok(ChildHandle::new(child))
    }
}
