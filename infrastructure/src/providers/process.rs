//! Shared subprocess engine for process-backed providers.
//!
//! Each process-backed backend (claude, codex, gemini) builds a
//! [`CommandSpec`] and hands it to [`run_agent`] together with its
//! normalizer. The engine owns the lifecycle: spawn in a dedicated process
//! group, stream merged stdout/stderr line-by-line through the normalizer,
//! and settle the [`AgentResult`] on exit or cancellation.
//!
//! Cancellation signals the **negative pid** (whole process group) with
//! SIGTERM; after [`KILL_GRACE`] a still-live group is SIGKILLed. When
//! group-kill is not permitted (the child was not a group leader) the
//! single child is killed instead, so the agent still reaches a terminal
//! status within the grace bound.

use council_application::{ExecutionContext, StopHandle};
use council_domain::{AgentConfig, AgentResult, AgentStatus, ParsedEvent, UsageAccumulator};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Grace period between terminate and force-kill.
pub const KILL_GRACE: Duration = Duration::from_secs(3);

/// Pure function mapping one raw output line to canonical events.
pub type Normalizer = fn(&str) -> Vec<ParsedEvent>;

/// A fully constructed backend invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.working_dir = dir;
        self
    }
}

/// Stop handle for a process-group-backed execution.
///
/// `stop` is non-blocking: it cancels the read loop's token, terminates
/// the process group (falling back to the single child), and leaves the
/// force-kill escalation to a detached timer thread.
pub struct ProcessStopHandle {
    pid: Option<i32>,
    token: CancellationToken,
}

impl ProcessStopHandle {
    pub fn new(pid: Option<i32>, token: CancellationToken) -> Self {
        Self { pid, token }
    }
}

impl StopHandle for ProcessStopHandle {
    fn stop(&self) {
        self.token.cancel();

        #[cfg(unix)]
        if let Some(pid) = self.pid {
            // Negative pid addresses the whole process group.
            let group_terminated = unsafe { libc::kill(-pid, libc::SIGTERM) } == 0;
            if !group_terminated {
                debug!(pid, "group terminate refused, signalling child directly");
                unsafe { libc::kill(pid, libc::SIGTERM) };
            }

            // Escalate after the grace period if anything is still alive.
            // A plain thread keeps stop() callable outside a runtime.
            std::thread::spawn(move || {
                std::thread::sleep(KILL_GRACE);
                unsafe {
                    if libc::kill(-pid, 0) == 0 {
                        warn!(pid, "process group survived grace period, force killing");
                        libc::kill(-pid, libc::SIGKILL);
                    } else if libc::kill(pid, 0) == 0 {
                        warn!(pid, "child survived grace period, force killing");
                        libc::kill(pid, libc::SIGKILL);
                    }
                }
            });
        }
    }
}

/// Run one process-backed agent to completion.
pub async fn run_agent(
    spec: CommandSpec,
    config: &AgentConfig,
    ctx: &ExecutionContext,
    normalize: Normalizer,
) -> AgentResult {
    let mut result = AgentResult::queued(config);
    let key = config.agent_key();

    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = spec.working_dir.as_ref().or(config.working_directory.as_ref()) {
        command.current_dir(dir);
    }
    // Own process group, so cancellation can signal the whole tree.
    #[cfg(unix)]
    command.process_group(0);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(agent = %key, "failed to spawn {}: {}", spec.program, e);
            result.push_error(format!("failed to spawn {}: {e}", spec.program));
            result.finish(AgentStatus::Error);
            return result;
        }
    };

    result.mark_running();
    ctx.progress.on_agent_status(&key, AgentStatus::Running);

    let pid = child.id().map(|p| p as i32);
    let token = ctx.cancel.clone();
    ctx.controller.register(
        &key,
        Arc::new(ProcessStopHandle::new(pid, token.clone())),
    );

    // Merge stdout and stderr into one ordered-per-pipe line stream.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    if let Some(stdout) = child.stdout.take() {
        spawn_line_reader(stdout, line_tx.clone());
    }
    if let Some(stderr) = child.stderr.take() {
        spawn_line_reader(stderr, line_tx.clone());
    }
    drop(line_tx);

    let mut usage = UsageAccumulator::new();
    let mut killed = false;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                // The stop handle already signalled the group; this is the
                // single-child fallback and covers non-unix targets.
                let _ = child.start_kill();
                killed = true;
                break;
            }
            line = line_rx.recv() => {
                match line {
                    Some(line) => {
                        for event in normalize(&line) {
                            if let Some(report) = &event.token_usage {
                                usage.apply(report, event.usage_is_cumulative);
                            }
                            ctx.progress.on_agent_event(&key, &event);
                            result.events.push(event);
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Bounded wait: a process that ignores SIGTERM is force-killed by the
    // stop handle's escalation; we never wait past the grace period.
    let exit = tokio::time::timeout(KILL_GRACE + Duration::from_secs(1), child.wait()).await;

    let status = if ctx.controller.is_cancelled() {
        AgentStatus::Cancelled
    } else if killed || token.is_cancelled() {
        AgentStatus::Aborted
    } else {
        match exit {
            Ok(Ok(exit_status)) if exit_status.success() => AgentStatus::Success,
            Ok(Ok(exit_status)) => {
                result.push_error(format!("{} exited with {exit_status}", spec.program));
                AgentStatus::Error
            }
            Ok(Err(e)) => {
                result.push_error(format!("failed waiting for {}: {e}", spec.program));
                AgentStatus::Error
            }
            Err(_) => {
                let _ = child.start_kill();
                result.push_error(format!(
                    "{} did not exit within the grace period",
                    spec.program
                ));
                AgentStatus::Error
            }
        }
    };

    result.usage = usage.into_total();
    ctx.controller.unregister(&key);
    result.finish(status);
    debug!(agent = %key, status = %result.status, events = result.events.len(), "agent settled");
    result
}

fn spawn_line_reader(
    pipe: impl AsyncRead + Unpin + Send + 'static,
    tx: mpsc::UnboundedSender<String>,
) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}
