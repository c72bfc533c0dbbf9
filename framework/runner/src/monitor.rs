//! Runs the external resource monitor as a [`Child`] process for the duration of a suite.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::interpreter::interpreter_path;
use crate::types::GatewayTunnelResult;

/// Log target that the monitor's output is forwarded to.
pub const MONITOR_LOG_TARGET: &str = "monitor";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MonitorMode {
    /// Run the monitor on this machine, next to the suite.
    #[default]
    Local,
    /// The gateway host is monitored elsewhere, start nothing.
    Remote,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub mode: MonitorMode,
    /// Looked up on `PATH` when not set.
    pub interpreter: Option<PathBuf>,
    pub script: PathBuf,
    /// Passed as `--out`, except on Windows where the monitor picks its own file.
    pub output: PathBuf,
    /// How long the monitor keeps recording after a completed suite.
    pub grace_period: Duration,
    /// How long the monitor gets to exit after being interrupted.
    pub kill_timeout: Duration,
}

impl MonitorConfig {
    fn args(&self, run_id: &str) -> Vec<OsString> {
        let mut args = vec![
            self.script.clone().into_os_string(),
            "--run-id".into(),
            run_id.into(),
        ];
        if !cfg!(windows) {
            args.push("--out".into());
            args.push(self.output.clone().into_os_string());
        }
        args
    }
}

/// A running monitor process and the tasks forwarding its output.
#[derive(Debug)]
pub struct MonitorHandle {
    child: Child,
    forwarders: Vec<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Whether the monitor process is still alive.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

/// Starts the monitor before the first scenario and stops it once the suite is over.
///
/// Monitoring is best effort. A monitor that fails to start is logged and the suite runs without
/// it.
#[derive(Debug, Clone)]
pub struct MonitorSupervisor {
    config: MonitorConfig,
}

impl MonitorSupervisor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn start(&self, run_id: &str) -> Option<MonitorHandle> {
        if self.config.mode == MonitorMode::Remote {
            log::info!("Monitoring is remote, not starting a local monitor");
            return None;
        }

        match self.spawn(run_id) {
            Ok(handle) => {
                log::info!(
                    "Started monitor '{}' with pid {:?}",
                    self.config.script.display(),
                    handle.id()
                );
                Some(handle)
            }
            Err(e) => {
                log::error!("Failed to start the monitor, continuing without it: {e:?}");
                None
            }
        }
    }

    fn spawn(&self, run_id: &str) -> GatewayTunnelResult<MonitorHandle> {
        let interpreter = interpreter_path(self.config.interpreter.as_deref())?;

        let mut child = Command::new(&interpreter)
            .args(self.config.args(run_id))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run '{}'", interpreter.display()))?;

        let stdout = child
            .stdout
            .take()
            .context("Failed to get stdout for the monitor")?;
        let stderr = child
            .stderr
            .take()
            .context("Failed to get stderr for the monitor")?;

        Ok(MonitorHandle {
            child,
            forwarders: vec![
                forward_lines(stdout, log::Level::Info),
                forward_lines(stderr, log::Level::Warn),
            ],
        })
    }

    /// Stop the monitor.
    ///
    /// After a completed suite the monitor first gets the grace period to record the tail of the
    /// run. It is then interrupted so that it can flush its output, and killed if it has not exited
    /// within the kill timeout.
    pub async fn stop(&self, mut handle: MonitorHandle, halted: bool) {
        if !halted {
            log::info!(
                "Letting the monitor record for another {:?}",
                self.config.grace_period
            );
            tokio::time::sleep(self.config.grace_period).await;
        }

        match handle.child.try_wait() {
            Ok(Some(status)) => {
                log::warn!("Monitor had already exited with {status}");
            }
            Ok(None) if interrupt(&handle.child) => {
                match timeout(self.config.kill_timeout, handle.child.wait()).await {
                    Ok(Ok(status)) => log::info!("Monitor stopped with {status}"),
                    Ok(Err(e)) => log::error!("Failed to wait for the monitor to exit: {e}"),
                    Err(_) => {
                        log::warn!(
                            "Monitor did not exit within {:?} of being interrupted, killing it",
                            self.config.kill_timeout
                        );
                        kill(&mut handle.child).await;
                    }
                }
            }
            Ok(None) => kill(&mut handle.child).await,
            Err(e) => log::error!("Failed to check whether the monitor is running: {e}"),
        }

        for forwarder in handle.forwarders {
            // The pipes can outlive the monitor if it left children of its own behind.
            let abort = forwarder.abort_handle();
            if timeout(self.config.kill_timeout, forwarder).await.is_err() {
                abort.abort();
            }
        }
    }
}

fn forward_lines<R>(reader: R, level: log::Level) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => log::log!(target: MONITOR_LOG_TARGET, level, "{line}"),
                Ok(None) => break,
                Err(e) => {
                    log::debug!("Stopped reading monitor output: {e}");
                    break;
                }
            }
        }
    })
}

/// Ask the monitor to stop. Returns false when no interrupt could be delivered.
#[cfg(unix)]
fn interrupt(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return false;
    };

    match kill(Pid::from_raw(pid), Signal::SIGINT) {
        Ok(()) => {
            log::debug!("Sent SIGINT to monitor {pid}");
            true
        }
        Err(e) => {
            log::warn!("Failed to interrupt monitor {pid}: {e}");
            false
        }
    }
}

#[cfg(not(unix))]
fn interrupt(_child: &Child) -> bool {
    false
}

async fn kill(child: &mut Child) {
    match child.kill().await {
        Ok(()) => log::info!("Monitor killed"),
        Err(e) => log::error!("Failed to kill the monitor: {e}"),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::Path;
    use std::time::Instant;

    use super::*;

    fn config(script: &Path, kill_timeout: Duration) -> MonitorConfig {
        MonitorConfig {
            mode: MonitorMode::Local,
            interpreter: Some(PathBuf::from("sh")),
            script: script.to_path_buf(),
            output: PathBuf::from("metrics.csv"),
            grace_period: Duration::from_millis(50),
            kill_timeout,
        }
    }

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("monitor.sh");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn passes_run_id_and_output() {
        let config = config(Path::new("monitor.py"), Duration::from_secs(1));

        assert_eq!(
            config.args("run-7"),
            ["monitor.py", "--run-id", "run-7", "--out", "metrics.csv"].map(OsString::from)
        );
    }

    #[tokio::test]
    async fn remote_mode_starts_nothing() {
        let mut config = config(Path::new("monitor.py"), Duration::from_secs(1));
        config.mode = MonitorMode::Remote;

        assert!(MonitorSupervisor::new(config).start("run-1").is_none());
    }

    #[tokio::test]
    async fn missing_interpreter_is_not_fatal() {
        let mut config = config(Path::new("monitor.py"), Duration::from_secs(1));
        config.interpreter = Some(PathBuf::from("/non/existent/python3"));

        assert!(MonitorSupervisor::new(config).start("run-1").is_none());
    }

    #[tokio::test]
    async fn interrupt_lets_the_monitor_exit() {
        let dir = tempfile::tempdir().unwrap();
        let script = script(
            dir.path(),
            "trap 'echo flushed; exit 0' INT\necho \"started $2\"\nwhile true; do sleep 0.05; done\n",
        );
        let supervisor = MonitorSupervisor::new(config(&script, Duration::from_secs(5)));

        let mut handle = supervisor.start("run-1").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.is_running());

        let started = Instant::now();
        supervisor.stop(handle, true).await;

        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn ignored_interrupt_escalates_to_kill() {
        let dir = tempfile::tempdir().unwrap();
        let script = script(dir.path(), "trap '' INT\nwhile true; do sleep 0.05; done\n");
        let kill_timeout = Duration::from_millis(300);
        let supervisor = MonitorSupervisor::new(config(&script, kill_timeout));

        let mut handle = supervisor.start("run-1").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.is_running());

        let started = Instant::now();
        supervisor.stop(handle, false).await;

        assert!(started.elapsed() >= kill_timeout);
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
