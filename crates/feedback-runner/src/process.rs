//! Shell command process management

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

use feedback_core::prelude::*;
use feedback_core::{OutputStream, ProcessStatus, RunnerEvent};

use crate::process_tree::kill_process_tree;

/// How long the wait task lets the readers flush after the child exits.
///
/// Background grandchildren can hold the pipes open indefinitely, so the
/// drain is bounded.
pub const READER_DRAIN_GRACE: Duration = Duration::from_millis(250);

/// A running shell command with captured stdout and stderr.
///
/// The `Child` handle is moved into a background `wait_for_exit` task. That
/// task records the exit code only after both reader tasks have forwarded
/// everything they read, so a caller that sees [`ProcessStatus::Exited`] and
/// then drains its channel has every line the command wrote.
pub struct CommandProcess {
    /// The command line as given to the shell
    command: String,
    /// Process ID of the shell
    pid: Option<u32>,
    /// Tells the wait task to kill the shell. Consumed on first use (or on drop).
    kill_tx: Option<oneshot::Sender<()>>,
    exit: Arc<ExitState>,
}

#[derive(Default)]
struct ExitState {
    /// Set once by the wait task; `None` inside means killed by a signal
    code: OnceLock<Option<i32>>,
    notify: Notify,
}

impl CommandProcess {
    /// Run `command` through the platform shell in `cwd`.
    ///
    /// The child gets exactly `env` as its environment, no stdin, and piped
    /// output. Every line it writes is sent on `event_tx`, terminator included.
    pub fn spawn(
        command: &str,
        cwd: &Path,
        env: &HashMap<String, String>,
        event_tx: mpsc::UnboundedSender<RunnerEvent>,
    ) -> Result<Self> {
        if command.trim().is_empty() {
            return Err(Error::EmptyCommand);
        }

        info!("Spawning command: {} (cwd: {})", command, cwd.display());

        let mut child = shell_command(command)
            .current_dir(cwd)
            .env_clear()
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::spawn(e.to_string()))?;

        let pid = child.id();
        info!("Command started with PID: {:?}", pid);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::spawn("stdout was not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::spawn("stderr was not captured"))?;

        let readers = vec![
            tokio::spawn(read_output(stdout, OutputStream::Stdout, event_tx.clone())),
            tokio::spawn(read_output(stderr, OutputStream::Stderr, event_tx)),
        ];

        let exit = Arc::new(ExitState::default());
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        tokio::spawn(wait_for_exit(child, kill_rx, readers, Arc::clone(&exit)));

        Ok(Self {
            command: command.to_string(),
            pid,
            kill_tx: Some(kill_tx),
            exit,
        })
    }

    /// Non-blocking liveness check
    pub fn poll(&self) -> ProcessStatus {
        match self.exit.code.get() {
            Some(code) => ProcessStatus::Exited(*code),
            None => ProcessStatus::Running,
        }
    }

    pub fn has_exited(&self) -> bool {
        self.exit.code.get().is_some()
    }

    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    /// Kill the shell and every process it started.
    ///
    /// Safe to call repeatedly and after the command has already exited.
    /// Never fails; individual kill failures are only logged.
    pub fn terminate(&mut self) {
        if self.has_exited() {
            debug!("Command already exited, nothing to terminate");
            self.kill_tx.take();
            return;
        }

        if let Some(pid) = self.pid {
            info!("Terminating process tree rooted at {}", pid);
            kill_process_tree(pid);
        }

        if let Some(tx) = self.kill_tx.take() {
            // The wait task may have already seen the exit
            let _ = tx.send(());
        }
    }

    /// Wait until the wait task has recorded the exit
    pub async fn wait(&self) -> Option<i32> {
        loop {
            // Create the future before checking so a notification between the
            // check and the await is not lost.
            let notified = self.exit.notify.notified();
            if let Some(code) = self.exit.code.get() {
                return *code;
            }
            notified.await;
        }
    }

    /// Get the process ID
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Drop for CommandProcess {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("CommandProcess dropped while '{}' may still be running", self.command);
            if let Some(tx) = self.kill_tx.take() {
                let _ = tx.send(());
            }
        }
        debug!("CommandProcess dropped");
    }
}

#[cfg(windows)]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

#[cfg(not(windows))]
fn shell_command(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

/// Forward each line of `output` as a [`RunnerEvent`].
///
/// Reads raw bytes up to and including `\n` so the terminator survives and
/// invalid UTF-8 becomes U+FFFD instead of ending the stream.
async fn read_output<R>(output: R, stream: OutputStream, tx: mpsc::UnboundedSender<RunnerEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(output);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf).into_owned();
                trace!("{:?}: {}", stream, chunk.trim_end());

                let event = match stream {
                    OutputStream::Stdout => RunnerEvent::Stdout(chunk),
                    OutputStream::Stderr => RunnerEvent::Stderr(chunk),
                };
                if tx.send(event).is_err() {
                    debug!("{:?} channel closed", stream);
                    break;
                }
            }
            Err(e) => {
                warn!("Failed to read {:?}: {}", stream, e);
                break;
            }
        }
    }

    debug!("{:?} reader finished", stream);
}

/// Background task: owns `child`, waits for it to exit, then records the code.
///
/// Two ways the task can end:
/// 1. The command exits on its own and `child.wait()` resolves.
/// 2. `kill_rx` fires (terminate or drop) and the child is killed first.
async fn wait_for_exit(
    mut child: Child,
    kill_rx: oneshot::Receiver<()>,
    readers: Vec<JoinHandle<()>>,
    exit: Arc<ExitState>,
) {
    let code: Option<i32> = tokio::select! {
        result = child.wait() => {
            match result {
                Ok(status) => {
                    info!("Command exited with status: {:?}", status);
                    status.code()
                }
                Err(e) => {
                    error!("Error waiting for command: {}", e);
                    None
                }
            }
        }
        _ = kill_rx => {
            info!("Kill requested, killing command");
            if let Err(e) = child.kill().await {
                debug!("Failed to kill command (likely already gone): {}", e);
            }
            match child.wait().await {
                Ok(status) => status.code(),
                Err(e) => {
                    error!("Error waiting after kill: {}", e);
                    None
                }
            }
        }
    };

    let drain = async {
        for reader in readers {
            let _ = reader.await;
        }
    };
    if tokio::time::timeout(READER_DRAIN_GRACE, drain).await.is_err() {
        debug!("Output pipes still open after exit; a background process holds them");
    }

    let _ = exit.code.set(code);
    exit.notify.notify_waiters();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::environment::user_environment;
    use crate::process_tree::{descendants, ProcessTable, SystemProcessTable};
    use tokio::time::{sleep, timeout};

    fn spawn_in_temp(command: &str) -> (CommandProcess, mpsc::UnboundedReceiver<RunnerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let process =
            CommandProcess::spawn(command, &std::env::temp_dir(), &user_environment(), tx)
                .expect("spawn");
        (process, rx)
    }

    async fn wait_exited(process: &CommandProcess) -> Option<i32> {
        timeout(Duration::from_secs(5), process.wait())
            .await
            .expect("command did not exit in time")
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<RunnerEvent>) -> Vec<RunnerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_blank_command_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = CommandProcess::spawn("   ", Path::new("."), &HashMap::new(), tx);
        assert!(matches!(result, Err(Error::EmptyCommand)));
    }

    #[tokio::test]
    async fn test_missing_cwd_is_spawn_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = CommandProcess::spawn(
            "echo hi",
            Path::new("/nonexistent/feedback-runner-cwd"),
            &user_environment(),
            tx,
        );
        assert!(matches!(result, Err(Error::ProcessSpawn { .. })));
    }

    #[tokio::test]
    async fn test_stdout_lines_keep_terminator() {
        let (process, mut rx) = spawn_in_temp("echo hello");
        assert_eq!(wait_exited(&process).await, Some(0));

        assert_eq!(drain(&mut rx), vec![RunnerEvent::Stdout("hello\n".to_string())]);
        assert_eq!(process.poll(), ProcessStatus::Exited(Some(0)));
    }

    #[tokio::test]
    async fn test_stderr_is_captured() {
        let (process, mut rx) = spawn_in_temp("echo oops >&2");
        wait_exited(&process).await;

        assert_eq!(drain(&mut rx), vec![RunnerEvent::Stderr("oops\n".to_string())]);
    }

    #[tokio::test]
    async fn test_exit_code_is_reported() {
        let (process, _rx) = spawn_in_temp("exit 42");
        assert_eq!(wait_exited(&process).await, Some(42));
        assert_eq!(process.poll(), ProcessStatus::Exited(Some(42)));
    }

    #[tokio::test]
    async fn test_all_output_precedes_exit() {
        let (process, mut rx) = spawn_in_temp("for i in 1 2 3 4 5; do echo line$i; done");
        wait_exited(&process).await;

        let chunks: Vec<String> = drain(&mut rx)
            .into_iter()
            .map(RunnerEvent::into_chunk)
            .collect();
        assert_eq!(chunks, vec!["line1\n", "line2\n", "line3\n", "line4\n", "line5\n"]);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let (process, mut rx) = spawn_in_temp(r"printf 'bad \377 byte\n'");
        wait_exited(&process).await;

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].chunk(), "bad \u{FFFD} byte\n");
    }

    #[tokio::test]
    async fn test_unterminated_final_line() {
        let (process, mut rx) = spawn_in_temp("printf 'no newline'");
        wait_exited(&process).await;

        assert_eq!(drain(&mut rx), vec![RunnerEvent::Stdout("no newline".to_string())]);
    }

    #[tokio::test]
    async fn test_environment_is_passed_through() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut env = user_environment();
        env.insert("FEEDBACK_RUNNER_VALUE".to_string(), "xyz".to_string());

        let process = CommandProcess::spawn(
            "echo $FEEDBACK_RUNNER_VALUE",
            &std::env::temp_dir(),
            &env,
            tx,
        )
        .unwrap();
        wait_exited(&process).await;

        assert_eq!(drain(&mut rx), vec![RunnerEvent::Stdout("xyz\n".to_string())]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_terminate_stops_long_running_command() {
        let (mut process, _rx) = spawn_in_temp("sleep 60");
        assert!(process.poll().is_running());

        process.terminate();

        let code = wait_exited(&process).await;
        assert_eq!(code, None, "killed command has no exit code");
        assert!(!process.poll().is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_poll_reports_exit_within_one_interval_of_terminate() {
        // Front-ends poll every 100 ms
        const POLL_INTERVAL: Duration = Duration::from_millis(100);

        for command in ["sleep 60", "sleep 60 & sleep 60 & wait", "yes > /dev/null"] {
            let (mut process, _rx) = spawn_in_temp(command);
            sleep(Duration::from_millis(50)).await;
            assert!(process.poll().is_running(), "{command} exited early");

            process.terminate();
            sleep(POLL_INTERVAL).await;

            assert!(
                !process.poll().is_running(),
                "{command} still running one interval after terminate"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_terminate_is_idempotent() {
        let (mut process, _rx) = spawn_in_temp("sleep 60");
        process.terminate();
        process.terminate();
        wait_exited(&process).await;
        process.terminate();
        assert!(process.has_exited());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_terminate_after_natural_exit_is_noop() {
        let (mut process, _rx) = spawn_in_temp("true");
        assert_eq!(wait_exited(&process).await, Some(0));
        process.terminate();
        assert_eq!(process.poll(), ProcessStatus::Exited(Some(0)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_terminate_kills_descendants() {
        let (mut process, _rx) = spawn_in_temp("sleep 60 & sleep 60 & wait");
        let root = process.id().expect("pid");

        let mut table = SystemProcessTable::new();
        let mut children = Vec::new();
        for _ in 0..50 {
            sleep(Duration::from_millis(20)).await;
            table.refresh();
            children = descendants(&table, root);
            if children.len() >= 2 {
                break;
            }
        }
        assert!(children.len() >= 2, "background sleeps were not started");

        process.terminate();
        wait_exited(&process).await;

        let mut survivors = children.clone();
        for _ in 0..50 {
            table.refresh();
            survivors.retain(|pid| table.is_alive(*pid));
            if survivors.is_empty() {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        assert!(survivors.is_empty(), "descendants survived: {survivors:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_drop_kills_command() {
        let (process, _rx) = spawn_in_temp("sleep 60");
        let pid = process.id().expect("pid");
        drop(process);

        let mut table = SystemProcessTable::new();
        let mut alive = true;
        for _ in 0..50 {
            sleep(Duration::from_millis(20)).await;
            table.refresh();
            alive = table.is_alive(pid);
            if !alive {
                break;
            }
        }
        assert!(!alive, "dropped command is still running");
    }
}
