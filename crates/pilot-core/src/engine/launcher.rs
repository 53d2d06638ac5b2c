use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use crate::core::io::transcript::step_in_line;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// How long output is still collected once the tool has exited while a pipe stays open.
const EXIT_DRAIN: Duration = Duration::from_millis(500);

/// Shared flag that asks a running launch to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOutcome {
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub elapsed: Duration,
    pub lines: usize,
    pub last_step: Option<usize>,
}

/// How to invoke the external tool. The configuration path is always appended as the
/// last argument, as in `python input.py config.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct Launcher {
    program: String,
    leading_args: Vec<String>,
    working_dir: Option<PathBuf>,
    envs: Vec<(String, String)>,
    timeout: Option<Duration>,
}

enum StreamEvent {
    Line(String),
    Closed,
    Failed(io::Error),
}

impl Launcher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            working_dir: None,
            envs: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.timeout
    }

    /// Where the tool sees `path`: relative paths resolve against its working directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.working_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn command_line(&self, config_path: &Path) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.leading_args.iter().cloned())
            .chain(std::iter::once(config_path.display().to_string()))
            .collect()
    }

    /// Runs the tool to completion, copying its merged stdout and stderr into
    /// `transcript` line by line.
    ///
    /// A non-zero exit is not an error here; callers inspect [`LaunchOutcome::success`].
    /// Cancellation and the time limit kill the child and return
    /// [`EngineError::Cancelled`] and [`EngineError::TimedOut`].
    pub fn launch(
        &self,
        config_path: &Path,
        transcript: &mut impl Write,
        reporter: &ProgressReporter,
        cancel: &CancelFlag,
    ) -> Result<LaunchOutcome, EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut command = Command::new(&self.program);
        command
            .args(&self.leading_args)
            .arg(config_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command.envs(self.envs.iter().map(|(k, v)| (k, v)));

        info!(command = %self.command_line(config_path).join(" "), "Launching external tool");
        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| EngineError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::channel();
        let readers = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => [
                spawn_reader("stdout", stdout, tx.clone()),
                spawn_reader("stderr", stderr, tx),
            ],
            _ => {
                terminate(&mut child);
                return Err(EngineError::Internal(
                    "child process streams were not captured".to_string(),
                ));
            }
        };

        let mut session = Session {
            launcher: self,
            child: &mut child,
            started,
            cancel,
            lines: 0,
            last_step: None,
        };
        let drained = session.pump(rx, transcript, reporter)?;
        let status = session.wait()?;
        let (lines, last_step) = (session.lines, session.last_step);

        // Readers still blocked on a pipe held by a leftover process stay detached.
        if drained {
            for reader in readers {
                if reader.join().is_err() {
                    warn!("Output reader thread panicked");
                }
            }
        }
        transcript.flush().map_err(EngineError::Recording)?;

        let outcome = LaunchOutcome {
            exit_code: status.code(),
            success: status.success(),
            elapsed: started.elapsed(),
            lines,
            last_step,
        };
        debug!(?outcome, "External tool finished");
        Ok(outcome)
    }
}

struct Session<'a> {
    launcher: &'a Launcher,
    child: &'a mut Child,
    started: Instant,
    cancel: &'a CancelFlag,
    lines: usize,
    last_step: Option<usize>,
}

impl Session<'_> {
    fn check_interrupts(&mut self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            warn!("Cancellation requested, stopping external tool");
            terminate(self.child);
            return Err(EngineError::Cancelled);
        }
        if let Some(limit) = self.launcher.timeout {
            if self.started.elapsed() >= limit {
                warn!(limit_secs = limit.as_secs_f64(), "Time limit reached, stopping external tool");
                terminate(self.child);
                return Err(EngineError::TimedOut { limit });
            }
        }
        Ok(())
    }

    /// Forwards output until both pipes close. Returns `false` when the tool exited
    /// while a pipe was still held open and the readers were left behind.
    fn pump(
        &mut self,
        rx: Receiver<StreamEvent>,
        transcript: &mut impl Write,
        reporter: &ProgressReporter,
    ) -> Result<bool, EngineError> {
        let mut open_streams = 2;
        let mut exited_at: Option<Instant> = None;
        while open_streams > 0 {
            self.check_interrupts()?;
            match exited_at {
                Some(at) if at.elapsed() >= EXIT_DRAIN => {
                    debug!(
                        open_streams,
                        "Tool exited but its output is still held open, detaching readers"
                    );
                    return Ok(false);
                }
                Some(_) => {}
                None => {
                    if self.has_exited()? {
                        exited_at = Some(Instant::now());
                    }
                }
            }
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(StreamEvent::Line(line)) => {
                    trace!(line = line.trim_end(), "tool output");
                    let write = if line.ends_with('\n') {
                        transcript.write_all(line.as_bytes())
                    } else {
                        transcript
                            .write_all(line.as_bytes())
                            .and_then(|()| transcript.write_all(b"\n"))
                    };
                    if let Err(e) = write {
                        terminate(self.child);
                        return Err(EngineError::Recording(e));
                    }
                    self.lines += 1;
                    if let Some(step) = step_in_line(&line) {
                        self.last_step = Some(step);
                        reporter.report(Progress::TaskPosition {
                            position: step as u64 + 1,
                        });
                    }
                }
                Ok(StreamEvent::Closed) => open_streams -= 1,
                Ok(StreamEvent::Failed(e)) => {
                    warn!(error = %e, "Lost an output stream of the external tool");
                    open_streams -= 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(true)
    }

    fn poll_exit(&mut self) -> Result<Option<ExitStatus>, EngineError> {
        self.child
            .try_wait()
            .map_err(|source| EngineError::Spawn {
                program: self.launcher.program.clone(),
                source,
            })
    }

    fn has_exited(&mut self) -> Result<bool, EngineError> {
        Ok(self.poll_exit()?.is_some())
    }

    fn wait(&mut self) -> Result<ExitStatus, EngineError> {
        loop {
            self.check_interrupts()?;
            match self.poll_exit()? {
                Some(status) => return Ok(status),
                None => thread::sleep(POLL_INTERVAL),
            }
        }
    }
}

fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        debug!(error = %e, "Kill failed, process has probably exited");
    }
    if let Err(e) = child.wait() {
        warn!(error = %e, "Failed to reap external tool");
    }
}

/// Forwards lines from one pipe. The thread is detached when a launch is cancelled; it
/// ends once the pipe closes or the receiver is gone.
fn spawn_reader(
    name: &'static str,
    stream: impl Read + Send + 'static,
    tx: Sender<StreamEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            let event = match reader.read_until(b'\n', &mut buffer) {
                Ok(0) => StreamEvent::Closed,
                Ok(_) => StreamEvent::Line(String::from_utf8_lossy(&buffer).into_owned()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => StreamEvent::Failed(e),
            };
            let last = !matches!(event, StreamEvent::Line(_));
            if tx.send(event).is_err() || last {
                trace!(stream = name, "Output reader finished");
                break;
            }
        }
    })
}
