//! Generator process execution with live output forwarding.
//!
//! With [`OutputSink::inherit`] the child writes straight to the host's stdout
//! and stderr. With injected writers the child's pipes are drained on reader
//! threads while it runs, each chunk forwarded as soon as it arrives. Either
//! way `run` returns once the generator itself exits: pipes still held open by
//! a background process it left behind are drained for a short grace period
//! only.

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, instrument, warn};

use crate::core::types::{GenerationInvocation, GenerationRun};
use crate::error::ExecutionError;

const CHUNK_BYTES: usize = 8192;

/// How long to keep draining pipes after the generator has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Destination for a child's stdout and stderr.
#[derive(Clone)]
pub enum OutputSink {
    /// The child inherits the host process's own stdout/stderr.
    Inherit,
    /// Pair of write-only streams fed from the child's pipes.
    Forward {
        stdout: SharedWriter,
        stderr: SharedWriter,
    },
}

impl OutputSink {
    pub fn new(stdout: impl Write + Send + 'static, stderr: impl Write + Send + 'static) -> Self {
        Self::Forward {
            stdout: Arc::new(Mutex::new(Box::new(stdout))),
            stderr: Arc::new(Mutex::new(Box::new(stderr))),
        }
    }

    /// Hand the host's stdout/stderr to the child.
    pub fn inherit() -> Self {
        Self::Inherit
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherit => f.write_str("Inherit"),
            Self::Forward { .. } => f.debug_struct("Forward").finish_non_exhaustive(),
        }
    }
}

/// Abstraction over generator execution.
pub trait ProcessRunner {
    /// Run `invocation` to completion. `run` is a diagnostic label only.
    fn run(
        &self,
        invocation: &GenerationInvocation,
        run: GenerationRun,
    ) -> Result<(), ExecutionError>;
}

/// Runner that spawns real child processes.
#[derive(Debug)]
pub struct SystemProcessRunner {
    sink: OutputSink,
}

impl SystemProcessRunner {
    pub fn new(sink: OutputSink) -> Self {
        Self { sink }
    }

    /// Runner whose children write directly to the host's stdout/stderr.
    pub fn inherit() -> Self {
        Self::new(OutputSink::inherit())
    }
}

impl ProcessRunner for SystemProcessRunner {
    #[instrument(skip_all, fields(run = run.number()))]
    fn run(
        &self,
        invocation: &GenerationInvocation,
        run: GenerationRun,
    ) -> Result<(), ExecutionError> {
        let program = invocation.program.clone();
        info!(
            command = %invocation.command_line(),
            workdir = %invocation.workdir.display(),
            "{run}: running generator"
        );

        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .current_dir(&invocation.workdir)
            .stdin(Stdio::null());
        match &self.sink {
            OutputSink::Inherit => cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit()),
            OutputSink::Forward { .. } => cmd.stdout(Stdio::piped()).stderr(Stdio::piped()),
        };

        let mut child = cmd.spawn().map_err(|source| {
            error!(err = %source, "failed to spawn generator");
            ExecutionError::Spawn {
                program: program.clone(),
                source,
            }
        })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = 0;
        if let OutputSink::Forward { stdout, stderr } = &self.sink {
            if let Some(pipe) = child.stdout.take() {
                spawn_forwarder(pipe, Arc::clone(stdout), tx.clone());
                readers += 1;
            }
            if let Some(pipe) = child.stderr.take() {
                spawn_forwarder(pipe, Arc::clone(stderr), tx.clone());
                readers += 1;
            }
        }
        drop(tx);

        let status = child.wait().map_err(|source| ExecutionError::Wait {
            program: program.clone(),
            source,
        })?;
        debug!(exit_code = ?status.code(), "generator finished");

        if let Err(source) = collect_forwarders(&rx, readers) {
            warn!(err = %source, "generator output was lost");
            return Err(ExecutionError::Forward { program, source });
        }

        if !status.success() {
            warn!(exit_code = ?status.code(), "{run}: generator failed");
            return Err(ExecutionError::NonZeroExit {
                program,
                code: status.code(),
            });
        }
        Ok(())
    }
}

fn spawn_forwarder<R: Read + Send + 'static>(
    reader: R,
    writer: SharedWriter,
    done: mpsc::Sender<io::Result<u64>>,
) {
    thread::spawn(move || {
        let result = forward_stream(reader, &writer);
        // The receiver is gone once the grace period has passed.
        let _ = done.send(result);
    });
}

/// Wait for up to `readers` forwarders, bounded by [`DRAIN_GRACE`].
///
/// A forwarder still blocked after the grace period is left behind: its pipe
/// is held by some other process, not by the generator.
fn collect_forwarders(rx: &mpsc::Receiver<io::Result<u64>>, readers: usize) -> io::Result<()> {
    let deadline = Instant::now() + DRAIN_GRACE;
    for _ in 0..readers {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(result) => {
                let forwarded = result?;
                debug!(forwarded, "output stream drained");
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("output pipe still open after generator exit, detaching reader");
                return Ok(());
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(io::Error::other("output forwarding thread panicked"));
            }
        }
    }
    Ok(())
}

/// Copy `reader` into `writer` until EOF, flushing after each chunk.
///
/// A write failure stops forwarding but the pipe is still drained to EOF so the
/// child never blocks on a full pipe.
fn forward_stream<R: Read>(
    mut reader: R,
    writer: &Mutex<Box<dyn Write + Send>>,
) -> io::Result<u64> {
    let mut chunk = [0u8; CHUNK_BYTES];
    let mut forwarded = 0u64;
    let mut write_error = None;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if write_error.is_some() {
            continue;
        }
        let mut out = writer.lock().unwrap_or_else(PoisonError::into_inner);
        match out.write_all(&chunk[..n]).and_then(|()| out.flush()) {
            Ok(()) => forwarded += n as u64,
            Err(e) => write_error = Some(e),
        }
    }

    match write_error {
        Some(e) => Err(e),
        None => Ok(forwarded),
    }
}
