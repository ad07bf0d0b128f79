//! Producers of raw `varnishstat` output.
//!
//! The `StatSource` trait lets the collector run against the real
//! `varnishstat` binary or against fixed payloads in tests.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::CollectError;
use crate::parser::InputFormat;

/// How often a running child is checked for exit.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Source of one raw `varnishstat` payload per call.
pub trait StatSource {
    /// Returns the raw output, or an error that fails the cycle.
    fn fetch(&self) -> Result<String, CollectError>;
}

impl<S: StatSource + ?Sized> StatSource for Box<S> {
    fn fetch(&self) -> Result<String, CollectError> {
        (**self).fetch()
    }
}

/// Runs the `varnishstat` binary.
#[derive(Debug, Clone)]
pub struct VarnishStat {
    binary: PathBuf,
    use_sudo: bool,
    instance_name: Option<String>,
    timeout: Duration,
    format: InputFormat,
}

impl VarnishStat {
    pub const DEFAULT_BINARY: &'static str = "/usr/bin/varnishstat";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            use_sudo: false,
            instance_name: None,
            timeout: Self::DEFAULT_TIMEOUT,
            format: InputFormat::Json,
        }
    }

    /// Runs the binary through `sudo -n`.
    pub fn with_sudo(mut self, use_sudo: bool) -> Self {
        self.use_sudo = use_sudo;
        self
    }

    /// Selects the varnishd instance (`varnishstat -n NAME`).
    pub fn with_instance(mut self, name: Option<String>) -> Self {
        self.instance_name = name.filter(|n| !n.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = format;
        self
    }

    /// Full command line, program first.
    pub fn command_line(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(6);
        if self.use_sudo {
            argv.push("sudo".to_string());
            argv.push("-n".to_string());
        }
        argv.push(self.binary.display().to_string());
        argv.push(self.format.varnishstat_flag().to_string());
        if let Some(name) = &self.instance_name {
            argv.push("-n".to_string());
            argv.push(name.clone());
        }
        argv
    }

    fn command(&self) -> Command {
        let argv = self.command_line();
        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        cmd
    }
}

impl Default for VarnishStat {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BINARY)
    }
}

impl StatSource for VarnishStat {
    fn fetch(&self) -> Result<String, CollectError> {
        debug!("running {}", self.command_line().join(" "));
        let started = Instant::now();
        let output = run_with_timeout(self.command(), self.timeout)?;
        trace!(
            "varnishstat returned {} bytes in {:?}",
            output.len(),
            started.elapsed()
        );
        Ok(output)
    }
}

/// Runs `cmd` with stdin closed, returning its stdout.
///
/// The child is killed once `timeout` elapses. Stdout and stderr are drained
/// on helper threads so a large payload cannot block the child on a full pipe.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<String, CollectError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| CollectError::Spawn { program, source })?;

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let status = wait_with_deadline(&mut child, timeout)?;

    let stdout = join(stdout)?;
    let stderr = join(stderr)?;

    if !status.success() {
        return Err(CollectError::ExitStatus {
            code: status.code(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8(stdout)?)
}

fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
) -> Result<std::process::ExitStatus, CollectError> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CollectError::Timeout(timeout));
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> io::Result<Vec<u8>> {
    match handle {
        Some(h) => h
            .join()
            .map_err(|_| io::Error::other("pipe reader thread panicked"))?,
        None => Ok(Vec::new()),
    }
}
