//! Invocation of `sambamba depth region`, the external depth tool.
//!
//! The tool either writes its region summary to a file (`run`) or streams it
//! through a pipe straight into a [`DepthReader`] (`spawn_stream`). Its stderr is
//! forwarded line by line to the log. A missing executable or a non-zero exit
//! is a [`CoverageError::SourceUnavailable`].

use log::{debug, info, warn};
use std::ffi::OsString;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use crate::core::config::DEFAULT_SAMBAMBA;
use crate::core::error::{CoverageError, Result};
use crate::engine::depth::DepthReader;

const LOG_TARGET: &str = "txcov::sambamba";

/// A `sambamba depth region` command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SambambaCommand {
    executable: PathBuf,
    regions: PathBuf,
    alignment: PathBuf,
    output: Option<PathBuf>,
    thresholds: Vec<u32>,
}

impl SambambaCommand {
    pub fn new<R: Into<PathBuf>, A: Into<PathBuf>>(regions: R, alignment: A) -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_SAMBAMBA),
            regions: regions.into(),
            alignment: alignment.into(),
            output: None,
            thresholds: Vec::new(),
        }
    }

    pub fn executable<P: Into<PathBuf>>(mut self, executable: P) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn output<P: Into<PathBuf>>(mut self, output: P) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn thresholds<I: IntoIterator<Item = u32>>(mut self, thresholds: I) -> Self {
        self.thresholds = thresholds.into_iter().collect();
        self
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// Arguments after the executable.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "depth".into(),
            "region".into(),
            "--regions".into(),
            self.regions.clone().into_os_string(),
            self.alignment.clone().into_os_string(),
        ];
        if let Some(output) = &self.output {
            args.push("-o".into());
            args.push(output.clone().into_os_string());
        }
        for threshold in &self.thresholds {
            args.push("-T".into());
            args.push(threshold.to_string().into());
        }
        args
    }

    /// Full command line for logging.
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.clone().into_os_string())
            .chain(self.args())
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn resolve(&self) -> Result<PathBuf> {
        which::which(&self.executable).map_err(|err| {
            CoverageError::SourceUnavailable(format!(
                "{} not found: {}",
                self.executable.display(),
                err
            ))
        })
    }

    fn spawn_child(&self, stdout: Stdio) -> Result<Child> {
        let executable = self.resolve()?;
        info!(target: LOG_TARGET, "Running {}", self.command_line());
        Command::new(executable)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                CoverageError::SourceUnavailable(format!(
                    "failed to start {}: {}",
                    self.executable.display(),
                    err
                ))
            })
    }

    /// Run to completion. Output goes to the configured file, or to this
    /// process' stdout when none is set.
    pub fn run(&self) -> Result<()> {
        let mut child = self.spawn_child(Stdio::inherit())?;
        let stderr = forward_stderr(child.stderr.take());
        finish(&mut child, stderr)
    }

    /// Start the tool with its stdout piped into a depth reader. Call
    /// [`SambambaProcess::wait`] once the reader is exhausted.
    pub fn spawn_stream(
        &self,
    ) -> Result<(DepthReader<BufReader<ChildStdout>>, SambambaProcess)> {
        if self.output.is_some() {
            return Err(CoverageError::InvalidInput(
                "cannot stream sambamba output that is redirected to a file".to_string(),
            ));
        }
        let mut child = self.spawn_child(Stdio::piped())?;
        let stdout = child.stdout.take().ok_or_else(|| {
            CoverageError::SourceUnavailable("sambamba stdout was not captured".to_string())
        })?;
        let stderr = forward_stderr(child.stderr.take());
        let reader = DepthReader::new(BufReader::new(stdout), "sambamba");
        Ok((reader, SambambaProcess { child, stderr }))
    }
}

/// A running `sambamba` whose stdout is being consumed elsewhere.
pub struct SambambaProcess {
    child: Child,
    stderr: Option<JoinHandle<()>>,
}

impl SambambaProcess {
    /// Wait for exit. A non-zero status is a source failure.
    pub fn wait(mut self) -> Result<()> {
        finish(&mut self.child, self.stderr.take())
    }

    /// Kill the process, used when the consumer gives up early.
    pub fn abort(mut self) {
        if let Err(err) = self.child.kill() {
            debug!(target: LOG_TARGET, "kill failed: {}", err);
        }
        let _ = self.child.wait();
        if let Some(handle) = self.stderr.take() {
            let _ = handle.join();
        }
    }
}

fn forward_stderr(stderr: Option<ChildStderr>) -> Option<JoinHandle<()>> {
    let stderr = stderr?;
    Some(thread::spawn(move || {
        for line in BufReader::new(stderr).lines() {
            match line {
                Ok(line) if !line.trim().is_empty() => warn!(target: LOG_TARGET, "{}", line),
                Ok(_) => {}
                Err(_) => break,
            }
        }
    }))
}

fn finish(child: &mut Child, stderr: Option<JoinHandle<()>>) -> Result<()> {
    let status = child.wait().map_err(|err| {
        CoverageError::SourceUnavailable(format!("failed to wait for sambamba: {}", err))
    })?;
    if let Some(handle) = stderr {
        let _ = handle.join();
    }
    if status.success() {
        debug!(target: LOG_TARGET, "sambamba finished");
        Ok(())
    } else {
        Err(CoverageError::SourceUnavailable(format!(
            "sambamba exited with {}",
            status
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_command_line() {
        let cmd = SambambaCommand::new("exons.bed", "sample.bam")
            .output("out.bed")
            .thresholds([10, 20]);
        assert_eq!(
            cmd.command_line(),
            "sambamba depth region --regions exons.bed sample.bam -o out.bed -T 10 -T 20"
        );
        assert_eq!(cmd.output_path(), Some(Path::new("out.bed")));
    }

    #[test]
    fn minimal_command_line() {
        let cmd = SambambaCommand::new("r.bed", "a.bam").executable("/opt/sambamba");
        assert_eq!(
            cmd.command_line(),
            "/opt/sambamba depth region --regions r.bed a.bam"
        );
    }

    #[test]
    fn missing_executable_is_source_unavailable() {
        let cmd = SambambaCommand::new("r.bed", "a.bam")
            .executable("/nonexistent/definitely-not-sambamba");
        assert!(matches!(cmd.run(), Err(CoverageError::SourceUnavailable(_))));
        assert!(matches!(cmd.spawn_stream(), Err(CoverageError::SourceUnavailable(_))));
    }

    #[test]
    fn streaming_with_output_file_is_rejected() {
        let cmd = SambambaCommand::new("r.bed", "a.bam").output("x.bed");
        assert!(matches!(cmd.spawn_stream(), Err(CoverageError::InvalidInput(_))));
    }
}
