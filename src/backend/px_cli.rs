use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use super::{stream_json_rows, InterruptibleLines, QueryBackend};
use crate::error::{PxCurlError, Result};
use crate::stream::{CancelFlag, RecordHandler};

pub const DEFAULT_PX_BINARY: &str = "px";

/// Environment variable the Pixie CLI reads its API key from.
pub const API_KEY_ENV: &str = "PX_API_KEY";

/// Runs the script on a cluster through the Pixie CLI and streams its JSON output.
pub struct PxCliBackend {
    binary: PathBuf,
    api_key: String,
    cluster_id: String,
    columns: Vec<String>,
}

impl PxCliBackend {
    pub fn new(
        binary: impl Into<PathBuf>,
        api_key: impl Into<String>,
        cluster_id: impl Into<String>,
        columns: Vec<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            api_key: api_key.into(),
            cluster_id: cluster_id.into(),
            columns,
        }
    }

    fn command(&self, script_path: &std::path::Path) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("run")
            .arg("-c")
            .arg(&self.cluster_id)
            .arg("-o")
            .arg("json")
            .arg("-f")
            .arg(script_path)
            .env(API_KEY_ENV, &self.api_key)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl QueryBackend for PxCliBackend {
    fn execute(
        &mut self,
        script: &str,
        handler: &mut dyn RecordHandler,
        cancel: &CancelFlag,
    ) -> Result<()> {
        let mut script_file = tempfile::Builder::new()
            .prefix("pixie-to-curl-")
            .suffix(".pxl")
            .tempfile()
            .map_err(|err| PxCurlError::Backend(format!("failed to stage script: {err}")))?;
        script_file
            .write_all(script.as_bytes())
            .and_then(|_| script_file.flush())
            .map_err(|err| PxCurlError::Backend(format!("failed to stage script: {err}")))?;

        tracing::info!(
            binary = %self.binary.display(),
            cluster = %self.cluster_id,
            "executing script"
        );
        let mut child = self.command(script_file.path()).spawn().map_err(|err| {
            PxCurlError::Backend(format!("failed to start {}: {err}", self.binary.display()))
        })?;

        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut buf = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut buf);
            }
            buf
        });

        let streamed = match child.stdout.take() {
            Some(stdout) => {
                let lines = InterruptibleLines::spawn(BufReader::new(stdout), cancel);
                stream_json_rows(lines, &self.columns, handler, cancel)
            }
            None => Err(PxCurlError::Backend("px stdout was not captured".to_string())),
        };
        if streamed.is_err() {
            let _ = child.kill();
        }

        let status = child
            .wait()
            .map_err(|err| PxCurlError::Stream(format!("failed to wait for px: {err}")))?;
        let stderr_text = stderr_reader.join().unwrap_or_default();

        let rows = streamed?;
        if status.success() {
            return Ok(());
        }
        Err(classify_failure(status, &stderr_text, rows))
    }
}

/// Map a failed `px run` to the error class an operator needs to see.
fn classify_failure(status: ExitStatus, stderr: &str, rows: usize) -> PxCurlError {
    let message = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| format!("px exited with {status}"));
    let lower = stderr.to_ascii_lowercase();

    if lower.contains("compil") {
        PxCurlError::Compilation(message)
    } else if rows == 0 && (lower.contains("auth") || lower.contains("cluster")) {
        PxCurlError::Backend(message)
    } else {
        PxCurlError::Stream(message)
    }
}
