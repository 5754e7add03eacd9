use std::io::{self, BufRead};

use super::{stream_json_rows, InterruptibleLines, QueryBackend};
use crate::error::Result;
use crate::stream::{CancelFlag, RecordHandler};

/// Replays rows already exported with `px run -o json`.
///
/// The script is not executed; the lines are assumed to hold the output of
/// an equivalent query.
pub struct JsonRowsBackend<L> {
    lines: Option<L>,
    columns: Vec<String>,
}

impl<R: BufRead> JsonRowsBackend<io::Lines<R>> {
    pub fn new(reader: R, columns: Vec<String>) -> Self {
        Self {
            lines: Some(reader.lines()),
            columns,
        }
    }
}

impl JsonRowsBackend<InterruptibleLines> {
    /// Read on a worker thread, so Ctrl+C ends the run even while `reader`
    /// is blocked (stdin with nothing on it yet).
    pub fn interruptible<R>(reader: R, columns: Vec<String>, cancel: &CancelFlag) -> Self
    where
        R: BufRead + Send + 'static,
    {
        Self {
            lines: Some(InterruptibleLines::spawn(reader, cancel)),
            columns,
        }
    }
}

impl<L> QueryBackend for JsonRowsBackend<L>
where
    L: Iterator<Item = io::Result<String>>,
{
    fn execute(
        &mut self,
        script: &str,
        handler: &mut dyn RecordHandler,
        cancel: &CancelFlag,
    ) -> Result<()> {
        tracing::debug!(script_bytes = script.len(), "converting exported rows");
        let Some(lines) = self.lines.take() else {
            return Ok(());
        };
        let rows = stream_json_rows(lines, &self.columns, handler, cancel)?;
        tracing::debug!(rows, "exported rows exhausted");
        Ok(())
    }
}
