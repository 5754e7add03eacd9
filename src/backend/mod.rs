//! Query execution backends.
//!
//! A backend takes the PxL script, runs it somewhere and pushes the resulting
//! rows into a [`RecordHandler`], strictly in delivery order. Both backends
//! speak the `px run -o json` row format: one JSON object per line, the
//! table name under `_tableName` and one key per column.

mod json_rows;
mod px_cli;

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::error::{PxCurlError, Result};
use crate::query::TABLE_NAME;
use crate::record::{Datum, TableMetadata, TraceRecord};
use crate::stream::{CancelFlag, RecordHandler};

pub use json_rows::JsonRowsBackend;
pub use px_cli::{PxCliBackend, API_KEY_ENV, DEFAULT_PX_BINARY};

const TABLE_NAME_KEY: &str = "_tableName";

/// How often a blocked read re-checks the cancel flag.
const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Executes a script and streams its rows into a handler.
///
/// Implementations call `on_stream_start` for each table and `handle_record`
/// for each row; the caller owns `on_stream_end`. Returning early with an
/// error stops the stream.
pub trait QueryBackend {
    fn execute(
        &mut self,
        script: &str,
        handler: &mut dyn RecordHandler,
        cancel: &CancelFlag,
    ) -> Result<()>;
}

/// Lines read on a worker thread so a read that never returns (an idle
/// stdin, a silent child process) cannot hold off cancellation.
///
/// Iteration ends at EOF, or as soon as the cancel flag is set.
pub struct InterruptibleLines {
    rx: Receiver<io::Result<String>>,
    cancel: CancelFlag,
}

impl InterruptibleLines {
    pub fn spawn<R: BufRead + Send + 'static>(reader: R, cancel: &CancelFlag) -> Self {
        let (tx, rx) = mpsc::sync_channel(64);
        thread::spawn(move || {
            for line in reader.lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self {
            rx,
            cancel: cancel.clone(),
        }
    }
}

impl Iterator for InterruptibleLines {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            match self.rx.recv_timeout(CANCEL_POLL) {
                Ok(line) => return Some(line),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

/// Feed JSON rows from `lines` into `handler`. Returns the number of rows
/// delivered.
pub(crate) fn stream_json_rows<I>(
    lines: I,
    columns: &[String],
    handler: &mut dyn RecordHandler,
    cancel: &CancelFlag,
) -> Result<usize>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut current_table: Option<String> = None;
    let mut delivered = 0;

    for (index, line) in lines.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PxCurlError::Cancelled);
        }
        let line = line.map_err(|err| PxCurlError::Stream(err.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        let (table, record) = decode_row(&line, columns)
            .map_err(|err| PxCurlError::Stream(format!("line {}: {err}", index + 1)))?;

        if current_table.as_deref() != Some(table.as_str()) {
            handler.on_stream_start(&TableMetadata {
                name: table.clone(),
                columns: columns.to_vec(),
            })?;
            current_table = Some(table);
        }

        if cancel.is_cancelled() {
            return Err(PxCurlError::Cancelled);
        }
        handler.handle_record(&record)?;
        delivered += 1;
    }

    if cancel.is_cancelled() {
        return Err(PxCurlError::Cancelled);
    }
    Ok(delivered)
}

/// Decode one output line into its table name and the projected cells.
///
/// Cells are taken in `columns` order and stop at the first missing column,
/// leaving the short row for the converter to reject.
pub fn decode_row(line: &str, columns: &[String]) -> Result<(String, TraceRecord)> {
    let mut object: Map<String, Value> = serde_json::from_str(line)?;

    let table = match object.remove(TABLE_NAME_KEY) {
        Some(Value::String(name)) => name,
        _ => TABLE_NAME.to_string(),
    };

    let mut data = Vec::with_capacity(columns.len());
    for column in columns {
        match object.remove(column) {
            Some(value) => data.push(Datum::from_json(value)),
            None => break,
        }
    }

    Ok((table, TraceRecord::new(data)))
}
