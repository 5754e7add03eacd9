//! Row handler registered with a backend.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use url::Url;

use crate::convert::convert_row;
use crate::error::{PxCurlError, Result};
use crate::record::{TableMetadata, TraceRecord};

/// Receives one table's rows, in delivery order, one at a time.
pub trait RecordHandler {
    /// Called when a result table starts, before any of its rows.
    fn on_stream_start(&mut self, table: &TableMetadata) -> Result<()>;

    /// Called once per row. An error aborts the whole stream.
    fn handle_record(&mut self, record: &TraceRecord) -> Result<()>;

    /// Called exactly once when the stream is over, with the terminal error if any.
    fn on_stream_end(&mut self, error: Option<&PxCurlError>);
}

/// Shared interrupt flag, set from the Ctrl+C handler.
#[derive(Clone, Debug, Default)]
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

    /// Route Ctrl+C to this flag.
    pub fn install_ctrlc_handler(&self) -> Result<()> {
        let flag = self.clone();
        ctrlc::set_handler(move || flag.cancel())
            .map_err(|err| PxCurlError::Signal(err.to_string()))
    }
}

/// Converts each row to a curl command and writes it straight to `out`.
pub struct CurlPrinter<W: Write> {
    base_url: Url,
    out: W,
    rows: usize,
}

impl<W: Write> CurlPrinter<W> {
    pub fn new(base_url: Url, out: W) -> Self {
        Self {
            base_url,
            out,
            rows: 0,
        }
    }

    /// Rows emitted so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordHandler for CurlPrinter<W> {
    fn on_stream_start(&mut self, table: &TableMetadata) -> Result<()> {
        tracing::debug!(table = %table.name, columns = table.columns.len(), "table stream started");
        Ok(())
    }

    fn handle_record(&mut self, record: &TraceRecord) -> Result<()> {
        let command = convert_row(record, &self.base_url)?;
        writeln!(self.out, "{command}")?;
        self.out.flush()?;
        self.rows += 1;
        Ok(())
    }

    fn on_stream_end(&mut self, error: Option<&PxCurlError>) {
        match error {
            None => tracing::info!(rows = self.rows, "stream finished"),
            Some(PxCurlError::Compilation(msg)) => {
                tracing::warn!(rows = self.rows, error = %msg, "query was rejected")
            }
            Some(err) if err.is_stream_error() => {
                tracing::warn!(rows = self.rows, error = %err, "stream ended early")
            }
            Some(err) => tracing::warn!(rows = self.rows, error = %err, "conversion aborted"),
        }
    }
}
