use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use url::Url;

use crate::backend::{JsonRowsBackend, PxCliBackend, QueryBackend};
use crate::error::{PxCurlError, Result};
use crate::query::{build_query, QueryOptions};
use crate::stream::{CancelFlag, CurlPrinter, RecordHandler};

/// Where rows come from.
#[derive(Clone, Debug)]
pub enum RowSource {
    /// Run the script on a cluster through the Pixie CLI.
    Pixie {
        api_token: String,
        cluster_id: String,
        px_binary: PathBuf,
    },
    /// Read `px run -o json` output from a file, or stdin for `-`.
    Exported(PathBuf),
}

/// Options for exporting traced traffic as curl commands.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub query: QueryOptions,
    pub base_url: Url,
    pub source: RowSource,
    pub print_query: bool,
}

/// Build the script, stream rows from the configured source and print one
/// curl command per row to stdout.
pub fn run_export(options: &ExportOptions, cancel: &CancelFlag) -> Result<()> {
    options.query.validate()?;
    let script = build_query(&options.query);
    tracing::debug!(
        start_time = %options.query.start_time,
        destination = %options.query.destination_filter,
        max_rows = options.query.max_rows,
        "built query"
    );

    let stdout = io::stdout();
    if options.print_query {
        let mut out = stdout.lock();
        out.write_all(script.as_bytes())?;
        out.flush()?;
        return Ok(());
    }

    let mut printer = CurlPrinter::new(options.base_url.clone(), stdout.lock());
    let columns = options.query.columns.clone();

    match &options.source {
        RowSource::Pixie {
            api_token,
            cluster_id,
            px_binary,
        } => {
            let mut backend = PxCliBackend::new(px_binary, api_token, cluster_id, columns);
            export_with(&mut backend, &script, &mut printer, cancel)
        }
        RowSource::Exported(path) if path.as_os_str() == "-" => {
            let stdin = BufReader::new(io::stdin());
            let mut backend = JsonRowsBackend::interruptible(stdin, columns, cancel);
            export_with(&mut backend, &script, &mut printer, cancel)
        }
        RowSource::Exported(path) => {
            let reader = open_input(path)?;
            let mut backend = JsonRowsBackend::new(reader, columns);
            export_with(&mut backend, &script, &mut printer, cancel)
        }
    }
}

/// Run `script` on `backend` and always close the handler's stream, whatever
/// the outcome.
pub fn export_with(
    backend: &mut dyn QueryBackend,
    script: &str,
    handler: &mut dyn RecordHandler,
    cancel: &CancelFlag,
) -> Result<()> {
    let result = backend.execute(script, handler, cancel);
    handler.on_stream_end(result.as_ref().err());
    result
}

fn open_input(path: &Path) -> Result<BufReader<File>> {
    File::open(path).map(BufReader::new).map_err(|err| {
        PxCurlError::InvalidArgs(format!("Failed to open input {}: {}", path.display(), err))
    })
}
