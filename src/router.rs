use crate::cli::Cli;
use crate::commands::{run_export, ExportOptions, RowSource};
use crate::config::{load_config, ResolvedConfig};
use crate::error::Result;
use crate::query::{default_columns, QueryOptions};
use crate::stream::CancelFlag;

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config()?;
    let resolved = ResolvedConfig::from_config(&config);
    let defaults = &resolved.export;

    let query = QueryOptions {
        start_time: cli
            .start_time
            .unwrap_or_else(|| defaults.start_time.clone()),
        destination_filter: cli.destination_filter,
        max_rows: cli.max_rows.unwrap_or(defaults.max_rows),
        columns: default_columns(),
    };

    let source = match cli.input {
        Some(path) => RowSource::Exported(path),
        None => RowSource::Pixie {
            api_token: cli.api_token,
            cluster_id: cli.cluster_id,
            px_binary: cli.px_binary.unwrap_or_else(|| defaults.px_binary.clone()),
        },
    };

    let options = ExportOptions {
        query,
        base_url: cli.base_url,
        source,
        print_query: cli.print_query,
    };

    let cancel = CancelFlag::new();
    if !options.print_query {
        cancel.install_ctrlc_handler()?;
    }
    run_export(&options, &cancel)
}
