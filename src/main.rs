use std::io;
use std::process;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use pixie_to_curl::cli::Cli;
use pixie_to_curl::router;

const LOG_ENV: &str = "PIXIE_TO_CURL_LOG";

fn init_tracing(verbose: bool) {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            "pixie_to_curl=debug".to_string()
        } else {
            "pixie_to_curl=warn".to_string()
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::new(filter))
        .try_init();
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => err.exit(),
            _ => {
                let _ = err.print();
                eprintln!();
                let _ = Cli::command().write_long_help(&mut io::stderr());
                process::exit(2);
            }
        },
    };

    init_tracing(cli.verbose);

    if let Err(e) = router::run(cli) {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}
