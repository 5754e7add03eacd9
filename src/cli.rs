use clap::Parser;
use std::path::PathBuf;
use url::Url;

use crate::error::{PxCurlError, Result};

const AFTER_HELP: &str = "\
In other words, turns Pixie into a traffic replay mechanism powered by eBPF and curl commands.

Examples:
  pixie-to-curl px-api-<UID> 123456-1234-1234-1234-12312331 podtato http://podtato-head-entry.default.svc.cluster.local
  pixie-to-curl px-api-<UID> 123456-1234-1234-1234-12312331 payment http://payment.default.svc.cluster.local
  px run -f export.pxl -o json > rows.json && pixie-to-curl - - payment http://payment.local --input rows.json";

#[derive(Parser, Debug)]
#[command(name = "pixie-to-curl")]
#[command(about = "Export HTTP traffic traced by Pixie as a series of curl commands.")]
#[command(version)]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Your API key generated in the Pixie UI or CLI
    pub api_token: String,

    /// UID of the cluster you want to record from
    pub cluster_id: String,

    /// Name of the pod receiving traffic (usually the service you want to test)
    pub destination_filter: String,

    /// Prefix for each curl command's URL (it isn't usually the same between environments)
    #[arg(value_parser = parse_base_url)]
    pub base_url: Url,

    /// How far back to read traffic, in PxL relative time (default: -5m)
    #[arg(long)]
    pub start_time: Option<String>,

    /// Maximum number of requests to export (default: 2000)
    #[arg(long)]
    pub max_rows: Option<usize>,

    /// Convert rows exported with `px run -o json` from FILE instead of querying Pixie ('-' for stdin)
    #[arg(long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Pixie CLI executable used to run the query (default: px)
    #[arg(long, value_name = "PATH")]
    pub px_binary: Option<PathBuf>,

    /// Print the generated PxL script and exit
    #[arg(long)]
    pub print_query: bool,

    /// Enable debug logging (or set PIXIE_TO_CURL_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse the base URL every request path is joined onto.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PxCurlError::InvalidBaseUrl(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(PxCurlError::InvalidBaseUrl("missing host".to_string()));
    }
    Ok(url)
}
