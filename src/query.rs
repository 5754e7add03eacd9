//! PxL script generation.
//!
//! The script reads `http_events`, works out which side of each exchange is
//! the source and which the destination, keeps only exchanges whose
//! destination contains the filter, and projects the columns the converter
//! expects.

use crate::error::{PxCurlError, Result};

/// Columns projected by the export script, in the order the converter reads them.
pub const HTTP_COLUMNS: [&str; 8] = [
    "req_path",
    "remote_addr",
    "req_method",
    "req_headers",
    "req_body",
    "resp_status",
    "major_version",
    "destination",
];

pub const DEFAULT_START_TIME: &str = "-5m";
pub const DEFAULT_MAX_ROWS: usize = 2000;

/// Name of the table the script displays.
pub const TABLE_NAME: &str = "http";

/// Options for building the export script.
#[derive(Clone, Debug)]
pub struct QueryOptions {
    pub start_time: String,
    pub destination_filter: String,
    pub max_rows: usize,
    pub columns: Vec<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            start_time: DEFAULT_START_TIME.to_string(),
            destination_filter: String::new(),
            max_rows: DEFAULT_MAX_ROWS,
            columns: default_columns(),
        }
    }
}

impl QueryOptions {
    pub fn new(destination_filter: impl Into<String>) -> Self {
        Self {
            destination_filter: destination_filter.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_rows == 0 {
            return Err(PxCurlError::InvalidArgs(
                "--max-rows must be greater than 0".to_string(),
            ));
        }
        if self.start_time.trim().is_empty() {
            return Err(PxCurlError::InvalidArgs(
                "--start-time cannot be empty".to_string(),
            ));
        }
        if self.columns.is_empty() {
            return Err(PxCurlError::InvalidArgs(
                "at least one column must be projected".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn default_columns() -> Vec<String> {
    HTTP_COLUMNS.iter().map(|c| c.to_string()).collect()
}

const SOURCE_DEST_FN: &str = r#"def add_source_dest_columns(df):
    ''' Add source and destination columns for the HTTP request.

    HTTP requests are traced server-side (trace_role==2), unless the server is
    outside of the cluster in which case the request is traced client-side (trace_role==1).

    When trace_role==2, the HTTP request source is the remote_addr column
    and destination is the pod column. When trace_role==1, the HTTP request
    source is the pod column and the destination is the remote_addr column.
    '''
    df.pod = df.ctx['pod']
    df.namespace = df.ctx['namespace']

    # If remote_addr is a pod, get its name. If not, use IP address.
    df.ra_pod = px.pod_id_to_pod_name(px.ip_to_pod_id(df.remote_addr))
    df.is_ra_pod = df.ra_pod != ''
    df.ra_name = px.select(df.is_ra_pod, df.ra_pod, df.remote_addr)

    df.is_server_tracing = df.trace_role == 2
    df.is_source_pod_type = px.select(df.is_server_tracing, df.is_ra_pod, True)
    df.is_dest_pod_type = px.select(df.is_server_tracing, True, df.is_ra_pod)

    df.source = px.select(df.is_server_tracing, df.ra_name, df.pod)
    df.destination = px.select(df.is_server_tracing, df.pod, df.ra_name)

    df = df[df.source != '']
    df = df[df.destination != '']

    df = df.drop(['ra_pod', 'is_ra_pod', 'ra_name', 'is_server_tracing'])

    return df
"#;

/// Build the PxL script for `options`. Pure; callers validate first.
pub fn build_query(options: &QueryOptions) -> String {
    let columns = options
        .columns
        .iter()
        .map(|c| pxl_literal(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut script = String::with_capacity(SOURCE_DEST_FN.len() + 512);
    script.push_str("import px\n\n");
    script.push_str(SOURCE_DEST_FN);
    script.push('\n');
    script.push_str(&format!(
        "df = px.DataFrame('http_events', start_time={})\n",
        pxl_literal(&options.start_time)
    ));
    script.push_str("df = add_source_dest_columns(df)\n");
    script.push_str(&format!(
        "df = df[px.contains(df.destination, {})]\n",
        pxl_literal(&options.destination_filter)
    ));
    script.push_str(&format!("df = df[[{columns}]]\n"));
    script.push_str(&format!("df = df.head({})\n\n", options.max_rows));
    script.push_str(&format!("px.display(df, {})\n", pxl_literal(TABLE_NAME)));
    script
}

/// Single-quoted PxL string literal.
fn pxl_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}
