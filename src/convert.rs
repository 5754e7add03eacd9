//! Row to HTTP request reconstruction.

use std::collections::BTreeMap;
use std::fmt;

use url::{Position, Url};

use crate::curl::render_curl;
use crate::error::{PxCurlError, Result};
use crate::query::HTTP_COLUMNS;
use crate::record::TraceRecord;

const COL_PATH: usize = 0;
const COL_METHOD: usize = 2;
const COL_HEADERS: usize = 3;
const COL_BODY: usize = 4;
const COL_STATUS: usize = 5;

/// Number of cells every row must carry.
pub const EXPECTED_COLUMNS: usize = HTTP_COLUMNS.len();

/// Rows whose recorded response had this status get the fail-fast flag.
pub const ASSERT_STATUS: &str = "200";

/// Request headers keyed by canonical name. Adding never replaces.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: BTreeMap<String, Vec<String>>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the `req_headers` column, a JSON object of string to string.
    pub fn from_json(raw: &str) -> Result<Self> {
        let decoded: BTreeMap<String, String> =
            serde_json::from_str(raw).map_err(PxCurlError::HeaderDecode)?;
        let mut headers = Self::new();
        for (name, value) in decoded {
            headers.add(&name, value);
        }
        Ok(headers)
    }

    pub fn add(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(canonical_header_name(name))
            .or_default()
            .push(value.into());
    }

    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&canonical_header_name(name))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every (name, value) pair; a name with two values yields two pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// HTTP/1 MIME canonical form: `content-type` becomes `Content-Type`.
/// Names with characters outside the token set are returned unchanged.
pub fn canonical_header_name(name: &str) -> String {
    if !is_token(name) {
        return name.to_string();
    }
    let mut upper = true;
    name.chars()
        .map(|ch| {
            let out = if upper {
                ch.to_ascii_uppercase()
            } else {
                ch.to_ascii_lowercase()
            };
            upper = ch == '-';
            out
        })
        .collect()
}

fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}

/// A request rebuilt from one row. Lives only for that row.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconstructedRequest {
    pub method: String,
    pub url: String,
    pub headers: HeaderSet,
    /// `None` when the row had no body; rendered without any data flag.
    pub body: Option<String>,
    /// Path keeps `.` or `..` segments that clients normally resolve.
    pub has_dot_segments: bool,
}

/// Final command line for one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedCommand(String);

impl RenderedCommand {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RenderedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Convert one row into a curl command line against `base_url`.
pub fn convert_row(record: &TraceRecord, base_url: &Url) -> Result<RenderedCommand> {
    let request = reconstruct_request(record, base_url)?;
    let mut line = render_curl(&request)?;

    if record.text(COL_STATUS).as_deref() == Some(ASSERT_STATUS) {
        line.push_str(" --fail");
    }

    Ok(RenderedCommand(line))
}

pub fn reconstruct_request(record: &TraceRecord, base_url: &Url) -> Result<ReconstructedRequest> {
    if record.len() < EXPECTED_COLUMNS {
        return Err(PxCurlError::ShortRow {
            received: record.len(),
            expected: EXPECTED_COLUMNS,
        });
    }
    let cell = |index: usize| record.text(index).unwrap_or_default();

    let headers = HeaderSet::from_json(&cell(COL_HEADERS))?;

    let body = Some(cell(COL_BODY)).filter(|b| !b.is_empty());

    let method = cell(COL_METHOD);
    if !is_token(&method) {
        return Err(PxCurlError::Request(format!("invalid method {method:?}")));
    }

    let raw_path = cell(COL_PATH);
    let (row_path, row_query) = match raw_path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw_path.as_str(), None),
    };
    let path = join_url_path(base_url.path(), row_path);
    let has_dot_segments = path.split('/').any(|seg| seg == "." || seg == "..");
    let url = request_url(base_url, &path, row_query)?;

    Ok(ReconstructedRequest {
        method,
        url,
        headers,
        body,
        has_dot_segments,
    })
}

/// Join the base URL's path and a row path.
///
/// Duplicate separators collapse, dot segments stay as written and a
/// trailing slash on the row path survives. The result always starts with `/`.
pub fn join_url_path(base: &str, path: &str) -> String {
    let segments: Vec<&str> = base
        .split('/')
        .chain(path.split('/'))
        .filter(|seg| !seg.is_empty())
        .collect();

    let mut joined = String::with_capacity(base.len() + path.len() + 1);
    for seg in &segments {
        joined.push('/');
        joined.push_str(seg);
    }
    if joined.is_empty() || (path.ends_with('/') && !segments.is_empty()) {
        joined.push('/');
    }
    joined
}

fn request_url(base_url: &Url, path: &str, row_query: Option<&str>) -> Result<String> {
    if base_url.cannot_be_a_base() {
        return Err(PxCurlError::Request(format!(
            "base url {base_url} cannot carry a path"
        )));
    }

    let mut url = String::from(&base_url[..Position::BeforePath]);
    encode_path_into(&mut url, path);

    let query = match (base_url.query(), row_query) {
        (Some(base), Some(row)) if !base.is_empty() && !row.is_empty() => {
            Some(format!("{base}&{row}"))
        }
        (Some(base), _) if !base.is_empty() => Some(base.to_string()),
        (_, Some(row)) if !row.is_empty() => Some(row.to_string()),
        _ => None,
    };
    if let Some(query) = query {
        url.push('?');
        url.push_str(&query);
    }
    Ok(url)
}

/// Percent-encode characters that may not appear raw in a URL path.
/// Existing `%XX` escapes pass through untouched.
fn encode_path_into(out: &mut String, path: &str) {
    for ch in path.chars() {
        match ch {
            ' ' | '"' | '#' | '<' | '>' | '`' | '{' | '}' => push_encoded(out, ch),
            c if c.is_ascii_control() || !c.is_ascii() => push_encoded(out, c),
            c => out.push(c),
        }
    }
}

fn push_encoded(out: &mut String, ch: char) {
    let mut buf = [0u8; 4];
    for byte in ch.encode_utf8(&mut buf).bytes() {
        out.push_str(&format!("%{byte:02X}"));
    }
}
