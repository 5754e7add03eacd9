use thiserror::Error;

/// Errors that can occur while building the query, streaming rows or
/// converting them to curl commands.
#[derive(Error, Debug)]
pub enum PxCurlError {
    /// IO error (output closed, input file missing, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error from an undecodable row.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error for malformed URLs.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Invalid command-line arguments.
    #[error("{0}")]
    InvalidArgs(String),

    /// Base URL parsed but cannot prefix request paths.
    #[error("base url must be a valid URL (http://example.com:8080): {0}")]
    InvalidBaseUrl(String),

    /// Config file could not be read or parsed.
    #[error("{0}")]
    Config(String),

    /// The Ctrl+C handler could not be installed.
    #[error("failed to install Ctrl+C handler: {0}")]
    Signal(String),

    /// The backend could not be reached or started.
    #[error("failed to connect to backend: {0}")]
    Backend(String),

    /// The backend rejected the query before producing any rows.
    #[error("query compilation failed: {0}")]
    Compilation(String),

    /// The stream broke after it started.
    #[error("error while streaming results: {0}")]
    Stream(String),

    /// The operator interrupted the stream.
    #[error("export cancelled")]
    Cancelled,

    /// Backend returned fewer columns than the query projects.
    #[error("not enough columns were returned by the backend, received: {received} expected: {expected}")]
    ShortRow { received: usize, expected: usize },

    /// Request headers column is not a JSON object of strings.
    #[error("failed to unmarshal headers JSON: {0}")]
    HeaderDecode(#[source] serde_json::Error),

    /// Row data cannot form an HTTP request.
    #[error("failed to create HTTP request: {0}")]
    Request(String),

    /// Request cannot be rendered as a shell command.
    #[error("failed to convert HTTP request to curl: {0}")]
    Render(String),
}

impl PxCurlError {
    /// Terminal outcomes reported by the stream itself rather than by row data.
    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            PxCurlError::Compilation(_) | PxCurlError::Stream(_) | PxCurlError::Cancelled
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            PxCurlError::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Convenience result type for pixie-to-curl operations.
pub type Result<T> = std::result::Result<T, PxCurlError>;
