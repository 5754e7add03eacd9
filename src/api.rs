//! Stable, supported API surface for embedding pixie-to-curl.
//!
//! Treat the contents of this module as SemVer-stable.

pub use crate::backend::{decode_row, JsonRowsBackend, PxCliBackend, QueryBackend};
pub use crate::commands::{export_with, run_export, ExportOptions, RowSource};
pub use crate::convert::{
    canonical_header_name, convert_row, join_url_path, reconstruct_request, HeaderSet,
    ReconstructedRequest, RenderedCommand,
};
pub use crate::curl::{curl_args, render_curl};
pub use crate::error::{PxCurlError, Result};
pub use crate::query::{build_query, default_columns, QueryOptions, HTTP_COLUMNS};
pub use crate::record::{Datum, TableMetadata, TraceRecord};
pub use crate::stream::{CancelFlag, CurlPrinter, RecordHandler};
