//! Convenience prelude for common pixie-to-curl embedding tasks.

pub use crate::api::{
    build_query, convert_row, CancelFlag, CurlPrinter, JsonRowsBackend, PxCurlError,
    QueryBackend, QueryOptions, RecordHandler, Result, TraceRecord,
};
