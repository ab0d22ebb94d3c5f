//! Delimited text into rows or header-keyed records.
//!
//! - Acquisition: strings, byte buffers, local files (gzip/zstd aware) and readers.
//! - Decoding: row separator sniffing, quoted field tokenization, header zipping.
//! - Fast local path: feature `fast_local`, memory-mapped synchronous reads.
//!
//! Data shape:
//! - `Parsed::Rows(Vec<Vec<String>>)` when headers are off
//! - `Parsed::Records(Vec<Record>)` when the first row names the fields
//!
//! ```
//! use csv_records::CsvParser;
//!
//! let mut parser = CsvParser::new();
//! parser.from_string("name,lang;csv_records,rust")?;
//! let records = parser.parse_records();
//! assert_eq!(records[0].get("lang"), Some("rust"));
//! # Ok::<(), csv_records::CsvParserError>(())
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod codec;
pub mod decode;
#[cfg(feature = "fast_local")]
mod fast;
mod io;
mod parser;
mod record;

pub use crate::codec::{resolve_encoding, Transcoder};
pub use crate::io::{meta_from_path, SourceMeta, DEFAULT_READ_TIMEOUT};
pub use crate::parser::CsvParser;
pub use crate::record::{Parsed, Record};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Error type returned by every fallible operation of this crate.
#[derive(Debug, Error)]
pub enum CsvParserError {
    #[error("invalid path: {0:?}")]
    InvalidPath(PathBuf),
    #[error("cannot access {path:?}: {source}")]
    InvalidAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("resource is empty")]
    EmptyResource,
    #[error("invalid data type: {0}")]
    InvalidDataType(String),
    #[error("invalid resource: {0}")]
    InvalidResource(#[source] std::io::Error),
    #[error("resource yielded no content")]
    UnreadableResource,
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("read did not finish within {0:?}")]
    ReadTimeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type CsvResult<T> = std::result::Result<T, CsvParserError>;
