//! Student record lookup and form pre-fill for Docuform.
//!
//! Provides:
//! - [`RecordSource`]: where CSV records come from ([`CsvFileSource`], [`CsvUrlSource`])
//! - [`RecordTable`]: parsed, id-indexed rows
//! - [`RecordDirectory`]: a TTL cache over a source with lookup and search
//! - [`prefill`]: template field values from a record

#![doc = include_str!("../README.md")]

pub mod directory;
pub mod error;
pub mod record;
pub mod source;

pub use directory::{DEFAULT_SEARCH_LIMIT, RecordDirectory};
pub use error::{Error, Result};
pub use record::{RecordTable, StudentRecord, prefill};
pub use source::{CsvFileSource, CsvUrlSource, RecordSource, export_url};
