//! Report archive.
//!
//! Provides two storage backends:
//! - `FsReportStore` - One `.txt` file per report in a flat directory
//! - `MemoryReportStore` - In-process map, for tests and ephemeral runs

mod store;
mod types;

pub use store::{validate_name, FsReportStore, MemoryReportStore, ReportStore};
pub use types::*;
