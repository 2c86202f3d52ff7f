//! The room-cleaning checklist.
//!
//! The catalog is a fixed, ordered list of tasks loaded from TOML. The
//! default list is compiled into the binary; a deployment can point
//! `catalog_path` at its own file.
//!
//! # Example
//!
//! ```ignore
//! use cleaning_audit::catalog::default_catalog;
//!
//! let catalog = default_catalog();
//! for task in catalog.tasks() {
//!     println!("{}. {} ({} pts)", task.order, task.label, task.weight);
//! }
//! ```

mod loader;
mod types;

pub use loader::{default_catalog, load_catalog};
pub use types::*;
