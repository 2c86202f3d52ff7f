//! Room cleaning audits: checklist sessions scored against a task catalog,
//! immutable text reports, and an auditor-gated archive.

pub mod archive;
pub mod audit;
pub mod catalog;
pub mod classifier;
pub mod config;
mod error;
pub mod forward;
pub mod report;
pub mod server;
pub mod session;

pub use error::CleaningAuditError;

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
