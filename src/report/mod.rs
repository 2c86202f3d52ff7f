//! Reports: the immutable record of a finished session and its text form.

pub mod codec;
mod types;

pub use codec::{decode, encode, receive_filename, report_filename, sanitize_filename};
pub use types::*;
pub(crate) use types::null_as_default;
