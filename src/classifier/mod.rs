//! Image classification for task photos.
//!
//! The classifier itself is an opaque capability behind [`Classifier`]; the
//! [`ClassificationGateway`] owns dedup, deadlines and the reduction of raw
//! output into a [`Verdict`].

mod gateway;
pub mod image_prep;
mod remote;
pub mod scripted;
mod types;

pub use gateway::{ClassificationGateway, DEFAULT_CLASSIFY_TIMEOUT};
pub use remote::RemoteClassifier;
pub use scripted::ScriptedClassifier;
pub use types::*;
