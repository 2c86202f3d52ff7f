//! Per-browser cleaning session: identity, timing and task states.

pub mod clock;
mod state;

pub use clock::{format_optional, format_timestamp, Clock, ManualClock, SystemClock};
pub use state::{Session, SessionError, SessionPhase, TaskState, TaskStatus};
