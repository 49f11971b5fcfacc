pub mod error;
pub mod model;
pub mod naming;
pub mod protocol;

pub use model::{CapturedEntry, EntryKind, RecordingState, TabId};
