//! Page-context half of refill: the DOM model the agents operate on, the
//! selector synthesizer, and the synchronous recorder/replayer logic.
//!
//! Nothing in here touches storage or channels; the engine's page agent owns
//! a `Document` plus a `Recorder` and drives them from its message loop.

pub mod dom;
pub mod recorder;
pub mod replayer;
pub mod selector;

pub use dom::{Document, DomEvent, ElementKind, EventKind, ListenerId, NodeId};
pub use recorder::{CaptureConfig, Recorder, RecorderOutcome};
pub use replayer::{ReplayReport, Replayer};
pub use selector::synthesize;
