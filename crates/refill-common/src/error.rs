use crate::model::TabId;
use thiserror::Error;

/// Durable/ephemeral store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Cross-context delivery failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagingError {
    /// No agent is attached to the tab (or it went away mid-request).
    #[error("No page agent attached to tab {0}")]
    NoReceiver(TabId),

    /// The single injection + retry cycle also failed.
    #[error("Page agent in tab {tab} unreachable for '{action}' after injection retry")]
    Unreachable { tab: TabId, action: String },

    #[error("Agent injection into tab {tab} failed: {reason}")]
    InjectionFailed { tab: TabId, reason: String },

    /// The coordinator task is gone.
    #[error("Coordinator channel closed")]
    CoordinatorClosed,

    #[error("Unexpected reply to '{0}'")]
    UnexpectedReply(String),
}

/// Input rejected before any state mutation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Profile name must not be empty")]
    EmptyProfileName,

    #[error("No active tab")]
    NoActiveTab,

    #[error("Request has no sender tab")]
    NoSenderTab,

    #[error("Profile not found: {0}")]
    UnknownProfile(String),
}
