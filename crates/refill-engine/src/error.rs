use refill_common::TabId;
use refill_common::error::{MessagingError, StoreError, ValidationError};
use refill_page::dom::SelectorParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Malformed profile data: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures while the coordinator serves a request. They are turned into an
/// `{ok: false, error}` reply, never into a panic of the coordinator task.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Simulated user input that the page could not carry out.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("No element matches '{0}'")]
    NoSuchElement(String),

    #[error(transparent)]
    Selector(#[from] SelectorParseError),

    #[error("Element '{0}' does not accept this input")]
    NotEditable(String),

    #[error("Select '{selector}' has no option '{value}'")]
    NoSuchOption { selector: String, value: String },
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("No tab with id {0}")]
    NoSuchTab(TabId),

    #[error("Page in tab {0} went away")]
    PageGone(TabId),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}
