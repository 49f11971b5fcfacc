//! The popup's controls. Each one maps onto exactly one coordinator action.

use crate::coordinator::CoordinatorHandle;
use refill_common::error::MessagingError;
use refill_common::protocol::{CoordinatorAction, Origin, ProfileRequest, Reply};
use tracing::debug;

#[derive(Clone)]
pub struct Popup {
    coordinator: CoordinatorHandle,
}

impl Popup {
    pub fn new(coordinator: CoordinatorHandle) -> Self {
        Self { coordinator }
    }

    /// Start recording the active tab under `profile_name` (made unique).
    pub async fn start(&self, profile_name: &str) -> Result<Reply, MessagingError> {
        self.send(CoordinatorAction::StartRecordingForActiveTab(
            ProfileRequest::new(profile_name),
        ))
        .await
    }

    pub async fn stop(&self) -> Result<Reply, MessagingError> {
        self.send(CoordinatorAction::StopRecordingForActiveTab).await
    }

    pub async fn apply(&self, profile_name: &str) -> Result<Reply, MessagingError> {
        self.send(CoordinatorAction::ApplyProfileToActiveTab(
            ProfileRequest::new(profile_name),
        ))
        .await
    }

    pub async fn profiles(&self) -> Result<Vec<String>, MessagingError> {
        match self.send(CoordinatorAction::ListProfiles).await? {
            Reply::Profiles(list) => Ok(list.profiles),
            other => Err(MessagingError::UnexpectedReply(format!("{:?}", other))),
        }
    }

    /// Delete after `confirm` approves. `None` means the user declined and
    /// nothing was sent.
    pub async fn delete(
        &self,
        profile_name: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> Result<Option<Reply>, MessagingError> {
        if !confirm(profile_name) {
            debug!(profile = profile_name, "Delete declined");
            return Ok(None);
        }
        self.send(CoordinatorAction::DeleteProfile(ProfileRequest::new(
            profile_name,
        )))
        .await
        .map(Some)
    }

    async fn send(&self, action: CoordinatorAction) -> Result<Reply, MessagingError> {
        self.coordinator.request(Origin::Popup, action).await
    }
}
