use crate::model::TabId;
use serde::{Deserialize, Serialize};

/// Requests handled by the long-lived coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum CoordinatorAction {
    StartRecordingForActiveTab(ProfileRequest),
    StopRecordingForActiveTab,
    /// Sender-scoped: answered for the tab the request came from.
    GetRecordingStateForTab,
    /// Sender-scoped: the in-page stop button was pressed.
    StopRecordingFromPage,
    ListProfiles,
    DeleteProfile(ProfileRequest),
    ApplyProfileToActiveTab(ProfileRequest),
}

impl CoordinatorAction {
    pub fn name(&self) -> &'static str {
        match self {
            CoordinatorAction::StartRecordingForActiveTab(_) => "startRecordingForActiveTab",
            CoordinatorAction::StopRecordingForActiveTab => "stopRecordingForActiveTab",
            CoordinatorAction::GetRecordingStateForTab => "getRecordingStateForTab",
            CoordinatorAction::StopRecordingFromPage => "stopRecordingFromPage",
            CoordinatorAction::ListProfiles => "listProfiles",
            CoordinatorAction::DeleteProfile(_) => "deleteProfile",
            CoordinatorAction::ApplyProfileToActiveTab(_) => "applyProfileToActiveTab",
        }
    }
}

/// Commands executed by the page agent inside a tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AgentAction {
    StartRecording(ProfileRequest),
    StopRecording,
    ApplyProfile(ProfileRequest),
}

impl AgentAction {
    pub fn name(&self) -> &'static str {
        match self {
            AgentAction::StartRecording(_) => "startRecording",
            AgentAction::StopRecording => "stopRecording",
            AgentAction::ApplyProfile(_) => "applyProfile",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub profile_name: String,
}

impl ProfileRequest {
    pub fn new(profile_name: impl Into<String>) -> Self {
        Self {
            profile_name: profile_name.into(),
        }
    }
}

/// Who sent a request. Sender-scoped actions read the tab from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Popup,
    Tab(TabId),
}

impl Origin {
    pub fn tab(&self) -> Option<TabId> {
        match self {
            Origin::Tab(id) => Some(*id),
            Origin::Popup => None,
        }
    }
}

/// Request with its correlation id. Exactly one reply is produced per id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub id: u64,
    #[serde(flatten)]
    pub payload: T,
}

/// Replies. Variants are distinguished by their required fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    Apply(ApplyReply),
    State(RecordingStateReply),
    Profiles(ProfilesReply),
    Ack(AckReply),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Ack(AckReply {
            ok: true,
            profile_name: None,
            error: None,
        })
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Reply::Ack(AckReply {
            ok: false,
            profile_name: None,
            error: Some(error.into()),
        })
    }

    pub fn is_ok(&self) -> bool {
        match self {
            Reply::Ack(ack) => ack.ok,
            Reply::Apply(apply) => apply.success,
            Reply::State(_) | Reply::Profiles(_) => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStateReply {
    pub recording: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_name: Option<String>,
}

/// `applied < total` reports a partial replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReply {
    pub success: bool,
    pub applied: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilesReply {
    pub profiles: Vec<String>,
}
