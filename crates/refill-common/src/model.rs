use serde::{Deserialize, Serialize};
use std::fmt;

/// Browser tab identifier. Serialized as a plain number, used as a string key
/// inside the `recordingTabs` registry document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TabId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TabId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "click")]
    Click,
    #[serde(rename = "input-change")]
    InputChange,
    #[serde(rename = "input-typing")]
    InputTyping,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Click => "click",
            EntryKind::InputChange => "input-change",
            EntryKind::InputTyping => "input-typing",
        }
    }

    /// Whether entries of this kind carry form state that replay restores.
    pub fn is_form_state(&self) -> bool {
        matches!(self, EntryKind::InputChange | EntryKind::InputTyping)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured user interaction. Entries are append-only: once persisted
/// they are never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedEntry {
    pub kind: EntryKind,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub page_url: String,
    pub page_title: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl CapturedEntry {
    /// Key used to collapse repeated writes to the same logical target.
    /// Falls back to `kind|name` when the element could not be addressed.
    pub fn target_key(&self) -> String {
        if self.selector.is_empty() {
            format!("{}|{}", self.kind, self.name.as_deref().unwrap_or_default())
        } else {
            self.selector.clone()
        }
    }
}

/// Per-tab registry record. Present iff the tab is recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingState {
    pub profile_name: String,
}
