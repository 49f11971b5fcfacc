//! Page agent: the task that owns one loaded page.
//!
//! The task always exists while a page is loaded and applies simulated user
//! input to its `Document`. The recorder/replayer script is only present once
//! injected; until then coordinator commands are answered with `NoReceiver`.
//!
//! The task never awaits the coordinator inline (the coordinator may itself be
//! waiting on this page). Outbound requests are either spawned or handed back
//! to the caller through `InputReport`.

use crate::coordinator::CoordinatorHandle;
use crate::error::InputError;
use crate::profiles::ProfileStore;
use refill_common::error::MessagingError;
use refill_common::protocol::{
    AgentAction, ApplyReply, CoordinatorAction, Envelope, Origin, RecordingStateReply, Reply,
};
use refill_common::{CapturedEntry, TabId};
use refill_page::{
    CaptureConfig, Document, DomEvent, ElementKind, EventKind, NodeId, Recorder, RecorderOutcome,
    Replayer, synthesize,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub type AgentReply = Result<Reply, MessagingError>;

const INBOX_CAPACITY: usize = 64;

pub enum PageInput {
    Command {
        envelope: Envelope<AgentAction>,
        reply: oneshot::Sender<AgentReply>,
    },
    Inject {
        reply: oneshot::Sender<()>,
    },
    User {
        input: UserInput,
        /// Event time relative to page load; wall-clock elapsed if absent.
        at_ms: Option<u64>,
        reply: oneshot::Sender<Result<InputReport, InputError>>,
    },
    Inspect {
        reply: oneshot::Sender<PageSnapshot>,
    },
    /// Answer to the load-time recording state query, tagged with the command
    /// epoch it was issued in.
    Restore { profile_name: String, epoch: u64 },
}

/// What a user does to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Replace a text field's value, firing one `input` event.
    Type { selector: String, text: String },
    /// Commit a field (blur), firing `change`.
    Commit { selector: String },
    /// Click a checkbox/radio into the given state.
    SetChecked { selector: String, checked: bool },
    /// Pick a `<select>` option.
    Select { selector: String, value: String },
    Click { selector: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputReport {
    pub captured: usize,
    /// The indicator's stop button was pressed; the host must tell the
    /// coordinator with `stopRecordingFromPage`.
    pub stop_requested: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldState {
    pub selector: String,
    pub kind: String,
    pub name: Option<String>,
    pub value: String,
    pub checked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub injected: bool,
    pub recording: Option<String>,
    pub fields: Vec<FieldState>,
}

#[derive(Debug, Clone, Default)]
pub struct PageSettings {
    pub capture: CaptureConfig,
    pub show_indicator: bool,
}

struct ContentScript {
    recorder: Recorder,
    replayer: Replayer,
}

pub struct PageAgent {
    tab: TabId,
    doc: Document,
    settings: PageSettings,
    script: Option<ContentScript>,
    profiles: Arc<ProfileStore>,
    coordinator: CoordinatorHandle,
    inbox: mpsc::WeakSender<PageInput>,
    loaded_at: Instant,
    epoch: u64,
}

impl PageAgent {
    /// Start the page task and return its inbox. The task ends once every
    /// strong sender is dropped.
    pub fn spawn(
        tab: TabId,
        doc: Document,
        settings: PageSettings,
        profiles: Arc<ProfileStore>,
        coordinator: CoordinatorHandle,
        inject: bool,
    ) -> mpsc::Sender<PageInput> {
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let mut agent = Self {
            tab,
            doc,
            settings,
            script: None,
            profiles,
            coordinator,
            inbox: tx.downgrade(),
            loaded_at: Instant::now(),
            epoch: 0,
        };
        if inject {
            agent.inject();
        }
        tokio::spawn(agent.run(rx));
        tx
    }

    async fn run(mut self, mut inbox: mpsc::Receiver<PageInput>) {
        debug!(tab = %self.tab, url = self.doc.url(), "Page loaded");
        while let Some(input) = inbox.recv().await {
            match input {
                PageInput::Command { envelope, reply } => {
                    let response = self.handle_command(envelope).await;
                    let _ = reply.send(response);
                }
                PageInput::Inject { reply } => {
                    self.inject();
                    let _ = reply.send(());
                }
                PageInput::User {
                    input,
                    at_ms,
                    reply,
                } => {
                    let at = at_ms.unwrap_or_else(|| self.now_ms());
                    let _ = reply.send(self.handle_user(input, at).await);
                }
                PageInput::Inspect { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                PageInput::Restore {
                    profile_name,
                    epoch,
                } => self.restore(&profile_name, epoch),
            }
        }
        debug!(tab = %self.tab, "Page unloaded");
    }

    fn now_ms(&self) -> u64 {
        self.loaded_at.elapsed().as_millis() as u64
    }

    /// Load the recorder/replayer and ask the coordinator whether this tab
    /// should be recording.
    fn inject(&mut self) {
        if self.script.is_some() {
            return;
        }
        self.script = Some(ContentScript {
            recorder: Recorder::new(self.settings.capture.clone(), self.settings.show_indicator),
            replayer: Replayer::new(),
        });
        info!(tab = %self.tab, url = self.doc.url(), "Agent injected");

        let tab = self.tab;
        let epoch = self.epoch;
        let coordinator = self.coordinator.clone();
        let inbox = self.inbox.clone();
        tokio::spawn(async move {
            let state = coordinator
                .request(Origin::Tab(tab), CoordinatorAction::GetRecordingStateForTab)
                .await;
            match state {
                Ok(Reply::State(RecordingStateReply {
                    recording: true,
                    profile_name: Some(profile_name),
                })) => {
                    if let Some(inbox) = inbox.upgrade() {
                        let _ = inbox.send(PageInput::Restore { profile_name, epoch }).await;
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(tab = %tab, "Recording state query failed: {}", e),
            }
        });
    }

    /// A command received after the query was issued supersedes its answer.
    fn restore(&mut self, profile_name: &str, epoch: u64) {
        if epoch != self.epoch {
            debug!(tab = %self.tab, "Discarding stale recording state");
            return;
        }
        if let Some(script) = self.script.as_mut() {
            script.recorder.start(&mut self.doc, profile_name);
        }
    }

    async fn handle_command(&mut self, envelope: Envelope<AgentAction>) -> AgentReply {
        let at = self.now_ms();
        let Some(script) = self.script.as_mut() else {
            return Err(MessagingError::NoReceiver(self.tab));
        };
        self.epoch += 1;
        debug!(id = envelope.id, tab = %self.tab, action = envelope.payload.name(), "Agent command");

        match envelope.payload {
            AgentAction::StartRecording(req) => {
                script.recorder.start(&mut self.doc, &req.profile_name);
                Ok(Reply::ok())
            }
            AgentAction::StopRecording => {
                script.recorder.stop(&mut self.doc);
                Ok(Reply::ok())
            }
            AgentAction::ApplyProfile(req) => {
                let entries = match self.profiles.entries(&req.profile_name).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        warn!(profile = %req.profile_name, "Cannot load profile: {}", e);
                        return Ok(Reply::failed(e.to_string()));
                    }
                };
                let report = script.replayer.apply(&mut self.doc, &entries, at);
                info!(
                    tab = %self.tab,
                    profile = %req.profile_name,
                    applied = report.applied,
                    total = report.total,
                    "Profile applied"
                );
                Ok(Reply::Apply(ApplyReply {
                    success: true,
                    applied: report.applied,
                    total: report.total,
                }))
            }
        }
    }

    async fn handle_user(&mut self, input: UserInput, at: u64) -> Result<InputReport, InputError> {
        let events = self.perform(input)?;
        let mut report = InputReport::default();
        for (kind, target) in events {
            self.fire(kind, target, at, &mut report).await;
        }
        Ok(report)
    }

    /// Apply the input's effect on the page and list the events it fires.
    fn perform(&mut self, input: UserInput) -> Result<Vec<(EventKind, NodeId)>, InputError> {
        use EventKind::{Change, Click, Input};

        match input {
            UserInput::Type { selector, text } => {
                let node = self.find(&selector)?;
                if !self.doc.kind(node).accepts_typing() {
                    return Err(InputError::NotEditable(selector));
                }
                self.doc.set_value(node, &text);
                Ok(vec![(Input, node)])
            }
            UserInput::Commit { selector } => {
                let node = self.find(&selector)?;
                if !self.doc.kind(node).is_form_control() {
                    return Err(InputError::NotEditable(selector));
                }
                Ok(vec![(Change, node)])
            }
            UserInput::SetChecked { selector, checked } => {
                let node = self.find(&selector)?;
                match self.doc.kind(node) {
                    ElementKind::Radio if !checked => Err(InputError::NotEditable(selector)),
                    kind if kind.is_toggle() => Ok(self.toggle(node, checked)),
                    _ => Err(InputError::NotEditable(selector)),
                }
            }
            UserInput::Select { selector, value } => {
                let node = self.find(&selector)?;
                if self.doc.kind(node) != ElementKind::Select {
                    return Err(InputError::NotEditable(selector));
                }
                if !self.doc.set_value(node, &value) {
                    return Err(InputError::NoSuchOption { selector, value });
                }
                Ok(vec![(Input, node), (Change, node)])
            }
            UserInput::Click { selector } => {
                let node = self.find(&selector)?;
                match self.doc.kind(node) {
                    ElementKind::Checkbox => {
                        let next = !self.doc.checked(node);
                        Ok(self.toggle(node, next))
                    }
                    ElementKind::Radio => Ok(self.toggle(node, true)),
                    _ => Ok(vec![(Click, node)]),
                }
            }
        }
    }

    fn toggle(&mut self, node: NodeId, checked: bool) -> Vec<(EventKind, NodeId)> {
        if self.doc.checked(node) == checked {
            return vec![(EventKind::Click, node)];
        }
        self.doc.set_checked(node, checked);
        vec![
            (EventKind::Click, node),
            (EventKind::Input, node),
            (EventKind::Change, node),
        ]
    }

    fn find(&self, selector: &str) -> Result<NodeId, InputError> {
        self.doc
            .query_selector(selector)?
            .ok_or_else(|| InputError::NoSuchElement(selector.to_string()))
    }

    async fn fire(&mut self, kind: EventKind, target: NodeId, at: u64, report: &mut InputReport) {
        let event = DomEvent::user(kind, target, at);
        for listener in self.doc.dispatch(event.clone()) {
            let Some(script) = self.script.as_mut() else {
                return;
            };
            match script.recorder.handle_event(&self.doc, listener, &event) {
                RecorderOutcome::Captured(entry) => {
                    if let Some(profile) = script.recorder.profile_name().map(str::to_string) {
                        self.persist(&profile, entry).await;
                        report.captured += 1;
                    }
                }
                RecorderOutcome::StopRequested => {
                    script.recorder.stop(&mut self.doc);
                    report.stop_requested = true;
                    return;
                }
                RecorderOutcome::Ignored => {}
            }
        }
    }

    async fn persist(&self, profile: &str, entry: CapturedEntry) {
        if let Err(e) = self.profiles.append_entry(profile, entry).await {
            warn!(tab = %self.tab, profile, "Failed to persist entry: {}", e);
        }
    }

    fn snapshot(&self) -> PageSnapshot {
        let fields = self
            .doc
            .descendants(self.doc.body())
            .into_iter()
            .filter(|n| self.doc.kind(*n).is_form_control())
            .map(|n| FieldState {
                selector: synthesize(&self.doc, n),
                kind: format!("{:?}", self.doc.kind(n)),
                name: self.doc.attr(n, "name").map(str::to_string),
                value: self.doc.value(n).to_string(),
                checked: self.doc.checked(n),
            })
            .collect();
        PageSnapshot {
            url: self.doc.url().to_string(),
            title: self.doc.title().to_string(),
            injected: self.script.is_some(),
            recording: self
                .script
                .as_ref()
                .and_then(|s| s.recorder.profile_name())
                .map(str::to_string),
            fields,
        }
    }
}
