//! Page-resident recorder.
//!
//! A `Recorder` owns its listener registrations and the on-page indicator as
//! private session state, so `start`/`stop` fully describe its lifecycle.

pub mod capture;
pub mod throttle;

use crate::dom::{Document, DomEvent, EventKind, ListenerId, NodeId};
use crate::selector::{SynthesisOptions, synthesize_with};
use capture::CaptureError;
use refill_common::CapturedEntry;
use serde::{Deserialize, Serialize};
use throttle::TypingThrottle;
use tracing::{debug, info, warn};

pub const INDICATOR_TAG: &str = "refill-indicator";
pub const STOP_BUTTON_ATTR: &str = "data-refill-stop";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_typing_throttle_ms")]
    pub typing_throttle_ms: u64,
    #[serde(default = "default_click_text_limit")]
    pub click_text_limit: usize,
    #[serde(default = "default_max_ancestor_depth")]
    pub max_ancestor_depth: usize,
    #[serde(default = "default_max_class_names")]
    pub max_class_names: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            typing_throttle_ms: default_typing_throttle_ms(),
            click_text_limit: default_click_text_limit(),
            max_ancestor_depth: default_max_ancestor_depth(),
            max_class_names: default_max_class_names(),
        }
    }
}

impl CaptureConfig {
    pub fn synthesis(&self) -> SynthesisOptions {
        SynthesisOptions {
            max_depth: self.max_ancestor_depth,
            max_class_names: self.max_class_names,
        }
    }
}

fn default_typing_throttle_ms() -> u64 {
    500
}

fn default_click_text_limit() -> usize {
    200
}

fn default_max_ancestor_depth() -> usize {
    crate::selector::DEFAULT_MAX_DEPTH
}

fn default_max_class_names() -> usize {
    crate::selector::DEFAULT_MAX_CLASS_NAMES
}

/// What the recorder made of one event.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderOutcome {
    /// Persist this entry to the active profile.
    Captured(CapturedEntry),
    /// The indicator's stop button was pressed.
    StopRequested,
    Ignored,
}

struct Session {
    profile_name: String,
    listeners: Vec<ListenerId>,
    indicator: Option<NodeId>,
    throttle: TypingThrottle,
}

pub struct Recorder {
    config: CaptureConfig,
    show_indicator: bool,
    session: Option<Session>,
}

impl Recorder {
    pub fn new(config: CaptureConfig, show_indicator: bool) -> Self {
        Self {
            config,
            show_indicator,
            session: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.profile_name.as_str())
    }

    pub fn indicator(&self) -> Option<NodeId> {
        self.session.as_ref().and_then(|s| s.indicator)
    }

    /// Attach capture-phase listeners and render the indicator. Starting an
    /// already recording recorder is a no-op that keeps the current profile.
    pub fn start(&mut self, doc: &mut Document, profile_name: &str) -> bool {
        if let Some(session) = &self.session {
            debug!(
                current = %session.profile_name,
                requested = profile_name,
                "Recorder already running, ignoring start"
            );
            return false;
        }

        let listeners = [EventKind::Click, EventKind::Change, EventKind::Input]
            .into_iter()
            .map(|kind| doc.add_event_listener(kind, true))
            .collect();
        let indicator = self
            .show_indicator
            .then(|| render_indicator(doc, profile_name));

        self.session = Some(Session {
            profile_name: profile_name.to_string(),
            listeners,
            indicator,
            throttle: TypingThrottle::new(self.config.typing_throttle_ms),
        });
        info!(profile = profile_name, url = doc.url(), "Recording started");
        true
    }

    /// Detach listeners and remove the indicator. Returns the profile that was
    /// being recorded; stopping an idle recorder is a no-op.
    pub fn stop(&mut self, doc: &mut Document) -> Option<String> {
        let session = self.session.take()?;
        for id in session.listeners {
            doc.remove_event_listener(id);
        }
        if let Some(indicator) = session.indicator {
            doc.remove(indicator);
        }
        info!(profile = %session.profile_name, "Recording stopped");
        Some(session.profile_name)
    }

    pub fn owns_listener(&self, id: ListenerId) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.listeners.contains(&id))
    }

    /// Handle one event delivered to `listener`. Failures deriving an entry
    /// are logged and reported as `Ignored` so later events still record.
    pub fn handle_event(
        &mut self,
        doc: &Document,
        listener: ListenerId,
        event: &DomEvent,
    ) -> RecorderOutcome {
        if !self.owns_listener(listener) || !event.trusted {
            return RecorderOutcome::Ignored;
        }

        if let Some(indicator) = self.indicator()
            && doc.contains(indicator, event.target)
        {
            let on_stop = doc
                .closest(event.target, |el| el.attr(STOP_BUTTON_ATTR).is_some())
                .is_some();
            return if event.kind == EventKind::Click && on_stop {
                RecorderOutcome::StopRequested
            } else {
                RecorderOutcome::Ignored
            };
        }

        match self.derive(doc, event) {
            Ok(Some(entry)) => {
                debug!(kind = %entry.kind, selector = %entry.selector, "Captured entry");
                RecorderOutcome::Captured(entry)
            }
            Ok(None) => RecorderOutcome::Ignored,
            Err(e) => {
                warn!(event = event.kind.as_str(), "Capture failed: {}", e);
                RecorderOutcome::Ignored
            }
        }
    }

    fn derive(
        &mut self,
        doc: &Document,
        event: &DomEvent,
    ) -> Result<Option<CapturedEntry>, CaptureError> {
        let synthesis = self.config.synthesis();
        match event.kind {
            EventKind::Click => capture::click_entry(
                doc,
                event.target,
                event.time_stamp,
                synthesis,
                self.config.click_text_limit,
            ),
            EventKind::Change => capture::change_entry(doc, event.target, event.time_stamp, synthesis),
            EventKind::Input => {
                if !doc.kind(event.target).accepts_typing() {
                    return Ok(None);
                }
                let selector = synthesize_with(doc, event.target, synthesis);
                let Some(session) = self.session.as_mut() else {
                    return Ok(None);
                };
                if !session.throttle.is_open(&selector, event.time_stamp) {
                    debug!(selector = %selector, at = event.time_stamp, "Typing throttled");
                    return Ok(None);
                }
                let entry =
                    capture::typing_entry(doc, event.target, selector.clone(), event.time_stamp)?;
                session.throttle.mark_persisted(&selector, event.time_stamp);
                Ok(Some(entry))
            }
        }
    }
}

fn render_indicator(doc: &mut Document, profile_name: &str) -> NodeId {
    let bar = doc.create_element(INDICATOR_TAG);
    doc.set_attribute(bar, "data-profile", profile_name);
    doc.set_text(bar, &format!("Recording: {}", profile_name));
    let stop = doc.create_element("button");
    doc.set_attribute(stop, STOP_BUTTON_ATTR, "");
    doc.set_text(stop, "Stop");
    doc.append_child(bar, stop);
    let root = doc.root();
    doc.append_child(root, bar);
    bar
}
