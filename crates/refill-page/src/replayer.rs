//! Replay a profile's form state onto a live document.
//!
//! Only `input-change`/`input-typing` entries are replayed, collapsed to the
//! latest entry per target. Each target is resolved and applied
//! independently; failures are counted, never fatal.

use crate::dom::query::escape_string;
use crate::dom::{Document, DomEvent, ElementKind, EventKind, NodeId};
use refill_common::CapturedEntry;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("No element matches '{0}'")]
    Unresolved(String),
    #[error("Element kind {0:?} cannot be filled")]
    Unsupported(ElementKind),
    #[error("Entry for '{0}' carries no value for this element")]
    MissingState(String),
    #[error("Select has no option '{0}'")]
    NoSuchOption(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    pub applied: usize,
    pub total: usize,
    /// Targets whose state actually changed (and got input/change events).
    pub changed: usize,
}

impl ReplayReport {
    pub fn is_partial(&self) -> bool {
        self.applied < self.total
    }
}

/// Collapse entries to the latest form-state entry per target key, ordered by
/// the winning entry's timestamp so that later choices are applied last (a
/// radio picked last stays checked). Ties on timestamp go to the later entry.
pub fn latest_wins(entries: &[CapturedEntry]) -> Vec<CapturedEntry> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<CapturedEntry> = Vec::new();
    for entry in entries.iter().filter(|e| e.kind.is_form_state()) {
        let key = entry.target_key();
        match index.get(&key) {
            Some(&i) => {
                if entry.timestamp >= out[i].timestamp {
                    out[i] = entry.clone();
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(entry.clone());
            }
        }
    }
    out.sort_by_key(|e| e.timestamp);
    out
}

#[derive(Debug, Default)]
pub struct Replayer;

impl Replayer {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, doc: &mut Document, entries: &[CapturedEntry], at_ms: u64) -> ReplayReport {
        let targets = latest_wins(entries);
        let mut report = ReplayReport {
            total: targets.len(),
            ..Default::default()
        };

        for entry in &targets {
            let outcome = resolve(doc, entry)
                .ok_or_else(|| ReplayError::Unresolved(entry.target_key()))
                .and_then(|node| apply_entry(doc, node, entry, at_ms));
            match outcome {
                Ok(changed) => {
                    report.applied += 1;
                    if changed {
                        report.changed += 1;
                    }
                }
                Err(e) => debug!(selector = %entry.selector, "Skipping replay target: {}", e),
            }
        }
        report
    }
}

/// Stored selector first; then, if a name was recorded, the radio with the
/// recorded value in that group, or any element with that name.
pub fn resolve(doc: &Document, entry: &CapturedEntry) -> Option<NodeId> {
    if !entry.selector.is_empty() {
        match doc.query_selector(&entry.selector) {
            Ok(Some(node)) => return Some(node),
            Ok(None) => {}
            Err(e) => warn!("Stored selector unusable: {}", e),
        }
    }

    let name = entry.name.as_deref()?;
    let escaped = escape_string(name);
    let radios = doc
        .query_selector_all(&format!("input[type=radio][name=\"{}\"]", escaped))
        .ok()?;
    if !radios.is_empty() {
        let wanted = entry.value.as_deref()?;
        return radios.into_iter().find(|r| doc.value(*r) == wanted);
    }
    doc.query_selector(&format!("[name=\"{}\"]", escaped))
        .ok()
        .flatten()
}

/// Set the desired state; dispatch bubbling `input` then `change` only if the
/// state differed. Returns whether anything changed.
fn apply_entry(
    doc: &mut Document,
    node: NodeId,
    entry: &CapturedEntry,
    at_ms: u64,
) -> Result<bool, ReplayError> {
    let missing = || ReplayError::MissingState(entry.target_key());
    match doc.kind(node) {
        kind @ (ElementKind::Checkbox | ElementKind::Radio) => {
            let desired = match (kind, entry.checked) {
                (_, Some(checked)) => checked,
                (ElementKind::Radio, None) => true,
                _ => return Err(missing()),
            };
            if doc.checked(node) == desired {
                return Ok(false);
            }
            doc.set_checked(node, desired);
        }
        ElementKind::TextInput | ElementKind::TextArea | ElementKind::Select => {
            let desired = entry.value.as_deref().ok_or_else(missing)?;
            if doc.value(node) == desired {
                return Ok(false);
            }
            if !doc.set_value(node, desired) {
                return Err(ReplayError::NoSuchOption(desired.to_string()));
            }
        }
        kind @ ElementKind::Other => return Err(ReplayError::Unsupported(kind)),
    }

    doc.dispatch(DomEvent::synthetic(EventKind::Input, node, at_ms));
    doc.dispatch(DomEvent::synthetic(EventKind::Change, node, at_ms));
    Ok(true)
}
