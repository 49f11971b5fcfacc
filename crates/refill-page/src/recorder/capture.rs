//! Event-to-entry derivation. Each function inspects one event target and
//! returns the entry to persist, `None` when the event is out of policy, or a
//! `CaptureError` that the recorder logs and drops.

use crate::dom::{Document, ElementKind, NodeId};
use crate::selector::{SynthesisOptions, synthesize_with};
use refill_common::{CapturedEntry, EntryKind};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Event target {0:?} is not attached to the document")]
    DetachedTarget(NodeId),
}

fn ensure_attached(doc: &Document, target: NodeId) -> Result<(), CaptureError> {
    if doc.is_connected(target) {
        Ok(())
    } else {
        Err(CaptureError::DetachedTarget(target))
    }
}

fn entry(doc: &Document, kind: EntryKind, selector: String, at_ms: u64) -> CapturedEntry {
    CapturedEntry {
        kind,
        selector,
        name: None,
        value: None,
        checked: None,
        label: None,
        text: None,
        href: None,
        page_url: doc.url().to_string(),
        page_title: doc.title().to_string(),
        timestamp: doc.time_origin_ms() + at_ms,
    }
}

fn name_of(doc: &Document, node: NodeId) -> Option<String> {
    doc.attr(node, "name")
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Clicks on anything but checkboxes/radios (those are captured by `change`).
pub fn click_entry(
    doc: &Document,
    target: NodeId,
    at_ms: u64,
    synthesis: SynthesisOptions,
    text_limit: usize,
) -> Result<Option<CapturedEntry>, CaptureError> {
    ensure_attached(doc, target)?;
    if doc.kind(target).is_toggle() {
        return Ok(None);
    }

    let mut e = entry(doc, EntryKind::Click, synthesize_with(doc, target, synthesis), at_ms);
    e.text = visible_text(doc, target, text_limit);
    e.href = link_href(doc, target);
    Ok(Some(e))
}

/// Committed value changes on input/select/textarea.
pub fn change_entry(
    doc: &Document,
    target: NodeId,
    at_ms: u64,
    synthesis: SynthesisOptions,
) -> Result<Option<CapturedEntry>, CaptureError> {
    ensure_attached(doc, target)?;
    let kind = doc.kind(target);
    if !kind.is_form_control() {
        return Ok(None);
    }

    let mut e = entry(
        doc,
        EntryKind::InputChange,
        synthesize_with(doc, target, synthesis),
        at_ms,
    );
    e.name = name_of(doc, target);
    match kind {
        ElementKind::Checkbox => e.checked = Some(doc.checked(target)),
        _ => e.value = Some(doc.value(target).to_string()),
    }
    e.label = resolve_label(doc, target);
    Ok(Some(e))
}

/// Raw typing on text inputs and textareas. Throttling is applied by the caller.
pub fn typing_entry(
    doc: &Document,
    target: NodeId,
    selector: String,
    at_ms: u64,
) -> Result<CapturedEntry, CaptureError> {
    ensure_attached(doc, target)?;
    let mut e = entry(doc, EntryKind::InputTyping, selector, at_ms);
    e.name = name_of(doc, target);
    e.value = Some(doc.value(target).to_string());
    Ok(e)
}

/// `label[for=<id>]` first, then the nearest enclosing `<label>`.
pub fn resolve_label(doc: &Document, node: NodeId) -> Option<String> {
    let by_for = doc
        .attr(node, "id")
        .filter(|id| !id.is_empty())
        .and_then(|id| {
            doc.descendants(doc.root())
                .into_iter()
                .find(|n| doc.tag(*n) == Some("label") && doc.attr(*n, "for") == Some(id))
        });
    let label = by_for.or_else(|| doc.closest(node, |el| el.tag == "label"))?;
    let text = doc.text_content(label).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn visible_text(doc: &Document, node: NodeId, limit: usize) -> Option<String> {
    let text = doc.text_content(node);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(limit).collect())
}

/// Absolute address of the closest `a[href]`, resolved against the page URL.
fn link_href(doc: &Document, node: NodeId) -> Option<String> {
    let anchor = doc.closest(node, |el| el.tag == "a" && el.attr("href").is_some())?;
    let raw = doc.attr(anchor, "href")?;
    match url::Url::parse(doc.url()).and_then(|base| base.join(raw)) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(_) => Some(raw.to_string()),
    }
}
