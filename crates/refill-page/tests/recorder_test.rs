use refill_common::{CapturedEntry, EntryKind};
use refill_page::dom::{ElementFixture, PageFixture};
use refill_page::recorder::{INDICATOR_TAG, STOP_BUTTON_ATTR};
use refill_page::{CaptureConfig, Document, DomEvent, EventKind, NodeId, Recorder, RecorderOutcome};

const ORIGIN: u64 = 1_700_000_000_000;

fn signup_page() -> Document {
    PageFixture {
        url: "https://example.com/signup".into(),
        title: "Sign up".into(),
        body: vec![
            ElementFixture::new("form")
                .child(ElementFixture::new("input").attr("id", "email").attr("name", "email"))
                .child(
                    ElementFixture::new("input")
                        .attr("type", "password")
                        .attr("name", "password"),
                )
                .child(
                    ElementFixture::new("label").text("Remember me").child(
                        ElementFixture::new("input")
                            .attr("type", "checkbox")
                            .attr("name", "remember"),
                    ),
                )
                .child(ElementFixture::new("button").text("Create account")),
        ],
    }
    .load(ORIGIN)
}

/// Dispatch a trusted event and feed every listener hit to the recorder.
fn fire(doc: &mut Document, rec: &mut Recorder, kind: EventKind, target: NodeId, at: u64) -> Vec<RecorderOutcome> {
    let event = DomEvent::user(kind, target, at);
    let listeners = doc.dispatch(event.clone());
    listeners
        .into_iter()
        .map(|l| rec.handle_event(doc, l, &event))
        .filter(|o| *o != RecorderOutcome::Ignored)
        .collect()
}

fn captured(outcomes: Vec<RecorderOutcome>) -> Vec<CapturedEntry> {
    outcomes
        .into_iter()
        .filter_map(|o| match o {
            RecorderOutcome::Captured(e) => Some(e),
            _ => None,
        })
        .collect()
}

fn type_into(doc: &mut Document, rec: &mut Recorder, target: NodeId, text: &str, at: u64) -> Vec<CapturedEntry> {
    doc.set_value(target, text);
    captured(fire(doc, rec, EventKind::Input, target, at))
}

#[test]
fn start_and_stop_manage_listeners_and_indicator() {
    let mut doc = signup_page();
    let mut rec = Recorder::new(CaptureConfig::default(), true);

    assert!(rec.start(&mut doc, "signup"));
    assert_eq!(doc.listener_count(), 3);
    let indicator = rec.indicator().unwrap();
    assert_eq!(doc.tag(indicator), Some(INDICATOR_TAG));
    assert_eq!(doc.parent(indicator), Some(doc.root()));
    assert!(!doc.contains(doc.body(), indicator));

    assert!(!rec.start(&mut doc, "other"));
    assert_eq!(rec.profile_name(), Some("signup"));
    assert_eq!(doc.listener_count(), 3);

    assert_eq!(rec.stop(&mut doc), Some("signup".to_string()));
    assert_eq!(doc.listener_count(), 0);
    assert!(doc.query_selector(INDICATOR_TAG).unwrap().is_none());
    assert_eq!(rec.stop(&mut doc), None);
}

#[test]
fn typing_is_throttled_per_selector() {
    let mut doc = signup_page();
    let mut rec = Recorder::new(CaptureConfig::default(), false);
    rec.start(&mut doc, "signup");
    let email = doc.get_element_by_id("email").unwrap();

    let mut entries = Vec::new();
    for (text, at) in [("a", 0), ("ab", 100), ("abc", 200), ("abcd", 600)] {
        entries.extend(type_into(&mut doc, &mut rec, email, text, at));
    }

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.kind == EntryKind::InputTyping));
    assert_eq!(entries[0].timestamp, ORIGIN);
    assert_eq!(entries[0].value.as_deref(), Some("a"));
    assert_eq!(entries[1].timestamp, ORIGIN + 600);
    assert_eq!(entries[1].value.as_deref(), Some("abcd"));
    assert_eq!(entries[1].name.as_deref(), Some("email"));
}

#[test]
fn checkboxes_record_on_change_not_click() {
    let mut doc = signup_page();
    let mut rec = Recorder::new(CaptureConfig::default(), true);
    rec.start(&mut doc, "signup");
    let remember = doc.query_selector("input[type=checkbox]").unwrap().unwrap();

    doc.set_checked(remember, true);
    assert!(captured(fire(&mut doc, &mut rec, EventKind::Click, remember, 10)).is_empty());
    let entries = captured(fire(&mut doc, &mut rec, EventKind::Change, remember, 10));

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, EntryKind::InputChange);
    assert_eq!(entries[0].checked, Some(true));
    assert_eq!(entries[0].value, None);
    assert_eq!(entries[0].label.as_deref(), Some("Remember me"));
}

#[test]
fn capture_listeners_see_events_the_page_stops() {
    let mut doc = PageFixture {
        url: "https://example.com/".into(),
        title: String::new(),
        body: vec![ElementFixture::new("div").attr("class", "modal").child(
            ElementFixture::new("button").text("Continue"),
        )],
    }
    .load(0);
    let div = doc.query_selector("div.modal").unwrap().unwrap();
    doc.set_stops_propagation(div, true);
    let mut rec = Recorder::new(CaptureConfig::default(), false);
    rec.start(&mut doc, "p");

    let button = doc.query_selector("button").unwrap().unwrap();
    let entries = captured(fire(&mut doc, &mut rec, EventKind::Click, button, 5));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].text.as_deref(), Some("Continue"));
    assert_eq!(entries[0].selector, "body>div.modal>button");
}

#[test]
fn synthetic_events_are_not_recorded() {
    let mut doc = signup_page();
    let mut rec = Recorder::new(CaptureConfig::default(), false);
    rec.start(&mut doc, "signup");
    let email = doc.get_element_by_id("email").unwrap();
    doc.set_value(email, "x");

    let event = DomEvent::synthetic(EventKind::Change, email, 0);
    for listener in doc.dispatch(event.clone()) {
        assert_eq!(rec.handle_event(&doc, listener, &event), RecorderOutcome::Ignored);
    }
}

#[test]
fn indicator_stop_button_requests_stop() {
    let mut doc = signup_page();
    let mut rec = Recorder::new(CaptureConfig::default(), true);
    rec.start(&mut doc, "signup");
    let indicator = rec.indicator().unwrap();
    let stop = doc
        .query_selector(&format!("{}>button[{}]", INDICATOR_TAG, STOP_BUTTON_ATTR))
        .unwrap()
        .unwrap();

    assert!(fire(&mut doc, &mut rec, EventKind::Click, indicator, 1).is_empty());
    assert_eq!(
        fire(&mut doc, &mut rec, EventKind::Click, stop, 2),
        vec![RecorderOutcome::StopRequested]
    );
}

#[test]
fn stopped_recorder_captures_nothing() {
    let mut doc = signup_page();
    let mut rec = Recorder::new(CaptureConfig::default(), false);
    rec.start(&mut doc, "signup");
    rec.stop(&mut doc);

    let email = doc.get_element_by_id("email").unwrap();
    assert!(type_into(&mut doc, &mut rec, email, "late", 0).is_empty());
}

#[test]
fn failed_capture_does_not_open_a_throttle_window() {
    let mut doc = signup_page();
    let mut rec = Recorder::new(CaptureConfig::default(), false);
    rec.start(&mut doc, "signup");
    let form = doc.query_selector("form").unwrap().unwrap();
    let email = doc.get_element_by_id("email").unwrap();

    doc.remove(email);
    assert!(type_into(&mut doc, &mut rec, email, "a", 0).is_empty());

    doc.append_child(form, email);
    let entries = type_into(&mut doc, &mut rec, email, "ab", 100);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value.as_deref(), Some("ab"));
    assert!(type_into(&mut doc, &mut rec, email, "abc", 200).is_empty());
}
