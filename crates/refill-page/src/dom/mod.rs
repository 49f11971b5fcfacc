//! Minimal in-memory DOM.
//!
//! Nodes live in an arena indexed by `NodeId`; removed nodes keep their slot
//! but are detached from the tree. Only element nodes exist: an element's own
//! text stands in for its text children.

pub mod fixture;
pub mod kind;
pub mod query;

pub use fixture::{ElementFixture, PageFixture};
pub use kind::ElementKind;
pub use query::{Selector, SelectorParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Click,
    Input,
    Change,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::Input => "input",
            EventKind::Change => "change",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: NodeId,
    /// Milliseconds since the document's time origin.
    pub time_stamp: u64,
    /// False for events synthesized by script (replay).
    pub trusted: bool,
    pub bubbles: bool,
}

impl DomEvent {
    pub fn user(kind: EventKind, target: NodeId, time_stamp: u64) -> Self {
        Self {
            kind,
            target,
            time_stamp,
            trusted: true,
            bubbles: true,
        }
    }

    pub fn synthetic(kind: EventKind, target: NodeId, time_stamp: u64) -> Self {
        Self {
            kind,
            target,
            time_stamp,
            trusted: false,
            bubbles: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Listener {
    id: ListenerId,
    kind: EventKind,
    capture: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Page script on this element calls `stopPropagation()` for every event.
    pub stops_propagation: bool,
    value: String,
    checked: bool,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    url: String,
    title: String,
    time_origin_ms: u64,
    nodes: Vec<Element>,
    root: NodeId,
    body: NodeId,
    listeners: Vec<Listener>,
    next_listener: u64,
    dispatched: Vec<DomEvent>,
}

impl Document {
    /// Empty `<html><body></body></html>` document.
    pub fn new(url: impl Into<String>, title: impl Into<String>, time_origin_ms: u64) -> Self {
        let mut doc = Self {
            url: url.into(),
            title: title.into(),
            time_origin_ms,
            nodes: vec![Element::new("html")],
            root: NodeId(0),
            body: NodeId(0),
            listeners: Vec::new(),
            next_listener: 1,
            dispatched: Vec::new(),
        };
        let body = doc.create_element("body");
        doc.append_child(doc.root, body);
        doc.body = body;
        doc
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn time_origin_ms(&self) -> u64 {
        self.time_origin_ms
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    // ---- tree construction ----

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Element::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Detach `node` (and its subtree) from the tree.
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes.get_mut(node.0).and_then(|n| n.parent.take()) {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let el = &mut self.nodes[node.0];
        match el.attributes.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => el.attributes.push((name.to_string(), value.to_string())),
        }
        match name {
            "value" if el.tag != "select" => el.value = value.to_string(),
            "checked" => el.checked = true,
            _ => {}
        }
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.nodes[node.0].text = text.to_string();
    }

    pub fn set_stops_propagation(&mut self, node: NodeId, stops: bool) {
        self.nodes[node.0].stops_propagation = stops;
    }

    /// Initialise a `<select>` value from its options once they are attached.
    pub fn init_select(&mut self, select: NodeId) {
        let options = self.option_values(select);
        let selected = self.nodes[select.0]
            .children
            .iter()
            .find(|c| self.nodes[c.0].attr("selected").is_some())
            .map(|c| self.option_value(*c));
        self.nodes[select.0].value = selected
            .or_else(|| options.first().cloned())
            .unwrap_or_default();
    }

    // ---- tree inspection ----

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.tag.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node).and_then(|e| e.attr(name))
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.element(node).and_then(|e| e.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.element(node).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn class_list(&self, node: NodeId) -> Vec<&str> {
        self.attr(node, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn kind(&self, node: NodeId) -> ElementKind {
        match self.element(node) {
            Some(el) => ElementKind::classify(&el.tag, el.attr("type")),
            None => ElementKind::Other,
        }
    }

    /// Attached to the document tree (the root counts as connected).
    pub fn is_connected(&self, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    /// 1-based position among same-tag siblings, and the count of such siblings.
    pub fn nth_of_type(&self, node: NodeId) -> Option<(usize, usize)> {
        let tag = self.tag(node)?;
        let parent = self.parent(node)?;
        let same: Vec<NodeId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|c| self.tag(*c) == Some(tag))
            .collect();
        let pos = same.iter().position(|c| *c == node)?;
        Some((pos + 1, same.len()))
    }

    /// Concatenated text of the node and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        if let Some(el) = self.element(node) {
            if !el.text.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(&el.text);
            }
            for child in &el.children {
                self.collect_text(*child, out);
            }
        }
    }

    /// Nearest inclusive ancestor satisfying `pred`.
    pub fn closest(&self, node: NodeId, pred: impl Fn(&Element) -> bool) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            let el = self.element(id)?;
            if pred(el) {
                return Some(id);
            }
            current = el.parent;
        }
        None
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        std::iter::successors(Some(node), |n| self.parent(*n)).any(|n| n == ancestor)
    }

    /// Connected elements in document (pre-)order.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, SelectorParseError> {
        let parsed = Selector::parse(selector)?;
        Ok(self
            .descendants(self.root)
            .into_iter()
            .find(|n| parsed.matches(self, *n)))
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorParseError> {
        let parsed = Selector::parse(selector)?;
        Ok(self
            .descendants(self.root)
            .into_iter()
            .filter(|n| parsed.matches(self, *n))
            .collect())
    }

    // ---- form state ----

    pub fn value(&self, node: NodeId) -> &str {
        self.element(node).map(|e| e.value.as_str()).unwrap_or("")
    }

    pub fn checked(&self, node: NodeId) -> bool {
        self.element(node).is_some_and(|e| e.checked)
    }

    /// Set the live value. A `<select>` only accepts one of its option values.
    pub fn set_value(&mut self, node: NodeId, value: &str) -> bool {
        if self.tag(node) == Some("select") && !self.option_values(node).iter().any(|v| v == value)
        {
            return false;
        }
        match self.nodes.get_mut(node.0) {
            Some(el) => {
                el.value = value.to_string();
                true
            }
            None => false,
        }
    }

    /// Set checkedness. Checking a radio unchecks the rest of its group.
    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if checked && self.kind(node) == ElementKind::Radio {
            for other in self.radio_group(node) {
                self.nodes[other.0].checked = false;
            }
        }
        if let Some(el) = self.nodes.get_mut(node.0) {
            el.checked = checked;
        }
    }

    /// Radios sharing `node`'s name, `node` included.
    pub fn radio_group(&self, node: NodeId) -> Vec<NodeId> {
        let Some(name) = self.attr(node, "name") else {
            return vec![node];
        };
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.kind(*n) == ElementKind::Radio && self.attr(*n, "name") == Some(name))
            .collect()
    }

    fn option_value(&self, option: NodeId) -> String {
        self.attr(option, "value")
            .map(str::to_string)
            .unwrap_or_else(|| self.text_content(option).trim().to_string())
    }

    fn option_values(&self, select: NodeId) -> Vec<String> {
        self.children(select)
            .iter()
            .filter(|c| self.tag(**c) == Some("option"))
            .map(|c| self.option_value(*c))
            .collect()
    }

    // ---- events ----

    pub fn add_event_listener(&mut self, kind: EventKind, capture: bool) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push(Listener { id, kind, capture });
        id
    }

    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        before != self.listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Dispatch `event` and return the document-level listeners that observe
    /// it, capture listeners first. Bubble listeners are skipped when an
    /// element on the path stops propagation.
    pub fn dispatch(&mut self, event: DomEvent) -> Vec<ListenerId> {
        let stopped = self
            .closest(event.target, |el| el.stops_propagation)
            .is_some();
        let mut order: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|l| l.kind == event.kind && l.capture)
            .map(|l| l.id)
            .collect();
        if event.bubbles && !stopped {
            order.extend(
                self.listeners
                    .iter()
                    .filter(|l| l.kind == event.kind && !l.capture)
                    .map(|l| l.id),
            );
        }
        self.dispatched.push(event);
        order
    }

    pub fn dispatched_events(&self) -> &[DomEvent] {
        &self.dispatched
    }

    /// Synthetic (untrusted) events dispatched so far.
    pub fn synthetic_events(&self) -> impl Iterator<Item = &DomEvent> {
        self.dispatched.iter().filter(|e| !e.trusted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_doc() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new("https://example.com/", "t", 0);
        let form = doc.create_element("form");
        doc.append_child(doc.body(), form);
        let a = doc.create_element("input");
        doc.set_attribute(a, "type", "radio");
        doc.set_attribute(a, "name", "plan");
        doc.set_attribute(a, "value", "free");
        doc.append_child(form, a);
        let b = doc.create_element("input");
        doc.set_attribute(b, "type", "radio");
        doc.set_attribute(b, "name", "plan");
        doc.set_attribute(b, "value", "pro");
        doc.append_child(form, b);
        (doc, a, b)
    }

    #[test]
    fn checking_a_radio_clears_its_group() {
        let (mut doc, a, b) = form_doc();
        doc.set_checked(a, true);
        doc.set_checked(b, true);
        assert!(!doc.checked(a));
        assert!(doc.checked(b));
    }

    #[test]
    fn nth_of_type_counts_same_tag_siblings() {
        let (doc, a, b) = form_doc();
        assert_eq!(doc.nth_of_type(a), Some((1, 2)));
        assert_eq!(doc.nth_of_type(b), Some((2, 2)));
    }

    #[test]
    fn capture_listeners_survive_stop_propagation() {
        let (mut doc, a, _) = form_doc();
        doc.set_stops_propagation(a, true);
        let capture = doc.add_event_listener(EventKind::Click, true);
        let bubble = doc.add_event_listener(EventKind::Click, false);
        let seen = doc.dispatch(DomEvent::user(EventKind::Click, a, 5));
        assert_eq!(seen, vec![capture]);
        assert!(doc.remove_event_listener(bubble));
        assert_eq!(doc.listener_count(), 1);
    }

    #[test]
    fn removed_nodes_are_disconnected() {
        let (mut doc, a, _) = form_doc();
        assert!(doc.is_connected(a));
        doc.remove(a);
        assert!(!doc.is_connected(a));
        assert_eq!(doc.query_selector("input").unwrap().map(|n| doc.value(n)), Some("pro"));
    }
}
