use super::{Document, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// YAML description of a page:
///
/// ```yaml
/// url: https://example.com/signup
/// title: Sign up
/// body:
///   - tag: form
///     children:
///       - tag: input
///         attrs: { id: email, name: email }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFixture {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Vec<ElementFixture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementFixture {
    pub tag: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub children: Vec<ElementFixture>,
    #[serde(default)]
    pub stops_propagation: bool,
}

impl ElementFixture {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            text: None,
            children: Vec::new(),
            stops_propagation: false,
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn child(mut self, child: ElementFixture) -> Self {
        self.children.push(child);
        self
    }
}

impl PageFixture {
    pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(source)
    }

    /// Build a fresh document. Every load yields the same tree shape, which is
    /// what lets selectors recorded on one load resolve on the next.
    pub fn load(&self, time_origin_ms: u64) -> Document {
        let mut doc = Document::new(&self.url, &self.title, time_origin_ms);
        let body = doc.body();
        for el in &self.body {
            build(&mut doc, body, el);
        }
        doc
    }
}

fn build(doc: &mut Document, parent: NodeId, fixture: &ElementFixture) {
    let node = doc.create_element(&fixture.tag);
    for (name, value) in &fixture.attrs {
        doc.set_attribute(node, name, value);
    }
    if let Some(text) = &fixture.text {
        doc.set_text(node, text);
    }
    doc.set_stops_propagation(node, fixture.stops_propagation);
    doc.append_child(parent, node);
    for child in &fixture.children {
        build(doc, node, child);
    }
    if fixture.tag.eq_ignore_ascii_case("select") {
        doc.init_select(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNUP: &str = r#"
url: https://example.com/signup
title: Sign up
body:
  - tag: form
    children:
      - tag: input
        attrs: { id: email, name: email }
      - tag: select
        attrs: { name: country }
        children:
          - { tag: option, attrs: { value: us }, text: United States }
          - { tag: option, attrs: { value: fr, selected: "" }, text: France }
"#;

    #[test]
    fn loads_yaml_into_a_tree() {
        let doc = PageFixture::from_yaml_str(SIGNUP).unwrap().load(1_000);
        assert_eq!(doc.title(), "Sign up");
        let email = doc.get_element_by_id("email").unwrap();
        assert_eq!(doc.tag(doc.parent(email).unwrap()), Some("form"));
        let country = doc.query_selector("select").unwrap().unwrap();
        assert_eq!(doc.value(country), "fr");
    }
}
