//! Selector synthesis: map an element to an address string that survives a
//! reload of the same page.
//!
//! Policy, in order:
//! 1. An element with an id is addressed as `#<escaped id>`.
//! 2. Otherwise walk up at most `max_depth` ancestors (stopping below the
//!    document root), one segment per level:
//!    `tag[name="…"].class1.class2:nth-of-type(k)`, where `:nth-of-type` only
//!    appears if the parent has several children with that tag. Segments are
//!    joined root-to-leaf with `>`.
//! 3. With no segments, the bare tag name.
//!
//! The result is deterministic for a fixed DOM shape but not guaranteed to be
//! unique. An empty string means the element cannot be addressed.

use crate::dom::query::{escape_ident, escape_string};
use crate::dom::{Document, NodeId};

pub const DEFAULT_MAX_DEPTH: usize = 5;
pub const DEFAULT_MAX_CLASS_NAMES: usize = 2;

#[derive(Debug, Clone, Copy)]
pub struct SynthesisOptions {
    pub max_depth: usize,
    pub max_class_names: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_class_names: DEFAULT_MAX_CLASS_NAMES,
        }
    }
}

/// Synthesize with default options.
pub fn synthesize(doc: &Document, node: NodeId) -> String {
    synthesize_with(doc, node, SynthesisOptions::default())
}

pub fn synthesize_with(doc: &Document, node: NodeId, options: SynthesisOptions) -> String {
    let Some(tag) = doc.tag(node) else {
        return String::new();
    };

    if let Some(id) = doc.attr(node, "id")
        && !id.is_empty()
    {
        return format!("#{}", escape_ident(id));
    }

    let mut segments = Vec::new();
    let mut current = Some(node);
    while let Some(el) = current {
        if el == doc.root() || segments.len() >= options.max_depth {
            break;
        }
        match segment(doc, el, options.max_class_names) {
            Some(seg) => segments.push(seg),
            None => break,
        }
        current = doc.parent(el);
    }

    if segments.is_empty() {
        return tag.to_string();
    }
    segments.reverse();
    segments.join(">")
}

fn segment(doc: &Document, node: NodeId, max_classes: usize) -> Option<String> {
    let mut seg = doc.tag(node)?.to_string();

    if let Some(name) = doc.attr(node, "name")
        && !name.is_empty()
    {
        seg.push_str(&format!("[name=\"{}\"]", escape_string(name)));
    }

    for class in doc.class_list(node).into_iter().take(max_classes) {
        seg.push('.');
        seg.push_str(&escape_ident(class));
    }

    if let Some((pos, count)) = doc.nth_of_type(node)
        && count > 1
    {
        seg.push_str(&format!(":nth-of-type({})", pos));
    }

    Some(seg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{ElementFixture, PageFixture};

    fn page(body: Vec<ElementFixture>) -> Document {
        PageFixture {
            url: "https://example.com/".into(),
            title: String::new(),
            body,
        }
        .load(0)
    }

    #[test]
    fn id_short_circuits() {
        let doc = page(vec![
            ElementFixture::new("div").child(ElementFixture::new("input").attr("id", "2fa code")),
        ]);
        let input = doc.query_selector("input").unwrap().unwrap();
        let sel = synthesize(&doc, input);
        assert_eq!(sel, "#\\32 fa\\ code");
        assert_eq!(doc.query_selector(&sel).unwrap(), Some(input));
    }

    #[test]
    fn path_uses_name_classes_and_nth_of_type() {
        let doc = page(vec![
            ElementFixture::new("form")
                .attr("class", "signup card wide")
                .child(ElementFixture::new("input").attr("name", "first"))
                .child(ElementFixture::new("input").attr("name", "last"))
                .child(ElementFixture::new("textarea")),
        ]);
        let last = doc.query_selector_all("input").unwrap()[1];
        assert_eq!(
            synthesize(&doc, last),
            r#"body>form.signup.card>input[name="last"]:nth-of-type(2)"#
        );
        let textarea = doc.query_selector("textarea").unwrap().unwrap();
        assert_eq!(synthesize(&doc, textarea), "body>form.signup.card>textarea");
    }

    #[test]
    fn depth_is_capped() {
        let mut deep = ElementFixture::new("input");
        for _ in 0..7 {
            deep = ElementFixture::new("div").child(deep);
        }
        let doc = page(vec![deep]);
        let input = doc.query_selector("input").unwrap().unwrap();
        let sel = synthesize(&doc, input);
        assert_eq!(sel, "div>div>div>div>input");
        assert_eq!(doc.query_selector(&sel).unwrap(), Some(input));
    }

    #[test]
    fn synthesized_paths_resolve_on_a_fresh_load() {
        let body = vec![
            ElementFixture::new("div")
                .child(ElementFixture::new("input").attr("type", "checkbox"))
                .child(ElementFixture::new("input").attr("type", "checkbox")),
        ];
        let first = page(body.clone());
        let node = first.query_selector_all("input").unwrap()[1];
        let sel = synthesize(&first, node);

        let second = page(body);
        let found = second.query_selector(&sel).unwrap().unwrap();
        assert_eq!(second.nth_of_type(found), Some((2, 2)));
    }

    #[test]
    fn unknown_nodes_are_unaddressable() {
        let doc = page(vec![]);
        assert_eq!(synthesize(&doc, NodeId(999)), "");
        assert_eq!(synthesize(&doc, doc.root()), "html");
    }
}
