//! CSS selector subset: type, `#id`, `.class`, `[attr]`, `[attr=value]`,
//! `:nth-of-type(n)`, joined by child (`>`) or descendant combinators.

use super::{Document, NodeId};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid selector '{selector}': {reason}")]
pub struct SelectorParseError {
    pub selector: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Combinator {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrTest {
    Exists(String),
    Equals(String, String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
    nth_of_type: Option<usize>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.nth_of_type.is_none()
    }
}

/// Parsed selector. `parts[i].0` is the combinator linking part `i - 1` to
/// part `i` (ignored for the first part).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    parts: Vec<(Combinator, Compound)>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorParseError> {
        let fail = |reason: &str| SelectorParseError {
            selector: input.to_string(),
            reason: reason.to_string(),
        };

        let mut chars = input.trim().chars().peekable();
        let mut parts = Vec::new();
        let mut pending = Combinator::Descendant;

        loop {
            let compound = parse_compound(&mut chars).map_err(|r| fail(&r))?;
            if compound.is_empty() {
                return Err(fail("expected a simple selector"));
            }
            parts.push((pending, compound));

            let mut saw_space = false;
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
                saw_space = true;
            }
            match chars.peek() {
                None => break,
                Some('>') => {
                    chars.next();
                    while chars.peek().is_some_and(|c| c.is_whitespace()) {
                        chars.next();
                    }
                    pending = Combinator::Child;
                }
                Some(_) if saw_space => pending = Combinator::Descendant,
                Some(c) => return Err(fail(&format!("unexpected character '{}'", c))),
            }
        }

        Ok(Self { parts })
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.matches_at(doc, node, self.parts.len() - 1)
    }

    fn matches_at(&self, doc: &Document, node: NodeId, index: usize) -> bool {
        let (combinator, compound) = &self.parts[index];
        if !matches_compound(doc, node, compound) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|p| self.matches_at(doc, p, index - 1)),
            Combinator::Descendant => {
                std::iter::successors(doc.parent(node), |n| doc.parent(*n))
                    .any(|a| self.matches_at(doc, a, index - 1))
            }
        }
    }
}

fn matches_compound(doc: &Document, node: NodeId, c: &Compound) -> bool {
    let Some(el) = doc.element(node) else {
        return false;
    };
    if let Some(tag) = &c.tag
        && !tag.eq_ignore_ascii_case(&el.tag)
    {
        return false;
    }
    if let Some(id) = &c.id
        && el.attr("id") != Some(id.as_str())
    {
        return false;
    }
    if !c.classes.is_empty() {
        let classes = doc.class_list(node);
        if !c.classes.iter().all(|cls| classes.contains(&cls.as_str())) {
            return false;
        }
    }
    for test in &c.attrs {
        let ok = match test {
            AttrTest::Exists(name) => el.attr(name).is_some(),
            AttrTest::Equals(name, value) => el.attr(name) == Some(value.as_str()),
        };
        if !ok {
            return false;
        }
    }
    if let Some(n) = c.nth_of_type {
        return doc.nth_of_type(node).is_some_and(|(pos, _)| pos == n);
    }
    true
}

fn parse_compound(chars: &mut Peekable<Chars<'_>>) -> Result<Compound, String> {
    let mut compound = Compound::default();

    if chars.peek() == Some(&'*') {
        chars.next();
    } else if chars.peek().is_some_and(|c| is_ident_start(*c)) {
        compound.tag = Some(parse_ident(chars)?.to_ascii_lowercase());
    }

    while let Some(&c) = chars.peek() {
        match c {
            '#' => {
                chars.next();
                compound.id = Some(parse_ident(chars)?);
            }
            '.' => {
                chars.next();
                compound.classes.push(parse_ident(chars)?);
            }
            '[' => {
                chars.next();
                compound.attrs.push(parse_attr(chars)?);
            }
            ':' => {
                chars.next();
                let pseudo = parse_ident(chars)?;
                if pseudo != "nth-of-type" || chars.next() != Some('(') {
                    return Err(format!("unsupported pseudo-class ':{}'", pseudo));
                }
                let digits: String = std::iter::from_fn(|| chars.next_if(|c| *c != ')')).collect();
                if chars.next() != Some(')') {
                    return Err("unterminated :nth-of-type(".into());
                }
                let n = digits
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| format!("invalid :nth-of-type argument '{}'", digits))?;
                compound.nth_of_type = Some(n);
            }
            _ => break,
        }
    }
    Ok(compound)
}

fn parse_attr(chars: &mut Peekable<Chars<'_>>) -> Result<AttrTest, String> {
    skip_ws(chars);
    let name = parse_ident(chars)?;
    skip_ws(chars);
    match chars.next() {
        Some(']') => Ok(AttrTest::Exists(name)),
        Some('=') => {
            skip_ws(chars);
            let value = match chars.peek() {
                Some(&q) if q == '"' || q == '\'' => {
                    chars.next();
                    parse_quoted(chars, q)?
                }
                _ => parse_ident(chars)?,
            };
            skip_ws(chars);
            if chars.next() != Some(']') {
                return Err("expected ']'".into());
            }
            Ok(AttrTest::Equals(name, value))
        }
        _ => Err(format!("malformed attribute selector for '{}'", name)),
    }
}

fn parse_quoted(chars: &mut Peekable<Chars<'_>>, quote: char) -> Result<String, String> {
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err("unterminated string".into()),
            Some(c) if c == quote => return Ok(out),
            Some('\\') => out.push(parse_escape(chars)?),
            Some(c) => out.push(c),
        }
    }
}

fn parse_ident(chars: &mut Peekable<Chars<'_>>) -> Result<String, String> {
    let mut out = String::new();
    while let Some(&c) = chars.peek() {
        if c == '\\' {
            chars.next();
            out.push(parse_escape(chars)?);
        } else if is_ident_char(c) {
            out.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if out.is_empty() {
        return Err("expected identifier".into());
    }
    Ok(out)
}

/// Consume the remainder of a backslash escape (the backslash is already read).
fn parse_escape(chars: &mut Peekable<Chars<'_>>) -> Result<char, String> {
    let mut hex = String::new();
    while hex.len() < 6 && chars.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
        hex.extend(chars.next());
    }
    if hex.is_empty() {
        return chars.next().ok_or_else(|| "dangling escape".to_string());
    }
    if chars.peek() == Some(&' ') {
        chars.next();
    }
    let code = u32::from_str_radix(&hex, 16).map_err(|e| e.to_string())?;
    Ok(char::from_u32(code)
        .filter(|c| *c != '\0')
        .unwrap_or('\u{FFFD}'))
}

fn skip_ws(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || !c.is_ascii()
}

/// `CSS.escape` for identifiers (ids and class names).
pub fn escape_ident(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    for (i, &c) in chars.iter().enumerate() {
        let code = c as u32;
        if c == '\0' {
            out.push('\u{FFFD}');
        } else if (1..=0x1f).contains(&code)
            || code == 0x7f
            || (i == 0 && c.is_ascii_digit())
            || (i == 1 && c.is_ascii_digit() && chars[0] == '-')
        {
            out.push_str(&format!("\\{:x} ", code));
        } else if i == 0 && c == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if is_ident_char(c) {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}

/// Escape a value for use inside a double-quoted attribute selector.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\a "),
            _ => out.push(c),
        }
    }
    out
}
