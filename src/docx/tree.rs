//! Element tree over the lossless event layer.
//!
//! Parts are addressed through [`Ns`], a handle bound to whatever prefix the
//! part itself declares for a namespace URI, so `ns.q("p")` yields `w:p` for a
//! normal WordprocessingML part and `p` when the namespace is the default one.
//! Attribute names go through `ns.a(..)`, which keeps a prefix in both cases.

use crate::docx::xml::{escape_attr, read_events, unescape_attr, write_events, XmlEvent};
use crate::error::{Result, ReviewError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    /// Comments, CDATA and processing instructions inside the root, kept verbatim.
    Other(XmlEvent),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    /// Raw (escaped) attribute values.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

#[derive(Clone, Debug)]
pub struct XmlTree {
    pub part: String,
    prolog: Vec<XmlEvent>,
    pub root: XmlElement,
    epilog: Vec<XmlEvent>,
}

/// Qualified-name builder for one namespace within one part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ns {
    uri: String,
    prefix: Option<String>,
    /// Prefix for namespaced attributes. Unprefixed attributes belong to no
    /// namespace, so this stays set even when elements use the default one.
    attr_prefix: Option<String>,
    attr_declared: bool,
}

impl Ns {
    /// Resolves the prefix `root` binds to `uri`, preferring `fallback` when no
    /// declaration is present.
    pub fn resolve(root: &XmlElement, uri: &str, fallback: Option<&str>) -> Self {
        let mut element: Option<Option<String>> = None;
        let mut bound: Option<String> = None;
        for (k, v) in &root.attrs {
            if unescape_attr(v) != uri {
                continue;
            }
            if k == "xmlns" {
                if element.is_none() {
                    element = Some(None);
                }
            } else if let Some(p) = k.strip_prefix("xmlns:") {
                if element.is_none() {
                    element = Some(Some(p.to_string()));
                }
                if bound.is_none() {
                    bound = Some(p.to_string());
                }
            }
        }
        let prefix = element.unwrap_or_else(|| fallback.map(str::to_string));
        let (attr_prefix, attr_declared) = match (bound, fallback) {
            (Some(p), _) => (Some(p), true),
            (None, Some(f)) => (Some(free_prefix(root, f)), false),
            (None, None) => (None, true),
        };
        Self {
            uri: uri.to_string(),
            prefix,
            attr_prefix,
            attr_declared,
        }
    }

    pub fn prefixed(prefix: &str) -> Self {
        Self {
            uri: String::new(),
            prefix: Some(prefix.to_string()),
            attr_prefix: Some(prefix.to_string()),
            attr_declared: true,
        }
    }

    pub fn q(&self, local: &str) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{local}"),
            None => local.to_string(),
        }
    }

    /// Qualified attribute name, always prefixed when the namespace has one.
    pub fn a(&self, local: &str) -> String {
        match &self.attr_prefix {
            Some(p) => format!("{p}:{local}"),
            None => local.to_string(),
        }
    }

    /// Binds the attribute prefix on `root` when the part did not declare one.
    pub fn declare_attr_prefix(&self, root: &mut XmlElement) {
        if self.attr_declared {
            return;
        }
        if let Some(p) = &self.attr_prefix {
            root.set_attr(&format!("xmlns:{p}"), &self.uri);
        }
    }

    pub fn is(&self, name: &str, local: &str) -> bool {
        match &self.prefix {
            Some(p) => name
                .strip_prefix(p.as_str())
                .and_then(|rest| rest.strip_prefix(':'))
                == Some(local),
            None => name == local,
        }
    }
}

/// `preferred`, or `preferred` plus a counter when the root already binds that
/// prefix to another namespace.
fn free_prefix(root: &XmlElement, preferred: &str) -> String {
    let taken = |p: &str| root.attrs.iter().any(|(k, _)| k.strip_prefix("xmlns:") == Some(p));
    if !taken(preferred) {
        return preferred.to_string();
    }
    (1..)
        .map(|n| format!("{preferred}{n}"))
        .find(|p| !taken(p))
        .unwrap_or_else(|| preferred.to_string())
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`XmlElement::set_attr`].
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.set_text(text);
        self
    }

    /// Unescaped attribute value.
    pub fn attr(&self, key: &str) -> Option<String> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| unescape_attr(v))
    }

    /// Sets (or adds) an attribute; `value` is unescaped text.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        let escaped = escape_attr(value);
        for (k, v) in self.attrs.iter_mut() {
            if k == key {
                *v = escaped;
                return;
            }
        }
        self.attrs.push((key.to_string(), escaped));
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.name == name)
    }

    /// Returns the named child, creating it at `index` (clamped) when missing.
    pub fn child_or_insert(&mut self, name: &str, index: usize) -> &mut XmlElement {
        let pos = self
            .children
            .iter()
            .position(|c| matches!(c, XmlNode::Element(e) if e.name == name));
        let pos = match pos {
            Some(p) => p,
            None => {
                let at = index.min(self.children.len());
                self.children.insert(at, XmlNode::Element(XmlElement::new(name)));
                at
            }
        };
        match &mut self.children[pos] {
            XmlNode::Element(e) => e,
            _ => unreachable!("position matched an element"),
        }
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn insert(&mut self, index: usize, child: XmlElement) {
        let at = index.min(self.children.len());
        self.children.insert(at, XmlNode::Element(child));
    }

    /// Removes direct children matching `pred`; returns how many were dropped.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&XmlElement) -> bool) -> usize {
        let before = self.children.len();
        self.children
            .retain(|c| !matches!(c, XmlNode::Element(e) if pred(e)));
        before - self.children.len()
    }

    /// All descendants named `name`, in document order (self excluded).
    pub fn descendants(&self, name: &str) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        collect_descendants(self, name, &mut out);
        out
    }

    /// Pre-order mutable visit of every descendant named `name`.
    ///
    /// `f` runs before the visitor descends into the matched element, so
    /// children added by `f` are visited as well.
    pub fn visit_mut(&mut self, name: &str, f: &mut dyn FnMut(&mut XmlElement)) {
        for child in self.children.iter_mut() {
            if let XmlNode::Element(e) = child {
                if e.name == name {
                    f(e);
                }
                e.visit_mut(name, f);
            }
        }
    }

    /// Concatenated direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for c in &self.children {
            match c {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Other(XmlEvent::CData { text }) => out.push_str(text),
                _ => {}
            }
        }
        out
    }

    /// Replaces all children with a single text node (none for empty text).
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        if !text.is_empty() {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Concatenated text of every descendant named `leaf`.
    pub fn leaf_text(&self, leaf: &str) -> String {
        self.descendants(leaf)
            .into_iter()
            .map(|e| e.text())
            .collect()
    }

    fn write_into(&self, out: &mut Vec<XmlEvent>) {
        if self.children.is_empty() {
            out.push(XmlEvent::Empty {
                name: self.name.clone(),
                attrs: self.attrs.clone(),
            });
            return;
        }
        out.push(XmlEvent::Start {
            name: self.name.clone(),
            attrs: self.attrs.clone(),
        });
        for c in &self.children {
            match c {
                XmlNode::Element(e) => e.write_into(out),
                XmlNode::Text(t) => out.push(XmlEvent::Text { text: t.clone() }),
                XmlNode::Other(ev) => out.push(ev.clone()),
            }
        }
        out.push(XmlEvent::End {
            name: self.name.clone(),
        });
    }
}

fn collect_descendants<'a>(el: &'a XmlElement, name: &str, out: &mut Vec<&'a XmlElement>) {
    for c in el.elements() {
        if c.name == name {
            out.push(c);
        }
        collect_descendants(c, name, out);
    }
}

impl XmlTree {
    pub fn parse(part: &str, bytes: &[u8]) -> Result<Self> {
        let events = read_events(part, bytes)?;
        let mut prolog = Vec::new();
        let mut epilog = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut stack: Vec<XmlElement> = Vec::new();

        for ev in events {
            match ev {
                XmlEvent::Start { name, attrs } => {
                    if root.is_some() && stack.is_empty() {
                        return Err(ReviewError::xml(part, "multiple root elements"));
                    }
                    stack.push(XmlElement {
                        name,
                        attrs,
                        children: Vec::new(),
                    });
                }
                XmlEvent::Empty { name, attrs } => {
                    let el = XmlElement {
                        name,
                        attrs,
                        children: Vec::new(),
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(el)),
                        None if root.is_none() => root = Some(el),
                        None => return Err(ReviewError::xml(part, "multiple root elements")),
                    }
                }
                XmlEvent::End { name } => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| ReviewError::xml(part, format!("unexpected </{name}>")))?;
                    if el.name != name {
                        return Err(ReviewError::xml(
                            part,
                            format!("</{name}> closes <{}>", el.name),
                        ));
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(el)),
                        None => root = Some(el),
                    }
                }
                XmlEvent::Text { text } => match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Text(text)),
                    None if root.is_none() => prolog.push(XmlEvent::Text { text }),
                    None => epilog.push(XmlEvent::Text { text }),
                },
                other => match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Other(other)),
                    None if root.is_none() => prolog.push(other),
                    None => epilog.push(other),
                },
            }
        }

        if let Some(open) = stack.last() {
            return Err(ReviewError::xml(part, format!("unclosed <{}>", open.name)));
        }
        let root = root.ok_or_else(|| ReviewError::xml(part, "no root element"))?;
        Ok(Self {
            part: part.to_string(),
            prolog,
            root,
            epilog,
        })
    }

    /// New tree with the standard `standalone="yes"` declaration.
    pub fn new(part: &str, root: XmlElement) -> Self {
        Self {
            part: part.to_string(),
            prolog: vec![XmlEvent::Decl {
                version: "1.0".to_string(),
                encoding: Some("UTF-8".to_string()),
                standalone: Some("yes".to_string()),
            }],
            root,
            epilog: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut events = self.prolog.clone();
        self.root.write_into(&mut events);
        events.extend(self.epilog.iter().cloned());
        write_events(&events)
    }
}
