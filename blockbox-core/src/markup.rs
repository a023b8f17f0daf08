//! Minimal element tree shared by the renderer and the client runtime.
//!
//! Rendered output is built as a tree so preview, server render and the
//! runtime binder all see the same structure; [`Element::to_html`] is the
//! only serializer.

use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Escaped on output
    Text(String),
    /// Trusted inner content (already-rendered block HTML), emitted verbatim
    Raw(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub classes: Vec<String>,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            classes: Vec::new(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for class in classes {
            self.add_class(class);
        }
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn with_raw(mut self, html: impl Into<String>) -> Self {
        self.children.push(Node::Raw(html.into()));
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !class.is_empty() && !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(n, _)| n != name);
    }

    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First element (self included, depth-first) carrying `class`.
    pub fn find_by_class(&self, class: &str) -> Option<&Element> {
        if self.has_class(class) {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find_by_class(class))
    }

    pub fn find_by_class_mut(&mut self, class: &str) -> Option<&mut Element> {
        if self.has_class(class) {
            return Some(self);
        }
        for child in self.children.iter_mut() {
            if let Node::Element(e) = child {
                if let Some(found) = e.find_by_class_mut(class) {
                    return Some(found);
                }
            }
        }
        None
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.child_elements().find_map(|c| c.find_by_id(id))
    }

    pub fn find_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.id() == Some(id) {
            return Some(self);
        }
        for child in self.children.iter_mut() {
            if let Node::Element(e) = child {
                if let Some(found) = e.find_by_id_mut(id) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Visit every element carrying `class`, outermost first. Matches are not
    /// searched for nested matches.
    pub fn for_each_with_class_mut<F>(&mut self, class: &str, f: &mut F)
    where
        F: FnMut(&mut Element),
    {
        if self.has_class(class) {
            f(self);
            return;
        }
        for child in self.children.iter_mut() {
            if let Node::Element(e) = child {
                e.for_each_with_class_mut(class, f);
            }
        }
    }

    /// Drop every descendant element carrying `class`.
    pub fn remove_descendants_with_class(&mut self, class: &str) {
        self.children
            .retain(|n| !matches!(n, Node::Element(e) if e.has_class(class)));
        for child in self.children.iter_mut() {
            if let Node::Element(e) = child {
                e.remove_descendants_with_class(class);
            }
        }
    }

    /// Plain text of the subtree. Raw fragments have their tags stripped.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Element(e) => e.collect_text(out),
                Node::Text(t) => out.push_str(t),
                Node::Raw(html) => out.push_str(&strip_tags(html)),
            }
        }
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(child, &mut out);
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(e) => write_element(e, out),
        Node::Text(t) => out.push_str(&escape_html(t)),
        Node::Raw(html) => out.push_str(html),
    }
}

fn write_element(e: &Element, out: &mut String) {
    let _ = write!(out, "<{}", e.tag);
    // id first, then class, then the rest in insertion order
    if let Some(id) = e.id() {
        let _ = write!(out, " id=\"{}\"", escape_html(id));
    }
    if !e.classes.is_empty() {
        let _ = write!(out, " class=\"{}\"", escape_html(&e.classes.join(" ")));
    }
    for (name, value) in e.attrs.iter().filter(|(n, _)| n != "id") {
        let _ = write!(out, " {}=\"{}\"", name, escape_html(value));
    }
    out.push('>');
    for child in &e.children {
        write_node(child, out);
    }
    let _ = write!(out, "</{}>", e.tag);
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Text of an HTML fragment: block-level closers become newlines, other tags
/// are dropped, entities decoded.
pub fn strip_tags(html: &str) -> String {
    static BLOCK_END_REGEX: OnceLock<Regex> = OnceLock::new();
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    static SCRIPT_REGEX: OnceLock<Regex> = OnceLock::new();
    let script = SCRIPT_REGEX
        .get_or_init(|| Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").unwrap());
    let block_end = BLOCK_END_REGEX.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|pre|blockquote)>").unwrap()
    });
    let tag = TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").unwrap());

    let without_scripts = script.replace_all(html, "");
    let with_breaks = block_end.replace_all(&without_scripts, "\n");
    let text = tag.replace_all(&with_breaks, "");
    // Non-breaking spaces copy as plain spaces.
    html_escape::decode_html_entities(&text).replace('\u{a0}', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Element {
        Element::new("div")
            .with_class("outer")
            .with_attr("id", "box")
            .with_child(Element::new("span").with_class("label").with_text("A < B"))
            .with_child(
                Element::new("div")
                    .with_class("actions")
                    .with_child(Element::new("button").with_text("Copy")),
            )
            .with_raw("<p>Body &amp; more</p>")
    }

    #[test]
    fn test_serialization_escapes_text_not_raw() {
        assert_eq!(
            sample().to_html(),
            "<div id=\"box\" class=\"outer\"><span class=\"label\">A &lt; B</span>\
<div class=\"actions\"><button>Copy</button></div><p>Body &amp; more</p></div>"
        );
    }

    #[test]
    fn test_attribute_values_are_escaped() {
        let e = Element::new("span").with_attr("data-x", "\"><script>");
        assert_eq!(e.to_html(), "<span data-x=\"&quot;&gt;&lt;script&gt;\"></span>");
    }

    #[test]
    fn test_set_attr_replaces() {
        let mut e = Element::new("div").with_attr("data-a", "1");
        e.set_attr("data-a", "2");
        assert_eq!(e.attrs.len(), 1);
        assert_eq!(e.attr("data-a"), Some("2"));
    }

    #[test]
    fn test_find_and_remove() {
        let mut e = sample();
        assert!(e.find_by_class("actions").is_some());
        assert_eq!(e.find_by_id("box").map(|b| b.tag.as_str()), Some("div"));
        e.remove_descendants_with_class("actions");
        assert!(e.find_by_class("actions").is_none());
        assert_eq!(e.text_content(), "A < BBody & more\n");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>One</p><p>Two<br>three</p>"), "One\nTwo\nthree\n");
        assert_eq!(strip_tags("a<script>alert(1)</script>b"), "ab");
        assert_eq!(strip_tags("<p>Don&#8217;t &#x27;x&#x27;&nbsp;&amp;&lt;</p>"), "Don\u{2019}t 'x' &<\n");
    }

    #[test]
    fn test_class_dedup() {
        let e = Element::new("div").with_classes(["a", "b", "a", ""]);
        assert_eq!(e.classes, vec!["a", "b"]);
    }
}
