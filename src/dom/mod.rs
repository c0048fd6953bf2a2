//! In-memory model of the host page.
//!
//! The engine never owns the page: the host mirrors the live element tree,
//! inline styles, layout rectangles, scroll offsets and location into a
//! [`Document`] and drives the widget with events targeting [`NodeId`]s.

pub mod event;
pub mod selector;
pub mod structural;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub use event::{DomEvent, EventResponse, CANCEL_KEY};
pub use selector::{css_escape, Selector};
pub use structural::{resolve_structural_path, structural_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Axis-aligned rectangle. Stored layout rects are in document coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
struct Element {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    style: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    layout: Rect,
}

impl Element {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: Vec::new(),
            style: Vec::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
            layout: Rect::default(),
        }
    }
}

pub struct Document {
    nodes: Vec<Element>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    title: String,
    location: Url,
    viewport: ViewportSize,
    scroll_x: f64,
    scroll_y: f64,
}

impl Document {
    /// Creates `<html><head></head><body></body></html>` at `location`.
    pub fn new(location: &str) -> Result<Self> {
        let location =
            Url::parse(location).with_context(|| format!("invalid document location {location}"))?;

        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            title: String::new(),
            location,
            viewport: ViewportSize {
                width: 1280,
                height: 800,
            },
            scroll_x: 0.0,
            scroll_y: 0.0,
        };

        let root = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.append_child(root, head)?;
        doc.append_child(root, body)?;
        doc.root = root;
        doc.head = head;
        doc.body = body;

        Ok(doc)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    pub fn href(&self) -> &str {
        self.location.as_str()
    }

    pub fn pathname(&self) -> &str {
        self.location.path()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.location.host_str().filter(|host| !host.is_empty())
    }

    pub fn viewport(&self) -> ViewportSize {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = ViewportSize { width, height };
    }

    pub fn scroll_x(&self) -> f64 {
        self.scroll_x
    }

    pub fn scroll_y(&self) -> f64 {
        self.scroll_y
    }

    pub fn scroll_to(&mut self, x: f64, y: f64) {
        self.scroll_x = x;
        self.scroll_y = y;
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Element::new(tag));
        id
    }

    /// Creates an element and appends it to `parent` in one step.
    pub fn append_new(&mut self, parent: NodeId, tag: &str) -> Result<NodeId> {
        let child = self.create_element(tag);
        self.append_child(parent, child)?;
        Ok(child)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check(parent)?;
        self.check(child)?;
        if child == parent || self.contains(child, parent) {
            return Err(anyhow!("cannot append a node into its own subtree"));
        }

        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Detaches `node` and its subtree from the tree. The arena slot stays
    /// allocated, so stale ids remain safe to query but match nothing.
    pub fn remove(&mut self, node: NodeId) {
        if self.nodes.get(node.0).is_some() {
            self.detach(node);
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != node);
        }
    }

    fn check(&self, node: NodeId) -> Result<()> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(anyhow!("unknown node {}", node.0))
        }
    }

    fn el(&self, node: NodeId) -> &Element {
        &self.nodes[node.0]
    }

    fn el_mut(&mut self, node: NodeId) -> &mut Element {
        &mut self.nodes[node.0]
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.el(node).tag
    }

    pub fn id_attr(&self, node: NodeId) -> Option<&str> {
        self.el(node).id.as_deref()
    }

    pub fn set_id(&mut self, node: NodeId, id: &str) {
        self.el_mut(node).id = if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        };
    }

    pub fn class_list(&self, node: NodeId) -> &[String] {
        &self.el(node).classes
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        let classes = &mut self.el_mut(node).classes;
        if !class.is_empty() && !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.el_mut(node).classes.retain(|c| c != class);
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.el(node).classes.iter().any(|c| c == class)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.el(node)
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let attributes = &mut self.el_mut(node).attributes;
        match attributes.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        self.el_mut(node).attributes.retain(|(key, _)| key != name);
    }

    /// Inline style value for `property`, empty when unset (like `el.style.x`).
    pub fn style(&self, node: NodeId, property: &str) -> &str {
        self.el(node)
            .style
            .iter()
            .find(|(key, _)| key == property)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    /// Sets an inline style property; an empty value removes the declaration.
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) {
        let style = &mut self.el_mut(node).style;
        if value.is_empty() {
            style.retain(|(key, _)| key != property);
            return;
        }
        match style.iter_mut().find(|(key, _)| key == property) {
            Some(entry) => entry.1 = value.to_string(),
            None => style.push((property.to_string(), value.to_string())),
        }
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.el_mut(node).text = text.to_string();
    }

    /// Concatenated text of the element and all descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let el = self.el(node);
        out.push_str(&el.text);
        for child in &el.children {
            self.collect_text(*child, out);
        }
    }

    pub fn set_layout(&mut self, node: NodeId, rect: Rect) {
        self.el_mut(node).layout = rect;
    }

    /// Layout rect in document coordinates.
    pub fn layout(&self, node: NodeId) -> Rect {
        self.el(node).layout
    }

    /// Viewport-relative rect, as `getBoundingClientRect` reports it.
    pub fn bounding_client_rect(&self, node: NodeId) -> Rect {
        let layout = self.layout(node);
        Rect::new(
            layout.x - self.scroll_x,
            layout.y - self.scroll_y,
            layout.width,
            layout.height,
        )
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.el(node).parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.el(node).children
    }

    /// 1-based position among the parent's element children.
    pub fn child_index(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent)
            .iter()
            .position(|child| *child == node)
            .map(|index| index + 1)
    }

    /// True when `node` is `ancestor` or lies inside its subtree.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(self.root, node)
    }

    /// Nearest inclusive ancestor whose id is one of `ids`.
    pub fn closest_with_id(&self, node: NodeId, ids: &[&str]) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(value) = self.id_attr(id) {
                if ids.contains(&value) {
                    return Some(id);
                }
            }
            current = self.parent(id);
        }
        None
    }

    /// Nearest inclusive ancestor carrying any of `classes`.
    pub fn closest_with_class(&self, node: NodeId, classes: &[&str]) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            if classes.iter().any(|class| self.has_class(id, class)) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants()
            .into_iter()
            .find(|node| self.id_attr(*node) == Some(id))
    }

    /// Every connected element in document (pre-)order, root first.
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            for child in self.children(node).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let parsed = Selector::parse(selector)?;
        Ok(self
            .descendants()
            .into_iter()
            .filter(|node| parsed.matches(self, *node))
            .collect())
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new("https://example.com/pricing?plan=pro").unwrap()
    }

    #[test]
    fn new_document_has_head_and_body_under_html() {
        let doc = doc();
        assert_eq!(doc.tag(doc.root()), "html");
        assert_eq!(doc.children(doc.root()), &[doc.head(), doc.body()]);
        assert_eq!(doc.pathname(), "/pricing");
        assert_eq!(doc.hostname(), Some("example.com"));
    }

    #[test]
    fn empty_style_value_removes_declaration() {
        let mut doc = doc();
        let div = doc.append_new(doc.body(), "div").unwrap();
        doc.set_style(div, "outline", "1px dashed blue");
        assert_eq!(doc.style(div, "outline"), "1px dashed blue");
        doc.set_style(div, "outline", "");
        assert_eq!(doc.style(div, "outline"), "");
    }

    #[test]
    fn removed_subtree_is_not_queryable() {
        let mut doc = doc();
        let section = doc.append_new(doc.body(), "section").unwrap();
        let button = doc.append_new(section, "button").unwrap();
        doc.set_id(button, "submit");
        assert_eq!(doc.query_selector("#submit").unwrap(), Some(button));

        doc.remove(section);
        assert!(!doc.is_connected(button));
        assert_eq!(doc.query_selector("#submit").unwrap(), None);
    }

    #[test]
    fn bounding_client_rect_subtracts_scroll() {
        let mut doc = doc();
        let div = doc.append_new(doc.body(), "div").unwrap();
        doc.set_layout(div, Rect::new(100.0, 900.0, 50.0, 20.0));
        doc.scroll_to(10.0, 600.0);
        assert_eq!(
            doc.bounding_client_rect(div),
            Rect::new(90.0, 300.0, 50.0, 20.0)
        );
    }

    #[test]
    fn text_content_includes_descendants() {
        let mut doc = doc();
        let p = doc.append_new(doc.body(), "p").unwrap();
        doc.set_text(p, "Hello ");
        let strong = doc.append_new(p, "strong").unwrap();
        doc.set_text(strong, "world");
        assert_eq!(doc.text_content(p), "Hello world");
    }

    #[test]
    fn append_into_own_subtree_is_rejected() {
        let mut doc = doc();
        let outer = doc.append_new(doc.body(), "div").unwrap();
        let inner = doc.append_new(outer, "div").unwrap();
        assert!(doc.append_child(inner, outer).is_err());
    }
}
