//! Host page model
//!
//! A minimal, serializable picture of the page the tracker observes: the
//! elements in document order with their layout boxes, plus the viewport,
//! scroll offset and navigation metadata reported by the host.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable node identity assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Axis-aligned box. Element rects are stored in document coordinates.
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

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.left() && px < self.right() && py >= self.top() && py < self.bottom()
    }
}

/// Width/height pair (viewport or screen)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A DOM element as seen by the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: NodeId,
    /// Tag name as reported by the host (any case)
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Attributes such as `alt`, `src`, `href`, `type` and the tracking id
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Text content
    #[serde(default)]
    pub text: String,
    /// Layout box in document coordinates
    #[serde(default)]
    pub rect: Rect,
}

impl Element {
    pub fn new(id: u64, tag: &str) -> Self {
        Self {
            id: NodeId(id),
            tag: tag.to_string(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            text: String::new(),
            rect: Rect::default(),
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// The observed page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub referrer: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub screen: Size,
    pub viewport: Size,
    /// Vertical scroll offset in pixels
    #[serde(default)]
    pub scroll_y: f64,
    #[serde(default)]
    pub hidden: bool,
    /// Elements in document order
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Document {
    pub fn new(viewport: Size) -> Self {
        Self {
            url: String::new(),
            referrer: String::new(),
            user_agent: String::new(),
            screen: viewport,
            viewport,
            scroll_y: 0.0,
            hidden: false,
            elements: Vec::new(),
        }
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Elements carrying the marker class, enumerated fresh in document order
    pub fn trackable<'a>(&'a self, marker: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements.iter().filter(move |e| e.has_class(marker))
    }

    /// Element rect translated into viewport coordinates
    pub fn client_rect(&self, element: &Element) -> Rect {
        Rect {
            y: element.rect.y - self.scroll_y,
            ..element.rect
        }
    }

    /// Topmost element under a viewport point; later elements paint on top
    pub fn element_at(&self, x: f64, y: f64) -> Option<&Element> {
        self.elements
            .iter()
            .rev()
            .find(|e| self.client_rect(e).contains(x, y))
    }

    /// Append an element, replacing any element with the same id
    pub fn insert(&mut self, element: Element) {
        match self.elements.iter_mut().find(|e| e.id == element.id) {
            Some(existing) => *existing = element,
            None => self.elements.push(element),
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Element> {
        let index = self.elements.iter().position(|e| e.id == id)?;
        Some(self.elements.remove(index))
    }

    /// Update an element's layout box; returns false for unknown nodes
    pub fn set_rect(&mut self, id: NodeId, rect: Rect) -> bool {
        match self.elements.iter_mut().find(|e| e.id == id) {
            Some(element) => {
                element.rect = rect;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Document {
        let mut doc = Document::new(Size::new(800, 600));
        doc.insert(Element::new(1, "DIV").with_rect(Rect::new(0.0, 0.0, 800.0, 2000.0)));
        doc.insert(
            Element::new(2, "IMG")
                .with_class("track-view")
                .with_rect(Rect::new(10.0, 100.0, 200.0, 100.0)),
        );
        doc.insert(
            Element::new(3, "P")
                .with_class("track-view")
                .with_rect(Rect::new(0.0, 900.0, 800.0, 300.0)),
        );
        doc
    }

    #[test]
    fn test_trackable_in_document_order() {
        let doc = page();
        let ids: Vec<u64> = doc.trackable("track-view").map(|e| e.id.0).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_element_at_prefers_topmost() {
        let doc = page();
        assert_eq!(doc.element_at(50.0, 150.0).map(|e| e.id), Some(NodeId(2)));
        assert_eq!(doc.element_at(500.0, 50.0).map(|e| e.id), Some(NodeId(1)));
    }

    #[test]
    fn test_client_rect_follows_scroll() {
        let mut doc = page();
        doc.scroll_y = 800.0;
        let p = doc.element(NodeId(3)).unwrap().clone();
        assert_eq!(doc.client_rect(&p).top(), 100.0);
        assert_eq!(doc.element_at(50.0, 150.0).map(|e| e.id), Some(NodeId(3)));
    }

    #[test]
    fn test_insert_replaces_and_remove() {
        let mut doc = page();
        doc.insert(Element::new(2, "IMG").with_text("replaced"));
        assert_eq!(doc.elements.len(), 3);
        assert_eq!(doc.element(NodeId(2)).unwrap().text, "replaced");

        assert!(doc.remove(NodeId(2)).is_some());
        assert!(doc.remove(NodeId(2)).is_none());
        assert!(!doc.set_rect(NodeId(2), Rect::default()));
    }

    #[test]
    fn test_document_deserialization_defaults() {
        let json = r#"{
            "viewport": { "width": 1024, "height": 768 },
            "elements": [ { "id": 7, "tag": "BUTTON", "text": "Buy" } ]
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.scroll_y, 0.0);
        assert!(!doc.hidden);
        assert_eq!(doc.elements[0].id, NodeId(7));
        assert!(doc.elements[0].classes.is_empty());
    }
}
