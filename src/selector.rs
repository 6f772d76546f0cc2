//! DOM snapshot tree and CSS selector generation
//!
//! The picker operates on a lightweight snapshot of the page: an arena of
//! elements with tag/id/class data, optional bounding boxes for hit-testing,
//! and a flag marking elements that belong to the feedback widget's own UI
//! (banner, overlay, guides, dialog) so they are never targeted.

/// Handle to an element inside a [`DomTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

/// Axis-aligned bounding box in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

/// One element of the snapshot. Built with the chained constructors:
///
/// ```
/// use tidy_feedback::selector::{Bounds, Element};
///
/// let hero = Element::new("div")
///     .with_id("hero")
///     .with_bounds(Bounds::new(0.0, 100.0, 800.0, 240.0));
/// # let _ = hero;
/// ```
#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub bounds: Option<Bounds>,
    pub widget_ui: bool,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            bounds: None,
            widget_ui: false,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_classes(mut self, classes: &[&str]) -> Self {
        self.classes = classes.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Marks the element as part of the widget's own UI.
    pub fn widget_ui(mut self) -> Self {
        self.widget_ui = true;
        self
    }
}

struct Node {
    element: Element,
    parent: Option<NodeId>,
}

/// Arena-backed element tree rooted at `<body>`.
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Creates a tree containing only the `<body>` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                element: Element::new("body"),
                parent: None,
            }],
        }
    }

    pub fn body(&self) -> NodeId {
        NodeId(0)
    }

    /// Appends an element under `parent` and returns its handle.
    pub fn append(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            element,
            parent: Some(parent),
        });
        id
    }

    pub fn element(&self, node: NodeId) -> &Element {
        &self.nodes[node.0].element
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn bounds(&self, node: NodeId) -> Option<Bounds> {
        self.nodes[node.0].element.bounds
    }

    /// Resolves the topmost element at a page coordinate.
    ///
    /// Later siblings paint above earlier ones, so the scan runs in reverse
    /// insertion order. Returns `None` when the point is outside every
    /// element with a bounding box (outside document bounds).
    pub fn element_at(&self, x: f64, y: f64) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .rev()
            .find(|(_, node)| {
                node.element
                    .bounds
                    .map(|b| b.contains(x, y))
                    .unwrap_or(false)
            })
            .map(|(index, _)| NodeId(index))
    }

    /// True when the element or any of its ancestors belongs to the widget
    /// UI. Mirrors a `closest(".tidy-feedback-ui")` lookup.
    pub fn is_widget_ui(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.nodes[n.0].element.widget_ui {
                return true;
            }
            current = self.nodes[n.0].parent;
        }
        false
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a CSS selector string for an element.
///
/// A non-empty id on the element itself wins outright and produces `#<id>`.
/// Otherwise the path is built from the element up to (but not including)
/// `<body>`: each segment is the lowercased tag name, an ancestor id appends
/// `#id` and stops the ascent, and classes are appended `.a.b` in original
/// order. Segments are joined root-to-leaf with ` > `.
///
/// A chain with no ids and no classes yields bare tag names
/// (`div > div > span`), which may not be unique; that ambiguity is accepted.
pub fn generate_selector(tree: &DomTree, node: NodeId) -> String {
    if let Some(id) = tree.element(node).id.as_deref().filter(|id| !id.is_empty()) {
        return format!("#{}", id);
    }

    let mut path = Vec::new();
    let mut current = Some(node);

    while let Some(n) = current {
        if n == tree.body() {
            break;
        }

        let element = tree.element(n);
        let mut segment = element.tag.to_lowercase();

        if let Some(id) = element.id.as_deref().filter(|id| !id.is_empty()) {
            // An id found partway up is assumed page-unique; no need to
            // climb further.
            segment.push('#');
            segment.push_str(id);
            path.push(segment);
            break;
        }

        for class in element.classes.iter().filter(|c| !c.is_empty()) {
            segment.push('.');
            segment.push_str(class);
        }

        path.push(segment);
        current = tree.parent(n);
    }

    path.reverse();
    path.join(" > ")
}
