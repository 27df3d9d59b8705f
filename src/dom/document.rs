//! Document - In-memory output tree.
//!
//! Elements live in an arena indexed by [`ElementId`]. The document supports
//! exactly what view placement needs:
//! - append (moving the element if it is already attached)
//! - replace content
//! - detach / discard
//! - clear (detach all children)
//! - selector queries scoped under a root element

use crate::error::Result;
use crate::types::ElementId;

use super::selector::Selector;

// =============================================================================
// Element Storage
// =============================================================================

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    text: Option<String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    alive: bool,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            text: None,
            parent: None,
            children: Vec::new(),
            alive: true,
        }
    }
}

/// Output document shared by every view in a tree.
#[derive(Debug, Clone)]
pub struct Document {
    elements: Vec<ElementData>,
    body: ElementId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing only `<body>`.
    pub fn new() -> Self {
        Self {
            elements: vec![ElementData::new("body")],
            body: ElementId(0),
        }
    }

    /// The root element.
    pub fn body(&self) -> ElementId {
        self.body
    }

    fn data(&self, el: ElementId) -> Option<&ElementData> {
        self.elements.get(el.0).filter(|data| data.alive)
    }

    fn data_mut(&mut self, el: ElementId) -> Option<&mut ElementData> {
        self.elements.get_mut(el.0).filter(|data| data.alive)
    }

    // =========================================================================
    // Creation & attributes
    // =========================================================================

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        let el = ElementId(self.elements.len());
        self.elements.push(ElementData::new(tag));
        el
    }

    pub fn is_alive(&self, el: ElementId) -> bool {
        self.data(el).is_some()
    }

    pub fn tag(&self, el: ElementId) -> Option<&str> {
        self.data(el).map(|data| data.tag.as_str())
    }

    /// The element's `id` attribute.
    pub fn element_id(&self, el: ElementId) -> Option<&str> {
        self.data(el).and_then(|data| data.id.as_deref())
    }

    pub fn set_element_id(&mut self, el: ElementId, id: &str) {
        if let Some(data) = self.data_mut(el) {
            data.id = Some(id.to_string());
        }
    }

    pub fn add_class(&mut self, el: ElementId, class: &str) {
        if let Some(data) = self.data_mut(el) {
            if !data.classes.iter().any(|c| c == class) {
                data.classes.push(class.to_string());
            }
        }
    }

    pub fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.data(el)
            .is_some_and(|data| data.classes.iter().any(|c| c == class))
    }

    pub fn classes(&self, el: ElementId) -> &[String] {
        self.data(el).map(|data| data.classes.as_slice()).unwrap_or(&[])
    }

    pub fn text(&self, el: ElementId) -> Option<&str> {
        self.data(el).and_then(|data| data.text.as_deref())
    }

    pub fn set_text(&mut self, el: ElementId, text: impl Into<String>) {
        if let Some(data) = self.data_mut(el) {
            data.text = Some(text.into());
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    pub fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.data(el).and_then(|data| data.parent)
    }

    pub fn children(&self, el: ElementId) -> &[ElementId] {
        self.data(el).map(|data| data.children.as_slice()).unwrap_or(&[])
    }

    /// True if `ancestor` is `el` or one of its ancestors.
    pub fn contains(&self, ancestor: ElementId, el: ElementId) -> bool {
        let mut cursor = Some(el);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// True if `el` is attached (directly or indirectly) under `<body>`.
    pub fn is_attached(&self, el: ElementId) -> bool {
        self.is_alive(el) && self.contains(self.body, el)
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere.
    ///
    /// Returns false (and changes nothing) if either element is dead or the
    /// move would create a cycle.
    pub fn append(&mut self, parent: ElementId, child: ElementId) -> bool {
        if !self.is_alive(parent) || !self.is_alive(child) || self.contains(child, parent) {
            return false;
        }
        self.detach(child);
        self.elements[parent.0].children.push(child);
        self.elements[child.0].parent = Some(parent);
        true
    }

    /// Replace all children of `parent` with `child`.
    pub fn replace_content(&mut self, parent: ElementId, child: ElementId) -> bool {
        if !self.is_alive(parent) || !self.is_alive(child) || self.contains(child, parent) {
            return false;
        }
        self.clear(parent);
        self.append(parent, child)
    }

    /// Remove `el` from its parent. The element stays alive and can be re-attached.
    pub fn detach(&mut self, el: ElementId) {
        let Some(parent) = self.parent(el) else {
            return;
        };
        if let Some(data) = self.data_mut(parent) {
            data.children.retain(|c| *c != el);
        }
        self.elements[el.0].parent = None;
    }

    /// Detach all children of `el` and its text.
    pub fn clear(&mut self, el: ElementId) {
        let Some(data) = self.data_mut(el) else {
            return;
        };
        let children = std::mem::take(&mut data.children);
        data.text = None;
        for child in children {
            self.elements[child.0].parent = None;
        }
    }

    /// Detach `el` and free it together with its whole subtree.
    pub fn discard(&mut self, el: ElementId) {
        if !self.is_alive(el) || el == self.body {
            return;
        }
        self.detach(el);
        let mut stack = vec![el];
        while let Some(current) = stack.pop() {
            let data = &mut self.elements[current.0];
            data.alive = false;
            data.parent = None;
            stack.extend(std::mem::take(&mut data.children));
        }
    }

    /// All descendants of `root` in document order (root excluded).
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.children(root).iter().rev().copied().collect();
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(self.children(el).iter().rev().copied());
        }
        out
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Resolve `selector` to every matching descendant of `root`, in document order.
    pub fn query(&self, root: ElementId, selector: &str) -> Result<Vec<ElementId>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(root)
            .into_iter()
            .filter(|el| selector.matches(self, *el))
            .collect())
    }

    /// First match of `selector` under `root`.
    pub fn query_first(&self, root: ElementId, selector: &str) -> Result<Option<ElementId>> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(root)
            .into_iter()
            .find(|el| selector.matches(self, *el)))
    }

    /// Serialize `el` and its subtree as markup (for debugging and tests).
    pub fn to_markup(&self, el: ElementId) -> String {
        let mut out = String::new();
        self.write_markup(el, &mut out);
        out
    }

    fn write_markup(&self, el: ElementId, out: &mut String) {
        let Some(data) = self.data(el) else {
            return;
        };
        out.push('<');
        out.push_str(&data.tag);
        if let Some(id) = &data.id {
            out.push_str(&format!(" id=\"{id}\""));
        }
        if !data.classes.is_empty() {
            out.push_str(&format!(" class=\"{}\"", data.classes.join(" ")));
        }
        out.push('>');
        if let Some(text) = &data.text {
            out.push_str(text);
        }
        for child in &data.children {
            self.write_markup(*child, out);
        }
        out.push_str(&format!("</{}>", data.tag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Document, ElementId, ElementId) {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        doc.set_element_id(list, "list");
        let item = doc.create_element("li");
        doc.add_class(item, "item");
        doc.append(doc.body(), list);
        doc.append(list, item);
        (doc, list, item)
    }

    #[test]
    fn test_append_moves_element() {
        let (mut doc, list, item) = setup();
        let other = doc.create_element("div");
        doc.append(doc.body(), other);

        assert!(doc.append(other, item));
        assert!(doc.children(list).is_empty());
        assert_eq!(doc.children(other), &[item]);
        assert_eq!(doc.parent(item), Some(other));
    }

    #[test]
    fn test_append_rejects_cycles() {
        let (mut doc, list, item) = setup();
        assert!(!doc.append(item, list));
        assert_eq!(doc.parent(item), Some(list));
    }

    #[test]
    fn test_replace_content() {
        let (mut doc, list, item) = setup();
        let replacement = doc.create_element("li");
        assert!(doc.replace_content(list, replacement));
        assert_eq!(doc.children(list), &[replacement]);
        assert_eq!(doc.parent(item), None);
        assert!(doc.is_alive(item));
    }

    #[test]
    fn test_clear_detaches_children() {
        let (mut doc, list, item) = setup();
        doc.set_text(list, "stale");
        doc.clear(list);
        assert!(doc.children(list).is_empty());
        assert_eq!(doc.text(list), None);
        assert!(doc.is_alive(item));
        assert!(!doc.is_attached(item));
    }

    #[test]
    fn test_discard_frees_subtree() {
        let (mut doc, list, item) = setup();
        doc.discard(list);
        assert!(!doc.is_alive(list));
        assert!(!doc.is_alive(item));
        assert!(doc.children(doc.body()).is_empty());

        // Body can't be discarded
        doc.discard(doc.body());
        assert!(doc.is_alive(doc.body()));
    }

    #[test]
    fn test_query_scoped_to_root() {
        let (mut doc, list, item) = setup();
        let stray = doc.create_element("li");
        doc.add_class(stray, "item");
        doc.append(doc.body(), stray);

        assert_eq!(doc.query(list, ".item").unwrap(), vec![item]);
        assert_eq!(doc.query(doc.body(), "li.item").unwrap(), vec![item, stray]);
        assert_eq!(doc.query_first(doc.body(), "#list .item").unwrap(), Some(item));
        assert_eq!(doc.query_first(list, "#list").unwrap(), None);
    }

    #[test]
    fn test_markup() {
        let (mut doc, list, item) = setup();
        doc.set_text(item, "one");
        assert_eq!(
            doc.to_markup(list),
            "<ul id=\"list\"><li class=\"item\">one</li></ul>"
        );
    }
}
