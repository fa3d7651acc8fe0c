use std::{any::TypeId, collections::BTreeMap};

use slotmap::new_key_type;

use crate::{component::WeakComponent, geom::Rect, style::Style};

new_key_type! {
    /// Opaque identifier for a node stored in a tree arena.
    pub struct NodeId;
}

/// A node's attribute map. Ordered so dumps and comparisons are stable.
pub type Attributes = BTreeMap<String, String>;

/// The closed set of primitive widget tags.
pub const PRIMITIVES: &[&str] = &[
    "row", "col", "text", "p", "button", "input", "textarea", "img", "canvas",
];

/// Is this a primitive widget tag?
pub fn is_primitive(tag: &str) -> bool {
    PRIMITIVES.contains(&tag)
}

/// Does this tag name a subcomponent? Subcomponent tags start with an
/// uppercase character.
pub fn is_subcomponent(tag: &str) -> bool {
    tag.chars().next().is_some_and(char::is_uppercase)
}

/// A tag is valid if it is a primitive or a subcomponent reference.
pub fn is_valid_tag(tag: &str) -> bool {
    is_primitive(tag) || is_subcomponent(tag)
}

/// Pointer interaction state, derived each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interaction {
    /// The pointer is elsewhere.
    #[default]
    Idle,
    /// The pointer is over the node.
    Hover,
    /// The pointer is over the node with the button held.
    Active,
}

/// Text editing state for `input` and `textarea` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Editable {
    /// Cursor offset, in characters, into the node's value.
    pub cursor: usize,
    /// Does this node hold keyboard focus?
    pub focused: bool,
}

impl Editable {
    /// Fresh editing state with the cursor at the end of `value`.
    pub fn at_end(value: &str) -> Self {
        Self {
            cursor: value.chars().count(),
            focused: false,
        }
    }
}

/// Scroll state for `p` and `textarea` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scrollable {
    /// Index of the first visible line.
    pub line: usize,
    /// Total wrapped line count, as of the last layout.
    pub lines: usize,
    /// Number of lines that fit in the content box.
    pub visible: usize,
    /// Normalized scroll position in `[0, 1]`.
    pub position: f32,
}

impl Scrollable {
    /// Largest valid first line.
    pub fn max_line(&self) -> usize {
        self.lines.saturating_sub(self.visible.max(1))
    }

    /// Scroll by `delta` lines, clamped to the content.
    pub fn scroll(&mut self, delta: i32) {
        let target = if delta < 0 {
            self.line.saturating_sub(delta.unsigned_abs() as usize)
        } else {
            self.line.saturating_add(delta as usize)
        };
        self.line = target.min(self.max_line());
        self.update_position();
    }

    /// Recompute the normalized position from the line offset.
    pub fn update_position(&mut self) {
        let max = self.max_line();
        self.line = self.line.min(max);
        self.position = if max == 0 {
            0.0
        } else {
            self.line as f32 / max as f32
        };
    }
}

/// Absolute rectangles produced by layout. Outer includes margin, inner
/// includes border and padding, content is what remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Geometry {
    /// Content box.
    pub content: Rect,
    /// Border box.
    pub inner: Rect,
    /// Margin box.
    pub outer: Rect,
}

/// Core node data stored in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    /// Effective tag. Always primitive after a successful build.
    pub(crate) tag: String,
    /// The tag as written in the owner's markup.
    pub(crate) source_tag: String,
    /// Attribute map.
    pub(crate) attrs: Attributes,
    /// Trimmed text content.
    pub(crate) content: String,
    /// Parent in the arena tree.
    pub(crate) parent: Option<NodeId>,
    /// Children in the arena tree.
    pub(crate) children: Vec<NodeId>,
    /// Resolved style.
    pub(crate) style: Style,
    /// Layout output.
    pub(crate) geometry: Geometry,
    /// Pointer interaction state.
    pub(crate) interaction: Interaction,
    /// Editing state, for inputs and textareas.
    pub(crate) editable: Option<Editable>,
    /// Scroll state, for paragraphs and textareas.
    pub(crate) scrollable: Option<Scrollable>,
    /// The component whose markup produced this node.
    pub(crate) owner: WeakComponent,
    /// Concrete type of the owner.
    pub(crate) owner_type: TypeId,
    /// Display name of the owner.
    pub(crate) owner_name: &'static str,
    /// Draw diagnostic overlays.
    pub(crate) debug: bool,
    /// Is this node, and every ancestor, displayed?
    pub(crate) displayed: bool,
}

impl Node {
    /// Construct a displayed node with no owner and default state.
    pub(crate) fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            source_tag: tag.to_string(),
            attrs: Attributes::new(),
            content: String::new(),
            parent: None,
            children: Vec::new(),
            style: Style::default(),
            geometry: Geometry::default(),
            interaction: Interaction::Idle,
            editable: None,
            scrollable: None,
            owner: WeakComponent::default(),
            owner_type: TypeId::of::<()>(),
            owner_name: "",
            debug: false,
            displayed: true,
        }
    }

    /// Return the node's effective tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Return the tag this node was declared with. Differs from `tag` for
    /// style aliases and spliced subcomponents.
    pub fn source_tag(&self) -> &str {
        &self.source_tag
    }

    /// Return the attribute map.
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Return a single attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Return the text content.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// The editable text of the node: the `value` attribute, falling back
    /// to the content for textareas.
    pub fn value(&self) -> &str {
        match self.attr("value") {
            Some(v) => v,
            None if self.tag == "textarea" => &self.content,
            None => "",
        }
    }

    /// Return the node's parent, if any.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Return the node's children.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Return the resolved style.
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Return the layout rectangles.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Return the interaction state.
    pub fn interaction(&self) -> Interaction {
        self.interaction
    }

    /// Return the editing state.
    pub fn editable(&self) -> Option<Editable> {
        self.editable
    }

    /// Return the scroll state.
    pub fn scrollable(&self) -> Option<Scrollable> {
        self.scrollable
    }

    /// Return the owning component, if it is still alive.
    pub fn owner(&self) -> &WeakComponent {
        &self.owner
    }

    /// Return the owning component's name.
    pub fn owner_name(&self) -> &'static str {
        self.owner_name
    }

    /// Return the debug flag.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Is the node displayed? False if it or any ancestor is hidden or has
    /// display turned off.
    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    /// Does this node accept text input?
    pub fn is_editable(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea")
    }

    /// Does this node scroll by lines?
    pub fn is_scrollable(&self) -> bool {
        matches!(self.tag.as_str(), "p" | "textarea")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags() {
        assert!(is_valid_tag("row"));
        assert!(is_valid_tag("Page1"));
        assert!(is_valid_tag("Émile"));
        assert!(!is_valid_tag("div"));
        assert!(!is_valid_tag(""));
        assert!(is_subcomponent("Page1"));
        assert!(!is_subcomponent("button"));
    }

    #[test]
    fn cursor_seed() {
        assert_eq!(Editable::at_end("hello").cursor, 5);
        assert_eq!(Editable::at_end("héllo").cursor, 5);
        assert_eq!(Editable::at_end("").cursor, 0);
    }

    #[test]
    fn scroll_clamps() {
        let mut s = Scrollable {
            line: 0,
            lines: 10,
            visible: 4,
            position: 0.0,
        };
        s.scroll(3);
        assert_eq!(s.line, 3);
        assert_eq!(s.position, 0.5);
        s.scroll(100);
        assert_eq!(s.line, 6);
        assert_eq!(s.position, 1.0);
        s.scroll(-100);
        assert_eq!(s.line, 0);
        assert_eq!(s.position, 0.0);

        let mut short = Scrollable {
            lines: 2,
            visible: 4,
            ..Default::default()
        };
        short.scroll(1);
        assert_eq!(short.line, 0);
    }
}
