use std::{iter, ops::Index};

use slotmap::SlotMap;

use crate::{
    component::ComponentRef,
    error::{Error, Result},
    geom::Point,
    node::{Attributes, Geometry, Node, NodeId},
};

/// Control value returned by traversal closures.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Walk<T> {
    /// Skip this node and continue walking. The meaning of Skip depends on the
    /// traversal function being used.
    Skip,
    /// Stop walking and return a value.
    Handle(T),
    /// Continue walking.
    Continue,
}

impl<T> Walk<T> {
    /// The handle value of the traversal, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Handle(v) => Some(v),
            _ => None,
        }
    }
    /// Did the traversal return Handle?
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handle(_))
    }
    /// Did the traversal return Continue?
    pub fn is_continue(&self) -> bool {
        match self {
            Self::Skip | Self::Handle(_) => false,
            Self::Continue => true,
        }
    }
}

/// The structural content of a subtree: tags, attributes, content and
/// child order. Two builds of an unchanged component have equal shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    /// Effective tag.
    pub tag: String,
    /// Attributes.
    pub attrs: Attributes,
    /// Text content.
    pub content: String,
    /// Is the node displayed?
    pub displayed: bool,
    /// Children.
    pub children: Vec<Self>,
}

/// A built node tree. Trees are immutable once published; each frame
/// builds a replacement.
#[derive(Debug)]
pub struct Tree {
    /// Node storage.
    pub(crate) nodes: SlotMap<NodeId, Node>,
    /// The root node.
    pub(crate) root: NodeId,
    /// Strong handles to every component expanded in this tree.
    pub(crate) components: Vec<ComponentRef>,
}

impl Tree {
    /// Construct a tree holding a single root node.
    pub(crate) fn new(root: Node) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(root);
        Self {
            nodes,
            root,
            components: Vec::new(),
        }
    }

    /// Insert a node as the last child of `parent`.
    pub(crate) fn append(&mut self, parent: NodeId, mut node: Node) -> Result<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(Error::Internal("append to missing parent".into()));
        }
        node.parent = Some(parent);
        let id = self.nodes.insert(node);
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    /// The root node ID.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Get a node, or fail with an internal error.
    pub(crate) fn require(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::Internal("missing node".into()))
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Is the tree empty? Built trees always have a root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Components expanded in this tree, root component first.
    pub fn components(&self) -> &[ComponentRef] {
        &self.components
    }

    /// Iterate over all node IDs and nodes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// Pre-order traversal from the root. Returning Walk::Skip from the
    /// closure skips the node's children, Walk::Handle stops the walk.
    pub fn preorder<T>(
        &self,
        f: &mut dyn FnMut(NodeId, &Node) -> Result<Walk<T>>,
    ) -> Result<Walk<T>> {
        self.preorder_from(self.root, f)
    }

    /// Pre-order traversal from a given node.
    pub fn preorder_from<T>(
        &self,
        id: NodeId,
        f: &mut dyn FnMut(NodeId, &Node) -> Result<Walk<T>>,
    ) -> Result<Walk<T>> {
        let node = self.require(id)?;
        match f(id, node)? {
            Walk::Skip => return Ok(Walk::Continue),
            Walk::Handle(t) => return Ok(Walk::Handle(t)),
            Walk::Continue => {}
        }
        for child in &node.children {
            if let Walk::Handle(t) = self.preorder_from(*child, f)? {
                return Ok(Walk::Handle(t));
            }
        }
        Ok(Walk::Continue)
    }

    /// Post-order traversal from the root. Walk::Handle stops the walk;
    /// Skip behaves like Continue.
    pub fn postorder<T>(
        &self,
        f: &mut dyn FnMut(NodeId, &Node) -> Result<Walk<T>>,
    ) -> Result<Walk<T>> {
        self.postorder_from(self.root, f)
    }

    /// Post-order traversal from a given node.
    fn postorder_from<T>(
        &self,
        id: NodeId,
        f: &mut dyn FnMut(NodeId, &Node) -> Result<Walk<T>>,
    ) -> Result<Walk<T>> {
        let node = self.require(id)?;
        for child in &node.children {
            if let Walk::Handle(t) = self.postorder_from(*child, f)? {
                return Ok(Walk::Handle(t));
            }
        }
        match f(id, node)? {
            Walk::Handle(t) => Ok(Walk::Handle(t)),
            Walk::Skip | Walk::Continue => Ok(Walk::Continue),
        }
    }

    /// Call `f` on every node in pre-order, with its depth.
    pub fn visit(&self, f: &mut dyn FnMut(usize, NodeId, &Node)) {
        let mut stack = vec![(0, self.root)];
        while let Some((depth, id)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            f(depth, id, node);
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, *c)));
        }
    }

    /// IDs of every node in pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.len());
        self.visit(&mut |_, id, _| ids.push(id));
        ids
    }

    /// The node's ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.nodes.get(id).and_then(|n| n.parent);
        iter::from_fn(move || {
            let here = cur?;
            cur = self.nodes.get(here).and_then(|n| n.parent);
            Some(here)
        })
    }

    /// The child-index path from the root to a node.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.nodes.get(cur).and_then(|n| n.parent) {
            if let Some(i) = self.nodes[parent].children.iter().position(|c| *c == cur) {
                path.push(i);
            }
            cur = parent;
        }
        path.reverse();
        path
    }

    /// Resolve a child-index path from the root.
    pub fn by_path(&self, path: &[usize]) -> Option<NodeId> {
        let mut cur = self.root;
        for i in path {
            cur = *self.nodes.get(cur)?.children.get(*i)?;
        }
        Some(cur)
    }

    /// The first node, in pre-order, matching a predicate.
    pub fn find(&self, pred: &mut dyn FnMut(&Node) -> bool) -> Option<NodeId> {
        self.preorder(&mut |id, node| {
            Ok(if pred(node) {
                Walk::Handle(id)
            } else {
                Walk::Continue
            })
        })
        .ok()?
        .value()
    }

    /// The first node, in pre-order, with a given effective tag.
    pub fn find_tag(&self, tag: &str) -> Option<NodeId> {
        self.find(&mut |n| n.tag == tag)
    }

    /// The first node, in pre-order, declared with a given tag. Spliced
    /// subcomponent roots and style aliases keep their declared tag here.
    pub fn find_source(&self, tag: &str) -> Option<NodeId> {
        self.find(&mut |n| n.source_tag == tag)
    }

    /// The first node whose `id` attribute equals `name`.
    pub fn find_id(&self, name: &str) -> Option<NodeId> {
        self.find(&mut |n| n.attr("id") == Some(name))
    }

    /// The deepest displayed node whose border box contains `p`.
    pub fn locate(&self, p: Point) -> Option<NodeId> {
        let mut found = None;
        let mut cur = self.root;
        loop {
            let node = self.nodes.get(cur)?;
            if !node.displayed || !node.geometry.inner.contains_point(p) {
                return found;
            }
            found = Some(cur);
            // Later siblings draw on top, so search them first.
            let next = node.children.iter().rev().find(|c| {
                self.nodes
                    .get(**c)
                    .is_some_and(|n| n.displayed && n.geometry.inner.contains_point(p))
            });
            match next {
                Some(c) => cur = *c,
                None => return found,
            }
        }
    }

    /// The structural shape of the tree.
    pub fn shape(&self) -> Shape {
        self.shape_of(self.root)
    }

    /// The structural shape of a subtree.
    pub fn shape_of(&self, id: NodeId) -> Shape {
        let node = &self.nodes[id];
        Shape {
            tag: node.tag.clone(),
            attrs: node.attrs.clone(),
            content: node.content.clone(),
            displayed: node.displayed,
            children: node.children.iter().map(|c| self.shape_of(*c)).collect(),
        }
    }

    /// Record layout output for a node. Layout runs before a tree is
    /// published; published trees are only reachable through shared
    /// references.
    pub fn set_geometry(&mut self, id: NodeId, geometry: Geometry) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::Internal("layout of missing node".into()))?;
        node.geometry = geometry;
        Ok(())
    }

    /// Record the measured line count and visible line count of a
    /// scrollable node, re-clamping its scroll offset.
    pub fn set_lines(&mut self, id: NodeId, lines: usize, visible: usize) -> Result<()> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::Internal("layout of missing node".into()))?;
        if let Some(s) = node.scrollable.as_mut() {
            s.lines = lines;
            s.visible = visible;
            s.update_position();
        }
        Ok(())
    }

    /// Get a node mutably.
    #[cfg(test)]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}
