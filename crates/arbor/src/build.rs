//! Building a node tree from a root component.
//!
//! Every build renders each component's template, parses the markup,
//! expands subcomponent tags, and produces a fresh tree. Per-node state is
//! carried over from the previous tree for nodes at the same position with
//! the same owner type and tag.

use std::{any::TypeId, collections::HashMap, time::Instant};

use tracing::{debug, trace};

use crate::{
    component::{ComponentRef, Subcomponent, find_handler},
    error::{DispatchError, Error, Result},
    markup::{self, Element},
    node::{Editable, Interaction, Node, NodeId, Scrollable, is_primitive, is_subcomponent},
    style::Style,
    template::{TemplateCache, TemplateError},
    tree::Tree,
};

/// Maximum depth of nested component expansion.
pub const MAX_NESTING: usize = 128;

/// Derived per-node state for the previous tree, computed by the driver
/// from input. Takes precedence over the state stored on the previous
/// tree's nodes when migrating.
#[derive(Debug, Clone, Default)]
pub struct FrameState {
    /// Interaction state by previous node.
    pub interaction: HashMap<NodeId, Interaction>,
    /// Editing state by previous node.
    pub editable: HashMap<NodeId, Editable>,
    /// Scroll state by previous node.
    pub scrollable: HashMap<NodeId, Scrollable>,
}

impl FrameState {
    /// Is the overlay empty?
    pub fn is_empty(&self) -> bool {
        self.interaction.is_empty() && self.editable.is_empty() && self.scrollable.is_empty()
    }
}

/// Options for a single build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildOptions {
    /// The tree-wide debug flag, stamped on every node.
    pub debug: bool,
}

/// Builds one tree. Holds the previous tree and state overlay for
/// migration.
pub struct Builder<'a> {
    /// Parsed template cache.
    templates: &'a mut TemplateCache,
    /// The previous frame's tree.
    prev: Option<&'a Tree>,
    /// Derived state for the previous tree.
    state: Option<&'a FrameState>,
    /// Build options.
    options: BuildOptions,
    /// The tree under construction.
    tree: Option<Tree>,
    /// Every component expanded so far.
    components: Vec<ComponentRef>,
}

/// Who owns the nodes being built.
struct Owner {
    /// The component.
    component: ComponentRef,
    /// Its concrete type.
    ty: TypeId,
    /// Its diagnostic name.
    name: &'static str,
    /// Component nesting depth.
    depth: usize,
}

impl Owner {
    /// Capture a component's identity.
    fn new(component: ComponentRef, depth: usize) -> Self {
        let ty = component.type_id();
        let name = component.name();
        Self {
            component,
            ty,
            name,
            depth,
        }
    }
}

/// Where a node lands, and what it is reconciled against.
#[derive(Clone, Copy)]
struct Slot {
    /// Parent in the new tree.
    parent: Option<NodeId>,
    /// Node at the same position in the previous tree.
    prev: Option<NodeId>,
    /// Is the parent displayed?
    displayed: bool,
}

impl<'a> Builder<'a> {
    /// Construct a builder.
    pub fn new(templates: &'a mut TemplateCache) -> Self {
        Self {
            templates,
            prev: None,
            state: None,
            options: BuildOptions::default(),
            tree: None,
            components: Vec::new(),
        }
    }

    /// Reconcile against a previous tree.
    pub fn prev(mut self, prev: Option<&'a Tree>) -> Self {
        self.prev = prev;
        self
    }

    /// Use a derived-state overlay for the previous tree.
    pub fn state(mut self, state: Option<&'a FrameState>) -> Self {
        self.state = state;
        self
    }

    /// Set build options.
    pub fn options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Build a tree rooted at `root`.
    pub fn build(mut self, root: &ComponentRef) -> Result<Tree> {
        let start = Instant::now();
        let prev = self.prev.map(Tree::root);
        let slot = Slot {
            parent: None,
            prev,
            displayed: true,
        };
        self.component(root.clone(), slot, None, 0)?;
        let mut tree = self
            .tree
            .take()
            .ok_or_else(|| Error::Internal("build produced no nodes".into()))?;
        tree.components = self.components;
        debug!(
            component = root.name(),
            nodes = tree.len(),
            elapsed = ?start.elapsed(),
            "built tree"
        );
        Ok(tree)
    }

    /// Render, parse and build a component. `host` is the element that
    /// referenced the component, whose attributes override the root's.
    fn component(
        &mut self,
        component: ComponentRef,
        slot: Slot,
        host: Option<Element>,
        depth: usize,
    ) -> Result<NodeId> {
        if depth > MAX_NESTING {
            return Err(Error::Internal(format!(
                "component nesting deeper than {MAX_NESTING} at {}",
                component.name()
            )));
        }
        let owner = Owner::new(component, depth);
        let (fields, ui) = {
            let c = owner.component.borrow();
            (c.fields(), c.ui())
        };
        let template_error = |source| Error::Template {
            component: owner.name.to_string(),
            source,
        };
        let fields = fields.map_err(|e| {
            template_error(TemplateError::new(format!("serializing fields: {e}"), 0))
        })?;
        let markup = self
            .templates
            .get(&ui)
            .and_then(|t| t.render(&fields))
            .map_err(template_error)?;
        let mut el = markup::parse(&markup).map_err(|source| Error::Parse {
            component: owner.name.to_string(),
            source,
        })?;
        let source_tag = match host {
            Some(host) => {
                el.attrs.extend(host.attrs);
                Some(host.tag)
            }
            None => None,
        };
        self.components.push(owner.component.clone());
        self.element(el, &owner, slot, source_tag)
    }

    /// Build an element owned by `owner`.
    fn element(
        &mut self,
        mut el: Element,
        owner: &Owner,
        slot: Slot,
        source_tag: Option<String>,
    ) -> Result<NodeId> {
        let source_tag = source_tag.unwrap_or_else(|| el.tag.clone());
        let mut style = None;
        if is_subcomponent(&el.tag) {
            match owner.component.resolve(&el.tag)? {
                Some(Subcomponent::Component(child)) => {
                    return self.component(child, slot, Some(el), owner.depth + 1);
                }
                Some(Subcomponent::Style(preset)) => {
                    if !is_primitive(&preset.extends) {
                        return Err(DispatchError::InvalidBase {
                            component: owner.name.to_string(),
                            tag: el.tag,
                            base: preset.extends,
                        }
                        .into());
                    }
                    let mut attrs = preset.preset.clone();
                    attrs.append(&mut el.attrs);
                    el.attrs = attrs;
                    el.tag = preset.extends.clone();
                    style = Some(preset);
                }
                None => {
                    return Err(DispatchError::Unresolved {
                        component: owner.name.to_string(),
                        tag: el.tag,
                    }
                    .into());
                }
            }
        }
        self.check_handlers(&el, owner)?;

        let mut resolved = Style::from_attrs(&el.tag, &el.attrs)?;
        if let Some(preset) = style {
            resolved.extends = preset.extends;
            resolved.preset = preset.preset;
        }
        let displayed = slot.displayed && resolved.is_visible();

        let mut node = Node::new(&el.tag);
        node.source_tag = source_tag;
        node.attrs = el.attrs;
        node.content = el.content;
        node.style = resolved;
        node.owner = owner.component.downgrade();
        node.owner_type = owner.ty;
        node.owner_name = owner.name;
        node.debug = self.options.debug;
        node.displayed = displayed;

        // A previous node only counts if the same component type produced it.
        let counterpart = slot
            .prev
            .and_then(|p| self.prev.map(|t| (p, t)))
            .filter(|(p, t)| t.get(*p).is_some_and(|n| n.owner_type == owner.ty));
        self.migrate(&mut node, counterpart);
        let prev_children: Vec<NodeId> = counterpart
            .and_then(|(p, t)| t.get(p))
            .map(|n| n.children.clone())
            .unwrap_or_default();

        let id = match slot.parent {
            Some(parent) => self
                .tree
                .as_mut()
                .ok_or_else(|| Error::Internal("child built before its parent".into()))?
                .append(parent, node)?,
            None => {
                if self.tree.is_some() {
                    return Err(Error::Internal("second root node".into()));
                }
                let tree = Tree::new(node);
                let root = tree.root();
                self.tree = Some(tree);
                root
            }
        };

        for (i, child) in el.children.into_iter().enumerate() {
            let slot = Slot {
                parent: Some(id),
                prev: prev_children.get(i).copied(),
                displayed,
            };
            self.element(child, owner, slot, None)?;
        }
        Ok(id)
    }

    /// Every `on*` attribute must name a registered handler.
    fn check_handlers(&self, el: &Element, owner: &Owner) -> Result<()> {
        let c = owner.component.borrow();
        for (attr, handler) in &el.attrs {
            let is_event = attr
                .strip_prefix("on")
                .is_some_and(|rest| rest.starts_with(|ch: char| ch.is_ascii_uppercase()));
            if is_event && !handler.is_empty() && find_handler(&*c, handler).is_none() {
                return Err(DispatchError::MissingHandler {
                    component: owner.name.to_string(),
                    attr: attr.clone(),
                    handler: handler.clone(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Carry state from the counterpart node if the tags match, or seed
    /// fresh state for the tag.
    fn migrate(&self, node: &mut Node, counterpart: Option<(NodeId, &Tree)>) {
        let prev = counterpart.and_then(|(p, t)| {
            t.get(p)
                .filter(|n| n.tag == node.tag)
                .map(|n| (p, n))
        });
        let Some((pid, prev)) = prev else {
            if node.is_editable() {
                node.editable = Some(Editable::at_end(node.value()));
            }
            if node.is_scrollable() {
                node.scrollable = Some(Scrollable::default());
            }
            return;
        };
        let state = self.state;
        node.interaction = state
            .and_then(|s| s.interaction.get(&pid).copied())
            .unwrap_or(prev.interaction);
        node.geometry = prev.geometry;
        if node.is_editable() {
            let mut ed = state
                .and_then(|s| s.editable.get(&pid).copied())
                .or(prev.editable)
                .unwrap_or_else(|| Editable::at_end(node.value()));
            ed.cursor = ed.cursor.min(node.value().chars().count());
            node.editable = Some(ed);
        }
        if node.is_scrollable() {
            node.scrollable = Some(
                state
                    .and_then(|s| s.scrollable.get(&pid).copied())
                    .or(prev.scrollable)
                    .unwrap_or_default(),
            );
        }
        trace!(tag = %node.tag, interaction = ?node.interaction, "migrated node state");
    }
}

/// Build a tree for `root`, reconciling against `prev`.
pub fn build(root: &ComponentRef, prev: Option<&Tree>, options: &BuildOptions) -> Result<Tree> {
    let mut templates = TemplateCache::default();
    Builder::new(&mut templates)
        .prev(prev)
        .options(*options)
        .build(root)
}
