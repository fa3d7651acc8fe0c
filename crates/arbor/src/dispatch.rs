//! Turning polled input into handler calls.
//!
//! Input is interpreted against the previous frame's tree. This produces a
//! [`FrameState`] overlay of derived node state (interaction, focus,
//! cursor, scroll) that the next build migrates, and a list of pending
//! events that are dispatched to their owning components before that build
//! starts.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::{
    build::FrameState,
    component::HandlerArg,
    error::{DispatchError, Result},
    event::{Event, EventKind, InputSnapshot, Key},
    geom::Point,
    node::{Editable, Interaction, Node, NodeId},
    tree::Tree,
};

/// An event raised against a tree, waiting to be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    /// Target node.
    pub node: NodeId,
    /// Event kind.
    pub kind: EventKind,
    /// Associated value.
    pub value: String,
    /// Pointer position in viewport coordinates.
    pub pointer: Point,
}

/// The result of interpreting one input snapshot.
#[derive(Debug, Default)]
pub struct Derived {
    /// Derived node state, keyed by node in the interpreted tree.
    pub state: FrameState,
    /// Events in pre-order, at most one per node and kind.
    pub events: Vec<Pending>,
}

impl Derived {
    /// Did the input change anything?
    pub fn is_dirty(&self) -> bool {
        !self.events.is_empty() || !self.state.is_empty()
    }
}

/// Does the node declare a handler for `kind`?
fn handles(node: &Node, kind: EventKind) -> bool {
    node.attr(kind.attr()).is_some_and(|h| !h.is_empty())
}

/// Apply newly pressed keys and typed text to a value. Returns the edited
/// value and cursor.
fn edit(
    value: &str,
    cursor: usize,
    multiline: bool,
    pressed: &BTreeSet<Key>,
    text: &str,
) -> (String, usize) {
    let mut chars: Vec<char> = value.chars().collect();
    let mut cursor = cursor.min(chars.len());
    for key in pressed {
        match key {
            Key::Left => cursor = cursor.saturating_sub(1),
            Key::Right => cursor = (cursor + 1).min(chars.len()),
            Key::Home => cursor = 0,
            Key::End => cursor = chars.len(),
            Key::Backspace if cursor > 0 => {
                cursor -= 1;
                chars.remove(cursor);
            }
            Key::Delete if cursor < chars.len() => {
                chars.remove(cursor);
            }
            Key::Enter if multiline => {
                chars.insert(cursor, '\n');
                cursor += 1;
            }
            _ => {}
        }
    }
    for c in text.chars() {
        let keep = if c == '\n' { multiline } else { !c.is_control() };
        if keep {
            chars.insert(cursor, c);
            cursor += 1;
        }
    }
    (chars.into_iter().collect(), cursor)
}

/// Interpret `now` against `tree`. `prev` is the snapshot from the previous
/// frame, used to find button and key transitions.
pub fn derive(tree: &Tree, now: &InputSnapshot, prev: &InputSnapshot) -> Derived {
    let mut out = Derived::default();
    let pointer = now.pointer.unwrap_or_default();
    let hit = now.pointer.and_then(|p| tree.locate(p));
    // The hit node and its ancestors, nearest first.
    let path: Vec<NodeId> = hit
        .into_iter()
        .chain(hit.into_iter().flat_map(|h| tree.ancestors(h)))
        .collect();
    let over: HashSet<NodeId> = path.iter().copied().collect();
    let pressed = now.button && !prev.button;
    let released = prev.button && !now.button;
    let enabled = |id: &NodeId| tree.get(*id).is_some_and(|n| !n.style().disabled);

    // Clicks go to the nearest enabled node with a click handler, if it
    // was pressed.
    let clicked = released
        .then(|| {
            path.iter().copied().filter(enabled).find(|id| {
                tree[*id].interaction() == Interaction::Active && handles(&tree[*id], EventKind::Click)
            })
        })
        .flatten();

    // A press moves focus to the nearest editable node under the pointer,
    // or clears it.
    let focus_target = pressed.then(|| {
        path.iter()
            .copied()
            .filter(enabled)
            .find(|id| tree[*id].is_editable())
    });
    let scroll_target = (now.wheel != 0)
        .then(|| path.iter().copied().find(|id| tree[*id].scrollable().is_some()))
        .flatten();
    let keys = now.pressed_since(prev);
    let typing = !now.held(Key::Ctrl) && !now.held(Key::Alt);

    tree.visit(&mut |_, id, node| {
        // Hidden nodes are never under the pointer, so they fall back to
        // Idle and lose focus like any other node.
        let interaction = match (over.contains(&id), now.button) {
            (true, true) => Interaction::Active,
            (true, false) => Interaction::Hover,
            (false, _) => Interaction::Idle,
        };
        if interaction != node.interaction() {
            out.state.interaction.insert(id, interaction);
        }
        let mut editable = node.editable();
        if let (Some(ed), Some(target)) = (editable.as_mut(), focus_target) {
            let focused = target == Some(id);
            if focused != ed.focused {
                ed.focused = focused;
                out.state.editable.insert(id, *ed);
            }
        }
        if !node.is_displayed() {
            return;
        }
        let disabled = node.style().disabled;
        let event = |kind, value: String| Pending {
            node: id,
            kind,
            value,
            pointer,
        };

        if clicked == Some(id) {
            out.events.push(event(EventKind::Click, node.value().to_string()));
        }
        if !disabled
            && node.interaction() == Interaction::Idle
            && interaction != Interaction::Idle
            && handles(node, EventKind::Hover)
        {
            out.events.push(event(EventKind::Hover, String::new()));
        }

        if let Some(ed) = editable
            && ed.focused
            && !disabled
            && (!keys.is_empty() || (typing && !now.text.is_empty()))
        {
            let text = if typing { now.text.as_str() } else { "" };
            let multiline = node.tag() == "textarea";
            let (value, cursor) = edit(node.value(), ed.cursor, multiline, &keys, text);
            let next = Editable { cursor, ..ed };
            if next != ed {
                out.state.editable.insert(id, next);
            }
            if value != node.value() && handles(node, EventKind::Change) {
                out.events.push(event(EventKind::Change, value));
            }
        }

        if scroll_target == Some(id)
            && let Some(mut s) = node.scrollable()
        {
            s.scroll(now.wheel);
            if Some(s) != node.scrollable() {
                out.state.scrollable.insert(id, s);
            }
        }

        if handles(node, EventKind::Update) {
            out.events.push(event(EventKind::Update, String::new()));
        }
    });
    out
}

/// Invoke each pending event's handler on the component that owns its
/// node. Returns the number of handlers run.
pub fn dispatch(tree: &Tree, events: &[Pending]) -> Result<usize> {
    let mut count = 0;
    for pending in events {
        let Some(node) = tree.get(pending.node) else {
            continue;
        };
        let attr = pending.kind.attr();
        let Some(handler) = node.attr(attr).filter(|h| !h.is_empty()) else {
            continue;
        };
        let owner = node
            .owner()
            .upgrade()
            .ok_or_else(|| DispatchError::DroppedOwner {
                tag: node.tag().to_string(),
            })?;
        let origin = node.geometry().inner.tl;
        let local = pending.pointer - origin;
        let event = Event {
            x: local.x,
            y: local.y,
            kind: pending.kind,
            value: pending.value.clone(),
            node,
        };
        debug!(
            component = node.owner_name(),
            handler,
            kind = %pending.kind,
            "dispatching event"
        );
        owner.invoke(attr, handler, HandlerArg::Event(&event))?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        geom::Rect,
        node::{Geometry, Scrollable},
        style::Style,
    };

    /// col(0,0,100,100) > [button(0,0,50,20) onClick, input(0,20,50,20), p(0,40,50,20)]
    fn tree() -> (Tree, Vec<NodeId>) {
        let node = |tag: &str, attrs: &[(&str, &str)], r: Rect| {
            let mut n = Node::new(tag);
            n.attrs = attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            n.style = Style::from_attrs(tag, &n.attrs).unwrap();
            n.geometry = Geometry {
                content: r,
                inner: r,
                outer: r,
            };
            if n.is_editable() {
                n.editable = Some(Editable::at_end(n.value()));
            }
            if n.is_scrollable() {
                n.scrollable = Some(Scrollable {
                    lines: 10,
                    visible: 2,
                    ..Default::default()
                });
            }
            n
        };
        let mut t = Tree::new(node("col", &[], Rect::new(0, 0, 100, 100)));
        let root = t.root();
        let button = t
            .append(
                root,
                node(
                    "button",
                    &[("onClick", "Next"), ("onHover", "Peek")],
                    Rect::new(0, 0, 50, 20),
                ),
            )
            .unwrap();
        let input = t
            .append(
                root,
                node(
                    "input",
                    &[("value", "hey"), ("onChange", "Edit")],
                    Rect::new(0, 20, 50, 20),
                ),
            )
            .unwrap();
        let p = t
            .append(root, node("p", &[], Rect::new(0, 40, 50, 20)))
            .unwrap();
        (t, vec![root, button, input, p])
    }

    /// Apply derived state to a tree, as a rebuild would.
    fn apply(t: &mut Tree, d: &Derived) {
        for (id, i) in &d.state.interaction {
            t.get_mut(*id).unwrap().interaction = *i;
        }
        for (id, e) in &d.state.editable {
            t.get_mut(*id).unwrap().editable = Some(*e);
        }
        for (id, s) in &d.state.scrollable {
            t.get_mut(*id).unwrap().scrollable = Some(*s);
        }
    }

    fn kinds(d: &Derived) -> Vec<(NodeId, EventKind)> {
        d.events.iter().map(|e| (e.node, e.kind)).collect()
    }

    #[test]
    fn hover_press_click() {
        let (mut t, ids) = tree();
        let idle = InputSnapshot::new();
        let over = InputSnapshot::new().at(10, 10);
        let d = derive(&t, &over, &idle);
        assert_eq!(d.state.interaction[&ids[1]], Interaction::Hover);
        assert_eq!(d.state.interaction[&ids[0]], Interaction::Hover);
        assert_eq!(kinds(&d), vec![(ids[1], EventKind::Hover)]);
        apply(&mut t, &d);

        // Holding still over the button raises nothing new.
        let d = derive(&t, &over, &over);
        assert!(!d.is_dirty());

        let down = over.clone().button(true);
        let d = derive(&t, &down, &over);
        assert_eq!(d.state.interaction[&ids[1]], Interaction::Active);
        assert!(d.events.is_empty());
        apply(&mut t, &d);

        let d = derive(&t, &over, &down);
        assert_eq!(kinds(&d), vec![(ids[1], EventKind::Click)]);
        apply(&mut t, &d);
        let d = derive(&t, &over, &over);
        assert!(d.events.is_empty());
    }

    #[test]
    fn release_elsewhere_does_not_click() {
        let (mut t, ids) = tree();
        let down = InputSnapshot::new().at(10, 10).button(true);
        let d = derive(&t, &down, &InputSnapshot::new().at(10, 10));
        apply(&mut t, &d);
        assert_eq!(t[ids[1]].interaction(), Interaction::Active);
        let away = InputSnapshot::new().at(90, 90);
        let d = derive(&t, &away, &down);
        assert!(kinds(&d).iter().all(|(_, k)| *k != EventKind::Click));
    }

    #[test]
    fn focus_and_typing() {
        let (mut t, ids) = tree();
        let at = InputSnapshot::new().at(10, 30);
        let d = derive(&t, &at.clone().button(true), &at);
        assert!(d.state.editable[&ids[2]].focused);
        apply(&mut t, &d);

        let typed = at.clone().text("!");
        let d = derive(&t, &typed, &at);
        assert_eq!(d.events.len(), 1);
        assert_eq!(d.events[0].kind, EventKind::Change);
        assert_eq!(d.events[0].value, "hey!");
        assert_eq!(d.state.editable[&ids[2]].cursor, 4);

        let d = derive(&t, &at.clone().key(Key::Home), &at);
        assert_eq!(d.state.editable[&ids[2]].cursor, 0);
        assert!(d.events.is_empty());

        let d = derive(&t, &at.clone().key(Key::Backspace), &at);
        assert_eq!(d.events[0].value, "he");

        // Pressing elsewhere drops focus.
        let other = InputSnapshot::new().at(90, 90);
        let d = derive(&t, &other.clone().button(true), &other);
        assert!(!d.state.editable[&ids[2]].focused);
    }

    #[test]
    fn editing() {
        let none = BTreeSet::new();
        assert_eq!(edit("ab", 1, false, &none, "x"), ("axb".into(), 2));
        assert_eq!(edit("ab", 2, false, &none, "\n"), ("ab".into(), 2));
        let enter = BTreeSet::from([Key::Enter]);
        assert_eq!(edit("ab", 1, true, &enter, ""), ("a\nb".into(), 2));
        let del = BTreeSet::from([Key::Delete]);
        assert_eq!(edit("ab", 0, false, &del, ""), ("b".into(), 0));
        assert_eq!(edit("ab", 2, false, &del, ""), ("ab".into(), 2));
        let right = BTreeSet::from([Key::Right]);
        assert_eq!(edit("ab", 9, false, &right, ""), ("ab".into(), 2));
    }

    #[test]
    fn wheel_scrolls_under_pointer() {
        let (t, ids) = tree();
        let at = InputSnapshot::new().at(10, 50);
        let d = derive(&t, &at.clone().wheel(3), &at);
        let s = d.state.scrollable[&ids[3]];
        assert_eq!(s.line, 3);
        assert_eq!(s.position, 3.0 / 8.0);
        let d = derive(&t, &at.clone().wheel(-1), &at);
        assert!(d.state.scrollable.is_empty());
    }
}
