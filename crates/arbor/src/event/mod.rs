//! Input snapshots and the event records passed to handlers.

use std::fmt;

/// Polled device state.
mod input;
/// Keys.
pub mod key;

pub use input::InputSnapshot;
pub use key::Key;

use crate::node::Node;

/// Kinds of events delivered to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// The primary button was released over a pressed node.
    Click,
    /// The pointer entered a node.
    Hover,
    /// The value of a focused input changed.
    Change,
    /// Sent every frame to nodes that ask for it.
    Update,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [Self; 4] = [Self::Click, Self::Hover, Self::Change, Self::Update];

    /// The attribute naming the handler for this kind, e.g. `onClick`.
    pub fn attr(&self) -> &'static str {
        match self {
            Self::Click => "onClick",
            Self::Hover => "onHover",
            Self::Change => "onChange",
            Self::Update => "onUpdate",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Click => "Click",
            Self::Hover => "Hover",
            Self::Change => "Change",
            Self::Update => "Update",
        };
        f.write_str(name)
    }
}

/// An event record passed to a handler.
#[derive(Debug, Clone)]
pub struct Event<'a> {
    /// Pointer x, relative to the node's inner origin.
    pub x: i32,
    /// Pointer y, relative to the node's inner origin.
    pub y: i32,
    /// Event kind.
    pub kind: EventKind,
    /// Associated value, e.g. the edited text for Change.
    pub value: String,
    /// The target node, in the tree the event was raised against.
    pub node: &'a Node,
}
