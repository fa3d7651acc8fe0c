//! Arbor: a retained-mode UI tree rebuilt from markup every frame.
//!
//! Components render markup templates against their own fields. Each frame
//! the tree is rebuilt from that markup, reconciled against the previous
//! frame's tree so interaction state survives, laid out, and painted.
//! Uppercase tags in markup resolve to subcomponents or style aliases
//! through capabilities registered on the owning component, and `on*`
//! attributes name handler methods that receive input events.
//!
//! # Quick Start
//!
//! The main entry points are:
//! - [`Component`] - The trait implemented by everything that renders markup
//! - [`derive_component`] - Registers `#[handler]` and `#[subcomponent]` methods
//! - [`Driver`] - Runs frames: input, dispatch, rebuild, layout
//!
//! # Module Organization
//!
//! - [`build`] - Tree construction and state migration
//! - [`dispatch`] - Input interpretation and handler invocation
//! - [`template`] and [`markup`] - The markup pipeline
//! - [`style`], [`layout`], [`text`], [`draw`] - Collaborators that make
//!   the tree visible

#![warn(missing_docs)]

// Allow derive macros to reference `arbor::` from within this crate
extern crate self as arbor;

pub use anyhow;
pub use arbor_derive::{derive_component, handler, subcomponent};
pub use geom;

/// Tree construction.
pub mod build;
/// Component capability contract.
pub mod component;
/// Driver configuration.
pub mod config;
/// Input interpretation and handler dispatch.
pub mod dispatch;
/// Painting.
pub mod draw;
/// The frame driver.
pub mod driver;
/// Textual tree dumps.
pub mod dump;
/// Error types.
pub mod error;
/// Input and event records.
pub mod event;
/// Layout.
pub mod layout;
/// The markup parser.
pub mod markup;
/// Tree nodes.
pub mod node;
/// Styles.
pub mod style;
/// Test harness.
pub mod testing;
/// The template language.
pub mod template;
/// Text measurement and drawing.
pub mod text;
/// The node tree.
pub mod tree;

pub use build::{BuildOptions, Builder, FrameState, build};
pub use component::{
    Component, ComponentRef, Dispatch, HandlerArg, HandlerError, IntoSubcomponent, Subcomponent,
};
pub use config::{Config, RebuildPolicy};
pub use driver::{Driver, FrameReport};
pub use error::{DispatchError, Error, Result};
pub use event::{Event, EventKind, InputSnapshot, Key};
pub use node::{Editable, Geometry, Interaction, Node, NodeId, Scrollable};
pub use style::{Color, Style};
pub use tree::{Tree, Walk};
