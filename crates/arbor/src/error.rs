use std::result::Result as StdResult;

use thiserror::Error;

use crate::{component::HandlerError, markup::ParseError, template::TemplateError};

/// Result type for arbor operations.
pub type Result<T> = StdResult<T, Error>;

/// Failures resolving a name against a component's registered capabilities.
#[derive(PartialEq, Eq, Error, Debug, Clone)]
pub enum DispatchError {
    /// A subcomponent tag has no capability with the same name.
    #[error("{component}: no capability for tag {tag}")]
    MissingCapability {
        /// Owning component type.
        component: String,
        /// The unresolved tag.
        tag: String,
    },
    /// A capability produced neither a style nor a component.
    #[error("{component}.{tag} must return either a Style or a Component")]
    Unresolved {
        /// Owning component type.
        component: String,
        /// The capability name.
        tag: String,
    },
    /// A style alias did not name a primitive base tag.
    #[error("{component}.{tag}: style alias extends invalid tag {base:?}")]
    InvalidBase {
        /// Owning component type.
        component: String,
        /// The capability name.
        tag: String,
        /// The declared base tag.
        base: String,
    },
    /// An event attribute names a handler the component does not register.
    #[error("{component} can't find {attr} handler named {handler:?}")]
    MissingHandler {
        /// Owning component type.
        component: String,
        /// The attribute carrying the handler name.
        attr: String,
        /// The handler name.
        handler: String,
    },
    /// The component that owns a node no longer exists.
    #[error("owner of <{tag}> has been dropped")]
    DroppedOwner {
        /// Tag of the orphaned node.
        tag: String,
    },
}

/// Core error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Template syntax or evaluation failure.
    #[error("{component}: template: {source}")]
    Template {
        /// Component whose template failed.
        component: String,
        /// Underlying template error.
        #[source]
        source: TemplateError,
    },
    /// Rendered markup could not be parsed.
    #[error("error building {component}: {source}")]
    Parse {
        /// Component whose markup failed to parse.
        component: String,
        /// Underlying parse error.
        #[source]
        source: ParseError,
    },
    /// Capability resolution failure.
    #[error("dispatch: {0}")]
    Dispatch(#[from] DispatchError),
    /// A handler or capability body failed.
    #[error("{component}.{handler}: {source}")]
    Handler {
        /// Component type.
        component: String,
        /// Handler or capability name.
        handler: String,
        /// Underlying failure.
        #[source]
        source: HandlerError,
    },
    /// Attribute could not be interpreted as style.
    #[error("style: {0}")]
    Style(String),
    /// Layout failure.
    #[error("layout: {0}")]
    Layout(String),
    /// Text measurement or font failure.
    #[error("text: {0}")]
    Text(String),
    /// Image loading failure.
    #[error("image: {0}")]
    Image(String),
    /// Internal error.
    #[error("internal: {0}")]
    Internal(String),
}

impl From<taffy::TaffyError> for Error {
    fn from(e: taffy::TaffyError) -> Self {
        Self::Layout(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e.to_string())
    }
}
