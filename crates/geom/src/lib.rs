//! Pixel geometry primitives used across arbor.

/// Error types for geometry operations.
mod error;
/// Width/height size type.
mod expanse;
/// Edge insets for margins, padding and borders.
mod insets;
/// Point helpers.
mod point;
/// Rectangle operations.
mod rect;

pub use error::{Error, Result};
pub use expanse::Expanse;
pub use insets::Insets;
pub use point::Point;
pub use rect::Rect;
