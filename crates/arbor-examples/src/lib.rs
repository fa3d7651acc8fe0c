//! Example components used by arbor demos.

/// Form example component.
pub mod form;
/// Headless driving and snapshots.
pub mod headless;
/// Pager example components.
pub mod pager;

#[cfg(test)]
mod tests;
