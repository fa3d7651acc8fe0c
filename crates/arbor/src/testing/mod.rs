/// Scripted-input harness for driving components in tests.
pub mod harness;

pub use harness::{Harness, HarnessBuilder};
