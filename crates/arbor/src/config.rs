use std::time::Duration;

use serde::{Deserialize, Serialize};

/// When the driver rebuilds the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RebuildPolicy {
    /// Rebuild every frame.
    #[default]
    EveryFrame,
    /// Rebuild only after a handler ran, the input changed, or debug was
    /// toggled.
    OnChange,
}

/// Driver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Builds slower than this are logged as a warning.
    pub build_budget_ms: u64,
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Initial state of the debug overlay.
    pub debug: bool,
    /// The key that, with Ctrl, toggles the debug overlay.
    pub debug_key: char,
    /// Rebuild policy.
    pub rebuild: RebuildPolicy,
    /// Default font size in pixels.
    pub font_size: f32,
    /// Maximum number of rasterized glyphs kept.
    pub glyph_cache_capacity: usize,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_budget_ms: 10,
            width: 640,
            height: 480,
            debug: false,
            debug_key: 'd',
            rebuild: RebuildPolicy::EveryFrame,
            font_size: 16.0,
            glyph_cache_capacity: 1024,
            line_height: 1.2,
        }
    }
}

impl Config {
    /// The build time budget.
    pub fn build_budget(&self) -> Duration {
        Duration::from_millis(self.build_budget_ms)
    }
}
