//! Text measurement, wrapping and glyph drawing.

use crate::{draw::Canvas, geom::Rect, style::Color};

/// Bounded glyph raster cache.
mod cache;
/// fontdue-backed typesetter.
mod font;
/// Fixed-advance typesetter.
mod mono;
/// Word wrapping.
mod wrap;

pub use cache::{Glyph, GlyphCache, GlyphKey};
pub use font::FontTypesetter;
pub use mono::MonoTypesetter;
pub use wrap::wrap;

/// Measures text for layout.
pub trait TextMeasure {
    /// Horizontal advance of a character at a pixel size.
    fn advance(&mut self, c: char, size: f32) -> f32;

    /// Distance between baselines at a pixel size.
    fn line_height(&self, size: f32) -> f32;

    /// Width of a single line of text.
    fn measure(&mut self, s: &str, size: f32) -> f32 {
        s.chars().map(|c| self.advance(c, size)).sum()
    }
}

/// Draws text.
pub trait Typesetter: TextMeasure {
    /// Draw one line of text with its top-left corner at `(x, y)`, clipped
    /// to `clip`.
    fn draw_line(
        &mut self,
        canvas: &mut Canvas,
        text: &str,
        origin: (f32, f32),
        size: f32,
        color: Color,
        clip: Rect,
    );
}

/// Alignment of a text block within a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    /// Left or top.
    #[default]
    Start,
    /// Centered.
    Center,
    /// Right or bottom.
    End,
}

/// Offset that aligns `content` within `available`.
pub fn align_offset(content: f32, available: f32, align: TextAlign) -> f32 {
    let slack = (available - content).max(0.0);
    match align {
        TextAlign::Start => 0.0,
        TextAlign::Center => (slack / 2.0).floor(),
        TextAlign::End => slack,
    }
}

/// A block of wrapped lines and its measured extent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextBlock {
    /// The lines.
    pub lines: Vec<String>,
    /// Widest line, in pixels.
    pub width: f32,
    /// Line advance, in pixels.
    pub line_height: f32,
}

impl TextBlock {
    /// Wrap and measure text.
    pub fn layout(
        measure: &mut dyn TextMeasure,
        text: &str,
        size: f32,
        max_width: Option<f32>,
    ) -> Self {
        let lines = wrap(measure, text, size, max_width);
        let width = lines
            .iter()
            .map(|l| measure.measure(l, size))
            .fold(0.0, f32::max);
        Self {
            lines,
            width,
            line_height: measure.line_height(size),
        }
    }

    /// Total height of all lines.
    pub fn height(&self) -> f32 {
        self.lines.len().max(1) as f32 * self.line_height
    }

    /// How many whole lines fit in `height` pixels.
    pub fn visible_lines(&self, height: f32) -> usize {
        if self.line_height <= 0.0 {
            return self.lines.len();
        }
        ((height / self.line_height).floor() as usize).max(1)
    }
}

/// Options for drawing a text block.
#[derive(Debug, Clone, Copy)]
pub struct DrawText {
    /// Font size.
    pub size: f32,
    /// Color.
    pub color: Color,
    /// Horizontal alignment.
    pub h_align: TextAlign,
    /// Vertical alignment.
    pub v_align: TextAlign,
    /// Index of the first line to draw.
    pub first_line: usize,
}

/// Draw a block of text into `rect`, clipped to it.
pub fn draw_block(
    ts: &mut dyn Typesetter,
    canvas: &mut Canvas,
    block: &TextBlock,
    rect: Rect,
    opts: &DrawText,
) {
    let visible = &block.lines[opts.first_line.min(block.lines.len())..];
    let height = visible.len() as f32 * block.line_height;
    let mut y = rect.tl.y as f32 + align_offset(height, rect.h as f32, opts.v_align);
    for line in visible {
        if y >= rect.bottom() as f32 {
            break;
        }
        let w = ts.measure(line, opts.size);
        let x = rect.tl.x as f32 + align_offset(w, rect.w as f32, opts.h_align);
        ts.draw_line(canvas, line, (x, y), opts.size, opts.color, rect);
        y += block.line_height;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn alignment() {
        assert_eq!(align_offset(10.0, 30.0, TextAlign::Start), 0.0);
        assert_eq!(align_offset(10.0, 30.0, TextAlign::Center), 10.0);
        assert_eq!(align_offset(10.0, 30.0, TextAlign::End), 20.0);
        assert_eq!(align_offset(40.0, 30.0, TextAlign::End), 0.0);
    }

    #[test]
    fn blocks() {
        let mut m = MonoTypesetter::new(1.0);
        let b = TextBlock::layout(&mut m, "aaa bbb ccc", 10.0, Some(42.0));
        assert_eq!(b.lines, vec!["aaa bbb", "ccc"]);
        assert_eq!(b.width, 42.0);
        assert_eq!(b.height(), 20.0);
        assert_eq!(b.visible_lines(25.0), 2);
        assert_eq!(b.visible_lines(5.0), 1);
    }
}
