use super::{TextMeasure, Typesetter};
use crate::{
    draw::{Canvas, fill_rect},
    geom::Rect,
    style::Color,
};

/// Advance of every character, as a fraction of the font size.
const ADVANCE: f32 = 0.6;

/// A typesetter with a fixed advance per character that needs no font
/// file. Glyphs are drawn as solid boxes, which keeps output deterministic.
#[derive(Debug, Clone)]
pub struct MonoTypesetter {
    /// Line height as a multiple of the font size.
    line_height: f32,
}

impl MonoTypesetter {
    /// Construct a typesetter.
    pub fn new(line_height: f32) -> Self {
        Self { line_height }
    }
}

impl Default for MonoTypesetter {
    fn default() -> Self {
        Self::new(1.2)
    }
}

impl TextMeasure for MonoTypesetter {
    fn advance(&mut self, c: char, size: f32) -> f32 {
        if c.is_control() {
            0.0
        } else {
            (size * ADVANCE).round()
        }
    }

    fn line_height(&self, size: f32) -> f32 {
        (size * self.line_height).round()
    }
}

impl Typesetter for MonoTypesetter {
    fn draw_line(
        &mut self,
        canvas: &mut Canvas,
        text: &str,
        origin: (f32, f32),
        size: f32,
        color: Color,
        clip: Rect,
    ) {
        let (mut x, y) = origin;
        let top = (y + size * 0.2).round() as i32;
        let h = (size * 0.7).round() as u32;
        for c in text.chars() {
            let adv = self.advance(c, size);
            if !c.is_whitespace() {
                let glyph = Rect::new(x.round() as i32 + 1, top, (adv as u32).saturating_sub(2), h);
                if let Some(r) = glyph.intersect(&clip) {
                    fill_rect(canvas, r, color);
                }
            }
            x += adv;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn metrics() {
        let mut m = MonoTypesetter::new(1.5);
        assert_eq!(m.advance('x', 10.0), 6.0);
        assert_eq!(m.measure("héllo", 10.0), 30.0);
        assert_eq!(m.line_height(10.0), 15.0);
    }

    #[test]
    fn draws_inside_clip() {
        let mut m = MonoTypesetter::default();
        let mut c = Canvas::new(20, 20);
        m.draw_line(
            &mut c,
            "ab",
            (0.0, 0.0),
            10.0,
            Color::BLACK,
            Rect::new(0, 0, 6, 20),
        );
        assert_eq!(c.get_pixel(2, 5).0, [0, 0, 0, 255]);
        assert_eq!(c.get_pixel(8, 5).0, [0, 0, 0, 0]);
    }
}
