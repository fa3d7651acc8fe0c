use std::rc::Rc;

use fontdue::{Font, FontSettings, LineMetrics};

use super::{
    TextMeasure, Typesetter,
    cache::{Glyph, GlyphCache, GlyphKey},
};
use crate::{
    draw::{Canvas, blend_pixel},
    error::{Error, Result},
    geom::Rect,
    style::Color,
};

/// A typesetter backed by one or more TrueType/OpenType fonts. Characters
/// missing from the primary font fall back to later fonts in order.
pub struct FontTypesetter {
    /// Loaded fonts, primary first.
    fonts: Vec<Font>,
    /// Rasterized glyphs.
    cache: GlyphCache,
    /// Line height as a multiple of the font size.
    line_height: f32,
}

impl FontTypesetter {
    /// Load a typesetter from font bytes.
    pub fn from_bytes(data: impl AsRef<[u8]>, cache_capacity: usize, line_height: f32) -> Result<Self> {
        let font = Font::from_bytes(data.as_ref(), FontSettings::default())
            .map_err(|e| Error::Text(format!("font load: {e}")))?;
        Ok(Self {
            fonts: vec![font],
            cache: GlyphCache::new(cache_capacity),
            line_height,
        })
    }

    /// Add a fallback font.
    pub fn with_fallback(mut self, data: impl AsRef<[u8]>) -> Result<Self> {
        let font = Font::from_bytes(data.as_ref(), FontSettings::default())
            .map_err(|e| Error::Text(format!("font load: {e}")))?;
        self.fonts.push(font);
        Ok(self)
    }

    /// The glyph cache.
    pub fn cache(&self) -> &GlyphCache {
        &self.cache
    }

    /// The index of the first font that has `c`, or the primary font.
    fn font_for(&self, c: char) -> usize {
        self.fonts
            .iter()
            .position(|f| f.has_glyph(c))
            .unwrap_or(0)
    }

    /// Line metrics of the primary font.
    fn line_metrics(&self, size: f32) -> LineMetrics {
        self.fonts[0]
            .horizontal_line_metrics(size)
            .unwrap_or(LineMetrics {
                ascent: size * 0.8,
                descent: -size * 0.2,
                line_gap: 0.0,
                new_line_size: size,
            })
    }

    /// Return a cached glyph raster.
    fn glyph(&mut self, c: char, size: f32) -> Rc<Glyph> {
        let font = self.font_for(c);
        let key = GlyphKey::new(font, c, size);
        let fonts = &self.fonts;
        self.cache.get_or_rasterize(key, || {
            let (metrics, bitmap) = fonts[font].rasterize(c, size);
            Glyph {
                bitmap,
                width: metrics.width as u32,
                height: metrics.height as u32,
                xmin: metrics.xmin,
                ymin: metrics.ymin,
                advance: metrics.advance_width,
            }
        })
    }
}

impl TextMeasure for FontTypesetter {
    fn advance(&mut self, c: char, size: f32) -> f32 {
        if c.is_control() {
            return 0.0;
        }
        let font = self.font_for(c);
        self.fonts[font].metrics(c, size).advance_width
    }

    fn line_height(&self, size: f32) -> f32 {
        (size * self.line_height).max(self.line_metrics(size).new_line_size).ceil()
    }
}

impl Typesetter for FontTypesetter {
    fn draw_line(
        &mut self,
        canvas: &mut Canvas,
        text: &str,
        origin: (f32, f32),
        size: f32,
        color: Color,
        clip: Rect,
    ) {
        let (mut pen, y) = origin;
        let lm = self.line_metrics(size);
        let leading = (self.line_height(size) - (lm.ascent - lm.descent)).max(0.0) / 2.0;
        let baseline = (y + leading + lm.ascent).round() as i32;
        for c in text.chars() {
            if c.is_control() {
                continue;
            }
            let g = self.glyph(c, size);
            let left = pen.round() as i32 + g.xmin;
            let top = baseline - g.ymin - g.height as i32;
            for row in 0..g.height {
                for col in 0..g.width {
                    let coverage = g.bitmap[(row * g.width + col) as usize];
                    if coverage == 0 {
                        continue;
                    }
                    let (px, py) = (left + col as i32, top + row as i32);
                    if clip.contains_point((px, py)) {
                        blend_pixel(canvas, px, py, color.with_coverage(coverage));
                    }
                }
            }
            pen += g.advance;
        }
    }
}
