use std::{num::NonZeroUsize, rc::Rc};

use lru::LruCache;

/// Cache key for rasterized glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    /// Index of the font the glyph came from.
    pub font: usize,
    /// Source character for the glyph.
    pub ch: char,
    /// Pixel size for rasterization, as raw float bits.
    pub px_bits: u32,
}

impl GlyphKey {
    /// Construct a key.
    pub fn new(font: usize, ch: char, px: f32) -> Self {
        Self {
            font,
            ch,
            px_bits: px.to_bits(),
        }
    }
}

/// Glyph raster data rendered to pixel coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Rasterized coverage mask, row-major, 0-255 per pixel.
    pub bitmap: Vec<u8>,
    /// Glyph width in pixels.
    pub width: u32,
    /// Glyph height in pixels.
    pub height: u32,
    /// Offset of the bitmap's left edge from the pen position.
    pub xmin: i32,
    /// Offset of the bitmap's bottom edge above the baseline.
    pub ymin: i32,
    /// Horizontal advance width in pixels.
    pub advance: f32,
}

/// An LRU-bounded glyph cache. A glyph is rasterized at most once while it
/// stays resident.
pub struct GlyphCache {
    /// Resident glyphs.
    cache: LruCache<GlyphKey, Rc<Glyph>>,
    /// Number of rasterizations performed.
    misses: u64,
}

impl GlyphCache {
    /// Construct a cache holding at most `capacity` glyphs.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            misses: 0,
        }
    }

    /// Return the cached glyph for `key`, rasterizing it on a miss.
    pub fn get_or_rasterize(&mut self, key: GlyphKey, f: impl FnOnce() -> Glyph) -> Rc<Glyph> {
        if let Some(g) = self.cache.get(&key) {
            return Rc::clone(g);
        }
        self.misses += 1;
        let g = Rc::new(f());
        self.cache.put(key, Rc::clone(&g));
        g
    }

    /// Number of resident glyphs.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Is the cache empty?
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Number of rasterizations performed so far.
    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn glyph() -> Glyph {
        Glyph {
            bitmap: vec![255],
            width: 1,
            height: 1,
            xmin: 0,
            ymin: 0,
            advance: 1.0,
        }
    }

    #[test]
    fn rasterizes_once_per_window() {
        let mut c = GlyphCache::new(2);
        let a = GlyphKey::new(0, 'a', 12.0);
        let b = GlyphKey::new(0, 'b', 12.0);
        let big_a = GlyphKey::new(0, 'a', 24.0);
        c.get_or_rasterize(a, glyph);
        c.get_or_rasterize(a, glyph);
        assert_eq!(c.misses(), 1);
        c.get_or_rasterize(b, glyph);
        c.get_or_rasterize(big_a, glyph);
        assert_eq!(c.misses(), 3);
        assert_eq!(c.len(), 2);
        // 'a' at 12px was evicted.
        c.get_or_rasterize(a, glyph);
        assert_eq!(c.misses(), 4);
        assert_ne!(a, GlyphKey::new(1, 'a', 12.0));
    }
}
