//! Painting a laid-out tree into an RGBA image.

use std::collections::HashMap;

use image::{RgbaImage, imageops};
use tracing::warn;

use crate::{
    component::HandlerArg,
    error::{DispatchError, Result},
    geom::{Insets, Rect},
    node::{Interaction, Node},
    style::Color,
    text::{DrawText, TextAlign, TextBlock, Typesetter, draw_block},
    tree::{Tree, Walk},
};

/// The drawing surface.
pub type Canvas = RgbaImage;

/// Debug overlay colors for the outer, inner and content boxes.
const DEBUG_OUTER: Color = crate::rgb!("#ff00ff");
/// Inner box overlay.
const DEBUG_INNER: Color = crate::rgb!("#00aa00");
/// Content box overlay.
const DEBUG_CONTENT: Color = crate::rgb!("#0066ff");
/// Font size of debug labels.
const DEBUG_LABEL_SIZE: f32 = 10.0;

/// Composite a color over one pixel. Out-of-bounds pixels are ignored.
pub fn blend_pixel(canvas: &mut Canvas, x: i32, y: i32, color: Color) {
    if x < 0 || y < 0 || x as u32 >= canvas.width() || y as u32 >= canvas.height() {
        return;
    }
    let px = canvas.get_pixel_mut(x as u32, y as u32);
    *px = color.over(Color::from(*px)).into();
}

/// The part of `r` that lies on the canvas.
fn on_canvas(canvas: &Canvas, r: Rect) -> Option<Rect> {
    r.intersect(&Rect::new(0, 0, canvas.width(), canvas.height()))
}

/// Composite a color over a rectangle, clipped to the canvas.
pub fn fill_rect(canvas: &mut Canvas, r: Rect, color: Color) {
    if color.a == 0 {
        return;
    }
    let Some(r) = on_canvas(canvas, r) else {
        return;
    };
    for y in r.tl.y..r.bottom() {
        for x in r.tl.x..r.right() {
            blend_pixel(canvas, x, y, color);
        }
    }
}

/// Draw a rectangle outline `width` pixels wide, inside `r`.
pub fn stroke_rect(canvas: &mut Canvas, r: Rect, width: u32, color: Color) {
    if width == 0 || r.is_zero() {
        return;
    }
    let w = width.min(r.w).min(r.h);
    let inner = r.shrink(Insets::all(w));
    fill_rect(canvas, Rect::new(r.tl.x, r.tl.y, r.w, w), color);
    fill_rect(canvas, Rect::new(r.tl.x, r.bottom() - w as i32, r.w, w), color);
    fill_rect(canvas, Rect::new(r.tl.x, inner.tl.y, w, inner.h), color);
    fill_rect(canvas, Rect::new(r.right() - w as i32, inner.tl.y, w, inner.h), color);
}

/// Paints trees. Keeps decoded images between frames.
#[derive(Default)]
pub struct Painter {
    /// Decoded `img` sources. Failed loads are remembered as `None`.
    images: HashMap<String, Option<RgbaImage>>,
}

impl Painter {
    /// Construct a painter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Paint every displayed node of `tree` in pre-order, so children draw
    /// over their parents.
    pub fn paint(
        &mut self,
        tree: &Tree,
        ts: &mut dyn Typesetter,
        canvas: &mut Canvas,
        font_size: f32,
    ) -> Result<()> {
        tree.preorder(&mut |_, node| {
            if !node.is_displayed() {
                return Ok(Walk::<()>::Skip);
            }
            self.node(node, ts, canvas, font_size)?;
            Ok(Walk::Continue)
        })?;
        Ok(())
    }

    /// Paint one node.
    fn node(
        &mut self,
        node: &Node,
        ts: &mut dyn Typesetter,
        canvas: &mut Canvas,
        font_size: f32,
    ) -> Result<()> {
        let style = node.style();
        let geom = node.geometry();
        let background = match (node.interaction(), style.disabled) {
            (Interaction::Active, false) => style.active.or(style.hover).or(style.background),
            (Interaction::Hover, false) => style.hover.or(style.background),
            _ => style.background,
        };
        if let Some(bg) = background {
            fill_rect(canvas, geom.inner, bg);
        }
        if let Some(border) = style.border {
            stroke_rect(canvas, geom.inner, border.width, border.color);
        }

        let size = style.font_size.unwrap_or(font_size);
        let opts = DrawText {
            size,
            color: style.color,
            h_align: TextAlign::Start,
            v_align: TextAlign::Start,
            first_line: 0,
        };
        let content = geom.content;
        match node.tag() {
            "text" | "button" => {
                let block = TextBlock::layout(ts, node.content(), size, None);
                let opts = DrawText {
                    h_align: TextAlign::Center,
                    v_align: TextAlign::Center,
                    ..opts
                };
                draw_block(ts, canvas, &block, content, &opts);
            }
            "p" => {
                let block = TextBlock::layout(ts, node.content(), size, Some(content.w as f32));
                let first_line = node.scrollable().map_or(0, |s| s.line);
                let opts = DrawText { first_line, ..opts };
                draw_block(ts, canvas, &block, content, &opts);
            }
            "input" => self.input(node, ts, canvas, &opts),
            "textarea" => self.textarea(node, ts, canvas, &opts),
            "img" => self.image(node, canvas),
            "canvas" => canvas_node(node, canvas)?,
            _ => {}
        }

        if node.debug() {
            debug_overlay(node, ts, canvas);
        }
        Ok(())
    }

    /// A single-line input with its cursor.
    fn input(&self, node: &Node, ts: &mut dyn Typesetter, canvas: &mut Canvas, opts: &DrawText) {
        let content = node.geometry().content;
        let value = node.value();
        let block = TextBlock {
            lines: vec![value.to_string()],
            width: ts.measure(value, opts.size),
            line_height: ts.line_height(opts.size),
        };
        let opts = DrawText {
            v_align: TextAlign::Center,
            ..*opts
        };
        draw_block(ts, canvas, &block, content, &opts);
        if let Some(ed) = node.editable()
            && ed.focused
        {
            let prefix: String = value.chars().take(ed.cursor).collect();
            let x = content.tl.x + ts.measure(&prefix, opts.size).round() as i32;
            let h = (block.line_height as u32).min(content.h);
            let y = content.tl.y + (content.h.saturating_sub(h) / 2) as i32;
            cursor(canvas, content, x, y, h, opts.color);
        }
    }

    /// A wrapped, scrollable text area with its cursor.
    fn textarea(&self, node: &Node, ts: &mut dyn Typesetter, canvas: &mut Canvas, opts: &DrawText) {
        let content = node.geometry().content;
        let value = node.value();
        let width = Some(content.w as f32);
        let block = TextBlock::layout(ts, value, opts.size, width);
        let first_line = node.scrollable().map_or(0, |s| s.line);
        let opts = DrawText {
            first_line,
            ..*opts
        };
        draw_block(ts, canvas, &block, content, &opts);
        if let Some(ed) = node.editable()
            && ed.focused
        {
            let prefix: String = value.chars().take(ed.cursor).collect();
            let before = TextBlock::layout(ts, &prefix, opts.size, width);
            let line = before.lines.len().saturating_sub(1);
            if prefix.ends_with('\n') {
                // The cursor sits at the start of a fresh line.
                let y = content.tl.y
                    + ((line + 1).saturating_sub(first_line) as f32 * block.line_height) as i32;
                cursor(canvas, content, content.tl.x, y, block.line_height as u32, opts.color);
                return;
            }
            if line < first_line {
                return;
            }
            let last = before.lines.last().map_or("", String::as_str);
            let x = content.tl.x + ts.measure(last, opts.size).round() as i32;
            let y = content.tl.y + ((line - first_line) as f32 * block.line_height) as i32;
            cursor(canvas, content, x, y, block.line_height as u32, opts.color);
        }
    }

    /// An image loaded from the `src` attribute, drawn at its natural size
    /// and clipped to the content box.
    fn image(&mut self, node: &Node, canvas: &mut Canvas) {
        let Some(src) = node.attr("src") else {
            return;
        };
        let img = self.images.entry(src.to_string()).or_insert_with(|| {
            image::open(src)
                .map(|i| i.to_rgba8())
                .inspect_err(|e| warn!(src, error = %e, "failed to load image"))
                .ok()
        });
        if let Some(img) = img {
            let content = node.geometry().content;
            let view = imageops::crop_imm(
                img,
                0,
                0,
                img.width().min(content.w),
                img.height().min(content.h),
            )
            .to_image();
            imageops::overlay(canvas, &view, content.tl.x.into(), content.tl.y.into());
        }
    }
}

/// Hand a scratch canvas the size of the content box to the owner's
/// `onDraw` handler, then composite it.
fn canvas_node(node: &Node, canvas: &mut Canvas) -> Result<()> {
    let Some(handler) = node.attr("onDraw") else {
        return Ok(());
    };
    let content = node.geometry().content;
    if content.is_zero() {
        return Ok(());
    }
    let owner = node
        .owner()
        .upgrade()
        .ok_or_else(|| DispatchError::DroppedOwner {
            tag: node.tag().to_string(),
        })?;
    let mut scratch = Canvas::new(content.w, content.h);
    owner.invoke("onDraw", handler, HandlerArg::Canvas(&mut scratch))?;
    imageops::overlay(canvas, &scratch, content.tl.x.into(), content.tl.y.into());
    Ok(())
}

/// A one pixel wide text cursor, clipped to `clip`.
fn cursor(canvas: &mut Canvas, clip: Rect, x: i32, y: i32, h: u32, color: Color) {
    if let Some(r) = Rect::new(x, y, 1, h).intersect(&clip.grow(Insets::new(0, 1, 0, 0))) {
        fill_rect(canvas, r, color);
    }
}

/// Box outlines and a `tag WxH` label.
fn debug_overlay(node: &Node, ts: &mut dyn Typesetter, canvas: &mut Canvas) {
    let g = node.geometry();
    stroke_rect(canvas, g.outer, 1, DEBUG_OUTER.with_coverage(160));
    stroke_rect(canvas, g.inner, 1, DEBUG_INNER.with_coverage(160));
    stroke_rect(canvas, g.content, 1, DEBUG_CONTENT.with_coverage(160));
    // Only label leaves, or labels pile up on nested containers.
    if !node.children().is_empty() {
        return;
    }
    let label = format!("{} {}x{}", node.tag(), g.outer.w, g.outer.h);
    let clip = Rect::new(0, 0, canvas.width(), canvas.height());
    let origin = (g.outer.tl.x as f32 + 1.0, g.outer.tl.y as f32 + 1.0);
    ts.draw_line(canvas, &label, origin, DEBUG_LABEL_SIZE, DEBUG_OUTER, clip);
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn fill_clips_to_canvas() {
        let mut c = Canvas::new(4, 4);
        fill_rect(&mut c, Rect::new(-2, -2, 4, 4), Color::WHITE);
        assert_eq!(c.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(c.get_pixel(1, 1).0, [255, 255, 255, 255]);
        assert_eq!(c.get_pixel(2, 2).0, [0, 0, 0, 0]);
        fill_rect(&mut c, Rect::new(10, 10, 4, 4), Color::WHITE);
    }

    #[test]
    fn blending() {
        let mut c = Canvas::from_pixel(1, 1, Color::WHITE.into());
        blend_pixel(&mut c, 0, 0, Color::rgba(0, 0, 0, 128));
        let [r, _, _, a] = c.get_pixel(0, 0).0;
        assert_eq!(a, 255);
        assert!((126..=128).contains(&r));
        blend_pixel(&mut c, 5, 5, Color::BLACK);
    }

    #[test]
    fn stroke() {
        let mut c = Canvas::new(6, 6);
        stroke_rect(&mut c, Rect::new(0, 0, 6, 6), 1, Color::BLACK);
        let set: usize = c.pixels().filter(|p| p.0[3] == 255).count();
        assert_eq!(set, 20);
        assert_eq!(c.get_pixel(3, 3).0, [0, 0, 0, 0]);
        assert_eq!(c.get_pixel(5, 3).0, [0, 0, 0, 255]);
    }
}
