//! Flexbox layout over taffy.
//!
//! Displayed nodes are mirrored into a taffy tree, text-bearing leaves are
//! measured through a [`TextMeasure`], and the resulting boxes are written
//! back to the node tree as absolute rectangles.

use std::collections::HashMap;

use taffy::{
    AlignItems, AvailableSpace, Dimension, Display, FlexDirection, JustifyContent,
    LengthPercentage, LengthPercentageAuto, NodeId as TaffyId, Size, Style as TaffyStyle,
    TaffyTree,
};

use crate::{
    error::Result,
    geom::{Expanse, Insets, Point, Rect},
    node::{Geometry, Node, NodeId},
    style::{Align, Justify, Length, Style},
    text::{TextBlock, TextMeasure},
    tree::Tree,
};

/// Minimum width of an `input`, in characters.
const INPUT_CHARS: usize = 12;
/// Minimum width of a `textarea`, in characters.
const TEXTAREA_CHARS: usize = 24;
/// Minimum height of a `textarea`, in lines.
const TEXTAREA_LINES: usize = 3;

/// Computes geometry for a built tree.
pub trait Layout {
    /// Lay out `tree` in a viewport of size `viewport`, writing content,
    /// inner and outer rectangles for every displayed node. Nodes that are
    /// not displayed get empty geometry.
    fn layout(
        &mut self,
        tree: &mut Tree,
        viewport: Expanse,
        measure: &mut dyn TextMeasure,
    ) -> Result<()>;
}

/// Text measured by a taffy leaf.
#[derive(Debug, Clone)]
struct Leaf {
    /// The text.
    text: String,
    /// Font size.
    size: f32,
    /// Wrap to the available width?
    wrap: bool,
    /// Wrap width cap.
    max_width: Option<f32>,
    /// Minimum width, in pixels.
    min_width: f32,
    /// Minimum height, in lines.
    min_lines: usize,
}

impl Leaf {
    /// Measure the leaf against taffy's constraints.
    fn measure(
        &self,
        measure: &mut dyn TextMeasure,
        known: Size<Option<f32>>,
        available: Size<AvailableSpace>,
    ) -> Size<f32> {
        if let Size {
            width: Some(width),
            height: Some(height),
        } = known
        {
            return Size { width, height };
        }
        let limit = if self.wrap {
            let avail = match available.width {
                AvailableSpace::Definite(w) => Some(w),
                AvailableSpace::MinContent => Some(0.0),
                AvailableSpace::MaxContent => None,
            };
            match (known.width.or(avail), self.max_width) {
                (Some(w), Some(m)) => Some(w.min(m)),
                (w, m) => w.or(m),
            }
        } else {
            None
        };
        let block = TextBlock::layout(measure, &self.text, self.size, limit);
        let lines = block.lines.len().max(self.min_lines).max(1);
        Size {
            width: known
                .width
                .unwrap_or_else(|| block.width.max(self.min_width).ceil()),
            height: known
                .height
                .unwrap_or_else(|| (lines as f32 * block.line_height).ceil()),
        }
    }
}

/// Taffy-backed flexbox layout. `row` lays children out horizontally,
/// everything else vertically.
#[derive(Debug, Clone)]
pub struct FlexLayout {
    /// Font size for nodes without a `font-size`.
    font_size: f32,
}

impl FlexLayout {
    /// Construct a layout with a default font size.
    pub fn new(font_size: f32) -> Self {
        Self { font_size }
    }

    /// The font size for a node.
    fn size_of(&self, style: &Style) -> f32 {
        style.font_size.unwrap_or(self.font_size)
    }

    /// The measured leaf for text-bearing nodes.
    fn leaf(&self, node: &Node, measure: &mut dyn TextMeasure) -> Option<Leaf> {
        let size = self.size_of(node.style());
        let max_width = node.style().max_width.map(|w| w as f32);
        let chars = |n: usize, measure: &mut dyn TextMeasure| measure.advance('0', size) * n as f32;
        let leaf = match node.tag() {
            "text" | "button" => Leaf {
                text: node.content().to_string(),
                size,
                wrap: false,
                max_width,
                min_width: 0.0,
                min_lines: 1,
            },
            "p" => Leaf {
                text: node.content().to_string(),
                size,
                wrap: true,
                max_width,
                min_width: 0.0,
                min_lines: 1,
            },
            "input" => Leaf {
                text: node.value().to_string(),
                size,
                wrap: false,
                max_width,
                min_width: chars(INPUT_CHARS, measure),
                min_lines: 1,
            },
            "textarea" => Leaf {
                text: node.value().to_string(),
                size,
                wrap: true,
                max_width,
                min_width: chars(TEXTAREA_CHARS, measure),
                min_lines: TEXTAREA_LINES,
            },
            _ => return None,
        };
        Some(leaf)
    }

    /// Mirror a displayed subtree into taffy, returning its taffy node.
    /// Visited nodes are appended to `order` in pre-order.
    fn mirror(
        &self,
        taffy: &mut TaffyTree<Leaf>,
        tree: &Tree,
        id: NodeId,
        measure: &mut dyn TextMeasure,
        order: &mut Vec<(NodeId, TaffyId)>,
    ) -> Result<Option<TaffyId>> {
        let Some(node) = tree.get(id) else {
            return Ok(None);
        };
        if !node.is_displayed() {
            return Ok(None);
        }
        let mut style = taffy_style(node);
        if node.tag() == "img"
            && let Some(src) = node.attr("src")
            && let Ok((w, h)) = image::image_dimensions(src)
        {
            style.size = Size {
                width: fixed_or(node.style().width, w),
                height: fixed_or(node.style().height, h),
            };
        }
        let tid = match self.leaf(node, measure) {
            Some(leaf) => taffy.new_leaf_with_context(style, leaf)?,
            None => taffy.new_leaf(style)?,
        };
        order.push((id, tid));
        for child in node.children() {
            if let Some(c) = self.mirror(taffy, tree, *child, measure, order)? {
                taffy.add_child(tid, c)?;
            }
        }
        Ok(Some(tid))
    }
}

impl Default for FlexLayout {
    fn default() -> Self {
        Self::new(16.0)
    }
}

impl Layout for FlexLayout {
    fn layout(
        &mut self,
        tree: &mut Tree,
        viewport: Expanse,
        measure: &mut dyn TextMeasure,
    ) -> Result<()> {
        let mut taffy: TaffyTree<Leaf> = TaffyTree::new();
        let mut order = Vec::new();
        let root = self.mirror(&mut taffy, tree, tree.root(), measure, &mut order)?;

        let displayed: HashMap<NodeId, usize> = order
            .iter()
            .enumerate()
            .map(|(i, (id, _))| (*id, i))
            .collect();
        for id in tree.ids() {
            if !displayed.contains_key(&id) {
                tree.set_geometry(id, Geometry::default())?;
            }
        }
        let Some(root) = root else {
            return Ok(());
        };

        let mut root_style = taffy.style(root)?.clone();
        root_style.size = Size {
            width: Dimension::Length(viewport.w as f32),
            height: Dimension::Length(viewport.h as f32),
        };
        taffy.set_style(root, root_style)?;
        let available = Size {
            width: AvailableSpace::Definite(viewport.w as f32),
            height: AvailableSpace::Definite(viewport.h as f32),
        };
        taffy.compute_layout_with_measure(
            root,
            available,
            |known, avail, _, leaf: Option<&mut Leaf>, _| match leaf {
                Some(leaf) => leaf.measure(measure, known, avail),
                None => Size::ZERO,
            },
        )?;

        // Border-box origins, filled in pre-order so parents come first.
        let mut origins: HashMap<NodeId, Point> = HashMap::with_capacity(order.len());
        for (id, tid) in &order {
            let l = taffy.layout(*tid)?;
            let parent = tree
                .get(*id)
                .and_then(Node::parent)
                .and_then(|p| origins.get(&p).copied())
                .unwrap_or_default();
            let tl = parent + Point::new(l.location.x.round() as i32, l.location.y.round() as i32);
            origins.insert(*id, tl);
            let inner = Rect {
                tl,
                w: l.size.width.round().max(0.0) as u32,
                h: l.size.height.round().max(0.0) as u32,
            };

            let Some(node) = tree.get(*id) else {
                continue;
            };
            let style = node.style();
            let border = Insets::all(style.border.map_or(0, |b| b.width));
            let geometry = Geometry {
                outer: inner.grow(style.margin),
                inner,
                content: inner.shrink(border + style.padding),
            };
            let lines = node.is_scrollable().then(|| {
                let size = self.size_of(style);
                let text = if node.tag() == "p" {
                    node.content()
                } else {
                    node.value()
                };
                let block =
                    TextBlock::layout(measure, text, size, Some(geometry.content.w as f32));
                (
                    block.lines.len(),
                    block.visible_lines(geometry.content.h as f32),
                )
            });
            tree.set_geometry(*id, geometry)?;
            if let Some((lines, visible)) = lines {
                tree.set_lines(*id, lines, visible)?;
            }
        }
        Ok(())
    }
}

/// A fixed length from style, or the intrinsic size.
fn fixed_or(len: Option<Length>, intrinsic: u32) -> Dimension {
    len.map_or(Dimension::Length(intrinsic as f32), dimension)
}

/// Convert a style length.
fn dimension(len: Length) -> Dimension {
    match len {
        Length::Px(px) => Dimension::Length(px as f32),
        Length::Percent(f) => Dimension::Percent(f),
    }
}

/// Convert insets to taffy padding or border.
fn lengths(i: Insets) -> taffy::Rect<LengthPercentage> {
    taffy::Rect {
        top: LengthPercentage::Length(i.top as f32),
        right: LengthPercentage::Length(i.right as f32),
        bottom: LengthPercentage::Length(i.bottom as f32),
        left: LengthPercentage::Length(i.left as f32),
    }
}

/// Convert insets to taffy margins.
fn margins(i: Insets) -> taffy::Rect<LengthPercentageAuto> {
    taffy::Rect {
        top: LengthPercentageAuto::Length(i.top as f32),
        right: LengthPercentageAuto::Length(i.right as f32),
        bottom: LengthPercentageAuto::Length(i.bottom as f32),
        left: LengthPercentageAuto::Length(i.left as f32),
    }
}

/// The taffy style for a node.
fn taffy_style(node: &Node) -> TaffyStyle {
    let style = node.style();
    let border = style.border.map_or(0, |b| b.width);
    TaffyStyle {
        display: Display::Flex,
        flex_direction: if node.tag() == "row" {
            FlexDirection::Row
        } else {
            FlexDirection::Column
        },
        justify_content: Some(match style.justify {
            Justify::Start => JustifyContent::Start,
            Justify::Center => JustifyContent::Center,
            Justify::End => JustifyContent::End,
            Justify::SpaceBetween => JustifyContent::SpaceBetween,
            Justify::SpaceAround => JustifyContent::SpaceAround,
        }),
        align_items: Some(match style.align {
            Align::Start => AlignItems::Start,
            Align::Center => AlignItems::Center,
            Align::End => AlignItems::End,
            Align::Stretch => AlignItems::Stretch,
        }),
        flex_grow: style.grow,
        flex_shrink: if node.children().is_empty() { 1.0 } else { 0.0 },
        size: Size {
            width: style.width.map_or(Dimension::Auto, dimension),
            height: style.height.map_or(Dimension::Auto, dimension),
        },
        max_size: Size {
            width: style
                .max_width
                .map_or(Dimension::Auto, |w| Dimension::Length(w as f32)),
            height: Dimension::Auto,
        },
        margin: margins(style.margin),
        padding: lengths(style.padding),
        border: lengths(Insets::all(border)),
        gap: Size {
            width: LengthPercentage::Length(style.gap as f32),
            height: LengthPercentage::Length(style.gap as f32),
        },
        ..TaffyStyle::default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::text::MonoTypesetter;

    /// Build a tree by hand: `root` tag with `(tag, attrs, content)` children.
    fn tree(root: (&str, &[(&str, &str)]), children: &[(&str, &[(&str, &str)], &str)]) -> Tree {
        let node = |tag: &str, attrs: &[(&str, &str)], content: &str| {
            let mut n = Node::new(tag);
            n.attrs = attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            n.content = content.to_string();
            n.style = Style::from_attrs(tag, &n.attrs).unwrap();
            n.displayed = n.style.is_visible();
            if n.is_scrollable() {
                n.scrollable = Some(Default::default());
            }
            n
        };
        let mut t = Tree::new(node(root.0, root.1, ""));
        let r = t.root();
        for (tag, attrs, content) in children {
            t.append(r, node(tag, attrs, content)).unwrap();
        }
        t
    }

    fn run(t: &mut Tree, w: u32, h: u32) {
        let mut m = MonoTypesetter::new(1.0);
        FlexLayout::new(10.0)
            .layout(t, Expanse::new(w, h), &mut m)
            .unwrap();
    }

    #[test]
    fn column_stacks_text() {
        let mut t = tree(
            ("col", &[("align", "start")]),
            &[("text", &[], "hello"), ("text", &[], "hi")],
        );
        run(&mut t, 100, 100);
        let kids = t[t.root()].children().to_vec();
        assert_eq!(t[t.root()].geometry().inner, Rect::new(0, 0, 100, 100));
        assert_eq!(t[kids[0]].geometry().inner, Rect::new(0, 0, 30, 10));
        assert_eq!(t[kids[1]].geometry().inner, Rect::new(0, 10, 12, 10));
    }

    #[test]
    fn row_grows_and_pads() {
        let mut t = tree(
            ("row", &[("padding", "5")]),
            &[
                ("col", &[("width", "20")], ""),
                ("col", &[("grow", "1"), ("margin", "0 2")], ""),
            ],
        );
        run(&mut t, 100, 50);
        let kids = t[t.root()].children().to_vec();
        assert_eq!(t[t.root()].geometry().content, Rect::new(5, 5, 90, 40));
        assert_eq!(t[kids[0]].geometry().inner, Rect::new(5, 5, 20, 40));
        let g = t[kids[1]].geometry();
        assert_eq!(g.inner, Rect::new(27, 5, 66, 40));
        assert_eq!(g.outer, Rect::new(25, 5, 70, 40));
    }

    #[test]
    fn hidden_nodes_take_no_space() {
        let mut t = tree(
            ("col", &[("align", "start")]),
            &[("text", &[("display", "false")], "gone"), ("text", &[], "here")],
        );
        run(&mut t, 100, 100);
        let kids = t[t.root()].children().to_vec();
        assert_eq!(t[kids[0]].geometry(), Geometry::default());
        assert_eq!(t[kids[1]].geometry().inner, Rect::new(0, 0, 24, 10));
    }

    #[test]
    fn paragraph_lines() {
        let mut t = tree(
            ("col", &[]),
            &[("p", &[("height", "20")], "aaa bbb ccc ddd eee")],
        );
        run(&mut t, 42, 100);
        let p = t[t.root()].children()[0];
        let s = t[p].scrollable().unwrap();
        assert_eq!(s.lines, 3);
        assert_eq!(s.visible, 2);
        assert_eq!(s.max_line(), 1);
    }
}
