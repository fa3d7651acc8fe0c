//! Attribute-driven style: colors, per-state visuals, box model and flex
//! parameters.

use std::str::FromStr;

use crate::{
    error::{Error, Result},
    geom::Insets,
    node::Attributes,
};

/// RGBA colors.
mod color;

pub use color::Color;

/// Main-axis distribution of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Justify {
    /// Pack at the start.
    #[default]
    Start,
    /// Center.
    Center,
    /// Pack at the end.
    End,
    /// Equal space between children.
    SpaceBetween,
    /// Equal space around children.
    SpaceAround,
}

/// Cross-axis alignment of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Align {
    /// Align to the start.
    Start,
    /// Center.
    Center,
    /// Align to the end.
    End,
    /// Stretch to fill.
    #[default]
    Stretch,
}

/// A size along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Length {
    /// Fixed pixels.
    Px(u32),
    /// Fraction of the parent, in `[0, 1]`.
    Percent(f32),
}

/// A solid border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Border {
    /// Width in pixels, on every edge.
    pub width: u32,
    /// Border color.
    pub color: Color,
}

/// A resolved style descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    /// For style aliases, the primitive tag the alias stands for.
    pub extends: String,
    /// Attribute defaults carried by a style alias. The element's own
    /// attributes override these.
    pub preset: Attributes,
    /// Is the node laid out and drawn?
    pub display: bool,
    /// Is the node hidden? Hidden nodes are not laid out or drawn.
    pub hidden: bool,
    /// Is the node non-interactive?
    pub disabled: bool,
    /// Foreground (text) color.
    pub color: Color,
    /// Idle background.
    pub background: Option<Color>,
    /// Background while hovered.
    pub hover: Option<Color>,
    /// Background while pressed.
    pub active: Option<Color>,
    /// Border.
    pub border: Option<Border>,
    /// Outer spacing.
    pub margin: Insets,
    /// Inner spacing.
    pub padding: Insets,
    /// Fixed width.
    pub width: Option<Length>,
    /// Fixed height.
    pub height: Option<Length>,
    /// Width cap, also the wrap width for paragraphs.
    pub max_width: Option<u32>,
    /// Flex grow factor.
    pub grow: f32,
    /// Main-axis distribution.
    pub justify: Justify,
    /// Cross-axis alignment.
    pub align: Align,
    /// Font size in pixels, if overridden.
    pub font_size: Option<f32>,
    /// Space between children.
    pub gap: u32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            extends: String::new(),
            preset: Attributes::new(),
            display: true,
            hidden: false,
            disabled: false,
            color: Color::BLACK,
            background: None,
            hover: None,
            active: None,
            border: None,
            margin: Insets::default(),
            padding: Insets::default(),
            width: None,
            height: None,
            max_width: None,
            grow: 0.0,
            justify: Justify::default(),
            align: Align::default(),
            font_size: None,
            gap: 0,
        }
    }
}

/// Parse a boolean attribute. A present but empty attribute is true.
fn parse_bool(key: &str, v: &str) -> Result<bool> {
    match v.trim() {
        "" | "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(Error::Style(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

/// Parse a pixel count with an optional `px` suffix.
fn parse_px(key: &str, v: &str) -> Result<u32> {
    v.trim()
        .trim_end_matches("px")
        .parse()
        .map_err(|_| Error::Style(format!("{key}: expected pixels, got {v:?}")))
}

impl FromStr for Length {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(pct) = s.strip_suffix('%') {
            let v: f32 = pct
                .trim()
                .parse()
                .map_err(|_| Error::Style(format!("invalid percentage {s:?}")))?;
            return Ok(Self::Percent(v / 100.0));
        }
        parse_px("length", s).map(Self::Px)
    }
}

impl FromStr for Border {
    type Err = Error;

    /// Parse `"<width> <color>"`, either part optional.
    fn from_str(s: &str) -> Result<Self> {
        let mut border = Self {
            width: 1,
            color: Color::BLACK,
        };
        for part in s.split_whitespace() {
            if part.starts_with(|c: char| c.is_ascii_digit()) {
                border.width = parse_px("border", part)?;
            } else {
                border.color = part.parse()?;
            }
        }
        Ok(border)
    }
}

impl Style {
    /// A style alias standing for the primitive `tag`.
    pub fn alias(tag: &str) -> Self {
        Self {
            extends: tag.to_string(),
            ..Self::default()
        }
    }

    /// Add an attribute default to an alias.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.preset.insert(key.to_string(), value.to_string());
        self
    }

    /// The built-in defaults for a primitive tag.
    pub fn for_tag(tag: &str) -> Self {
        let mut s = Self::default();
        match tag {
            "button" => {
                s.background = Some(crate::rgb!("#dddddd"));
                s.hover = Some(crate::rgb!("#eeeeee"));
                s.active = Some(crate::rgb!("#bbbbbb"));
                s.border = Some(Border {
                    width: 1,
                    color: crate::rgb!("#888888"),
                });
                s.padding = Insets::symmetric(4, 8);
            }
            "input" | "textarea" => {
                s.background = Some(Color::WHITE);
                s.border = Some(Border {
                    width: 1,
                    color: crate::rgb!("#888888"),
                });
                s.padding = Insets::all(4);
            }
            _ => {}
        }
        s
    }

    /// Resolve the style for a node with effective tag `tag` and attribute
    /// map `attrs`. Unknown attributes are ignored.
    pub fn from_attrs(tag: &str, attrs: &Attributes) -> Result<Self> {
        let mut s = Self::for_tag(tag);
        for (key, v) in attrs {
            match key.as_str() {
                "display" => {
                    s.display = v.trim() != "none" && (v.trim() == "flex" || parse_bool(key, v)?);
                }
                "hidden" => s.hidden = parse_bool(key, v)?,
                "disabled" => s.disabled = parse_bool(key, v)?,
                "color" => s.color = v.parse()?,
                "background" => s.background = Some(v.parse()?),
                "hover" => s.hover = Some(v.parse()?),
                "active" => s.active = Some(v.parse()?),
                "border" => {
                    s.border = match v.trim() {
                        "none" | "0" => None,
                        other => Some(other.parse()?),
                    }
                }
                "margin" => {
                    s.margin = v.parse().map_err(|e| Error::Style(format!("{key}: {e}")))?;
                }
                "padding" => {
                    s.padding = v.parse().map_err(|e| Error::Style(format!("{key}: {e}")))?;
                }
                "width" => s.width = Some(v.parse()?),
                "height" => s.height = Some(v.parse()?),
                "max-width" => s.max_width = Some(parse_px(key, v)?),
                "grow" => {
                    s.grow = v
                        .trim()
                        .parse()
                        .map_err(|_| Error::Style(format!("grow: expected a number, got {v:?}")))?;
                }
                "justify" => {
                    s.justify = match v.trim() {
                        "start" => Justify::Start,
                        "center" => Justify::Center,
                        "end" => Justify::End,
                        "space-between" | "between" => Justify::SpaceBetween,
                        "space-around" | "around" => Justify::SpaceAround,
                        other => return Err(Error::Style(format!("unknown justify {other:?}"))),
                    }
                }
                "align" => {
                    s.align = match v.trim() {
                        "start" => Align::Start,
                        "center" => Align::Center,
                        "end" => Align::End,
                        "stretch" => Align::Stretch,
                        other => return Err(Error::Style(format!("unknown align {other:?}"))),
                    }
                }
                "font-size" => {
                    let px: f32 = v
                        .trim()
                        .trim_end_matches("px")
                        .parse()
                        .map_err(|_| Error::Style(format!("font-size: invalid value {v:?}")))?;
                    s.font_size = Some(px);
                }
                "gap" => s.gap = parse_px(key, v)?,
                _ => {}
            }
        }
        Ok(s)
    }

    /// Is the node drawn and laid out?
    pub fn is_visible(&self) -> bool {
        self.display && !self.hidden
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn display_flags() {
        let s = Style::from_attrs("col", &attrs(&[("display", "false")])).unwrap();
        assert!(!s.is_visible());
        let s = Style::from_attrs("col", &attrs(&[("display", "true")])).unwrap();
        assert!(s.is_visible());
        let s = Style::from_attrs("col", &attrs(&[("display", "none")])).unwrap();
        assert!(!s.display);
        let s = Style::from_attrs("col", &attrs(&[("hidden", "")])).unwrap();
        assert!(!s.is_visible());
        assert!(Style::from_attrs("col", &attrs(&[("display", "maybe")])).is_err());
    }

    #[test]
    fn box_model() {
        let s = Style::from_attrs(
            "row",
            &attrs(&[
                ("margin", "1 2"),
                ("padding", "3px"),
                ("border", "2 #ff0000"),
                ("width", "50%"),
                ("height", "20px"),
                ("max-width", "300"),
                ("grow", "1.5"),
                ("justify", "space-between"),
                ("align", "center"),
                ("gap", "4"),
                ("unknown", "ignored"),
            ]),
        )
        .unwrap();
        assert_eq!(s.margin, Insets::symmetric(1, 2));
        assert_eq!(s.padding, Insets::all(3));
        assert_eq!(
            s.border,
            Some(Border {
                width: 2,
                color: Color::rgb(255, 0, 0)
            })
        );
        assert_eq!(s.width, Some(Length::Percent(0.5)));
        assert_eq!(s.height, Some(Length::Px(20)));
        assert_eq!(s.max_width, Some(300));
        assert_eq!(s.grow, 1.5);
        assert_eq!(s.justify, Justify::SpaceBetween);
        assert_eq!(s.align, Align::Center);
        assert_eq!(s.gap, 4);
    }

    #[test]
    fn tag_defaults() {
        let s = Style::for_tag("button");
        assert!(s.border.is_some());
        assert!(s.hover.is_some());
        let s = Style::from_attrs("button", &attrs(&[("border", "none")])).unwrap();
        assert_eq!(s.border, None);
        assert_eq!(Style::for_tag("row"), Style::default());
    }

    #[test]
    fn aliases() {
        let a = Style::alias("button").with("background", "#000");
        assert_eq!(a.extends, "button");
        assert_eq!(a.preset.get("background").map(String::as_str), Some("#000"));
    }
}
