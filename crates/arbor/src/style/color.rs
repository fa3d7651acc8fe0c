use std::str::FromStr;

use image::Rgba;

use crate::error::Error;

/// An RGBA color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

/// Create an opaque Color from a hex literal at compile time.
#[macro_export]
macro_rules! rgb {
    ($hex:literal) => {{
        const fn hex_char_to_num(c: u8) -> u8 {
            match c {
                b'0'..=b'9' => c - b'0',
                b'a'..=b'f' => c - b'a' + 10,
                b'A'..=b'F' => c - b'A' + 10,
                _ => panic!("Invalid hex character"),
            }
        }

        const fn parse_hex_byte(high: u8, low: u8) -> u8 {
            hex_char_to_num(high) * 16 + hex_char_to_num(low)
        }

        const C: $crate::style::Color = {
            let bytes = $hex.as_bytes();
            let start = if bytes[0] == b'#' { 1 } else { 0 };
            if bytes.len() - start != 6 {
                panic!("Invalid hex color: must be 6 hex digits");
            }
            $crate::style::Color::rgb(
                parse_hex_byte(bytes[start], bytes[start + 1]),
                parse_hex_byte(bytes[start + 2], bytes[start + 3]),
                parse_hex_byte(bytes[start + 4], bytes[start + 5]),
            )
        };
        C
    }};
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    /// Fully transparent.
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// A color with alpha.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Look up a named color.
    pub fn named(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "transparent" => Self::TRANSPARENT,
            "red" => Self::rgb(255, 0, 0),
            "green" => Self::rgb(0, 128, 0),
            "blue" => Self::rgb(0, 0, 255),
            "yellow" => Self::rgb(255, 255, 0),
            "gray" | "grey" => Self::rgb(128, 128, 128),
            "lightgray" | "lightgrey" => Self::rgb(211, 211, 211),
            "darkgray" | "darkgrey" => Self::rgb(64, 64, 64),
            _ => return None,
        })
    }

    /// Source-over composite of `self` on top of `dst`.
    pub fn over(self, dst: Self) -> Self {
        let sa = u32::from(self.a);
        if sa == 255 {
            return self;
        }
        if sa == 0 {
            return dst;
        }
        let da = u32::from(dst.a) * (255 - sa) / 255;
        let oa = sa + da;
        let mix = |s: u8, d: u8| ((u32::from(s) * sa + u32::from(d) * da) / oa) as u8;
        Self {
            r: mix(self.r, dst.r),
            g: mix(self.g, dst.g),
            b: mix(self.b, dst.b),
            a: oa as u8,
        }
    }

    /// Scale the alpha channel by a coverage value in `0..=255`.
    pub fn with_coverage(self, coverage: u8) -> Self {
        Self {
            a: (u32::from(self.a) * u32::from(coverage) / 255) as u8,
            ..self
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some(hex) = s.strip_prefix('#') else {
            return Self::named(s).ok_or_else(|| Error::Style(format!("unknown color {s:?}")));
        };
        let invalid = || Error::Style(format!("invalid hex color {s:?}"));
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..=i], 16)
                .map(|v| v * 17)
                .map_err(|_| invalid())
        };
        match hex.len() {
            3 => Ok(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(invalid()),
        }
    }
}

impl From<Color> for Rgba<u8> {
    fn from(c: Color) -> Self {
        Self([c.r, c.g, c.b, c.a])
    }
}

impl From<Rgba<u8>> for Color {
    fn from(p: Rgba<u8>) -> Self {
        let [r, g, b, a] = p.0;
        Self { r, g, b, a }
    }
}
