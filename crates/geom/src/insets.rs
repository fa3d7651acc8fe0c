use std::{ops::Add, str::FromStr};

use crate::Error;

/// Per-edge distances, used for margins, padding and border widths.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Insets {
    /// Top edge.
    pub top: u32,
    /// Right edge.
    pub right: u32,
    /// Bottom edge.
    pub bottom: u32,
    /// Left edge.
    pub left: u32,
}

impl Insets {
    /// Construct insets in CSS order: top, right, bottom, left.
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// The same inset on every edge.
    pub const fn all(v: u32) -> Self {
        Self::new(v, v, v, v)
    }

    /// Vertical and horizontal insets.
    pub const fn symmetric(vertical: u32, horizontal: u32) -> Self {
        Self::new(vertical, horizontal, vertical, horizontal)
    }

    /// Total horizontal inset.
    pub fn horizontal(&self) -> u32 {
        self.left + self.right
    }

    /// Total vertical inset.
    pub fn vertical(&self) -> u32 {
        self.top + self.bottom
    }
}

impl Add for Insets {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            top: self.top + other.top,
            right: self.right + other.right,
            bottom: self.bottom + other.bottom,
            left: self.left + other.left,
        }
    }
}

impl FromStr for Insets {
    type Err = Error;

    /// Parse CSS shorthand: one, two, three or four whitespace separated values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let vals = s
            .split_whitespace()
            .map(|v| {
                v.trim_end_matches("px")
                    .parse::<u32>()
                    .map_err(|_| Error::Geometry(format!("invalid inset value {v:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        match vals.as_slice() {
            [a] => Ok(Self::all(*a)),
            [v, h] => Ok(Self::symmetric(*v, *h)),
            [t, h, b] => Ok(Self::new(*t, *h, *b, *h)),
            [t, r, b, l] => Ok(Self::new(*t, *r, *b, *l)),
            _ => Err(Error::Geometry(format!("expected 1 to 4 inset values, got {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand() {
        assert_eq!("4".parse::<Insets>(), Ok(Insets::all(4)));
        assert_eq!("1 2".parse::<Insets>(), Ok(Insets::new(1, 2, 1, 2)));
        assert_eq!("1 2 3".parse::<Insets>(), Ok(Insets::new(1, 2, 3, 2)));
        assert_eq!("1px 2 3 4".parse::<Insets>(), Ok(Insets::new(1, 2, 3, 4)));
        assert!("".parse::<Insets>().is_err());
        assert!("1 x".parse::<Insets>().is_err());
        assert!("1 2 3 4 5".parse::<Insets>().is_err());
    }

    #[test]
    fn sums() {
        let i = Insets::symmetric(2, 3) + Insets::all(1);
        assert_eq!(i, Insets::new(3, 4, 3, 4));
        assert_eq!(i.horizontal(), 8);
        assert_eq!(i.vertical(), 6);
    }
}
