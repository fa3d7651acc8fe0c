use std::collections::BTreeSet;

use super::key::Key;
use crate::geom::Point;

/// Device state polled once per frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    /// Pointer position in viewport pixels, if the pointer is inside.
    pub pointer: Option<Point>,
    /// Is the primary button held?
    pub button: bool,
    /// Keys currently held.
    pub keys: BTreeSet<Key>,
    /// Text typed since the last frame.
    pub text: String,
    /// Wheel movement in lines since the last frame. Positive scrolls down.
    pub wheel: i32,
}

impl InputSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pointer position.
    pub fn at(mut self, x: i32, y: i32) -> Self {
        self.pointer = Some(Point::new(x, y));
        self
    }

    /// Set the primary button state.
    pub fn button(mut self, held: bool) -> Self {
        self.button = held;
        self
    }

    /// Add a held key.
    pub fn key(mut self, k: impl Into<Key>) -> Self {
        self.keys.insert(k.into());
        self
    }

    /// Add typed text.
    pub fn text(mut self, s: &str) -> Self {
        self.text.push_str(s);
        self
    }

    /// Set the wheel movement.
    pub fn wheel(mut self, lines: i32) -> Self {
        self.wheel = lines;
        self
    }

    /// Is a key held?
    pub fn held(&self, k: impl Into<Key>) -> bool {
        self.keys.contains(&k.into())
    }

    /// Keys held now that were not held in `prev`.
    pub fn pressed_since(&self, prev: &Self) -> BTreeSet<Key> {
        self.keys.difference(&prev.keys).copied().collect()
    }

    /// The state carried into the next frame: pointer, button and held
    /// keys persist, typed text and wheel movement do not.
    pub fn carry(&self) -> Self {
        Self {
            pointer: self.pointer,
            button: self.button,
            keys: self.keys.clone(),
            text: String::new(),
            wheel: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn newly_pressed() {
        let prev = InputSnapshot::new().key(Key::Ctrl);
        let now = InputSnapshot::new().key(Key::Ctrl).key('D');
        assert_eq!(
            now.pressed_since(&prev).into_iter().collect::<Vec<_>>(),
            vec![Key::Char('d')]
        );
        assert!(now.held('d'));
        assert!(now.pressed_since(&now).is_empty());
    }

    #[test]
    fn carry() {
        let s = InputSnapshot::new().at(1, 2).button(true).text("x").wheel(3);
        let c = s.carry();
        assert_eq!(c.pointer, Some(Point::new(1, 2)));
        assert!(c.button);
        assert_eq!(c.text, "");
        assert_eq!(c.wheel, 0);
    }
}
