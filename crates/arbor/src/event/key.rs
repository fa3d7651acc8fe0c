//! Keys, as reported by the host's keyboard polling.

/// A key that can be held down.
#[derive(Debug, PartialOrd, Ord, PartialEq, Hash, Eq, Clone, Copy)]
pub enum Key {
    /// A character key, lowercased.
    Char(char),
    /// Either control key.
    Ctrl,
    /// Either shift key.
    Shift,
    /// Either alt key.
    Alt,
    /// Backspace.
    Backspace,
    /// Forward delete.
    Delete,
    /// Enter.
    Enter,
    /// Tab.
    Tab,
    /// Escape.
    Esc,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Home.
    Home,
    /// End.
    End,
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        Self::Char(c.to_ascii_lowercase())
    }
}

impl Key {
    /// Is this a modifier key?
    pub fn is_modifier(&self) -> bool {
        matches!(self, Self::Ctrl | Self::Shift | Self::Alt)
    }
}
