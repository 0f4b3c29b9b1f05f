//! Seat colors and per-color storage.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// The color an active player plays as.
///
/// Seat 0 (the first player to join) is red and always moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Yellow,
}

impl Color {
    /// Both colors in seat order.
    pub const ALL: [Color; 2] = [Color::Red, Color::Yellow];

    /// Returns the opposing color.
    pub fn other(self) -> Self {
        match self {
            Self::Red => Self::Yellow,
            Self::Yellow => Self::Red,
        }
    }

    /// Maps an active-player seat index to its color.
    pub fn from_seat(seat: usize) -> Option<Self> {
        Self::ALL.get(seat).copied()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Yellow => write!(f, "yellow"),
        }
    }
}

/// One value per color, serialized as `{"red": .., "yellow": ..}`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct ByColor<T> {
    pub red: T,
    pub yellow: T,
}

impl<T> ByColor<T> {
    pub fn new(red: T, yellow: T) -> Self {
        Self { red, yellow }
    }
}

impl ByColor<bool> {
    /// `true` once both colors have set their flag.
    pub fn both(&self) -> bool {
        self.red && self.yellow
    }
}

impl<T> Index<Color> for ByColor<T> {
    type Output = T;

    fn index(&self, color: Color) -> &T {
        match color {
            Color::Red => &self.red,
            Color::Yellow => &self.yellow,
        }
    }
}

impl<T> IndexMut<Color> for ByColor<T> {
    fn index_mut(&mut self, color: Color) -> &mut T {
        match color {
            Color::Red => &mut self.red,
            Color::Yellow => &mut self.yellow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_other_flips() {
        assert_eq!(Color::Red.other(), Color::Yellow);
        assert_eq!(Color::Yellow.other(), Color::Red);
    }

    #[test]
    fn test_color_from_seat() {
        assert_eq!(Color::from_seat(0), Some(Color::Red));
        assert_eq!(Color::from_seat(1), Some(Color::Yellow));
        assert_eq!(Color::from_seat(2), None);
    }

    #[test]
    fn test_color_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Color::Yellow).unwrap(), "\"yellow\"");
    }

    #[test]
    fn test_by_color_indexing() {
        let mut votes = ByColor::<bool>::default();
        votes[Color::Yellow] = true;
        assert!(!votes.both());
        votes[Color::Red] = true;
        assert!(votes.both());
    }
}
