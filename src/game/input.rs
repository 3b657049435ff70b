//! Directional Input
//!
//! The input source reports the set of held directions once per tick. The
//! dot only understands press/release edges, so successive samples are
//! diffed into [`IntentEvent`]s.

use bitflags::bitflags;

use crate::core::vec2::IVec2;

bitflags! {
    /// Set of directions held during one tick.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Intents: u8 {
        /// Move towards y = 0.
        const UP = 0x01;
        /// Move towards the bottom edge.
        const DOWN = 0x02;
        /// Move towards x = 0.
        const LEFT = 0x04;
        /// Move towards the right edge.
        const RIGHT = 0x08;
    }
}

/// A single movement direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Negative y
    Up,
    /// Positive y
    Down,
    /// Negative x
    Left,
    /// Positive x
    Right,
}

impl Direction {
    /// All directions.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Flag for this direction in an [`Intents`] set.
    #[inline]
    pub fn flag(self) -> Intents {
        match self {
            Direction::Up => Intents::UP,
            Direction::Down => Intents::DOWN,
            Direction::Left => Intents::LEFT,
            Direction::Right => Intents::RIGHT,
        }
    }

    /// Unit step in screen space.
    #[inline]
    pub fn unit(self) -> IVec2 {
        match self {
            Direction::Up => IVec2::new(0, -1),
            Direction::Down => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
        }
    }
}

/// Edge of a directional key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IntentEvent {
    /// Direction became active.
    Pressed(Direction),
    /// Direction stopped being active.
    Released(Direction),
}

/// Diff two samples into press/release edges, in [`Direction::ALL`] order.
pub fn transitions(previous: Intents, current: Intents) -> impl Iterator<Item = IntentEvent> {
    Direction::ALL.into_iter().filter_map(move |direction| {
        let flag = direction.flag();
        match (previous.contains(flag), current.contains(flag)) {
            (false, true) => Some(IntentEvent::Pressed(direction)),
            (true, false) => Some(IntentEvent::Released(direction)),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_press_and_release() {
        let events: Vec<_> = transitions(Intents::UP, Intents::LEFT).collect();
        assert_eq!(
            events,
            vec![
                IntentEvent::Released(Direction::Up),
                IntentEvent::Pressed(Direction::Left),
            ]
        );
    }

    #[test]
    fn test_transitions_held_is_silent() {
        let held = Intents::DOWN | Intents::RIGHT;
        assert_eq!(transitions(held, held).count(), 0);
    }

    #[test]
    fn test_direction_units_cancel() {
        assert_eq!(Direction::Up.unit() + Direction::Down.unit(), IVec2::ZERO);
        assert_eq!(Direction::Left.unit() + Direction::Right.unit(), IVec2::ZERO);
    }
}
