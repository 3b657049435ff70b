//! Game State Definitions
//!
//! Player identity, teams and the fixed three-dot roster.

use std::fmt;

use crate::core::vec2::IVec2;
use crate::game::dot::{ArenaConfig, DotEntity};

// =============================================================================
// PLAYER ID
// =============================================================================

/// Session slot assigned by the relay: 1 is the quarry, 2 and 3 are hunters.
///
/// Only the three valid slots can be constructed; raw wire values are checked
/// through [`PlayerId::new`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(u8);

impl PlayerId {
    /// The fleeing player.
    pub const QUARRY: Self = Self(1);
    /// First hunter.
    pub const HUNTER_A: Self = Self(2);
    /// Second hunter.
    pub const HUNTER_B: Self = Self(3);

    /// All slots in ascending order.
    pub const ALL: [Self; 3] = [Self::QUARRY, Self::HUNTER_A, Self::HUNTER_B];

    /// Both hunters.
    pub const HUNTERS: [Self; 2] = [Self::HUNTER_A, Self::HUNTER_B];

    /// Validate a raw slot number.
    pub fn new(raw: i32) -> Option<Self> {
        match raw {
            1..=3 => Some(Self(raw as u8)),
            _ => None,
        }
    }

    /// Raw slot number as sent on the wire.
    #[inline]
    pub fn get(self) -> i32 {
        i32::from(self.0)
    }

    /// Zero-based index into the roster.
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Check if this is the quarry slot.
    #[inline]
    pub fn is_quarry(self) -> bool {
        self == Self::QUARRY
    }

    /// Team this slot plays for.
    pub fn team(self) -> Team {
        if self.is_quarry() {
            Team::Quarry
        } else {
            Team::Hunters
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

// =============================================================================
// TEAM
// =============================================================================

/// Winning side of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Team {
    /// The quarry survived the countdown.
    Quarry = 1,
    /// A hunter touched the quarry.
    Hunters = 2,
}

impl Team {
    /// Parse a wire team number.
    pub fn from_wire(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Team::Quarry),
            2 => Some(Team::Hunters),
            _ => None,
        }
    }

    /// Team number as sent on the wire.
    #[inline]
    pub fn wire(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Team::Quarry => f.write_str("quarry"),
            Team::Hunters => f.write_str("hunters"),
        }
    }
}

// =============================================================================
// ROSTER
// =============================================================================

/// The three dots of a session, one per slot, each with its spawn position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roster {
    dots: [DotEntity; 3],
}

impl Roster {
    /// Place all three dots at their spawn positions.
    pub fn new(arena: &ArenaConfig) -> Self {
        Self {
            dots: PlayerId::ALL.map(|id| DotEntity::new(id, arena.spawn_position(id))),
        }
    }

    /// Get a dot by slot.
    #[inline]
    pub fn get(&self, id: PlayerId) -> &DotEntity {
        &self.dots[id.index()]
    }

    /// Get a dot mutably by slot.
    #[inline]
    pub fn get_mut(&mut self, id: PlayerId) -> &mut DotEntity {
        &mut self.dots[id.index()]
    }

    /// The quarry's dot.
    #[inline]
    pub fn quarry(&self) -> &DotEntity {
        self.get(PlayerId::QUARRY)
    }

    /// Iterate all dots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &DotEntity> {
        self.dots.iter()
    }

    /// Iterate all dots mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DotEntity> {
        self.dots.iter_mut()
    }

    /// Current positions in slot order, for the renderer.
    pub fn positions(&self) -> [(PlayerId, IVec2); 3] {
        self.dots.each_ref().map(|dot| (dot.id(), dot.position()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_validation() {
        assert_eq!(PlayerId::new(1), Some(PlayerId::QUARRY));
        assert_eq!(PlayerId::new(3), Some(PlayerId::HUNTER_B));
        assert_eq!(PlayerId::new(0), None);
        assert_eq!(PlayerId::new(4), None);
        assert_eq!(PlayerId::new(-1), None);
    }

    #[test]
    fn test_player_teams() {
        assert_eq!(PlayerId::QUARRY.team(), Team::Quarry);
        assert_eq!(PlayerId::HUNTER_A.team(), Team::Hunters);
        assert_eq!(PlayerId::HUNTER_B.team(), Team::Hunters);
    }

    #[test]
    fn test_team_wire_values() {
        assert_eq!(Team::Quarry.wire(), 1);
        assert_eq!(Team::Hunters.wire(), 2);
        assert_eq!(Team::from_wire(2), Some(Team::Hunters));
        assert_eq!(Team::from_wire(3), None);
    }

    #[test]
    fn test_roster_spawns() {
        let arena = ArenaConfig::default();
        let roster = Roster::new(&arena);

        assert_eq!(roster.quarry().position(), IVec2::new(0, 0));
        assert_eq!(roster.get(PlayerId::HUNTER_A).position(), IVec2::new(193, 140));
        assert_eq!(roster.get(PlayerId::HUNTER_B).position(), IVec2::new(406, 300));

        for (id, dot) in PlayerId::ALL.iter().zip(roster.iter()) {
            assert_eq!(*id, dot.id());
            assert!(dot.velocity().is_zero());
        }
    }
}
