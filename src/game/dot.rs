//! Dot Entity
//!
//! Position/velocity of one player's dot and the arena motion rule.
//!
//! Remote dots are moved only by absolute snapshots. The locally owned dot
//! is moved by input: each held direction contributes `±unit_velocity` on its
//! axis, and releasing a direction takes back exactly what pressing it added.

use std::fmt;
use std::str::FromStr;
use serde::{Serialize, Deserialize};

use crate::config::ConfigurationError;
use crate::core::vec2::IVec2;
use crate::game::input::{transitions, IntentEvent, Intents};
use crate::game::state::PlayerId;

// =============================================================================
// ARENA
// =============================================================================

/// What happens when a dot reaches the edge of the arena.
///
/// Chosen once at session setup; the two rules are never mixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Toroidal arena: leaving one edge re-enters through the opposite one.
    #[default]
    Wrap,
    /// Walls: a step that would leave `[0, dimension - size]` is undone on that axis.
    Clamp,
}

impl FromStr for BoundaryPolicy {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "wrap" => Ok(BoundaryPolicy::Wrap),
            "clamp" | "clamp-revert" => Ok(BoundaryPolicy::Clamp),
            _ => Err(ConfigurationError::UnknownBoundaryPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for BoundaryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryPolicy::Wrap => f.write_str("wrap"),
            BoundaryPolicy::Clamp => f.write_str("clamp"),
        }
    }
}

/// Arena geometry and motion constants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Arena width in pixels.
    pub width: i32,
    /// Arena height in pixels.
    pub height: i32,
    /// Dot width and height; also the touch distance.
    pub entity_size: i32,
    /// Velocity added per held direction.
    pub unit_velocity: i32,
    /// Edge rule.
    pub boundary: BoundaryPolicy,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            entity_size: 20,
            unit_velocity: 2,
            boundary: BoundaryPolicy::Wrap,
        }
    }
}

impl ArenaConfig {
    /// Check geometry is usable: positive sizes and a dot that fits the arena.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ConfigurationError::InvalidArena {
                width: self.width,
                height: self.height,
            });
        }
        if self.entity_size <= 0 || self.entity_size > self.width.min(self.height) {
            return Err(ConfigurationError::InvalidEntitySize(self.entity_size));
        }
        if self.unit_velocity <= 0 {
            return Err(ConfigurationError::InvalidVelocity(self.unit_velocity));
        }
        Ok(())
    }

    /// Starting position of a slot: quarry in the corner, hunters on the
    /// one-third and two-thirds diagonal points.
    pub fn spawn_position(&self, id: PlayerId) -> IVec2 {
        let size = self.entity_size;
        match id {
            PlayerId::QUARRY => IVec2::ZERO,
            PlayerId::HUNTER_A => IVec2::new(self.width / 3 - size, self.height / 3 - size),
            _ => IVec2::new(self.width * 2 / 3 - size, self.height * 2 / 3 - size),
        }
    }
}

// =============================================================================
// DOT ENTITY
// =============================================================================

/// One player's dot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DotEntity {
    id: PlayerId,
    position: IVec2,
    velocity: IVec2,
    /// Directions currently contributing to `velocity`.
    held: Intents,
}

impl DotEntity {
    /// Create a stationary dot.
    pub fn new(id: PlayerId, position: IVec2) -> Self {
        Self {
            id,
            position,
            velocity: IVec2::ZERO,
            held: Intents::empty(),
        }
    }

    /// Slot this dot belongs to.
    #[inline]
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Top-left corner in pixels.
    #[inline]
    pub fn position(&self) -> IVec2 {
        self.position
    }

    /// Pixels moved per step.
    #[inline]
    pub fn velocity(&self) -> IVec2 {
        self.velocity
    }

    /// Directions currently held.
    #[inline]
    pub fn held(&self) -> Intents {
        self.held
    }

    /// Overwrite the position with a snapshot.
    #[inline]
    pub fn apply_absolute_position(&mut self, x: i32, y: i32) {
        self.position = IVec2::new(x, y);
    }

    /// Apply one press/release edge.
    ///
    /// A press of an already held direction, or a release of one that is not
    /// held, changes nothing.
    pub fn handle_input(&mut self, event: IntentEvent, unit_velocity: i32) {
        match event {
            IntentEvent::Pressed(direction) => {
                if !self.held.contains(direction.flag()) {
                    self.held.insert(direction.flag());
                    self.velocity += scaled(direction.unit(), unit_velocity);
                }
            }
            IntentEvent::Released(direction) => {
                if self.held.contains(direction.flag()) {
                    self.held.remove(direction.flag());
                    self.velocity += scaled(-direction.unit(), unit_velocity);
                }
            }
        }
    }

    /// Bring the held set in line with this tick's sample.
    pub fn apply_intents(&mut self, current: Intents, unit_velocity: i32) {
        for event in transitions(self.held, current) {
            self.handle_input(event, unit_velocity);
        }
    }

    /// Advance one tick: `position += velocity`, then the boundary rule.
    pub fn step(&mut self, arena: &ArenaConfig) {
        let size = arena.entity_size;
        self.position = match arena.boundary {
            BoundaryPolicy::Wrap => IVec2::new(
                wrap_axis(self.position.x, self.velocity.x, arena.width, size),
                wrap_axis(self.position.y, self.velocity.y, arena.height, size),
            ),
            BoundaryPolicy::Clamp => IVec2::new(
                clamp_axis(self.position.x, self.velocity.x, arena.width, size),
                clamp_axis(self.position.y, self.velocity.y, arena.height, size),
            ),
        };
    }
}

#[inline]
fn scaled(unit: IVec2, factor: i32) -> IVec2 {
    IVec2::new(unit.x.saturating_mul(factor), unit.y.saturating_mul(factor))
}

/// Wrap on one axis.
///
/// A dot is on screen while `-size <= pos <= extent`, so the axis has
/// `extent + size + 1` distinct positions; overshoot past one end carries
/// over to the other.
fn wrap_axis(pos: i32, vel: i32, extent: i32, size: i32) -> i32 {
    let next = i64::from(pos) + i64::from(vel);
    let low = -i64::from(size);
    let period = i64::from(extent) + i64::from(size) + 1;
    let wrapped = (next - low).rem_euclid(period) + low;
    // Always within [-size, extent].
    wrapped as i32
}

/// Clamp-revert on one axis.
fn clamp_axis(pos: i32, vel: i32, extent: i32, size: i32) -> i32 {
    let max = extent - size;
    let next = pos.saturating_add(vel);
    let kept = if (0..=max).contains(&next) { next } else { pos };
    // A snapshot may have left the dot outside the walls.
    kept.clamp(0, max)
}
