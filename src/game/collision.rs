//! Collision Detection
//!
//! Touch test between dots. There is no physical response: a touch between
//! the quarry and a hunter ends the session, anything else is ignored.

use crate::game::dot::DotEntity;
use crate::game::state::{PlayerId, Roster};

/// Check if two dots touch: Euclidean distance between their positions is at
/// most `entity_size`.
#[inline]
pub fn is_colliding(a: &DotEntity, b: &DotEntity, entity_size: i32) -> bool {
    let reach = i128::from(entity_size);
    a.position().distance_squared(b.position()) <= reach * reach
}

/// Find the first hunter (in slot order) touching the quarry.
///
/// Hunter-hunter contact is never reported.
pub fn check_capture(roster: &Roster, entity_size: i32) -> Option<PlayerId> {
    let quarry = roster.quarry();
    PlayerId::HUNTERS
        .into_iter()
        .find(|hunter| is_colliding(quarry, roster.get(*hunter), entity_size))
}
