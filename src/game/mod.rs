//! Game Logic Module
//!
//! Everything that decides where the dots are and who won.
//!
//! ## Module Structure
//!
//! - `state`: Player slots, teams, the three-dot roster
//! - `input`: Directional intents and press/release edges
//! - `dot`: Dot motion and arena boundary rules
//! - `collision`: Quarry-hunter touch test
//! - `session`: Session phase, identity and countdown

pub mod state;
pub mod input;
pub mod dot;
pub mod collision;
pub mod session;

// Re-export key types
pub use state::{PlayerId, Team, Roster};
pub use input::{Direction, IntentEvent, Intents};
pub use dot::{ArenaConfig, BoundaryPolicy, DotEntity};
pub use collision::{check_capture, is_colliding};
pub use session::{EndReason, Outcome, Session, SessionConfig, SessionPhase, Verdict};
