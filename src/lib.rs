//! # Dot Chase Client
//!
//! Networked three-player chase on a 2D arena. One quarry flees two hunters;
//! the hunters win by touching it, the quarry by surviving the countdown.
//! Each client simulates its own dot and exchanges absolute positions with
//! the others through a relay.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DOT CHASE CLIENT                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/            - Primitives                               │
//! │  └── vec2.rs      - Integer pixel-space vector               │
//! │                                                              │
//! │  game/            - Game logic                               │
//! │  ├── state.rs     - Player slots, teams, roster              │
//! │  ├── input.rs     - Directional intents                      │
//! │  ├── dot.rs       - Dot motion, wrap / clamp boundaries      │
//! │  ├── collision.rs - Quarry-hunter touch test                 │
//! │  └── session.rs   - Waiting → Running → Ended                │
//! │                                                              │
//! │  network/         - Relay connection                         │
//! │  ├── protocol.rs  - ASCII NUL-terminated message codec       │
//! │  └── transport.rs - Stream framing, non-blocking TCP         │
//! │                                                              │
//! │  sync.rs          - Per-tick simulation loop                 │
//! │  config.rs        - Client settings and setup errors         │
//! │  frontend.rs      - Terminal keys and status line            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Networking Model
//!
//! Last write wins. Remote dots are only ever moved by the snapshots the
//! relay forwards; there is no prediction or interpolation. Each client
//! decides captures and countdown expiry for itself and announces the
//! result once.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;
pub mod sync;
pub mod config;
pub mod frontend;

// Re-export commonly used types
pub use core::vec2::IVec2;
pub use game::state::{PlayerId, Team, Roster};
pub use game::dot::{ArenaConfig, BoundaryPolicy, DotEntity};
pub use game::session::{Outcome, Session, SessionConfig, SessionPhase, Verdict};
pub use network::protocol::{Frame, Message, ProtocolError};
pub use network::transport::{TcpTransport, Transport, TransportError};
pub use sync::{InputSource, LoopExit, Renderer, Scene, SyncError, SyncLoop};
pub use config::{ClientConfig, ConfigurationError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default loop frequency (Hz)
pub const TICK_RATE: u32 = 30;

/// Default countdown in ticks (60 seconds * 30 Hz)
pub const COUNTDOWN_TICKS: u32 = 1800;
