//! Core primitives.
//!
//! Integer pixel-space math shared by the game and network layers.

pub mod vec2;

pub use vec2::IVec2;
