//! Network Module
//!
//! Wire codec and relay connection.
//!
//! ## Module Structure
//!
//! - `protocol`: ASCII message catalogue and fixed-size frames
//! - `transport`: Stream framing and the non-blocking TCP client

pub mod protocol;
pub mod transport;

// Re-export key types
pub use protocol::{Frame, Message, MessageKind, ProtocolError, FRAME_CAPACITY};
pub use transport::{FrameAssembler, Inbound, TcpTransport, Transport, TransportError};
