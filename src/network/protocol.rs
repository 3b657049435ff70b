//! Protocol Messages
//!
//! ASCII wire format shared with the relay. A frame is a leading type digit
//! followed by space-separated decimal integers, terminated by one NUL byte:
//!
//! ```text
//! 0 <id>            AssignId        relay -> client, once at connect
//! 1 <id> <x> <y>    PositionUpdate  both ways, every running tick
//! 3 <team>          SessionEnd      both ways (1 = quarry, 2 = hunters)
//! 4                 SessionStart    relay -> client, once
//! ```
//!
//! Frames live in a fixed 512-byte buffer whose unused tail is zero.
//! Decoding never allocates and never fills in a missing field.

use std::fmt;

use crate::game::state::Team;

/// Capacity of one frame, terminator included.
pub const FRAME_CAPACITY: usize = 512;

/// Frame terminator.
pub const FRAME_TERMINATOR: u8 = 0;

// =============================================================================
// MESSAGES
// =============================================================================

/// Message kind, identified by the leading digit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// `0`
    AssignId,
    /// `1`
    PositionUpdate,
    /// `3`
    SessionEnd,
    /// `4`
    SessionStart,
}

impl MessageKind {
    /// Leading digit on the wire.
    pub fn code(self) -> u8 {
        match self {
            MessageKind::AssignId => b'0',
            MessageKind::PositionUpdate => b'1',
            MessageKind::SessionEnd => b'3',
            MessageKind::SessionStart => b'4',
        }
    }

    /// Look up a leading digit.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'0' => Some(MessageKind::AssignId),
            b'1' => Some(MessageKind::PositionUpdate),
            b'3' => Some(MessageKind::SessionEnd),
            b'4' => Some(MessageKind::SessionStart),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::AssignId => f.write_str("assign_id"),
            MessageKind::PositionUpdate => f.write_str("position_update"),
            MessageKind::SessionEnd => f.write_str("session_end"),
            MessageKind::SessionStart => f.write_str("session_start"),
        }
    }
}

/// A decoded wire message.
///
/// Player ids are carried raw: an update for a slot outside 1..=3 is still a
/// well-formed message, and it is up to the receiver to ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Message {
    /// Relay tells the client which slot it owns.
    AssignId {
        /// Raw slot number.
        player: i32,
    },
    /// Absolute position of one dot.
    PositionUpdate {
        /// Raw slot number.
        player: i32,
        /// X in pixels.
        x: i32,
        /// Y in pixels.
        y: i32,
    },
    /// Round is over.
    SessionEnd {
        /// Winning team.
        team: Team,
    },
    /// Round begins.
    SessionStart,
}

impl Message {
    /// Kind of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::AssignId { .. } => MessageKind::AssignId,
            Message::PositionUpdate { .. } => MessageKind::PositionUpdate,
            Message::SessionEnd { .. } => MessageKind::SessionEnd,
            Message::SessionStart => MessageKind::SessionStart,
        }
    }

    /// Encode into a NUL-terminated frame.
    pub fn encode(&self) -> Frame {
        let mut writer = FrameWriter::new(self.kind());
        match *self {
            Message::AssignId { player } => {
                writer.push_int(player);
            }
            Message::PositionUpdate { player, x, y } => {
                writer.push_int(player);
                writer.push_int(x);
                writer.push_int(y);
            }
            Message::SessionEnd { team } => {
                writer.push_int(team.wire());
            }
            Message::SessionStart => {}
        }
        writer.finish()
    }

    /// Decode a received buffer.
    ///
    /// Reads up to the first NUL (or the whole buffer if there is none), so
    /// both a bare payload and a zero-padded 512-byte buffer are accepted.
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        let end = raw
            .iter()
            .position(|&b| b == FRAME_TERMINATOR)
            .unwrap_or(raw.len());
        if end >= FRAME_CAPACITY {
            return Err(ProtocolError::Oversized { len: end });
        }

        let text = std::str::from_utf8(&raw[..end])
            .ok()
            .filter(|text| text.is_ascii())
            .ok_or(ProtocolError::NotAscii)?;

        if text.is_empty() {
            return Err(ProtocolError::Empty);
        }
        if text.split(' ').any(str::is_empty) {
            return Err(ProtocolError::BadSeparator);
        }

        let mut fields = text.split(' ');
        let head = fields.next().ok_or(ProtocolError::Empty)?;
        let kind = match head.as_bytes() {
            [code] => MessageKind::from_code(*code).ok_or(ProtocolError::UnknownKind(*code as char)),
            _ => Err(ProtocolError::InvalidKind),
        }?;

        let mut reader = FieldReader { kind, fields };
        let message = match kind {
            MessageKind::AssignId => Message::AssignId {
                player: reader.int("player")?,
            },
            MessageKind::PositionUpdate => Message::PositionUpdate {
                player: reader.int("player")?,
                x: reader.int("x")?,
                y: reader.int("y")?,
            },
            MessageKind::SessionEnd => {
                let raw_team = reader.int("team")?;
                Message::SessionEnd {
                    team: Team::from_wire(raw_team).ok_or(ProtocolError::UnknownTeam(raw_team))?,
                }
            }
            MessageKind::SessionStart => Message::SessionStart,
        };
        reader.finish()?;

        Ok(message)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::AssignId { player } => write!(f, "0 {player}"),
            Message::PositionUpdate { player, x, y } => write!(f, "1 {player} {x} {y}"),
            Message::SessionEnd { team } => write!(f, "3 {}", team.wire()),
            Message::SessionStart => f.write_str("4"),
        }
    }
}

// =============================================================================
// FRAME
// =============================================================================

/// One encoded message in its fixed buffer.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; FRAME_CAPACITY],
    /// Text length plus the terminator.
    len: usize,
}

impl Frame {
    /// Wrap a received payload (terminator already stripped).
    pub fn from_payload(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() >= FRAME_CAPACITY {
            return Err(ProtocolError::Oversized { len: payload.len() });
        }
        let mut bytes = [0u8; FRAME_CAPACITY];
        bytes[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            bytes,
            len: payload.len() + 1,
        })
    }

    /// Decode the message held in this frame.
    #[inline]
    pub fn decode(&self) -> Result<Message, ProtocolError> {
        Message::decode(self.as_bytes())
    }

    /// Wire bytes: the text and its NUL terminator.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Text without the terminator.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.bytes[..self.len - 1]
    }

    /// The full zero-padded buffer.
    #[inline]
    pub fn buffer(&self) -> &[u8; FRAME_CAPACITY] {
        &self.bytes
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({:?})", String::from_utf8_lossy(self.payload()))
    }
}

/// Builds a frame in place.
struct FrameWriter {
    bytes: [u8; FRAME_CAPACITY],
    len: usize,
}

impl FrameWriter {
    fn new(kind: MessageKind) -> Self {
        let mut bytes = [0u8; FRAME_CAPACITY];
        bytes[0] = kind.code();
        Self { bytes, len: 1 }
    }

    fn push(&mut self, byte: u8) {
        // Last slot is reserved for the terminator. Four i32 fields never
        // come close to the capacity.
        if self.len < FRAME_CAPACITY - 1 {
            self.bytes[self.len] = byte;
            self.len += 1;
        }
    }

    fn push_int(&mut self, value: i32) {
        self.push(b' ');
        if value < 0 {
            self.push(b'-');
        }

        let mut digits = [0u8; 10];
        let mut remaining = value.unsigned_abs();
        let mut count = 0;
        loop {
            digits[count] = b'0' + (remaining % 10) as u8;
            remaining /= 10;
            count += 1;
            if remaining == 0 {
                break;
            }
        }
        for &digit in digits[..count].iter().rev() {
            self.push(digit);
        }
    }

    fn finish(self) -> Frame {
        // bytes[len] is still zero: that is the terminator.
        Frame {
            bytes: self.bytes,
            len: self.len + 1,
        }
    }
}

/// Positional integer fields of one message.
struct FieldReader<'a> {
    kind: MessageKind,
    fields: std::str::Split<'a, char>,
}

impl FieldReader<'_> {
    fn int(&mut self, field: &'static str) -> Result<i32, ProtocolError> {
        let token = self.fields.next().ok_or(ProtocolError::MissingField {
            kind: self.kind,
            field,
        })?;
        let digits = token.strip_prefix('-').unwrap_or(token);
        let invalid = ProtocolError::InvalidInteger {
            kind: self.kind,
            field,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid);
        }
        token.parse().map_err(|_| invalid)
    }

    fn finish(mut self) -> Result<(), ProtocolError> {
        match self.fields.next() {
            Some(_) => Err(ProtocolError::TrailingFields { kind: self.kind }),
            None => Ok(()),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// A frame that cannot be decoded. Recoverable: the message is dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// Nothing before the terminator.
    #[error("Empty frame")]
    Empty,

    /// No terminator within the frame capacity.
    #[error("Frame of {len} bytes has no terminator within capacity")]
    Oversized {
        /// Bytes seen before giving up.
        len: usize,
    },

    /// Payload contains non-ASCII bytes.
    #[error("Frame is not ASCII text")]
    NotAscii,

    /// Fields not separated by exactly one space.
    #[error("Fields must be separated by single spaces")]
    BadSeparator,

    /// Leading token is not a single character.
    #[error("Invalid message kind token")]
    InvalidKind,

    /// Leading digit is not in the catalogue.
    #[error("Unknown message kind '{0}'")]
    UnknownKind(char),

    /// Frame ends before a required field.
    #[error("Truncated {kind}: missing {field}")]
    MissingField {
        /// Message being decoded.
        kind: MessageKind,
        /// Name of the first missing field.
        field: &'static str,
    },

    /// Field is not a decimal `i32`.
    #[error("Invalid integer for {field} in {kind}")]
    InvalidInteger {
        /// Message being decoded.
        kind: MessageKind,
        /// Name of the bad field.
        field: &'static str,
    },

    /// Team number is neither 1 nor 2.
    #[error("Unknown team {0}")]
    UnknownTeam(i32),

    /// More fields than the message kind defines.
    #[error("Unexpected trailing fields in {kind}")]
    TrailingFields {
        /// Message being decoded.
        kind: MessageKind,
    },
}
