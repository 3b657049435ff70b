//! Relay Transport
//!
//! One persistent, ordered byte stream to the relay. Frames are delimited by
//! their NUL terminator, so the stream side has to put them back together:
//! a read may end mid-frame, carry several frames, or carry the zero padding
//! of a fixed-size buffer.
//!
//! Nothing here blocks. [`Transport::poll_incoming`] returns whatever has
//! arrived and [`Transport::send`] queues what the socket cannot take yet.

use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::{debug, info};

use crate::network::protocol::{Frame, ProtocolError, FRAME_CAPACITY, FRAME_TERMINATOR};

/// Outbound bytes allowed to pile up before the relay counts as stalled.
pub const MAX_OUTBOX: usize = 64 * 1024;

/// Size of one socket read.
const READ_CHUNK: usize = 4096;

/// A frame pulled off the stream, or the reason it could not be delimited.
pub type Inbound = Result<Frame, ProtocolError>;

/// Connection to the relay as seen by the sync loop.
pub trait Transport {
    /// Append every frame that has arrived so far to `out`, without waiting.
    fn poll_incoming(&mut self, out: &mut Vec<Inbound>) -> Result<(), TransportError>;

    /// Queue one frame for the relay.
    fn send(&mut self, frame: &Frame) -> Result<(), TransportError>;
}

// =============================================================================
// FRAME ASSEMBLY
// =============================================================================

/// Splits a byte stream into NUL-terminated frames.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    pending: Vec<u8>,
    /// Skipping the rest of an oversized frame up to its terminator.
    discarding: bool,
}

impl FrameAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of the incomplete frame held so far.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feed one read's worth of bytes.
    ///
    /// Complete frames go to `out` in stream order. Empty frames (runs of
    /// padding) are dropped. Once a frame reaches capacity without a
    /// terminator it is reported once and the rest of it is skipped.
    pub fn push(&mut self, bytes: &[u8], out: &mut Vec<Inbound>) {
        for &byte in bytes {
            if byte == FRAME_TERMINATOR {
                if !self.discarding && !self.pending.is_empty() {
                    out.push(Frame::from_payload(&self.pending));
                }
                self.pending.clear();
                self.discarding = false;
                continue;
            }
            if self.discarding {
                continue;
            }

            self.pending.push(byte);
            if self.pending.len() >= FRAME_CAPACITY {
                out.push(Err(ProtocolError::Oversized {
                    len: self.pending.len(),
                }));
                self.pending.clear();
                self.discarding = true;
            }
        }
    }
}

// =============================================================================
// TCP
// =============================================================================

/// Transport over a tokio TCP stream, driven with non-blocking reads and writes.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
    assembler: FrameAssembler,
    outbox: Vec<u8>,
}

impl TcpTransport {
    /// Connect to the relay.
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await.map_err(TransportError::Connect)?;
        let transport = Self::from_stream(stream)?;
        info!("Connected to relay at {}", transport.peer);
        Ok(transport)
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Result<Self, TransportError> {
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        Ok(Self {
            stream,
            peer,
            assembler: FrameAssembler::new(),
            outbox: Vec::new(),
        })
    }

    /// Address of the relay.
    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Bytes queued but not yet accepted by the socket.
    #[inline]
    pub fn queued_bytes(&self) -> usize {
        self.outbox.len()
    }

    /// Write as much of the outbox as the socket takes right now.
    fn flush(&mut self) -> Result<(), TransportError> {
        while !self.outbox.is_empty() {
            match self.stream.try_write(&self.outbox) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => {
                    self.outbox.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e)),
            }
        }

        if !self.outbox.is_empty() {
            debug!("{} bytes waiting for the socket", self.outbox.len());
        }
        if self.outbox.len() > MAX_OUTBOX {
            return Err(TransportError::Stalled {
                queued: self.outbox.len(),
            });
        }
        Ok(())
    }
}

impl Transport for TcpTransport {
    fn poll_incoming(&mut self, out: &mut Vec<Inbound>) -> Result<(), TransportError> {
        self.flush()?;

        let mut buf = [0u8; READ_CHUNK];
        loop {
            match self.stream.try_read(&mut buf) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => self.assembler.push(&buf[..n], out),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
    }

    fn send(&mut self, frame: &Frame) -> Result<(), TransportError> {
        self.outbox.extend_from_slice(frame.as_bytes());
        self.flush()
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Loss of the relay connection. Always fatal: there is no reconnect.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not reach the relay.
    #[error("Failed to connect to relay: {0}")]
    Connect(#[source] io::Error),

    /// The relay closed the stream.
    #[error("Connection closed by relay")]
    Closed,

    /// The relay stopped reading.
    #[error("Relay stalled with {queued} bytes queued")]
    Stalled {
        /// Bytes waiting in the outbox.
        queued: usize,
    },

    /// Socket failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Team;
    use crate::network::protocol::Message;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn decoded(frames: &[Inbound]) -> Vec<Message> {
        frames
            .iter()
            .map(|frame| frame.as_ref().unwrap().decode().unwrap())
            .collect()
    }

    #[test]
    fn test_assembler_splits_frames() {
        let mut assembler = FrameAssembler::new();
        let mut out = Vec::new();

        assembler.push(b"0 2\x004\x001 3 10 20\x00", &mut out);
        assert_eq!(
            decoded(&out),
            vec![
                Message::AssignId { player: 2 },
                Message::SessionStart,
                Message::PositionUpdate { player: 3, x: 10, y: 20 },
            ]
        );
        assert_eq!(assembler.pending_len(), 0);
    }

    #[test]
    fn test_assembler_joins_partial_reads() {
        let mut assembler = FrameAssembler::new();
        let mut out = Vec::new();

        assembler.push(b"1 1 -4", &mut out);
        assert!(out.is_empty());
        assert_eq!(assembler.pending_len(), 6);

        assembler.push(b"0 7\x003", &mut out);
        assembler.push(b" 2\x00", &mut out);
        assert_eq!(
            decoded(&out),
            vec![
                Message::PositionUpdate { player: 1, x: -40, y: 7 },
                Message::SessionEnd { team: Team::Hunters },
            ]
        );
    }

    #[test]
    fn test_assembler_skips_padding() {
        let mut assembler = FrameAssembler::new();
        let mut out = Vec::new();

        // A full fixed-size buffer as the relay may forward it.
        let frame = Message::SessionEnd { team: Team::Quarry }.encode();
        assembler.push(frame.buffer(), &mut out);
        assembler.push(&[0u8; 64], &mut out);
        assembler.push(frame.buffer(), &mut out);

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|f| f.as_ref().unwrap().payload() == b"3 1"));
    }

    #[test]
    fn test_assembler_rejects_oversized() {
        let mut assembler = FrameAssembler::new();
        let mut out = Vec::new();

        assembler.push(&[b'1'; FRAME_CAPACITY - 1], &mut out);
        assert!(out.is_empty());

        // Crossing capacity reports once, then the tail is skipped.
        assembler.push(&[b'1'; 100], &mut out);
        assembler.push(b"9 9\x004\x00", &mut out);

        assert_eq!(out.len(), 2);
        assert!(matches!(out[0], Err(ProtocolError::Oversized { len: FRAME_CAPACITY })));
        assert_eq!(out[1].as_ref().unwrap().decode().unwrap(), Message::SessionStart);
    }

    #[test]
    fn test_assembler_longest_frame_fits() {
        let mut assembler = FrameAssembler::new();
        let mut out = Vec::new();

        let mut bytes = vec![b' '; FRAME_CAPACITY - 2];
        bytes.push(b'4');
        bytes.push(FRAME_TERMINATOR);
        assembler.push(&bytes, &mut out);

        assert_eq!(out.len(), 1);
        let frame = out[0].as_ref().unwrap();
        assert_eq!(frame.payload().len(), FRAME_CAPACITY - 1);
        assert_eq!(frame.payload().last(), Some(&b'4'));
    }

    async fn poll_until(transport: &mut TcpTransport, count: usize) -> Vec<Inbound> {
        let mut out = Vec::new();
        for _ in 0..200 {
            transport.poll_incoming(&mut out).unwrap();
            if out.len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        out
    }

    #[tokio::test]
    async fn test_tcp_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpTransport::connect(addr).await.unwrap();
        let (mut relay, _) = listener.accept().await.unwrap();
        assert_eq!(client.peer_addr(), addr);

        // Nothing arrived yet: the poll returns immediately.
        let mut out = Vec::new();
        client.poll_incoming(&mut out).unwrap();
        assert!(out.is_empty());

        relay.write_all(b"0 2\x00").await.unwrap();
        relay.write_all(b"4\x001 1 30").await.unwrap();
        relay.write_all(b"0 40\x00").await.unwrap();

        let out = poll_until(&mut client, 3).await;
        assert_eq!(
            decoded(&out),
            vec![
                Message::AssignId { player: 2 },
                Message::SessionStart,
                Message::PositionUpdate { player: 1, x: 300, y: 40 },
            ]
        );

        client
            .send(&Message::PositionUpdate { player: 2, x: 193, y: 140 }.encode())
            .unwrap();
        let mut received = [0u8; 12];
        relay.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"1 2 193 140\x00");
        assert_eq!(client.queued_bytes(), 0);
    }

    #[tokio::test]
    async fn test_tcp_close_is_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let mut client = TcpTransport::connect(addr).await.unwrap();
        let (relay, _) = listener.accept().await.unwrap();
        drop(relay);

        let mut out = Vec::new();
        let mut result = Ok(());
        for _ in 0..200 {
            result = client.poll_incoming(&mut out);
            if result.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(matches!(result, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = TcpTransport::connect(addr).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
