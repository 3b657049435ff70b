//! Sync Loop
//!
//! The single loop that owns the relay connection, the three dots, the
//! session state machine and the renderer handoff. One tick, in order:
//!
//! 1. Drain every inbound frame that has arrived (never waits)
//! 2. While running: apply local intents, step all dots
//! 3. While running: send the owned dot's position
//! 4. While running: capture check, countdown, win resolution
//! 5. Present positions and outcome
//!
//! A bad frame is logged and skipped. A lost connection or invalid setup
//! stops the loop and is returned to the caller.

use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::ConfigurationError;
use crate::core::vec2::IVec2;
use crate::game::collision::check_capture;
use crate::game::dot::ArenaConfig;
use crate::game::input::Intents;
use crate::game::session::{EndReason, Outcome, Session, SessionConfig, SessionPhase, Verdict};
use crate::game::state::{PlayerId, Roster};
use crate::network::protocol::Message;
use crate::network::transport::{Inbound, Transport, TransportError};

/// Countdown ticks between progress log lines.
const COUNTDOWN_LOG_INTERVAL: u32 = 300;

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Source of the local player's directional input.
pub trait InputSource {
    /// Directions held right now. Sampled once per tick.
    fn current_intents(&mut self) -> Intents;

    /// Whether the player asked to leave.
    fn quit_requested(&mut self) -> bool;
}

/// Receives the state to draw at the end of each tick.
pub trait Renderer {
    /// Draw one tick.
    fn present(&mut self, scene: &Scene);
}

/// What the renderer gets each tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scene {
    /// Dot positions in slot order.
    pub positions: [(PlayerId, IVec2); 3],
    /// Current phase.
    pub phase: SessionPhase,
    /// Owned slot, once assigned.
    pub local: Option<PlayerId>,
    /// Ticks before the quarry wins.
    pub ticks_remaining: u32,
    /// Result, once ended.
    pub outcome: Option<Outcome>,
}

impl Scene {
    /// The result from the local player's point of view.
    pub fn verdict(&self) -> Option<Verdict> {
        Some(self.outcome?.verdict(self.local?))
    }
}

// =============================================================================
// LOOP
// =============================================================================

/// Result of one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickStatus {
    /// Keep ticking.
    Continue,
    /// The player asked to quit; nothing was processed.
    Quit,
    /// The session is over.
    Ended(Outcome),
}

/// Why [`SyncLoop::run`] returned normally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// The player quit.
    Quit,
    /// The session ended with this result.
    Ended(Outcome),
}

/// Client simulation loop.
pub struct SyncLoop<T, I, R> {
    transport: T,
    input: I,
    renderer: R,
    arena: ArenaConfig,
    roster: Roster,
    session: Session,
    inbox: Vec<Inbound>,
}

impl<T: Transport, I: InputSource, R: Renderer> SyncLoop<T, I, R> {
    /// Create a loop with all dots at their spawn positions, waiting for the relay.
    ///
    /// Rejects arena or countdown settings the simulation cannot run with.
    pub fn new(
        transport: T,
        input: I,
        renderer: R,
        arena: ArenaConfig,
        session: SessionConfig,
    ) -> Result<Self, ConfigurationError> {
        arena.validate()?;
        session.validate()?;

        Ok(Self {
            transport,
            input,
            renderer,
            roster: Roster::new(&arena),
            arena,
            session: Session::new(session),
            inbox: Vec::new(),
        })
    }

    /// Session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The three dots.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Relay connection.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Relay connection, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Input source, mutably.
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Take the collaborators back.
    pub fn into_parts(self) -> (T, I, R) {
        (self.transport, self.input, self.renderer)
    }

    /// Tick once per `period` until the session ends, the player quits, or
    /// an error stops the loop.
    pub async fn run(&mut self, period: Duration) -> Result<LoopExit, SyncError> {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Sync loop ticking every {:?}", period);

        loop {
            ticker.tick().await;
            match self.tick()? {
                TickStatus::Continue => {}
                TickStatus::Quit => {
                    info!("Quit requested");
                    return Ok(LoopExit::Quit);
                }
                TickStatus::Ended(outcome) => {
                    info!("Session over, {} won", outcome.winner);
                    return Ok(LoopExit::Ended(outcome));
                }
            }
        }
    }

    /// Run one tick.
    pub fn tick(&mut self) -> Result<TickStatus, SyncError> {
        if self.input.quit_requested() {
            return Ok(TickStatus::Quit);
        }
        let intents = self.input.current_intents();

        // 1. Inbound
        self.drain_inbound()?;

        if self.session.phase() == SessionPhase::Running {
            if let Some(local) = self.session.local_player() {
                // 2. Motion
                self.roster.get_mut(local).apply_intents(intents, self.arena.unit_velocity);
                for dot in self.roster.iter_mut() {
                    dot.step(&self.arena);
                }

                // 3. Outbound position
                let position = self.roster.get(local).position();
                let update = Message::PositionUpdate {
                    player: local.get(),
                    x: position.x,
                    y: position.y,
                };
                self.transport.send(&update.encode())?;
            }

            // 4. Win conditions
            let captured_by = check_capture(&self.roster, self.arena.entity_size);
            if let Some(outcome) = self.session.advance(captured_by) {
                self.announce(outcome)?;
            } else if self.session.countdown() % COUNTDOWN_LOG_INTERVAL == 0 {
                debug!("{} ticks remaining", self.session.ticks_remaining());
            }
        }

        // 5. Present
        let scene = self.scene();
        self.renderer.present(&scene);

        Ok(match self.session.outcome() {
            Some(outcome) => TickStatus::Ended(outcome),
            None => TickStatus::Continue,
        })
    }

    /// Snapshot for the renderer.
    pub fn scene(&self) -> Scene {
        Scene {
            positions: self.roster.positions(),
            phase: self.session.phase(),
            local: self.session.local_player(),
            ticks_remaining: self.session.ticks_remaining(),
            outcome: self.session.outcome(),
        }
    }

    fn drain_inbound(&mut self) -> Result<(), SyncError> {
        let mut inbox = std::mem::take(&mut self.inbox);
        let polled = self.transport.poll_incoming(&mut inbox);

        let mut handled = Ok(());
        for inbound in inbox.drain(..) {
            let frame = match inbound {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Dropping frame: {}", e);
                    continue;
                }
            };
            match frame.decode() {
                Ok(message) => {
                    if let Err(e) = self.handle_message(message) {
                        handled = Err(e);
                        break;
                    }
                }
                Err(e) => warn!("Dropping malformed frame {}: {}", hex::encode(frame.payload()), e),
            }
        }
        self.inbox = inbox;

        handled?;
        polled?;
        Ok(())
    }

    fn handle_message(&mut self, message: Message) -> Result<(), SyncError> {
        match message {
            Message::AssignId { player } => {
                let id = PlayerId::new(player).ok_or(ConfigurationError::InvalidIdentity(player))?;
                if self.session.assign_identity(id) {
                    info!("Assigned {} ({})", id, id.team());
                } else {
                    warn!(
                        "Ignoring repeated identity {}, keeping {:?}",
                        id,
                        self.session.local_player()
                    );
                }
            }
            Message::PositionUpdate { player, x, y } => match PlayerId::new(player) {
                Some(id) if Some(id) == self.session.local_player() => {
                    debug!("Ignoring update for owned dot {}", id);
                }
                Some(id) => self.roster.get_mut(id).apply_absolute_position(x, y),
                None => warn!("Ignoring update for unknown player {}", player),
            },
            Message::SessionStart => {
                if self.session.start()? {
                    info!("Session started");
                } else {
                    debug!("Ignoring start in phase {}", self.session.phase());
                }
            }
            Message::SessionEnd { team } => {
                let outcome = Outcome {
                    winner: team,
                    reason: EndReason::Announced,
                };
                if self.session.end(outcome) {
                    self.log_outcome(outcome);
                } else {
                    debug!("Ignoring end for {} after session ended", team);
                }
            }
        }
        Ok(())
    }

    /// Tell the relay about a locally decided result.
    fn announce(&mut self, outcome: Outcome) -> Result<(), SyncError> {
        self.log_outcome(outcome);
        let end = Message::SessionEnd { team: outcome.winner };
        self.transport.send(&end.encode())?;
        Ok(())
    }

    fn log_outcome(&self, outcome: Outcome) {
        let verdict = self
            .session
            .local_player()
            .map(|local| outcome.verdict(local).to_string())
            .unwrap_or_else(|| "no identity".to_string());
        match outcome.reason {
            EndReason::Capture(hunter) => {
                info!("{} caught the quarry, hunters win: {}", hunter, verdict)
            }
            EndReason::CountdownExpired => info!("Quarry survived the countdown: {}", verdict),
            EndReason::Announced => info!("Relay reports {} won: {}", outcome.winner, verdict),
        }
    }
}

/// Fatal loop error.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Relay connection lost.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid setup or identity.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}
