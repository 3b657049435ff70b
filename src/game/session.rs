//! Session State Machine
//!
//! Tracks the session phase, the local player's identity and the countdown.
//!
//! ```text
//! Waiting ──SessionStart──▶ Running ──capture / countdown──▶ Ended
//!    └──────────────SessionEnd (from relay)──────────────────▲
//! ```
//!
//! Phases only move forward. Once `Ended`, nothing changes any more.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::config::ConfigurationError;
use crate::game::state::{PlayerId, Team};

/// Session phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionPhase {
    /// Connected, waiting for the relay to start the round.
    Waiting,
    /// Round in progress, input is live.
    Running,
    /// Round resolved. Terminal.
    Ended,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Waiting => f.write_str("waiting"),
            SessionPhase::Running => f.write_str("running"),
            SessionPhase::Ended => f.write_str("ended"),
        }
    }
}

/// Configuration for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Ticks the quarry must survive (1800 = one minute at 30 Hz).
    pub countdown_ticks: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: crate::COUNTDOWN_TICKS,
        }
    }
}

impl SessionConfig {
    /// Reject a countdown that would end the round before it starts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.countdown_ticks == 0 {
            return Err(ConfigurationError::ZeroCountdown);
        }
        Ok(())
    }
}

/// Why the session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EndReason {
    /// The given hunter touched the quarry on this client.
    Capture(PlayerId),
    /// The countdown ran out on this client.
    CountdownExpired,
    /// The relay announced the result.
    Announced,
}

/// How a result reads for the local player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The quarry escaped and this client is the quarry.
    SoloVictory,
    /// The hunters caught the quarry and this client is a hunter.
    TeamVictory,
    /// The other side won.
    Defeat,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::SoloVictory => f.write_str("you alone have won"),
            Verdict::TeamVictory => f.write_str("your team has won"),
            Verdict::Defeat => f.write_str("you have lost"),
        }
    }
}

/// Result of a finished session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Outcome {
    /// Winning team.
    pub winner: Team,
    /// What triggered the end.
    pub reason: EndReason,
}

impl Outcome {
    /// Read the result from one player's point of view.
    pub fn verdict(&self, local: PlayerId) -> Verdict {
        match (local.team() == self.winner, self.winner) {
            (true, Team::Quarry) => Verdict::SoloVictory,
            (true, Team::Hunters) => Verdict::TeamVictory,
            (false, _) => Verdict::Defeat,
        }
    }
}

/// Phase, identity and countdown of one client's session.
#[derive(Clone, Debug)]
pub struct Session {
    config: SessionConfig,
    phase: SessionPhase,
    local: Option<PlayerId>,
    countdown: u32,
    outcome: Option<Outcome>,
}

impl Session {
    /// Create a session waiting for its identity and start signal.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phase: SessionPhase::Waiting,
            local: None,
            countdown: 0,
            outcome: None,
        }
    }

    /// Current phase.
    #[inline]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Slot owned by this client, once assigned.
    #[inline]
    pub fn local_player(&self) -> Option<PlayerId> {
        self.local
    }

    /// Ticks elapsed while running.
    #[inline]
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    /// Ticks left before the quarry wins.
    #[inline]
    pub fn ticks_remaining(&self) -> u32 {
        self.config.countdown_ticks.saturating_sub(self.countdown)
    }

    /// Result, once ended.
    #[inline]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Whether local input may move the owned dot.
    #[inline]
    pub fn accepts_input(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    /// Record the identity handed out by the relay.
    ///
    /// Returns `true` if this call set it. The first assignment sticks; a
    /// repeat, even with another slot, leaves it unchanged.
    pub fn assign_identity(&mut self, id: PlayerId) -> bool {
        if self.local.is_some() {
            return false;
        }
        self.local = Some(id);
        true
    }

    /// Handle the relay's start signal.
    ///
    /// Returns `true` on the `Waiting → Running` transition; ignored in any
    /// later phase. Starting without an identity is a configuration error.
    pub fn start(&mut self) -> Result<bool, ConfigurationError> {
        if self.phase != SessionPhase::Waiting {
            return Ok(false);
        }
        if self.local.is_none() {
            return Err(ConfigurationError::MissingIdentity);
        }
        self.phase = SessionPhase::Running;
        Ok(true)
    }

    /// End the session with a known result.
    ///
    /// Returns `true` if this call ended it.
    pub fn end(&mut self, outcome: Outcome) -> bool {
        if self.phase == SessionPhase::Ended {
            return false;
        }
        self.phase = SessionPhase::Ended;
        self.outcome = Some(outcome);
        true
    }

    /// Count one running tick and resolve win conditions.
    ///
    /// A capture takes precedence over an expiring countdown on the same
    /// tick. Returns the outcome if this tick ended the session.
    pub fn advance(&mut self, captured_by: Option<PlayerId>) -> Option<Outcome> {
        if self.phase != SessionPhase::Running {
            return None;
        }

        self.countdown = self.countdown.saturating_add(1);

        let outcome = if let Some(hunter) = captured_by {
            Outcome {
                winner: Team::Hunters,
                reason: EndReason::Capture(hunter),
            }
        } else if self.countdown >= self.config.countdown_ticks {
            Outcome {
                winner: Team::Quarry,
                reason: EndReason::CountdownExpired,
            }
        } else {
            return None;
        };

        self.end(outcome);
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn running_session(countdown_ticks: u32) -> Session {
        let mut session = Session::new(SessionConfig { countdown_ticks });
        session.assign_identity(PlayerId::HUNTER_A);
        assert!(session.start().unwrap());
        session
    }

    #[test]
    fn test_start_requires_identity() {
        let mut session = Session::new(SessionConfig::default());
        assert!(matches!(session.start(), Err(ConfigurationError::MissingIdentity)));
        assert_eq!(session.phase(), SessionPhase::Waiting);

        session.assign_identity(PlayerId::QUARRY);
        assert!(session.start().unwrap());
        assert_eq!(session.phase(), SessionPhase::Running);

        // Second start is ignored
        assert!(!session.start().unwrap());
    }

    #[test]
    fn test_identity_is_immutable() {
        let mut session = Session::new(SessionConfig::default());
        assert!(session.assign_identity(PlayerId::HUNTER_B));
        assert!(!session.assign_identity(PlayerId::QUARRY));
        assert_eq!(session.local_player(), Some(PlayerId::HUNTER_B));
    }

    #[test]
    fn test_countdown_only_while_running() {
        let mut session = Session::new(SessionConfig::default());
        session.assign_identity(PlayerId::QUARRY);
        assert_eq!(session.advance(None), None);
        assert_eq!(session.countdown(), 0);

        session.start().unwrap();
        session.advance(None);
        session.advance(None);
        assert_eq!(session.countdown(), 2);
        assert_eq!(session.ticks_remaining(), 1798);
    }

    #[test]
    fn test_countdown_expiry_quarry_wins() {
        let mut session = running_session(3);
        assert_eq!(session.advance(None), None);
        assert_eq!(session.advance(None), None);

        let outcome = session.advance(None).unwrap();
        assert_eq!(outcome.winner, Team::Quarry);
        assert_eq!(outcome.reason, EndReason::CountdownExpired);
        assert_eq!(session.phase(), SessionPhase::Ended);

        // Frozen afterwards
        assert_eq!(session.advance(None), None);
        assert_eq!(session.countdown(), 3);
        assert!(!session.accepts_input());
    }

    #[test]
    fn test_capture_beats_countdown() {
        let mut session = running_session(1);
        let outcome = session.advance(Some(PlayerId::HUNTER_B)).unwrap();
        assert_eq!(outcome.winner, Team::Hunters);
        assert_eq!(outcome.reason, EndReason::Capture(PlayerId::HUNTER_B));
    }

    #[test]
    fn test_announced_end_from_waiting() {
        let mut session = Session::new(SessionConfig::default());
        let outcome = Outcome { winner: Team::Quarry, reason: EndReason::Announced };
        assert!(session.end(outcome));
        assert!(!session.end(Outcome { winner: Team::Hunters, reason: EndReason::Announced }));
        assert_eq!(session.outcome(), Some(outcome));

        session.assign_identity(PlayerId::QUARRY);
        assert!(!session.start().unwrap());
        assert_eq!(session.phase(), SessionPhase::Ended);
    }

    #[test]
    fn test_verdicts() {
        let quarry_wins = Outcome { winner: Team::Quarry, reason: EndReason::CountdownExpired };
        let hunters_win = Outcome { winner: Team::Hunters, reason: EndReason::Announced };

        assert_eq!(quarry_wins.verdict(PlayerId::QUARRY), Verdict::SoloVictory);
        assert_eq!(quarry_wins.verdict(PlayerId::HUNTER_A), Verdict::Defeat);
        assert_eq!(hunters_win.verdict(PlayerId::HUNTER_B), Verdict::TeamVictory);
        assert_eq!(hunters_win.verdict(PlayerId::QUARRY), Verdict::Defeat);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Assign(u8),
        Start,
        Advance(Option<u8>),
        Announce(bool),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u8..=3).prop_map(Op::Assign),
            Just(Op::Start),
            proptest::option::of(2u8..=3).prop_map(Op::Advance),
            any::<bool>().prop_map(Op::Announce),
        ]
    }

    proptest! {
        #[test]
        fn prop_phase_only_moves_forward(ops in proptest::collection::vec(op_strategy(), 0..64)) {
            let mut session = Session::new(SessionConfig { countdown_ticks: 5 });
            let mut previous = session.phase();

            for op in ops {
                match op {
                    Op::Assign(raw) => {
                        session.assign_identity(PlayerId::new(i32::from(raw)).unwrap());
                    }
                    Op::Start => {
                        let _ = session.start();
                    }
                    Op::Advance(hunter) => {
                        session.advance(hunter.and_then(|raw| PlayerId::new(i32::from(raw))));
                    }
                    Op::Announce(quarry) => {
                        let winner = if quarry { Team::Quarry } else { Team::Hunters };
                        session.end(Outcome { winner, reason: EndReason::Announced });
                    }
                }

                prop_assert!(session.phase() >= previous);
                if previous == SessionPhase::Ended {
                    prop_assert_eq!(session.phase(), SessionPhase::Ended);
                }
                previous = session.phase();
            }
        }
    }
}
