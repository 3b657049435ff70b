//! Terminal Frontend
//!
//! Keyboard input and a one-line display for playing from a terminal, plus
//! headless stand-ins for running without one.
//!
//! Most terminals only report key presses and auto-repeats, never releases.
//! Where the terminal supports the keyboard enhancement protocol, real
//! release events are requested; otherwise a direction counts as held while
//! presses keep arriving within [`HOLD_WINDOW`].

use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{cursor, execute, queue};
use tracing::{debug, info, warn};

use crate::game::input::{Direction, Intents};
use crate::game::session::SessionPhase;
use crate::sync::{InputSource, Renderer, Scene};

/// How long a direction stays held after its last press when the terminal
/// does not report releases. Covers the usual auto-repeat delay.
pub const HOLD_WINDOW: Duration = Duration::from_millis(550);

// =============================================================================
// KEY STATE
// =============================================================================

/// Held directions and the quit flag, built from key events.
#[derive(Debug, Clone)]
pub struct KeyState {
    last_press: [Option<Instant>; 4],
    held: Intents,
    reports_release: bool,
    quit: bool,
}

impl KeyState {
    /// Empty state. `reports_release` selects exact releases over the hold window.
    pub fn new(reports_release: bool) -> Self {
        Self {
            last_press: [None; 4],
            held: Intents::empty(),
            reports_release,
            quit: false,
        }
    }

    /// Apply one key event received at `now`.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        let quit_key = key.code == KeyCode::Esc
            || key.code == KeyCode::Char('q')
            || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
        if quit_key && key.kind == KeyEventKind::Press {
            self.quit = true;
            return;
        }

        let Some(direction) = direction_for(key.code) else {
            return;
        };
        let slot = direction_slot(direction);
        match key.kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                self.held.insert(direction.flag());
                self.last_press[slot] = Some(now);
            }
            KeyEventKind::Release => {
                self.held.remove(direction.flag());
                self.last_press[slot] = None;
            }
        }
    }

    /// Directions held at `now`.
    pub fn intents(&mut self, now: Instant) -> Intents {
        if !self.reports_release {
            for direction in Direction::ALL {
                let slot = direction_slot(direction);
                let fresh = matches!(
                    self.last_press[slot],
                    Some(at) if now.saturating_duration_since(at) <= HOLD_WINDOW
                );
                if !fresh {
                    self.held.remove(direction.flag());
                    self.last_press[slot] = None;
                }
            }
        }
        self.held
    }

    /// Whether a quit key was pressed.
    #[inline]
    pub fn quit(&self) -> bool {
        self.quit
    }
}

fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up | KeyCode::Char('w') => Some(Direction::Up),
        KeyCode::Down | KeyCode::Char('s') => Some(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') => Some(Direction::Left),
        KeyCode::Right | KeyCode::Char('d') => Some(Direction::Right),
        _ => None,
    }
}

fn direction_slot(direction: Direction) -> usize {
    match direction {
        Direction::Up => 0,
        Direction::Down => 1,
        Direction::Left => 2,
        Direction::Right => 3,
    }
}

// =============================================================================
// TERMINAL INPUT
// =============================================================================

/// Raw-mode keyboard input. Restores the terminal when dropped.
pub struct TerminalInput {
    keys: KeyState,
    enhanced: bool,
}

impl TerminalInput {
    /// Switch the terminal to raw mode and start reading keys.
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let enhanced = matches!(terminal::supports_keyboard_enhancement(), Ok(true));
        if enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        debug!("Raw mode on, key releases {}", if enhanced { "reported" } else { "inferred" });

        Ok(Self {
            keys: KeyState::new(enhanced),
            enhanced,
        })
    }

    /// Read every pending key event without waiting.
    fn pump(&mut self) {
        if let Err(e) = self.try_pump() {
            warn!("Failed to read terminal input: {}", e);
        }
    }

    fn try_pump(&mut self) -> io::Result<()> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.keys.handle_key(key, Instant::now());
            }
        }
        Ok(())
    }
}

impl InputSource for TerminalInput {
    fn current_intents(&mut self) -> Intents {
        self.pump();
        self.keys.intents(Instant::now())
    }

    fn quit_requested(&mut self) -> bool {
        self.pump();
        self.keys.quit()
    }
}

impl Drop for TerminalInput {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if self.enhanced {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(stdout, cursor::Show);
        let _ = terminal::disable_raw_mode();
        let _ = writeln!(stdout);
    }
}

/// No input at all, for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn current_intents(&mut self) -> Intents {
        Intents::empty()
    }

    fn quit_requested(&mut self) -> bool {
        false
    }
}

// =============================================================================
// RENDERERS
// =============================================================================

/// Format the status line for a scene.
pub fn status_line(scene: &Scene) -> String {
    let mut line = format!("[{}]", scene.phase);
    if let Some(local) = scene.local {
        line.push_str(&format!(" you are {} ({})", local, local.team()));
    }
    for (id, position) in scene.positions {
        line.push_str(&format!("  {} {}", id, position));
    }
    match scene.verdict() {
        Some(verdict) => line.push_str(&format!("  {}", verdict)),
        None if scene.phase == SessionPhase::Running => {
            line.push_str(&format!("  {} ticks left", scene.ticks_remaining))
        }
        None => {}
    }
    line
}

/// Redraws one status line on stdout each tick.
pub struct TerminalRenderer {
    out: Stdout,
    last_line: String,
    outcome_logged: bool,
}

impl TerminalRenderer {
    /// Draw to stdout.
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            last_line: String::new(),
            outcome_logged: false,
        }
    }

    fn draw(&mut self, line: &str) -> io::Result<()> {
        queue!(
            self.out,
            cursor::Hide,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )?;
        self.out.flush()
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for TerminalRenderer {
    fn present(&mut self, scene: &Scene) {
        if !self.outcome_logged {
            if let Some(verdict) = scene.verdict() {
                info!("Game over: {}", verdict);
                self.outcome_logged = true;
            }
        }

        let line = status_line(scene);
        if line == self.last_line {
            return;
        }
        if let Err(e) = self.draw(&line) {
            debug!("Failed to draw status: {}", e);
        }
        self.last_line = line;
    }
}

/// Logs scenes through `tracing` instead of drawing them.
#[derive(Debug, Default)]
pub struct LogRenderer {
    frames: u64,
    every: u64,
    outcome_logged: bool,
}

impl LogRenderer {
    /// Log positions every `every` frames (0 = only the outcome).
    pub fn new(every: u64) -> Self {
        Self {
            frames: 0,
            every,
            outcome_logged: false,
        }
    }

    /// Frames presented so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Whether the outcome has been reported.
    #[inline]
    pub fn outcome_logged(&self) -> bool {
        self.outcome_logged
    }
}

impl Renderer for LogRenderer {
    fn present(&mut self, scene: &Scene) {
        self.frames += 1;
        if self.every > 0 && self.frames % self.every == 0 {
            debug!("{}", status_line(scene));
        }
        if let (false, Some(outcome)) = (self.outcome_logged, scene.outcome) {
            match scene.verdict() {
                Some(verdict) => info!("Game over: {}", verdict),
                None => info!("Game over: {} won", outcome.winner),
            }
            self.outcome_logged = true;
        }
    }
}

// =============================================================================
// LOG OUTPUT
// =============================================================================

/// Writer for log lines while the terminal is in raw mode: each line starts
/// on a cleared row and ends with CR LF.
#[derive(Debug)]
pub struct RawModeWriter<W> {
    inner: W,
    at_line_start: bool,
}

impl<W: Write> RawModeWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            at_line_start: true,
        }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for RawModeWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.split_inclusive(|&b| b == b'\n') {
            if self.at_line_start {
                queue!(self.inner, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine))?;
                self.at_line_start = false;
            }
            match chunk.strip_suffix(b"\n") {
                Some(body) => {
                    self.inner.write_all(body)?;
                    self.inner.write_all(b"\r\n")?;
                    self.at_line_start = true;
                }
                None => self.inner.write_all(chunk)?,
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec2::IVec2;
    use crate::game::session::{EndReason, Outcome};
    use crate::game::state::{PlayerId, Team};

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    fn scene(phase: SessionPhase, outcome: Option<Outcome>) -> Scene {
        Scene {
            positions: [
                (PlayerId::QUARRY, IVec2::ZERO),
                (PlayerId::HUNTER_A, IVec2::new(193, 140)),
                (PlayerId::HUNTER_B, IVec2::new(406, 300)),
            ],
            phase,
            local: Some(PlayerId::HUNTER_A),
            ticks_remaining: 1200,
            outcome,
        }
    }

    #[test]
    fn test_hold_window_without_releases() {
        let start = Instant::now();
        let mut keys = KeyState::new(false);

        keys.handle_key(key(KeyCode::Left, KeyEventKind::Press), start);
        keys.handle_key(key(KeyCode::Char('w'), KeyEventKind::Press), start);
        assert_eq!(keys.intents(start), Intents::LEFT | Intents::UP);

        // Repeats keep Left alive past the window; Up lapses.
        let later = start + HOLD_WINDOW / 2;
        keys.handle_key(key(KeyCode::Left, KeyEventKind::Press), later);
        let after = start + HOLD_WINDOW + Duration::from_millis(10);
        assert_eq!(keys.intents(after), Intents::LEFT);

        assert_eq!(keys.intents(after + HOLD_WINDOW), Intents::empty());
    }

    #[test]
    fn test_exact_releases() {
        let start = Instant::now();
        let mut keys = KeyState::new(true);

        keys.handle_key(key(KeyCode::Right, KeyEventKind::Press), start);
        let much_later = start + HOLD_WINDOW * 10;
        assert_eq!(keys.intents(much_later), Intents::RIGHT);

        keys.handle_key(key(KeyCode::Right, KeyEventKind::Release), much_later);
        assert_eq!(keys.intents(much_later), Intents::empty());
    }

    #[test]
    fn test_quit_keys() {
        let now = Instant::now();

        let mut keys = KeyState::new(false);
        keys.handle_key(key(KeyCode::Esc, KeyEventKind::Press), now);
        assert!(keys.quit());

        let mut keys = KeyState::new(false);
        keys.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), now);
        assert!(keys.quit());

        let mut keys = KeyState::new(true);
        keys.handle_key(key(KeyCode::Esc, KeyEventKind::Release), now);
        keys.handle_key(key(KeyCode::Char('x'), KeyEventKind::Press), now);
        assert!(!keys.quit());
        assert_eq!(keys.intents(now), Intents::empty());
    }

    #[test]
    fn test_status_line() {
        let running = status_line(&scene(SessionPhase::Running, None));
        assert_eq!(
            running,
            "[running] you are P2 (hunters)  P1 (0, 0)  P2 (193, 140)  P3 (406, 300)  1200 ticks left"
        );

        let outcome = Outcome { winner: Team::Hunters, reason: EndReason::Announced };
        let ended = status_line(&scene(SessionPhase::Ended, Some(outcome)));
        assert!(ended.starts_with("[ended]"));
        assert!(ended.ends_with("your team has won"));
    }

    #[test]
    fn test_log_renderer_reports_once() {
        let mut renderer = LogRenderer::new(0);
        renderer.present(&scene(SessionPhase::Running, None));
        assert!(!renderer.outcome_logged());

        let outcome = Outcome { winner: Team::Quarry, reason: EndReason::CountdownExpired };
        renderer.present(&scene(SessionPhase::Ended, Some(outcome)));
        renderer.present(&scene(SessionPhase::Ended, Some(outcome)));
        assert!(renderer.outcome_logged());
        assert_eq!(renderer.frames(), 3);
    }

    #[test]
    fn test_raw_mode_writer() {
        let mut writer = RawModeWriter::new(Vec::new());
        writer.write_all(b"first\nsec").unwrap();
        writer.write_all(b"ond\n").unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert!(out.contains("first\r\n"));
        assert!(out.contains("second\r\n"));
        assert!(!out.contains("first\n\n"));
        assert_eq!(out.matches("\r\n").count(), 2);
        assert!(!out.replace("\r\n", "").contains('\n'));
    }
}
