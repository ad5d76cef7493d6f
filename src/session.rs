//! Session: one queue of game events, drained in arrival order, plus the tick timer.

use crate::GameConfig;
use crate::game::{GameState, Outcome};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::info;

/// Everything that can change a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    Tick,
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    Reset,
}

/// Fixed-period deadline. There is never more than one armed.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next: Option<Instant>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// Arm (or re-arm) one period from `now`, dropping any earlier deadline.
    pub fn start(&mut self, now: Instant) {
        self.next = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next = None;
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.next.is_some()
    }

    pub fn time_until(&self, now: Instant) -> Option<Duration> {
        self.next.map(|t| t.saturating_duration_since(now))
    }

    /// True once per elapsed deadline; re-arms from `now` so a stalled loop does not burst.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.next {
            Some(t) if now >= t => {
                self.next = Some(now + self.period);
                true
            }
            _ => false,
        }
    }
}

/// Owns the game state, its event queue and its tick timer.
#[derive(Debug)]
pub struct Session {
    state: GameState,
    queue: VecDeque<GameEvent>,
    ticker: Ticker,
}

impl Session {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            state: GameState::new(config),
            queue: VecDeque::new(),
            ticker: Ticker::new(config.tick),
        }
    }

    #[inline]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// First-time start: begin ticking.
    pub fn start(&mut self, now: Instant) {
        self.ticker.start(now);
        info!(score = self.state.score, "session started");
    }

    #[inline]
    pub fn is_ticking(&self) -> bool {
        self.ticker.is_armed()
    }

    pub fn push(&mut self, event: GameEvent) {
        self.queue.push_back(event);
    }

    /// How long the caller may wait before the next tick is due.
    pub fn next_tick_in(&self, now: Instant) -> Option<Duration> {
        self.ticker.time_until(now)
    }

    /// Queue a tick if one is due, then apply every queued event in order.
    pub fn pump(&mut self, now: Instant) -> Vec<Outcome> {
        if self.ticker.fire(now) {
            self.queue.push_back(GameEvent::Tick);
        }
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(event) = self.queue.pop_front() {
            outcomes.push(self.dispatch(event, now));
        }
        outcomes
    }

    fn dispatch(&mut self, event: GameEvent, now: Instant) -> Outcome {
        let outcome = match event {
            GameEvent::Reset => {
                self.state.reset();
                self.ticker.start(now);
                Outcome::Reset
            }
            _ if self.state.is_game_over() => Outcome::Ignored,
            GameEvent::Tick | GameEvent::SoftDrop => self.state.step_down(),
            GameEvent::MoveLeft => self.state.move_left(),
            GameEvent::MoveRight => self.state.move_right(),
            GameEvent::Rotate => self.state.rotate(),
        };
        if self.state.is_game_over() {
            self.ticker.cancel();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{ActivePiece, Cell, RunState, TetrominoKind};

    const TICK: Duration = Duration::from_millis(500);

    fn session() -> (Session, Instant) {
        let config = GameConfig {
            seed: Some(3),
            ..GameConfig::default()
        };
        let mut session = Session::new(&config);
        let t0 = Instant::now();
        session.start(t0);
        (session, t0)
    }

    fn place(session: &mut Session, piece: ActivePiece) {
        session.state.piece = piece;
    }

    #[test]
    fn test_ticker_fires_once_per_period() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(TICK);
        assert!(!ticker.fire(t0 + TICK));
        ticker.start(t0);
        assert!(!ticker.fire(t0 + TICK / 2));
        assert_eq!(ticker.time_until(t0 + TICK / 2), Some(TICK / 2));
        assert!(ticker.fire(t0 + TICK));
        assert!(!ticker.fire(t0 + TICK));
        assert!(ticker.fire(t0 + TICK * 2));
    }

    #[test]
    fn test_ticker_restart_replaces_deadline() {
        let t0 = Instant::now();
        let mut ticker = Ticker::new(TICK);
        ticker.start(t0);
        ticker.start(t0 + Duration::from_millis(300));
        assert!(!ticker.fire(t0 + TICK));
        assert!(ticker.fire(t0 + Duration::from_millis(800)));
        ticker.cancel();
        assert!(!ticker.is_armed());
        assert_eq!(ticker.time_until(t0), None);
    }

    #[test]
    fn test_no_tick_before_period_elapses() {
        let (mut session, t0) = session();
        let row = session.state().piece.origin_row;
        assert!(session.pump(t0 + TICK / 2).is_empty());
        assert_eq!(session.state().piece.origin_row, row);
    }

    #[test]
    fn test_tick_moves_piece_down() {
        let (mut session, t0) = session();
        let row = session.state().piece.origin_row;
        assert_eq!(session.pump(t0 + TICK), vec![Outcome::Moved]);
        assert_eq!(session.state().piece.origin_row, row + 1);
    }

    #[test]
    fn test_events_apply_in_arrival_order() {
        let (mut session, t0) = session();
        place(&mut session, ActivePiece::spawn(TetrominoKind::O, 10));
        session.push(GameEvent::MoveLeft);
        session.push(GameEvent::MoveLeft);
        session.push(GameEvent::SoftDrop);
        session.push(GameEvent::MoveRight);
        let outcomes = session.pump(t0);
        assert_eq!(outcomes, vec![Outcome::Moved; 4]);
        let piece = session.state().piece;
        assert_eq!((piece.origin_row, piece.origin_col), (1, 3));
    }

    #[test]
    fn test_queued_tick_follows_queued_input() {
        let (mut session, t0) = session();
        place(&mut session, ActivePiece::spawn(TetrominoKind::O, 10));
        session.push(GameEvent::Rotate);
        let outcomes = session.pump(t0 + TICK);
        // Input first, then the tick that came due during the same frame.
        assert_eq!(outcomes, vec![Outcome::Moved, Outcome::Moved]);
        assert_eq!(session.state().piece.origin_row, 1);
    }

    #[test]
    fn test_soft_drop_settles_like_a_tick() {
        let (mut session, t0) = session();
        place(&mut session, ActivePiece::spawn(TetrominoKind::O, 10).shifted(18, 0));
        session.push(GameEvent::SoftDrop);
        let outcomes = session.pump(t0);
        assert!(matches!(outcomes.as_slice(), [Outcome::Settled { game_over: false, .. }]));
        assert_eq!(session.state().board.cell(19, 4), Some(Cell::Filled));
        assert_eq!(session.state().score_label(), "Score: 100");
    }

    #[test]
    fn test_game_over_stops_ticks_and_input() {
        let (mut session, t0) = session();
        for row in [0, 1] {
            for col in 2..9 {
                session.state.board.fill(row, col);
            }
        }
        place(&mut session, ActivePiece::spawn(TetrominoKind::O, 10).shifted(18, -4));
        let outcomes = session.pump(t0 + TICK);
        assert!(matches!(outcomes.as_slice(), [Outcome::Settled { game_over: true, .. }]));
        assert_eq!(session.state().run_state, RunState::GameOver);
        assert!(!session.is_ticking());

        let frozen = session.state().piece;
        assert!(session.pump(t0 + TICK * 4).is_empty());
        session.push(GameEvent::MoveLeft);
        session.push(GameEvent::Tick);
        assert_eq!(session.pump(t0 + TICK * 5), vec![Outcome::Ignored, Outcome::Ignored]);
        assert_eq!(session.state().piece, frozen);
    }

    #[test]
    fn test_reset_restarts_timer_and_game() {
        let (mut session, t0) = session();
        session.state.run_state = RunState::GameOver;
        session.state.score = 300;
        session.ticker.cancel();

        let t1 = t0 + TICK * 10;
        session.push(GameEvent::Reset);
        assert_eq!(session.pump(t1), vec![Outcome::Reset]);
        assert!(session.is_ticking());
        assert_eq!(session.state().score, 0);
        assert_eq!(session.state().run_state, RunState::Running);
        assert_eq!(session.next_tick_in(t1), Some(TICK));
    }

    #[test]
    fn test_reset_while_running_keeps_one_tick_stream() {
        let (mut session, t0) = session();
        let t1 = t0 + Duration::from_millis(400);
        session.push(GameEvent::Reset);
        session.pump(t1);
        // The old deadline at t0 + 500ms is gone.
        assert!(session.pump(t0 + TICK).is_empty());
        assert_eq!(session.pump(t1 + TICK), vec![Outcome::Moved]);
    }
}
