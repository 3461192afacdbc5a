//! Core game state and logic
//!
//! The simulation never reads the clock itself: every entry point takes the
//! current `Instant`, and all timers are plain `Duration` arithmetic on it.

use crate::board::Board;
use crate::piece::Piece;
use crate::randomizer::Randomizer;
use crate::score::{PieceStats, Score, ScoreTable};
use crate::settings::Settings;
use std::time::{Duration, Instant};

/// Horizontal offsets tried, in order, when a rotation collides
const WALL_KICKS: [i32; 4] = [1, -1, 2, -2];

/// Timing and scoring rules the simulation runs with
#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    pub width: usize,
    pub height: usize,
    /// Time between gravity steps
    pub fall_interval: Duration,
    /// A grounded piece locks once it has been grounded longer than this
    pub lock_delay: Duration,
    /// Hold time before key repeat starts
    pub repeat_delay: Duration,
    /// Time between key repeats
    pub repeat_rate: Duration,
    pub scoring: ScoreTable,
}

impl Rules {
    pub fn from_settings(settings: &Settings) -> Self {
        let timing = &settings.timing;
        Self {
            width: settings.board.width,
            height: settings.board.height,
            fall_interval: Duration::from_millis(timing.fall_interval_ms),
            lock_delay: Duration::from_millis(timing.lock_delay_ms),
            repeat_delay: Duration::from_millis(timing.key_repeat_delay_ms),
            repeat_rate: Duration::from_millis(timing.key_repeat_rate_ms),
            scoring: ScoreTable {
                line_clear: settings.scoring.line_clear.clone(),
                soft_drop: settings.scoring.soft_drop_points,
            },
        }
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Why the game ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOverCause {
    /// A locking piece still had cells above the top row
    LockOut,
    /// A freshly spawned piece overlapped locked cells
    BlockOut,
    /// The player quit
    Quit,
}

/// Game state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Playing,
    GameOver(GameOverCause),
}

/// Discrete commands the simulation consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveLeft,
    MoveRight,
    SoftDropStep,
    Rotate,
    Quit,
}

/// Player controls, reported as press and release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Left,
    Right,
    Down,
    Rotate,
    Quit,
}

/// Things that happened during a tick, in the order they happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    PieceLocked,
    LinesCleared(usize),
    SoftDropScored,
    GameOver,
}

/// Lock delay timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LockTimer {
    /// Piece is not known to be grounded
    Inactive,
    /// Grounded since this instant
    Since(Instant),
    /// Forced by a blocked soft drop; locks on the next gravity step
    Expired,
}

impl LockTimer {
    fn has_elapsed(&self, now: Instant, delay: Duration) -> bool {
        match *self {
            LockTimer::Inactive => false,
            LockTimer::Since(start) => now.saturating_duration_since(start) > delay,
            LockTimer::Expired => true,
        }
    }
}

/// Held-key state for auto repeat
#[derive(Debug, Clone, Copy)]
struct KeyRepeat {
    pressed_at: Instant,
    last_repeat: Option<Instant>,
}

impl KeyRepeat {
    fn new(now: Instant) -> Self {
        Self {
            pressed_at: now,
            last_repeat: None,
        }
    }

    /// Returns true when a repeat is due at `now`
    ///
    /// The first repeat fires once the key has been held for `delay`, later
    /// ones every `rate` after that.
    fn due(&mut self, now: Instant, delay: Duration, rate: Duration) -> bool {
        if now.saturating_duration_since(self.pressed_at) < delay {
            return false;
        }
        match self.last_repeat {
            Some(last) if now.saturating_duration_since(last) < rate => false,
            _ => {
                self.last_repeat = Some(now);
                true
            }
        }
    }
}

/// The main game struct
pub struct Game {
    /// The game board
    pub board: Board,
    /// Current falling piece
    pub current_piece: Piece,
    /// Piece that spawns after the current one locks
    pub next_piece: Piece,
    /// Score tracking
    pub score: Score,
    /// Spawn counts per tetromino type
    pub stats: PieceStats,
    /// Current game state
    pub state: GameState,
    rules: Rules,
    randomizer: Randomizer,
    /// Instant of the previous update
    last_tick: Option<Instant>,
    /// Time accumulated toward the next gravity step
    fall_elapsed: Duration,
    lock_timer: LockTimer,
    left: Option<KeyRepeat>,
    right: Option<KeyRepeat>,
    down: Option<KeyRepeat>,
    events: Vec<GameEvent>,
}

impl Game {
    /// Create a new game with randomly chosen pieces
    pub fn new(rules: Rules) -> Self {
        Self::with_randomizer(rules, Randomizer::new())
    }

    /// Create a new game with a deterministic piece sequence
    #[cfg(test)]
    pub fn with_seed(rules: Rules, seed: u64) -> Self {
        Self::with_randomizer(rules, Randomizer::with_seed(seed))
    }

    fn with_randomizer(rules: Rules, mut randomizer: Randomizer) -> Self {
        let mut stats = PieceStats::default();
        let mut spawn = |randomizer: &mut Randomizer| {
            let piece_type = randomizer.next();
            stats.record(piece_type);
            Piece::spawn(piece_type, rules.width)
        };
        let current_piece = spawn(&mut randomizer);
        let next_piece = spawn(&mut randomizer);

        let mut game = Self {
            board: Board::new(rules.width, rules.height),
            current_piece,
            next_piece,
            score: Score::new(),
            stats,
            state: GameState::Playing,
            rules,
            randomizer,
            last_tick: None,
            fall_elapsed: Duration::ZERO,
            lock_timer: LockTimer::Inactive,
            left: None,
            right: None,
            down: None,
            events: Vec::new(),
        };
        if game.current_piece.collides(&game.board, 0, 0) {
            game.end(GameOverCause::BlockOut);
        }
        game
    }

    pub fn is_over(&self) -> bool {
        matches!(self.state, GameState::GameOver(_))
    }

    /// Whether the current piece is resting on something
    pub fn is_grounded(&self) -> bool {
        self.current_piece.collides(&self.board, 0, 1)
    }

    /// Drain the events produced since the last call
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Apply one discrete command
    pub fn apply(&mut self, command: Command, now: Instant) {
        if self.is_over() {
            return;
        }
        match command {
            Command::MoveLeft => {
                self.shift(-1, now);
            }
            Command::MoveRight => {
                self.shift(1, now);
            }
            Command::SoftDropStep => {
                self.soft_drop(true);
            }
            Command::Rotate => {
                self.rotate(now);
            }
            Command::Quit => self.end(GameOverCause::Quit),
        }
    }

    /// A control was pressed: act immediately and start repeat tracking
    pub fn press(&mut self, control: Control, now: Instant) {
        if self.is_over() {
            return;
        }
        match control {
            Control::Left => {
                self.right = None;
                if self.left.is_none() {
                    self.left = Some(KeyRepeat::new(now));
                    self.apply(Command::MoveLeft, now);
                }
            }
            Control::Right => {
                self.left = None;
                if self.right.is_none() {
                    self.right = Some(KeyRepeat::new(now));
                    self.apply(Command::MoveRight, now);
                }
            }
            Control::Down => {
                if self.down.is_none() {
                    self.down = Some(KeyRepeat::new(now));
                    self.apply(Command::SoftDropStep, now);
                }
            }
            Control::Rotate => self.apply(Command::Rotate, now),
            Control::Quit => self.apply(Command::Quit, now),
        }
    }

    /// A control was released
    pub fn release(&mut self, control: Control) {
        match control {
            Control::Left => self.left = None,
            Control::Right => self.right = None,
            Control::Down => self.down = None,
            Control::Rotate | Control::Quit => {}
        }
    }

    /// Advance the simulation to `now` (call every frame)
    pub fn update(&mut self, now: Instant) {
        if self.is_over() {
            return;
        }

        let delta = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_tick = Some(now);

        self.repeat_held_keys(now);

        self.fall_elapsed += delta;
        if self.fall_elapsed >= self.rules.fall_interval {
            self.fall_elapsed = Duration::ZERO;
            self.gravity_step(now);
        }
    }

    fn repeat_held_keys(&mut self, now: Instant) {
        let (delay, rate) = (self.rules.repeat_delay, self.rules.repeat_rate);

        if self.left.as_mut().is_some_and(|k| k.due(now, delay, rate)) {
            self.shift(-1, now);
        }
        if self.right.as_mut().is_some_and(|k| k.due(now, delay, rate)) {
            self.shift(1, now);
        }
        if self.down.as_mut().is_some_and(|k| k.due(now, delay, rate)) {
            self.soft_drop(false);
        }
    }

    /// Move sideways by one column if there is room
    fn shift(&mut self, dx: i32, now: Instant) -> bool {
        if self.current_piece.collides(&self.board, dx, 0) {
            return false;
        }
        self.current_piece.translate(dx, 0);
        if self.is_grounded() {
            self.lock_timer = LockTimer::Since(now);
        }
        true
    }

    /// One soft drop step
    ///
    /// A step blocked by an explicit command forces a lock on the next
    /// gravity step; a blocked repeat does nothing.
    fn soft_drop(&mut self, force_lock: bool) -> bool {
        if self.current_piece.collides(&self.board, 0, 1) {
            if force_lock {
                self.lock_timer = LockTimer::Expired;
            }
            return false;
        }
        self.current_piece.translate(0, 1);
        self.lock_timer = LockTimer::Inactive;
        self.score.add_soft_drop(&self.rules.scoring);
        self.events.push(GameEvent::SoftDropScored);
        tracing::trace!("Soft drop to row {}", self.current_piece.y);
        true
    }

    /// Rotate clockwise, trying wall kicks; the rotation is all or nothing
    fn rotate(&mut self, now: Instant) -> bool {
        let original_shape = self.current_piece.shape;
        self.current_piece.rotate();

        if !self.current_piece.collides(&self.board, 0, 0) {
            return true;
        }

        for dx in WALL_KICKS {
            if !self.current_piece.collides(&self.board, dx, 0) {
                self.current_piece.translate(dx, 0);
                if self.is_grounded() {
                    self.lock_timer = LockTimer::Since(now);
                }
                return true;
            }
        }

        self.current_piece.shape = original_shape;
        false
    }

    fn gravity_step(&mut self, now: Instant) {
        if !self.current_piece.collides(&self.board, 0, 1) {
            self.current_piece.translate(0, 1);
            self.lock_timer = LockTimer::Inactive;
            return;
        }

        if self.lock_timer == LockTimer::Inactive {
            self.lock_timer = LockTimer::Since(now);
        }
        if self.lock_timer.has_elapsed(now, self.rules.lock_delay) {
            self.lock_piece();
        }
    }

    /// Lock the current piece and spawn next
    fn lock_piece(&mut self) {
        self.events.push(GameEvent::PieceLocked);
        tracing::debug!(
            "Locking {:?} at ({}, {})",
            self.current_piece.piece_type,
            self.current_piece.x,
            self.current_piece.y
        );

        if !self.board.merge(&self.current_piece) {
            self.end(GameOverCause::LockOut);
            return;
        }

        let lines_cleared = self.board.clear_full_lines();
        if lines_cleared > 0 {
            let award = self.score.add_clear(lines_cleared, &self.rules.scoring);
            self.events.push(GameEvent::LinesCleared(lines_cleared));
            tracing::info!(
                "Cleared {} line(s) for {} points, score {}",
                lines_cleared,
                award,
                self.score.points
            );
        }

        let next = self.spawn();
        self.current_piece = std::mem::replace(&mut self.next_piece, next);
        self.lock_timer = LockTimer::Inactive;

        // Check for block out
        if self.current_piece.collides(&self.board, 0, 0) {
            self.end(GameOverCause::BlockOut);
        }
    }

    fn spawn(&mut self) -> Piece {
        let piece_type = self.randomizer.next();
        self.stats.record(piece_type);
        tracing::debug!("Spawned {:?}", piece_type);
        Piece::spawn(piece_type, self.rules.width)
    }

    fn end(&mut self, cause: GameOverCause) {
        self.state = GameState::GameOver(cause);
        self.left = None;
        self.right = None;
        self.down = None;
        if cause != GameOverCause::Quit {
            self.events.push(GameEvent::GameOver);
        }
        tracing::info!(
            "Game over ({:?}): score {}, lines {}",
            cause,
            self.score.points,
            self.score.lines
        );
    }
}
