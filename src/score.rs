//! Scoring and spawn statistics

use crate::tetromino::TetrominoType;

/// Points awarded for line clears and soft drops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreTable {
    /// Entry `n - 1` is the award for clearing `n` lines in one lock
    pub line_clear: Vec<u64>,
    /// Award per row moved by soft drop
    pub soft_drop: u64,
}

impl Default for ScoreTable {
    fn default() -> Self {
        Self {
            line_clear: vec![100, 400, 900, 2000],
            soft_drop: 2,
        }
    }
}

impl ScoreTable {
    /// Points for clearing `lines` rows at once; 0 for counts outside the table
    pub fn line_clear_points(&self, lines: usize) -> u64 {
        match lines {
            0 => 0,
            n => self.line_clear.get(n - 1).copied().unwrap_or(0),
        }
    }
}

/// Score and line counters
///
/// Both only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Score {
    /// Current score
    pub points: u64,
    /// Total lines cleared
    pub lines: u32,
}

impl Score {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line clear, returns the points awarded
    pub fn add_clear(&mut self, lines: usize, table: &ScoreTable) -> u64 {
        let award = table.line_clear_points(lines);
        self.lines += lines as u32;
        self.points += award;
        award
    }

    /// Add score for one soft drop step
    pub fn add_soft_drop(&mut self, table: &ScoreTable) {
        self.points += table.soft_drop;
    }
}

/// How many pieces of each kind have been spawned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieceStats {
    counts: [u32; 7],
    total: u32,
}

impl PieceStats {
    pub fn record(&mut self, piece_type: TetrominoType) {
        self.counts[piece_type.index()] += 1;
        self.total += 1;
    }

    pub fn count(&self, piece_type: TetrominoType) -> u32 {
        self.counts[piece_type.index()]
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Share of all spawns, in percent
    pub fn percentage(&self, piece_type: TetrominoType) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count(piece_type) as f64 / self.total as f64 * 100.0
    }
}
