//! Game state: board, tetromino catalog, active piece, collision and settling.

use crate::{GameConfig, ScoringRule};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::{debug, info, trace};

/// Largest side of any catalog shape.
const MAX_SHAPE_SIDE: usize = 4;

/// Tetromino kinds, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TetrominoKind {
    I,
    O,
    S,
    Z,
    L,
    J,
    T,
}

impl TetrominoKind {
    pub const ALL: [Self; 7] = [Self::I, Self::O, Self::S, Self::Z, Self::L, Self::J, Self::T];

    /// Spawn template for this kind.
    pub fn shape(self) -> Shape {
        match self {
            Self::I => Shape::from_rows(&[&[1, 1, 1, 1]]),
            Self::O => Shape::from_rows(&[&[1, 1], &[1, 1]]),
            Self::S => Shape::from_rows(&[&[1, 1, 0], &[0, 1, 1]]),
            Self::Z => Shape::from_rows(&[&[0, 1, 1], &[1, 1, 0]]),
            Self::L => Shape::from_rows(&[&[1, 0, 0], &[1, 1, 1]]),
            Self::J => Shape::from_rows(&[&[0, 0, 1], &[1, 1, 1]]),
            Self::T => Shape::from_rows(&[&[0, 1, 0], &[1, 1, 1]]),
        }
    }
}

/// Rectangular cell mask, row-major. Cells outside `rows x cols` are always false.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    rows: u8,
    cols: u8,
    mask: [[bool; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE],
}

impl Shape {
    fn from_rows(rows: &[&[u8]]) -> Self {
        let mut mask = [[false; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE];
        let cols = rows.first().map_or(0, |r| r.len());
        for (r, row) in rows.iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                mask[r][c] = v != 0;
            }
        }
        Self {
            rows: rows.len() as u8,
            cols: cols as u8,
            mask,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.cols as usize
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.rows as usize
    }

    /// (row, col) of every filled cell, relative to the bounding box.
    pub fn filled_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.height())
            .flat_map(move |r| (0..self.width()).filter(move |&c| self.mask[r][c]).map(move |c| (r, c)))
    }

    /// Quarter turn: transpose, then reverse the row order. Dimensions swap.
    pub fn rotated(&self) -> Self {
        let (rows, cols) = (self.cols, self.rows);
        let mut mask = [[false; MAX_SHAPE_SIDE]; MAX_SHAPE_SIDE];
        for r in 0..rows as usize {
            for c in 0..cols as usize {
                mask[r][c] = self.mask[c][rows as usize - 1 - r];
            }
        }
        Self { rows, cols, mask }
    }
}

/// Single board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Filled,
}

/// Fixed-size grid. Row 0 is the top; `rows[0]` is the top row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    rows: VecDeque<Vec<Cell>>,
}

impl Board {
    pub fn new(height: u16, width: u16) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self {
            width: w,
            height: h,
            rows: (0..h).map(|_| vec![Cell::Empty; w]).collect(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_inside_bounds(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    pub fn cell(&self, row: i32, col: i32) -> Option<Cell> {
        if !self.is_inside_bounds(row, col) {
            return None;
        }
        self.rows.get(row as usize).and_then(|r| r.get(col as usize)).copied()
    }

    /// Out-of-bounds positions count as occupied.
    pub fn is_occupied(&self, row: i32, col: i32) -> bool {
        !matches!(self.cell(row, col), Some(Cell::Empty))
    }

    /// Mark one cell filled. Returns false when out of bounds.
    pub fn fill(&mut self, row: i32, col: i32) -> bool {
        if !self.is_inside_bounds(row, col) {
            return false;
        }
        self.rows[row as usize][col as usize] = Cell::Filled;
        true
    }

    /// Write every filled cell of `piece` into the grid. Cells above the top are dropped.
    pub fn commit(&mut self, piece: &ActivePiece) {
        for (row, col) in piece.cells() {
            self.fill(row, col);
        }
    }

    /// Indices of rows with no empty cell, top to bottom.
    pub fn full_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.contains(&Cell::Empty))
            .map(|(y, _)| y)
            .collect()
    }

    /// Drop full rows and push empty ones in at the top. Returns how many were removed.
    pub fn clear_full_rows(&mut self) -> usize {
        self.rows.retain(|row| row.contains(&Cell::Empty));
        let cleared = self.height - self.rows.len();
        for _ in 0..cleared {
            self.rows.push_front(vec![Cell::Empty; self.width]);
        }
        cleared
    }

    /// (row, col) of every filled cell.
    pub fn filled_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| **cell == Cell::Filled)
                .map(move |(x, _)| (y, x))
        })
    }
}

/// The falling piece. Origin is the top-left of the shape's bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivePiece {
    pub kind: TetrominoKind,
    pub shape: Shape,
    pub origin_row: i32,
    pub origin_col: i32,
}

impl ActivePiece {
    /// Row 0, horizontally centred on a board `board_width` columns wide.
    pub fn spawn(kind: TetrominoKind, board_width: usize) -> Self {
        let shape = kind.shape();
        Self {
            kind,
            shape,
            origin_row: 0,
            origin_col: (board_width / 2) as i32 - (shape.width() / 2) as i32,
        }
    }

    /// Absolute board (row, col) of every filled cell.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .filled_cells()
            .map(|(r, c)| (self.origin_row + r as i32, self.origin_col + c as i32))
    }

    pub fn shifted(&self, d_row: i32, d_col: i32) -> Self {
        Self {
            origin_row: self.origin_row + d_row,
            origin_col: self.origin_col + d_col,
            ..*self
        }
    }

    pub fn rotated(&self) -> Self {
        Self {
            shape: self.shape.rotated(),
            ..*self
        }
    }
}

/// True if every filled cell of `piece` is on the board and empty.
/// Cells above the top row are never occupied but must still be within the side walls.
pub fn is_valid_position(board: &Board, piece: &ActivePiece) -> bool {
    piece.cells().all(|(row, col)| {
        if col < 0 || col as usize >= board.width() || row >= board.height() as i32 {
            return false;
        }
        row < 0 || !board.is_occupied(row, col)
    })
}

/// The shifted piece if it fits, otherwise `None`.
pub fn try_move(board: &Board, piece: &ActivePiece, d_row: i32, d_col: i32) -> Option<ActivePiece> {
    let candidate = piece.shifted(d_row, d_col);
    is_valid_position(board, &candidate).then_some(candidate)
}

/// Uniform random piece source.
#[derive(Debug, Clone)]
pub struct Spawner {
    rng: StdRng,
}

impl Spawner {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    pub fn next_kind(&mut self) -> TetrominoKind {
        TetrominoKind::ALL[self.rng.random_range(0..TetrominoKind::ALL.len())]
    }

    pub fn spawn(&mut self, board_width: usize) -> ActivePiece {
        ActivePiece::spawn(self.next_kind(), board_width)
    }
}

impl ScoringRule {
    /// Points for one settle that removed `cleared` rows.
    pub fn award(self, bonus: u32, cleared: usize) -> u32 {
        match self {
            Self::Pass => bonus,
            Self::Clear if cleared > 0 => bonus,
            Self::Clear => 0,
            Self::PerRow => bonus.saturating_mul(cleared as u32),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    GameOver,
}

/// Result of applying one move to the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The active piece was replaced.
    Moved,
    /// The move did not fit; nothing changed.
    Rejected,
    /// The piece was merged into the board and a new one spawned.
    Settled { cleared_rows: Vec<usize>, game_over: bool },
    Reset,
    /// The game is over; input has no effect.
    Ignored,
}

/// One game session: board, active piece, score and run state.
#[derive(Debug)]
pub struct GameState {
    pub board: Board,
    pub piece: ActivePiece,
    pub score: u32,
    pub rows_cleared: u32,
    pub run_state: RunState,
    spawner: Spawner,
    scoring: ScoringRule,
    clear_bonus: u32,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        let board = Board::new(config.rows, config.columns);
        let mut spawner = Spawner::new(config.seed);
        let piece = spawner.spawn(board.width());
        let run_state = if is_valid_position(&board, &piece) {
            RunState::Running
        } else {
            RunState::GameOver
        };
        Self {
            board,
            piece,
            score: 0,
            rows_cleared: 0,
            run_state,
            spawner,
            scoring: config.scoring,
            clear_bonus: config.clear_bonus,
        }
    }

    /// Empty board, zero score, fresh piece. The spawner keeps its sequence.
    pub fn reset(&mut self) {
        self.board = Board::new(self.board.height() as u16, self.board.width() as u16);
        self.score = 0;
        self.rows_cleared = 0;
        self.run_state = RunState::Running;
        self.spawn_next();
        info!(
            rows = self.board.height(),
            columns = self.board.width(),
            "game reset"
        );
    }

    #[inline]
    pub fn is_game_over(&self) -> bool {
        self.run_state == RunState::GameOver
    }

    pub fn score_label(&self) -> String {
        format!("Score: {}", self.score)
    }

    pub fn move_left(&mut self) -> Outcome {
        self.shift(0, -1)
    }

    pub fn move_right(&mut self) -> Outcome {
        self.shift(0, 1)
    }

    fn shift(&mut self, d_row: i32, d_col: i32) -> Outcome {
        if self.is_game_over() {
            return Outcome::Ignored;
        }
        match try_move(&self.board, &self.piece, d_row, d_col) {
            Some(piece) => {
                self.piece = piece;
                Outcome::Moved
            }
            None => {
                trace!(d_row, d_col, "move rejected");
                Outcome::Rejected
            }
        }
    }

    /// Rotate in place if the rotated shape fits. No wall kicks.
    pub fn rotate(&mut self) -> Outcome {
        if self.is_game_over() {
            return Outcome::Ignored;
        }
        let candidate = self.piece.rotated();
        if is_valid_position(&self.board, &candidate) {
            self.piece = candidate;
            Outcome::Moved
        } else {
            trace!(kind = ?self.piece.kind, "rotation rejected");
            Outcome::Rejected
        }
    }

    /// One downward step; settles the piece when it cannot move.
    pub fn step_down(&mut self) -> Outcome {
        if self.is_game_over() {
            return Outcome::Ignored;
        }
        match try_move(&self.board, &self.piece, 1, 0) {
            Some(piece) => {
                self.piece = piece;
                Outcome::Moved
            }
            None => self.settle(),
        }
    }

    /// Commit, clear rows, score, spawn. Ends the game if the new piece does not fit.
    fn settle(&mut self) -> Outcome {
        self.board.commit(&self.piece);
        let cleared_rows = self.board.full_rows();
        let cleared = self.board.clear_full_rows();
        let points = self.scoring.award(self.clear_bonus, cleared);
        self.score = self.score.saturating_add(points);
        self.rows_cleared = self.rows_cleared.saturating_add(cleared as u32);
        debug!(kind = ?self.piece.kind, cleared, points, score = self.score, "piece settled");

        self.spawn_next();
        let game_over = self.is_game_over();
        Outcome::Settled {
            cleared_rows,
            game_over,
        }
    }

    fn spawn_next(&mut self) {
        self.piece = self.spawner.spawn(self.board.width());
        if !is_valid_position(&self.board, &self.piece) {
            self.run_state = RunState::GameOver;
            info!(score = self.score, rows_cleared = self.rows_cleared, "game over");
        }
    }
}
