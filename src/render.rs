//! Board painting through two primitives: fill a cell, stroke its border.

use crate::game::GameState;
use crate::theme::Theme;
use ratatui::style::Color;

/// Anything a board can be painted onto, addressed in board cells.
pub trait Surface {
    fn fill_cell(&mut self, row: usize, col: usize, color: Color);
    fn stroke_cell(&mut self, row: usize, col: usize);
}

/// Paint settled cells, then the active piece on top. Piece cells above the board are skipped.
pub fn paint<S: Surface>(state: &GameState, theme: &Theme, surface: &mut S) {
    for (row, col) in state.board.filled_cells() {
        surface.fill_cell(row, col, theme.block);
        surface.stroke_cell(row, col);
    }
    for (row, col) in state.piece.cells() {
        let (Ok(row), Ok(col)) = (usize::try_from(row), usize::try_from(col)) else {
            continue;
        };
        surface.fill_cell(row, col, theme.piece);
        surface.stroke_cell(row, col);
    }
}
