//! Layout and drawing: title screen, board, sidebar, game over, row-clear flash.

use crate::app::Screen;
use crate::game::GameState;
use crate::render::{self, Surface};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each board cell is two terminal columns wide so blocks look square.
const CELL_WIDTH: u16 = 2;
const SIDEBAR_WIDTH: u16 = 22;
/// Duration of the row-clear fade.
const CLEAR_FLASH_MS: u32 = 250;

/// Outer size (with border) of the board for a game.
fn board_outer_size(state: &GameState) -> (u16, u16) {
    (
        state.board.width() as u16 * CELL_WIDTH + 2,
        state.board.height() as u16 + 2,
    )
}

/// Terminal buffer as a paint target; strokes draw `[]` over the fill.
struct BufferSurface<'a> {
    buf: &'a mut Buffer,
    area: Rect,
    stroke: Color,
}

impl BufferSurface<'_> {
    fn origin(&self, row: usize, col: usize) -> Option<(u16, u16)> {
        let x = self.area.x + (col as u16) * CELL_WIDTH;
        let y = self.area.y + row as u16;
        (x + CELL_WIDTH <= self.area.right() && y < self.area.bottom()).then_some((x, y))
    }
}

impl Surface for BufferSurface<'_> {
    fn fill_cell(&mut self, row: usize, col: usize, color: Color) {
        if let Some((x, y)) = self.origin(row, col) {
            for dx in 0..CELL_WIDTH {
                self.buf[(x + dx, y)].set_symbol(" ").set_bg(color);
            }
        }
    }

    fn stroke_cell(&mut self, row: usize, col: usize) {
        if let Some((x, y)) = self.origin(row, col) {
            self.buf[(x, y)].set_symbol("[").set_fg(self.stroke);
            self.buf[(x + 1, y)].set_symbol("]").set_fg(self.stroke);
        }
    }
}

/// Row-clear fade over the band of board rows where a clear just happened.
/// The board has already collapsed, so the band shows the rows that dropped into place.
#[derive(Default)]
pub struct ClearFlash {
    rows: Vec<usize>,
    effect: Option<Effect>,
    last_frame: Option<Instant>,
}

impl ClearFlash {
    /// Start a new flash over `rows`, replacing one still running.
    pub fn trigger(&mut self, rows: Vec<usize>) {
        self.rows = rows;
        self.effect = None;
        self.last_frame = None;
    }

    pub fn is_active(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Drop a finished flash.
    pub fn sweep(&mut self) {
        if self.effect.as_ref().is_some_and(Effect::done) {
            *self = Self::default();
        }
    }

    pub fn cancel(&mut self) {
        *self = Self::default();
    }

    /// Screen rows covered by the flash.
    fn band(&self, board_rect: Rect) -> HashSet<u16> {
        self.rows
            .iter()
            .filter(|&&row| row < board_rect.height as usize)
            .map(|&row| board_rect.y + row as u16)
            .collect()
    }

    fn apply(&mut self, frame: &mut Frame, board_rect: Rect, theme: &Theme, now: Instant) {
        if self.rows.is_empty() {
            return;
        }
        let delta = self
            .last_frame
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(std::time::Duration::ZERO);
        let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
        self.last_frame = Some(now);

        if self.effect.is_none() {
            let band = self.band(board_rect);
            let filter = CellFilter::PositionFn(ref_count(move |pos: Position| band.contains(&pos.y)));
            let effect = fx::fade_to(theme.title, theme.title, (CLEAR_FLASH_MS, Interpolation::Linear))
                .with_filter(filter)
                .with_area(board_rect);
            self.effect = Some(effect);
        }
        if let Some(effect) = &mut self.effect {
            frame.render_effect(effect, board_rect, TfxDuration::from_millis(delta_ms));
        }
    }
}

/// Draw the current screen.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    flash: &mut ClearFlash,
    now: Instant,
) {
    let area = frame.area();
    frame.buffer_mut().set_style(area, Style::default().bg(theme.bg));
    match screen {
        Screen::Title => draw_title(frame, theme, area),
        Screen::Playing => {
            let board_rect = draw_game(frame, state, theme, area);
            flash.apply(frame, board_rect, theme, now);
            if state.is_game_over() {
                draw_game_over(frame, state, theme, area);
            }
        }
    }
}

fn draw_title(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 34u16;
    let popup_h = 8u16;
    let popup = centered(area, popup_w, popup_h);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " BLOCKTRIS ",
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("Press Enter to start", Style::default().fg(theme.main_fg))),
        Line::from(Span::styled("Q  Quit", Style::default().fg(theme.div_line))),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

/// Board + sidebar, centred. Returns the inner board rect.
fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) -> Rect {
    let (pw, ph) = board_outer_size(state);
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(horiz[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert[1]);

    let board_rect = draw_board(frame, state, theme, inner[0]);
    draw_sidebar(frame, state, theme, inner[1]);
    board_rect
}

fn draw_board(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Blocktris ", theme.title));
    let board_rect = block.inner(area);
    block.render(area, frame.buffer_mut());

    let mut surface = BufferSurface {
        buf: frame.buffer_mut(),
        area: board_rect,
        stroke: theme.stroke,
    };
    render::paint(state, theme, &mut surface);
    board_rect
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.div_line);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // Stats
            Constraint::Length(1), // gap
            Constraint::Length(8), // Controls
        ])
        .split(area);

    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg));
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stats = vec![
        Line::from(Span::styled(state.score_label(), title_style)),
        Line::from(vec![
            Span::styled("Lines: ", title_style),
            Span::styled(state.rows_cleared.to_string(), fg_style),
        ]),
    ];
    Paragraph::new(Text::from(stats)).render(stats_inner, frame.buffer_mut());

    let help_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .title(Span::styled(" Keys ", title_style));
    let help_inner = help_block.inner(chunks[2]);
    help_block.render(chunks[2], frame.buffer_mut());
    let help = vec![
        Line::from(Span::styled("← →  Move", fg_style)),
        Line::from(Span::styled("↑    Rotate", fg_style)),
        Line::from(Span::styled("↓    Drop", fg_style)),
        Line::from(Span::styled("R    Reset", dim_style)),
        Line::from(Span::styled("Q    Quit", dim_style)),
    ];
    Paragraph::new(Text::from(help)).render(help_inner, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let popup = centered(area, 30, 7);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(theme.alert),
        )),
        Line::from(Span::styled(
            format!(" {} ", state.score_label()),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R  Restart    Q  Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
        )
        .render(popup, frame.buffer_mut());
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
