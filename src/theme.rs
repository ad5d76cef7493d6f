//! Colours for the board and chrome, optionally read from a btop-style theme file.

use crate::Palette;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

const BLOCK: Color = Color::Rgb(0x33, 0x33, 0x33);
const PIECE: Color = Color::Rgb(0x0D, 0x6E, 0xFD);
const STROKE: Color = Color::Rgb(0x11, 0x11, 0x11);
const BG: Color = Color::Rgb(0x1E, 0x21, 0x27);
const DIV_LINE: Color = Color::Rgb(0x3F, 0x44, 0x4F);
const MAIN_FG: Color = Color::Rgb(0xAB, 0xB2, 0xBF);
const TITLE: Color = Color::Rgb(0xE5, 0xC0, 0x7B);
const ALERT: Color = Color::Rgb(0xE0, 0x6C, 0x75);

/// Board and UI colours.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Settled board cells.
    pub block: Color,
    /// The falling piece.
    pub piece: Color,
    /// Cell outlines.
    pub stroke: Color,
    /// Background behind board and panels.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, help).
    pub main_fg: Color,
    /// Highlight / titles; also the row-clear flash.
    pub title: Color,
    /// Game-over banner.
    pub alert: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            block: BLOCK,
            piece: PIECE,
            stroke: STROKE,
            bg: BG,
            div_line: DIV_LINE,
            main_fg: MAIN_FG,
            title: TITLE,
            alert: ALERT,
        }
    }
}

impl Theme {
    /// Read `theme[key]="#hex"` lines from `path`, then apply `palette`.
    /// No path or a missing file gives the palette defaults; a file that exists but cannot be read is an error.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let mut theme = Self::from_map(&parse_theme_file(&s));
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Built-in colours with `palette` applied.
    pub fn for_palette(palette: Palette) -> Self {
        let mut t = Self::default();
        t.apply_palette(palette);
        t
    }

    /// Override block and piece colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.block = Color::Rgb(0xBB, 0xBB, 0xBB);
                self.piece = Color::Rgb(0xFF, 0xFF, 0x00);
                self.stroke = Color::Rgb(0x00, 0x00, 0x00);
                self.bg = Color::Rgb(0x00, 0x00, 0x00);
            }
            Palette::Colorblind => {
                // Blue/orange pair stays distinct for red-green deficiencies.
                self.block = Color::Rgb(0x00, 0x77, 0xBB);
                self.piece = Color::Rgb(0xEE, 0x77, 0x33);
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        Self {
            block: get("block").or_else(|| get("inactive_fg")).unwrap_or(BLOCK),
            piece: get("piece").or_else(|| get("hi_fg")).unwrap_or(PIECE),
            stroke: get("stroke").unwrap_or(STROKE),
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(BG),
            div_line: get("div_line").unwrap_or(DIV_LINE),
            main_fg: get("main_fg").unwrap_or(MAIN_FG),
            title: get("title").unwrap_or(TITLE),
            alert: get("alert").or_else(|| get("cpu_end")).unwrap_or(ALERT),
        }
    }
}

/// `theme[key]="value"` lines into a key/value map. Comments and malformed lines are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some(end) = stripped.find(']') else {
            continue;
        };
        let key = stripped[..end].trim();
        let rest = stripped[end + 1..].trim();
        if let Some(value) = rest.strip_prefix('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            if !value.is_empty() {
                entries.insert(key.to_string(), value.to_string());
            }
        }
    }
    entries
}

/// `#RRGGBB` or shorthand `#RGB`.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        digits
            .get(range)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
            .ok_or_else(|| ThemeError::InvalidHex(digits.to_string()))
    };
    match digits.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(ThemeError::InvalidHex(digits.to_string())),
    }
}
