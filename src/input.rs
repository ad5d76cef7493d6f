//! Key bindings: arrows drive the piece; Enter, R and Q drive the app.

use crate::session::GameEvent;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    Start,
    Reset,
    Quit,
    None,
}

impl Action {
    /// The game event this action feeds into the session, if any.
    pub fn game_event(self) -> Option<GameEvent> {
        match self {
            Self::MoveLeft => Some(GameEvent::MoveLeft),
            Self::MoveRight => Some(GameEvent::MoveRight),
            Self::SoftDrop => Some(GameEvent::SoftDrop),
            Self::Rotate => Some(GameEvent::Rotate),
            Self::Reset => Some(GameEvent::Reset),
            Self::Start | Self::Quit | Self::None => None,
        }
    }
}

/// Map key event to action. Releases are ignored; terminal auto-repeat passes through.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code,
        modifiers,
        kind,
        ..
    } = key;
    if kind == KeyEventKind::Release {
        return Action::None;
    }
    if modifiers == KeyModifiers::CONTROL {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Left => Action::MoveLeft,
        KeyCode::Right => Action::MoveRight,
        KeyCode::Down => Action::SoftDrop,
        KeyCode::Up => Action::Rotate,
        KeyCode::Enter => Action::Start,
        KeyCode::Char('r' | 'R') => Action::Reset,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_arrows_map_to_piece_moves() {
        assert_eq!(key_to_action(press(KeyCode::Left)), Action::MoveLeft);
        assert_eq!(key_to_action(press(KeyCode::Right)), Action::MoveRight);
        assert_eq!(key_to_action(press(KeyCode::Down)), Action::SoftDrop);
        assert_eq!(key_to_action(press(KeyCode::Up)), Action::Rotate);
    }

    #[test]
    fn test_other_keys_are_ignored() {
        for code in [KeyCode::Char('h'), KeyCode::Char(' '), KeyCode::Tab, KeyCode::F(1)] {
            assert_eq!(key_to_action(press(code)), Action::None, "{code:?}");
        }
        let alt_left = KeyEvent::new(KeyCode::Left, KeyModifiers::ALT);
        assert_eq!(key_to_action(alt_left), Action::None);
    }

    #[test]
    fn test_release_ignored_repeat_applied() {
        let release = KeyEvent::new_with_kind(KeyCode::Left, KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(key_to_action(release), Action::None);
        let repeat = KeyEvent::new_with_kind_and_state(
            KeyCode::Left,
            KeyModifiers::NONE,
            KeyEventKind::Repeat,
            KeyEventState::NONE,
        );
        assert_eq!(key_to_action(repeat), Action::MoveLeft);
    }

    #[test]
    fn test_app_keys() {
        assert_eq!(key_to_action(press(KeyCode::Enter)), Action::Start);
        assert_eq!(key_to_action(press(KeyCode::Char('r'))), Action::Reset);
        assert_eq!(key_to_action(press(KeyCode::Esc)), Action::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
    }

    #[test]
    fn test_game_events() {
        assert_eq!(Action::Rotate.game_event(), Some(GameEvent::Rotate));
        assert_eq!(Action::Reset.game_event(), Some(GameEvent::Reset));
        assert_eq!(Action::Start.game_event(), None);
        assert_eq!(Action::Quit.game_event(), None);
    }
}
