//! Terminal key events to garden key input.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use garden_core::{Key, KeyInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Quit,
    Garden(KeyInput),
}

/// Shift is the region modifier. Ctrl+C and Ctrl+Q quit; other control
/// chords are ignored.
pub fn translate(event: &KeyEvent) -> Option<Input> {
    if event.kind == KeyEventKind::Release {
        return None;
    }

    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return match event.code {
            KeyCode::Char('c') | KeyCode::Char('q') => Some(Input::Quit),
            _ => None,
        };
    }

    let key = match event.code {
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Tab => Key::Tab,
        KeyCode::Char(c) => Key::Char(c),
        _ => return None,
    };

    Some(Input::Garden(KeyInput {
        key,
        modifier: event.modifiers.contains(KeyModifiers::SHIFT),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_carry_shift_as_modifier() {
        let plain = KeyEvent::from(KeyCode::Left);
        assert_eq!(
            translate(&plain),
            Some(Input::Garden(KeyInput::plain(Key::Left)))
        );

        let shifted = KeyEvent::new(KeyCode::Down, KeyModifiers::SHIFT);
        assert_eq!(
            translate(&shifted),
            Some(Input::Garden(KeyInput::with_modifier(Key::Down)))
        );
    }

    #[test]
    fn control_chords_quit_or_are_ignored() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(translate(&ctrl_c), Some(Input::Quit));
        let ctrl_x = KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL);
        assert_eq!(translate(&ctrl_x), None);
    }

    #[test]
    fn characters_and_named_keys() {
        assert_eq!(
            translate(&KeyEvent::from(KeyCode::Char('r'))),
            Some(Input::Garden(KeyInput::plain(Key::Char('r'))))
        );
        assert_eq!(
            translate(&KeyEvent::from(KeyCode::Esc)),
            Some(Input::Garden(KeyInput::plain(Key::Escape)))
        );
        assert_eq!(translate(&KeyEvent::from(KeyCode::F(5))), None);
    }

    #[test]
    fn releases_are_ignored() {
        let release = KeyEvent::new_with_kind(
            KeyCode::Enter,
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert_eq!(translate(&release), None);
    }
}
