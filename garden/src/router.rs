//! Maps key presses to garden actions through the configurable key table.

use garden_core::{Action, Binding, Direction, Key, KeyBindings, KeyInput};

/// How far one press of a parameter key moves the value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustSteps {
    pub volume: f32,
    pub radius: f32,
    pub timing: f32,
}

impl Default for AdjustSteps {
    fn default() -> Self {
        Self {
            volume: 0.1,
            radius: 0.5,
            timing: 0.25,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    bindings: KeyBindings,
    steps: AdjustSteps,
}

impl InputRouter {
    pub fn new(bindings: KeyBindings, steps: AdjustSteps) -> Self {
        Self { bindings, steps }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Resolves `input` for the current focus.
    ///
    /// Bound keys win over typing, so a letter bound to a grid action does
    /// not open the chooser.
    pub fn route(&self, input: KeyInput, chooser_open: bool) -> Option<Action> {
        if chooser_open {
            self.route_chooser(input.key)
        } else {
            self.route_grid(input)
        }
    }

    fn route_grid(&self, input: KeyInput) -> Option<Action> {
        let extend = input.modifier;
        let action = match self.bindings.resolve_grid(input.key) {
            Some(Binding::MoveUp) => Action::Move {
                direction: Direction::Up,
                extend,
            },
            Some(Binding::MoveDown) => Action::Move {
                direction: Direction::Down,
                extend,
            },
            Some(Binding::MoveLeft) => Action::Move {
                direction: Direction::Left,
                extend,
            },
            Some(Binding::MoveRight) => Action::Move {
                direction: Direction::Right,
                extend,
            },
            Some(Binding::Delete) => Action::DeleteAtCursor,
            Some(Binding::Cancel) => Action::Cancel,
            Some(Binding::VolumeUp) => Action::AdjustVolume(self.steps.volume),
            Some(Binding::VolumeDown) => Action::AdjustVolume(-self.steps.volume),
            Some(Binding::RadiusUp) => Action::AdjustRadius(self.steps.radius),
            Some(Binding::RadiusDown) => Action::AdjustRadius(-self.steps.radius),
            Some(Binding::TimingEarlier) => Action::AdjustTiming(-self.steps.timing),
            Some(Binding::TimingLater) => Action::AdjustTiming(self.steps.timing),
            Some(_) => return None,
            None => match input.key {
                Key::Char(c) if c.is_alphanumeric() => Action::OpenChooser(c),
                _ => return None,
            },
        };
        Some(action)
    }

    fn route_chooser(&self, key: Key) -> Option<Action> {
        let action = match self.bindings.resolve_chooser(key) {
            Some(Binding::MoveUp) => Action::ChooserUp,
            Some(Binding::MoveDown) => Action::ChooserDown,
            Some(Binding::Cancel) => Action::Cancel,
            Some(Binding::Confirm) => Action::ChooserConfirm,
            Some(Binding::Erase) => Action::ChooserErase,
            Some(Binding::RemoveRecording) => Action::RemoveSelectedRecording,
            Some(_) => return None,
            None => match key {
                Key::Char(c) if !c.is_control() => Action::ChooserInput(c),
                _ => return None,
            },
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> InputRouter {
        InputRouter::default()
    }

    #[test]
    fn arrows_move_and_modifier_extends() {
        assert_eq!(
            router().route(KeyInput::plain(Key::Left), false),
            Some(Action::Move {
                direction: Direction::Left,
                extend: false
            })
        );
        assert_eq!(
            router().route(KeyInput::with_modifier(Key::Down), false),
            Some(Action::Move {
                direction: Direction::Down,
                extend: true
            })
        );
    }

    #[test]
    fn alphanumerics_open_the_chooser() {
        assert_eq!(
            router().route(KeyInput::plain(Key::Char('r')), false),
            Some(Action::OpenChooser('r'))
        );
        assert_eq!(
            router().route(KeyInput::with_modifier(Key::Char('7')), false),
            Some(Action::OpenChooser('7'))
        );
        assert_eq!(router().route(KeyInput::plain(Key::Char('!')), false), None);
        assert_eq!(router().route(KeyInput::plain(Key::Enter), false), None);
    }

    #[test]
    fn grid_keys_cover_deletion_cancel_and_params() {
        let router = router();
        assert_eq!(
            router.route(KeyInput::plain(Key::Delete), false),
            Some(Action::DeleteAtCursor)
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Escape), false),
            Some(Action::Cancel)
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Char('-')), false),
            Some(Action::AdjustVolume(-0.1))
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Char(']')), false),
            Some(Action::AdjustRadius(0.5))
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Char(',')), false),
            Some(Action::AdjustTiming(-0.25))
        );
    }

    #[test]
    fn chooser_context_types_and_navigates() {
        let router = router();
        assert_eq!(
            router.route(KeyInput::plain(Key::Char('-')), true),
            Some(Action::ChooserInput('-'))
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Char(' ')), true),
            Some(Action::ChooserInput(' '))
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Down), true),
            Some(Action::ChooserDown)
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Enter), true),
            Some(Action::ChooserConfirm)
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Backspace), true),
            Some(Action::ChooserErase)
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Delete), true),
            Some(Action::RemoveSelectedRecording)
        );
        assert_eq!(
            router.route(KeyInput::plain(Key::Escape), true),
            Some(Action::Cancel)
        );
        assert_eq!(router.route(KeyInput::plain(Key::Left), true), None);
    }

    #[test]
    fn rebound_letter_moves_instead_of_typing() {
        let bindings = KeyBindings {
            left: vec!["h".to_string()],
            ..KeyBindings::default()
        };
        let router = InputRouter::new(bindings, AdjustSteps::default());
        assert_eq!(
            router.route(KeyInput::plain(Key::Char('h')), false),
            Some(Action::Move {
                direction: Direction::Left,
                extend: false
            })
        );
        assert_eq!(router.route(KeyInput::plain(Key::Left), false), None);
    }
}
