//! Keyboard bindings

use winit::keyboard::{KeyCode, ModifiersState};

/// Operations the keyboard can request from a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NextContext,
    Reseed,
    Quit,
    ShrinkBodyCount,
    /// Doubles the all-pairs work, so it needs Shift held
    GrowBodyCount,
}

/// Map a pressed key to a command.
///
/// | Key                    | Command           |
/// |------------------------|-------------------|
/// | D                      | `NextContext`     |
/// | R                      | `Reseed`          |
/// | Q / Escape             | `Quit`            |
/// | - / numpad -           | `ShrinkBodyCount` |
/// | Shift + = or numpad +  | `GrowBodyCount`   |
pub fn command_for_key(key: KeyCode, modifiers: ModifiersState) -> Option<Command> {
    match key {
        KeyCode::KeyD => Some(Command::NextContext),
        KeyCode::KeyR => Some(Command::Reseed),
        KeyCode::KeyQ | KeyCode::Escape => Some(Command::Quit),
        KeyCode::Minus | KeyCode::NumpadSubtract => Some(Command::ShrinkBodyCount),
        KeyCode::Equal | KeyCode::NumpadAdd if modifiers.shift_key() => {
            Some(Command::GrowBodyCount)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_bindings() {
        let none = ModifiersState::empty();
        assert_eq!(command_for_key(KeyCode::KeyD, none), Some(Command::NextContext));
        assert_eq!(command_for_key(KeyCode::KeyR, none), Some(Command::Reseed));
        assert_eq!(command_for_key(KeyCode::KeyQ, none), Some(Command::Quit));
        assert_eq!(command_for_key(KeyCode::Escape, none), Some(Command::Quit));
        assert_eq!(
            command_for_key(KeyCode::Minus, none),
            Some(Command::ShrinkBodyCount)
        );
    }

    #[test]
    fn test_grow_requires_shift() {
        assert_eq!(command_for_key(KeyCode::Equal, ModifiersState::empty()), None);
        assert_eq!(command_for_key(KeyCode::NumpadAdd, ModifiersState::empty()), None);
        assert_eq!(
            command_for_key(KeyCode::NumpadAdd, ModifiersState::SHIFT),
            Some(Command::GrowBodyCount)
        );
        assert_eq!(
            command_for_key(KeyCode::Equal, ModifiersState::SHIFT),
            Some(Command::GrowBodyCount)
        );
    }

    #[test]
    fn test_unbound_key() {
        assert_eq!(command_for_key(KeyCode::KeyX, ModifiersState::SHIFT), None);
    }
}
