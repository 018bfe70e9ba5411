// Single-line text input
//
// Tracks the cursor as a char index so multi-byte input never splits a
// character.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing value with the cursor at the end
    pub fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Apply an editing key. Returns true if the value changed.
    pub fn handle(&mut self, key: &KeyEvent) -> bool {
        let len = self.value.chars().count();
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let changed = !self.value.is_empty();
                self.clear();
                changed
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let at = self.byte_index(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
                true
            }
            KeyCode::Backspace if self.cursor > 0 => {
                self.cursor -= 1;
                let at = self.byte_index(self.cursor);
                self.value.remove(at);
                true
            }
            KeyCode::Delete if self.cursor < len => {
                let at = self.byte_index(self.cursor);
                self.value.remove(at);
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                false
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                false
            }
            KeyCode::Home => {
                self.cursor = 0;
                false
            }
            KeyCode::End => {
                self.cursor = len;
                false
            }
            _ => false,
        }
    }

    /// Text as drawn; secrets are masked
    pub fn display(&self, secret: bool) -> String {
        if secret {
            "•".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(input: &mut TextInput, s: &str) {
        for c in s.chars() {
            input.handle(&key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut input = TextInput::new();
        type_str(&mut input, "gunn");
        assert!(input.handle(&key(KeyCode::Backspace)));
        assert_eq!(input.value(), "gun");
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn test_insert_in_the_middle_of_multibyte_text() {
        let mut input = TextInput::with_value("日語");
        input.handle(&key(KeyCode::Left));
        type_str(&mut input, "本");
        assert_eq!(input.value(), "日本語");

        input.handle(&key(KeyCode::Home));
        assert!(input.handle(&key(KeyCode::Delete)));
        assert_eq!(input.value(), "本語");
    }

    #[test]
    fn test_navigation_does_not_change_value() {
        let mut input = TextInput::with_value("abc");
        assert!(!input.handle(&key(KeyCode::Right)));
        assert!(!input.handle(&key(KeyCode::Home)));
        assert!(!input.handle(&key(KeyCode::Backspace)));
        assert_eq!(input.value(), "abc");
    }

    #[test]
    fn test_ctrl_u_clears() {
        let mut input = TextInput::with_value("secret");
        let ctrl_u = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert!(input.handle(&ctrl_u));
        assert_eq!(input.value(), "");
        assert!(!input.handle(&ctrl_u));
    }

    #[test]
    fn test_secret_display_is_masked() {
        let input = TextInput::with_value("hunter2");
        assert_eq!(input.display(true), "•••••••");
        assert_eq!(input.display(false), "hunter2");
    }
}
