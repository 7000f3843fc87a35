/// What pressing Enter does in the composer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Send the composed text.
    Submit,
    /// Keep composing on a new line.
    InsertLineBreak,
}

impl KeyAction {
    /// Classifies an Enter key press. Shift+Enter inserts a line break,
    /// a bare Enter submits.
    #[inline]
    pub fn for_enter(shift: bool) -> Self {
        if shift {
            Self::InsertLineBreak
        } else {
            Self::Submit
        }
    }
}

/// Line-oriented composer for terminals.
///
/// Terminals can't report Shift+Enter, so a line ending with a backslash
/// stands in for it: the backslash is dropped and composing continues on
/// the next line.
#[derive(Debug, Default)]
pub struct InputBuffer {
    text: String,
}

impl InputBuffer {
    /// Feeds one line (with or without its line terminator). Returns the
    /// composed text when the line submits it.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (line, shift) = match line.strip_suffix('\\') {
            Some(line) => (line, true),
            None => (line, false),
        };
        self.text.push_str(line);

        match KeyAction::for_enter(shift) {
            KeyAction::InsertLineBreak => {
                self.text.push('\n');
                None
            }
            KeyAction::Submit => Some(std::mem::take(&mut self.text)),
        }
    }

    /// Returns `true` if a multi-line message is being composed.
    #[inline]
    pub fn is_composing(&self) -> bool {
        !self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_action() {
        assert_eq!(KeyAction::for_enter(false), KeyAction::Submit);
        assert_eq!(KeyAction::for_enter(true), KeyAction::InsertLineBreak);
    }

    #[test]
    fn test_single_line() {
        let mut input = InputBuffer::default();
        assert_eq!(input.push_line("Any diet tips?\n").as_deref(), Some("Any diet tips?"));
        assert!(!input.is_composing());
    }

    #[test]
    fn test_multi_line() {
        let mut input = InputBuffer::default();
        assert_eq!(input.push_line("My plan:\\\n"), None);
        assert!(input.is_composing());
        assert_eq!(input.push_line("- run\\\r\n"), None);
        assert_eq!(
            input.push_line("- sleep\n").as_deref(),
            Some("My plan:\n- run\n- sleep")
        );
        assert!(!input.is_composing());
    }

    #[test]
    fn test_empty_line() {
        let mut input = InputBuffer::default();
        assert_eq!(input.push_line("\n").as_deref(), Some(""));
    }
}
