use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

// Single line edit state, driven one key event at a time. Serves both the
// cell editor and the open-file prompt. The cursor is a char position.
#[derive(Default)]
pub struct LineEditor {
    buffer: String,
    cursor: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug)]
pub struct EditResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub cursor: usize,
}

impl LineEditor {
    // Starts a new edit prefilled with the current value, cursor at the end.
    pub fn open(&mut self, initial: &str) {
        self.buffer = initial.to_string();
        self.cursor = self.buffer.chars().count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn read(&mut self, key: KeyEvent) -> EditResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.enter(),
            (KeyCode::Esc, KeyModifiers::NONE) => self.escape(),
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Delete, KeyModifiers::NONE) => self.delete(),
            (KeyCode::Left, KeyModifiers::NONE) => self.left(),
            (KeyCode::Right, KeyModifiers::NONE) => self.right(),
            (KeyCode::Home, KeyModifiers::NONE) => self.home(),
            (KeyCode::End, KeyModifiers::NONE) => self.end(),
            (code, modifiers) => self.key(code, modifiers),
        }
    }

    pub fn get(&self) -> EditResult {
        EditResult {
            input: self.buffer.clone(),
            finished: self.finished,
            canceled: self.canceled,
            cursor: self.cursor,
        }
    }

    fn enter(&mut self) -> EditResult {
        self.finished = true;
        self.get()
    }

    fn escape(&mut self) -> EditResult {
        self.finished = true;
        self.canceled = true;
        self.get()
    }

    fn backspace(&mut self) -> EditResult {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_pos(self.cursor);
            self.buffer.remove(idx);
        }
        self.get()
    }

    fn delete(&mut self) -> EditResult {
        if self.cursor < self.buffer.chars().count() {
            let idx = self.byte_pos(self.cursor);
            self.buffer.remove(idx);
        }
        self.get()
    }

    fn left(&mut self) -> EditResult {
        self.cursor = self.cursor.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> EditResult {
        if self.cursor < self.buffer.chars().count() {
            self.cursor += 1;
        }
        self.get()
    }

    fn home(&mut self) -> EditResult {
        self.cursor = 0;
        self.get()
    }

    fn end(&mut self) -> EditResult {
        self.cursor = self.buffer.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> EditResult {
        if !modifiers.contains(KeyModifiers::CONTROL)
            && let Some(chr) = code.as_char()
        {
            let idx = self.byte_pos(self.cursor);
            self.buffer.insert(idx, chr);
            self.cursor += 1;
        }
        self.get()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.buffer
            .char_indices()
            .nth(char_pos)
            .map(|(idx, _)| idx)
            .unwrap_or(self.buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(editor: &mut LineEditor, code: KeyCode) -> EditResult {
        editor.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn typing_appends_at_the_cursor() {
        let mut editor = LineEditor::default();
        editor.open("");
        press(&mut editor, KeyCode::Char('2'));
        press(&mut editor, KeyCode::Char('6'));
        let result = press(&mut editor, KeyCode::Enter);
        assert!(result.finished);
        assert!(!result.canceled);
        assert_eq!(result.input, "26");
    }

    #[test]
    fn open_prefills_with_the_current_value() {
        let mut editor = LineEditor::default();
        editor.open("30");
        press(&mut editor, KeyCode::Backspace);
        press(&mut editor, KeyCode::Char('1'));
        assert_eq!(press(&mut editor, KeyCode::Enter).input, "31");
    }

    #[test]
    fn backspace_removes_before_the_cursor() {
        let mut editor = LineEditor::default();
        editor.open("abc");
        press(&mut editor, KeyCode::Left);
        press(&mut editor, KeyCode::Backspace);
        assert_eq!(editor.get().input, "ac");
        assert_eq!(editor.get().cursor, 1);
    }

    #[test]
    fn escape_cancels() {
        let mut editor = LineEditor::default();
        editor.open("30");
        press(&mut editor, KeyCode::Char('9'));
        let result = press(&mut editor, KeyCode::Esc);
        assert!(result.finished);
        assert!(result.canceled);
    }

    #[test]
    fn multibyte_input_keeps_char_positions() {
        let mut editor = LineEditor::default();
        editor.open("na\u{ef}ve");
        press(&mut editor, KeyCode::Home);
        press(&mut editor, KeyCode::Right);
        press(&mut editor, KeyCode::Right);
        press(&mut editor, KeyCode::Delete);
        assert_eq!(editor.get().input, "nave");
    }
}
