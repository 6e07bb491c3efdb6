use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line text input. The cursor counts characters, not bytes.
#[derive(Default, Debug)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        self.finished = false;
        self.canceled = false;
        match (key.code, key.modifiers) {
            (KeyCode::Enter, KeyModifiers::NONE) => self.enter(),
            (KeyCode::Esc, KeyModifiers::NONE) => self.escape(),
            (KeyCode::Backspace, KeyModifiers::NONE) => self.backspace(),
            (KeyCode::Delete, KeyModifiers::NONE) => self.delete(),
            (KeyCode::Left, KeyModifiers::NONE) => self.left(),
            (KeyCode::Right, KeyModifiers::NONE) => self.right(),
            (KeyCode::Home, KeyModifiers::NONE) => self.home(),
            (KeyCode::End, KeyModifiers::NONE) => self.end(),
            (kc, km) => self.key(kc, km),
        }
    }

    /// Replaces the content and puts the cursor behind it.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.curser_pos = s.chars().count();
        self.finished = false;
        self.canceled = false;
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.curser_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        self.get()
    }

    // Leaves the text alone, the owner decides what a cancel means.
    fn escape(&mut self) -> InputResult {
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            let pos = self.getbytepos();
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            let pos = self.getbytepos();
            self.current_input.remove(pos);
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.curser_pos < self.current_input.chars().count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.curser_pos = self.current_input.chars().count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            trace!("Ignoring input key {code:?} with {modifier:?}");
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            let pos = self.getbytepos();
            self.current_input.insert(pos, chr);
            self.curser_pos += 1;
        }
        self.get()
    }

    fn getbytepos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn type_str(input: &mut Inputter, s: &str) {
        for c in s.chars() {
            input.read(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
    }

    fn press(input: &mut Inputter, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn typing_and_editing() {
        let mut input = Inputter::default();
        type_str(&mut input, "alpa");
        press(&mut input, KeyCode::Left);
        type_str(&mut input, "h");
        assert_eq!(input.get().input, "alpha");

        press(&mut input, KeyCode::Home);
        press(&mut input, KeyCode::Delete);
        assert_eq!(input.get().input, "lpha");

        press(&mut input, KeyCode::End);
        let res = press(&mut input, KeyCode::Backspace);
        assert_eq!(res.input, "lph");
        assert_eq!(res.curser_pos, 3);
    }

    #[test]
    fn multibyte_characters() {
        let mut input = Inputter::default();
        input.set("café");
        assert_eq!(input.get().curser_pos, 4);
        press(&mut input, KeyCode::Backspace);
        assert_eq!(input.get().input, "caf");
    }

    #[test]
    fn enter_and_escape_finish() {
        let mut input = Inputter::default();
        type_str(&mut input, "x");
        let res = press(&mut input, KeyCode::Enter);
        assert!(res.finished && !res.canceled);

        input.set("y");
        let res = press(&mut input, KeyCode::Esc);
        assert!(res.finished && res.canceled);
        assert_eq!(res.input, "y");
    }

    #[test]
    fn control_chords_are_not_text() {
        let mut input = Inputter::default();
        input.read(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        assert_eq!(input.get().input, "");
    }
}
