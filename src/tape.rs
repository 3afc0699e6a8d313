//! An unbounded, bidirectional tape with a finite materialized window.
//!
//! Index 0 is always the leftmost materialized cell. The head may sit anywhere, including
//! to the left of the window (negative) or past its end; such cells read as blank and are
//! only materialized when a non-blank symbol is written there.

use crate::types::{Symbol, BLANK_SYMBOL};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tape {
    data: Vec<Symbol>,
    position: isize,
}

impl Tape {
    /// Creates a tape holding `data` with the head on its first cell.
    pub fn new(data: Vec<Symbol>) -> Self {
        Self { data, position: 0 }
    }

    fn index(&self) -> Option<usize> {
        usize::try_from(self.position)
            .ok()
            .filter(|&i| i < self.data.len())
    }

    /// Returns the symbol under the head, or blank outside the window.
    pub fn read(&self) -> Symbol {
        self.index().map_or(BLANK_SYMBOL, |i| self.data[i])
    }

    /// Writes `value` under the head, growing the window when needed.
    ///
    /// Writing a blank outside the window is a no-op.
    pub fn write(&mut self, value: Symbol) {
        if let Some(i) = self.index() {
            self.data[i] = value;
            return;
        }

        if value == BLANK_SYMBOL {
            return;
        }

        if self.position < 0 {
            let shift = self.position.unsigned_abs();
            self.data.splice(0..0, std::iter::repeat(BLANK_SYMBOL).take(shift));
            self.position = 0;
            self.data[0] = value;
        } else {
            let i = self.position as usize;
            self.data.resize(i + 1, BLANK_SYMBOL);
            self.data[i] = value;
        }
    }

    pub fn move_left(&mut self) {
        self.position -= 1;
    }

    pub fn move_right(&mut self) {
        self.position += 1;
    }

    /// Removes leading and trailing blanks, keeping the head over the same logical cell.
    pub fn trim(&mut self) {
        let leading = self.data.iter().take_while(|&&c| c == BLANK_SYMBOL).count();
        if leading > 0 {
            self.data.drain(..leading);
            self.position -= leading as isize;
        }

        while self.data.last() == Some(&BLANK_SYMBOL) {
            self.data.pop();
        }
    }

    /// The materialized cells.
    pub fn data(&self) -> &[Symbol] {
        &self.data
    }

    /// The head position relative to the first materialized cell.
    pub fn position(&self) -> isize {
        self.position
    }

    /// Whether the head is inside the materialized window.
    pub fn is_position_on_tape(&self) -> bool {
        self.index().is_some()
    }

    /// Returns the cells from the head to the end of the window, padding with blanks so
    /// that the head is a valid index.
    ///
    /// | b | b | b |     head -1  =>  "#bbb"
    ///   0   1   2       head  1  =>  "bb"
    ///                   head  4  =>  "#"
    pub fn content_from_head(&self) -> String {
        if self.position < 0 {
            let padding = self.position.unsigned_abs();
            std::iter::repeat(BLANK_SYMBOL)
                .take(padding)
                .chain(self.data.iter().copied())
                .collect()
        } else {
            let start = self.position as usize;
            if start >= self.data.len() {
                BLANK_SYMBOL.to_string()
            } else {
                self.data[start..].iter().collect()
            }
        }
    }

    /// Renders the tape on one line with the head cell in brackets.
    ///
    /// The window is widened to include the head and framed by one blank on each side,
    /// so `ab` with the head on `b` renders as ` #  a [b] # `.
    pub fn render(&self) -> String {
        let len = self.data.len() as isize;
        let from = self.position.min(0) - 1;
        let to = self.position.max(len - 1) + 1;

        (from..=to)
            .map(|i| {
                let symbol = if (0..len).contains(&i) {
                    self.data[i as usize]
                } else {
                    BLANK_SYMBOL
                };
                if i == self.position {
                    format!("[{symbol}]")
                } else {
                    format!(" {symbol} ")
                }
            })
            .collect()
    }
}

impl From<&str> for Tape {
    fn from(input: &str) -> Self {
        Tape::new(input.chars().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_outside_window_is_blank() {
        let mut tape = Tape::from("ab");
        assert_eq!(tape.read(), 'a');

        tape.move_left();
        assert_eq!(tape.position(), -1);
        assert_eq!(tape.read(), BLANK_SYMBOL);
        assert!(!tape.is_position_on_tape());

        tape.move_right();
        tape.move_right();
        tape.move_right();
        assert_eq!(tape.read(), BLANK_SYMBOL);
    }

    #[test]
    fn test_write_in_place() {
        let mut tape = Tape::from("ab");
        tape.move_right();
        tape.write('x');
        assert_eq!(tape.data(), &['a', 'x']);
        assert_eq!(tape.position(), 1);
    }

    #[test]
    fn test_write_extends_to_the_left_and_shifts_head() {
        let mut tape = Tape::from("ab");
        tape.move_left();
        tape.move_left();
        tape.write('x');

        assert_eq!(tape.data(), &['x', '#', 'a', 'b']);
        assert_eq!(tape.position(), 0);
        assert_eq!(tape.read(), 'x');
    }

    #[test]
    fn test_write_extends_to_the_right() {
        let mut tape = Tape::from("a");
        tape.move_right();
        tape.move_right();
        tape.write('x');

        assert_eq!(tape.data(), &['a', '#', 'x']);
        assert_eq!(tape.position(), 2);
    }

    #[test]
    fn test_blank_write_outside_window_never_grows() {
        let mut tape = Tape::from("a");
        for _ in 0..5 {
            tape.move_right();
        }
        tape.write(BLANK_SYMBOL);
        assert_eq!(tape.data(), &['a']);

        let mut tape = Tape::from("a");
        tape.move_left();
        tape.write(BLANK_SYMBOL);
        assert_eq!(tape.data(), &['a']);
        assert_eq!(tape.position(), -1);
    }

    #[test]
    fn test_trim_keeps_symbol_under_head() {
        let mut tape = Tape::from("##ab##");
        tape.move_right();
        tape.move_right();
        assert_eq!(tape.read(), 'a');

        tape.trim();
        assert_eq!(tape.data(), &['a', 'b']);
        assert_eq!(tape.position(), 0);
        assert_eq!(tape.read(), 'a');
    }

    #[test]
    fn test_trim_with_head_on_removed_blank() {
        let mut tape = Tape::from("#a#");
        tape.trim();
        assert_eq!(tape.data(), &['a']);
        assert_eq!(tape.position(), -1);
        assert_eq!(tape.read(), BLANK_SYMBOL);
    }

    #[test]
    fn test_trim_all_blank_tape() {
        let mut tape = Tape::from("###");
        tape.move_right();
        tape.trim();
        assert!(tape.data().is_empty());
        assert_eq!(tape.position(), -2);
        assert_eq!(tape.read(), BLANK_SYMBOL);
    }

    #[test]
    fn test_content_from_head() {
        let mut tape = Tape::from("bbb");
        tape.move_left();
        assert_eq!(tape.content_from_head(), "#bbb");

        let mut tape = Tape::from("bbb");
        tape.move_right();
        assert_eq!(tape.content_from_head(), "bb");

        let mut tape = Tape::from("bbb");
        for _ in 0..4 {
            tape.move_right();
        }
        assert_eq!(tape.content_from_head(), "#");

        assert_eq!(Tape::default().content_from_head(), "#");
    }

    #[test]
    fn test_render_marks_head() {
        let mut tape = Tape::from("ab");
        tape.move_right();
        assert_eq!(tape.render(), " #  a [b] # ");

        let mut tape = Tape::from("a");
        tape.move_left();
        assert_eq!(tape.render(), " # [#] a  # ");
    }
}
