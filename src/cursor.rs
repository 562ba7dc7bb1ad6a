use crate::token::{Position, Span};

/// Character cursor that tracks line, column, and offset.
///
/// The cursor may start at an arbitrary [`Position`] so that text
/// embedded in a larger file reports file-relative locations.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    input: &'a str,
    /// Byte index into `input`.
    pos: usize,
    position: Position,
    source_name: Option<String>,
    /// Byte indexes still ahead whose character had an escape backslash
    /// in the source.
    elided: &'a [usize],
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self::starting_at(input, Position::START, None)
    }

    #[must_use]
    pub const fn starting_at(input: &'a str, start: Position, source_name: Option<String>) -> Self {
        Self {
            input,
            pos: 0,
            position: start,
            source_name,
            elided: &[],
        }
    }

    /// Account for one dropped source character before each byte index
    /// in `elided`, which must be ascending.
    #[must_use]
    pub fn with_elided(mut self, elided: &'a [usize]) -> Self {
        self.elided = elided;
        self.skip_elided();
        self
    }

    fn skip_elided(&mut self) {
        while let Some((&next, rest)) = self.elided.split_first() {
            if next > self.pos {
                break;
            }
            if next == self.pos {
                self.position.column += 1;
                self.position.offset += 1;
            }
            self.elided = rest;
        }
    }

    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    #[must_use]
    pub fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    /// True if the remaining input starts with `s`.
    #[must_use]
    pub fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    /// Consume one character. Returns `None` at end of input.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        self.position.offset += ch.len_utf8();
        if ch == '\n' {
            self.position.line += 1;
            self.position.column = 0;
        } else {
            self.position.column += 1;
        }
        self.skip_elided();
        Some(ch)
    }

    /// Consume `n` characters.
    pub fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            if self.advance().is_none() {
                break;
            }
        }
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    #[must_use]
    pub const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Span from `start` up to the current position.
    #[must_use]
    pub fn span_from(&self, start: Position) -> Span {
        Span::new(self.source_name.clone(), start, self.position)
    }

    /// Zero-width span at the current position.
    #[must_use]
    pub fn here(&self) -> Span {
        self.span_from(self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newline_resets_column() {
        let mut c = Cursor::new("ab\ncd");
        c.advance_by(3);
        assert_eq!(c.position(), Position::new(2, 0, 3));
        c.advance();
        assert_eq!(c.position(), Position::new(2, 1, 4));
    }

    #[test]
    fn eof_is_sentinel() {
        let mut c = Cursor::new("x");
        assert_eq!(c.advance(), Some('x'));
        assert_eq!(c.advance(), None);
        assert_eq!(c.peek(), None);
        assert!(c.is_eof());
        assert_eq!(c.position().column, 1);
    }

    #[test]
    fn starting_position_is_respected() {
        let mut c = Cursor::starting_at("hi", Position::new(3, 11, 40), Some("t.stg".into()));
        c.advance();
        assert_eq!(c.position(), Position::new(3, 12, 41));
        assert_eq!(c.here().source_name.as_deref(), Some("t.stg"));
    }

    #[test]
    fn elided_backslashes_shift_positions() {
        // source `"a\"b\"c`, body text `a"b"c`
        let elided = [1, 3];
        let mut c =
            Cursor::starting_at("a\"b\"c", Position::new(1, 1, 1), None).with_elided(&elided);
        c.advance();
        assert_eq!(c.position(), Position::new(1, 3, 3));
        assert_eq!(c.peek(), Some('"'));
        c.advance_by(3);
        assert_eq!(c.position(), Position::new(1, 7, 7));
        assert_eq!(c.peek(), Some('c'));
    }

    #[test]
    fn multibyte_offsets() {
        let mut c = Cursor::new("é<");
        c.advance();
        assert_eq!(c.position().column, 1);
        assert_eq!(c.position().offset, 2);
        assert_eq!(c.peek(), Some('<'));
    }
}
