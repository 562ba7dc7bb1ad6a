//! Expression-mode lexing: the inside of `<...>`.

use super::{Lexer, Mode};
use crate::token::TokenKind;

const fn is_id_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

const fn is_id_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

impl Lexer<'_> {
    /// Lex one expression-mode token. Returns `true` at end of input.
    pub(super) fn lex_expr(&mut self) -> bool {
        self.skip_whitespace();

        let Some(ch) = self.cursor.peek() else {
            self.report_eof();
            return true;
        };

        if ch == self.delimiters.stop {
            self.single(TokenKind::RDelim);
            self.pop_mode();
            return false;
        }

        let start = self.cursor.position();
        match ch {
            c if is_id_start(c) => self.lex_id(),
            '.' => self.single(TokenKind::Dot),
            ':' => self.single(TokenKind::Colon),
            ';' => self.single(TokenKind::Semi),
            ',' => self.single(TokenKind::Comma),
            '=' => self.single(TokenKind::Equals),
            '!' => self.single(TokenKind::Bang),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBrack),
            ']' => self.single(TokenKind::RBrack),
            '|' if self.cursor.peek_at(1) == Some('|') => {
                self.cursor.advance_by(2);
                self.push(TokenKind::Or, "||", start);
            }
            '|' => self.single(TokenKind::Pipe),
            '&' if self.cursor.peek_at(1) == Some('&') => {
                self.cursor.advance_by(2);
                self.push(TokenKind::And, "&&", start);
            }
            '"' | '\'' => self.lex_string(ch),
            '{' => {
                self.single(TokenKind::LCurly);
                self.lex_formal_args();
                self.modes.push(Mode::Text { subtemplate: true });
            }
            c => self.invalid_char(c),
        }
        false
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.cursor.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.cursor.advance();
        }
    }

    fn lex_id(&mut self) {
        let start = self.cursor.position();
        let mut text = String::new();
        while let Some(ch) = self.cursor.peek().filter(|c| is_id_char(*c)) {
            text.push(ch);
            self.cursor.advance();
        }
        self.push(TokenKind::Id, text, start);
    }

    fn lex_string(&mut self, quote: char) {
        let start = self.cursor.position();
        self.cursor.advance();
        let mut value = String::new();
        loop {
            match self.cursor.peek() {
                None => {
                    self.report_eof();
                    break;
                }
                Some('\\') => {
                    self.cursor.advance();
                    match self.cursor.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some(c) => value.push(c),
                        None => {}
                    }
                }
                Some(c) if c == quote => {
                    self.cursor.advance();
                    break;
                }
                Some(c) => {
                    value.push(c);
                    self.cursor.advance();
                }
            }
        }
        self.push(TokenKind::String, value, start);
    }

    /// After `{`, lex `ID (',' ID)* '|'` if the subtemplate declares
    /// arguments. Leaves the cursor untouched otherwise.
    fn lex_formal_args(&mut self) {
        if !self.has_formal_args() {
            return;
        }
        loop {
            self.skip_whitespace();
            match self.cursor.peek() {
                Some(c) if is_id_start(c) => self.lex_id(),
                Some(',') => self.single(TokenKind::Comma),
                Some('|') => {
                    self.single(TokenKind::Pipe);
                    if self.cursor.peek() == Some(' ') {
                        self.cursor.advance();
                    }
                    return;
                }
                _ => return,
            }
        }
    }

    fn has_formal_args(&self) -> bool {
        let mut probe = self.cursor.clone();
        let skip_ws = |p: &mut crate::cursor::Cursor<'_>| {
            while matches!(p.peek(), Some(' ' | '\t' | '\n' | '\r')) {
                p.advance();
            }
        };
        loop {
            skip_ws(&mut probe);
            if !probe.peek().is_some_and(is_id_start) {
                return false;
            }
            while probe.peek().is_some_and(is_id_char) {
                probe.advance();
            }
            skip_ws(&mut probe);
            match probe.peek() {
                Some(',') => {
                    probe.advance();
                }
                Some('|') => return probe.peek_at(1) != Some('|'),
                _ => return false,
            }
        }
    }
}
