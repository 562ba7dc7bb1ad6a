//! Template text lexer.
//!
//! The lexer runs in two modes. Outside delimiters it produces `Text`,
//! `Newline`, and `LDelim` tokens; inside a delimited region it produces
//! expression tokens (see [`expr`]). A `{` inside an expression opens a
//! subtemplate, which switches back to text mode until the matching `}`.
//!
//! Lexing never aborts: invalid characters are reported, emitted as
//! `Invalid` tokens, and skipped.

mod expr;

use crate::cursor::Cursor;
use crate::diagnostic::{RecognitionError, Stage};
use crate::token::{Position, Token, TokenKind};

/// Characters that open and close an expression region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub start: char,
    pub stop: char,
}

impl Delimiters {
    #[must_use]
    pub const fn new(start: char, stop: char) -> Self {
        Self { start, stop }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new('<', '>')
    }
}

/// Result of lexing one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed {
    /// Tokens, always terminated by a single `Eof`.
    pub tokens: Vec<Token>,
    /// Lexical errors in source order.
    pub errors: Vec<RecognitionError>,
    /// Input ended inside a region, subtemplate, or comment and the
    /// lexer already reported it.
    pub premature_eof: bool,
}

/// Tokenize template text with the default delimiters.
#[must_use]
pub fn tokenize(input: &str) -> Lexed {
    Lexer::new(Cursor::new(input), Delimiters::default()).tokenize()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Text { subtemplate: bool },
    Expr,
}

pub(crate) struct Lexer<'a> {
    cursor: Cursor<'a>,
    delimiters: Delimiters,
    modes: Vec<Mode>,
    tokens: Vec<Token>,
    errors: Vec<RecognitionError>,
    premature_eof: bool,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(cursor: Cursor<'a>, delimiters: Delimiters) -> Self {
        Self {
            cursor,
            delimiters,
            modes: vec![Mode::Text { subtemplate: false }],
            tokens: Vec::new(),
            errors: Vec::new(),
            premature_eof: false,
        }
    }

    pub(crate) fn tokenize(mut self) -> Lexed {
        loop {
            let done = match self.mode() {
                Mode::Text { subtemplate } => self.lex_text(subtemplate),
                Mode::Expr => self.lex_expr(),
            };
            if done {
                break;
            }
        }
        let eof = self.cursor.here();
        self.tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            span: eof,
        });
        Lexed {
            tokens: self.tokens,
            errors: self.errors,
            premature_eof: self.premature_eof,
        }
    }

    fn mode(&self) -> Mode {
        self.modes
            .last()
            .copied()
            .unwrap_or(Mode::Text { subtemplate: false })
    }

    fn pop_mode(&mut self) {
        if self.modes.len() > 1 {
            self.modes.pop();
        }
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, start: Position) {
        let span = self.cursor.span_from(start);
        self.tokens.push(Token {
            kind,
            text: text.into(),
            span,
        });
    }

    /// Consume one character and emit it as a token of `kind`.
    fn single(&mut self, kind: TokenKind) {
        let start = self.cursor.position();
        if let Some(ch) = self.cursor.advance() {
            self.push(kind, ch.to_string(), start);
        }
    }

    fn report_eof(&mut self) {
        if !self.premature_eof {
            self.premature_eof = true;
            self.errors
                .push(RecognitionError::premature_eof(Stage::Lexer, self.cursor.here()));
        }
    }

    fn invalid_char(&mut self, ch: char) {
        let start = self.cursor.position();
        self.cursor.advance();
        let span = self.cursor.span_from(start);
        self.errors
            .push(RecognitionError::invalid_character(Stage::Lexer, ch, span.clone()));
        self.tokens.push(Token {
            kind: TokenKind::Invalid,
            text: ch.to_string(),
            span,
        });
    }

    /// Lex one text-mode token. Returns `true` at end of input.
    fn lex_text(&mut self, subtemplate: bool) -> bool {
        let Some(ch) = self.cursor.peek() else {
            if self.modes.len() > 1 {
                self.report_eof();
            }
            return true;
        };

        let start = self.cursor.position();
        match ch {
            '\n' => {
                self.cursor.advance();
                self.push(TokenKind::Newline, "\n", start);
            }
            '\r' if self.cursor.peek_at(1) == Some('\n') => {
                self.cursor.advance_by(2);
                self.push(TokenKind::Newline, "\n", start);
            }
            '}' if subtemplate => {
                self.cursor.advance();
                self.push(TokenKind::RCurly, "}", start);
                self.pop_mode();
            }
            c if c == self.delimiters.start => match self.cursor.peek_at(1) {
                Some('!') => self.skip_comment(),
                Some('\\') => self.lex_escape_tag(),
                _ => {
                    self.cursor.advance();
                    self.push(TokenKind::LDelim, c.to_string(), start);
                    self.modes.push(Mode::Expr);
                }
            },
            _ => self.lex_text_run(subtemplate),
        }
        false
    }

    fn is_escapable(&self, ch: char) -> bool {
        ch == self.delimiters.start || ch == self.delimiters.stop || ch == '{' || ch == '}'
    }

    fn lex_text_run(&mut self, subtemplate: bool) {
        let start = self.cursor.position();
        let mut text = String::new();
        while let Some(ch) = self.cursor.peek() {
            match ch {
                '\n' => break,
                '\r' if self.cursor.peek_at(1) == Some('\n') => break,
                '}' if subtemplate => break,
                c if c == self.delimiters.start => break,
                '\\' => match self.cursor.peek_at(1) {
                    Some(next) if self.is_escapable(next) => {
                        self.cursor.advance_by(2);
                        text.push(next);
                    }
                    _ => {
                        self.cursor.advance();
                        text.push('\\');
                    }
                },
                c => {
                    self.cursor.advance();
                    text.push(c);
                }
            }
        }
        self.push(TokenKind::Text, text, start);
    }

    /// Skip `<! ... !>`.
    fn skip_comment(&mut self) {
        self.cursor.advance_by(2);
        loop {
            match self.cursor.peek() {
                None => {
                    self.report_eof();
                    return;
                }
                Some('!') if self.cursor.peek_at(1) == Some(self.delimiters.stop) => {
                    self.cursor.advance_by(2);
                    return;
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// Lex a special-character tag such as `<\n>` or `<\t\ é>` into
    /// a `Text` token.
    fn lex_escape_tag(&mut self) {
        let start = self.cursor.position();
        self.cursor.advance();
        let mut text = String::new();
        loop {
            match self.cursor.peek() {
                None => {
                    self.report_eof();
                    break;
                }
                Some(c) if c == self.delimiters.stop => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') => {
                    self.cursor.advance();
                    match self.cursor.peek() {
                        Some('n') => {
                            self.cursor.advance();
                            text.push('\n');
                        }
                        Some('t') => {
                            self.cursor.advance();
                            text.push('\t');
                        }
                        Some(' ') => {
                            self.cursor.advance();
                            text.push(' ');
                        }
                        Some('u') => {
                            self.cursor.advance();
                            self.lex_unicode_escape(&mut text);
                        }
                        Some(c) => self.escape_error(c),
                        None => {}
                    }
                }
                Some(c) => self.escape_error(c),
            }
        }
        self.push(TokenKind::Text, text, start);
    }

    fn lex_unicode_escape(&mut self, text: &mut String) {
        let mut code = 0u32;
        for _ in 0..4 {
            match self.cursor.peek().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    code = code * 16 + d;
                    self.cursor.advance();
                }
                None => {
                    self.errors.push(RecognitionError::invalid_character(
                        Stage::Lexer,
                        'u',
                        self.cursor.here(),
                    ));
                    return;
                }
            }
        }
        match char::from_u32(code) {
            Some(c) => text.push(c),
            None => self.errors.push(RecognitionError::invalid_character(
                Stage::Lexer,
                'u',
                self.cursor.here(),
            )),
        }
    }

    fn escape_error(&mut self, ch: char) {
        let start = self.cursor.position();
        self.cursor.advance();
        let span = self.cursor.span_from(start);
        self.errors
            .push(RecognitionError::invalid_character(Stage::Lexer, ch, span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::ErrorKind;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn plain_text() {
        let lexed = tokenize("hello world");
        assert!(lexed.errors.is_empty());
        assert_eq!(lexed.tokens.len(), 2);
        assert_eq!(lexed.tokens[0].kind, TokenKind::Text);
        assert_eq!(lexed.tokens[0].text, "hello world");
        assert_eq!(lexed.tokens[1].kind, TokenKind::Eof);
    }

    #[test]
    fn newlines_split_text() {
        assert_eq!(
            kinds("a\nb\r\nc"),
            vec![
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Text,
                TokenKind::Newline,
                TokenKind::Text,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn region_switches_modes() {
        assert_eq!(
            kinds("hi <name> mom"),
            vec![
                TokenKind::Text,
                TokenKind::LDelim,
                TokenKind::Id,
                TokenKind::RDelim,
                TokenKind::Text,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn escaped_delimiter_is_text() {
        let lexed = tokenize(r"a \<b\> c");
        assert_eq!(lexed.tokens[0].text, "a <b> c");
        assert_eq!(lexed.tokens.len(), 2);
    }

    #[test]
    fn comment_is_skipped() {
        let lexed = tokenize("a<! ignore <me> !>b");
        let texts: Vec<_> = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", ""]);
    }

    #[test]
    fn unterminated_comment() {
        let lexed = tokenize("a<! never closed");
        assert!(lexed.premature_eof);
        assert_eq!(lexed.errors[0].kind, ErrorKind::PrematureEof);
        assert_eq!(lexed.errors[0].span.start.column, 16);
    }

    #[test]
    fn special_character_tags() {
        let lexed = tokenize(r"a<\n><\t\ ><\u0041>");
        assert!(lexed.errors.is_empty());
        let texts: Vec<_> = lexed.tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "\n", "\t ", "A", ""]);
    }

    #[test]
    fn bad_special_character() {
        let lexed = tokenize(r"<\q>");
        assert_eq!(lexed.errors.len(), 1);
        assert_eq!(lexed.errors[0].message, "invalid character: q");
        assert_eq!(lexed.errors[0].span.start.column, 2);
    }

    #[test]
    fn custom_delimiters() {
        let lexed = Lexer::new(Cursor::new("a $b$ <c>"), Delimiters::new('$', '$')).tokenize();
        let kinds: Vec<_> = lexed.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text,
                TokenKind::LDelim,
                TokenKind::Id,
                TokenKind::RDelim,
                TokenKind::Text,
                TokenKind::Eof
            ]
        );
        assert_eq!(lexed.tokens[4].text, " <c>");
    }

    #[test]
    fn eof_token_position() {
        let lexed = tokenize("ab\ncd");
        let eof = lexed.tokens.last().expect("eof");
        assert_eq!(eof.span.start, Position::new(2, 2, 5));
    }
}
