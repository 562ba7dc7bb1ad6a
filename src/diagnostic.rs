use std::fmt;

use crate::token::Span;

/// Classifies a syntax diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Empty region where the whole template body should be.
    EmptyOrUnparseableExpr,
    /// Region whose first token cannot begin an expression.
    InvalidExprStart,
    /// Character that is not part of the expression grammar.
    InvalidCharacter,
    /// Raw line break inside a `"..."` template string.
    NewlineInString,
    /// Input ended inside an open construct.
    PrematureEof,
    /// A specific token was required and something else was found.
    MismatchedToken,
    /// A token that no rule accepts at this point.
    UnexpectedToken,
}

impl ErrorKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EmptyOrUnparseableExpr => "EMPTY_OR_UNPARSEABLE_EXPR",
            Self::InvalidExprStart => "INVALID_EXPR_START",
            Self::InvalidCharacter => "INVALID_CHARACTER",
            Self::NewlineInString => "NEWLINE_IN_STRING",
            Self::PrematureEof => "PREMATURE_EOF",
            Self::MismatchedToken => "MISMATCHED_TOKEN",
            Self::UnexpectedToken => "UNEXPECTED_TOKEN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which recognizer detected a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Group file lexer or parser.
    Group,
    /// Template text lexer.
    Lexer,
    /// Template expression parser.
    Parser,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group => write!(f, "group parser"),
            Self::Lexer => write!(f, "template lexer"),
            Self::Parser => write!(f, "template parser"),
        }
    }
}

/// Low-level failure raised by a recognizer at a single token.
///
/// Every recognition error becomes exactly one [`Diagnostic`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{stage} rejected '{text}' at {}", span.start)]
pub struct RecognitionError {
    pub stage: Stage,
    pub kind: ErrorKind,
    /// Text of the offending token or character.
    pub text: String,
    pub span: Span,
    pub message: String,
}

impl RecognitionError {
    pub fn new(
        stage: Stage,
        kind: ErrorKind,
        text: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            kind,
            text: text.into(),
            span,
            message: message.into(),
        }
    }

    pub fn invalid_character(stage: Stage, ch: char, span: Span) -> Self {
        Self::new(
            stage,
            ErrorKind::InvalidCharacter,
            ch.to_string(),
            span,
            format!("invalid character: {ch}"),
        )
    }

    pub fn premature_eof(stage: Stage, span: Span) -> Self {
        Self::new(stage, ErrorKind::PrematureEof, "<EOF>", span, "premature EOF")
    }

    pub fn mismatched(stage: Stage, found: &str, expected: impl fmt::Display, span: Span) -> Self {
        Self::new(
            stage,
            ErrorKind::MismatchedToken,
            found,
            span,
            format!("mismatched input '{found}' expecting {expected}"),
        )
    }

    pub fn unexpected(stage: Stage, found: &str, span: Span) -> Self {
        Self::new(
            stage,
            ErrorKind::UnexpectedToken,
            found,
            span,
            format!("'{found}' came as a complete surprise to me"),
        )
    }

    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            kind: self.kind,
            span: self.span.clone(),
            message: self.message.clone(),
        }
    }
}

/// A source-located syntax error.
///
/// Renders as `[source ]line:column: message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn source_name(&self) -> Option<&str> {
        self.span.source_name.as_deref()
    }

    #[must_use]
    pub const fn line(&self) -> usize {
        self.span.start.line
    }

    #[must_use]
    pub const fn column(&self) -> usize {
        self.span.start.column
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.source_name() {
            write!(f, "{name} ")?;
        }
        write!(f, "{}:{}: {}", self.line(), self.column(), self.message)
    }
}

impl std::error::Error for Diagnostic {}

impl From<RecognitionError> for Diagnostic {
    fn from(err: RecognitionError) -> Self {
        Self {
            kind: err.kind,
            span: err.span,
            message: err.message,
        }
    }
}

/// Sink for diagnostics produced while loading or compiling templates.
pub trait ErrorListener {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl<L: ErrorListener + ?Sized> ErrorListener for &mut L {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

impl ErrorListener for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Ordered, append-only collection of diagnostics.
///
/// `Display` writes every diagnostic followed by a newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBuffer {
    diagnostics: Vec<Diagnostic>,
}

impl ErrorBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    /// Formatted messages, one per diagnostic, without separators.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

impl ErrorListener for ErrorBuffer {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

impl Extend<Diagnostic> for ErrorBuffer {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.diagnostics.extend(iter);
    }
}

impl<'a> IntoIterator for &'a ErrorBuffer {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

impl fmt::Display for ErrorBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.diagnostics {
            writeln!(f, "{d}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Position;

    fn span(name: Option<&str>, line: usize, column: usize) -> Span {
        let at = Position::new(line, column, 0);
        Span::new(name.map(str::to_string), at, at)
    }

    #[test]
    fn format_with_source_name() {
        let d = Diagnostic::new(ErrorKind::PrematureEof, span(Some("t.stg"), 1, 32), "premature EOF");
        assert_eq!(d.to_string(), "t.stg 1:32: premature EOF");
    }

    #[test]
    fn format_without_source_name() {
        let d = Diagnostic::new(
            ErrorKind::InvalidExprStart,
            span(None, 1, 3),
            "doesn't look like an expression",
        );
        assert_eq!(d.to_string(), "1:3: doesn't look like an expression");
    }

    #[test]
    fn buffer_renders_trailing_newlines() {
        let mut buf = ErrorBuffer::new();
        buf.report(Diagnostic::new(ErrorKind::PrematureEof, span(None, 1, 0), "a"));
        buf.report(Diagnostic::new(ErrorKind::PrematureEof, span(None, 2, 1), "b"));
        assert_eq!(buf.to_string(), "1:0: a\n2:1: b\n");
        assert_eq!(buf.messages(), vec!["1:0: a", "2:1: b"]);
    }

    #[test]
    fn recognition_messages() {
        let e = RecognitionError::mismatched(Stage::Parser, ">", "RPAREN", span(None, 1, 8));
        assert_eq!(e.message, "mismatched input '>' expecting RPAREN");
        let e = RecognitionError::unexpected(Stage::Parser, "!", span(None, 1, 8));
        assert_eq!(e.message, "'!' came as a complete surprise to me");
        let e = RecognitionError::invalid_character(Stage::Lexer, '*', span(None, 1, 4));
        assert_eq!(e.to_diagnostic().to_string(), "1:4: invalid character: *");
    }

    #[test]
    fn listener_through_mut_ref() {
        fn emit(mut l: impl ErrorListener) {
            l.report(Diagnostic::new(ErrorKind::PrematureEof, span(None, 1, 0), "x"));
        }
        let mut v: Vec<Diagnostic> = Vec::new();
        emit(&mut v);
        assert_eq!(v.len(), 1);
    }
}
