use std::fmt;

/// A point in source text.
///
/// `line` is 1-based, `column` is 0-based and counted in characters,
/// `offset` is the byte offset from the start of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    /// The first character of a source.
    pub const START: Self = Self {
        line: 1,
        column: 0,
        offset: 0,
    };

    #[must_use]
    pub const fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Source location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    /// File or stream the text came from, when known.
    pub source_name: Option<String>,
    pub start: Position,
    /// Exclusive end.
    pub stop: Position,
}

impl Span {
    #[must_use]
    pub const fn new(source_name: Option<String>, start: Position, stop: Position) -> Self {
        Self {
            source_name,
            start,
            stop,
        }
    }

    /// Span running from the start of `self` to the end of `other`.
    #[must_use]
    pub fn to(&self, other: &Self) -> Self {
        Self {
            source_name: self.source_name.clone(),
            start: self.start,
            stop: other.stop,
        }
    }

    #[must_use]
    pub const fn line(&self) -> usize {
        self.start.line
    }

    #[must_use]
    pub const fn column(&self) -> usize {
        self.start.column
    }
}

/// Token kinds produced by the template lexer.
///
/// The first group is only produced outside delimiters, the second only
/// inside an expression region. `Eof` and `Invalid` can appear in either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Literal template text. Contains a line break only when produced
    /// by a `<\n>` tag.
    Text,
    /// Line break in template text.
    Newline,
    /// Start delimiter, `<` by default.
    LDelim,
    /// Stop delimiter, `>` by default.
    RDelim,

    Id,
    Dot,
    Colon,
    Semi,
    Comma,
    Equals,
    Bang,
    Pipe,
    And,
    Or,
    LParen,
    RParen,
    LBrack,
    RBrack,
    LCurly,
    RCurly,
    /// Single- or double-quoted string literal; `text` holds the unescaped value.
    String,

    /// Character that cannot start any token. Already reported by the lexer.
    Invalid,
    Eof,
}

impl TokenKind {
    /// Name used in "expecting ..." messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Newline => "NEWLINE",
            Self::LDelim => "LDELIM",
            Self::RDelim => "RDELIM",
            Self::Id => "ID",
            Self::Dot => "DOT",
            Self::Colon => "COLON",
            Self::Semi => "SEMI",
            Self::Comma => "COMMA",
            Self::Equals => "EQUALS",
            Self::Bang => "BANG",
            Self::Pipe => "PIPE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::LBrack => "LBRACK",
            Self::RBrack => "RBRACK",
            Self::LCurly => "LCURLY",
            Self::RCurly => "RCURLY",
            Self::String => "STRING",
            Self::Invalid => "INVALID",
            Self::Eof => "EOF",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single token with its kind, text, and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

impl Token {
    #[must_use]
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// True for an `Id` token spelled `word`.
    #[must_use]
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Id && self.text == word
    }

    /// Text as it appears in diagnostics (`<EOF>` for end of input).
    #[must_use]
    pub fn display_text(&self) -> &str {
        if self.kind == TokenKind::Eof {
            "<EOF>"
        } else {
            &self.text
        }
    }
}
