//! Group files: named template definitions loaded together.
//!
//! ```text
//! delimiters "$", "$"          // optional, applies to the rest of the file
//! greet(name) ::= "hi $name$"
//! page(title, body) ::= <<
//! $title$
//! $body$
//! >>
//! ```
//!
//! Loading never stops at a bad template. Every diagnostic, from the
//! group syntax or from compiling a template body, is routed to the
//! caller's [`ErrorListener`] in the order it is encountered.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::ast::CompiledTemplate;
use crate::compiler::{CompileError, Compiler, TemplateDefinition};
use crate::cursor::Cursor;
use crate::diagnostic::{Diagnostic, ErrorKind, ErrorListener, RecognitionError, Stage};
use crate::token::{Position, Span};

/// Error produced when a group source cannot be read.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A set of compiled templates sharing one configuration.
#[derive(Debug, Clone, Default)]
pub struct Group {
    compiler: Compiler,
    templates: Vec<CompiledTemplate>,
}

impl Group {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_compiler(compiler: Compiler) -> Self {
        Self {
            compiler,
            templates: Vec::new(),
        }
    }

    #[must_use]
    pub fn template(&self, name: &str) -> Option<&CompiledTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn templates(&self) -> impl Iterator<Item = &CompiledTemplate> {
        self.templates.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Compile and add a single template directly, outside any load.
    ///
    /// # Errors
    ///
    /// Returns `CompileError` if `text` has a syntax error; the group is
    /// left unchanged.
    pub fn define_template(
        &mut self,
        name: &str,
        text: &str,
    ) -> Result<&CompiledTemplate, CompileError> {
        let template = self
            .compiler
            .compile_standalone(&TemplateDefinition::new(name, text))?;
        Ok(self.insert(template))
    }

    /// Load group-file text.
    pub fn load_str(
        &mut self,
        text: &str,
        source_name: Option<&str>,
        listener: &mut dyn ErrorListener,
    ) {
        debug!(source = ?source_name, "loading group");
        let before = self.templates.len();
        let mut parser = GroupParser::new(
            text,
            source_name.map(str::to_string),
            self.compiler,
            listener,
        );
        parser.parse_group(self);
        debug!(
            source = ?source_name,
            templates = self.templates.len() - before,
            "loaded group"
        );
    }

    /// Load a group file. The source name in diagnostics is the file name.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if the file cannot be read. Syntax errors go
    /// to `listener`.
    pub fn load_file(
        &mut self,
        path: impl AsRef<Path>,
        listener: &mut dyn ErrorListener,
    ) -> Result<(), LoadError> {
        let path = path.as_ref();
        let text = read(path)?;
        self.load_str(&text, file_name(path).as_deref(), listener);
        Ok(())
    }

    /// Load several group files into this group, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first file that cannot be read.
    pub fn load_files<P: AsRef<Path>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
        listener: &mut dyn ErrorListener,
    ) -> Result<(), LoadError> {
        for path in paths {
            self.load_file(path, listener)?;
        }
        Ok(())
    }

    /// Load a single-template file; the template is named after the
    /// file stem and the whole file is its body.
    ///
    /// # Errors
    ///
    /// Returns `LoadError` if the file cannot be read.
    pub fn load_template_file(
        &mut self,
        path: impl AsRef<Path>,
        listener: &mut dyn ErrorListener,
    ) -> Result<(), LoadError> {
        let path = path.as_ref();
        let text = read(path)?;
        let name = path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().into_owned());
        let mut def = TemplateDefinition::new(name, text);
        def.source_name = file_name(path);
        let template = self.compiler.compile(&def, listener);
        self.insert(template);
        Ok(())
    }

    fn insert(&mut self, template: CompiledTemplate) -> &CompiledTemplate {
        let index = if let Some(i) = self.templates.iter().position(|t| t.name == template.name)
        {
            warn!(template = %template.name, "redefinition of template");
            self.templates[i] = template;
            i
        } else {
            self.templates.push(template);
            self.templates.len() - 1
        };
        &self.templates[index]
    }
}

/// Load group-file text into a fresh group with default settings.
pub fn load_group(text: &str, source_name: Option<&str>, listener: &mut dyn ErrorListener) -> Group {
    let mut group = Group::new();
    group.load_str(text, source_name, listener);
    group
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

// -----------------------------------------------------------
// Group-file lexer.
// -----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupTokenKind {
    Id,
    LParen,
    RParen,
    Comma,
    DefinedAs,
    /// `"..."`
    String,
    /// `<<...>>`
    BigString,
    Eof,
}

impl fmt::Display for GroupTokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Id => "ID",
            Self::LParen => "LPAREN",
            Self::RParen => "RPAREN",
            Self::Comma => "COMMA",
            Self::DefinedAs => "'::='",
            Self::String => "STRING",
            Self::BigString => "BIGSTRING",
            Self::Eof => "EOF",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
struct GroupToken {
    kind: GroupTokenKind,
    /// For strings, the body with quotes removed.
    text: String,
    span: Span,
    /// For strings, where the body begins.
    body_start: Position,
    /// For `"..."`, offsets into `text` of quotes that were escaped.
    elided: Vec<usize>,
}

impl GroupToken {
    fn display_text(&self) -> String {
        match self.kind {
            GroupTokenKind::Eof => "<EOF>".to_string(),
            GroupTokenKind::String => format!("\"{}\"", self.text),
            GroupTokenKind::BigString => format!("<<{}>>", self.text),
            _ => self.text.clone(),
        }
    }
}

struct GroupLexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> GroupLexer<'a> {
    fn new(input: &'a str, source_name: Option<String>) -> Self {
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        Self {
            cursor: Cursor::starting_at(input, Position::START, source_name),
        }
    }

    fn report(listener: &mut dyn ErrorListener, err: RecognitionError) {
        listener.report(Diagnostic::from(err));
    }

    fn next_token(&mut self, listener: &mut dyn ErrorListener) -> GroupToken {
        loop {
            self.skip_trivia(listener);
            let start = self.cursor.position();
            let Some(ch) = self.cursor.peek() else {
                return self.token(GroupTokenKind::Eof, String::new(), start, start);
            };
            match ch {
                '(' | ')' | ',' => {
                    self.cursor.advance();
                    let kind = match ch {
                        '(' => GroupTokenKind::LParen,
                        ')' => GroupTokenKind::RParen,
                        _ => GroupTokenKind::Comma,
                    };
                    return self.token(kind, ch.to_string(), start, start);
                }
                ':' if self.cursor.starts_with("::=") => {
                    self.cursor.advance_by(3);
                    return self.token(GroupTokenKind::DefinedAs, "::=".into(), start, start);
                }
                '"' => return self.lex_string(listener),
                '<' if self.cursor.peek_at(1) == Some('<') => {
                    return self.lex_big_string(listener);
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    let mut text = String::new();
                    while let Some(c) = self
                        .cursor
                        .peek()
                        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
                    {
                        text.push(c);
                        self.cursor.advance();
                    }
                    return self.token(GroupTokenKind::Id, text, start, start);
                }
                c => {
                    self.cursor.advance();
                    Self::report(
                        listener,
                        RecognitionError::invalid_character(
                            Stage::Group,
                            c,
                            self.cursor.span_from(start),
                        ),
                    );
                }
            }
        }
    }

    fn token(
        &self,
        kind: GroupTokenKind,
        text: String,
        start: Position,
        body_start: Position,
    ) -> GroupToken {
        GroupToken {
            kind,
            text,
            span: self.cursor.span_from(start),
            body_start,
            elided: Vec::new(),
        }
    }

    fn skip_trivia(&mut self, listener: &mut dyn ErrorListener) {
        loop {
            match self.cursor.peek() {
                Some(c) if c.is_whitespace() => {
                    self.cursor.advance();
                }
                Some('/') if self.cursor.peek_at(1) == Some('/') => {
                    while self.cursor.peek().is_some_and(|c| c != '\n') {
                        self.cursor.advance();
                    }
                }
                Some('/') if self.cursor.peek_at(1) == Some('*') => {
                    self.cursor.advance_by(2);
                    loop {
                        if self.cursor.is_eof() {
                            Self::report(
                                listener,
                                RecognitionError::premature_eof(Stage::Group, self.cursor.here()),
                            );
                            return;
                        }
                        if self.cursor.starts_with("*/") {
                            self.cursor.advance_by(2);
                            break;
                        }
                        self.cursor.advance();
                    }
                }
                _ => return,
            }
        }
    }

    /// `"..."`. A raw newline is reported and kept in the body.
    fn lex_string(&mut self, listener: &mut dyn ErrorListener) -> GroupToken {
        let start = self.cursor.position();
        self.cursor.advance();
        let body_start = self.cursor.position();
        let mut text = String::new();
        let mut elided = Vec::new();
        loop {
            match self.cursor.peek() {
                None => {
                    Self::report(
                        listener,
                        RecognitionError::premature_eof(Stage::Group, self.cursor.here()),
                    );
                    break;
                }
                Some('"') => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') if self.cursor.peek_at(1) == Some('"') => {
                    self.cursor.advance_by(2);
                    elided.push(text.len());
                    text.push('"');
                }
                Some('\\') if self.cursor.peek_at(1) == Some('\\') => {
                    self.cursor.advance_by(2);
                    text.push_str("\\\\");
                }
                Some('\n') => {
                    let at = self.cursor.position();
                    self.cursor.advance();
                    Self::report(
                        listener,
                        RecognitionError::new(
                            Stage::Group,
                            ErrorKind::NewlineInString,
                            "\n",
                            self.cursor.span_from(at),
                            "\\n in string",
                        ),
                    );
                    text.push('\n');
                }
                Some(c) => {
                    self.cursor.advance();
                    text.push(c);
                }
            }
        }
        let mut token = self.token(GroupTokenKind::String, text, start, body_start);
        token.elided = elided;
        token
    }

    /// `<<...>>`, dropping one newline right after `<<` and one right
    /// before `>>`.
    fn lex_big_string(&mut self, listener: &mut dyn ErrorListener) -> GroupToken {
        let start = self.cursor.position();
        self.cursor.advance_by(2);
        if self.cursor.starts_with("\r\n") {
            self.cursor.advance_by(2);
        } else if self.cursor.peek() == Some('\n') {
            self.cursor.advance();
        }
        let body_start = self.cursor.position();
        let mut text = String::new();
        loop {
            if self.cursor.is_eof() {
                Self::report(
                    listener,
                    RecognitionError::premature_eof(Stage::Group, self.cursor.here()),
                );
                break;
            }
            if self.cursor.starts_with(">>") {
                self.cursor.advance_by(2);
                break;
            }
            if let Some(c) = self.cursor.advance() {
                text.push(c);
            }
        }
        if text.ends_with("\r\n") {
            text.truncate(text.len() - 2);
        } else if text.ends_with('\n') {
            text.pop();
        }
        self.token(GroupTokenKind::BigString, text, start, body_start)
    }
}

// -----------------------------------------------------------
// Group-file parser.
// -----------------------------------------------------------

/// Definition abandoned after a reported error.
struct Skip;

struct GroupParser<'a, 'l> {
    lexer: GroupLexer<'a>,
    current: GroupToken,
    compiler: Compiler,
    source_name: Option<String>,
    listener: &'l mut dyn ErrorListener,
}

impl<'a, 'l> GroupParser<'a, 'l> {
    fn new(
        text: &'a str,
        source_name: Option<String>,
        compiler: Compiler,
        listener: &'l mut dyn ErrorListener,
    ) -> Self {
        let mut lexer = GroupLexer::new(text, source_name.clone());
        let current = lexer.next_token(listener);
        Self {
            lexer,
            current,
            compiler,
            source_name,
            listener,
        }
    }

    fn advance(&mut self) -> GroupToken {
        let next = self.lexer.next_token(self.listener);
        std::mem::replace(&mut self.current, next)
    }

    fn at(&self, kind: GroupTokenKind) -> bool {
        self.current.kind == kind
    }

    fn error(&mut self, err: RecognitionError) -> Skip {
        self.listener.report(err.into());
        Skip
    }

    fn expect(&mut self, kind: GroupTokenKind) -> Result<GroupToken, Skip> {
        if self.at(kind) {
            return Ok(self.advance());
        }
        Err(self.mismatched(kind))
    }

    fn mismatched(&mut self, expected: GroupTokenKind) -> Skip {
        let err = if self.at(GroupTokenKind::Eof) {
            RecognitionError::premature_eof(Stage::Group, self.current.span.clone())
        } else {
            RecognitionError::mismatched(
                Stage::Group,
                &self.current.display_text(),
                expected,
                self.current.span.clone(),
            )
        };
        self.error(err)
    }

    fn parse_group(&mut self, group: &mut Group) {
        if self.current.kind == GroupTokenKind::Id
            && self.current.text == "delimiters"
            && self.parse_delimiters().is_err()
        {
            self.recover();
        }
        while !self.at(GroupTokenKind::Eof) {
            match self.parse_definition() {
                Ok(template) => {
                    group.insert(template);
                }
                Err(Skip) => self.recover(),
            }
        }
    }

    fn parse_delimiters(&mut self) -> Result<(), Skip> {
        self.advance();
        let start = self.delimiter_char()?;
        self.expect(GroupTokenKind::Comma)?;
        let stop = self.delimiter_char()?;
        self.compiler = self.compiler.delimiters(start, stop);
        Ok(())
    }

    fn delimiter_char(&mut self) -> Result<char, Skip> {
        let token = self.expect(GroupTokenKind::String)?;
        let mut chars = token.text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(self.error(RecognitionError::unexpected(
                Stage::Group,
                &token.display_text(),
                token.span,
            ))),
        }
    }

    fn parse_definition(&mut self) -> Result<CompiledTemplate, Skip> {
        let name = self.expect(GroupTokenKind::Id)?;
        self.expect(GroupTokenKind::LParen)?;
        let mut formal_args = Vec::new();
        if self.at(GroupTokenKind::Id) {
            formal_args.push(self.advance().text);
            while self.at(GroupTokenKind::Comma) {
                self.advance();
                formal_args.push(self.expect(GroupTokenKind::Id)?.text);
            }
        }
        self.expect(GroupTokenKind::RParen)?;
        self.expect(GroupTokenKind::DefinedAs)?;

        if !self.at(GroupTokenKind::String) && !self.at(GroupTokenKind::BigString) {
            return Err(self.mismatched(GroupTokenKind::String));
        }

        // Compile before lexing further so diagnostics stay in source order.
        let mut def = TemplateDefinition::new(name.text, self.current.text.clone())
            .formal_args(formal_args)
            .starting_at(self.current.body_start)
            .elided(self.current.elided.clone());
        def.source_name.clone_from(&self.source_name);
        let template = self.compiler.compile(&def, self.listener);
        self.advance();
        Ok(template)
    }

    /// Skip past the body of the definition that failed.
    fn recover(&mut self) {
        loop {
            match self.current.kind {
                GroupTokenKind::Eof => return,
                GroupTokenKind::String | GroupTokenKind::BigString => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }
}
