use tracing::{debug, trace};

use crate::ast::CompiledTemplate;
use crate::cursor::Cursor;
use crate::diagnostic::{Diagnostic, ErrorListener, RecognitionError};
use crate::lexer::{Delimiters, Lexed, Lexer};
use crate::parser;
use crate::token::{Position, Span};

/// Input to the compiler: one template's name and raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDefinition {
    pub name: String,
    pub text: String,
    /// File or stream the text came from, when known.
    pub source_name: Option<String>,
    pub formal_args: Vec<String>,
    /// Position of the first character of `text` within its source.
    pub start: Position,
    /// Byte offsets into `text` of characters written with an escape
    /// backslash in the source, in ascending order.
    pub elided: Vec<usize>,
}

impl TemplateDefinition {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            source_name: None,
            formal_args: Vec::new(),
            start: Position::START,
            elided: Vec::new(),
        }
    }

    #[must_use]
    pub fn source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn formal_args(mut self, args: Vec<String>) -> Self {
        self.formal_args = args;
        self
    }

    #[must_use]
    pub const fn starting_at(mut self, start: Position) -> Self {
        self.start = start;
        self
    }

    #[must_use]
    pub fn elided(mut self, offsets: Vec<usize>) -> Self {
        self.elided = offsets;
        self
    }
}

/// Failure to compile a template outside any group.
///
/// Carries the first diagnostic, every diagnostic in source order, and
/// the recognizer failure behind the first one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{diagnostic}")]
pub struct CompileError {
    pub template: String,
    pub diagnostic: Diagnostic,
    pub diagnostics: Vec<Diagnostic>,
    #[source]
    pub cause: RecognitionError,
}

/// Template compiler configuration.
///
/// ```
/// use stg_syntax::{Compiler, TemplateDefinition};
///
/// let compiler = Compiler::new().delimiters('$', '$');
/// let t = compiler
///     .compile_standalone(&TemplateDefinition::new("t", "hi $name$"))
///     .unwrap();
/// assert_eq!(t.elements.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Compiler {
    delimiters: Delimiters,
}

impl Compiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `start` and `stop` instead of `<` and `>`.
    #[must_use]
    pub const fn delimiters(mut self, start: char, stop: char) -> Self {
        self.delimiters = Delimiters::new(start, stop);
        self
    }

    #[must_use]
    pub const fn delimiter_pair(&self) -> Delimiters {
        self.delimiters
    }

    /// Compile in group context: every diagnostic goes to `listener` and
    /// a best-effort template is always returned.
    pub fn compile(
        &self,
        def: &TemplateDefinition,
        listener: &mut dyn ErrorListener,
    ) -> CompiledTemplate {
        let (template, errors) = self.recognize(def);
        for err in errors {
            listener.report(err.into());
        }
        template
    }

    /// Compile a single template with no listener installed.
    ///
    /// # Errors
    ///
    /// Returns `CompileError` carrying the first diagnostic if the
    /// template has any syntax error.
    pub fn compile_standalone(
        &self,
        def: &TemplateDefinition,
    ) -> Result<CompiledTemplate, CompileError> {
        let (template, errors) = self.recognize(def);
        let Some(cause) = errors.first().cloned() else {
            return Ok(template);
        };
        Err(CompileError {
            template: def.name.clone(),
            diagnostic: cause.to_diagnostic(),
            diagnostics: errors.iter().map(RecognitionError::to_diagnostic).collect(),
            cause,
        })
    }

    fn recognize(&self, def: &TemplateDefinition) -> (CompiledTemplate, Vec<RecognitionError>) {
        let cursor = Cursor::starting_at(&def.text, def.start, def.source_name.clone())
            .with_elided(&def.elided);
        let lexed = Lexer::new(cursor, self.delimiters).tokenize();
        trace!(
            template = %def.name,
            tokens = lexed.tokens.len(),
            "lexed template"
        );

        let parsed = parser::parse(&lexed, &def.text);
        let Lexed {
            tokens,
            errors: lex_errors,
            ..
        } = lexed;
        let errors = parsed.merge_errors(lex_errors);

        let stop = tokens.last().map_or(def.start, |t| t.span.stop);
        debug!(
            template = %def.name,
            diagnostics = errors.len(),
            "compiled template"
        );

        let template = CompiledTemplate {
            name: def.name.clone(),
            source_name: def.source_name.clone(),
            formal_args: def.formal_args.clone(),
            elements: parsed.elements,
            span: Span::new(def.source_name.clone(), def.start, stop),
        };
        (template, errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Element;
    use crate::diagnostic::{ErrorBuffer, ErrorKind, Stage};

    #[test]
    fn valid_template_has_no_diagnostics() {
        let mut errors = ErrorBuffer::new();
        let t = Compiler::new().compile(
            &TemplateDefinition::new("t", "hi <name>, <names:{n | <n>}; separator=\", \">"),
            &mut errors,
        );
        assert!(errors.is_empty(), "{errors}");
        assert!(!t.has_errors());
    }

    #[test]
    fn standalone_failure_carries_cause() {
        let err = Compiler::new()
            .compile_standalone(&TemplateDefinition::new("test", "hi <> "))
            .unwrap_err();
        assert_eq!(err.to_string(), "1:3: doesn't look like an expression");
        assert_eq!(err.diagnostic.kind, ErrorKind::InvalidExprStart);
        assert_eq!(err.cause.stage, Stage::Parser);
        assert_eq!(err.cause.text, "<");
        assert_eq!(err.diagnostics.len(), 1);
    }

    #[test]
    fn whole_template_empty_region() {
        let err = Compiler::new()
            .compile_standalone(&TemplateDefinition::new("test", " <> "))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "1:0: this doesn't look like a template: \" <> \""
        );
        assert_eq!(err.diagnostic.kind, ErrorKind::EmptyOrUnparseableExpr);
        assert_eq!(err.diagnostic.span.start.offset, 0);
    }

    #[test]
    fn weird_char() {
        let err = Compiler::new()
            .compile_standalone(&TemplateDefinition::new("test", "   <*>"))
            .unwrap_err();
        assert_eq!(err.to_string(), "1:4: invalid character: *");
        assert_eq!(err.cause.stage, Stage::Lexer);
    }

    #[test]
    fn offsets_follow_start_position() {
        let def = TemplateDefinition::new("foo", "hi <foo(>")
            .source_name("t.stg")
            .starting_at(Position::new(1, 11, 11));
        let mut errors = Vec::new();
        let template = Compiler::new().compile(&def, &mut errors);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "t.stg 1:19: mismatched input '>' expecting RPAREN"
        );
        assert!(template.has_errors());
        assert!(matches!(template.elements[1], Element::Error { .. }));
    }

    #[test]
    fn compiling_twice_is_identical() {
        let def = TemplateDefinition::new("t", "<a b> <*> <c.>");
        let mut first = ErrorBuffer::new();
        let mut second = ErrorBuffer::new();
        Compiler::new().compile(&def, &mut first);
        Compiler::new().compile(&def, &mut second);
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn lexer_and_parser_errors_interleave_by_position() {
        let mut errors = ErrorBuffer::new();
        Compiler::new().compile(&TemplateDefinition::new("t", "<a!> <*>"), &mut errors);
        assert_eq!(
            errors.messages(),
            vec![
                "1:2: '!' came as a complete surprise to me",
                "1:6: invalid character: *"
            ]
        );
    }

    #[test]
    fn formal_args_are_kept() {
        let def = TemplateDefinition::new("t", "<a>").formal_args(vec!["a".into()]);
        let t = Compiler::new().compile_standalone(&def).expect("compile");
        assert_eq!(t.formal_args, vec!["a"]);
    }
}
