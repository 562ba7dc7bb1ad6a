//! Lexer, parser, and diagnostics for StringTemplate-style templates.
//!
//! Template text mixes literal text with `<...>` expression regions.
//! This crate turns that text into a typed [`CompiledTemplate`] and, when
//! the text is malformed, into precise source-located [`Diagnostic`]s of
//! the form `[source ]line:column: message`.
//!
//! # Quick start
//!
//! ## Compile a single template
//!
//! ```
//! use stg_syntax::compile_template;
//!
//! let template = compile_template("hi <name>!", "greet", None).unwrap();
//! assert_eq!(template.elements.len(), 3);
//!
//! let err = compile_template("hi <> ", "greet", None).unwrap_err();
//! assert_eq!(err.to_string(), "1:3: doesn't look like an expression");
//! ```
//!
//! ## Load a group and collect every diagnostic
//!
//! ```
//! use stg_syntax::{ErrorBuffer, Group};
//!
//! let mut errors = ErrorBuffer::new();
//! let mut group = Group::new();
//! group.load_str(
//!     "ok() ::= \"<x>\"\nfoo() ::= \"hi <foo(>\"\n",
//!     Some("t.stg"),
//!     &mut errors,
//! );
//! assert_eq!(group.len(), 2);
//! assert_eq!(
//!     errors.to_string(),
//!     "t.stg 2:19: mismatched input '>' expecting RPAREN\n"
//! );
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod compiler;
pub mod cursor;
pub mod diagnostic;
pub mod formatter;
pub mod group;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    Args, Branch, CompiledTemplate, Condition, Element, Expr, ExprTag, IfBlock, NamedArg,
    Subtemplate, TagOption,
};
pub use compiler::{CompileError, Compiler, TemplateDefinition};
pub use diagnostic::{Diagnostic, ErrorBuffer, ErrorKind, ErrorListener, RecognitionError, Stage};
pub use formatter::{format_group, format_template, format_with_delimiters};
pub use group::{Group, LoadError, load_group};
pub use lexer::{Delimiters, Lexed, tokenize};
pub use parser::{Parsed, parse};
pub use token::{Position, Span, Token, TokenKind};

/// Compile one template outside any group with default settings.
///
/// The first syntax error, if any, is returned as a [`CompileError`].
pub fn compile_template(
    text: &str,
    name: &str,
    source_name: Option<&str>,
) -> Result<CompiledTemplate, CompileError> {
    let mut def = TemplateDefinition::new(name, text);
    def.source_name = source_name.map(str::to_string);
    Compiler::new().compile_standalone(&def)
}
