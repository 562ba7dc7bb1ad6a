//! Recursive-descent parser over template tokens.
//!
//! Each failure is reported once, as a [`RecognitionError`], and the
//! parser then skips to the end of the enclosing region so a malformed
//! region yields one error instead of a cascade. Errors at `Invalid`
//! tokens are not reported again (the lexer already did), and neither is
//! end of input when the lexer flagged it as premature. Invalid
//! characters skipped during that recovery are dropped from the lexer's
//! errors too.
//!
//! Nesting deeper than [`MAX_NESTING`] ends the parse with one error.

use crate::ast::{
    Args, Branch, Condition, Element, Expr, ExprTag, IfBlock, NamedArg, Subtemplate, TagOption,
};
use crate::diagnostic::{ErrorKind, RecognitionError, Stage};
use crate::lexer::Lexed;
use crate::token::{Span, Token, TokenKind};

/// Result of parsing one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub elements: Vec<Element>,
    pub errors: Vec<RecognitionError>,
    /// Offsets of invalid characters skipped while recovering from an
    /// earlier error in the same region.
    pub superseded: Vec<usize>,
}

impl Parsed {
    /// Lexer errors plus parser errors in source order, without the
    /// invalid characters the parser skipped during recovery.
    #[must_use]
    pub fn merge_errors(&self, lexer_errors: Vec<RecognitionError>) -> Vec<RecognitionError> {
        let mut errors: Vec<RecognitionError> = lexer_errors
            .into_iter()
            .filter(|e| {
                e.kind != ErrorKind::InvalidCharacter
                    || !self.superseded.contains(&e.span.start.offset)
            })
            .collect();
        errors.extend(self.errors.iter().cloned());
        errors.sort_by_key(|e| e.span.start.offset);
        errors
    }
}

/// Parse lexed template text. `text` is the raw template source, used in
/// the message for a template that is nothing but an empty region.
#[must_use]
pub fn parse(lexed: &Lexed, text: &str) -> Parsed {
    let mut parser = Parser::new(&lexed.tokens, text, lexed.premature_eof);
    let elements = parser.parse_template();
    Parsed {
        elements,
        errors: parser.errors,
        superseded: parser.superseded,
    }
}

/// An error has been recorded; unwind to the nearest recovery point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reported;

type PResult<T> = Result<T, Reported>;

/// Which closing tokens end the element list being parsed.
#[derive(Debug, Clone, Copy, Default)]
struct Scope {
    subtemplate: bool,
    conditional: bool,
}

const IF_KEYWORDS: [&str; 3] = ["elseif", "else", "endif"];

/// Deepest nesting of regions, parentheses, lists, and `!` accepted.
pub const MAX_NESTING: usize = 100;

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    text: &'a str,
    eof: Token,
    eof_reported: bool,
    depth: usize,
    errors: Vec<RecognitionError>,
    superseded: Vec<usize>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], text: &'a str, eof_reported: bool) -> Self {
        let eof = Token {
            kind: TokenKind::Eof,
            text: String::new(),
            span: tokens.last().map(|t| t.span.clone()).unwrap_or_default(),
        };
        Self {
            tokens,
            pos: 0,
            text,
            eof,
            eof_reported,
            depth: 0,
            errors: Vec::new(),
            superseded: Vec::new(),
        }
    }

    fn parse_template(&mut self) -> Vec<Element> {
        let mut elements = self.parse_elements(Scope::default());
        // Only reachable if a stray closing token survived recovery.
        while !self.at(TokenKind::Eof) {
            let span = self.current().span.clone();
            self.unexpected();
            self.bump();
            elements.push(Element::Error { span });
            elements.extend(self.parse_elements(Scope::default()));
        }
        elements
    }

    // -- token access --

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn nth(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map_or_else(|| self.current().span.clone(), |t| t.span.clone())
    }

    fn span_from(&self, start: &Span) -> Span {
        start.to(&self.prev_span())
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.mismatched(kind))
        }
    }

    // -- error reporting --

    /// Record `err` unless the offending token was already reported by
    /// the lexer.
    fn report(&mut self, err: RecognitionError) -> Reported {
        match self.current().kind {
            TokenKind::Invalid => {}
            TokenKind::Eof => {
                if !self.eof_reported {
                    self.eof_reported = true;
                    let span = self.current().span.clone();
                    self.errors
                        .push(RecognitionError::premature_eof(Stage::Parser, span));
                }
            }
            _ => self.errors.push(err),
        }
        Reported
    }

    fn mismatched(&mut self, expected: impl std::fmt::Display) -> Reported {
        let token = self.current();
        let err = RecognitionError::mismatched(
            Stage::Parser,
            token.display_text(),
            expected,
            token.span.clone(),
        );
        self.report(err)
    }

    fn unexpected(&mut self) -> Reported {
        let token = self.current();
        let err =
            RecognitionError::unexpected(Stage::Parser, token.display_text(), token.span.clone());
        self.report(err)
    }

    /// Skip to just past the `RDelim` that closes the current region.
    fn recover_region(&mut self) {
        let first = self.pos;
        let mut depth = 0usize;
        loop {
            let (kind, offset) = {
                let token = self.current();
                (token.kind, token.span.start.offset)
            };
            match kind {
                TokenKind::Eof => return,
                TokenKind::Invalid if self.pos > first => self.superseded.push(offset),
                TokenKind::LDelim | TokenKind::LCurly => depth += 1,
                TokenKind::RCurly => depth = depth.saturating_sub(1),
                TokenKind::RDelim => {
                    if depth == 0 {
                        self.bump();
                        return;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            self.bump();
        }
    }

    /// Run `rule` one nesting level deeper.
    fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    /// Report the current token as nested too deeply and abandon the rest
    /// of the template.
    fn too_deep(&mut self) -> Reported {
        let token = self.current();
        let err = RecognitionError::new(
            Stage::Parser,
            ErrorKind::UnexpectedToken,
            token.display_text(),
            token.span.clone(),
            "expression nested too deeply",
        );
        self.report(err);
        let rest = self.pos + 1;
        if let Some(tokens) = self.tokens.get(rest..) {
            self.superseded.extend(
                tokens
                    .iter()
                    .filter(|t| t.kind == TokenKind::Invalid)
                    .map(|t| t.span.start.offset),
            );
        }
        self.pos = self.tokens.len();
        self.eof_reported = true;
        Reported
    }

    // -- elements --

    fn parse_elements(&mut self, scope: Scope) -> Vec<Element> {
        let mut elements = Vec::new();
        loop {
            let token = self.current();
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::RCurly if scope.subtemplate => break,
                TokenKind::Text => {
                    let token = self.bump();
                    elements.push(Element::Text {
                        text: token.text,
                        span: token.span,
                    });
                }
                TokenKind::Newline => {
                    let token = self.bump();
                    elements.push(Element::Newline { span: token.span });
                }
                TokenKind::LDelim => {
                    if scope.conditional && self.at_if_keyword() {
                        break;
                    }
                    elements.push(self.parse_region(scope));
                }
                _ => {
                    let span = token.span.clone();
                    self.unexpected();
                    self.bump();
                    elements.push(Element::Error { span });
                }
            }
        }
        elements
    }

    /// `<elseif`, `<else`, or `<endif` ahead.
    fn at_if_keyword(&self) -> bool {
        let next = self.nth(1);
        next.kind == TokenKind::Id && IF_KEYWORDS.contains(&next.text.as_str())
    }

    fn parse_region(&mut self, scope: Scope) -> Element {
        let start_index = self.pos;
        let ldelim = self.bump();
        if self.depth >= MAX_NESTING {
            self.too_deep();
            return Element::Error {
                span: self.span_from(&ldelim.span),
            };
        }
        self.depth += 1;
        let element = self.region_body(start_index, &ldelim, scope);
        self.depth -= 1;
        element
    }

    fn region_body(&mut self, start_index: usize, ldelim: &Token, scope: Scope) -> Element {
        let first = self.current();
        if first.is_keyword("if") {
            return Element::If(self.parse_if(ldelim, scope));
        }
        if first.kind == TokenKind::Id && IF_KEYWORDS.contains(&first.text.as_str()) {
            self.unexpected();
            self.recover_region();
            return Element::Error {
                span: self.span_from(&ldelim.span),
            };
        }
        if !can_start_expr(first.kind) {
            self.reject_region_start(start_index, ldelim);
            self.recover_region();
            return Element::Error {
                span: self.span_from(&ldelim.span),
            };
        }

        match self.parse_tag(ldelim) {
            Ok(tag) => Element::Expr(tag),
            Err(Reported) => {
                self.recover_region();
                Element::Error {
                    span: self.span_from(&ldelim.span),
                }
            }
        }
    }

    /// The token after `ldelim` cannot begin an expression.
    fn reject_region_start(&mut self, start_index: usize, ldelim: &Token) {
        match self.current().kind {
            TokenKind::Invalid | TokenKind::Eof => {
                self.report(RecognitionError::premature_eof(
                    Stage::Parser,
                    self.current().span.clone(),
                ));
            }
            TokenKind::RDelim if self.only_whitespace_before(start_index) => {
                let anchor = self.tokens.first().unwrap_or(ldelim);
                self.errors.push(RecognitionError::new(
                    Stage::Parser,
                    ErrorKind::EmptyOrUnparseableExpr,
                    anchor.text.clone(),
                    anchor.span.clone(),
                    format!("this doesn't look like a template: \"{}\"", self.text),
                ));
            }
            _ => {
                self.errors.push(RecognitionError::new(
                    Stage::Parser,
                    ErrorKind::InvalidExprStart,
                    ldelim.text.clone(),
                    ldelim.span.clone(),
                    "doesn't look like an expression",
                ));
            }
        }
    }

    fn only_whitespace_before(&self, index: usize) -> bool {
        self.tokens[..index].iter().all(|t| match t.kind {
            TokenKind::Text => t.text.trim().is_empty(),
            TokenKind::Newline => true,
            _ => false,
        })
    }

    fn parse_tag(&mut self, ldelim: &Token) -> PResult<ExprTag> {
        let expr = self.parse_expr()?;
        let mut options = Vec::new();
        if self.at(TokenKind::Semi) {
            self.bump();
            loop {
                options.push(self.parse_option()?);
                if self.at(TokenKind::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        if !self.at(TokenKind::RDelim) {
            return Err(self.unexpected());
        }
        self.bump();
        Ok(ExprTag {
            expr,
            options,
            span: self.span_from(&ldelim.span),
        })
    }

    fn parse_option(&mut self) -> PResult<TagOption> {
        let name = self.expect(TokenKind::Id)?;
        let value = if self.at(TokenKind::Equals) {
            self.bump();
            Some(self.parse_expr_no_comma()?)
        } else {
            None
        };
        Ok(TagOption {
            name: name.text,
            value,
            span: self.span_from(&name.span),
        })
    }

    // -- conditionals --

    fn parse_if(&mut self, ldelim: &Token, outer: Scope) -> IfBlock {
        self.bump(); // if
        let scope = Scope {
            subtemplate: outer.subtemplate,
            conditional: true,
        };
        let mut branches = Vec::new();
        let mut condition = self.parse_if_header();
        let mut else_body = None;

        loop {
            let body = self.parse_elements(scope);
            branches.push(Branch { condition, body });

            if !self.at(TokenKind::LDelim) {
                self.missing_endif();
                break;
            }
            self.bump(); // ldelim
            let keyword = self.bump();
            match keyword.text.as_str() {
                "elseif" => {
                    condition = self.parse_if_header();
                }
                "else" => {
                    self.close_keyword_tag();
                    else_body = Some(self.parse_else_body(scope));
                    break;
                }
                _ => {
                    self.close_keyword_tag();
                    break;
                }
            }
        }

        IfBlock {
            branches,
            else_body,
            span: self.span_from(&ldelim.span),
        }
    }

    /// Body after `<else>`, up to and including `<endif>`.
    fn parse_else_body(&mut self, scope: Scope) -> Vec<Element> {
        let mut body = self.parse_elements(scope);
        loop {
            if !self.at(TokenKind::LDelim) {
                self.missing_endif();
                return body;
            }
            if self.nth(1).is_keyword("endif") {
                self.bump();
                self.bump();
                self.close_keyword_tag();
                return body;
            }
            // `<else>` or `<elseif>` after `<else>`
            let span = self.current().span.clone();
            self.bump();
            self.unexpected();
            self.recover_region();
            body.push(Element::Error {
                span: self.span_from(&span),
            });
            body.extend(self.parse_elements(scope));
        }
    }

    /// `(cond)>` after `if` or `elseif`.
    fn parse_if_header(&mut self) -> Condition {
        let start = self.current().span.clone();
        match self.if_header() {
            Ok(condition) => condition,
            Err(Reported) => {
                self.recover_region();
                Condition::Expr(Expr::Error {
                    span: self.span_from(&start),
                })
            }
        }
    }

    fn if_header(&mut self) -> PResult<Condition> {
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_condition()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::RDelim)?;
        Ok(condition)
    }

    /// `>` closing `<else>` or `<endif>`.
    fn close_keyword_tag(&mut self) {
        if self.expect(TokenKind::RDelim).is_err() {
            self.recover_region();
        }
    }

    fn missing_endif(&mut self) {
        if self.at(TokenKind::Eof) {
            self.report(RecognitionError::premature_eof(
                Stage::Parser,
                self.current().span.clone(),
            ));
        } else {
            self.mismatched("'endif'");
        }
    }

    fn parse_condition(&mut self) -> PResult<Condition> {
        let mut left = self.parse_and()?;
        while self.at(TokenKind::Or) {
            self.bump();
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> PResult<Condition> {
        let mut left = self.parse_not()?;
        while self.at(TokenKind::And) {
            self.bump();
            let right = self.parse_not()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> PResult<Condition> {
        self.nested(Self::not_condition)
    }

    fn not_condition(&mut self) -> PResult<Condition> {
        match self.current().kind {
            TokenKind::Bang => {
                let bang = self.bump();
                let inner = self.parse_not()?;
                Ok(Condition::Not(Box::new(inner), self.span_from(&bang.span)))
            }
            TokenKind::LParen => {
                let open = self.bump();
                let inner = self.parse_condition()?;
                self.expect(TokenKind::RParen)?;
                match inner {
                    // `(x).y` or `(name)(args)`: the parens wrapped an expression
                    Condition::Expr(expr)
                        if self.at(TokenKind::Dot) || self.at(TokenKind::LParen) =>
                    {
                        let primary = if self.at(TokenKind::LParen) {
                            self.bump();
                            let args = self.parse_call_args()?;
                            Expr::IndirectRef {
                                name: Box::new(expr),
                                args,
                                span: self.span_from(&open.span),
                            }
                        } else {
                            Expr::Paren {
                                expr: Box::new(expr),
                                span: self.span_from(&open.span),
                            }
                        };
                        Ok(Condition::Expr(self.parse_member_tail(primary)?))
                    }
                    inner => Ok(inner),
                }
            }
            _ => Ok(Condition::Expr(self.parse_member()?)),
        }
    }

    // -- expressions --

    /// Tag-level expression; allows `a,b:{x,y|..}` and `a:t1(),t2()`.
    fn parse_expr(&mut self) -> PResult<Expr> {
        let first = self.parse_member()?;
        let expr = if self.at(TokenKind::Comma) {
            let start = first.span().clone();
            let mut targets = vec![first];
            while self.at(TokenKind::Comma) {
                self.bump();
                targets.push(self.parse_member()?);
            }
            self.expect(TokenKind::Colon)?;
            let template = self.parse_template_ref()?;
            Expr::ZipApply {
                targets,
                template: Box::new(template),
                span: self.span_from(&start),
            }
        } else {
            first
        };
        self.parse_map_tail(expr, true)
    }

    /// Expression inside arguments, lists, and option values.
    fn parse_expr_no_comma(&mut self) -> PResult<Expr> {
        let member = self.parse_member()?;
        self.parse_map_tail(member, false)
    }

    fn parse_map_tail(&mut self, mut expr: Expr, template_lists: bool) -> PResult<Expr> {
        while self.at(TokenKind::Colon) {
            self.bump();
            let mut templates = vec![self.parse_template_ref()?];
            while template_lists && self.at(TokenKind::Comma) {
                self.bump();
                templates.push(self.parse_template_ref()?);
            }
            let span = self.span_from(expr.span());
            expr = Expr::SubtemplateApply {
                target: Box::new(expr),
                templates,
                span,
            };
        }
        Ok(expr)
    }

    fn parse_template_ref(&mut self) -> PResult<Expr> {
        let start = self.current().span.clone();
        match self.current().kind {
            TokenKind::Id => {
                let name = self.bump();
                self.expect(TokenKind::LParen)?;
                let args = self.parse_call_args()?;
                Ok(Expr::FunctionCall {
                    name: name.text,
                    args,
                    span: self.span_from(&start),
                })
            }
            TokenKind::LCurly => Ok(Expr::Subtemplate(self.parse_subtemplate()?)),
            TokenKind::LParen => {
                self.bump();
                let name = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::LParen)?;
                let args = self.parse_call_args()?;
                Ok(Expr::IndirectRef {
                    name: Box::new(name),
                    args,
                    span: self.span_from(&start),
                })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_member(&mut self) -> PResult<Expr> {
        let primary = self.parse_primary()?;
        self.parse_member_tail(primary)
    }

    /// `.prop` and `.(expr)` suffixes.
    fn parse_member_tail(&mut self, mut expr: Expr) -> PResult<Expr> {
        while self.at(TokenKind::Dot) {
            self.bump();
            if self.at(TokenKind::Id) {
                let property = self.bump();
                let span = self.span_from(expr.span());
                expr = Expr::PropertyAccess {
                    target: Box::new(expr),
                    property: property.text,
                    span,
                };
            } else if self.at(TokenKind::LParen) {
                self.bump();
                let property = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let span = self.span_from(expr.span());
                expr = Expr::IndirectProperty {
                    target: Box::new(expr),
                    property: Box::new(property),
                    span,
                };
            } else {
                return Err(self.mismatched(TokenKind::Id));
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        self.nested(Self::primary)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let start = self.current().span.clone();
        match self.current().kind {
            TokenKind::Id if self.nth(1).kind == TokenKind::LParen => {
                let name = self.bump();
                self.bump();
                let args = self.parse_call_args()?;
                Ok(Expr::FunctionCall {
                    name: name.text,
                    args,
                    span: self.span_from(&start),
                })
            }
            TokenKind::Id => {
                let name = self.bump();
                Ok(Expr::AttributeRef {
                    name: name.text,
                    span: name.span,
                })
            }
            TokenKind::String => {
                let s = self.bump();
                Ok(Expr::StringLiteral {
                    value: s.text,
                    span: s.span,
                })
            }
            TokenKind::LCurly => Ok(Expr::Subtemplate(self.parse_subtemplate()?)),
            TokenKind::LBrack => self.parse_list(),
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                if self.at(TokenKind::LParen) {
                    self.bump();
                    let args = self.parse_call_args()?;
                    Ok(Expr::IndirectRef {
                        name: Box::new(inner),
                        args,
                        span: self.span_from(&start),
                    })
                } else {
                    Ok(Expr::Paren {
                        expr: Box::new(inner),
                        span: self.span_from(&start),
                    })
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Arguments after `(`, through the closing `)`.
    fn parse_call_args(&mut self) -> PResult<Args> {
        let args = if self.at(TokenKind::Id) && self.nth(1).kind == TokenKind::Equals {
            let mut named = Vec::new();
            loop {
                let name = self.expect(TokenKind::Id)?;
                self.expect(TokenKind::Equals)?;
                let value = self.parse_expr_no_comma()?;
                named.push(NamedArg {
                    name: name.text,
                    value,
                });
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.bump();
            }
            Args::Named(named)
        } else if can_start_expr(self.current().kind) {
            let mut positional = vec![self.parse_expr_no_comma()?];
            while self.at(TokenKind::Comma) {
                self.bump();
                positional.push(self.parse_expr_no_comma()?);
            }
            Args::Positional(positional)
        } else {
            Args::none()
        };
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_list(&mut self) -> PResult<Expr> {
        let open = self.bump();
        let mut items = Vec::new();
        if !self.at(TokenKind::RBrack) {
            loop {
                if self.at(TokenKind::Comma) || self.at(TokenKind::RBrack) {
                    items.push(None);
                } else {
                    items.push(Some(self.parse_expr_no_comma()?));
                }
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.bump();
            }
        }
        self.expect(TokenKind::RBrack)?;
        Ok(Expr::ListLiteral {
            items,
            span: self.span_from(&open.span),
        })
    }

    fn parse_subtemplate(&mut self) -> PResult<Subtemplate> {
        let open = self.bump();
        let mut formal_args = Vec::new();
        while self.at(TokenKind::Id) {
            formal_args.push(self.bump().text);
            if self.at(TokenKind::Comma) {
                self.bump();
            }
        }
        if self.at(TokenKind::Pipe) {
            self.bump();
        }
        let elements = self.parse_elements(Scope {
            subtemplate: true,
            conditional: false,
        });
        self.expect(TokenKind::RCurly)?;
        Ok(Subtemplate {
            formal_args,
            elements,
            span: self.span_from(&open.span),
        })
    }
}

const fn can_start_expr(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Id
            | TokenKind::String
            | TokenKind::LCurly
            | TokenKind::LBrack
            | TokenKind::LParen
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_input(input: &str) -> Parsed {
        parse(&tokenize(input), input)
    }

    fn messages(input: &str) -> Vec<String> {
        let lexed = tokenize(input);
        let parsed = parse(&lexed, input);
        parsed
            .merge_errors(lexed.errors)
            .iter()
            .map(|e| e.to_diagnostic().to_string())
            .collect()
    }

    fn only_expr(input: &str) -> Expr {
        let parsed = parse_input(input);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        match parsed.elements.into_iter().next() {
            Some(Element::Expr(tag)) => tag.expr,
            other => panic!("expected expression tag, got {other:?}"),
        }
    }

    #[test]
    fn attribute_and_property_chain() {
        let expr = only_expr("<user.name.first>");
        let Expr::PropertyAccess {
            target, property, ..
        } = expr
        else {
            panic!("expected property access");
        };
        assert_eq!(property, "first");
        assert!(matches!(*target, Expr::PropertyAccess { ref property, .. } if property == "name"));
    }

    #[test]
    fn function_call_with_args() {
        let expr = only_expr("<bold(name, \"x\")>");
        let Expr::FunctionCall { name, args, .. } = expr else {
            panic!("expected call");
        };
        assert_eq!(name, "bold");
        assert!(matches!(args, Args::Positional(ref v) if v.len() == 2));
    }

    #[test]
    fn named_args() {
        let expr = only_expr("<page(title=t, body=b)>");
        let Expr::FunctionCall { args, .. } = expr else {
            panic!("expected call");
        };
        let Args::Named(named) = args else {
            panic!("expected named args");
        };
        assert_eq!(named[0].name, "title");
        assert_eq!(named[1].name, "body");
    }

    #[test]
    fn subtemplate_apply_with_args() {
        let expr = only_expr("<names:{n | <n>}>");
        let Expr::SubtemplateApply { templates, .. } = expr else {
            panic!("expected apply");
        };
        let Expr::Subtemplate(sub) = &templates[0] else {
            panic!("expected subtemplate");
        };
        assert_eq!(sub.formal_args, vec!["n"]);
        assert_eq!(sub.elements.len(), 1);
    }

    #[test]
    fn round_robin_templates() {
        let expr = only_expr("<rows:odd(),even()>");
        let Expr::SubtemplateApply { templates, .. } = expr else {
            panic!("expected apply");
        };
        assert_eq!(templates.len(), 2);
    }

    #[test]
    fn zip_apply() {
        let expr = only_expr("<names,phones:{n,p | <n>: <p>}>");
        assert!(matches!(expr, Expr::ZipApply { ref targets, .. } if targets.len() == 2));
    }

    #[test]
    fn list_with_empty_slots() {
        let expr = only_expr("<[a,,\"b\"]>");
        let Expr::ListLiteral { items, .. } = expr else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 3);
        assert!(items[1].is_none());
    }

    #[test]
    fn indirect_include_and_property() {
        assert!(matches!(only_expr("<(name)(x)>"), Expr::IndirectRef { .. }));
        assert!(matches!(
            only_expr("<user.(field)>"),
            Expr::IndirectProperty { .. }
        ));
    }

    #[test]
    fn options() {
        let parsed = parse_input("<names; separator=\", \", wrap>");
        assert!(parsed.errors.is_empty());
        let Some(Element::Expr(tag)) = parsed.elements.first() else {
            panic!("expected tag");
        };
        assert_eq!(tag.options.len(), 2);
        assert_eq!(tag.options[0].name, "separator");
        assert!(tag.options[1].value.is_none());
    }

    #[test]
    fn conditional_chain() {
        let parsed = parse_input("<if(a&&!b)>x<elseif(c||d)>y<else>z<endif>");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let Some(Element::If(block)) = parsed.elements.first() else {
            panic!("expected if");
        };
        assert_eq!(block.branches.len(), 2);
        assert!(matches!(block.branches[0].condition, Condition::And(..)));
        assert!(block.else_body.is_some());
    }

    #[test]
    fn parenthesized_member_in_condition() {
        let parsed = parse_input("<if((x).y)>a<endif><if((t)())>b<endif>");
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let Some(Element::If(block)) = parsed.elements.first() else {
            panic!("expected if");
        };
        assert!(matches!(
            block.branches[0].condition,
            Condition::Expr(Expr::PropertyAccess { .. })
        ));
    }

    #[test]
    fn nested_template_text() {
        let parsed = parse_input("hi <name:{[<aaa.bb>]}> mom");
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.elements.len(), 3);
    }

    #[test]
    fn empty_region_as_whole_template() {
        assert_eq!(
            messages(" <> "),
            vec!["1:0: this doesn't look like a template: \" <> \""]
        );
        assert_eq!(
            messages("<>"),
            vec!["1:0: this doesn't look like a template: \"<>\""]
        );
    }

    #[test]
    fn empty_region_after_text() {
        assert_eq!(messages("hi <> "), vec!["1:3: doesn't look like an expression"]);
    }

    #[test]
    fn out_of_place_dot() {
        assert_eq!(
            messages("hi <.> mom"),
            vec!["1:3: doesn't look like an expression"]
        );
    }

    #[test]
    fn weird_char_reported_once() {
        assert_eq!(messages("   <*>"), vec!["1:4: invalid character: *"]);
    }

    #[test]
    fn complete_surprise() {
        assert_eq!(
            messages("hi <name:{[<aaa.bb!>]}> mom"),
            vec!["1:18: '!' came as a complete surprise to me"]
        );
    }

    #[test]
    fn missing_rparen() {
        assert_eq!(
            messages("hi <foo(>"),
            vec!["1:8: mismatched input '>' expecting RPAREN"]
        );
    }

    #[test]
    fn premature_eof_reported_once() {
        assert_eq!(messages("hi <name:{[<aaa.bb>]}"), vec!["1:21: premature EOF"]);
    }

    #[test]
    fn missing_endif() {
        assert_eq!(messages("<if(a)>x"), vec!["1:8: premature EOF"]);
    }

    #[test]
    fn stray_endif() {
        assert_eq!(
            messages("a<endif>b"),
            vec!["1:2: 'endif' came as a complete surprise to me"]
        );
    }

    #[test]
    fn bad_if_header_does_not_cascade() {
        assert_eq!(
            messages("<if(a!)>x<endif>"),
            vec!["1:5: mismatched input '!' expecting RPAREN"]
        );
    }

    #[test]
    fn invalid_characters_skipped_in_recovery_are_superseded() {
        let parsed = parse_input("<a b * #> <*>");
        assert_eq!(parsed.superseded, vec![5, 7]);
        assert_eq!(
            messages("<a b * #> <*>"),
            vec![
                "1:3: 'b' came as a complete surprise to me",
                "1:11: invalid character: *",
            ]
        );
    }

    #[test]
    fn nesting_limit_abandons_template() {
        let input = format!("<{}a{}> <*>", "[".repeat(200), "]".repeat(200));
        let parsed = parse_input(&input);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].message, "expression nested too deeply");
        assert_eq!(parsed.superseded, vec![405]);
        assert_eq!(messages(&input), vec!["1:100: expression nested too deeply"]);
    }

    #[test]
    fn recovery_continues_with_next_region() {
        assert_eq!(
            messages("<a b> <c.> <ok>"),
            vec![
                "1:3: 'b' came as a complete surprise to me",
                "1:9: mismatched input '>' expecting ID",
            ]
        );
        let parsed = parse_input("<a b> <ok>");
        assert!(matches!(parsed.elements[0], Element::Error { .. }));
        assert!(matches!(parsed.elements[2], Element::Expr(_)));
    }
}
