use crate::token::Span;

/// A template after lexing and parsing.
///
/// When compilation produced diagnostics this is a best-effort partial
/// result: regions that failed to parse appear as [`Element::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    pub name: String,
    pub source_name: Option<String>,
    pub formal_args: Vec<String>,
    pub elements: Vec<Element>,
    pub span: Span,
}

impl CompiledTemplate {
    /// True if any region failed to parse.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.elements.iter().any(Element::has_errors)
    }
}

/// One piece of template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Literal text.
    Text { text: String, span: Span },
    /// Line break in the template source.
    Newline { span: Span },
    /// `<expr; options>`.
    Expr(ExprTag),
    /// `<if(..)> .. <elseif(..)> .. <else> .. <endif>`.
    If(IfBlock),
    /// Region that failed to parse.
    Error { span: Span },
}

impl Element {
    #[must_use]
    pub fn span(&self) -> &Span {
        match self {
            Self::Text { span, .. } | Self::Newline { span } | Self::Error { span } => span,
            Self::Expr(tag) => &tag.span,
            Self::If(block) => &block.span,
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        match self {
            Self::Text { .. } | Self::Newline { .. } => false,
            Self::Error { .. } => true,
            Self::Expr(tag) => {
                tag.expr.has_errors()
                    || tag
                        .options
                        .iter()
                        .any(|o| o.value.as_ref().is_some_and(Expr::has_errors))
            }
            Self::If(block) => {
                block.branches.iter().any(|b| {
                    b.condition.has_errors() || b.body.iter().any(Self::has_errors)
                }) || block
                    .else_body
                    .as_ref()
                    .is_some_and(|body| body.iter().any(Self::has_errors))
            }
        }
    }
}

/// Expression tag with its `; name=value` options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprTag {
    pub expr: Expr,
    pub options: Vec<TagOption>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOption {
    pub name: String,
    /// `None` for a bare option such as `<x; wrap>`.
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfBlock {
    /// The `if` branch followed by any `elseif` branches.
    pub branches: Vec<Branch>,
    pub else_body: Option<Vec<Element>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub condition: Condition,
    pub body: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Expr(Expr),
    Not(Box<Self>, Span),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
}

impl Condition {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        match self {
            Self::Expr(e) => e.has_errors(),
            Self::Not(c, _) => c.has_errors(),
            Self::And(a, b) | Self::Or(a, b) => a.has_errors() || b.has_errors(),
        }
    }
}

/// Inline `{args | body}` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtemplate {
    pub formal_args: Vec<String>,
    pub elements: Vec<Element>,
    pub span: Span,
}

/// Call arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Args {
    Positional(Vec<Expr>),
    Named(Vec<NamedArg>),
}

impl Args {
    #[must_use]
    pub const fn none() -> Self {
        Self::Positional(Vec::new())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Positional(v) => v.is_empty(),
            Self::Named(v) => v.is_empty(),
        }
    }

    fn has_errors(&self) -> bool {
        match self {
            Self::Positional(v) => v.iter().any(Expr::has_errors),
            Self::Named(v) => v.iter().any(|a| a.value.has_errors()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedArg {
    pub name: String,
    pub value: Expr,
}

/// Expression tree. Every node carries the span it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `name`
    AttributeRef { name: String, span: Span },
    /// `target.property`
    PropertyAccess {
        target: Box<Self>,
        property: String,
        span: Span,
    },
    /// `target.(expr)`
    IndirectProperty {
        target: Box<Self>,
        property: Box<Self>,
        span: Span,
    },
    /// `name(args)`: template include or built-in function.
    FunctionCall { name: String, args: Args, span: Span },
    /// `(expr)(args)`: include of a template whose name is computed.
    IndirectRef {
        name: Box<Self>,
        args: Args,
        span: Span,
    },
    /// `(expr)` without arguments.
    Paren { expr: Box<Self>, span: Span },
    /// `target:t1(),t2()`: apply templates round-robin to each element.
    SubtemplateApply {
        target: Box<Self>,
        templates: Vec<Self>,
        span: Span,
    },
    /// `a,b:{x,y | ...}`: apply one template to several lists in parallel.
    ZipApply {
        targets: Vec<Self>,
        template: Box<Self>,
        span: Span,
    },
    /// `{args | body}`
    Subtemplate(Subtemplate),
    /// `[a, b, c]`; `None` marks an empty slot (`[a,,b]`).
    ListLiteral { items: Vec<Option<Self>>, span: Span },
    /// `"text"`
    StringLiteral { value: String, span: Span },
    /// Placeholder for a sub-expression that failed to parse.
    Error { span: Span },
}

impl Expr {
    #[must_use]
    pub const fn span(&self) -> &Span {
        match self {
            Self::AttributeRef { span, .. }
            | Self::PropertyAccess { span, .. }
            | Self::IndirectProperty { span, .. }
            | Self::FunctionCall { span, .. }
            | Self::IndirectRef { span, .. }
            | Self::Paren { span, .. }
            | Self::SubtemplateApply { span, .. }
            | Self::ZipApply { span, .. }
            | Self::ListLiteral { span, .. }
            | Self::StringLiteral { span, .. }
            | Self::Error { span } => span,
            Self::Subtemplate(s) => &s.span,
        }
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        match self {
            Self::AttributeRef { .. } | Self::StringLiteral { .. } => false,
            Self::Error { .. } => true,
            Self::PropertyAccess { target, .. } | Self::Paren { expr: target, .. } => {
                target.has_errors()
            }
            Self::IndirectProperty {
                target, property, ..
            } => target.has_errors() || property.has_errors(),
            Self::FunctionCall { args, .. } => args.has_errors(),
            Self::IndirectRef { name, args, .. } => name.has_errors() || args.has_errors(),
            Self::SubtemplateApply {
                target, templates, ..
            } => target.has_errors() || templates.iter().any(Self::has_errors),
            Self::ZipApply {
                targets, template, ..
            } => targets.iter().any(Self::has_errors) || template.has_errors(),
            Self::Subtemplate(s) => s.elements.iter().any(Element::has_errors),
            Self::ListLiteral { items, .. } => items.iter().flatten().any(Self::has_errors),
        }
    }
}
