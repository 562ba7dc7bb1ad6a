//! Pretty-printer that serializes compiled templates back into canonical
//! template source.
//!
//! Whitespace inside tags is normalized, string literals are re-escaped,
//! and text is escaped so that compiling the output yields the same
//! elements again.

use std::fmt::Write as _;

use crate::ast::{Args, CompiledTemplate, Condition, Element, Expr, IfBlock, Subtemplate};
use crate::group::Group;
use crate::lexer::Delimiters;

/// Format a compiled template with the default `<` `>` delimiters.
#[must_use]
pub fn format_template(template: &CompiledTemplate) -> String {
    format_with_delimiters(template, Delimiters::default())
}

/// Format a compiled template using `delimiters` for every tag.
#[must_use]
pub fn format_with_delimiters(template: &CompiledTemplate, delimiters: Delimiters) -> String {
    let mut f = Formatter {
        out: String::new(),
        delims: delimiters,
    };
    f.elements(&template.elements);
    f.out
}

/// Format every template in `group` as group-file definitions.
#[must_use]
pub fn format_group(group: &Group) -> String {
    let mut out = String::new();
    for (i, template) in group.templates().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "{}({}) ::= <<\n{}\n>>",
            template.name,
            template.formal_args.join(", "),
            format_template(template)
        );
    }
    out
}

struct Formatter {
    out: String,
    delims: Delimiters,
}

impl Formatter {
    fn open(&mut self) {
        self.out.push(self.delims.start);
    }

    fn close(&mut self) {
        self.out.push(self.delims.stop);
    }

    fn elements(&mut self, elements: &[Element]) {
        for element in elements {
            self.element(element);
        }
    }

    fn element(&mut self, element: &Element) {
        match element {
            Element::Text { text, .. } => self.text(text),
            Element::Newline { .. } => self.out.push('\n'),
            Element::Expr(tag) => {
                self.open();
                self.expr(&tag.expr);
                for (i, option) in tag.options.iter().enumerate() {
                    self.out.push_str(if i == 0 { "; " } else { ", " });
                    self.out.push_str(&option.name);
                    if let Some(value) = &option.value {
                        self.out.push('=');
                        self.expr(value);
                    }
                }
                self.close();
            }
            Element::If(block) => self.if_block(block),
            Element::Error { .. } => {}
        }
    }

    fn text(&mut self, text: &str) {
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            match ch {
                '\n' => {
                    self.open();
                    self.out.push_str("\\n");
                    self.close();
                }
                '\\' => match chars.peek() {
                    // No escape exists for a backslash before a tag.
                    None => {
                        self.open();
                        self.out.push_str("\\u005C");
                        self.close();
                    }
                    Some(&next) if next == self.delims.start || next == '}' => {
                        self.out.push('\\');
                    }
                    Some(&next) if next == self.delims.stop || next == '{' => {
                        self.out.push_str("\\\\");
                    }
                    Some(_) => self.out.push('\\'),
                },
                c if c == self.delims.start || c == '}' => {
                    self.out.push('\\');
                    self.out.push(c);
                }
                c => self.out.push(c),
            }
        }
    }

    fn if_block(&mut self, block: &IfBlock) {
        for (i, branch) in block.branches.iter().enumerate() {
            self.open();
            self.out.push_str(if i == 0 { "if(" } else { "elseif(" });
            self.condition(&branch.condition);
            self.out.push(')');
            self.close();
            self.elements(&branch.body);
        }
        if let Some(body) = &block.else_body {
            self.open();
            self.out.push_str("else");
            self.close();
            self.elements(body);
        }
        self.open();
        self.out.push_str("endif");
        self.close();
    }

    fn condition(&mut self, condition: &Condition) {
        match condition {
            Condition::Expr(e) => self.expr(e),
            Condition::Not(inner, _) => {
                self.out.push('!');
                self.grouped(inner, |c| !matches!(c, Condition::Expr(_) | Condition::Not(..)));
            }
            Condition::And(a, b) => {
                self.grouped(a, |c| matches!(c, Condition::Or(..)));
                self.out.push_str(" && ");
                self.grouped(b, |c| matches!(c, Condition::Or(..)));
            }
            Condition::Or(a, b) => {
                self.condition(a);
                self.out.push_str(" || ");
                self.condition(b);
            }
        }
    }

    fn grouped(&mut self, condition: &Condition, needs_parens: impl Fn(&Condition) -> bool) {
        if needs_parens(condition) {
            self.out.push('(');
            self.condition(condition);
            self.out.push(')');
        } else {
            self.condition(condition);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::AttributeRef { name, .. } => self.out.push_str(name),
            Expr::PropertyAccess {
                target, property, ..
            } => {
                self.expr(target);
                self.out.push('.');
                self.out.push_str(property);
            }
            Expr::IndirectProperty {
                target, property, ..
            } => {
                self.expr(target);
                self.out.push_str(".(");
                self.expr(property);
                self.out.push(')');
            }
            Expr::FunctionCall { name, args, .. } => {
                self.out.push_str(name);
                self.args(args);
            }
            Expr::IndirectRef { name, args, .. } => {
                self.out.push('(');
                self.expr(name);
                self.out.push(')');
                self.args(args);
            }
            Expr::Paren { expr, .. } => {
                self.out.push('(');
                self.expr(expr);
                self.out.push(')');
            }
            Expr::SubtemplateApply {
                target, templates, ..
            } => {
                self.expr(target);
                self.out.push(':');
                self.separated(templates);
            }
            Expr::ZipApply {
                targets, template, ..
            } => {
                self.separated(targets);
                self.out.push(':');
                self.expr(template);
            }
            Expr::Subtemplate(sub) => self.subtemplate(sub),
            Expr::ListLiteral { items, .. } => {
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    if let Some(item) = item {
                        self.expr(item);
                    }
                }
                self.out.push(']');
            }
            Expr::StringLiteral { value, .. } => self.string(value),
            Expr::Error { .. } => {}
        }
    }

    fn separated(&mut self, exprs: &[Expr]) {
        for (i, e) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.expr(e);
        }
    }

    fn args(&mut self, args: &Args) {
        self.out.push('(');
        match args {
            Args::Positional(values) => self.separated(values),
            Args::Named(named) => {
                for (i, arg) in named.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.out.push_str(&arg.name);
                    self.out.push('=');
                    self.expr(&arg.value);
                }
            }
        }
        self.out.push(')');
    }

    fn subtemplate(&mut self, sub: &Subtemplate) {
        self.out.push('{');
        if !sub.formal_args.is_empty() {
            self.out.push_str(&sub.formal_args.join(", "));
            self.out.push_str(" | ");
        }
        self.elements(&sub.elements);
        self.out.push('}');
    }

    fn string(&mut self, value: &str) {
        self.out.push('"');
        for ch in value.chars() {
            match ch {
                '"' => self.out.push_str("\\\""),
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\t' => self.out.push_str("\\t"),
                '\r' => self.out.push_str("\\r"),
                c => self.out.push(c),
            }
        }
        self.out.push('"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Compiler, TemplateDefinition};

    fn compile(text: &str) -> CompiledTemplate {
        Compiler::new()
            .compile_standalone(&TemplateDefinition::new("t", text))
            .expect("valid template")
    }

    fn fmt(text: &str) -> String {
        format_template(&compile(text))
    }

    #[test]
    fn normalizes_tag_whitespace() {
        assert_eq!(fmt("hi < name . first >!"), "hi <name.first>!");
        assert_eq!(
            fmt("<names : { n | <n> } ; separator = \", \">"),
            "<names:{n | <n> }; separator=\", \">"
        );
    }

    #[test]
    fn calls_lists_and_zips() {
        assert_eq!(fmt("<f( a , b )>"), "<f(a,b)>");
        assert_eq!(fmt("<f(x = a, y = b)>"), "<f(x=a,y=b)>");
        assert_eq!(fmt("<[a, , b]>"), "<[a,,b]>");
        assert_eq!(fmt("<a, b : {x, y | <x><y>}>"), "<a,b:{x, y | <x><y>}>");
        assert_eq!(fmt("<(name)(a)>"), "<(name)(a)>");
        assert_eq!(fmt("<x.(key)>"), "<x.(key)>");
        assert_eq!(fmt("<x:a(),b()>"), "<x:a(),b()>");
    }

    #[test]
    fn conditionals() {
        assert_eq!(
            fmt("<if(a&&!b)>x<elseif( c || d )>y<else>z<endif>"),
            "<if(a && !b)>x<elseif(c || d)>y<else>z<endif>"
        );
        assert_eq!(fmt("<if((a||b)&&c)>x<endif>"), "<if((a || b) && c)>x<endif>");
        assert_eq!(fmt("<if(!(a&&b))>x<endif>"), "<if(!(a && b))>x<endif>");
    }

    #[test]
    fn text_escapes() {
        assert_eq!(fmt(r"a\<b\}c"), r"a\<b\}c");
        assert_eq!(fmt(r"<\n>"), r"<\n>");
        assert_eq!(fmt("line1\nline2"), "line1\nline2");
    }

    #[test]
    fn strings_are_reescaped() {
        assert_eq!(fmt(r#"<f("a\"b\\c")>"#), r#"<f("a\"b\\c")>"#);
        assert_eq!(fmt("<f('x')>"), "<f(\"x\")>");
    }

    #[test]
    fn output_recompiles_to_same_text() {
        let source = "<if(x)>\\<<a.b:{v | [<v; null=\"-\">]}>\\\\>\n<endif><\\u005C><\\t>";
        let once = fmt(source);
        assert_eq!(fmt(&once), once);
    }

    #[test]
    fn alternate_delimiters() {
        let t = Compiler::new()
            .delimiters('$', '$')
            .compile_standalone(&TemplateDefinition::new("t", "<b> $name$"))
            .expect("valid");
        assert_eq!(format_with_delimiters(&t, Delimiters::new('$', '$')), "<b> $name$");
        assert_eq!(format_template(&t), r"\<b> <name>");
    }

    #[test]
    fn group_definitions() {
        let mut group = Group::new();
        group.define_template("a", "hi <x>").expect("valid");
        group.define_template("b", "bye").expect("valid");
        assert_eq!(
            format_group(&group),
            "a() ::= <<\nhi <x>\n>>\n\nb() ::= <<\nbye\n>>\n"
        );
    }
}
