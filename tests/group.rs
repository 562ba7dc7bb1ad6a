//! Group loading: definitions, declarations, and listener routing.

mod common;

use common::group_messages;
use stg_syntax::{
    Compiler, Diagnostic, Element, ErrorBuffer, ErrorKind, Group, TemplateDefinition, load_group,
};

#[test]
fn group_formal_args_and_comments() {
    let mut errors = ErrorBuffer::new();
    let group = load_group(
        "/* page templates */\npage(title, body) ::= <<\n<title>\n<body>\n>>\n// end\n",
        Some("t.stg"),
        &mut errors,
    );
    assert!(errors.is_empty(), "{errors}");
    let page = group.template("page").expect("page");
    assert_eq!(page.formal_args, vec!["title", "body"]);
    assert_eq!(page.source_name.as_deref(), Some("t.stg"));
}

#[test]
fn group_byte_order_mark_is_ignored() {
    let messages = group_messages("\u{FEFF}a() ::= \"<*>\"\n");
    assert_eq!(messages, vec!["t.stg 1:10: invalid character: *"]);
}

#[test]
fn group_delimiters_apply_to_following_templates() {
    let mut errors = ErrorBuffer::new();
    let group = load_group(
        "delimiters \"$\", \"$\"\nmail(to) ::= \"Dear $to$, <b>hi</b>\"\n",
        None,
        &mut errors,
    );
    assert!(errors.is_empty(), "{errors}");
    let mail = group.template("mail").expect("mail");
    assert!(matches!(mail.elements[1], Element::Expr(_)));
    assert!(matches!(&mail.elements[2], Element::Text { text, .. } if text == ", <b>hi</b>"));
}

#[test]
fn group_bad_delimiters_declaration() {
    assert_eq!(
        group_messages("delimiters \"$$\", \"$\"\na() ::= \"x\"\n"),
        vec!["t.stg 1:11: '\"$$\"' came as a complete surprise to me"]
    );
}

#[test]
fn group_syntax_errors() {
    assert_eq!(
        group_messages("a() = \"x\"\n"),
        vec![
            "t.stg 1:4: invalid character: =",
            "t.stg 1:6: mismatched input '\"x\"' expecting '::='",
        ]
    );
    assert_eq!(
        group_messages("a() ::= b\n"),
        vec!["t.stg 1:8: mismatched input 'b' expecting STRING"]
    );
    assert_eq!(group_messages("a("), vec!["t.stg 1:2: premature EOF"]);
}

#[test]
fn group_unterminated_big_string() {
    assert_eq!(
        group_messages("a() ::= <<\nhello"),
        vec!["t.stg 2:5: premature EOF"]
    );
}

#[test]
fn group_errors_interleave_in_source_order() {
    let text = "a() ::= \"<x.>\"\nb() ::= \"two\nlines <*>\"\n";
    assert_eq!(
        group_messages(text),
        vec![
            "t.stg 1:12: mismatched input '>' expecting ID",
            "t.stg 2:12: \\n in string",
            "t.stg 3:7: invalid character: *",
        ]
    );
}

#[test]
fn group_listener_is_per_call() {
    let mut group = Group::new();
    let mut first: Vec<Diagnostic> = Vec::new();
    let mut second = ErrorBuffer::new();
    group.load_str("a() ::= \"<*>\"\n", None, &mut first);
    group.load_str("b() ::= \"<ok>\"\n", None, &mut second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].kind, ErrorKind::InvalidCharacter);
    assert!(second.is_empty());
    assert_eq!(group.len(), 2);
}

#[test]
fn group_buffers_merge_in_submission_order() {
    let sources = ["a() ::= \"<*>\"\n", "b() ::= \"<a b>\"\n"];
    let per_task: Vec<ErrorBuffer> = sources
        .iter()
        .map(|src| {
            let mut errors = ErrorBuffer::new();
            Group::new().load_str(src, Some("t.stg"), &mut errors);
            errors
        })
        .collect();

    let mut merged = ErrorBuffer::new();
    for buffer in per_task {
        merged.extend(buffer.into_diagnostics());
    }
    assert_eq!(
        merged.to_string(),
        "t.stg 1:10: invalid character: *\n\
         t.stg 1:12: 'b' came as a complete surprise to me\n"
    );
}

#[test]
fn group_with_custom_compiler() {
    let mut group = Group::with_compiler(Compiler::new().delimiters('$', '$'));
    let template = group.define_template("t", "$a$ <b>").expect("compile");
    assert_eq!(template.elements.len(), 2);
}

#[test]
fn compile_in_group_context_never_fails() {
    let mut errors = ErrorBuffer::new();
    let template = Compiler::new().compile(
        &TemplateDefinition::new("t", "<a:{").source_name("t.stg"),
        &mut errors,
    );
    assert_eq!(errors.messages(), vec!["t.stg 1:4: premature EOF"]);
    assert_eq!(template.name, "t");
}
