#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use stg_syntax::{
    CompiledTemplate, Compiler, ErrorBuffer, Group, TemplateDefinition, format_template,
};

/// Compile `text` in group context and return the rendered diagnostics.
pub fn compile_messages(text: &str) -> Vec<String> {
    let mut errors = ErrorBuffer::new();
    Compiler::new().compile(&TemplateDefinition::new("test", text), &mut errors);
    errors.messages()
}

/// Load group-file text as `t.stg` and return the rendered diagnostics.
pub fn group_messages(text: &str) -> Vec<String> {
    let mut errors = ErrorBuffer::new();
    Group::new().load_str(text, Some("t.stg"), &mut errors);
    errors.messages()
}

/// Write `contents` to `name` inside `dir`.
pub fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write template file");
    path
}

/// Compile, format, recompile, and assert the second format matches the
/// first with no diagnostics in between.
pub fn assert_format_stable(template: &CompiledTemplate) -> String {
    let formatted = format_template(template);
    let reparsed = Compiler::new()
        .compile_standalone(&TemplateDefinition::new(&template.name, formatted.as_str()))
        .unwrap_or_else(|e| {
            panic!(
                "formatted output does not compile: {e}\n\
                 --- formatted ---\n{formatted}"
            )
        });
    let again = format_template(&reparsed);
    assert_eq!(
        again, formatted,
        "format not idempotent\n--- first ---\n{formatted}\n--- second ---\n{again}"
    );
    formatted
}
