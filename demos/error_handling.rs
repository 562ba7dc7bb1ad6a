//! Demonstrate error handling for invalid template input.

use stg_syntax::{ErrorBuffer, Group, compile_template};

fn main() {
    // A single template compiled on its own fails with the first error
    match compile_template("hi <foo(>", "greet", None) {
        Ok(_) => println!("Compiled OK (unexpected)"),
        Err(e) => {
            println!("Compile error: {e}");
            println!("  Kind: {}", e.diagnostic.kind);
            println!(
                "  Location: line {}, column {}",
                e.diagnostic.line(),
                e.diagnostic.column()
            );
            println!("  Cause: {}", e.cause);
        }
    }

    println!();

    // A group keeps loading and collects every diagnostic
    let mut errors = ErrorBuffer::new();
    let mut group = Group::new();
    group.load_str(
        "ok(x) ::= \"<x>\"\nbad() ::= \"hi <\n.> mom\"\nworse() ::= \"<name:{[<aaa.bb!>]}>\"\n",
        Some("demo.stg"),
        &mut errors,
    );
    println!("Loaded {} template(s) with {} error(s):", group.len(), errors.len());
    print!("{errors}");
}
