//! CLI tool to validate and format template group files.

use std::path::Path;
use std::process::ExitCode;

use stg_syntax::{ErrorBuffer, Group, LoadError, format_group, format_template};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stg_syntax=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        eprintln!("Usage: stg <command> [files...]");
        eprintln!();
        eprintln!("Commands:");
        eprintln!("  validate  Check template files (.stg groups or .st templates)");
        eprintln!("  fmt       Format template files and print to stdout");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  stg validate page.stg");
        eprintln!("  stg fmt page.stg greeting.st");
        return ExitCode::from(2);
    }

    let command = args[1].as_str();
    let files = &args[2..];

    if !matches!(command, "validate" | "fmt") {
        eprintln!("Unknown command: {command}");
        return ExitCode::from(2);
    }
    if files.is_empty() {
        eprintln!("Error: no files specified");
        return ExitCode::from(2);
    }

    let mut had_error = false;

    for path in files {
        let path = Path::new(path);
        let mut errors = ErrorBuffer::new();
        let group = match load(path, &mut errors) {
            Ok(group) => group,
            Err(e) => {
                eprintln!("{e}");
                had_error = true;
                continue;
            }
        };

        if !errors.is_empty() {
            eprint!("{errors}");
            had_error = true;
            continue;
        }

        if command == "validate" {
            eprintln!("{}: valid ({} template(s))", path.display(), group.len());
        } else if is_single_template(path) {
            for template in group.templates() {
                println!("{}", format_template(template));
            }
        } else {
            print!("{}", format_group(&group));
        }
    }

    if had_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn is_single_template(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "st")
}

fn load(path: &Path, errors: &mut ErrorBuffer) -> Result<Group, LoadError> {
    let mut group = Group::new();
    if is_single_template(path) {
        group.load_template_file(path, errors)?;
    } else {
        group.load_file(path, errors)?;
    }
    Ok(group)
}
