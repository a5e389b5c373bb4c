use hadesc::{
    diagnostics::{emit_syntax_errors, emit_type_errors, report_internal_error, report_io_error},
    language::typecheck::{check_program, CheckOptions},
    project::{load_program, LoadError, SOURCE_EXTENSION},
};
use std::{env, path::Path, process};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: hadesc check <filename.hds>";
const LOG_VAR: &str = "HADES_LOG";

fn main() {
    init_tracing();
    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("{USAGE}");
        process::exit(2);
    }

    let command = &args[1];
    let filename = Path::new(&args[2]);

    if filename.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION) {
        eprintln!("Invalid file extension. Only .{SOURCE_EXTENSION} files are allowed.");
        process::exit(2);
    }

    match command.as_str() {
        "check" => process::exit(check(filename)),
        _ => {
            eprintln!("Invalid command. {USAGE}");
            process::exit(2);
        }
    }
}

fn check(path: &Path) -> i32 {
    let loaded = match load_program(path) {
        Ok(loaded) => loaded,
        Err(LoadError::Io { path, error }) => {
            report_io_error(&path, &error);
            return 1;
        }
        Err(LoadError::Syntax(files)) => {
            emit_syntax_errors(&files);
            return 1;
        }
    };

    match check_program(&loaded.program, &CheckOptions::from_env()) {
        Ok(report) if report.total == 0 => {
            println!("No type errors found.");
            0
        }
        Ok(report) => {
            emit_type_errors(&report.diagnostics, &loaded);
            if report.total > report.diagnostics.len() {
                eprintln!(
                    "{} type error(s) found, showing the first {}.",
                    report.total,
                    report.diagnostics.len()
                );
            } else {
                eprintln!("{} type error(s) found.", report.total);
            }
            1
        }
        Err(error) => {
            report_internal_error(&error);
            3
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}
