//! PLC Language CLI
//!
//! Command-line interface for the PLC programming language.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process;

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

use plc_lang::{analyze, lex, parse, run, Diagnostic, PlcError, VERSION};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Run,
    Tokens,
    Check,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut mode = Mode::Run;
    let mut verbosity = 0u8;
    let mut filename: Option<&String> = None;

    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "--tokens" | "-t" => mode = Mode::Tokens,
            "--check" | "-c" => mode = Mode::Check,
            "-v" => verbosity += 1,
            "-vv" => verbosity += 2,
            "--help" | "-h" => {
                print_help();
                return;
            }
            "--version" => {
                println!("plc {}", VERSION);
                return;
            }
            _ if arg.starts_with('-') => {
                eprintln!("Unknown flag: {}", arg);
                print_usage();
                process::exit(1);
            }
            _ => filename = Some(arg),
        }
    }

    init_logging(verbosity);

    let Some(file) = filename.map(String::as_str) else {
        eprintln!("Error: No input file specified");
        print_usage();
        process::exit(1);
    };

    let source = match fs::read_to_string(file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Failed to read file '{}': {}", file, e);
            process::exit(1);
        }
    };

    let result = match mode {
        Mode::Tokens => show_tokens(&source, file).map(|_| 0),
        Mode::Check => check(&source).map(|_| {
            println!("{}: {}", file, "ok".green());
            0
        }),
        Mode::Run => run(&source, Some(file)),
    };

    let status = match result {
        Ok(status) => status,
        Err(e) => {
            eprint!("{}", Diagnostic::with_source(&e, &source, Some(file)).format());
            1
        }
    };

    let _ = io::stdout().flush();
    process::exit(status);
}

fn print_usage() {
    eprintln!("Usage: plc [OPTIONS] <script>");
    eprintln!("       plc --help");
}

fn print_help() {
    println!("PLC v{} - A small statically-typed scripting language", VERSION);
    println!();
    println!("USAGE:");
    println!("    plc [OPTIONS] <script>");
    println!();
    println!("OPTIONS:");
    println!("    -t, --tokens    Show tokenization output (lexer only)");
    println!("    -c, --check     Parse and type-check without running");
    println!("    -v              Log pipeline stages (repeat for more detail)");
    println!("    -h, --help      Show this help message");
    println!("        --version   Show version");
    println!();
    println!("EXAMPLES:");
    println!("    plc script.plc           Run a script; exit status is main's result");
    println!("    plc --tokens script.plc  Show tokens from lexer");
    println!("    plc -c script.plc        Check a script for errors");
}

/// Show tokens from lexing a file
fn show_tokens(source: &str, filename: &str) -> Result<(), PlcError> {
    let tokens = lex(source)?;

    println!("Tokens for '{}':", filename);
    println!("{}", "=".repeat(60));

    for (i, token) in tokens.iter().enumerate() {
        println!(
            "{:4}: {:12} {:>8} | {:?}",
            i,
            token.token_type.to_string(),
            token.location.to_string(),
            token.lexeme
        );
    }

    println!("{}", "=".repeat(60));
    println!("Total tokens: {}", tokens.len());

    Ok(())
}

/// Run every stage up to and including analysis
fn check(source: &str) -> Result<(), PlcError> {
    let mut ast = parse(lex(source)?)?;
    analyze(&mut ast)
}

/// Colored, level-tagged log lines on stderr
struct CliLogger {
    level: LevelFilter,
}

impl Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let tag = match record.level() {
            Level::Error => "error".red().bold(),
            Level::Warn => "warn".yellow().bold(),
            Level::Info => "info".green(),
            Level::Debug => "debug".blue(),
            Level::Trace => "trace".dimmed(),
        };
        eprintln!("[{}] {}", tag, record.args());
    }

    fn flush(&self) {}
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if log::set_boxed_logger(Box::new(CliLogger { level })).is_ok() {
        log::set_max_level(level);
    }
}
