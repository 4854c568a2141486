//! # PLC Programming Language
//!
//! A small statically-typed, block-structured scripting language with:
//! - Keyword-delimited blocks (`DEF ... DO ... END`)
//! - Nominal static types checked before execution
//! - Arbitrary-precision integers and decimals
//!
//! ## Architecture
//!
//! The language implementation is organized into several modules:
//! - `lexer`: Tokenization of source code
//! - `parser`: Parsing tokens into an Abstract Syntax Tree (AST)
//! - `types`: Type registry and compatibility rules
//! - `scope`: Scope arena shared by analysis and execution
//! - `semantic`: Name resolution and type checking
//! - `runtime`: Interpreter/execution engine
//! - `error`: Error handling and diagnostics

pub mod error;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod scope;
pub mod semantic;
pub mod runtime;

use log::debug;
use num_bigint::BigInt;
use num_traits::ToPrimitive;

// Re-export commonly used types
pub use error::{Diagnostic, PlcError, PlcResult, SourceLocation};
pub use lexer::{Lexer, Token, TokenType};
pub use parser::{Parser, Source};
pub use runtime::{Interpreter, Value};
pub use semantic::Analyzer;

/// Version of the PLC implementation
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tokenize source text
pub fn lex(source: &str) -> PlcResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

/// Parse a token stream into a program
pub fn parse(tokens: Vec<Token>) -> PlcResult<Source> {
    Parser::new(tokens).parse()
}

/// Check a program with the built-in environment, annotating it in place
pub fn analyze(source: &mut Source) -> PlcResult<()> {
    Analyzer::new().analyze(source)
}

/// Run an analyzed program, printing to stdout, and return `main`'s value
pub fn interpret(source: &Source) -> PlcResult<Value> {
    Interpreter::new().interpret(source)
}

/// Compile and run a PLC program from source code
///
/// This is the main entry point for executing PLC programs. It performs
/// lexical analysis, parsing, semantic analysis and finally interpretation.
///
/// # Arguments
///
/// * `source` - The source code to compile and run
/// * `filename` - Optional filename for logging
///
/// # Returns
///
/// The value returned by `main`, truncated to an exit status, or the first
/// `PlcError` raised by any stage.
pub fn run(source: &str, filename: Option<&str>) -> PlcResult<i32> {
    debug!("running {}", filename.unwrap_or("<input>"));

    // Phase 1: Lexical Analysis
    let tokens = lex(source)?;

    // Phase 2: Parsing
    let mut ast = parse(tokens)?;

    // Phase 3: Semantic Analysis
    analyze(&mut ast)?;

    // Phase 4: Interpretation
    let result = interpret(&ast)?;

    exit_status(&result)
}

/// Low 32 bits of an integer result
fn exit_status(value: &Value) -> PlcResult<i32> {
    match value {
        Value::Integer(n) => {
            let low = n & &BigInt::from(u32::MAX);
            Ok(low.to_u32().unwrap_or(0) as i32)
        }
        other => Err(PlcError::runtime_error(
            error::RuntimeErrorKind::OperandTypeMismatch,
            format!("main returned {}, expected Integer", other.type_name()),
            None,
        )),
    }
}
