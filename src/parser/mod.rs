//! Parser module
//!
//! This module handles parsing tokens into an Abstract Syntax Tree (AST).

pub mod ast;
pub mod parser;

pub use ast::{BinaryOp, Expr, Field, Literal, Method, Source, Stmt};
pub use parser::Parser;
