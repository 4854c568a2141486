//! Semantic analysis module
//!
//! This module handles scope resolution and type checking of the AST.

pub mod analyzer;

pub use analyzer::Analyzer;
