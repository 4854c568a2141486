//! Type system module
//!
//! This module holds the nominal type registry and the compatibility rules
//! shared by the analyzer and the interpreter.

pub mod type_def;
pub mod checker;

pub use type_def::{Function, Resolved, TypeDescriptor, TypeId, TypeRegistry, Variable};
pub use checker::{arithmetic_result, is_assignable, is_comparable, require_assignable};
