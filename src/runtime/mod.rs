//! Runtime module
//!
//! This module handles interpretation and execution of PLC programs.

pub mod value;
pub mod interpreter;

pub use value::{Callable, Elements, NativeFunctionValue, ObjectValue, Value};
pub use interpreter::{ControlFlow, Interpreter};
