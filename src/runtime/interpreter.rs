//! Interpreter implementation
//!
//! This module implements the tree-walking interpreter for PLC. Values live
//! in the same kind of scope arena the analyzer uses, and names carrying a
//! resolved depth are read straight from the frame the analyzer proved.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use bigdecimal::BigDecimal;
use log::{debug, trace};
use num_bigint::BigInt;
use num_traits::Zero;

use super::value::{divide_half_even, Callable, FunctionValue, NativeFunctionValue, Value};
use crate::error::{PlcError, PlcResult, RuntimeErrorKind};
use crate::parser::ast::{BinaryOp, Expr, Source, Stmt};
use crate::scope::{ScopeId, Scopes};
use crate::types::{arithmetic_result, TypeId};

/// Shared sink that `print` writes to
type Output = Rc<RefCell<Box<dyn Write>>>;

/// Outcome of executing a statement
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    Normal,
    Return(Value),
}

/// Interpreter
pub struct Interpreter {
    scopes: Scopes<Value, Callable>,
    scope: ScopeId,
    output: Output,
}

impl Interpreter {
    pub fn new() -> Self {
        let output: Output = Rc::new(RefCell::new(Box::new(io::stdout())));
        let mut interpreter = Self {
            scopes: Scopes::new(),
            scope: ScopeId::ROOT,
            output,
        };
        interpreter.register_builtins();
        interpreter
    }

    /// Redirect `print` to another writer
    pub fn with_output(self, writer: impl Write + 'static) -> Self {
        *self.output.borrow_mut() = Box::new(writer);
        self
    }

    fn register_builtins(&mut self) {
        // print(value) -> nil
        let output = Rc::clone(&self.output);
        self.define_function("print", 1, move |args| {
            let value = args.first().cloned().unwrap_or(Value::Nil);
            writeln!(output.borrow_mut(), "{}", value).map_err(|e| {
                PlcError::runtime_error(
                    RuntimeErrorKind::Output,
                    format!("Failed to write output: {}", e),
                    None,
                )
            })?;
            Ok(Value::Nil)
        });

        // range(start, end) -> [start, end)
        self.define_function("range", 2, |args| match args {
            [Value::Integer(start), Value::Integer(end)] => Ok(Value::Range {
                start: start.clone(),
                end: end.clone(),
            }),
            _ => Err(operand_mismatch("range expects two Integer arguments")),
        });
    }

    /// Bind a global variable
    pub fn define_variable(&mut self, name: &str, value: Value) {
        self.scopes.define_variable(ScopeId::ROOT, name, value);
    }

    /// Bind a global host function
    pub fn define_function(
        &mut self,
        name: &str,
        arity: usize,
        func: impl Fn(&[Value]) -> PlcResult<Value> + 'static,
    ) {
        let native = NativeFunctionValue::new(name, arity, func);
        self.scopes
            .define_function(ScopeId::ROOT, name, arity, Callable::Native(native));
    }

    /// Run a program and return the value produced by `main`
    pub fn interpret(&mut self, source: &Source) -> PlcResult<Value> {
        debug!(
            "interpreting {} fields and {} methods",
            source.fields.len(),
            source.methods.len()
        );

        for field in &source.fields {
            let value = match &field.value {
                Some(expr) => self.eval_expr(expr)?,
                None => Value::Nil,
            };
            self.scopes.define_variable(self.scope, &field.name, value);
        }

        for method in &source.methods {
            let function = FunctionValue::new(method);
            self.scopes.define_function(
                self.scope,
                &method.name,
                function.arity(),
                Callable::User(function),
            );
        }

        let main = self
            .scopes
            .lookup_function(ScopeId::ROOT, "main", 0)
            .map(|(main, _)| main.clone())
            .ok_or_else(|| {
                PlcError::runtime_error(RuntimeErrorKind::UndefinedName, "No main/0 function defined", None)
            })?;

        let result = self.call(&main, Vec::new())?;
        debug!("main returned {}", result);
        Ok(result)
    }

    // ===== Statements =====

    fn execute_block(&mut self, statements: &[Stmt]) -> PlcResult<ControlFlow> {
        for stmt in statements {
            if let ControlFlow::Return(value) = self.execute_stmt(stmt)? {
                return Ok(ControlFlow::Return(value));
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> PlcResult<ControlFlow> {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.eval_expr(expr)?;
            }

            Stmt::Declaration { name, value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Nil,
                };
                self.scopes.define_variable(self.scope, name, value);
            }

            Stmt::Assignment {
                receiver,
                value,
                location,
            } => {
                let value = self.eval_expr(value)?;
                self.assign(receiver, value).map_err(|e| e.or_at(*location))?;
            }

            Stmt::If {
                condition,
                then_statements,
                else_statements,
                ..
            } => {
                let branch = if self.eval_condition(condition)? {
                    then_statements
                } else {
                    else_statements
                };
                return self.within_scope(|this| this.execute_block(branch));
            }

            Stmt::For {
                name,
                value,
                statements,
                ..
            } => {
                let iterable = self.eval_expr(value)?;
                let type_name = iterable.type_name();
                let Some(elements) = iterable.into_elements() else {
                    return Err(operand_mismatch(format!("Cannot iterate over {}", type_name))
                        .or_at(value.location()));
                };

                for item in elements {
                    let flow = self.within_scope(|this| {
                        this.scopes.define_variable(this.scope, name, item);
                        this.execute_block(statements)
                    })?;
                    if let ControlFlow::Return(_) = flow {
                        return Ok(flow);
                    }
                }
            }

            Stmt::While {
                condition,
                statements,
                ..
            } => {
                while self.eval_condition(condition)? {
                    let flow = self.within_scope(|this| this.execute_block(statements))?;
                    if let ControlFlow::Return(_) = flow {
                        return Ok(flow);
                    }
                }
            }

            Stmt::Return { value, .. } => {
                return Ok(ControlFlow::Return(self.eval_expr(value)?));
            }
        }

        Ok(ControlFlow::Normal)
    }

    fn assign(&mut self, receiver: &Expr, value: Value) -> PlcResult<()> {
        let Expr::Access {
            receiver: object,
            name,
            variable,
            ..
        } = receiver
        else {
            return Err(PlcError::runtime_error(
                RuntimeErrorKind::InvalidAssignmentTarget,
                "Only variables and fields can be assigned",
                None,
            ));
        };

        if let Some(object) = object {
            let Value::Object(object) = self.eval_expr(object)? else {
                return Err(undefined(format!("No field '{}' on a non-object value", name)));
            };
            let mut object = object.borrow_mut();
            if let Some(slot) = object.fields.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            return Err(undefined(format!("{} has no field '{}'", object.type_name, name)));
        }

        let scope = self.scope;
        let slot = match variable.as_ref().and_then(|v| v.depth) {
            Some(depth) if self.scopes.variable_at(scope, depth, name).is_some() => {
                self.scopes.variable_at_mut(scope, depth, name)
            }
            _ => self.scopes.lookup_variable_mut(scope, name),
        };

        match slot {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(undefined(format!("Undefined variable '{}'", name))),
        }
    }

    // ===== Expressions =====

    fn eval_expr(&mut self, expr: &Expr) -> PlcResult<Value> {
        let location = expr.location();

        let result = match expr {
            Expr::Literal { value, .. } => Ok(Value::from(value)),

            Expr::Group { expr, .. } => self.eval_expr(expr),

            Expr::Binary {
                operator,
                left,
                right,
                ..
            } => self.eval_binary(*operator, left, right),

            Expr::Access {
                receiver: Some(receiver),
                name,
                ..
            } => match self.eval_expr(receiver)? {
                Value::Object(object) => {
                    let object = object.borrow();
                    let value = object.fields.get(name).cloned().ok_or_else(|| {
                        undefined(format!("{} has no field '{}'", object.type_name, name))
                    });
                    value
                }
                other => Err(undefined(format!(
                    "{} has no field '{}'",
                    other.type_name(),
                    name
                ))),
            },

            Expr::Access {
                receiver: None,
                name,
                variable,
                ..
            } => {
                let depth = variable.as_ref().and_then(|v| v.depth);
                self.read_variable(name, depth)
            }

            Expr::Function {
                receiver: Some(receiver),
                name,
                arguments,
                ..
            } => {
                let target = self.eval_expr(receiver)?;
                let mut values = vec![target.clone()];
                for argument in arguments {
                    values.push(self.eval_expr(argument)?);
                }

                let method = match &target {
                    Value::Object(object) => object
                        .borrow()
                        .methods
                        .get(&(name.clone(), values.len()))
                        .cloned(),
                    _ => None,
                };

                match method {
                    Some(method) => method.call(&values),
                    None => Err(PlcError::runtime_error(
                        RuntimeErrorKind::NotCallable,
                        format!(
                            "{} has no method '{}' taking {} arguments",
                            target.type_name(),
                            name,
                            arguments.len()
                        ),
                        None,
                    )),
                }
            }

            Expr::Function {
                receiver: None,
                name,
                arguments,
                function,
                ..
            } => {
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.eval_expr(argument)?);
                }

                let depth = function.as_ref().and_then(|f| f.depth);
                let callable = self.lookup_callable(name, values.len(), depth)?;
                self.call(&callable, values)
            }
        };

        result.map_err(|e| e.or_at(location))
    }

    fn eval_binary(&mut self, operator: BinaryOp, left: &Expr, right: &Expr) -> PlcResult<Value> {
        match operator {
            BinaryOp::And => {
                let result = self.eval_condition(left)? && self.eval_condition(right)?;
                Ok(Value::Boolean(result))
            }
            BinaryOp::Or => {
                let result = self.eval_condition(left)? || self.eval_condition(right)?;
                Ok(Value::Boolean(result))
            }
            _ => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                apply_binary(operator, left, right)
            }
        }
    }

    fn eval_condition(&mut self, expr: &Expr) -> PlcResult<bool> {
        match self.eval_expr(expr)? {
            Value::Boolean(b) => Ok(b),
            other => Err(operand_mismatch(format!(
                "Expected Boolean, received {}",
                other.type_name()
            ))
            .or_at(expr.location())),
        }
    }

    fn read_variable(&self, name: &str, depth: Option<usize>) -> PlcResult<Value> {
        depth
            .and_then(|depth| self.scopes.variable_at(self.scope, depth, name))
            .or_else(|| self.scopes.lookup_variable(self.scope, name).map(|(v, _)| v))
            .cloned()
            .ok_or_else(|| undefined(format!("Undefined variable '{}'", name)))
    }

    fn lookup_callable(&self, name: &str, arity: usize, depth: Option<usize>) -> PlcResult<Callable> {
        depth
            .and_then(|depth| self.scopes.function_at(self.scope, depth, name, arity))
            .or_else(|| {
                self.scopes
                    .lookup_function(self.scope, name, arity)
                    .map(|(f, _)| f)
            })
            .cloned()
            .ok_or_else(|| undefined(format!("Undefined function '{}/{}'", name, arity)))
    }

    // ===== Calls =====

    fn call(&mut self, callable: &Callable, arguments: Vec<Value>) -> PlcResult<Value> {
        trace!("calling {}/{}", callable.name(), arguments.len());
        match callable {
            Callable::Native(native) => native.call(&arguments),
            Callable::User(function) => {
                let method = Rc::clone(&function.method);

                // Method frames hang off the globals, not the caller
                self.within_scope_of(ScopeId::ROOT, |this| {
                    for (parameter, argument) in method.parameters.iter().zip(arguments) {
                        this.scopes.define_variable(this.scope, parameter, argument);
                    }
                    match this.execute_block(&method.statements)? {
                        ControlFlow::Return(value) => Ok(value),
                        ControlFlow::Normal => Ok(Value::Nil),
                    }
                })
            }
        }
    }

    // ===== Scopes =====

    fn within_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> PlcResult<T>) -> PlcResult<T> {
        self.within_scope_of(self.scope, f)
    }

    /// Run `f` in a fresh child of `parent`, restoring the current scope afterwards
    fn within_scope_of<T>(
        &mut self,
        parent: ScopeId,
        f: impl FnOnce(&mut Self) -> PlcResult<T>,
    ) -> PlcResult<T> {
        let saved = self.scope;
        let child = self.scopes.push(parent);
        self.scope = child;

        let result = f(self);

        self.scopes.release(child);
        self.scope = saved;
        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply a non-logical binary operator to two evaluated operands
fn apply_binary(operator: BinaryOp, left: Value, right: Value) -> PlcResult<Value> {
    match operator {
        BinaryOp::Equal => return Ok(Value::Boolean(left == right)),
        BinaryOp::NotEqual => return Ok(Value::Boolean(left != right)),
        BinaryOp::Less | BinaryOp::LessEqual | BinaryOp::Greater | BinaryOp::GreaterEqual => {
            let ordering = left.compare(&right).ok_or_else(|| {
                PlcError::runtime_error(
                    RuntimeErrorKind::NotComparable,
                    format!(
                        "Cannot compare {} with {}",
                        left.type_name(),
                        right.type_name()
                    ),
                    None,
                )
            })?;
            let result = match operator {
                BinaryOp::Less => ordering.is_lt(),
                BinaryOp::LessEqual => ordering.is_le(),
                BinaryOp::Greater => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            return Ok(Value::Boolean(result));
        }
        _ => {}
    }

    let mismatch = || {
        operand_mismatch(format!(
            "Operator '{}' cannot be applied to {} and {}",
            operator,
            left.type_name(),
            right.type_name()
        ))
    };

    match arithmetic_result(operator, left.type_id(), right.type_id()) {
        Some(TypeId::STRING) => Ok(Value::String(format!("{}{}", left, right))),
        Some(TypeId::INTEGER) => match (&left, &right) {
            (Value::Integer(a), Value::Integer(b)) => integer_arithmetic(operator, a, b),
            _ => Err(mismatch()),
        },
        Some(TypeId::DECIMAL) => match (&left, &right) {
            (Value::Decimal(a), Value::Decimal(b)) => decimal_arithmetic(operator, a, b),
            _ => Err(mismatch()),
        },
        _ => Err(mismatch()),
    }
}

fn integer_arithmetic(operator: BinaryOp, a: &BigInt, b: &BigInt) -> PlcResult<Value> {
    let result = match operator {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => {
            if b.is_zero() {
                return Err(division_by_zero());
            }
            a / b
        }
        _ => return Err(operand_mismatch(format!("'{}' is not arithmetic", operator))),
    };
    Ok(Value::Integer(result))
}

fn decimal_arithmetic(operator: BinaryOp, a: &BigDecimal, b: &BigDecimal) -> PlcResult<Value> {
    let result = match operator {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => divide_half_even(a, b).ok_or_else(division_by_zero)?,
        _ => return Err(operand_mismatch(format!("'{}' is not arithmetic", operator))),
    };
    Ok(Value::Decimal(result))
}

fn division_by_zero() -> PlcError {
    PlcError::runtime_error(RuntimeErrorKind::DivisionByZero, "Division by zero", None)
}

fn operand_mismatch(message: impl Into<String>) -> PlcError {
    PlcError::runtime_error(RuntimeErrorKind::OperandTypeMismatch, message, None)
}

fn undefined(message: String) -> PlcError {
    PlcError::runtime_error(RuntimeErrorKind::UndefinedName, message, None)
}
