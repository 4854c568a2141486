//! Runtime value representation
//!
//! This module defines runtime values for PLC and the numeric helpers the
//! interpreter needs on top of them.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::error::PlcResult;
use crate::parser::ast::{Literal, Method};
use crate::types::TypeId;

/// Shared handle to a host object
pub type ObjectRef = Rc<RefCell<ObjectValue>>;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Boolean(bool),
    Character(char),
    String(String),
    Integer(BigInt),
    Decimal(BigDecimal),
    Iterable(Vec<Value>),
    /// Integers from `start` up to but excluding `end`, produced on demand
    Range { start: BigInt, end: BigInt },
    Object(ObjectRef),
}

/// Element iterator for FOR loops
pub enum Elements {
    Items(std::vec::IntoIter<Value>),
    Range { next: BigInt, end: BigInt },
}

impl Iterator for Elements {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            Elements::Items(items) => items.next(),
            Elements::Range { next, end } => {
                if *next >= *end {
                    return None;
                }
                let current = next.clone();
                *next += BigInt::one();
                Some(Value::Integer(current))
            }
        }
    }
}

/// Object with its own field and method table.
///
/// Methods are keyed by name and arity, where the arity counts the receiver,
/// which is passed as the first argument.
#[derive(Debug, Clone)]
pub struct ObjectValue {
    pub type_name: String,
    pub ty: TypeId,
    pub fields: HashMap<String, Value>,
    pub methods: HashMap<(String, usize), NativeFunctionValue>,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            type_name: type_name.into(),
            ty,
            fields: HashMap::new(),
            methods: HashMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Add a method; `arity` excludes the receiver
    pub fn with_method(
        mut self,
        name: impl Into<String>,
        arity: usize,
        func: impl Fn(&[Value]) -> PlcResult<Value> + 'static,
    ) -> Self {
        let name = name.into();
        let method = NativeFunctionValue::new(name.clone(), arity + 1, func);
        self.methods.insert((name, arity + 1), method);
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(Rc::new(RefCell::new(self)))
    }
}

/// Host function callable from PLC code
#[derive(Clone)]
pub struct NativeFunctionValue {
    pub name: String,
    pub arity: usize,
    pub func: Rc<dyn Fn(&[Value]) -> PlcResult<Value>>,
}

impl NativeFunctionValue {
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        func: impl Fn(&[Value]) -> PlcResult<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            func: Rc::new(func),
        }
    }

    pub fn call(&self, arguments: &[Value]) -> PlcResult<Value> {
        (self.func)(arguments)
    }
}

impl fmt::Debug for NativeFunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}/{}>", self.name, self.arity)
    }
}

/// Method declared in PLC source
#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub name: String,
    pub method: Rc<Method>,
}

impl FunctionValue {
    pub fn new(method: &Method) -> Self {
        Self {
            name: method.name.clone(),
            method: Rc::new(method.clone()),
        }
    }

    pub fn arity(&self) -> usize {
        self.method.parameters.len()
    }
}

/// Anything a call expression can invoke
#[derive(Debug, Clone)]
pub enum Callable {
    Native(NativeFunctionValue),
    User(FunctionValue),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Native(native) => &native.name,
            Callable::User(function) => &function.name,
        }
    }
}

impl Value {
    /// Dynamic type of this value
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Nil => TypeId::NIL,
            Value::Boolean(_) => TypeId::BOOLEAN,
            Value::Character(_) => TypeId::CHARACTER,
            Value::String(_) => TypeId::STRING,
            Value::Integer(_) => TypeId::INTEGER,
            Value::Decimal(_) => TypeId::DECIMAL,
            Value::Iterable(_) | Value::Range { .. } => TypeId::INTEGER_ITERABLE,
            Value::Object(object) => object.borrow().ty,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::Nil => "Nil".to_string(),
            Value::Boolean(_) => "Boolean".to_string(),
            Value::Character(_) => "Character".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Integer(_) => "Integer".to_string(),
            Value::Decimal(_) => "Decimal".to_string(),
            Value::Iterable(_) | Value::Range { .. } => "IntegerIterable".to_string(),
            Value::Object(object) => object.borrow().type_name.clone(),
        }
    }

    /// Elements of an iterable value, or `None` for anything else
    pub fn into_elements(self) -> Option<Elements> {
        match self {
            Value::Iterable(items) => Some(Elements::Items(items.into_iter())),
            Value::Range { start, end } => Some(Elements::Range { next: start, end }),
            _ => None,
        }
    }

    /// Natural ordering between two values of the same comparable kind
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Character(a), Value::Character(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Character(c) => Value::Character(*c),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Integer(i) => Value::Integer(i.clone()),
            Literal::Decimal(d) => Value::Decimal(d.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "NIL"),
            Value::Boolean(true) => write!(f, "TRUE"),
            Value::Boolean(false) => write!(f, "FALSE"),
            Value::Character(c) => write!(f, "{}", c),
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Decimal(d) => write!(f, "{}", d.to_plain_string()),
            Value::Iterable(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Range { start, end } => {
                write!(f, "[")?;
                let mut current = start.clone();
                while current < *end {
                    if current != *start {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", current)?;
                    current += BigInt::one();
                }
                write!(f, "]")
            }
            Value::Object(object) => write!(f, "<{} object>", object.borrow().type_name),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Character(a), Value::Character(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Iterable(a), Value::Iterable(b)) => a == b,
            (Value::Range { start: a, end: x }, Value::Range { start: b, end: y }) => {
                (a >= x && b >= y) || (a == b && x == y)
            }
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Divide at the dividend's scale, rounding half to even.
///
/// Returns `None` for a zero divisor.
pub fn divide_half_even(dividend: &BigDecimal, divisor: &BigDecimal) -> Option<BigDecimal> {
    let (dividend_digits, dividend_scale) = dividend.as_bigint_and_exponent();
    let (divisor_digits, divisor_scale) = divisor.as_bigint_and_exponent();

    if divisor_digits.is_zero() {
        return None;
    }

    // dividend / divisor * 10^dividend_scale, as a ratio of integers
    let (numerator, denominator) = if divisor_scale >= 0 {
        (dividend_digits * pow10(divisor_scale.unsigned_abs()), divisor_digits)
    } else {
        (dividend_digits, divisor_digits * pow10(divisor_scale.unsigned_abs()))
    };

    let quotient = round_half_even(&numerator, &denominator);
    Some(BigDecimal::new(quotient, dividend_scale))
}

fn pow10(exponent: u64) -> BigInt {
    num_traits::pow(BigInt::from(10), exponent as usize)
}

fn round_half_even(numerator: &BigInt, denominator: &BigInt) -> BigInt {
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;

    if remainder.is_zero() {
        return quotient;
    }

    let step = if numerator.is_negative() != denominator.is_negative() {
        BigInt::from(-1)
    } else {
        BigInt::from(1)
    };

    let twice_remainder = (&remainder * BigInt::from(2)).abs();
    match twice_remainder.cmp(&denominator.abs()) {
        Ordering::Less => quotient,
        Ordering::Greater => quotient + step,
        Ordering::Equal => {
            if (&quotient % BigInt::from(2)).is_zero() {
                quotient
            } else {
                quotient + step
            }
        }
    }
}
