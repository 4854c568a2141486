//! Abstract Syntax Tree definitions
//!
//! This module defines the AST node types for the PLC language. Expression
//! nodes carry an annotation slot for their resolved type, and access/call
//! nodes a slot for their resolved binding. The parser leaves every slot
//! empty; the analyzer fills them in.

use std::fmt;
use std::rc::Rc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::error::SourceLocation;
use crate::types::{Function, Resolved, TypeId, Variable};

/// Root AST node representing a complete program
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

/// Global field: LET name: Type = value;
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub type_name: String,
    pub value: Option<Expr>,
    pub variable: Option<Rc<Variable>>,
    pub location: SourceLocation,
}

/// Method declaration: DEF name(params): Type DO ... END
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub parameters: Vec<String>,
    pub parameter_type_names: Vec<String>,
    pub return_type_name: Option<String>,
    pub statements: Vec<Stmt>,
    pub function: Option<Rc<Function>>,
    pub location: SourceLocation,
}

/// Statement node
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Expression statement; only calls survive analysis
    Expression {
        expr: Expr,
        location: SourceLocation,
    },

    /// Local declaration: LET x: Integer = 42;
    Declaration {
        name: String,
        type_name: Option<String>,
        value: Option<Expr>,
        variable: Option<Rc<Variable>>,
        location: SourceLocation,
    },

    /// Assignment: receiver = value;
    Assignment {
        receiver: Expr,
        value: Expr,
        location: SourceLocation,
    },

    /// If statement
    If {
        condition: Expr,
        then_statements: Vec<Stmt>,
        else_statements: Vec<Stmt>,
        location: SourceLocation,
    },

    /// For loop over an iterable
    For {
        name: String,
        value: Expr,
        statements: Vec<Stmt>,
        location: SourceLocation,
    },

    /// While loop
    While {
        condition: Expr,
        statements: Vec<Stmt>,
        location: SourceLocation,
    },

    /// Return statement
    Return {
        value: Expr,
        location: SourceLocation,
    },
}

/// Expression node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal value
    Literal {
        value: Literal,
        ty: Option<TypeId>,
        location: SourceLocation,
    },

    /// Parenthesized expression
    Group {
        expr: Box<Expr>,
        ty: Option<TypeId>,
        location: SourceLocation,
    },

    /// Binary operation
    Binary {
        operator: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: Option<TypeId>,
        location: SourceLocation,
    },

    /// Variable or field access
    Access {
        receiver: Option<Box<Expr>>,
        name: String,
        variable: Option<Resolved<Variable>>,
        ty: Option<TypeId>,
        location: SourceLocation,
    },

    /// Function or method call
    Function {
        receiver: Option<Box<Expr>>,
        name: String,
        arguments: Vec<Expr>,
        function: Option<Resolved<Function>>,
        ty: Option<TypeId>,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn literal(value: Literal, location: SourceLocation) -> Self {
        Expr::Literal {
            value,
            ty: None,
            location,
        }
    }

    pub fn group(expr: Expr, location: SourceLocation) -> Self {
        Expr::Group {
            expr: Box::new(expr),
            ty: None,
            location,
        }
    }

    pub fn binary(operator: BinaryOp, left: Expr, right: Expr, location: SourceLocation) -> Self {
        Expr::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            ty: None,
            location,
        }
    }

    pub fn access(receiver: Option<Expr>, name: impl Into<String>, location: SourceLocation) -> Self {
        Expr::Access {
            receiver: receiver.map(Box::new),
            name: name.into(),
            variable: None,
            ty: None,
            location,
        }
    }

    pub fn function(
        receiver: Option<Expr>,
        name: impl Into<String>,
        arguments: Vec<Expr>,
        location: SourceLocation,
    ) -> Self {
        Expr::Function {
            receiver: receiver.map(Box::new),
            name: name.into(),
            arguments,
            function: None,
            ty: None,
            location,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Literal { location, .. }
            | Expr::Group { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Access { location, .. }
            | Expr::Function { location, .. } => *location,
        }
    }

    /// Resolved type, if the analyzer has visited this node
    pub fn ty(&self) -> Option<TypeId> {
        match self {
            Expr::Literal { ty, .. }
            | Expr::Group { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Access { ty, .. }
            | Expr::Function { ty, .. } => *ty,
        }
    }

    pub fn set_ty(&mut self, resolved: TypeId) {
        match self {
            Expr::Literal { ty, .. }
            | Expr::Group { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Access { ty, .. }
            | Expr::Function { ty, .. } => *ty = Some(resolved),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    And,
    Or,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "<" => Some(Self::Less),
            "<=" => Some(Self::LessEqual),
            ">" => Some(Self::Greater),
            ">=" => Some(Self::GreaterEqual),
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            "+" => Some(Self::Add),
            "-" => Some(Self::Subtract),
            "*" => Some(Self::Multiply),
            "/" => Some(Self::Divide),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
        }
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Less
                | Self::LessEqual
                | Self::Greater
                | Self::GreaterEqual
                | Self::Equal
                | Self::NotEqual
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Character(char),
    String(String),
    Integer(BigInt),
    Decimal(BigDecimal),
}
