//! Type compatibility rules
//!
//! Assignability between nominal types, plus the operand table for the
//! arithmetic operators. The analyzer applies the table to static types and
//! the interpreter to the dynamic types of operand values, so both stages
//! always agree on what `+` means.

use super::type_def::{TypeId, TypeRegistry};
use crate::error::{PlcError, PlcResult, TypeErrorKind};
use crate::parser::ast::BinaryOp;

/// Types a `COMPARABLE` target accepts
const COMPARABLE_TYPES: [TypeId; 4] = [
    TypeId::INTEGER,
    TypeId::DECIMAL,
    TypeId::CHARACTER,
    TypeId::STRING,
];

/// Whether `source` may be used where `target` is expected
pub fn is_assignable(target: TypeId, source: TypeId) -> bool {
    match target {
        TypeId::ANY => true,
        TypeId::COMPARABLE => is_comparable(source),
        _ => target == source,
    }
}

pub fn is_comparable(ty: TypeId) -> bool {
    COMPARABLE_TYPES.contains(&ty)
}

pub fn is_numeric(ty: TypeId) -> bool {
    ty == TypeId::INTEGER || ty == TypeId::DECIMAL
}

/// Fail with `TypeMismatch` unless `source` is assignable to `target`
pub fn require_assignable(registry: &TypeRegistry, target: TypeId, source: TypeId) -> PlcResult<()> {
    if is_assignable(target, source) {
        Ok(())
    } else {
        Err(PlcError::type_error(
            TypeErrorKind::TypeMismatch,
            format!(
                "Expected {}, received {}",
                registry.name(target),
                registry.name(source)
            ),
            None,
        ))
    }
}

/// Result type of an arithmetic operator, or `None` if the operands don't fit.
///
/// `+` concatenates when either side is a string. Otherwise both operands
/// must be the same numeric type, which is also the result.
pub fn arithmetic_result(operator: BinaryOp, left: TypeId, right: TypeId) -> Option<TypeId> {
    match operator {
        BinaryOp::Add if left == TypeId::STRING || right == TypeId::STRING => Some(TypeId::STRING),
        BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
            (left == right && is_numeric(left)).then_some(left)
        }
        _ => None,
    }
}
