//! Semantic analyzer
//!
//! A single pass over the AST that resolves every name, assigns a type to
//! every expression and rejects ill-formed programs. Results are written
//! back onto the AST's annotation slots for the interpreter to use.

use std::rc::Rc;

use log::debug;
use num_traits::ToPrimitive;

use crate::error::{PlcError, PlcResult, SourceLocation, TypeErrorKind};
use crate::parser::ast::{BinaryOp, Expr, Field, Literal, Method, Source, Stmt};
use crate::scope::{ScopeId, Scopes};
use crate::types::checker::{self, arithmetic_result};
use crate::types::{Function, Resolved, TypeId, TypeRegistry, Variable};

/// Static checker for PLC programs
pub struct Analyzer {
    registry: TypeRegistry,
    scopes: Scopes<Rc<Variable>, Rc<Function>>,
    scope: ScopeId,
    current_function_return_type: Option<TypeId>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::with_registry(TypeRegistry::new())
    }

    /// Create an analyzer over a registry that may hold host-defined types
    pub fn with_registry(registry: TypeRegistry) -> Self {
        let mut analyzer = Self {
            registry,
            scopes: Scopes::new(),
            scope: ScopeId::ROOT,
            current_function_return_type: None,
        };

        // print(value) -> nil
        analyzer.define_function("print", vec![TypeId::ANY], TypeId::NIL);
        // range(start, end) -> integers start..end
        analyzer.define_function(
            "range",
            vec![TypeId::INTEGER, TypeId::INTEGER],
            TypeId::INTEGER_ITERABLE,
        );

        analyzer
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Bind a global variable visible to every method
    pub fn define_variable(&mut self, name: &str, ty: TypeId) -> Rc<Variable> {
        let variable = Rc::new(Variable::new(name, name, ty));
        self.scopes
            .define_variable(ScopeId::ROOT, name, Rc::clone(&variable));
        variable
    }

    /// Bind a global function visible to every method
    pub fn define_function(
        &mut self,
        name: &str,
        parameter_types: Vec<TypeId>,
        return_type: TypeId,
    ) -> Rc<Function> {
        let function = Rc::new(Function::new(name, name, parameter_types, return_type));
        self.scopes
            .define_function(ScopeId::ROOT, name, function.arity(), Rc::clone(&function));
        function
    }

    /// Check a whole program, annotating it in place
    pub fn analyze(&mut self, source: &mut Source) -> PlcResult<()> {
        debug!(
            "analyzing {} fields and {} methods",
            source.fields.len(),
            source.methods.len()
        );

        for field in &mut source.fields {
            self.visit_field(field)?;
        }

        for method in &mut source.methods {
            self.visit_method(method)?;
        }

        match self.scopes.function_at(ScopeId::ROOT, 0, "main", 0) {
            Some(main) if main.return_type == TypeId::INTEGER => {}
            _ => {
                return Err(PlcError::type_error(
                    TypeErrorKind::MissingMain,
                    "A main/0 function returning Integer is required",
                    None,
                ))
            }
        }

        debug!("analysis complete");
        Ok(())
    }

    // ===== Declarations =====

    fn visit_field(&mut self, field: &mut Field) -> PlcResult<()> {
        let ty = self
            .registry
            .lookup(&field.type_name)
            .map_err(|e| e.or_at(field.location))?;

        if let Some(value) = &mut field.value {
            let value_type = self.visit_expr(value)?;
            self.require_assignable(ty, value_type, value.location())?;
        }

        let variable = Rc::new(Variable::new(&field.name, &field.name, ty));
        self.scopes
            .define_variable(self.scope, &field.name, Rc::clone(&variable));
        field.variable = Some(variable);
        Ok(())
    }

    fn visit_method(&mut self, method: &mut Method) -> PlcResult<()> {
        let parameter_types = method
            .parameter_type_names
            .iter()
            .map(|name| self.registry.lookup(name))
            .collect::<PlcResult<Vec<_>>>()
            .map_err(|e| e.or_at(method.location))?;

        let return_type = match &method.return_type_name {
            Some(name) => self
                .registry
                .lookup(name)
                .map_err(|e| e.or_at(method.location))?,
            None => TypeId::NIL,
        };

        // Bound before the body so the method can call itself
        let function = Rc::new(Function::new(
            &method.name,
            &method.name,
            parameter_types.clone(),
            return_type,
        ));
        self.scopes.define_function(
            self.scope,
            &method.name,
            function.arity(),
            Rc::clone(&function),
        );
        method.function = Some(function);

        let previous_return_type = self.current_function_return_type.replace(return_type);
        let result = self.within_scope(|this| {
            for (name, ty) in method.parameters.iter().zip(&parameter_types) {
                this.define_local(name, *ty);
            }
            this.visit_statements(&mut method.statements)
        });
        self.current_function_return_type = previous_return_type;

        result
    }

    // ===== Statements =====

    fn visit_statements(&mut self, statements: &mut [Stmt]) -> PlcResult<()> {
        for stmt in statements {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &mut Stmt) -> PlcResult<()> {
        match stmt {
            Stmt::Expression { expr, location } => {
                if !matches!(expr, Expr::Function { .. }) {
                    return Err(PlcError::type_error(
                        TypeErrorKind::NonCallExpressionStatement,
                        "Expression statement must be a function call",
                        Some(*location),
                    ));
                }
                self.visit_expr(expr)?;
                Ok(())
            }

            Stmt::Declaration {
                name,
                type_name,
                value,
                variable,
                location,
            } => {
                let declared = match type_name {
                    Some(type_name) => Some(
                        self.registry
                            .lookup(type_name)
                            .map_err(|e| e.or_at(*location))?,
                    ),
                    None => None,
                };

                let ty = match (declared, value) {
                    (Some(declared), Some(value)) => {
                        let value_type = self.visit_expr(value)?;
                        self.require_assignable(declared, value_type, value.location())?;
                        declared
                    }
                    (None, Some(value)) => self.visit_expr(value)?,
                    (Some(declared), None) => declared,
                    (None, None) => {
                        return Err(PlcError::type_error(
                            TypeErrorKind::UntypedDeclaration,
                            format!("Declaration of '{}' needs a type or an initial value", name),
                            Some(*location),
                        ))
                    }
                };

                *variable = Some(self.define_local(name, ty));
                Ok(())
            }

            Stmt::Assignment {
                receiver,
                value,
                location,
            } => {
                if !matches!(receiver, Expr::Access { .. }) {
                    return Err(PlcError::type_error(
                        TypeErrorKind::InvalidAssignmentTarget,
                        "Only variables and fields can be assigned",
                        Some(*location),
                    ));
                }

                let target = self.visit_expr(receiver)?;
                let value_type = self.visit_expr(value)?;
                self.require_assignable(target, value_type, value.location())
            }

            Stmt::If {
                condition,
                then_statements,
                else_statements,
                location,
            } => {
                let condition_type = self.visit_expr(condition)?;
                self.require_assignable(TypeId::BOOLEAN, condition_type, condition.location())?;

                if then_statements.is_empty() {
                    return Err(empty_block("IF", *location));
                }

                self.within_scope(|this| this.visit_statements(then_statements))?;
                self.within_scope(|this| this.visit_statements(else_statements))
            }

            Stmt::For {
                name,
                value,
                statements,
                location,
            } => {
                let iterable = self.visit_expr(value)?;
                if iterable != TypeId::INTEGER_ITERABLE {
                    return Err(PlcError::type_error(
                        TypeErrorKind::TypeMismatch,
                        format!(
                            "Expected IntegerIterable, received {}",
                            self.registry.name(iterable)
                        ),
                        Some(value.location()),
                    ));
                }

                if statements.is_empty() {
                    return Err(empty_block("FOR", *location));
                }

                self.within_scope(|this| {
                    this.define_local(name, TypeId::INTEGER);
                    this.visit_statements(statements)
                })
            }

            Stmt::While {
                condition,
                statements,
                ..
            } => {
                let condition_type = self.visit_expr(condition)?;
                self.require_assignable(TypeId::BOOLEAN, condition_type, condition.location())?;

                self.within_scope(|this| this.visit_statements(statements))
            }

            Stmt::Return { value, .. } => {
                let value_type = self.visit_expr(value)?;
                let expected = self.current_function_return_type.unwrap_or(TypeId::NIL);
                self.require_assignable(expected, value_type, value.location())
            }
        }
    }

    // ===== Expressions =====

    fn visit_expr(&mut self, expr: &mut Expr) -> PlcResult<TypeId> {
        let location = expr.location();

        let ty = match expr {
            Expr::Literal { value, .. } => literal_type(value),

            Expr::Group { expr: inner, .. } => {
                if matches!(**inner, Expr::Binary { .. }) {
                    self.visit_expr(inner)
                } else {
                    Err(PlcError::type_error(
                        TypeErrorKind::InvalidGroup,
                        "Grouped expression must be a binary expression",
                        None,
                    ))
                }
            }

            Expr::Binary {
                operator,
                left,
                right,
                ..
            } => self.visit_binary(*operator, left, right),

            Expr::Access {
                receiver,
                name,
                variable,
                ..
            } => self.resolve_access(receiver.as_deref_mut(), name).map(|resolved| {
                let ty = resolved.binding.ty;
                *variable = Some(resolved);
                ty
            }),

            Expr::Function {
                receiver,
                name,
                arguments,
                function,
                ..
            } => self
                .resolve_call(receiver.as_deref_mut(), name, arguments)
                .map(|resolved| {
                    let ty = resolved.binding.return_type;
                    *function = Some(resolved);
                    ty
                }),
        }
        .map_err(|e| e.or_at(location))?;

        expr.set_ty(ty);
        Ok(ty)
    }

    fn visit_binary(&mut self, operator: BinaryOp, left: &mut Expr, right: &mut Expr) -> PlcResult<TypeId> {
        let left_type = self.visit_expr(left)?;
        let right_type = self.visit_expr(right)?;

        if operator.is_logical() {
            self.require_assignable(TypeId::BOOLEAN, left_type, left.location())?;
            self.require_assignable(TypeId::BOOLEAN, right_type, right.location())?;
            return Ok(TypeId::BOOLEAN);
        }

        if operator.is_comparison() {
            self.require_assignable(TypeId::COMPARABLE, left_type, left.location())?;
            self.require_assignable(TypeId::COMPARABLE, right_type, right.location())?;
            return Ok(TypeId::BOOLEAN);
        }

        arithmetic_result(operator, left_type, right_type).ok_or_else(|| {
            PlcError::type_error(
                TypeErrorKind::TypeMismatch,
                format!(
                    "Operator '{}' cannot be applied to {} and {}",
                    operator,
                    self.registry.name(left_type),
                    self.registry.name(right_type)
                ),
                None,
            )
        })
    }

    fn resolve_access(&mut self, receiver: Option<&mut Expr>, name: &str) -> PlcResult<Resolved<Variable>> {
        match receiver {
            Some(receiver) => {
                let owner = self.visit_expr(receiver)?;
                let field = self.registry.field(owner, name)?;
                Ok(Resolved::member(field))
            }
            None => self
                .scopes
                .lookup_variable(self.scope, name)
                .map(|(variable, depth)| Resolved::scoped(Rc::clone(variable), depth))
                .ok_or_else(|| {
                    PlcError::type_error(
                        TypeErrorKind::UndefinedName,
                        format!("Undefined variable '{}'", name),
                        None,
                    )
                }),
        }
    }

    fn resolve_call(
        &mut self,
        receiver: Option<&mut Expr>,
        name: &str,
        arguments: &mut [Expr],
    ) -> PlcResult<Resolved<Function>> {
        let (resolved, skip) = match receiver {
            Some(receiver) => {
                let owner = self.visit_expr(receiver)?;
                let method = self.registry.method(owner, name, arguments.len())?;
                (Resolved::member(method), 1)
            }
            None => (self.lookup_function(name, arguments.len())?, 0),
        };

        for (argument, &parameter_type) in arguments
            .iter_mut()
            .zip(resolved.binding.parameter_types.iter().skip(skip))
        {
            let argument_type = self.visit_expr(argument)?;
            if !checker::is_assignable(parameter_type, argument_type) {
                return Err(PlcError::type_error(
                    TypeErrorKind::ArgumentTypeMismatch,
                    format!(
                        "Argument to '{}' expected {}, received {}",
                        name,
                        self.registry.name(parameter_type),
                        self.registry.name(argument_type)
                    ),
                    Some(argument.location()),
                ));
            }
        }

        Ok(resolved)
    }

    fn lookup_function(&self, name: &str, arity: usize) -> PlcResult<Resolved<Function>> {
        if let Some((function, depth)) = self.scopes.lookup_function(self.scope, name, arity) {
            return Ok(Resolved::scoped(Rc::clone(function), depth));
        }

        let (kind, message) = if self.scopes.has_function_named(self.scope, name) {
            (
                TypeErrorKind::ArityMismatch,
                format!("Function '{}' does not take {} arguments", name, arity),
            )
        } else {
            (
                TypeErrorKind::UndefinedName,
                format!("Undefined function '{}'", name),
            )
        };
        Err(PlcError::type_error(kind, message, None))
    }

    // ===== Helpers =====

    /// Run `f` in a fresh child scope, restoring the current scope afterwards
    fn within_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> PlcResult<T>) -> PlcResult<T> {
        let parent = self.scope;
        let child = self.scopes.push(parent);
        self.scope = child;

        let result = f(self);

        self.scopes.release(child);
        self.scope = parent;
        result
    }

    fn define_local(&mut self, name: &str, ty: TypeId) -> Rc<Variable> {
        let variable = Rc::new(Variable::new(name, name, ty));
        self.scopes
            .define_variable(self.scope, name, Rc::clone(&variable));
        variable
    }

    fn require_assignable(&self, target: TypeId, source: TypeId, location: SourceLocation) -> PlcResult<()> {
        checker::require_assignable(&self.registry, target, source).map_err(|e| e.or_at(location))
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_type(literal: &Literal) -> PlcResult<TypeId> {
    match literal {
        Literal::Nil => Ok(TypeId::NIL),
        Literal::Boolean(_) => Ok(TypeId::BOOLEAN),
        Literal::Character(_) => Ok(TypeId::CHARACTER),
        Literal::String(_) => Ok(TypeId::STRING),
        Literal::Integer(value) => match value.to_i32() {
            Some(_) => Ok(TypeId::INTEGER),
            None => Err(out_of_range(format!("Integer literal {} does not fit in 32 bits", value))),
        },
        Literal::Decimal(value) => match value.to_f64() {
            Some(float) if float.is_finite() => Ok(TypeId::DECIMAL),
            _ => Err(out_of_range(format!("Decimal literal {} is out of range", value))),
        },
    }
}

fn out_of_range(message: String) -> PlcError {
    PlcError::type_error(TypeErrorKind::OutOfRange, message, None)
}

fn empty_block(keyword: &str, location: SourceLocation) -> PlcError {
    PlcError::type_error(
        TypeErrorKind::EmptyStatementBlock,
        format!("{} body must contain at least one statement", keyword),
        Some(location),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Source {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens).parse().unwrap()
    }

    fn analyze(source: &str) -> PlcResult<Source> {
        let mut ast = parse(source);
        Analyzer::new().analyze(&mut ast)?;
        Ok(ast)
    }

    /// Wrap statements in a valid main method
    fn in_main(body: &str) -> String {
        format!("DEF main(): Integer DO {} RETURN 0; END", body)
    }

    fn error_kind(result: PlcResult<Source>) -> TypeErrorKind {
        match result {
            Err(PlcError::TypeError { kind, .. }) => kind,
            other => panic!("expected type error, got {:?}", other),
        }
    }

    fn return_value(source: &Source) -> &Expr {
        match source.methods[0].statements.last() {
            Some(Stmt::Return { value, .. }) => value,
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_field_is_bound_with_declared_type() {
        let ast = analyze("LET x: Integer = 5; DEF main(): Integer DO RETURN x; END").unwrap();

        let variable = ast.fields[0].variable.as_ref().unwrap();
        assert_eq!(variable.ty, TypeId::INTEGER);

        match return_value(&ast) {
            Expr::Access { variable, ty, .. } => {
                assert_eq!(*ty, Some(TypeId::INTEGER));
                let resolved = variable.as_ref().unwrap();
                assert_eq!(resolved.binding.name, "x");
                assert_eq!(resolved.depth, Some(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_method_signature_is_recorded() {
        let ast = analyze("DEF main(): Integer DO RETURN 0; END DEF f(a: String) DO END").unwrap();
        let f = ast.methods[1].function.as_ref().unwrap();
        assert_eq!(f.parameter_types, vec![TypeId::STRING]);
        assert_eq!(f.return_type, TypeId::NIL);
    }

    #[test]
    fn test_integer_literal_range() {
        assert!(analyze(&in_main("LET a = 2147483647; LET b = -2147483648;")).is_ok());
        assert_eq!(
            error_kind(analyze(&in_main("LET a = 2147483648;"))),
            TypeErrorKind::OutOfRange
        );
        assert_eq!(
            error_kind(analyze(&in_main("LET a = -2147483649;"))),
            TypeErrorKind::OutOfRange
        );
    }

    #[test]
    fn test_decimal_literal_range() {
        let huge = format!("LET a = 1{}.0;", "0".repeat(400));
        assert_eq!(error_kind(analyze(&in_main(&huge))), TypeErrorKind::OutOfRange);
        assert!(analyze(&in_main("LET a = 123.456;")).is_ok());
    }

    #[test]
    fn test_bare_expression_statement_is_rejected() {
        assert_eq!(
            error_kind(analyze(&in_main("1 + 2;"))),
            TypeErrorKind::NonCallExpressionStatement
        );
        assert!(analyze(&in_main("print(1 + 2);")).is_ok());
    }

    #[test]
    fn test_missing_main() {
        for source in [
            "",
            "DEF other(): Integer DO RETURN 0; END",
            "DEF main(): Decimal DO RETURN 0.0; END",
            "DEF main(x: Integer): Integer DO RETURN x; END",
            "DEF main() DO END",
        ] {
            assert_eq!(error_kind(analyze(source)), TypeErrorKind::MissingMain, "{}", source);
        }
    }

    #[test]
    fn test_declarations() {
        assert_eq!(
            error_kind(analyze(&in_main("LET a;"))),
            TypeErrorKind::UntypedDeclaration
        );
        assert_eq!(
            error_kind(analyze(&in_main("LET a: Integer = 1.5;"))),
            TypeErrorKind::TypeMismatch
        );
        assert_eq!(
            error_kind(analyze(&in_main("LET a: Unknown;"))),
            TypeErrorKind::UnknownType
        );

        let ast = analyze(&in_main("LET a = 1.5; LET b: Any = 1;")).unwrap();
        match &ast.methods[0].statements[..2] {
            [Stmt::Declaration { variable: a, .. }, Stmt::Declaration { variable: b, .. }] => {
                assert_eq!(a.as_ref().unwrap().ty, TypeId::DECIMAL);
                assert_eq!(b.as_ref().unwrap().ty, TypeId::ANY);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_assignment() {
        assert!(analyze(&in_main("LET a = 1; a = 2;")).is_ok());
        assert_eq!(
            error_kind(analyze(&in_main("LET a = 1; a = \"s\";"))),
            TypeErrorKind::TypeMismatch
        );
        assert_eq!(
            error_kind(analyze(&in_main("print(1) = 2;"))),
            TypeErrorKind::InvalidAssignmentTarget
        );
    }

    #[test]
    fn test_if_rules() {
        assert!(analyze(&in_main("IF TRUE DO print(1); END")).is_ok());
        assert!(analyze(&in_main("IF TRUE DO print(1); ELSE END")).is_ok());
        assert_eq!(
            error_kind(analyze(&in_main("IF 1 DO print(1); END"))),
            TypeErrorKind::TypeMismatch
        );
        assert_eq!(
            error_kind(analyze(&in_main("IF TRUE DO ELSE print(1); END"))),
            TypeErrorKind::EmptyStatementBlock
        );
    }

    #[test]
    fn test_if_branch_declarations_do_not_escape() {
        assert_eq!(
            error_kind(analyze(&in_main("IF TRUE DO LET y = 1; END print(y);"))),
            TypeErrorKind::UndefinedName
        );
    }

    #[test]
    fn test_for_rules() {
        assert!(analyze(&in_main("FOR i IN range(0, 3) DO print(i + 1); END")).is_ok());
        assert_eq!(
            error_kind(analyze(&in_main("FOR i IN 5 DO print(i); END"))),
            TypeErrorKind::TypeMismatch
        );
        assert_eq!(
            error_kind(analyze(&in_main("FOR i IN range(0, 3) DO END"))),
            TypeErrorKind::EmptyStatementBlock
        );
        assert_eq!(
            error_kind(analyze(&in_main("FOR i IN range(0, 3) DO print(i); END print(i);"))),
            TypeErrorKind::UndefinedName
        );
    }

    #[test]
    fn test_while_rules() {
        assert!(analyze(&in_main("LET i = 0; WHILE i < 3 DO i = i + 1; END")).is_ok());
        assert!(analyze(&in_main("WHILE FALSE DO END")).is_ok());
        assert_eq!(
            error_kind(analyze(&in_main("WHILE 1 DO END"))),
            TypeErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_return_must_match_method_type() {
        assert_eq!(
            error_kind(analyze("DEF main(): Integer DO RETURN \"s\"; END")),
            TypeErrorKind::TypeMismatch
        );
        assert!(analyze(
            "DEF main(): Integer DO RETURN 0; END DEF f(a: Integer): Integer DO RETURN a + 1; END"
        )
        .is_ok());
        assert_eq!(
            error_kind(analyze(
                "DEF main(): Integer DO RETURN 0; END DEF f(a: String): Integer DO RETURN a; END"
            )),
            TypeErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_groups_must_wrap_binary_expressions() {
        assert!(analyze(&in_main("print((1 + 2));")).is_ok());
        assert_eq!(
            error_kind(analyze(&in_main("print((1));"))),
            TypeErrorKind::InvalidGroup
        );
    }

    #[test]
    fn test_binary_typing() {
        let ast = analyze(&in_main("print(1 + \"a\"); print(1.0 * 2.0); print('a' < 'b');")).unwrap();
        let types: Vec<_> = ast.methods[0]
            .statements
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Expression {
                    expr: Expr::Function { arguments, .. },
                    ..
                } => arguments[0].ty(),
                _ => None,
            })
            .collect();
        assert_eq!(types, vec![TypeId::STRING, TypeId::DECIMAL, TypeId::BOOLEAN]);

        for body in [
            "print(1 + 1.0);",
            "print(TRUE AND 1);",
            "print(TRUE < FALSE);",
            "print(\"a\" - \"b\");",
            "print(NIL == NIL);",
        ] {
            assert_eq!(error_kind(analyze(&in_main(body))), TypeErrorKind::TypeMismatch, "{}", body);
        }
    }

    #[test]
    fn test_calls() {
        assert_eq!(
            error_kind(analyze(&in_main("print();"))),
            TypeErrorKind::ArityMismatch
        );
        assert_eq!(
            error_kind(analyze(&in_main("missing();"))),
            TypeErrorKind::UndefinedName
        );
        assert_eq!(
            error_kind(analyze(&in_main("print(undefined);"))),
            TypeErrorKind::UndefinedName
        );
        assert_eq!(
            error_kind(analyze(&in_main("range(0, \"3\");"))),
            TypeErrorKind::ArgumentTypeMismatch
        );
    }

    #[test]
    fn test_recursion_and_forward_calls() {
        let source = "DEF main(): Integer DO RETURN fact(5); END \
                      DEF fact(n: Integer): Integer DO \
                        IF n <= 1 DO RETURN 1; END \
                        RETURN n * fact(n - 1); \
                      END";
        // main is visited before fact is bound
        assert_eq!(error_kind(analyze(source)), TypeErrorKind::UndefinedName);

        let source = "DEF fact(n: Integer): Integer DO \
                        IF n <= 1 DO RETURN 1; END \
                        RETURN n * fact(n - 1); \
                      END \
                      DEF main(): Integer DO RETURN fact(5); END";
        assert!(analyze(source).is_ok());
    }

    #[test]
    fn test_receiver_members_come_from_the_registry() {
        let mut analyzer = Analyzer::new();
        let point = analyzer.registry_mut().register("Point", "Point");
        analyzer.registry_mut().define_field(point, "x", TypeId::INTEGER);
        analyzer
            .registry_mut()
            .define_method(point, "scale", vec![point, TypeId::INTEGER], point);
        analyzer.define_variable("p", point);

        let mut ast = parse(&in_main("p.x = p.scale(2).x + 1;"));
        analyzer.analyze(&mut ast).unwrap();

        match &ast.methods[0].statements[0] {
            Stmt::Assignment { receiver, .. } => match receiver {
                Expr::Access { variable, ty, .. } => {
                    assert_eq!(*ty, Some(TypeId::INTEGER));
                    assert_eq!(variable.as_ref().unwrap().depth, None);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }

        let mut ast = parse(&in_main("p.scale(TRUE);"));
        let err = analyzer.analyze(&mut ast).unwrap_err();
        assert!(matches!(
            err,
            PlcError::TypeError {
                kind: TypeErrorKind::ArgumentTypeMismatch,
                ..
            }
        ));

        let mut ast = parse(&in_main("print(p.y);"));
        let err = analyzer.analyze(&mut ast).unwrap_err();
        assert!(matches!(
            err,
            PlcError::TypeError {
                kind: TypeErrorKind::UndefinedName,
                ..
            }
        ));
    }

    #[test]
    fn test_resolution_depth_tracks_nesting() {
        let ast = analyze(
            "LET g: Integer = 1; \
             DEF main(): Integer DO LET a = 2; IF TRUE DO print(a + g); END RETURN 0; END",
        )
        .unwrap();

        let Stmt::If { then_statements, .. } = &ast.methods[0].statements[1] else {
            panic!("expected if");
        };
        let Stmt::Expression {
            expr: Expr::Function { arguments, function, .. },
            ..
        } = &then_statements[0]
        else {
            panic!("expected call");
        };
        assert_eq!(function.as_ref().unwrap().depth, Some(2));

        let Expr::Binary { left, right, .. } = &arguments[0] else {
            panic!("expected binary");
        };
        let depth = |expr: &Expr| match expr {
            Expr::Access { variable, .. } => variable.as_ref().and_then(|v| v.depth),
            _ => None,
        };
        assert_eq!(depth(left), Some(1));
        assert_eq!(depth(right), Some(2));
    }

    #[test]
    fn test_scope_is_restored_on_success_and_failure() {
        let mut analyzer = Analyzer::new();
        let mut ast = parse(
            "DEF main(): Integer DO \
               FOR i IN range(0, 3) DO WHILE TRUE DO IF i == 1 DO RETURN i; END RETURN 0; END END \
               RETURN 0; \
             END",
        );
        analyzer.analyze(&mut ast).unwrap();
        assert_eq!(analyzer.scope, ScopeId::ROOT);
        assert_eq!(analyzer.scopes.len(), 1);

        let mut analyzer = Analyzer::new();
        let mut ast = parse(
            "DEF main(): Integer DO \
               WHILE TRUE DO IF TRUE DO RETURN missing; END END \
               RETURN 0; \
             END",
        );
        match analyzer.analyze(&mut ast) {
            Err(PlcError::TypeError { kind, .. }) => assert_eq!(kind, TypeErrorKind::UndefinedName),
            other => panic!("expected type error, got {:?}", other),
        }
        assert_eq!(analyzer.scope, ScopeId::ROOT);
        assert_eq!(analyzer.scopes.len(), 1);
    }

    #[test]
    fn test_error_points_at_offending_expression() {
        let result = analyze("LET x: Integer = \"s\"; DEF main(): Integer DO RETURN 0; END");
        let err = result.unwrap_err();
        assert_eq!(err.location().map(|l| l.offset), Some(17));
    }
}
