//! Type definitions
//!
//! Types are nominal: a `TypeId` is an index into the `TypeRegistry`, and
//! two types are equal only when they are the same registered entry. The
//! registry also owns the field and method tables of each type.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{PlcError, PlcResult, TypeErrorKind};

/// Handle to a registered type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

impl TypeId {
    pub const ANY: TypeId = TypeId(0);
    pub const NIL: TypeId = TypeId(1);
    /// Pseudo-type accepted only as an assignment target; it has no name in
    /// the registry, so source code can never declare a value of it.
    pub const COMPARABLE: TypeId = TypeId(2);
    pub const BOOLEAN: TypeId = TypeId(3);
    pub const INTEGER: TypeId = TypeId(4);
    pub const DECIMAL: TypeId = TypeId(5);
    pub const CHARACTER: TypeId = TypeId(6);
    pub const STRING: TypeId = TypeId(7);
    pub const INTEGER_ITERABLE: TypeId = TypeId(8);
}

/// A variable binding: fields, locals, parameters and type members
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub host_name: String,
    pub ty: TypeId,
}

impl Variable {
    pub fn new(name: impl Into<String>, host_name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            host_name: host_name.into(),
            ty,
        }
    }
}

/// A function signature; methods on a type list the receiver type first
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub host_name: String,
    pub parameter_types: Vec<TypeId>,
    pub return_type: TypeId,
}

impl Function {
    pub fn new(
        name: impl Into<String>,
        host_name: impl Into<String>,
        parameter_types: Vec<TypeId>,
        return_type: TypeId,
    ) -> Self {
        Self {
            name: name.into(),
            host_name: host_name.into(),
            parameter_types,
            return_type,
        }
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

/// A binding resolved by the analyzer and written onto the AST.
///
/// `depth` is the number of scope hops from the use site to the frame that
/// declares the binding; it is `None` for members reached through a receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub binding: Rc<T>,
    pub depth: Option<usize>,
}

impl<T> Resolved<T> {
    pub fn scoped(binding: Rc<T>, depth: usize) -> Self {
        Self {
            binding,
            depth: Some(depth),
        }
    }

    pub fn member(binding: Rc<T>) -> Self {
        Self {
            binding,
            depth: None,
        }
    }
}

/// Descriptor for one nominal type
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub host_name: String,
    fields: HashMap<String, Rc<Variable>>,
    methods: HashMap<(String, usize), Rc<Function>>,
}

impl TypeDescriptor {
    fn new(name: &str, host_name: &str) -> Self {
        Self {
            name: name.to_string(),
            host_name: host_name.to_string(),
            fields: HashMap::new(),
            methods: HashMap::new(),
        }
    }
}

/// Interned table of every known type
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: Vec<TypeDescriptor>,
    by_name: HashMap<String, TypeId>,
}

impl TypeRegistry {
    /// Create a registry holding the built-in types
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            by_name: HashMap::new(),
        };

        // Order must match the `TypeId` constants
        registry.register("Any", "Object");
        registry.register("Nil", "Void");
        registry.types.push(TypeDescriptor::new("Comparable", "Comparable"));
        registry.register("Boolean", "boolean");
        registry.register("Integer", "int");
        registry.register("Decimal", "double");
        registry.register("Character", "char");
        registry.register("String", "String");
        registry.register("IntegerIterable", "Iterable<Integer>");

        registry
    }

    /// Register a nominal type, returning the existing one if the name is taken
    pub fn register(&mut self, name: &str, host_name: &str) -> TypeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }

        let id = TypeId(self.types.len());
        self.types.push(TypeDescriptor::new(name, host_name));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Resolve a type name written in source
    pub fn lookup(&self, name: &str) -> PlcResult<TypeId> {
        self.by_name.get(name).copied().ok_or_else(|| {
            PlcError::type_error(
                TypeErrorKind::UnknownType,
                format!("Unknown type '{}'", name),
                None,
            )
        })
    }

    pub fn descriptor(&self, id: TypeId) -> &TypeDescriptor {
        &self.types[id.0]
    }

    pub fn name(&self, id: TypeId) -> &str {
        &self.descriptor(id).name
    }

    /// Add a field to a type
    pub fn define_field(&mut self, owner: TypeId, name: &str, ty: TypeId) -> Rc<Variable> {
        let variable = Rc::new(Variable::new(name, name, ty));
        self.types[owner.0]
            .fields
            .insert(name.to_string(), Rc::clone(&variable));
        variable
    }

    /// Add a method to a type; `parameter_types[0]` is the receiver
    pub fn define_method(
        &mut self,
        owner: TypeId,
        name: &str,
        parameter_types: Vec<TypeId>,
        return_type: TypeId,
    ) -> Rc<Function> {
        let function = Rc::new(Function::new(name, name, parameter_types, return_type));
        self.types[owner.0]
            .methods
            .insert((name.to_string(), function.arity()), Rc::clone(&function));
        function
    }

    /// Look up a field on a receiver type
    pub fn field(&self, owner: TypeId, name: &str) -> PlcResult<Rc<Variable>> {
        self.descriptor(owner).fields.get(name).cloned().ok_or_else(|| {
            PlcError::type_error(
                TypeErrorKind::UndefinedName,
                format!("Type '{}' has no field '{}'", self.name(owner), name),
                None,
            )
        })
    }

    /// Look up a method on a receiver type by its explicit argument count
    pub fn method(&self, owner: TypeId, name: &str, argument_count: usize) -> PlcResult<Rc<Function>> {
        let descriptor = self.descriptor(owner);
        if let Some(function) = descriptor.methods.get(&(name.to_string(), argument_count + 1)) {
            return Ok(Rc::clone(function));
        }

        let (kind, message) = if descriptor.methods.keys().any(|(n, _)| n == name) {
            (
                TypeErrorKind::ArityMismatch,
                format!(
                    "Method '{}' of type '{}' does not take {} arguments",
                    name,
                    self.name(owner),
                    argument_count
                ),
            )
        } else {
            (
                TypeErrorKind::UndefinedName,
                format!("Type '{}' has no method '{}'", self.name(owner), name),
            )
        };
        Err(PlcError::type_error(kind, message, None))
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_kind<T: fmt::Debug>(result: PlcResult<T>) -> TypeErrorKind {
        match result {
            Err(PlcError::TypeError { kind, .. }) => kind,
            other => panic!("expected type error, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_names_resolve_to_constants() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.lookup("Any").unwrap(), TypeId::ANY);
        assert_eq!(registry.lookup("Nil").unwrap(), TypeId::NIL);
        assert_eq!(registry.lookup("Boolean").unwrap(), TypeId::BOOLEAN);
        assert_eq!(registry.lookup("Integer").unwrap(), TypeId::INTEGER);
        assert_eq!(registry.lookup("Decimal").unwrap(), TypeId::DECIMAL);
        assert_eq!(registry.lookup("Character").unwrap(), TypeId::CHARACTER);
        assert_eq!(registry.lookup("String").unwrap(), TypeId::STRING);
        assert_eq!(registry.lookup("IntegerIterable").unwrap(), TypeId::INTEGER_ITERABLE);
        assert_eq!(registry.descriptor(TypeId::INTEGER).host_name, "int");
    }

    #[test]
    fn test_comparable_is_not_nameable() {
        let registry = TypeRegistry::new();
        assert_eq!(error_kind(registry.lookup("Comparable")), TypeErrorKind::UnknownType);
        assert_eq!(registry.name(TypeId::COMPARABLE), "Comparable");
    }

    #[test]
    fn test_register_is_idempotent_by_name() {
        let mut registry = TypeRegistry::new();
        let first = registry.register("Point", "Point");
        let second = registry.register("Point", "Other");
        assert_eq!(first, second);
        assert_ne!(first, TypeId::ANY);
        assert_eq!(registry.descriptor(first).host_name, "Point");
    }

    #[test]
    fn test_fields_and_methods() {
        let mut registry = TypeRegistry::new();
        let point = registry.register("Point", "Point");
        registry.define_field(point, "x", TypeId::INTEGER);
        registry.define_method(point, "scale", vec![point, TypeId::INTEGER], point);

        assert_eq!(registry.field(point, "x").unwrap().ty, TypeId::INTEGER);
        assert_eq!(registry.method(point, "scale", 1).unwrap().return_type, point);
        assert_eq!(error_kind(registry.field(point, "y")), TypeErrorKind::UndefinedName);
        assert_eq!(error_kind(registry.method(point, "scale", 0)), TypeErrorKind::ArityMismatch);
        assert_eq!(error_kind(registry.method(point, "rotate", 0)), TypeErrorKind::UndefinedName);
    }
}
