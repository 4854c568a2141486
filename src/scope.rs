//! Lexical scope arena
//!
//! Frames live in one vector and point at their parent by index. The
//! analyzer stores type bindings in it and the interpreter stores values,
//! so both walk exactly the same chain shape. Frames are released in LIFO
//! order, which lets `release` simply truncate the vector.

use std::collections::HashMap;

/// Index of a frame in a `Scopes` arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    /// The global frame, which is never released
    pub const ROOT: ScopeId = ScopeId(0);
}

#[derive(Debug, Clone)]
struct Frame<V, F> {
    parent: Option<ScopeId>,
    variables: HashMap<String, V>,
    functions: HashMap<(String, usize), F>,
}

impl<V, F> Frame<V, F> {
    fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            variables: HashMap::new(),
            functions: HashMap::new(),
        }
    }
}

/// Arena of scope frames holding variables of type `V` and functions of type `F`
#[derive(Debug, Clone)]
pub struct Scopes<V, F> {
    frames: Vec<Frame<V, F>>,
}

impl<V, F> Scopes<V, F> {
    /// Create an arena containing only the root frame
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(None)],
        }
    }

    /// Open a child frame of `parent`
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.frames.len());
        self.frames.push(Frame::new(Some(parent)));
        id
    }

    /// Discard `id` and every frame opened after it
    pub fn release(&mut self, id: ScopeId) {
        if id != ScopeId::ROOT {
            self.frames.truncate(id.0);
        }
    }

    /// Number of live frames, root included
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn define_variable(&mut self, scope: ScopeId, name: impl Into<String>, value: V) {
        if let Some(frame) = self.frames.get_mut(scope.0) {
            frame.variables.insert(name.into(), value);
        }
    }

    pub fn define_function(&mut self, scope: ScopeId, name: impl Into<String>, arity: usize, function: F) {
        if let Some(frame) = self.frames.get_mut(scope.0) {
            frame.functions.insert((name.into(), arity), function);
        }
    }

    /// Find the nearest variable called `name`, with its distance from `scope`
    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<(&V, usize)> {
        self.chain(scope)
            .enumerate()
            .find_map(|(depth, frame)| frame.variables.get(name).map(|v| (v, depth)))
    }

    /// Find the nearest function matching `name` and `arity`, with its distance from `scope`
    pub fn lookup_function(&self, scope: ScopeId, name: &str, arity: usize) -> Option<(&F, usize)> {
        let key = (name.to_string(), arity);
        self.chain(scope)
            .enumerate()
            .find_map(|(depth, frame)| frame.functions.get(&key).map(|f| (f, depth)))
    }

    /// Whether any visible frame defines a function called `name`, at any arity
    pub fn has_function_named(&self, scope: ScopeId, name: &str) -> bool {
        self.chain(scope)
            .any(|frame| frame.functions.keys().any(|(n, _)| n == name))
    }

    /// Variable in the frame exactly `depth` hops above `scope`
    pub fn variable_at(&self, scope: ScopeId, depth: usize, name: &str) -> Option<&V> {
        self.chain(scope).nth(depth)?.variables.get(name)
    }

    pub fn variable_at_mut(&mut self, scope: ScopeId, depth: usize, name: &str) -> Option<&mut V> {
        let target = self.ancestor(scope, depth)?;
        self.frames.get_mut(target.0)?.variables.get_mut(name)
    }

    /// Nearest variable called `name`, mutably
    pub fn lookup_variable_mut(&mut self, scope: ScopeId, name: &str) -> Option<&mut V> {
        let (_, depth) = self.lookup_variable(scope, name)?;
        self.variable_at_mut(scope, depth, name)
    }

    /// Function in the frame exactly `depth` hops above `scope`
    pub fn function_at(&self, scope: ScopeId, depth: usize, name: &str, arity: usize) -> Option<&F> {
        self.chain(scope)
            .nth(depth)?
            .functions
            .get(&(name.to_string(), arity))
    }

    fn ancestor(&self, scope: ScopeId, depth: usize) -> Option<ScopeId> {
        let mut current = scope;
        for _ in 0..depth {
            current = self.frames.get(current.0)?.parent?;
        }
        Some(current)
    }

    /// Frames from `scope` outward to the root
    fn chain(&self, scope: ScopeId) -> impl Iterator<Item = &Frame<V, F>> {
        let mut next = Some(scope);
        std::iter::from_fn(move || {
            let frame = self.frames.get(next?.0)?;
            next = frame.parent;
            Some(frame)
        })
    }
}

impl<V, F> Default for Scopes<V, F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestScopes = Scopes<i32, &'static str>;

    #[test]
    fn test_lookup_walks_outward_with_depth() {
        let mut scopes = TestScopes::new();
        scopes.define_variable(ScopeId::ROOT, "x", 1);
        let inner = scopes.push(ScopeId::ROOT);
        let innermost = scopes.push(inner);

        assert_eq!(scopes.lookup_variable(innermost, "x"), Some((&1, 2)));
        assert_eq!(scopes.lookup_variable(innermost, "y"), None);
    }

    #[test]
    fn test_shadowing_leaves_outer_binding_alone() {
        let mut scopes = TestScopes::new();
        scopes.define_variable(ScopeId::ROOT, "x", 1);
        let inner = scopes.push(ScopeId::ROOT);
        scopes.define_variable(inner, "x", 2);

        assert_eq!(scopes.lookup_variable(inner, "x"), Some((&2, 0)));
        scopes.release(inner);
        assert_eq!(scopes.lookup_variable(ScopeId::ROOT, "x"), Some((&1, 0)));
    }

    #[test]
    fn test_release_truncates_later_frames() {
        let mut scopes = TestScopes::new();
        let a = scopes.push(ScopeId::ROOT);
        let _b = scopes.push(a);
        assert_eq!(scopes.len(), 3);

        scopes.release(a);
        assert_eq!(scopes.len(), 1);

        scopes.release(ScopeId::ROOT);
        assert_eq!(scopes.len(), 1);
    }

    #[test]
    fn test_functions_are_keyed_by_arity() {
        let mut scopes = TestScopes::new();
        scopes.define_function(ScopeId::ROOT, "f", 1, "one");
        scopes.define_function(ScopeId::ROOT, "f", 2, "two");
        let inner = scopes.push(ScopeId::ROOT);

        assert_eq!(scopes.lookup_function(inner, "f", 2), Some((&"two", 1)));
        assert_eq!(scopes.lookup_function(inner, "f", 3), None);
        assert!(scopes.has_function_named(inner, "f"));
        assert!(!scopes.has_function_named(inner, "g"));
        assert_eq!(scopes.function_at(inner, 1, "f", 1), Some(&"one"));
        assert_eq!(scopes.function_at(inner, 0, "f", 1), None);
    }

    #[test]
    fn test_access_at_known_depth() {
        let mut scopes = TestScopes::new();
        scopes.define_variable(ScopeId::ROOT, "x", 1);
        let inner = scopes.push(ScopeId::ROOT);
        scopes.define_variable(inner, "x", 2);

        assert_eq!(scopes.variable_at(inner, 1, "x"), Some(&1));
        *scopes.variable_at_mut(inner, 1, "x").unwrap() = 10;
        assert_eq!(scopes.variable_at(ScopeId::ROOT, 0, "x"), Some(&10));
        assert_eq!(scopes.variable_at(inner, 5, "x"), None);

        *scopes.lookup_variable_mut(inner, "x").unwrap() = 20;
        assert_eq!(scopes.variable_at(inner, 0, "x"), Some(&20));
    }

    #[test]
    fn test_sibling_frames_do_not_see_each_other() {
        let mut scopes = TestScopes::new();
        let method = scopes.push(ScopeId::ROOT);
        scopes.define_variable(method, "local", 1);
        let call = scopes.push(ScopeId::ROOT);

        assert_eq!(scopes.lookup_variable(call, "local"), None);
    }
}
