//! Lexically scoped type environment.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use qlin_ir::{Function, Mutability, Span, Type};

use crate::linearity::QubitSlot;

/// Identity of one binding, unique across the whole program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BindingId(pub u32);

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}", self.0)
    }
}

/// How a binding reaches its qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QubitHandle {
    /// The binding owns the qubit.
    Owned(QubitSlot),
    /// The binding is a `ref qubit` alias of a qubit owned elsewhere.
    Aliased(QubitSlot),
}

impl QubitHandle {
    /// The tracked qubit, whichever way it is reached.
    pub fn slot(self) -> QubitSlot {
        match self {
            QubitHandle::Owned(slot) | QubitHandle::Aliased(slot) => slot,
        }
    }
}

/// A name introduced by a `val`/`var` declaration or a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub id: BindingId,
    pub name: String,
    pub ty: Type,
    pub mutability: Mutability,
    pub span: Span,
    /// Set for `qubit` and `ref qubit` bindings.
    pub handle: Option<QubitHandle>,
}

impl Binding {
    /// The tracked qubit, if this binding reaches one.
    pub fn slot(&self) -> Option<QubitSlot> {
        self.handle.map(QubitHandle::slot)
    }

    /// Whether this binding holds or aliases a qubit.
    pub fn is_quantum(&self) -> bool {
        self.handle.is_some()
    }
}

/// Declared signature of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
    pub span: Span,
}

impl From<&Function> for FunctionSig {
    fn from(function: &Function) -> Self {
        Self {
            name: function.name.clone(),
            params: function.params.iter().map(|p| p.ty.clone()).collect(),
            ret: function.ret.clone(),
            span: function.span,
        }
    }
}

type Scope = FxHashMap<String, BindingId>;

/// Saved scope stack of an enclosing body.
#[derive(Debug)]
pub struct SavedScopes(Vec<Scope>);

/// Maps identifiers to bindings through a stack of lexical scopes.
///
/// Lookup walks from the innermost scope outwards, so inner declarations
/// shadow outer ones. Bindings themselves are kept in an arena that
/// outlives every scope; popping a scope only removes the names.
#[derive(Debug, Default)]
pub struct TypeEnv {
    bindings: Vec<Binding>,
    scopes: Vec<Scope>,
    functions: FxHashMap<String, FunctionSig>,
}

impl TypeEnv {
    /// Create an environment with one empty root scope.
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
            scopes: vec![Scope::default()],
            functions: FxHashMap::default(),
        }
    }

    /// Register a function signature. The first declaration of a name wins.
    pub fn declare_function(&mut self, sig: FunctionSig) {
        self.functions.entry(sig.name.clone()).or_insert(sig);
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSig> {
        self.functions.get(name)
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Introduce a binding in the innermost scope.
    pub fn bind(
        &mut self,
        name: &str,
        ty: Type,
        mutability: Mutability,
        span: Span,
        handle: Option<QubitHandle>,
    ) -> BindingId {
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(Binding {
            id,
            name: name.to_string(),
            ty,
            mutability,
            span,
            handle,
        });
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), id);
        }
        id
    }

    /// Resolve a name from the innermost scope outwards.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .and_then(|id| self.binding(*id))
    }

    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.0 as usize)
    }

    /// Start a separate body (a function), hiding every local scope.
    pub fn enter_body(&mut self) -> SavedScopes {
        SavedScopes(std::mem::replace(&mut self.scopes, vec![Scope::default()]))
    }

    /// Restore the scopes stashed by [`enter_body`](Self::enter_body).
    pub fn exit_body(&mut self, saved: SavedScopes) {
        self.scopes = saved.0;
    }

    /// Consume the environment, returning the binding arena.
    pub fn into_bindings(self) -> Vec<Binding> {
        self.bindings
    }
}
