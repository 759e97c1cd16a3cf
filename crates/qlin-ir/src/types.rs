//! Declared types of the source language.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A declared or inferred type.
///
/// Only [`Type::Qubit`] and references to it are subject to the linearity
/// rules; every other type is classical and freely copyable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// A quantum bit.
    Qubit,
    /// A classical bit (the result of a measurement).
    Bit,
    /// A classical integer.
    Integer,
    /// The empty type returned by procedures.
    Unit,
    /// A non-owning alias.
    Reference(Box<Type>),
    /// A function type.
    Function {
        /// Parameter types, in order.
        params: Vec<Type>,
        /// Return type.
        ret: Box<Type>,
    },
    /// A user-defined algebraic data type.
    UserType {
        /// Type name.
        name: String,
        /// Type arguments.
        args: Vec<Type>,
    },
}

impl Type {
    /// Create a reference to `inner`.
    pub fn reference(inner: Type) -> Self {
        Type::Reference(Box::new(inner))
    }

    /// Shorthand for `ref qubit`.
    pub fn qubit_ref() -> Self {
        Type::reference(Type::Qubit)
    }

    /// Create a function type.
    pub fn function(params: Vec<Type>, ret: Type) -> Self {
        Type::Function {
            params,
            ret: Box::new(ret),
        }
    }

    /// Create a user type.
    pub fn user(name: impl Into<String>, args: Vec<Type>) -> Self {
        Type::UserType {
            name: name.into(),
            args,
        }
    }

    /// Whether this is exactly `qubit`.
    #[inline]
    pub fn is_qubit(&self) -> bool {
        matches!(self, Type::Qubit)
    }

    /// Whether this is `ref qubit`.
    #[inline]
    pub fn is_qubit_ref(&self) -> bool {
        matches!(self, Type::Reference(inner) if inner.is_qubit())
    }

    /// Whether values of this type are tracked by the linearity rules.
    #[inline]
    pub fn is_linear(&self) -> bool {
        self.is_qubit() || self.is_qubit_ref()
    }

    /// Whether a qubit appears anywhere inside this type.
    pub fn carries_qubit(&self) -> bool {
        match self {
            Type::Qubit => true,
            Type::Bit | Type::Integer | Type::Unit => false,
            Type::Reference(inner) => inner.carries_qubit(),
            Type::Function { params, ret } => {
                params.iter().any(Type::carries_qubit) || ret.carries_qubit()
            }
            Type::UserType { args, .. } => args.iter().any(Type::carries_qubit),
        }
    }

    /// Strip one level of reference, if any.
    pub fn referent(&self) -> Option<&Type> {
        match self {
            Type::Reference(inner) => Some(inner),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Qubit => write!(f, "qubit"),
            Type::Bit => write!(f, "bit"),
            Type::Integer => write!(f, "int"),
            Type::Unit => write!(f, "unit"),
            Type::Reference(inner) => write!(f, "ref {inner}"),
            Type::Function { params, ret } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::UserType { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
        }
    }
}

/// Mutability class of a binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mutability {
    /// Declared with `val`.
    #[default]
    Immutable,
    /// Declared with `var`.
    Mutable,
}

impl Mutability {
    /// Whether re-assignment is allowed.
    pub fn is_mutable(self) -> bool {
        matches!(self, Mutability::Mutable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_types() {
        assert!(Type::Qubit.is_linear());
        assert!(Type::qubit_ref().is_linear());
        assert!(!Type::Bit.is_linear());
        assert!(!Type::reference(Type::Integer).is_linear());
    }

    #[test]
    fn test_carries_qubit() {
        assert!(Type::user("Pair", vec![Type::Integer, Type::Qubit]).carries_qubit());
        assert!(!Type::user("Pair", vec![Type::Integer, Type::Bit]).carries_qubit());
        assert!(Type::function(vec![Type::qubit_ref()], Type::Unit).carries_qubit());
    }

    #[test]
    fn test_type_display() {
        assert_eq!(Type::qubit_ref().to_string(), "ref qubit");
        assert_eq!(
            Type::function(vec![Type::qubit_ref(), Type::Bit], Type::Unit).to_string(),
            "(ref qubit, bit) -> unit"
        );
        assert_eq!(Type::user("List", vec![Type::Integer]).to_string(), "List<int>");
    }
}
