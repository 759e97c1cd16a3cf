//! Physical qubit and classical bit handles used after lowering.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::span::Span;

/// Handle of a physical qubit allocated by lowering.
///
/// Handles are numbered in allocation order; the emitter assigns the final
/// register indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitRef(pub u32);

impl fmt::Display for QubitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%q{}", self.0)
    }
}

impl From<u32> for QubitRef {
    fn from(id: u32) -> Self {
        QubitRef(id)
    }
}

/// Handle of a classical bit holding a measurement result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BitRef(pub u32);

impl fmt::Display for BitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%b{}", self.0)
    }
}

impl From<u32> for BitRef {
    fn from(id: u32) -> Self {
        BitRef(id)
    }
}

/// Source-level origin of an allocated qubit or bit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Origin {
    /// Name of the binding that introduced it.
    pub name: String,
    /// Where it was introduced.
    pub span: Span,
}

impl Origin {
    /// Create an origin record.
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        assert_eq!(QubitRef(3).to_string(), "%q3");
        assert_eq!(BitRef::from(1).to_string(), "%b1");
        assert_eq!(Origin::new("ancilla", Span::new(4, 1)).to_string(), "ancilla (4:1)");
    }
}
