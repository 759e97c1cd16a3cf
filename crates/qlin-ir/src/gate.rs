//! The closed gate catalog.
//!
//! Every gate is either one of the registered single-qubit gates or the
//! controlled form `c<G>` of one of them, which takes one extra leading
//! control reference. There is no registration of arbitrary unitaries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Registered single-qubit gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseGate {
    /// Hadamard gate.
    Had,
    /// Pauli-X gate.
    Px,
    /// Pauli-Z gate.
    Pz,
}

impl BaseGate {
    /// All registered single-qubit gates, in catalog order.
    pub const ALL: [BaseGate; 3] = [BaseGate::Had, BaseGate::Px, BaseGate::Pz];

    /// Catalog identifier.
    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            BaseGate::Had => "had",
            BaseGate::Px => "px",
            BaseGate::Pz => "pz",
        }
    }

    /// Name of the equivalent `OpenQASM` 3 standard gate.
    #[inline]
    pub fn qasm_name(self) -> &'static str {
        match self {
            BaseGate::Had => "h",
            BaseGate::Px => "x",
            BaseGate::Pz => "z",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }
}

/// Role of one operand in a gate's reference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandRole {
    /// A control qubit.
    Control,
    /// The qubit the base gate acts on.
    Target,
}

/// Catalog entry for a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GateSpec {
    /// The single-qubit gate this entry is derived from.
    pub base: BaseGate,
    /// Whether this is the controlled form.
    pub controlled: bool,
}

impl GateSpec {
    /// The plain single-qubit form of `base`.
    pub const fn single(base: BaseGate) -> Self {
        Self {
            base,
            controlled: false,
        }
    }

    /// The controlled form of `base`.
    pub const fn controlled(base: BaseGate) -> Self {
        Self {
            base,
            controlled: true,
        }
    }

    /// Catalog identifier (`had`, `cx`, `cpz`, ...).
    pub fn name(&self) -> &'static str {
        match (self.base, self.controlled) {
            (base, false) => base.name(),
            (BaseGate::Had, true) => "chad",
            (BaseGate::Px, true) => "cx",
            (BaseGate::Pz, true) => "cpz",
        }
    }

    /// Name of the equivalent `OpenQASM` 3 standard gate.
    pub fn qasm_name(&self) -> &'static str {
        match (self.base, self.controlled) {
            (base, false) => base.qasm_name(),
            (BaseGate::Had, true) => "ch",
            (BaseGate::Px, true) => "cx",
            (BaseGate::Pz, true) => "cz",
        }
    }

    /// Number of qubit references a call site must supply.
    #[inline]
    pub fn arity(&self) -> usize {
        if self.controlled { 2 } else { 1 }
    }

    /// Roles of the operands, in call order.
    pub fn operands(&self) -> &'static [OperandRole] {
        if self.controlled {
            &[OperandRole::Control, OperandRole::Target]
        } else {
            &[OperandRole::Target]
        }
    }
}

impl fmt::Display for GateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lookup over the closed gate catalog.
pub struct GateCatalog;

impl GateCatalog {
    /// Resolve a gate identifier.
    ///
    /// Accepts every base gate name and `c<base>` for its controlled form;
    /// `cx` is the conventional spelling of `cpx`.
    pub fn lookup(name: &str) -> Option<GateSpec> {
        if let Some(base) = BaseGate::from_name(name) {
            return Some(GateSpec::single(base));
        }
        if name == "cx" {
            return Some(GateSpec::controlled(BaseGate::Px));
        }
        name.strip_prefix('c')
            .and_then(BaseGate::from_name)
            .map(GateSpec::controlled)
    }

    /// Every catalog entry: base gates first, then their controlled forms.
    pub fn entries() -> impl Iterator<Item = GateSpec> {
        BaseGate::ALL
            .into_iter()
            .map(GateSpec::single)
            .chain(BaseGate::ALL.into_iter().map(GateSpec::controlled))
    }
}
