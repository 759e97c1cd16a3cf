//! Per-qubit state machine.
//!
//! Every qubit binding moves through `Uninitialized -> Live -> Measured`.
//! The transition table is total: an event either yields the next state or
//! the diagnostic kind that forbids it. There are no other transitions.
//!
//! | state \ event | `Initialize` | `ApplyGate` | `Measure` |
//! |---------------|--------------|-------------|-----------|
//! | Uninitialized | Live | uninitialized-qubit | uninitialized-qubit |
//! | Live | immutable-qubit-binding | Live | Measured |
//! | Measured | immutable-qubit-binding | gate-on-measured-qubit | gate-on-measured-qubit |

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use qlin_ir::{Diagnostic, DiagnosticKind, Span};

use crate::env::Binding;

/// Identity of one tracked qubit.
///
/// A `ref` parameter or local alias shares the slot of the qubit it refers
/// to, so every path to the same qubit observes the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitSlot(pub u32);

impl fmt::Display for QubitSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.0)
    }
}

/// Lifecycle state of a qubit.
///
/// The derived ordering follows the lifecycle, which is what branch merging
/// relies on: the later state wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QubitState {
    /// Declared without a value.
    Uninitialized,
    /// Holds a value; gates may be applied.
    Live,
    /// Collapsed by a measurement.
    Measured,
}

impl fmt::Display for QubitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QubitState::Uninitialized => write!(f, "uninitialized"),
            QubitState::Live => write!(f, "live"),
            QubitState::Measured => write!(f, "measured"),
        }
    }
}

/// Something that happens to a qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinearityEvent {
    /// Assignment of a fresh literal.
    Initialize,
    /// A gate names the qubit as an operand.
    ApplyGate,
    /// A measurement names the qubit.
    Measure,
}

/// The transition table.
pub fn transition(state: QubitState, event: LinearityEvent) -> Result<QubitState, DiagnosticKind> {
    use LinearityEvent::*;
    use QubitState::*;

    match (state, event) {
        (Uninitialized, Initialize) => Ok(Live),
        (Uninitialized, ApplyGate | Measure) => Err(DiagnosticKind::UninitializedQubit),
        (Live, ApplyGate) => Ok(Live),
        (Live, Measure) => Ok(Measured),
        (Live | Measured, Initialize) => Err(DiagnosticKind::ImmutableQubitBinding),
        (Measured, ApplyGate | Measure) => Err(DiagnosticKind::GateOnMeasuredQubit),
    }
}

/// A recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The qubit that changed.
    pub slot: QubitSlot,
    /// State before the event.
    pub from: QubitState,
    /// State after the event.
    pub to: QubitState,
}

type Frame = FxHashMap<QubitSlot, QubitState>;

/// Saved tracker frames of an enclosing body.
#[derive(Debug)]
pub struct SavedFrames(Vec<Frame>);

/// Tracks the state of every qubit slot through nested scopes.
///
/// Entering a scope copies the current states; leaving it hands the copy
/// back so the caller can merge it. Slot numbers are never reused, even
/// across function bodies.
#[derive(Debug)]
pub struct LinearityTracker {
    frames: Vec<Frame>,
    next_slot: u32,
}

impl LinearityTracker {
    /// Create a tracker with one empty root frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            next_slot: 0,
        }
    }

    fn current(&self) -> &Frame {
        // The root frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    fn current_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Allocate a fresh slot in the given state.
    pub fn allocate(&mut self, state: QubitState) -> QubitSlot {
        let slot = QubitSlot(self.next_slot);
        self.next_slot += 1;
        self.current_mut().insert(slot, state);
        slot
    }

    /// Current state of a slot.
    pub fn state(&self, slot: QubitSlot) -> Option<QubitState> {
        self.current().get(&slot).copied()
    }

    /// Apply `event` to the qubit behind `binding`.
    ///
    /// On failure the state is left unchanged and the diagnostic names the
    /// binding the event was applied through.
    pub fn advance(
        &mut self,
        binding: &Binding,
        event: LinearityEvent,
        span: Span,
    ) -> Result<Transition, Diagnostic> {
        let Some(slot) = binding.slot() else {
            return Err(Diagnostic::new(
                DiagnosticKind::TypeMismatch,
                span,
                format!("`{}` of type `{}` is not a qubit", binding.name, binding.ty),
            ));
        };
        let from = self.state(slot).unwrap_or(QubitState::Live);
        match transition(from, event) {
            Ok(to) => {
                self.current_mut().insert(slot, to);
                Ok(Transition { slot, from, to })
            }
            Err(kind) => Err(Diagnostic::new(kind, span, violation_message(kind, binding, event))),
        }
    }

    /// Enter a nested scope.
    pub fn enter_scope(&mut self) {
        let copy = self.current().clone();
        self.frames.push(copy);
    }

    /// Leave the innermost scope and return its final states.
    pub fn leave_scope(&mut self) -> FxHashMap<QubitSlot, QubitState> {
        if self.frames.len() > 1 {
            self.frames.pop().unwrap_or_default()
        } else {
            self.current().clone()
        }
    }

    /// Fold the states of a finished scope into the current one.
    ///
    /// Only slots visible here are merged, and each keeps the later of its
    /// two states.
    pub fn merge(&mut self, states: &FxHashMap<QubitSlot, QubitState>) {
        for (slot, state) in self.current_mut().iter_mut() {
            if let Some(&other) = states.get(slot) {
                *state = (*state).max(other);
            }
        }
    }

    /// Start tracking a separate body, stashing the current frames.
    pub fn enter_body(&mut self) -> SavedFrames {
        SavedFrames(std::mem::replace(&mut self.frames, vec![Frame::default()]))
    }

    /// Restore the frames stashed by [`enter_body`](Self::enter_body).
    pub fn exit_body(&mut self, saved: SavedFrames) {
        self.frames = saved.0;
    }
}

impl Default for LinearityTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn violation_message(kind: DiagnosticKind, binding: &Binding, event: LinearityEvent) -> String {
    let name = &binding.name;
    match (kind, event) {
        (DiagnosticKind::UninitializedQubit, LinearityEvent::Measure) => {
            format!("qubit `{name}` is measured before it is initialized")
        }
        (DiagnosticKind::UninitializedQubit, _) => {
            format!("gate applied to qubit `{name}` before it is initialized")
        }
        (DiagnosticKind::GateOnMeasuredQubit, LinearityEvent::Measure) => {
            format!("qubit `{name}` is measured a second time")
        }
        (DiagnosticKind::GateOnMeasuredQubit, _) => {
            format!("gate applied to qubit `{name}` after it was measured")
        }
        _ => format!("qubit `{name}` is single-assignment and already holds a value"),
    }
}
