//! Lowering of checked programs to flat instructions.
//!
//! Every qubit declaration allocates a fresh [`QubitRef`], every measurement
//! a fresh [`BitRef`]. Function calls are inlined: a callee's `ref qubit`
//! parameters are mapped onto the caller's qubits, so operations inside the
//! body act on the caller's allocations.
//!
//! The target only knows one control-flow form, a single gate guarded by a
//! measured bit. An `if` whose branches do no quantum work is classical and
//! emits nothing; any other shape is reported as unsupported.

use rustc_hash::FxHashMap;
use tracing::{debug, info, instrument};

use qlin_ir::{
    BaseGate, BitRef, DiagnosticKind, Diagnostics, Expr, ExprKind, GateApplication, GateCatalog,
    GateSpec, Instruction, Origin, Program, QubitLiteral, QubitRef, Span, Stmt, StmtKind,
};

use crate::checker::{AnnotatedProgram, ResourceAnnotations};
use crate::env::{BindingId, QubitHandle};
use crate::error::{CompileError, CompileResult};
use crate::linearity::QubitSlot;

/// Default limit on nested inlined calls.
pub const DEFAULT_MAX_INLINE_DEPTH: usize = 64;

/// Output of lowering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoweredProgram {
    /// Instructions in program order.
    pub instructions: Vec<Instruction>,
    /// Origin of each allocated qubit, indexed by [`QubitRef`].
    pub qubits: Vec<Origin>,
    /// Origin of each measurement result, indexed by [`BitRef`].
    pub bits: Vec<Origin>,
}

impl LoweredProgram {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of measurement instructions.
    pub fn num_measurements(&self) -> usize {
        self.instructions.iter().filter(|i| i.is_measure()).count()
    }
}

/// The lowering stage.
#[derive(Debug, Clone, Copy)]
pub struct Lowerer {
    max_inline_depth: usize,
}

impl Lowerer {
    pub fn new(max_inline_depth: usize) -> Self {
        Self { max_inline_depth }
    }

    pub fn max_inline_depth(&self) -> usize {
        self.max_inline_depth
    }

    /// Lower the entry body of a checked program.
    #[instrument(skip_all)]
    pub fn lower(&self, annotated: &AnnotatedProgram<'_>) -> CompileResult<LoweredProgram> {
        let mut lowering = Lowering::new(annotated, self.max_inline_depth);
        let mut frame = Frame::default();
        lowering.lower_block(&annotated.program.body, &mut frame)?;

        if !lowering.diags.is_empty() {
            info!("Lowering rejected program with {} diagnostic(s)", lowering.diags.len());
            return Err(CompileError::Lower(lowering.diags));
        }

        let out = lowering.out;
        info!(
            "Lowered to {} instruction(s) on {} qubit(s), {} bit(s)",
            out.instructions.len(),
            out.qubits.len(),
            out.bits.len()
        );
        Ok(out)
    }
}

impl Default for Lowerer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INLINE_DEPTH)
    }
}

/// Allocations visible in one inlined body.
#[derive(Debug, Default)]
struct Frame {
    qubits: FxHashMap<QubitSlot, QubitRef>,
    /// Classical bindings currently known to hold a measurement result.
    bits: FxHashMap<BindingId, BitRef>,
}

enum Flow {
    Continue,
    Return(Option<BitRef>),
}

struct Lowering<'a> {
    program: &'a Program,
    annotations: &'a ResourceAnnotations,
    out: LoweredProgram,
    diags: Diagnostics,
    call_stack: Vec<&'a str>,
    max_depth: usize,
    /// Whether a function body does quantum work, by name.
    quantum: FxHashMap<&'a str, bool>,
}

impl<'a> Lowering<'a> {
    fn new(annotated: &'a AnnotatedProgram<'_>, max_depth: usize) -> Self {
        Self {
            program: annotated.program,
            annotations: &annotated.annotations,
            out: LoweredProgram::default(),
            diags: Diagnostics::new(),
            call_stack: Vec::new(),
            max_depth,
            quantum: FxHashMap::default(),
        }
    }

    fn lower_block(&mut self, stmts: &'a [Stmt], frame: &mut Frame) -> CompileResult<Flow> {
        for (index, stmt) in stmts.iter().enumerate() {
            if matches!(stmt.kind, StmtKind::If { .. })
                && contains_return(stmt)
                && self.block_is_quantum(&stmts[index + 1..])
            {
                self.diags.report(
                    DiagnosticKind::UnsupportedControlFlow,
                    stmt.span,
                    "conditional `return` followed by quantum operations cannot be flattened",
                );
            }
            if let Flow::Return(value) = self.lower_stmt(stmt, frame)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    fn lower_stmt(&mut self, stmt: &'a Stmt, frame: &mut Frame) -> CompileResult<Flow> {
        match &stmt.kind {
            StmtKind::Let { name, init, .. } => self.lower_let(stmt, name, init.as_ref(), frame)?,
            StmtKind::Assign { value, .. } => self.lower_assign(stmt, value, frame)?,
            StmtKind::Expr(expr) => {
                self.lower_expr(expr, frame)?;
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.lower_if(stmt, cond, then_branch, else_branch.as_deref(), frame)?,
            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => self.lower_expr(value, frame)?,
                    None => None,
                };
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Continue)
    }

    fn lower_let(
        &mut self,
        stmt: &'a Stmt,
        name: &str,
        init: Option<&'a Expr>,
        frame: &mut Frame,
    ) -> CompileResult<()> {
        let annotations = self.annotations;
        let binding = annotations
            .declared(stmt.id)
            .ok_or_else(|| internal(format!("declaration {} has no binding", stmt.id)))?;

        match binding.handle {
            Some(QubitHandle::Owned(slot)) => {
                let qubit = self.allocate_qubit(name, stmt.span);
                frame.qubits.insert(slot, qubit);
                if let Some(Expr {
                    kind: ExprKind::Qubit(literal),
                    span,
                    ..
                }) = init
                {
                    self.prepare(qubit, *literal, *span);
                }
            }
            // An alias shares the slot of the qubit it refers to.
            Some(QubitHandle::Aliased(_)) => {}
            None => {
                let value = match init {
                    Some(init) => self.lower_expr(init, frame)?,
                    None => None,
                };
                remember(frame, binding.id, value);
            }
        }
        Ok(())
    }

    fn lower_assign(&mut self, stmt: &'a Stmt, value: &'a Expr, frame: &mut Frame) -> CompileResult<()> {
        let annotations = self.annotations;
        let binding = annotations
            .resolve(stmt.id)
            .ok_or_else(|| internal(format!("assignment {} has no binding", stmt.id)))?;

        match binding.handle {
            Some(handle) => {
                if let ExprKind::Qubit(literal) = value.kind {
                    let qubit = frame.qubits.get(&handle.slot()).copied().ok_or_else(|| {
                        internal(format!("qubit `{}` has no allocation", binding.name))
                    })?;
                    self.prepare(qubit, literal, value.span);
                }
            }
            None => {
                let result = self.lower_expr(value, frame)?;
                remember(frame, binding.id, result);
            }
        }
        Ok(())
    }

    fn lower_if(
        &mut self,
        stmt: &'a Stmt,
        cond: &'a Expr,
        then_branch: &'a [Stmt],
        else_branch: Option<&'a [Stmt]>,
        frame: &mut Frame,
    ) -> CompileResult<()> {
        let quantum = self.block_is_quantum(then_branch)
            || else_branch.is_some_and(|stmts| self.block_is_quantum(stmts));

        if !quantum {
            // A measurement in the condition still happens.
            self.lower_expr(cond, frame)?;
            for stmt in then_branch.iter().chain(else_branch.into_iter().flatten()) {
                self.forget_assigned(stmt, frame);
            }
            return Ok(());
        }

        let guarded = match (then_branch, else_branch) {
            ([only], None | Some([])) => match &only.kind {
                StmtKind::Expr(expr) => match &expr.kind {
                    ExprKind::Gate { name, args } => Some((expr, name, args)),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        };
        let Some((gate, name, args)) = guarded else {
            self.diags.report(
                DiagnosticKind::UnsupportedControlFlow,
                stmt.span,
                "a conditional around quantum operations must guard exactly one gate call and have no `else`",
            );
            return Ok(());
        };

        let condition = match &cond.kind {
            ExprKind::Var(_) | ExprKind::Measure(_) => self.lower_expr(cond, frame)?,
            _ => None,
        };
        let Some(condition) = condition else {
            self.diags.report(
                DiagnosticKind::UnsupportedControlFlow,
                cond.span,
                "the condition of a quantum conditional must be a measured bit",
            );
            return Ok(());
        };

        let application = self.gate_application(gate, name, args, frame)?;
        self.out
            .instructions
            .push(Instruction::conditional(condition, application));
        Ok(())
    }

    fn lower_expr(&mut self, expr: &'a Expr, frame: &mut Frame) -> CompileResult<Option<BitRef>> {
        match &expr.kind {
            ExprKind::Qubit(_)
            | ExprKind::Bit(_)
            | ExprKind::Integer(_)
            | ExprKind::Ref(_)
            | ExprKind::Deref(_) => Ok(None),
            ExprKind::Var(_) => Ok(self
                .annotations
                .resolutions
                .get(&expr.id)
                .and_then(|id| frame.bits.get(id))
                .copied()),
            ExprKind::Gate { name, args } => {
                let application = self.gate_application(expr, name, args, frame)?;
                self.out.instructions.push(Instruction::Gate(application));
                Ok(None)
            }
            ExprKind::Measure(target) => {
                let qubit = self.operand(target, frame)?;
                let bit = self.allocate_bit(qubit, expr.span);
                self.out
                    .instructions
                    .push(Instruction::measure(qubit, bit, expr.span));
                Ok(Some(bit))
            }
            ExprKind::Call { callee, args } => self.lower_call(expr, callee, args, frame),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.lower_expr(lhs, frame)?;
                self.lower_expr(rhs, frame)?;
                Ok(None)
            }
        }
    }

    fn lower_call(
        &mut self,
        expr: &'a Expr,
        callee: &'a str,
        args: &'a [Expr],
        frame: &mut Frame,
    ) -> CompileResult<Option<BitRef>> {
        if self.call_stack.contains(&callee) {
            self.diags.report(
                DiagnosticKind::UnsupportedControlFlow,
                expr.span,
                format!("recursive call to `{callee}` cannot be flattened"),
            );
            return Ok(None);
        }
        if self.call_stack.len() >= self.max_depth {
            self.diags.report(
                DiagnosticKind::UnsupportedControlFlow,
                expr.span,
                format!(
                    "call to `{callee}` exceeds the inline depth limit of {}",
                    self.max_depth
                ),
            );
            return Ok(None);
        }

        let program = self.program;
        let annotations = self.annotations;
        let function = program
            .function(callee)
            .ok_or_else(|| internal(format!("function `{callee}` is not declared")))?;
        let summary = annotations
            .summary(callee)
            .ok_or_else(|| internal(format!("function `{callee}` has no summary")))?;

        let mut inner = Frame::default();
        for (arg, param) in args.iter().zip(&summary.params) {
            match param.slot {
                Some(slot) => {
                    let qubit = self.operand(arg, frame)?;
                    inner.qubits.insert(slot, qubit);
                }
                None => {
                    let value = self.lower_expr(arg, frame)?;
                    remember(&mut inner, param.binding, value);
                }
            }
        }

        debug!(function = callee, depth = self.call_stack.len() + 1, "Inlining call");
        self.call_stack.push(callee);
        let flow = self.lower_block(&function.body, &mut inner);
        self.call_stack.pop();

        Ok(match flow? {
            Flow::Return(value) => value,
            Flow::Continue => None,
        })
    }

    fn gate_application(
        &self,
        expr: &'a Expr,
        name: &str,
        args: &'a [Expr],
        frame: &Frame,
    ) -> CompileResult<GateApplication> {
        let gate = GateCatalog::lookup(name)
            .ok_or_else(|| internal(format!("gate `{name}` is not in the catalog")))?;
        let qubits = args
            .iter()
            .map(|arg| self.operand(arg, frame))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(GateApplication::try_new(gate, qubits, expr.span)?)
    }

    /// The qubit a `ref x` or reference-binding argument reaches.
    fn operand(&self, arg: &'a Expr, frame: &Frame) -> CompileResult<QubitRef> {
        let var = match &arg.kind {
            ExprKind::Ref(inner) => inner.as_ref(),
            _ => arg,
        };
        let binding = self
            .annotations
            .resolve(var.id)
            .ok_or_else(|| internal(format!("operand {} is unresolved", var.id)))?;
        binding
            .slot()
            .and_then(|slot| frame.qubits.get(&slot))
            .copied()
            .ok_or_else(|| internal(format!("qubit `{}` has no allocation", binding.name)))
    }

    /// State preparation for a qubit literal.
    ///
    /// Target registers start in |0>, so `0q0` needs nothing and `0q1` is
    /// one `px` on the fresh register. This `px` is the only instruction
    /// that does not come from an operation written in the source.
    fn prepare(&mut self, qubit: QubitRef, literal: QubitLiteral, span: Span) {
        if literal == QubitLiteral::One {
            self.out.instructions.push(Instruction::Gate(GateApplication::new(
                GateSpec::single(BaseGate::Px),
                [qubit],
                span,
            )));
        }
    }

    fn allocate_qubit(&mut self, name: &str, span: Span) -> QubitRef {
        let qubit = QubitRef(self.out.qubits.len() as u32);
        self.out.qubits.push(Origin::new(name, span));
        qubit
    }

    fn allocate_bit(&mut self, measured: QubitRef, span: Span) -> BitRef {
        let bit = BitRef(self.out.bits.len() as u32);
        let name = self
            .out
            .qubits
            .get(measured.0 as usize)
            .map_or_else(String::new, |origin| origin.name.clone());
        self.out.bits.push(Origin::new(name, span));
        bit
    }

    /// Drop what is known about bindings a skipped classical branch assigns.
    fn forget_assigned(&self, stmt: &Stmt, frame: &mut Frame) {
        match &stmt.kind {
            StmtKind::Assign { .. } => {
                if let Some(id) = self.annotations.resolutions.get(&stmt.id) {
                    frame.bits.remove(id);
                }
            }
            StmtKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                for inner in then_branch.iter().chain(else_branch.iter().flatten()) {
                    self.forget_assigned(inner, frame);
                }
            }
            StmtKind::Let { .. } | StmtKind::Expr(_) | StmtKind::Return(_) => {}
        }
    }

    fn block_is_quantum(&mut self, stmts: &'a [Stmt]) -> bool {
        stmts.iter().any(|stmt| self.stmt_is_quantum(stmt))
    }

    /// Whether lowering `stmt` could emit an instruction.
    fn stmt_is_quantum(&mut self, stmt: &'a Stmt) -> bool {
        let mut quantum = false;
        let mut calls = Vec::new();
        stmt.walk_exprs(&mut |expr| match &expr.kind {
            ExprKind::Gate { .. } | ExprKind::Measure(_) | ExprKind::Qubit(_) => quantum = true,
            ExprKind::Call { callee, .. } => calls.push(callee.as_str()),
            _ => {}
        });
        quantum || calls.into_iter().any(|callee| self.function_is_quantum(callee))
    }

    fn function_is_quantum(&mut self, name: &'a str) -> bool {
        if let Some(&quantum) = self.quantum.get(name) {
            return quantum;
        }
        // Provisional answer for recursive calls.
        self.quantum.insert(name, false);
        let program = self.program;
        let quantum = program
            .function(name)
            .is_some_and(|function| self.block_is_quantum(&function.body));
        self.quantum.insert(name, quantum);
        quantum
    }
}

fn remember(frame: &mut Frame, binding: BindingId, value: Option<BitRef>) {
    match value {
        Some(bit) => {
            frame.bits.insert(binding, bit);
        }
        None => {
            frame.bits.remove(&binding);
        }
    }
}

fn contains_return(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) => true,
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => then_branch
            .iter()
            .chain(else_branch.iter().flatten())
            .any(contains_return),
        StmtKind::Let { .. } | StmtKind::Assign { .. } | StmtKind::Expr(_) => false,
    }
}

fn internal(message: impl Into<String>) -> CompileError {
    CompileError::Internal(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::ResourceChecker;
    use qlin_ir::{Function, Param, ProgramBuilder, Type};

    fn lower(program: &Program) -> CompileResult<LoweredProgram> {
        lower_with(program, Lowerer::default())
    }

    fn lower_with(program: &Program, lowerer: Lowerer) -> CompileResult<LoweredProgram> {
        let annotated = ResourceChecker::new()
            .check(program)
            .map_err(CompileError::Check)?;
        lowerer.lower(&annotated)
    }

    fn names(lowered: &LoweredProgram) -> Vec<&'static str> {
        lowered.instructions.iter().map(Instruction::name).collect()
    }

    fn flip() -> Function {
        Function::new(
            "flip",
            vec![Param::qubit_ref("q")],
            Type::Unit,
            vec![Stmt::expr(Expr::gate("px", vec![Expr::var("q")]))],
        )
    }

    #[test]
    fn test_one_literal_prepares_with_px() {
        let program = ProgramBuilder::new()
            .stmt(Stmt::val("a", Expr::qubit(QubitLiteral::One)))
            .stmt(Stmt::val("b", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::expr(Expr::gate("had", vec![Expr::ref_var("b")])))
            .build();
        let lowered = lower(&program).unwrap();
        assert_eq!(names(&lowered), vec!["px", "had"]);
        assert_eq!(lowered.qubits.len(), 2);
        assert_eq!(lowered.instructions[1].qubits(), vec![QubitRef(1)]);
    }

    #[test]
    fn test_call_is_inlined_on_caller_qubit() {
        let program = ProgramBuilder::new()
            .function(flip())
            .stmt(Stmt::val("a", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::val("b", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::expr(Expr::call("flip", vec![Expr::ref_var("b")])))
            .stmt(Stmt::expr(Expr::call("flip", vec![Expr::ref_var("a")])))
            .build();
        let lowered = lower(&program).unwrap();
        assert_eq!(names(&lowered), vec!["px", "px"]);
        assert_eq!(lowered.instructions[0].qubits(), vec![QubitRef(1)]);
        assert_eq!(lowered.instructions[1].qubits(), vec![QubitRef(0)]);
    }

    #[test]
    fn test_returned_bit_guards_gate() {
        let observe = Function::new(
            "observe",
            vec![Param::qubit_ref("q")],
            Type::Bit,
            vec![Stmt::ret(Some(Expr::measure(Expr::var("q"))))],
        );
        let program = ProgramBuilder::new()
            .function(observe)
            .stmt(Stmt::val("a", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::val("b", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::val("m", Expr::call("observe", vec![Expr::ref_var("a")])))
            .stmt(Stmt::if_then(
                Expr::var("m"),
                vec![Stmt::expr(Expr::gate("pz", vec![Expr::ref_var("b")]))],
            ))
            .build();
        let lowered = lower(&program).unwrap();
        assert_eq!(names(&lowered), vec!["measure", "pz"]);
        assert!(matches!(
            lowered.instructions[1],
            Instruction::ConditionalGate {
                condition: BitRef(0),
                ..
            }
        ));
        assert_eq!(lowered.bits[0].name, "a");
    }

    #[test]
    fn test_recursion_is_unsupported() {
        let program = ProgramBuilder::new()
            .function(Function::new(
                "spin",
                vec![Param::qubit_ref("q")],
                Type::Unit,
                vec![
                    Stmt::expr(Expr::gate("had", vec![Expr::var("q")])),
                    Stmt::expr(Expr::call("spin", vec![Expr::var("q")])),
                ],
            ))
            .stmt(Stmt::val("a", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::expr(Expr::call("spin", vec![Expr::ref_var("a")])))
            .build();
        let err = lower(&program).unwrap_err();
        let diags = err.diagnostics().unwrap();
        assert_eq!(diags.kinds(), vec![DiagnosticKind::UnsupportedControlFlow]);
    }

    #[test]
    fn test_inline_depth_limit() {
        let outer = Function::new(
            "outer",
            vec![Param::qubit_ref("q")],
            Type::Unit,
            vec![Stmt::expr(Expr::call("flip", vec![Expr::var("q")]))],
        );
        let program = ProgramBuilder::new()
            .function(flip())
            .function(outer)
            .stmt(Stmt::val("a", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::expr(Expr::call("outer", vec![Expr::ref_var("a")])))
            .build();

        assert!(lower_with(&program, Lowerer::new(2)).is_ok());
        let err = lower_with(&program, Lowerer::new(1)).unwrap_err();
        assert_eq!(
            err.diagnostics().map(|d| d.kinds()),
            Some(vec![DiagnosticKind::UnsupportedControlFlow])
        );
    }

    #[test]
    fn test_conditional_with_two_gates_is_unsupported() {
        let program = ProgramBuilder::new()
            .stmt(Stmt::val("a", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::val("b", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::val("m", Expr::measure(Expr::ref_var("a"))))
            .stmt(Stmt::if_then(
                Expr::var("m"),
                vec![
                    Stmt::expr(Expr::gate("px", vec![Expr::ref_var("b")])),
                    Stmt::expr(Expr::gate("pz", vec![Expr::ref_var("b")])),
                ],
            ))
            .build();
        let err = lower(&program).unwrap_err();
        assert!(matches!(err, CompileError::Lower(_)));
    }

    #[test]
    fn test_classical_if_emits_nothing() {
        let program = ProgramBuilder::new()
            .stmt(Stmt::var("n", Expr::int(0)))
            .stmt(Stmt::if_else(
                Expr::bit(true),
                vec![Stmt::assign("n", Expr::int(1))],
                vec![Stmt::assign("n", Expr::int(2))],
            ))
            .build();
        assert!(lower(&program).unwrap().is_empty());
    }

    #[test]
    fn test_bit_reassigned_in_classical_branch_is_forgotten() {
        let program = ProgramBuilder::new()
            .stmt(Stmt::val("a", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::val("b", Expr::qubit(QubitLiteral::Zero)))
            .stmt(Stmt::var("m", Expr::measure(Expr::ref_var("a"))))
            .stmt(Stmt::if_then(Expr::var("m"), vec![Stmt::assign("m", Expr::bit(false))]))
            .stmt(Stmt::if_then(
                Expr::var("m"),
                vec![Stmt::expr(Expr::gate("px", vec![Expr::ref_var("b")]))],
            ))
            .build();
        let err = lower(&program).unwrap_err();
        assert_eq!(
            err.diagnostics().map(|d| d.kinds()),
            Some(vec![DiagnosticKind::UnsupportedControlFlow])
        );
    }
}
