//! Resource checker.
//!
//! Walks the syntax tree once, enforcing the linearity and no-cloning
//! rules alongside ordinary classical typing, and records everything the
//! lowering stage needs: which binding every variable use resolves to and
//! which qubit state transitions every node performs.
//!
//! Function bodies are checked once, with every `ref qubit` parameter
//! assumed live. The result is a [`FunctionSummary`] saying, per parameter,
//! whether the body operates on it and whether it may leave it measured;
//! call sites apply that summary to the argument's state instead of
//! re-checking the body.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use qlin_ir::{
    BinOp, DiagnosticKind, Diagnostics, Expr, ExprKind, Function, GateCatalog, Mutability,
    NodeId, Program, Span, Stmt, StmtKind, Type,
};

use crate::env::{Binding, BindingId, FunctionSig, QubitHandle, TypeEnv};
use crate::linearity::{LinearityEvent, LinearityTracker, QubitSlot, QubitState, Transition};

/// What a function body does to one of its parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamEffect {
    /// The body applies a gate or measurement to the parameter, directly or
    /// through a callee. Callers must pass a live qubit.
    pub used: bool,
    /// The parameter may be measured when the body returns.
    pub measured: bool,
}

/// Per-parameter record of a checked function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSummary {
    pub binding: BindingId,
    /// Slot standing in for the caller's qubit, for `ref qubit` parameters.
    pub slot: Option<QubitSlot>,
    pub effect: ParamEffect,
}

/// Result of checking one function body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub params: Vec<ParamSummary>,
}

/// Side tables produced by a successful check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceAnnotations {
    /// Every binding in the program, indexed by [`BindingId`].
    pub bindings: Vec<Binding>,
    /// Variable uses and assignment statements to the binding they name.
    pub resolutions: FxHashMap<NodeId, BindingId>,
    /// `val`/`var` statements to the binding they introduce.
    pub declarations: FxHashMap<NodeId, BindingId>,
    /// State changes performed by each node, in operand order.
    pub transitions: FxHashMap<NodeId, Vec<Transition>>,
    /// Function summaries by name.
    pub summaries: FxHashMap<String, FunctionSummary>,
}

impl ResourceAnnotations {
    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.0 as usize)
    }

    /// The binding a variable use or assignment refers to.
    pub fn resolve(&self, node: NodeId) -> Option<&Binding> {
        self.resolutions.get(&node).and_then(|id| self.binding(*id))
    }

    /// The binding a declaration introduces.
    pub fn declared(&self, node: NodeId) -> Option<&Binding> {
        self.declarations.get(&node).and_then(|id| self.binding(*id))
    }

    /// State changes recorded for a node.
    pub fn transitions(&self, node: NodeId) -> &[Transition] {
        self.transitions.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn summary(&self, function: &str) -> Option<&FunctionSummary> {
        self.summaries.get(function)
    }
}

/// A program that passed the resource checker, with its annotations.
#[derive(Debug)]
pub struct AnnotatedProgram<'p> {
    pub program: &'p Program,
    pub annotations: ResourceAnnotations,
}

/// The resource checking stage.
///
/// Checking is a pure function of the program: running it twice yields the
/// same diagnostics in the same order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceChecker;

impl ResourceChecker {
    pub fn new() -> Self {
        Self
    }

    /// Check a program, returning every diagnostic found.
    #[instrument(skip_all, fields(functions = program.functions.len()))]
    pub fn check<'p>(&self, program: &'p Program) -> Result<AnnotatedProgram<'p>, Diagnostics> {
        let mut checker = Checker::new(program);
        checker.check_program();

        let Checker {
            env,
            diags,
            mut annotations,
            ..
        } = checker;

        if !diags.is_empty() {
            info!("Resource check rejected program with {} diagnostic(s)", diags.len());
            return Err(diags);
        }

        annotations.bindings = env.into_bindings();
        info!(
            "Resource check passed: {} bindings, {} transitions",
            annotations.bindings.len(),
            annotations.transitions.values().map(Vec::len).sum::<usize>()
        );
        Ok(AnnotatedProgram {
            program,
            annotations,
        })
    }
}

struct Checker<'p> {
    program: &'p Program,
    env: TypeEnv,
    tracker: LinearityTracker,
    diags: Diagnostics,
    annotations: ResourceAnnotations,
    /// Functions whose summary is being computed.
    in_progress: FxHashSet<&'p str>,
    /// Slots operated on in the current body.
    touched: FxHashSet<QubitSlot>,
    /// Bindings whose type could not be determined.
    untyped: FxHashSet<BindingId>,
    return_type: Type,
}

impl<'p> Checker<'p> {
    fn new(program: &'p Program) -> Self {
        Self {
            program,
            env: TypeEnv::new(),
            tracker: LinearityTracker::new(),
            diags: Diagnostics::new(),
            annotations: ResourceAnnotations::default(),
            in_progress: FxHashSet::default(),
            touched: FxHashSet::default(),
            untyped: FxHashSet::default(),
            return_type: Type::Unit,
        }
    }

    fn check_program(&mut self) {
        let program = self.program;
        // Annotations are keyed by node id; a tree with collisions would
        // hand lowering the wrong bindings.
        let duplicates = program.duplicate_ids();
        if !duplicates.is_empty() {
            for (id, span) in duplicates {
                self.diags.report(
                    DiagnosticKind::DuplicateNodeId,
                    span,
                    format!("node id {id} is used by more than one node"),
                );
            }
            return;
        }
        for function in &program.functions {
            self.env.declare_function(FunctionSig::from(function));
        }
        for function in &program.functions {
            self.summarize(&function.name);
        }
        self.return_type = Type::Unit;
        self.check_block(&program.body);
    }

    // Functions

    /// Summary of `name`, checking its body on first request.
    ///
    /// Returns `None` for unknown functions and for a function whose body is
    /// still being checked (a recursive call).
    fn summarize(&mut self, name: &'p str) -> Option<FunctionSummary> {
        if let Some(summary) = self.annotations.summaries.get(name) {
            return Some(summary.clone());
        }
        if self.in_progress.contains(name) {
            return None;
        }
        let program = self.program;
        let function = program.function(name)?;
        self.in_progress.insert(name);

        let scopes = self.env.enter_body();
        let frames = self.tracker.enter_body();
        let touched = std::mem::take(&mut self.touched);
        let return_type = std::mem::replace(&mut self.return_type, function.ret.clone());

        let params = self.declare_signature(function);
        self.check_block(&function.body);

        let summary = FunctionSummary {
            params: params
                .into_iter()
                .map(|(binding, slot)| ParamSummary {
                    binding,
                    slot,
                    effect: slot.map_or_else(ParamEffect::default, |slot| ParamEffect {
                        used: self.touched.contains(&slot),
                        measured: self.tracker.state(slot) == Some(QubitState::Measured),
                    }),
                })
                .collect(),
        };

        self.return_type = return_type;
        self.touched = touched;
        self.tracker.exit_body(frames);
        self.env.exit_body(scopes);
        self.in_progress.remove(name);

        debug!(function = name, params = summary.params.len(), "Checked function body");
        self.annotations
            .summaries
            .insert(name.to_string(), summary.clone());
        Some(summary)
    }

    fn declare_signature(&mut self, function: &'p Function) -> Vec<(BindingId, Option<QubitSlot>)> {
        if function.ret.carries_qubit() {
            self.diags.report(
                DiagnosticKind::IllegalQubitSource,
                function.span,
                format!(
                    "function `{}` returns `{}`; qubits can only be created from literals",
                    function.name, function.ret
                ),
            );
        } else {
            self.check_declared_type(&function.ret, function.span);
        }

        let mut params = Vec::with_capacity(function.params.len());
        for param in &function.params {
            self.check_declared_type(&param.ty, param.span);
            let handle = if param.ty.is_qubit() {
                self.diags.report(
                    DiagnosticKind::QubitMustBeByReference,
                    param.span,
                    format!(
                        "parameter `{}` takes a qubit by value; declare it as `ref qubit`",
                        param.name
                    ),
                );
                Some(QubitHandle::Owned(self.tracker.allocate(QubitState::Live)))
            } else if param.ty.is_qubit_ref() {
                Some(QubitHandle::Aliased(self.tracker.allocate(QubitState::Live)))
            } else {
                None
            };
            let id = self
                .env
                .bind(&param.name, param.ty.clone(), param.mutability, param.span, handle);
            params.push((id, handle.map(QubitHandle::slot)));
        }
        params
    }

    fn check_declared_type(&mut self, ty: &Type, span: Span) {
        match ty {
            Type::UserType { args, .. } if args.iter().any(Type::carries_qubit) => {
                self.diags.report(
                    DiagnosticKind::QubitInUserType,
                    span,
                    format!("user type `{ty}` cannot carry a qubit"),
                );
            }
            Type::UserType { args, .. } => {
                for arg in args {
                    self.check_declared_type(arg, span);
                }
            }
            Type::Reference(inner) => self.check_declared_type(inner, span),
            Type::Function { params, ret } => {
                for param in params {
                    self.check_declared_type(param, span);
                }
                self.check_declared_type(ret, span);
            }
            Type::Qubit | Type::Bit | Type::Integer | Type::Unit => {}
        }
    }

    // Statements

    fn check_block(&mut self, stmts: &'p [Stmt]) {
        for stmt in stmts {
            self.check_stmt(stmt);
        }
    }

    fn check_stmt(&mut self, stmt: &'p Stmt) {
        match &stmt.kind {
            StmtKind::Let {
                name,
                mutability,
                ty,
                init,
            } => self.check_let(stmt, name, *mutability, ty.as_ref(), init.as_ref()),
            StmtKind::Assign { name, value } => self.check_assign(stmt, name, value),
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.check_if(cond, then_branch, else_branch.as_deref()),
            StmtKind::Return(value) => self.check_return(stmt, value.as_ref()),
        }
    }

    fn check_let(
        &mut self,
        stmt: &'p Stmt,
        name: &str,
        mutability: Mutability,
        declared: Option<&Type>,
        init: Option<&'p Expr>,
    ) {
        if let Some(ty) = declared {
            self.check_declared_type(ty, stmt.span);
        }
        let ty = match (declared, init) {
            (Some(ty), _) => Some(ty.clone()),
            (None, Some(init)) => self.peek_type(init),
            (None, None) => None,
        };
        match ty {
            Some(Type::Qubit) => self.declare_qubit(stmt, name, mutability, init),
            Some(ty) if ty.is_qubit_ref() => self.declare_alias(stmt, name, mutability, init),
            _ => self.declare_classical(stmt, name, mutability, declared, init),
        }
    }

    fn declare_qubit(
        &mut self,
        stmt: &'p Stmt,
        name: &str,
        mutability: Mutability,
        init: Option<&'p Expr>,
    ) {
        let fresh = init.is_some_and(Expr::is_qubit_literal);
        if let Some(source) = init.filter(|e| !e.is_qubit_literal()) {
            self.report_illegal_source(stmt.span, name, source);
        }

        // A rejected source still yields a live qubit so later uses do not
        // cascade into uninitialized-qubit reports.
        let state = if init.is_some() && !fresh {
            QubitState::Live
        } else {
            QubitState::Uninitialized
        };
        let slot = self.tracker.allocate(state);
        let id = self.env.bind(
            name,
            Type::Qubit,
            mutability,
            stmt.span,
            Some(QubitHandle::Owned(slot)),
        );
        self.annotations.declarations.insert(stmt.id, id);
        if fresh {
            self.apply(id, LinearityEvent::Initialize, stmt.id, stmt.span);
        }
    }

    fn declare_alias(
        &mut self,
        stmt: &'p Stmt,
        name: &str,
        mutability: Mutability,
        init: Option<&'p Expr>,
    ) {
        let target = match init {
            Some(init) => self.qubit_operand(init, "a qubit reference binding"),
            None => {
                self.diags.report(
                    DiagnosticKind::TypeMismatch,
                    stmt.span,
                    format!("reference `{name}` must be initialized"),
                );
                None
            }
        };
        let slot = match target.and_then(|id| self.env.binding(id)).and_then(Binding::slot) {
            Some(slot) => slot,
            None => self.tracker.allocate(QubitState::Live),
        };
        let id = self.env.bind(
            name,
            Type::qubit_ref(),
            mutability,
            stmt.span,
            Some(QubitHandle::Aliased(slot)),
        );
        self.annotations.declarations.insert(stmt.id, id);
    }

    fn declare_classical(
        &mut self,
        stmt: &'p Stmt,
        name: &str,
        mutability: Mutability,
        declared: Option<&Type>,
        init: Option<&'p Expr>,
    ) {
        let found = init.and_then(|e| self.check_expr(e));
        if let (Some(expected), Some(found)) = (declared, &found)
            && expected != found
        {
            self.diags.report(
                DiagnosticKind::TypeMismatch,
                stmt.span,
                format!("`{name}` is declared `{expected}` but initialized with `{found}`"),
            );
        }
        let ty = declared.cloned().or(found);
        let known = ty.is_some();
        let id = self
            .env
            .bind(name, ty.unwrap_or(Type::Unit), mutability, stmt.span, None);
        if !known {
            self.untyped.insert(id);
        }
        self.annotations.declarations.insert(stmt.id, id);
    }

    fn check_assign(&mut self, stmt: &'p Stmt, name: &str, value: &'p Expr) {
        let Some(binding) = self.env.lookup(name).cloned() else {
            self.diags.report(
                DiagnosticKind::UnknownName,
                stmt.span,
                format!("cannot assign to `{name}`: not found in this scope"),
            );
            self.check_expr(value);
            return;
        };
        self.annotations.resolutions.insert(stmt.id, binding.id);

        if binding.ty.is_qubit() {
            if value.is_qubit_literal() {
                self.apply(binding.id, LinearityEvent::Initialize, stmt.id, stmt.span);
            } else {
                let state = binding.slot().and_then(|slot| self.tracker.state(slot));
                if state == Some(QubitState::Uninitialized) {
                    self.report_illegal_source(stmt.span, name, value);
                } else {
                    self.check_qubit_source(value);
                    self.diags.report(
                        DiagnosticKind::ImmutableQubitBinding,
                        stmt.span,
                        format!("qubit `{name}` already holds a value and cannot be re-assigned"),
                    );
                }
            }
            return;
        }

        if binding.ty.is_qubit_ref() {
            self.check_qubit_source(value);
            self.diags.report(
                DiagnosticKind::ImmutableQubitBinding,
                stmt.span,
                format!("qubit reference `{name}` cannot be re-bound"),
            );
            return;
        }

        let found = self.check_expr(value);
        if !binding.mutability.is_mutable() {
            self.diags.report(
                DiagnosticKind::ImmutableBinding,
                stmt.span,
                format!("cannot assign twice to immutable binding `{name}`"),
            );
        }
        if let Some(found) = found
            && !self.untyped.contains(&binding.id)
            && found != binding.ty
        {
            self.diags.report(
                DiagnosticKind::TypeMismatch,
                value.span,
                format!("`{name}` has type `{}` but is assigned `{found}`", binding.ty),
            );
        }
    }

    fn check_if(&mut self, cond: &'p Expr, then_branch: &'p [Stmt], else_branch: Option<&'p [Stmt]>) {
        if let Some(ty) = self.check_expr(cond)
            && ty != Type::Bit
        {
            self.diags.report(
                DiagnosticKind::TypeMismatch,
                cond.span,
                format!("condition must be `bit`, found `{ty}`"),
            );
        }

        // Both branches start from the state before the `if`; afterwards
        // each qubit takes the later of the states the branches leave.
        let then_states = self.check_branch(then_branch);
        let else_states = else_branch.map(|stmts| self.check_branch(stmts));
        self.tracker.merge(&then_states);
        if let Some(states) = else_states {
            self.tracker.merge(&states);
        }
    }

    fn check_branch(&mut self, stmts: &'p [Stmt]) -> FxHashMap<QubitSlot, QubitState> {
        self.env.push_scope();
        self.tracker.enter_scope();
        self.check_block(stmts);
        self.env.pop_scope();
        self.tracker.leave_scope()
    }

    fn check_return(&mut self, stmt: &'p Stmt, value: Option<&'p Expr>) {
        let found = match value {
            Some(value) => self.check_expr(value),
            None => Some(Type::Unit),
        };
        // Qubit-returning functions are already rejected at their declaration.
        if let Some(found) = found
            && !self.return_type.carries_qubit()
            && found != self.return_type
        {
            self.diags.report(
                DiagnosticKind::TypeMismatch,
                stmt.span,
                format!("expected return type `{}`, found `{found}`", self.return_type),
            );
        }
    }

    // Expressions

    /// Type of an expression, or `None` when it could not be determined
    /// (a diagnostic has already been reported).
    fn check_expr(&mut self, expr: &'p Expr) -> Option<Type> {
        match &expr.kind {
            ExprKind::Qubit(_) => Some(Type::Qubit),
            ExprKind::Bit(_) => Some(Type::Bit),
            ExprKind::Integer(_) => Some(Type::Integer),
            ExprKind::Var(name) => {
                let id = self.resolve(expr, name)?;
                if self.untyped.contains(&id) {
                    return None;
                }
                self.env.binding(id).map(|b| b.ty.clone())
            }
            ExprKind::Ref(inner) => self.check_ref(expr, inner),
            ExprKind::Deref(inner) => self.check_deref(expr, inner),
            ExprKind::Gate { name, args } => {
                self.check_gate(expr, name, args);
                Some(Type::Unit)
            }
            ExprKind::Measure(target) => {
                if let Some(id) = self.qubit_operand(target, "measurement") {
                    self.apply(id, LinearityEvent::Measure, expr.id, expr.span);
                }
                Some(Type::Bit)
            }
            ExprKind::Call { callee, args } => self.check_call(expr, callee, args),
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(expr, *op, lhs, rhs),
        }
    }

    fn check_ref(&mut self, expr: &'p Expr, inner: &'p Expr) -> Option<Type> {
        if !matches!(inner.kind, ExprKind::Var(_)) {
            self.check_expr(inner);
            self.diags.report(
                DiagnosticKind::TypeMismatch,
                expr.span,
                "`ref` can only be applied to a named binding",
            );
            return None;
        }
        let ty = self.check_expr(inner)?;
        // A reference to a reference parameter is the same alias.
        Some(if ty.is_qubit_ref() {
            ty
        } else {
            Type::reference(ty)
        })
    }

    fn check_deref(&mut self, expr: &'p Expr, inner: &'p Expr) -> Option<Type> {
        let ty = self.check_expr(inner)?;
        if ty.is_qubit_ref() {
            self.diags.report(
                DiagnosticKind::IllegalDereference,
                expr.span,
                "a qubit reference cannot be dereferenced; that would copy the qubit",
            );
            return None;
        }
        match ty {
            Type::Reference(inner) => Some(*inner),
            other => {
                self.diags.report(
                    DiagnosticKind::TypeMismatch,
                    expr.span,
                    format!("cannot dereference a value of type `{other}`"),
                );
                None
            }
        }
    }

    fn check_gate(&mut self, expr: &'p Expr, name: &str, args: &'p [Expr]) {
        let spec = GateCatalog::lookup(name);
        match spec {
            None => self.diags.report(
                DiagnosticKind::UnknownGate,
                expr.span,
                format!("unknown gate `{name}`"),
            ),
            Some(spec) if spec.arity() != args.len() => self.diags.report(
                DiagnosticKind::ArityMismatch,
                expr.span,
                format!(
                    "gate `{name}` takes {} qubit reference(s), found {}",
                    spec.arity(),
                    args.len()
                ),
            ),
            Some(_) => {}
        }

        let context = format!("gate `{name}`");
        let operands: Vec<BindingId> = args
            .iter()
            .filter_map(|arg| self.qubit_operand(arg, &context))
            .collect();
        if spec.is_none() || !self.check_distinct(expr.span, &operands, &context) {
            return;
        }
        for id in operands {
            self.apply(id, LinearityEvent::ApplyGate, expr.id, expr.span);
        }
    }

    fn check_call(&mut self, expr: &'p Expr, callee: &'p str, args: &'p [Expr]) -> Option<Type> {
        let Some(sig) = self.env.function(callee).cloned() else {
            self.diags.report(
                DiagnosticKind::UnknownFunction,
                expr.span,
                format!("cannot find function `{callee}`"),
            );
            for arg in args {
                self.check_expr(arg);
            }
            return None;
        };

        if sig.params.len() != args.len() {
            self.diags.report(
                DiagnosticKind::ArgumentCountMismatch,
                expr.span,
                format!(
                    "function `{callee}` takes {} argument(s), found {}",
                    sig.params.len(),
                    args.len()
                ),
            );
            for arg in args {
                self.check_expr(arg);
            }
            return Some(sig.ret);
        }

        let context = format!("function `{callee}`");
        let mut operands = Vec::new();
        for (index, (arg, param)) in args.iter().zip(&sig.params).enumerate() {
            if param.is_qubit() {
                self.check_qubit_source(arg);
                self.diags.report(
                    DiagnosticKind::QubitMustBeByReference,
                    arg.span,
                    format!(
                        "argument {} of `{callee}` passes a qubit by value; qubits can only be passed by reference",
                        index + 1
                    ),
                );
            } else if param.is_qubit_ref() {
                if let Some(id) = self.qubit_operand(arg, &context) {
                    operands.push((index, id));
                }
            } else if let Some(found) = self.check_expr(arg)
                && &found != param
            {
                self.diags.report(
                    DiagnosticKind::TypeMismatch,
                    arg.span,
                    format!(
                        "argument {} of `{callee}` expects `{param}`, found `{found}`",
                        index + 1
                    ),
                );
            }
        }

        let ids: Vec<BindingId> = operands.iter().map(|(_, id)| *id).collect();
        if !self.check_distinct(expr.span, &ids, &context) {
            return Some(sig.ret);
        }

        let summary = self.summarize(callee);
        for (index, id) in operands {
            // Without a summary (recursion) the callee is assumed to use the
            // qubit without measuring it.
            let effect = summary
                .as_ref()
                .and_then(|s| s.params.get(index))
                .map_or(
                    ParamEffect {
                        used: true,
                        measured: false,
                    },
                    |p| p.effect,
                );
            if effect.measured {
                self.apply(id, LinearityEvent::Measure, expr.id, expr.span);
            } else if effect.used {
                self.apply(id, LinearityEvent::ApplyGate, expr.id, expr.span);
            }
        }
        Some(sig.ret)
    }

    fn check_binary(&mut self, expr: &'p Expr, op: BinOp, lhs: &'p Expr, rhs: &'p Expr) -> Option<Type> {
        let lhs = self.check_expr(lhs);
        let rhs = self.check_expr(rhs);
        let (lhs, rhs) = (lhs?, rhs?);
        if lhs.is_linear() || rhs.is_linear() {
            self.diags.report(
                DiagnosticKind::TypeMismatch,
                expr.span,
                format!("qubits cannot be used as classical values in `{}`", op.symbol()),
            );
            return None;
        }
        match op {
            BinOp::Eq | BinOp::Ne if lhs == rhs => Some(Type::Bit),
            BinOp::And | BinOp::Or if lhs == Type::Bit && rhs == Type::Bit => Some(Type::Bit),
            BinOp::Add | BinOp::Sub if lhs == Type::Integer && rhs == Type::Integer => {
                Some(Type::Integer)
            }
            _ => {
                self.diags.report(
                    DiagnosticKind::TypeMismatch,
                    expr.span,
                    format!("`{}` cannot be applied to `{lhs}` and `{rhs}`", op.symbol()),
                );
                None
            }
        }
    }

    // Qubit operands

    /// Resolve an argument that must reach a qubit by reference: `ref x`
    /// for a qubit (or reference) binding `x`, or a `ref qubit` binding used
    /// directly.
    fn qubit_operand(&mut self, arg: &'p Expr, context: &str) -> Option<BindingId> {
        match &arg.kind {
            ExprKind::Ref(inner) => {
                let ExprKind::Var(name) = &inner.kind else {
                    self.check_expr(arg);
                    return None;
                };
                let id = self.resolve(inner, name)?;
                let binding = self.env.binding(id)?;
                if binding.is_quantum() {
                    return Some(id);
                }
                self.diags.report(
                    DiagnosticKind::TypeMismatch,
                    arg.span,
                    format!("{context} expects a qubit reference, found `ref {}`", binding.ty),
                );
                None
            }
            ExprKind::Var(name) => {
                let id = self.resolve(arg, name)?;
                let binding = self.env.binding(id)?;
                if binding.ty.is_qubit_ref() {
                    return Some(id);
                }
                if binding.ty.is_qubit() {
                    self.diags.report(
                        DiagnosticKind::QubitMustBeByReference,
                        arg.span,
                        format!("qubit `{name}` is passed by value to {context}; pass `ref {name}`"),
                    );
                } else if !self.untyped.contains(&id) {
                    self.diags.report(
                        DiagnosticKind::TypeMismatch,
                        arg.span,
                        format!("{context} expects a qubit reference, found `{}`", binding.ty),
                    );
                }
                None
            }
            ExprKind::Qubit(literal) => {
                self.diags.report(
                    DiagnosticKind::QubitMustBeByReference,
                    arg.span,
                    format!("qubit literal `{literal}` is passed by value to {context}"),
                );
                None
            }
            _ => {
                if let Some(found) = self.check_expr(arg) {
                    self.diags.report(
                        DiagnosticKind::TypeMismatch,
                        arg.span,
                        format!("{context} expects a qubit reference, found `{found}`"),
                    );
                }
                None
            }
        }
    }

    /// Report the first qubit named twice among `operands`.
    fn check_distinct(&mut self, span: Span, operands: &[BindingId], context: &str) -> bool {
        let mut seen: FxHashMap<QubitSlot, BindingId> = FxHashMap::default();
        for id in operands {
            let Some(binding) = self.env.binding(*id) else {
                continue;
            };
            let Some(slot) = binding.slot() else {
                continue;
            };
            if seen.insert(slot, *id).is_some() {
                self.diags.report(
                    DiagnosticKind::AliasedQubitOperands,
                    span,
                    format!("qubit `{}` appears more than once in {context}", binding.name),
                );
                return false;
            }
        }
        true
    }

    /// Check the right-hand side of a qubit declaration or assignment
    /// without reporting by-value use of a qubit name; the caller reports
    /// the source itself.
    fn check_qubit_source(&mut self, source: &'p Expr) {
        match &source.kind {
            ExprKind::Var(name) => {
                self.resolve(source, name);
            }
            _ => {
                self.check_expr(source);
            }
        }
    }

    fn report_illegal_source(&mut self, span: Span, name: &str, source: &'p Expr) {
        let before = self.diags.len();
        self.check_qubit_source(source);
        if self.diags.len() > before && matches!(source.kind, ExprKind::Deref(_)) {
            return;
        }
        let message = match &source.kind {
            ExprKind::Var(other) => {
                format!("qubit `{name}` cannot be initialized from `{other}`; qubits cannot be copied")
            }
            _ => format!("qubit `{name}` must be initialized from a fresh qubit literal"),
        };
        self.diags
            .report(DiagnosticKind::IllegalQubitSource, span, message);
    }

    // Helpers

    fn resolve(&mut self, expr: &Expr, name: &str) -> Option<BindingId> {
        match self.env.lookup(name) {
            Some(binding) => {
                let id = binding.id;
                self.annotations.resolutions.insert(expr.id, id);
                Some(id)
            }
            None => {
                self.diags.report(
                    DiagnosticKind::UnknownName,
                    expr.span,
                    format!("cannot find `{name}` in this scope"),
                );
                None
            }
        }
    }

    /// Type an initializer would have, without reporting anything.
    fn peek_type(&self, expr: &Expr) -> Option<Type> {
        match &expr.kind {
            ExprKind::Qubit(_) => Some(Type::Qubit),
            ExprKind::Var(name) => self.env.lookup(name).map(|b| b.ty.clone()),
            ExprKind::Ref(inner) => self.peek_type(inner).map(|ty| {
                if ty.is_qubit_ref() {
                    ty
                } else {
                    Type::reference(ty)
                }
            }),
            ExprKind::Deref(inner) => self.peek_type(inner).and_then(|ty| ty.referent().cloned()),
            _ => None,
        }
    }

    /// Advance the qubit behind `id`, recording the transition on `node`.
    fn apply(&mut self, id: BindingId, event: LinearityEvent, node: NodeId, span: Span) {
        let Some(binding) = self.env.binding(id) else {
            return;
        };
        match self.tracker.advance(binding, event, span) {
            Ok(transition) => {
                self.touched.insert(transition.slot);
                self.annotations
                    .transitions
                    .entry(node)
                    .or_default()
                    .push(transition);
            }
            Err(diagnostic) => self.diags.push(diagnostic),
        }
    }
}
