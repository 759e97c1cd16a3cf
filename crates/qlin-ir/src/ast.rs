//! Scope-resolved, type-annotated syntax tree.
//!
//! This is the input to the resource checker. The surface parser is not part
//! of this workspace; front ends build these nodes directly, and tests and
//! demos use [`ProgramBuilder`] to number nodes and assign positions.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IrResult;
use crate::span::Span;
use crate::types::{Mutability, Type};

/// Stable identifier of a statement or expression node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fresh qubit literal: `0q0` or `0q1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QubitLiteral {
    /// `0q0`, the |0> state.
    Zero,
    /// `0q1`, the |1> state.
    One,
}

impl fmt::Display for QubitLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QubitLiteral::Zero => write!(f, "0q0"),
            QubitLiteral::One => write!(f, "0q1"),
        }
    }
}

/// Classical binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `+`
    Add,
    /// `-`
    Sub,
}

impl BinOp {
    /// Source spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Add => "+",
            BinOp::Sub => "-",
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    /// Node identifier.
    pub id: NodeId,
    /// The expression itself.
    pub kind: ExprKind,
    /// Source position.
    pub span: Span,
}

/// Expression variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Fresh qubit literal.
    Qubit(QubitLiteral),
    /// Bit literal.
    Bit(bool),
    /// Integer literal.
    Integer(i64),
    /// Variable use.
    Var(String),
    /// `ref e`
    Ref(Box<Expr>),
    /// `*e`
    Deref(Box<Expr>),
    /// `Quant.<gate>(args)`
    Gate {
        /// Catalog identifier of the gate.
        name: String,
        /// Qubit references, controls first.
        args: Vec<Expr>,
    },
    /// `cast(ref q) -> bit`
    Measure(Box<Expr>),
    /// Call of a user function.
    Call {
        /// Function name.
        callee: String,
        /// Arguments, in order.
        args: Vec<Expr>,
    },
    /// Classical binary operation.
    Binary {
        /// Operator.
        op: BinOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
}

impl Expr {
    fn new(kind: ExprKind) -> Self {
        Self {
            id: NodeId::default(),
            kind,
            span: Span::default(),
        }
    }

    /// `0q0` / `0q1`
    pub fn qubit(literal: QubitLiteral) -> Self {
        Self::new(ExprKind::Qubit(literal))
    }

    /// Bit literal.
    pub fn bit(value: bool) -> Self {
        Self::new(ExprKind::Bit(value))
    }

    /// Integer literal.
    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::Integer(value))
    }

    /// Variable use.
    pub fn var(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Var(name.into()))
    }

    /// `ref e`
    pub fn reference(inner: Expr) -> Self {
        Self::new(ExprKind::Ref(Box::new(inner)))
    }

    /// `ref name`
    pub fn ref_var(name: impl Into<String>) -> Self {
        Self::reference(Self::var(name))
    }

    /// `*e`
    pub fn deref(inner: Expr) -> Self {
        Self::new(ExprKind::Deref(Box::new(inner)))
    }

    /// `Quant.<name>(args)`
    pub fn gate(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Gate {
            name: name.into(),
            args,
        })
    }

    /// `cast(e) -> bit`
    pub fn measure(target: Expr) -> Self {
        Self::new(ExprKind::Measure(Box::new(target)))
    }

    /// `callee(args)`
    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call {
            callee: callee.into(),
            args,
        })
    }

    /// `lhs op rhs`
    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    /// Whether this is a fresh qubit literal.
    pub fn is_qubit_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Qubit(_))
    }

    /// Visit this expression and all sub-expressions in pre-order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match &self.kind {
            ExprKind::Qubit(_) | ExprKind::Bit(_) | ExprKind::Integer(_) | ExprKind::Var(_) => {}
            ExprKind::Ref(inner) | ExprKind::Deref(inner) | ExprKind::Measure(inner) => {
                inner.walk(f);
            }
            ExprKind::Gate { args, .. } | ExprKind::Call { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
        }
    }

    fn children_mut(&mut self) -> Vec<&mut Expr> {
        match &mut self.kind {
            ExprKind::Qubit(_) | ExprKind::Bit(_) | ExprKind::Integer(_) | ExprKind::Var(_) => {
                vec![]
            }
            ExprKind::Ref(inner) | ExprKind::Deref(inner) | ExprKind::Measure(inner) => {
                vec![inner.as_mut()]
            }
            ExprKind::Gate { args, .. } | ExprKind::Call { args, .. } => args.iter_mut().collect(),
            ExprKind::Binary { lhs, rhs, .. } => vec![lhs.as_mut(), rhs.as_mut()],
        }
    }
}

/// A statement node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Node identifier.
    pub id: NodeId,
    /// The statement itself.
    pub kind: StmtKind,
    /// Source position.
    pub span: Span,
}

/// Statement variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `val name[: ty] = init` / `var name[: ty] [= init]`
    Let {
        /// Bound name.
        name: String,
        /// `val` or `var`.
        mutability: Mutability,
        /// Declared type, if written.
        ty: Option<Type>,
        /// Initializer, if any.
        init: Option<Expr>,
    },
    /// `name = value`
    Assign {
        /// Assigned name.
        name: String,
        /// New value.
        value: Expr,
    },
    /// Expression evaluated for its effect.
    Expr(Expr),
    /// `if cond { .. } else { .. }`
    If {
        /// Condition.
        cond: Expr,
        /// Statements run when the condition holds.
        then_branch: Vec<Stmt>,
        /// Statements run otherwise.
        else_branch: Option<Vec<Stmt>>,
    },
    /// `return [value]`
    Return(Option<Expr>),
}

impl Stmt {
    fn new(kind: StmtKind) -> Self {
        Self {
            id: NodeId::default(),
            kind,
            span: Span::default(),
        }
    }

    /// `val name = init`
    pub fn val(name: impl Into<String>, init: Expr) -> Self {
        Self::new(StmtKind::Let {
            name: name.into(),
            mutability: Mutability::Immutable,
            ty: None,
            init: Some(init),
        })
    }

    /// `var name = init`
    pub fn var(name: impl Into<String>, init: Expr) -> Self {
        Self::new(StmtKind::Let {
            name: name.into(),
            mutability: Mutability::Mutable,
            ty: None,
            init: Some(init),
        })
    }

    /// `val name: ty = init`
    pub fn val_typed(name: impl Into<String>, ty: Type, init: Expr) -> Self {
        Self::new(StmtKind::Let {
            name: name.into(),
            mutability: Mutability::Immutable,
            ty: Some(ty),
            init: Some(init),
        })
    }

    /// `var name: ty` with no initializer.
    pub fn declare(name: impl Into<String>, ty: Type) -> Self {
        Self::new(StmtKind::Let {
            name: name.into(),
            mutability: Mutability::Mutable,
            ty: Some(ty),
            init: None,
        })
    }

    /// `name = value`
    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Self::new(StmtKind::Assign {
            name: name.into(),
            value,
        })
    }

    /// Expression statement.
    pub fn expr(expr: Expr) -> Self {
        Self::new(StmtKind::Expr(expr))
    }

    /// `if cond { then }`
    pub fn if_then(cond: Expr, then_branch: Vec<Stmt>) -> Self {
        Self::new(StmtKind::If {
            cond,
            then_branch,
            else_branch: None,
        })
    }

    /// `if cond { then } else { other }`
    pub fn if_else(cond: Expr, then_branch: Vec<Stmt>, else_branch: Vec<Stmt>) -> Self {
        Self::new(StmtKind::If {
            cond,
            then_branch,
            else_branch: Some(else_branch),
        })
    }

    /// `return [value]`
    pub fn ret(value: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(value))
    }

    /// Visit every expression directly or transitively owned by this
    /// statement, including nested branches, in pre-order.
    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        match &self.kind {
            StmtKind::Let { init, .. } => {
                if let Some(init) = init {
                    init.walk(f);
                }
            }
            StmtKind::Assign { value, .. } => value.walk(f),
            StmtKind::Expr(expr) => expr.walk(f),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.walk(f);
                for stmt in then_branch {
                    stmt.walk_exprs(f);
                }
                for stmt in else_branch.iter().flatten() {
                    stmt.walk_exprs(f);
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    value.walk(f);
                }
            }
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: Type,
    /// Mutability class.
    pub mutability: Mutability,
    /// Source position.
    pub span: Span,
}

impl Param {
    /// Create an immutable parameter.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            mutability: Mutability::Immutable,
            span: Span::default(),
        }
    }

    /// Create a `ref qubit` parameter.
    pub fn qubit_ref(name: impl Into<String>) -> Self {
        Self::new(name, Type::qubit_ref())
    }
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Function name.
    pub name: String,
    /// Parameters, in order.
    pub params: Vec<Param>,
    /// Declared return type.
    pub ret: Type,
    /// Body statements.
    pub body: Vec<Stmt>,
    /// Source position of the declaration.
    pub span: Span,
}

impl Function {
    /// Create a function declaration.
    pub fn new(name: impl Into<String>, params: Vec<Param>, ret: Type, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            body,
            span: Span::default(),
        }
    }

    /// The function's type.
    pub fn signature(&self) -> Type {
        Type::function(
            self.params.iter().map(|p| p.ty.clone()).collect(),
            self.ret.clone(),
        )
    }
}

/// A translation unit: function declarations plus the entry statements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Declared functions.
    pub functions: Vec<Function>,
    /// Entry-point statements, executed in order.
    pub body: Vec<Stmt>,
}

impl Program {
    /// Look up a function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON produced by a front end.
    ///
    /// A tree whose node ids collide is renumbered; spans are kept.
    pub fn from_json(json: &str) -> IrResult<Self> {
        let mut program: Program = serde_json::from_str(json)?;
        if !program.duplicate_ids().is_empty() {
            program.renumber();
        }
        Ok(program)
    }

    /// Every repeated use of a node id, with the span of the repeating node.
    ///
    /// Checker annotations are keyed by [`NodeId`], so a tree is only
    /// meaningful to the later stages when this is empty.
    pub fn duplicate_ids(&self) -> Vec<(NodeId, Span)> {
        let mut seen = FxHashSet::default();
        let mut duplicates = Vec::new();
        let mut record = |id: NodeId, span: Span| {
            if !seen.insert(id) {
                duplicates.push((id, span));
            }
        };
        for function in &self.functions {
            visit_nodes(&function.body, &mut record);
        }
        visit_nodes(&self.body, &mut record);
        duplicates
    }

    /// Give every statement and expression a fresh id, keeping spans.
    pub fn renumber(&mut self) {
        Locator::new(false).locate_program(self);
    }
}

fn visit_nodes(stmts: &[Stmt], f: &mut impl FnMut(NodeId, Span)) {
    for stmt in stmts {
        f(stmt.id, stmt.span);
        match &stmt.kind {
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.walk(&mut |e| f(e.id, e.span));
                visit_nodes(then_branch, f);
                if let Some(else_branch) = else_branch {
                    visit_nodes(else_branch, f);
                }
            }
            _ => stmt.walk_exprs(&mut |e| f(e.id, e.span)),
        }
    }
}

/// Builder that assembles a [`Program`] and numbers its nodes.
///
/// Every statement is placed on its own line (functions first, then the
/// entry body) and expressions get increasing columns on their statement's
/// line, so diagnostics on built programs carry usable positions.
///
/// ```rust
/// use qlin_ir::ast::{Expr, ProgramBuilder, QubitLiteral, Stmt};
///
/// let program = ProgramBuilder::new()
///     .stmt(Stmt::val("q", Expr::qubit(QubitLiteral::Zero)))
///     .stmt(Stmt::expr(Expr::gate("had", vec![Expr::ref_var("q")])))
///     .build();
///
/// assert_eq!(program.body.len(), 2);
/// assert_eq!(program.body[1].span.line, 2);
/// ```
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    functions: Vec<Function>,
    body: Vec<Stmt>,
}

impl ProgramBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function declaration.
    #[must_use]
    pub fn function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    /// Append an entry-point statement.
    #[must_use]
    pub fn stmt(mut self, stmt: Stmt) -> Self {
        self.body.push(stmt);
        self
    }

    /// Append several entry-point statements.
    #[must_use]
    pub fn stmts(mut self, stmts: impl IntoIterator<Item = Stmt>) -> Self {
        self.body.extend(stmts);
        self
    }

    /// Number every node and return the program.
    pub fn build(self) -> Program {
        let mut program = Program {
            functions: self.functions,
            body: self.body,
        };
        Locator::new(true).locate_program(&mut program);
        program
    }
}

struct Locator {
    next_id: u32,
    line: u32,
    assign_spans: bool,
}

impl Locator {
    fn new(assign_spans: bool) -> Self {
        Self {
            next_id: 0,
            line: 0,
            assign_spans,
        }
    }

    fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn next_line(&mut self) -> u32 {
        self.line += 1;
        self.line
    }

    fn locate_program(&mut self, program: &mut Program) {
        for function in &mut program.functions {
            let line = self.next_line();
            if self.assign_spans {
                function.span = Span::new(line, 1);
                let mut column = 2;
                for param in &mut function.params {
                    param.span = Span::new(line, column);
                    column += 1;
                }
            }
            self.locate_block(&mut function.body);
        }
        self.locate_block(&mut program.body);
    }

    fn locate_block(&mut self, stmts: &mut [Stmt]) {
        for stmt in stmts {
            self.locate_stmt(stmt);
        }
    }

    fn locate_stmt(&mut self, stmt: &mut Stmt) {
        let line = self.next_line();
        stmt.id = self.fresh_id();
        if self.assign_spans {
            stmt.span = Span::new(line, 1);
        }
        let mut column = 2;
        match &mut stmt.kind {
            StmtKind::Let { init, .. } => {
                if let Some(init) = init {
                    self.locate_expr(init, line, &mut column);
                }
            }
            StmtKind::Assign { value, .. } => self.locate_expr(value, line, &mut column),
            StmtKind::Expr(expr) => self.locate_expr(expr, line, &mut column),
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.locate_expr(cond, line, &mut column);
                self.locate_block(then_branch);
                if let Some(else_branch) = else_branch {
                    self.locate_block(else_branch);
                }
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.locate_expr(value, line, &mut column);
                }
            }
        }
    }

    fn locate_expr(&mut self, expr: &mut Expr, line: u32, column: &mut u32) {
        expr.id = self.fresh_id();
        if self.assign_spans {
            expr.span = Span::new(line, *column);
        }
        *column += 1;
        for child in expr.children_mut() {
            self.locate_expr(child, line, column);
        }
    }
}
