//! Luma statement nodes

use super::expr::Expr;
use super::types::TypeNode;
use crate::common::Span;

/// A function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    /// Absent annotations are inferred during validation
    pub ty: Option<TypeNode>,
    pub span: Span,
}

/// A function declaration
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeNode>,
    /// Declared error type; functions without one may not `throw`
    pub error_type: Option<TypeNode>,
    pub body: Vec<Stmt>,
    pub is_static: bool,
    pub is_public: bool,
    pub span: Span,
}

/// An import declaration
#[derive(Debug, Clone)]
pub struct UseDecl {
    pub module_path: String,
    pub alias: Option<String>,
    pub span: Span,
}

/// Discriminated statement payloads
#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Vec<Stmt>),
    Test {
        name: String,
        body: Vec<Stmt>,
    },
    Use(UseDecl),
    /// Named definition: a type (`Def Point = struct {...}`) or a constant
    Def {
        name: String,
        ty: Option<TypeNode>,
        init: Option<Expr>,
        is_public: bool,
    },
    Let {
        name: String,
        ty: Option<TypeNode>,
        init: Option<Expr>,
        mutable: bool,
    },
    Func(FuncDecl),
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        condition: Expr,
    },
    For {
        binding: String,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Defer(Box<Stmt>),
    Throw(Expr),
    Expr(Expr),
}

/// A statement node: discriminated kind plus source span
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn expr(expr: Expr) -> Self {
        let span = expr.span;
        Self::new(StmtKind::Expr(expr), span)
    }

    /// Stable discriminant name, used in internal errors
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            StmtKind::Block(_) => "Block",
            StmtKind::Test { .. } => "Test",
            StmtKind::Use(_) => "Use",
            StmtKind::Def { .. } => "Def",
            StmtKind::Let { .. } => "Let",
            StmtKind::Func(_) => "Func",
            StmtKind::While { .. } => "While",
            StmtKind::DoWhile { .. } => "DoWhile",
            StmtKind::For { .. } => "For",
            StmtKind::Return(_) => "Return",
            StmtKind::Defer(_) => "Defer",
            StmtKind::Throw(_) => "Throw",
            StmtKind::Expr(_) => "Expr",
        }
    }
}
