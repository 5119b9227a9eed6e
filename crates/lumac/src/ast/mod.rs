//! Luma AST interface
//!
//! The analysis core consumes a parsed forest of per-module ASTs. Node
//! construction (lexing/parsing) lives outside this crate; these types are
//! the contract: every node carries a discriminated kind and a byte-range
//! span, and payload access goes through typed accessors.

mod expr;
mod stmt;
mod types;

pub use expr::{
    BinaryOp, Expr, ExprKind, FieldInit, StructLiteral, SwitchArm, UnaryOp,
};
pub use stmt::{FuncDecl, Param, Stmt, StmtKind, UseDecl};
pub use types::{
    EnumDecl, ErrorSetDecl, PrimitiveType, StructDecl, StructFieldDecl, TypeKind, TypeNode,
};

use crate::common::Span;

/// One parsed module: a name, the path it was loaded from, and its
/// top-level statements
#[derive(Debug, Clone)]
pub struct Module {
    pub name: String,
    pub path: String,
    pub statements: Vec<Stmt>,
    pub span: Span,
}

impl Module {
    pub fn new(name: impl Into<String>, path: impl Into<String>, statements: Vec<Stmt>) -> Self {
        let span = statements
            .iter()
            .map(|s| s.span)
            .reduce(|a, b| a.merge(b))
            .unwrap_or_default();
        Self {
            name: name.into(),
            path: path.into(),
            statements,
            span,
        }
    }
}
