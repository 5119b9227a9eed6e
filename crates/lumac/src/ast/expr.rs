//! Luma expression nodes

use super::types::TypeNode;
use crate::common::Span;
use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod | Self::Pow
        )
    }

    pub fn is_bitwise(self) -> bool {
        matches!(self, Self::BitAnd | Self::BitOr | Self::BitXor)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::Shr)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }

    pub fn is_relational(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    /// Operators whose result is always `bool`
    pub fn is_comparison(self) -> bool {
        self.is_equality() || self.is_relational()
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Deref,
    AddrOf,
}

/// One `name: value` entry in a struct literal
#[derive(Debug, Clone)]
pub struct FieldInit {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

/// A struct construction literal, e.g. `Point { x: 1, y: 2 }`
#[derive(Debug, Clone)]
pub struct StructLiteral {
    /// Literal's own type name, absent for anonymous `.{ ... }` forms
    pub name: Option<String>,
    pub fields: Vec<FieldInit>,
}

/// One arm of a `switch` expression
#[derive(Debug, Clone)]
pub struct SwitchArm {
    /// Case label expressions; empty for the default arm
    pub labels: Vec<Expr>,
    pub body: Box<Expr>,
    pub is_default: bool,
    pub span: Span,
}

/// Discriminated expression payloads
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Integer literal, kept as source text for arbitrary-precision parsing
    IntLiteral(String),
    FloatLiteral(f64),
    BoolLiteral(bool),
    NullLiteral,
    StringLiteral(String),
    Identifier(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        member: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    StructLiteral(StructLiteral),
    ArrayLiteral(Vec<Expr>),
    TupleLiteral(Vec<Expr>),
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Switch {
        scrutinee: Box<Expr>,
        arms: Vec<SwitchArm>,
    },
    SizeOf(TypeNode),
}

/// An expression node: discriminated kind plus source span
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn int(text: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::IntLiteral(text.into()), span)
    }

    pub fn float(value: f64, span: Span) -> Self {
        Self::new(ExprKind::FloatLiteral(value), span)
    }

    pub fn boolean(value: bool, span: Span) -> Self {
        Self::new(ExprKind::BoolLiteral(value), span)
    }

    pub fn null(span: Span) -> Self {
        Self::new(ExprKind::NullLiteral, span)
    }

    pub fn ident(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Identifier(name.into()), span)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let span = lhs.span.merge(rhs.span);
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }

    pub fn member(object: Expr, member: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExprKind::Member {
                object: Box::new(object),
                member: member.into(),
            },
            span,
        )
    }

    pub fn call(callee: Expr, args: Vec<Expr>, span: Span) -> Self {
        Self::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        )
    }

    /// Identifier payload, if this node is an identifier
    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_member(&self) -> Option<(&Expr, &str)> {
        match &self.kind {
            ExprKind::Member { object, member } => Some((object, member)),
            _ => None,
        }
    }

    pub fn as_struct_literal(&self) -> Option<&StructLiteral> {
        match &self.kind {
            ExprKind::StructLiteral(lit) => Some(lit),
            _ => None,
        }
    }

    /// Stable discriminant name, used in cache keys and internal errors
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::IntLiteral(_) => "IntLiteral",
            ExprKind::FloatLiteral(_) => "FloatLiteral",
            ExprKind::BoolLiteral(_) => "BoolLiteral",
            ExprKind::NullLiteral => "NullLiteral",
            ExprKind::StringLiteral(_) => "StringLiteral",
            ExprKind::Identifier(_) => "Identifier",
            ExprKind::Binary { .. } => "Binary",
            ExprKind::Unary { .. } => "Unary",
            ExprKind::Call { .. } => "Call",
            ExprKind::Member { .. } => "Member",
            ExprKind::Index { .. } => "Index",
            ExprKind::StructLiteral(_) => "StructLiteral",
            ExprKind::ArrayLiteral(_) => "ArrayLiteral",
            ExprKind::TupleLiteral(_) => "TupleLiteral",
            ExprKind::Assign { .. } => "Assign",
            ExprKind::Switch { .. } => "Switch",
            ExprKind::SizeOf(_) => "SizeOf",
        }
    }
}
