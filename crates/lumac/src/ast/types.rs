//! Luma type nodes

use super::expr::Expr;
use super::stmt::FuncDecl;
use crate::common::Span;
use std::fmt;

/// Built-in primitive types with fixed semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Void,
    /// Untyped integer literal, adopts a concrete type from context
    ComptimeInt,
    /// Untyped float literal, adopts a concrete type from context
    ComptimeFloat,
    /// Accepts any type
    Any,
    /// Accepts any error-set type or member
    AnyError,
    /// The type of the `null` literal
    Null,
}

impl PrimitiveType {
    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    pub fn is_integer(self) -> bool {
        self.is_signed() || self.is_unsigned() || self == Self::ComptimeInt
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64 | Self::ComptimeFloat)
    }

    /// Declared bit width, where one exists
    pub fn bit_width(self) -> Option<u32> {
        match self {
            Self::I8 | Self::U8 => Some(8),
            Self::I16 | Self::U16 => Some(16),
            Self::I32 | Self::U32 | Self::F32 => Some(32),
            Self::I64 | Self::U64 | Self::F64 => Some(64),
            Self::Bool => Some(1),
            Self::Void => Some(0),
            Self::ComptimeInt | Self::ComptimeFloat | Self::Any | Self::AnyError | Self::Null => {
                None
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
            Self::Void => "void",
            Self::ComptimeInt => "comptime_int",
            Self::ComptimeFloat => "comptime_float",
            Self::Any => "any",
            Self::AnyError => "anyerror",
            Self::Null => "null",
        }
    }
}

/// A field declared inside a struct type
#[derive(Debug, Clone)]
pub struct StructFieldDecl {
    pub name: String,
    pub ty: TypeNode,
    pub is_static: bool,
    pub default: Option<Expr>,
    pub span: Span,
}

/// A struct type declaration: fields plus methods
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<StructFieldDecl>,
    pub methods: Vec<FuncDecl>,
}

impl StructDecl {
    pub fn field(&self, name: &str) -> Option<&StructFieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&FuncDecl> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// An enum type declaration
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub variants: Vec<(String, Span)>,
}

impl EnumDecl {
    pub fn has_variant(&self, name: &str) -> bool {
        self.variants.iter().any(|(v, _)| v == name)
    }
}

/// A closed set of named error variants
#[derive(Debug, Clone)]
pub struct ErrorSetDecl {
    pub name: String,
    pub members: Vec<(String, Span)>,
}

impl ErrorSetDecl {
    pub fn has_member(&self, name: &str) -> bool {
        self.members.iter().any(|(m, _)| m == name)
    }
}

/// Discriminated type-node payloads
#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(PrimitiveType),
    /// Reference to a named definition (alias, struct, enum, error set)
    Named(String),
    Optional(Box<TypeNode>),
    Pointer {
        mutable: bool,
        inner: Box<TypeNode>,
    },
    Array {
        element: Box<TypeNode>,
        /// Element count; must be comptime-evaluable where a size is required
        size: Option<Box<Expr>>,
    },
    Tuple(Vec<TypeNode>),
    Struct(StructDecl),
    Enum(EnumDecl),
    ErrorSet(ErrorSetDecl),
    Union(Vec<TypeNode>),
    Function {
        params: Vec<TypeNode>,
        ret: Box<TypeNode>,
    },
}

/// A type node: discriminated kind plus source span
#[derive(Debug, Clone)]
pub struct TypeNode {
    pub kind: TypeKind,
    pub span: Span,
}

impl TypeNode {
    pub fn new(kind: TypeKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn primitive(p: PrimitiveType, span: Span) -> Self {
        Self::new(TypeKind::Primitive(p), span)
    }

    pub fn named(name: impl Into<String>, span: Span) -> Self {
        Self::new(TypeKind::Named(name.into()), span)
    }

    pub fn void(span: Span) -> Self {
        Self::primitive(PrimitiveType::Void, span)
    }

    pub fn bool(span: Span) -> Self {
        Self::primitive(PrimitiveType::Bool, span)
    }

    pub fn optional(inner: TypeNode) -> Self {
        let span = inner.span;
        Self::new(TypeKind::Optional(Box::new(inner)), span)
    }

    pub fn pointer(inner: TypeNode, mutable: bool) -> Self {
        let span = inner.span;
        Self::new(
            TypeKind::Pointer {
                mutable,
                inner: Box::new(inner),
            },
            span,
        )
    }

    pub fn is_signed(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(p) if p.is_signed())
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(p) if p.is_unsigned())
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(p) if p.is_integer())
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(p) if p.is_float())
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(PrimitiveType::Bool))
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(PrimitiveType::Void))
    }

    pub fn is_comptime(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Primitive(PrimitiveType::ComptimeInt | PrimitiveType::ComptimeFloat)
        )
    }

    pub fn is_any(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(PrimitiveType::Any))
    }

    pub fn is_anyerror(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(PrimitiveType::AnyError))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, TypeKind::Primitive(PrimitiveType::Null))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum(_))
    }

    pub fn is_error_set(&self) -> bool {
        matches!(self.kind, TypeKind::ErrorSet(_))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.kind, TypeKind::Optional(_))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer { .. })
    }

    /// Declared bit width for primitives; `None` for everything else
    pub fn bit_width(&self) -> Option<u32> {
        match self.kind {
            TypeKind::Primitive(p) => p.bit_width(),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructDecl> {
        match &self.kind {
            TypeKind::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDecl> {
        match &self.kind {
            TypeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_error_set(&self) -> Option<&ErrorSetDecl> {
        match &self.kind {
            TypeKind::ErrorSet(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_named(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Named(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Primitive(p) => write!(f, "{}", p.name()),
            TypeKind::Named(n) => write!(f, "{n}"),
            TypeKind::Optional(inner) => write!(f, "?{inner}"),
            TypeKind::Pointer { mutable, inner } => {
                if *mutable {
                    write!(f, "*mut {inner}")
                } else {
                    write!(f, "*{inner}")
                }
            }
            TypeKind::Array { element, size } => {
                if size.is_some() {
                    write!(f, "[_]{element}")
                } else {
                    write!(f, "[]{element}")
                }
            }
            TypeKind::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            TypeKind::Struct(s) => write!(f, "struct {}", s.name),
            TypeKind::Enum(e) => write!(f, "enum {}", e.name),
            TypeKind::ErrorSet(e) => write!(f, "error {}", e.name),
            TypeKind::Union(alts) => {
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{alt}")?;
                }
                Ok(())
            }
            TypeKind::Function { params, ret } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") {ret}")
            }
        }
    }
}
