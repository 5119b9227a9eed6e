//! Symbols: named, typed entities with lifecycle flags
//!
//! Symbols live in an arena owned by the symbol table and are addressed
//! by `SymbolId`. They are mutated in place (flags, inferred type) and
//! never deleted within a pass. Instead of a loose metadata bag, each
//! symbol kind carries an explicit payload variant so a parameter cannot
//! accidentally grow import linkage.

use crate::ast::TypeNode;
use crate::common::Span;
use crate::sema::scope::ScopeId;
use string_interner::DefaultSymbol;

/// Interned symbol name
pub type NameId = DefaultSymbol;

/// Arena handle for a symbol; stable for the whole pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// What a symbol names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Import introduced by a `use` statement
    Use,
    /// Named definition (type or constant)
    Definition,
    Variable,
    Function,
    Parameter,
    StructField,
    EnumVariant,
    /// Error-set member
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutability {
    #[default]
    Immutable,
    Mutable,
}

/// Kind-specific symbol data
#[derive(Debug, Clone, Default)]
pub enum SymbolPayload {
    #[default]
    None,
    Function {
        params: Vec<TypeNode>,
        return_type: Option<TypeNode>,
        is_static: bool,
        is_builtin: bool,
    },
    /// Linkage for imported symbols
    Import {
        source_module: String,
        source_path: String,
        alias: Option<String>,
        original: Option<SymbolId>,
    },
    Field {
        is_static: bool,
        has_default: bool,
    },
    /// Constant definition with a known initializer, inlinable at comptime
    Const {
        initializer: Box<crate::ast::Expr>,
    },
    EnumVariant {
        owner: String,
        index: usize,
    },
    ErrorMember {
        owner: String,
    },
}

/// A named entity in the symbol table
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: NameId,
    pub kind: SymbolKind,
    /// Declared or inferred type, set during validation
    pub ty: Option<TypeNode>,
    pub owning_scope: ScopeId,
    pub context_span: Span,
    pub target_span: Option<Span>,
    pub declared: bool,
    pub initialized: bool,
    pub used: bool,
    pub type_checked: bool,
    pub visibility: Visibility,
    pub mutability: Mutability,
    pub payload: SymbolPayload,
    /// Seeded by the table reset, never by user code
    pub builtin: bool,
    pub is_exported: bool,
    pub export_alias: Option<String>,
}

impl Symbol {
    pub fn new(id: SymbolId, name: NameId, kind: SymbolKind, owning_scope: ScopeId) -> Self {
        Self {
            id,
            name,
            kind,
            ty: None,
            owning_scope,
            context_span: Span::default(),
            target_span: None,
            declared: true,
            initialized: false,
            used: false,
            type_checked: false,
            visibility: Visibility::default(),
            mutability: Mutability::default(),
            payload: SymbolPayload::default(),
            builtin: false,
            is_exported: false,
            export_alias: None,
        }
    }

    pub fn is_mutable(&self) -> bool {
        self.mutability == Mutability::Mutable
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin || matches!(self.payload, SymbolPayload::Function { is_builtin: true, .. })
    }

    pub fn is_import(&self) -> bool {
        self.kind == SymbolKind::Use
    }

    pub fn is_static_member(&self) -> bool {
        match &self.payload {
            SymbolPayload::Function { is_static, .. } => *is_static,
            SymbolPayload::Field { is_static, .. } => *is_static,
            _ => false,
        }
    }

    /// Initializer expression, for constants the evaluator may inline
    pub fn initializer(&self) -> Option<&crate::ast::Expr> {
        match &self.payload {
            SymbolPayload::Const { initializer } => Some(initializer),
            _ => None,
        }
    }
}

/// Options applied when defining a new symbol
#[derive(Debug, Clone, Default)]
pub struct DefineOpts {
    pub ty: Option<TypeNode>,
    pub context_span: Span,
    pub target_span: Option<Span>,
    pub visibility: Visibility,
    pub mutability: Mutability,
    pub payload: SymbolPayload,
    /// Namespace to index the symbol under, if any
    pub namespace: Option<String>,
    pub initialized: bool,
}
