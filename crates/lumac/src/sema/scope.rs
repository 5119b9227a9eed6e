//! Scope tree and symbol table
//!
//! Scopes and symbols live in index-based arenas addressed by `ScopeId`
//! and `SymbolId`; ids are stable and never recycled within a pass. The
//! tree is built top-down and never reparented, so it is acyclic by
//! construction. A single "current scope" cursor moves with the walk;
//! `with_scope` re-enters an arbitrary scope and restores the cursor
//! unconditionally, including on the error path.

use crate::ast::{PrimitiveType, TypeNode};
use crate::common::{CompileError, CompileResult, IdGen, Span};
use crate::sema::symbol::{
    DefineOpts, NameId, Symbol, SymbolId, SymbolKind, SymbolPayload,
};
use std::collections::HashMap;
use string_interner::{DefaultBackend, StringInterner};

/// Arena handle for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    /// The reserved root (Global) scope
    pub const ROOT: ScopeId = ScopeId(0);
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::ROOT
    }
}

/// What lexical region a scope covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    Loop,
    Block,
    Expression,
    Type,
}

/// A lexical scope: a name→symbol map plus a position in the tree
#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub name: String,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub symbols: HashMap<NameId, SymbolId>,
    pub level: u32,
}

/// Flags for the most general resolution entry point
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveFlags<'a> {
    /// Search this namespace before any scope walk
    pub namespace: Option<&'a str>,
    /// Only consider the current scope
    pub current_scope_only: bool,
    /// Walk parent scopes when the current scope misses
    pub include_parents: bool,
}

/// Outcome of `define_symbol`: the new id, plus the id it displaced.
/// Duplicate policy layers on the displaced id; the table itself stays
/// last-write-wins and silent.
#[derive(Debug, Clone, Copy)]
pub struct DefineOutcome {
    pub id: SymbolId,
    pub replaced: Option<SymbolId>,
}

/// The scope tree, symbol arena and namespace index
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    interner: StringInterner<DefaultBackend>,
    namespaces: HashMap<String, Vec<SymbolId>>,
    scope_ids: IdGen,
    symbol_ids: IdGen,
    current: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = Self {
            scopes: Vec::new(),
            symbols: Vec::new(),
            interner: StringInterner::new(),
            namespaces: HashMap::new(),
            scope_ids: IdGen::new(),
            symbol_ids: IdGen::new(),
            current: ScopeId::ROOT,
        };
        table.seed();
        table
    }

    /// Clear everything and re-seed the built-in symbols
    pub fn reset(&mut self) {
        self.scopes.clear();
        self.symbols.clear();
        self.namespaces.clear();
        self.scope_ids.reset();
        self.symbol_ids.reset();
        self.current = ScopeId::ROOT;
        self.seed();
    }

    fn seed(&mut self) {
        debug_assert!(self.scopes.is_empty());
        let root = ScopeId(self.scope_ids.next_id());
        debug_assert_eq!(root, ScopeId::ROOT);
        self.scopes.push(Scope {
            id: root,
            kind: ScopeKind::Global,
            name: "global".to_string(),
            parent: None,
            children: Vec::new(),
            symbols: HashMap::new(),
            level: 0,
        });

        let span = Span::default();
        let print = self.define_symbol(
            "print",
            SymbolKind::Function,
            DefineOpts {
                ty: Some(TypeNode::new(
                    crate::ast::TypeKind::Function {
                        params: vec![TypeNode::primitive(PrimitiveType::Any, span)],
                        ret: Box::new(TypeNode::void(span)),
                    },
                    span,
                )),
                payload: SymbolPayload::Function {
                    params: vec![TypeNode::primitive(PrimitiveType::Any, span)],
                    return_type: Some(TypeNode::void(span)),
                    is_static: false,
                    is_builtin: true,
                },
                initialized: true,
                ..DefineOpts::default()
            },
        );
        self.symbols[print.id.0 as usize].builtin = true;

        let aliases: [(&str, PrimitiveType); 5] = [
            ("int", PrimitiveType::I32),
            ("uint", PrimitiveType::U32),
            ("float", PrimitiveType::F64),
            ("byte", PrimitiveType::U8),
            ("unit", PrimitiveType::Void),
        ];
        for (alias, target) in aliases {
            let outcome = self.define_symbol(
                alias,
                SymbolKind::Definition,
                DefineOpts {
                    ty: Some(TypeNode::primitive(target, span)),
                    initialized: true,
                    ..DefineOpts::default()
                },
            );
            self.symbols[outcome.id.0 as usize].builtin = true;
        }
    }

    // ----- scope management -----

    /// Create a scope under `parent` (the current scope when `None`)
    pub fn create_scope(
        &mut self,
        kind: ScopeKind,
        name: impl Into<String>,
        parent: Option<ScopeId>,
    ) -> CompileResult<ScopeId> {
        let parent_id = parent.unwrap_or(self.current);
        let level = self.scope(parent_id)?.level + 1;
        let id = ScopeId(self.scope_ids.next_id());
        self.scopes.push(Scope {
            id,
            kind,
            name: name.into(),
            parent: Some(parent_id),
            children: Vec::new(),
            symbols: HashMap::new(),
            level,
        });
        self.scopes[parent_id.0 as usize].children.push(id);
        Ok(id)
    }

    pub fn scope(&self, id: ScopeId) -> CompileResult<&Scope> {
        self.scopes
            .get(id.0 as usize)
            .ok_or(CompileError::UnknownScope(id.0))
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn enter_scope(&mut self, id: ScopeId) -> CompileResult<()> {
        self.scope(id)?;
        self.current = id;
        Ok(())
    }

    /// Move the cursor to the parent scope; a no-op at the root
    pub fn exit_scope(&mut self) -> Option<ScopeId> {
        let parent = self.scopes[self.current.0 as usize].parent?;
        self.current = parent;
        Some(parent)
    }

    /// Run `f` with the cursor moved to `id`, restoring the previous
    /// cursor no matter how `f` exits
    pub fn with_scope<T>(
        &mut self,
        id: ScopeId,
        f: impl FnOnce(&mut SymbolTable) -> CompileResult<T>,
    ) -> CompileResult<T> {
        self.scope(id)?;
        let prev = self.current;
        let guard = CursorGuard { table: self, prev };
        guard.table.current = id;
        f(&mut *guard.table)
    }

    // ----- definition -----

    /// Define a symbol in the current scope. Re-defining a name in the
    /// same scope overwrites the table entry (last write wins); the
    /// displaced id is returned so callers can layer duplicate policy.
    pub fn define_symbol(
        &mut self,
        name: &str,
        kind: SymbolKind,
        opts: DefineOpts,
    ) -> DefineOutcome {
        let name_id = self.interner.get_or_intern(name);
        let id = SymbolId(self.symbol_ids.next_id());
        let mut symbol = Symbol::new(id, name_id, kind, self.current);
        symbol.ty = opts.ty;
        symbol.context_span = opts.context_span;
        symbol.target_span = opts.target_span;
        symbol.visibility = opts.visibility;
        symbol.mutability = opts.mutability;
        symbol.payload = opts.payload;
        symbol.initialized = opts.initialized;
        self.symbols.push(symbol);

        if let Some(namespace) = opts.namespace {
            self.namespaces.entry(namespace).or_default().push(id);
        }

        let replaced = self.scopes[self.current.0 as usize]
            .symbols
            .insert(name_id, id);
        DefineOutcome { id, replaced }
    }

    // ----- resolution -----

    /// Flagged lookup: optional namespace-first search, otherwise a
    /// scope-chain walk honoring the flags
    pub fn resolve_symbol(&self, name: &str, flags: ResolveFlags<'_>) -> Option<SymbolId> {
        let name_id = self.interner.get(name)?;

        if let Some(namespace) = flags.namespace {
            if let Some(ids) = self.namespaces.get(namespace) {
                if let Some(&id) = ids
                    .iter()
                    .rev()
                    .find(|&&id| self.symbols[id.0 as usize].name == name_id)
                {
                    return Some(id);
                }
            }
        }

        let mut scope = self.current;
        loop {
            if let Some(&id) = self.scopes[scope.0 as usize].symbols.get(&name_id) {
                return Some(id);
            }
            if flags.current_scope_only || !flags.include_parents {
                return None;
            }
            scope = self.scopes[scope.0 as usize].parent?;
        }
    }

    /// Canonical resolver used by the validator; module scopes are hard
    /// boundaries except for imports and builtins
    pub fn lookup_symbol(&self, name: &str) -> Option<&Symbol> {
        self.lookup_symbol_in_scope_chain(name, self.current)
    }

    /// Resolve `name` starting at `from`:
    /// 1. scopes strictly between `from` and the enclosing module scope;
    /// 2. the module scope itself;
    /// 3. Type-kind child scopes of the module (sibling type names);
    /// 4. the Global scope, accepting only imports and builtins.
    pub fn lookup_symbol_in_scope_chain(&self, name: &str, from: ScopeId) -> Option<&Symbol> {
        let name_id = self.interner.get(name)?;
        let module = self.enclosing_module(from);

        let mut scope = Some(from);
        while let Some(id) = scope {
            if Some(id) == module || id == ScopeId::ROOT {
                break;
            }
            if let Some(&sym) = self.scopes[id.0 as usize].symbols.get(&name_id) {
                return Some(&self.symbols[sym.0 as usize]);
            }
            scope = self.scopes[id.0 as usize].parent;
        }

        if let Some(module) = module {
            if let Some(&sym) = self.scopes[module.0 as usize].symbols.get(&name_id) {
                return Some(&self.symbols[sym.0 as usize]);
            }
            for &child in &self.scopes[module.0 as usize].children {
                let child_scope = &self.scopes[child.0 as usize];
                if child_scope.kind != ScopeKind::Type {
                    continue;
                }
                if let Some(&sym) = child_scope.symbols.get(&name_id) {
                    return Some(&self.symbols[sym.0 as usize]);
                }
            }
        }

        if let Some(&sym) = self.scopes[ScopeId::ROOT.0 as usize].symbols.get(&name_id) {
            let symbol = &self.symbols[sym.0 as usize];
            if symbol.is_import() || symbol.is_builtin() {
                return Some(symbol);
            }
        }
        None
    }

    /// Unconditional chain walk, ignoring module boundaries
    pub fn lookup_symbol_in_parent_scopes(&self, name: &str, from: ScopeId) -> Option<&Symbol> {
        let name_id = self.interner.get(name)?;
        let mut scope = Some(from);
        while let Some(id) = scope {
            if let Some(&sym) = self.scopes[id.0 as usize].symbols.get(&name_id) {
                return Some(&self.symbols[sym.0 as usize]);
            }
            scope = self.scopes[id.0 as usize].parent;
        }
        None
    }

    /// Nearest enclosing Module-kind scope, including `from` itself
    pub fn enclosing_module(&self, from: ScopeId) -> Option<ScopeId> {
        let mut scope = Some(from);
        while let Some(id) = scope {
            if self.scopes[id.0 as usize].kind == ScopeKind::Module {
                return Some(id);
            }
            scope = self.scopes[id.0 as usize].parent;
        }
        None
    }

    // ----- symbol access & mutation -----

    pub fn symbol(&self, id: SymbolId) -> CompileResult<&Symbol> {
        self.symbols
            .get(id.0 as usize)
            .ok_or(CompileError::UnknownSymbol(id.0))
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> CompileResult<&mut Symbol> {
        self.symbols
            .get_mut(id.0 as usize)
            .ok_or(CompileError::UnknownSymbol(id.0))
    }

    pub fn mark_symbol_used(&mut self, id: SymbolId) -> CompileResult<()> {
        self.symbol_mut(id)?.used = true;
        Ok(())
    }

    pub fn mark_symbol_initialized(&mut self, id: SymbolId) -> CompileResult<()> {
        self.symbol_mut(id)?.initialized = true;
        Ok(())
    }

    pub fn mark_symbol_type_checked(&mut self, id: SymbolId) -> CompileResult<()> {
        self.symbol_mut(id)?.type_checked = true;
        Ok(())
    }

    pub fn set_symbol_type(&mut self, id: SymbolId, ty: TypeNode) -> CompileResult<()> {
        self.symbol_mut(id)?.ty = Some(ty);
        Ok(())
    }

    /// Resolve an interned name back to its text
    pub fn name(&self, id: NameId) -> &str {
        self.interner.resolve(id).unwrap_or("<unknown>")
    }

    /// Symbols defined directly in `scope`, in no particular order
    pub fn symbols_in_scope(&self, scope: ScopeId) -> impl Iterator<Item = &Symbol> {
        self.scopes[scope.0 as usize]
            .symbols
            .values()
            .map(|&id| &self.symbols[id.0 as usize])
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Restores the scope cursor when dropped, so `with_scope` cannot leak a
/// re-entered scope on any exit path
struct CursorGuard<'a> {
    table: &'a mut SymbolTable,
    prev: ScopeId,
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        self.table.current = self.prev;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table_with_module(table: &mut SymbolTable) -> ScopeId {
        let module = table
            .create_scope(ScopeKind::Module, "main", Some(ScopeId::ROOT))
            .unwrap();
        table.enter_scope(module).unwrap();
        module
    }

    #[test]
    fn test_root_is_global() {
        let table = SymbolTable::new();
        let root = table.scope(ScopeId::ROOT).unwrap();
        assert_eq!(root.kind, ScopeKind::Global);
        assert!(root.parent.is_none());
        assert_eq!(root.level, 0);
    }

    #[test]
    fn test_scope_integrity() {
        let mut table = SymbolTable::new();
        let module = table_with_module(&mut table);
        let func = table
            .create_scope(ScopeKind::Function, "f", None)
            .unwrap();
        let block = table.create_scope(ScopeKind::Block, "", Some(func)).unwrap();

        for id in [module, func, block] {
            let scope = table.scope(id).unwrap();
            let parent = table.scope(scope.parent.unwrap()).unwrap();
            assert_eq!(parent.level + 1, scope.level);
            assert_eq!(
                parent.children.iter().filter(|&&c| c == id).count(),
                1,
                "scope appears in exactly one parent's children list"
            );
        }
    }

    #[test]
    fn test_exit_scope_at_root_is_noop() {
        let mut table = SymbolTable::new();
        assert_eq!(table.exit_scope(), None);
        assert_eq!(table.current_scope(), ScopeId::ROOT);
    }

    #[test]
    fn test_with_scope_restores_on_error() {
        let mut table = SymbolTable::new();
        let module = table_with_module(&mut table);
        let inner = table.create_scope(ScopeKind::Block, "", None).unwrap();

        let result: CompileResult<()> = table.with_scope(inner, |t| {
            assert_eq!(t.current_scope(), inner);
            Err(CompileError::internal("boom"))
        });
        assert!(result.is_err());
        assert_eq!(table.current_scope(), module);
    }

    #[test]
    fn test_define_last_write_wins() {
        let mut table = SymbolTable::new();
        table_with_module(&mut table);
        let first = table.define_symbol("x", SymbolKind::Variable, DefineOpts::default());
        let second = table.define_symbol("x", SymbolKind::Variable, DefineOpts::default());
        assert_eq!(second.replaced, Some(first.id));

        let found = table.lookup_symbol("x").unwrap();
        assert_eq!(found.id, second.id);
        // the displaced symbol still lives in the arena
        assert!(table.symbol(first.id).is_ok());
    }

    #[test]
    fn test_module_boundary_blocks_foreign_locals() {
        let mut table = SymbolTable::new();
        let module_a = table
            .create_scope(ScopeKind::Module, "a", Some(ScopeId::ROOT))
            .unwrap();
        table.enter_scope(module_a).unwrap();
        table.define_symbol("secret", SymbolKind::Variable, DefineOpts::default());

        let module_b = table
            .create_scope(ScopeKind::Module, "b", Some(ScopeId::ROOT))
            .unwrap();
        table.enter_scope(module_b).unwrap();
        assert!(table.lookup_symbol("secret").is_none());
        // the unconditional walk does not cross into siblings either
        assert!(table.lookup_symbol_in_parent_scopes("secret", module_b).is_none());
    }

    #[test]
    fn test_global_accepts_only_imports_and_builtins() {
        let mut table = SymbolTable::new();
        // a plain global definition, neither import nor builtin
        table.define_symbol("leak", SymbolKind::Variable, DefineOpts::default());
        table_with_module(&mut table);

        assert!(table.lookup_symbol("leak").is_none());
        // the seeded print builtin and the primitive aliases resolve
        assert!(table.lookup_symbol("print").is_some());
        assert!(table.lookup_symbol("int").is_some());
        assert!(table.lookup_symbol("unit").is_some());
    }

    #[test]
    fn test_type_child_scopes_of_module_searched() {
        let mut table = SymbolTable::new();
        let module = table_with_module(&mut table);
        let ty_scope = table
            .create_scope(ScopeKind::Type, "Point", Some(module))
            .unwrap();
        table.with_scope(ty_scope, |t| {
            t.define_symbol("Point", SymbolKind::Definition, DefineOpts::default());
            Ok(())
        })
        .unwrap();

        let func = table.create_scope(ScopeKind::Function, "f", None).unwrap();
        table.enter_scope(func).unwrap();
        assert!(table.lookup_symbol("Point").is_some());
    }

    #[test]
    fn test_resolve_namespace_first() {
        let mut table = SymbolTable::new();
        table_with_module(&mut table);
        let in_ns = table.define_symbol(
            "max",
            SymbolKind::Definition,
            DefineOpts {
                namespace: Some("math".to_string()),
                ..DefineOpts::default()
            },
        );
        table.define_symbol("max", SymbolKind::Variable, DefineOpts::default());

        let hit = table
            .resolve_symbol(
                "max",
                ResolveFlags {
                    namespace: Some("math"),
                    ..ResolveFlags::default()
                },
            )
            .unwrap();
        assert_eq!(hit, in_ns.id);
    }

    #[test]
    fn test_mutators_fail_on_unknown_id() {
        let mut table = SymbolTable::new();
        assert!(table.mark_symbol_used(SymbolId(9999)).is_err());
        assert!(table.set_symbol_type(SymbolId(9999), TypeNode::void(Span::default())).is_err());
    }

    #[test]
    fn test_reset_reseeds_builtins() {
        let mut table = SymbolTable::new();
        table_with_module(&mut table);
        table.define_symbol("x", SymbolKind::Variable, DefineOpts::default());
        table.reset();

        assert_eq!(table.current_scope(), ScopeId::ROOT);
        assert_eq!(table.scope_count(), 1);
        // print + five primitive aliases
        assert_eq!(table.symbol_count(), 6);
        assert_eq!(
            table.resolve_symbol("x", ResolveFlags { include_parents: true, ..ResolveFlags::default() }),
            None
        );
    }

    #[test]
    fn test_current_scope_only_flag() {
        let mut table = SymbolTable::new();
        table_with_module(&mut table);
        table.define_symbol("outer", SymbolKind::Variable, DefineOpts::default());
        let block = table.create_scope(ScopeKind::Block, "", None).unwrap();
        table.enter_scope(block).unwrap();

        let narrow = table.resolve_symbol(
            "outer",
            ResolveFlags {
                current_scope_only: true,
                ..ResolveFlags::default()
            },
        );
        assert_eq!(narrow, None);

        let wide = table.resolve_symbol(
            "outer",
            ResolveFlags {
                include_parents: true,
                ..ResolveFlags::default()
            },
        );
        assert!(wide.is_some());
    }
}
