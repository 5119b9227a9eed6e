//! The type validator
//!
//! Walks every module's statements and expressions, consulting the symbol
//! table for resolution, the comptime evaluator for constant folding and
//! overflow pre-checks, and reporting every failure through the
//! diagnostic collector. Most checks recover locally: they emit one
//! diagnostic and return an absent result so sibling statements keep
//! getting validated. Internal faults are caught at statement and module
//! boundaries and rewritten into diagnostics; nothing escapes
//! `validate_modules`.

mod exprs;
mod functions;
mod structs;
mod types;

use crate::ast::{Expr, Module, PrimitiveType, Stmt, StmtKind, TypeNode, UseDecl};
use crate::common::CompileResult;
use crate::sema::context::{AnalysisContext, AnalysisPhase};
use crate::sema::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::sema::eval::{ComptimeEvaluator, EvalContext};
use crate::sema::scope::{ScopeId, ScopeKind, SymbolTable};
use crate::sema::symbol::{
    DefineOpts, Mutability, SymbolId, SymbolKind, SymbolPayload, Visibility,
};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Upper bound on memoized inference results; overflow discards the
/// older half outright rather than tracking recency
const TYPE_CACHE_LIMIT: usize = 10_000;

/// Key for memoized expression inference
type InferKey = (String, usize, usize, &'static str);

/// Key for circular-type detection
type TypeKey = (String, &'static str, usize);

/// Method context while validating a struct's methods
#[derive(Debug, Clone)]
pub(crate) struct MethodContext {
    pub struct_name: String,
    pub is_static: bool,
}

/// The driving walk; stateful per analysis pass
pub struct TypeValidator {
    pub table: SymbolTable,
    pub diagnostics: DiagnosticCollector,
    pub(crate) ctx: AnalysisContext,
    pub(crate) module_stack: Vec<String>,
    pub(crate) inference_in_progress: HashSet<InferKey>,
    pub(crate) circular_guard: HashSet<TypeKey>,
    pub(crate) current_return_type: Option<TypeNode>,
    pub(crate) current_error_type: Option<TypeNode>,
    pub(crate) method_context: Option<MethodContext>,
    pub(crate) in_function: bool,
    pub(crate) loop_depth: u32,
    pub(crate) type_cache: HashMap<InferKey, TypeNode>,
    pub(crate) cache_order: Vec<InferKey>,
}

impl TypeValidator {
    pub fn new() -> Self {
        Self {
            table: SymbolTable::new(),
            diagnostics: DiagnosticCollector::new(),
            ctx: AnalysisContext::new(),
            module_stack: Vec::new(),
            inference_in_progress: HashSet::new(),
            circular_guard: HashSet::new(),
            current_return_type: None,
            current_error_type: None,
            method_context: None,
            in_function: false,
            loop_depth: 0,
            type_cache: HashMap::new(),
            cache_order: Vec::new(),
        }
    }

    /// Clear all per-pass state and re-seed the symbol table
    pub fn reset(&mut self) {
        debug!("resetting validator state for a new pass");
        self.table.reset();
        self.diagnostics.reset();
        self.ctx.reset();
        self.module_stack.clear();
        self.inference_in_progress.clear();
        self.circular_guard.clear();
        self.current_return_type = None;
        self.current_error_type = None;
        self.method_context = None;
        self.in_function = false;
        self.loop_depth = 0;
        self.type_cache.clear();
        self.cache_order.clear();
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic, &self.ctx);
    }

    /// Fold an expression with the comptime evaluator, reporting through
    /// the shared collector
    pub(crate) fn evaluate_comptime(
        &mut self,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<crate::sema::eval::ComptimeValue> {
        let mut evaluator = ComptimeEvaluator::new(&self.table, &mut self.diagnostics, &self.ctx);
        evaluator.evaluate(expr, ectx)
    }

    // ----- pass entry point -----

    /// Validate a forest of modules. Returns `true` iff the deduplicated
    /// diagnostic list holds no Error-severity entry. No fault escapes.
    pub fn validate_modules(&mut self, modules: &[Module]) -> bool {
        self.ctx.set_phase(AnalysisPhase::Validating);
        for module in modules {
            let snapshot = self.ctx.snapshot();
            if let Err(fault) = self.validate_module(module) {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::AnalysisError,
                        format!("analysis of module '{}' failed: {fault}", module.name),
                    )
                    .with_target_span(module.span),
                );
            }
            self.ctx.restore(snapshot);
        }
        self.ctx.set_phase(AnalysisPhase::Finishing);
        debug!(
            "pass finished: {} raw diagnostics, {} after dedup",
            self.diagnostics.raw_count(),
            self.diagnostics.diagnostics().len()
        );
        !self.diagnostics.has_errors()
    }

    fn validate_module(&mut self, module: &Module) -> CompileResult<()> {
        debug!("validating module '{}'", module.name);
        self.ctx.set_module(&module.name, &module.path);
        self.module_stack.push(module.name.clone());

        let scope = self
            .table
            .create_scope(ScopeKind::Module, &module.name, Some(ScopeId::ROOT))?;
        self.table.enter_scope(scope)?;
        self.ctx.set_scope(scope);

        // first pass: collect top-level definitions so later statements
        // can reference earlier-unseen names
        self.ctx.set_phase(AnalysisPhase::Collecting);
        for stmt in &module.statements {
            self.collect_stmt(stmt);
        }

        self.ctx.set_phase(AnalysisPhase::Validating);
        for stmt in &module.statements {
            self.validate_stmt(stmt);
        }

        self.module_stack.pop();
        self.table.enter_scope(ScopeId::ROOT)?;
        self.ctx.set_scope(ScopeId::ROOT);
        Ok(())
    }

    // ----- collection pre-pass -----

    fn collect_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Def {
                name,
                ty,
                init,
                is_public,
            } => self.collect_def(name, ty.as_ref(), init.as_ref(), *is_public, stmt),
            StmtKind::Func(func) => {
                self.declare_function(func, None);
            }
            _ => {}
        }
    }

    fn collect_def(
        &mut self,
        name: &str,
        ty: Option<&TypeNode>,
        init: Option<&Expr>,
        is_public: bool,
        stmt: &Stmt,
    ) {
        let payload = match init {
            Some(expr) => SymbolPayload::Const {
                initializer: Box::new(expr.clone()),
            },
            None => SymbolPayload::None,
        };
        let outcome = self.table.define_symbol(
            name,
            SymbolKind::Definition,
            DefineOpts {
                ty: ty.cloned(),
                context_span: stmt.span,
                target_span: Some(stmt.span),
                visibility: if is_public {
                    Visibility::Public
                } else {
                    Visibility::Private
                },
                initialized: init.is_some() || ty.is_some(),
                payload,
                ..DefineOpts::default()
            },
        );
        self.report_duplicate(outcome.replaced, name, stmt.span);
    }

    /// Duplicate policy layered on the table's last-write-wins hook
    pub(crate) fn report_duplicate(
        &mut self,
        replaced: Option<SymbolId>,
        name: &str,
        span: crate::common::Span,
    ) {
        if replaced.is_none() {
            return;
        }
        self.report(
            Diagnostic::new(
                DiagnosticCode::DuplicateSymbol,
                format!("'{name}' is defined more than once in this scope"),
            )
            .with_subject(name)
            .with_target_span(span),
        );
    }

    // ----- statement dispatch -----

    /// Validate one statement; internal faults become INTERNAL_ERROR
    /// diagnostics here instead of aborting the module
    pub(crate) fn validate_stmt(&mut self, stmt: &Stmt) {
        self.ctx.push_span(stmt.span);
        let result = self.validate_stmt_inner(stmt);
        self.ctx.pop_span();

        if let Err(fault) = result {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::InternalError,
                    format!(
                        "internal error while validating {} statement: {fault}",
                        stmt.kind_name()
                    ),
                )
                .with_target_span(stmt.span),
            );
        }
    }

    fn validate_stmt_inner(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Block(body) => self.validate_block(body, ScopeKind::Block, ""),
            StmtKind::Test { name, body } => {
                let scope_name = format!("test {name}");
                self.validate_block(body, ScopeKind::Block, &scope_name)
            }
            StmtKind::Use(decl) => {
                self.validate_use(decl);
                Ok(())
            }
            StmtKind::Def {
                name,
                ty,
                init,
                is_public,
            } => self.validate_def(name, ty.as_ref(), init.as_ref(), *is_public, stmt),
            StmtKind::Let {
                name,
                ty,
                init,
                mutable,
            } => {
                self.validate_let(name, ty.as_ref(), init.as_ref(), *mutable, stmt);
                Ok(())
            }
            StmtKind::Func(func) => self.validate_function(func),
            StmtKind::While { condition, body } => self.validate_loop(Some(condition), body),
            StmtKind::DoWhile { body, condition } => self.validate_loop(Some(condition), body),
            StmtKind::For {
                binding,
                iterable,
                body,
            } => self.validate_for(binding, iterable, body),
            StmtKind::Return(value) => {
                self.validate_return(value.as_ref(), stmt);
                Ok(())
            }
            StmtKind::Defer(inner) => {
                self.validate_stmt(inner);
                Ok(())
            }
            StmtKind::Throw(value) => {
                self.validate_throw(value, stmt);
                Ok(())
            }
            StmtKind::Expr(expr) => {
                self.infer_expr_type(expr);
                Ok(())
            }
        }
    }

    fn validate_block(
        &mut self,
        body: &[Stmt],
        kind: ScopeKind,
        name: &str,
    ) -> CompileResult<()> {
        let scope = self.table.create_scope(kind, name, None)?;
        let prev_scope = self.ctx.scope();
        self.table.enter_scope(scope)?;
        self.ctx.set_scope(scope);
        for stmt in body {
            self.validate_stmt(stmt);
        }
        self.report_unused(scope);
        self.table.enter_scope(prev_scope)?;
        self.ctx.set_scope(prev_scope);
        Ok(())
    }

    /// Warn about locals and parameters that were never read
    pub(crate) fn report_unused(&mut self, scope: ScopeId) {
        let unused: Vec<(String, DiagnosticCode, crate::common::Span)> = self
            .table
            .symbols_in_scope(scope)
            .filter(|sym| !sym.used && !sym.is_builtin())
            .filter_map(|sym| {
                let code = match sym.kind {
                    SymbolKind::Variable => DiagnosticCode::UnusedVariable,
                    SymbolKind::Parameter => DiagnosticCode::UnusedParameter,
                    _ => return None,
                };
                let name = self.table.name(sym.name).to_string();
                if name.starts_with('_') {
                    return None;
                }
                Some((name, code, sym.context_span))
            })
            .collect();
        for (name, code, span) in unused {
            self.report(
                Diagnostic::new(code, format!("'{name}' is never used"))
                    .with_subject(&name)
                    .with_target_span(span),
            );
        }
    }

    // ----- imports -----

    /// `use` statements only register linkage; module loading and
    /// dependency resolution are external collaborators
    fn validate_use(&mut self, decl: &UseDecl) {
        let module_name = decl
            .module_path
            .rsplit('/')
            .next()
            .unwrap_or(&decl.module_path)
            .to_string();
        let bound_name = decl.alias.clone().unwrap_or_else(|| module_name.clone());

        let current = self.table.current_scope();
        let result = self.table.with_scope(ScopeId::ROOT, |table| {
            table.define_symbol(
                &bound_name,
                SymbolKind::Use,
                DefineOpts {
                    context_span: decl.span,
                    target_span: Some(decl.span),
                    initialized: true,
                    payload: SymbolPayload::Import {
                        source_module: module_name,
                        source_path: decl.module_path.clone(),
                        alias: decl.alias.clone(),
                        original: None,
                    },
                    ..DefineOpts::default()
                },
            );
            Ok(())
        });
        debug_assert!(result.is_ok());
        debug_assert_eq!(self.table.current_scope(), current);
    }

    // ----- definitions -----

    fn validate_def(
        &mut self,
        name: &str,
        ty: Option<&TypeNode>,
        init: Option<&Expr>,
        is_public: bool,
        stmt: &Stmt,
    ) -> CompileResult<()> {
        // definitions nested below module level were not pre-collected
        let collected = self
            .table
            .resolve_symbol(
                name,
                crate::sema::scope::ResolveFlags {
                    current_scope_only: true,
                    ..crate::sema::scope::ResolveFlags::default()
                },
            )
            .is_some();
        if !collected {
            self.collect_def(name, ty, init, is_public, stmt);
        }

        if let Some(ty) = ty {
            self.check_circular_type(name, ty);
            match &ty.kind {
                crate::ast::TypeKind::Struct(decl) => {
                    self.validate_struct_def(name, decl, stmt)?;
                    return Ok(());
                }
                crate::ast::TypeKind::Enum(decl) => {
                    self.validate_enum_def(name, decl, stmt)?;
                    return Ok(());
                }
                crate::ast::TypeKind::ErrorSet(decl) => {
                    self.validate_error_set_def(name, decl, stmt)?;
                    return Ok(());
                }
                crate::ast::TypeKind::Array { size, .. } => {
                    if let Some(size) = size {
                        self.validate_array_size(size);
                    }
                }
                _ => {}
            }
        }

        // constant definition: fold and type-check the initializer
        if let Some(init) = init {
            let inferred = self.infer_expr_type(init);
            if let (Some(declared), Some(inferred)) = (ty, inferred.as_ref()) {
                if !self.is_type_compatible(declared, inferred) {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::AssignmentTypeMismatch,
                            format!("cannot initialize '{name}': expected {declared}, found {inferred}"),
                        )
                        .with_subject(name)
                        .with_target_span(init.span),
                    );
                    return Ok(());
                }
            }
            if let Some(declared) = ty {
                if declared.is_integer() {
                    self.evaluate_comptime(init, &EvalContext::with_target(declared));
                }
            }
        }
        Ok(())
    }

    fn validate_let(
        &mut self,
        name: &str,
        ty: Option<&TypeNode>,
        init: Option<&Expr>,
        mutable: bool,
        stmt: &Stmt,
    ) {
        let init_ty = init.and_then(|e| self.infer_expr_type(e));

        let var_ty = match (ty, init_ty) {
            (Some(declared), Some(inferred)) => {
                if !self.is_type_compatible(declared, &inferred) {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::AssignmentTypeMismatch,
                            format!(
                                "cannot initialize '{name}': expected {declared}, found {inferred}"
                            ),
                        )
                        .with_subject(name)
                        .with_target_span(init.map_or(stmt.span, |e| e.span)),
                    );
                }
                if declared.is_integer() {
                    if let Some(init) = init {
                        self.evaluate_comptime(init, &EvalContext::with_target(declared));
                    }
                }
                Some(declared.clone())
            }
            (Some(declared), None) => Some(declared.clone()),
            (None, Some(inferred)) => Some(self.concretize(inferred)),
            (None, None) => {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::CannotInferType,
                        format!("cannot infer type of '{name}' without a type or initializer"),
                    )
                    .with_subject(name)
                    .with_target_span(stmt.span),
                );
                None
            }
        };

        self.warn_shadowed(name, stmt);

        let payload = match (mutable, init) {
            (false, Some(init)) => SymbolPayload::Const {
                initializer: Box::new(init.clone()),
            },
            _ => SymbolPayload::None,
        };
        let outcome = self.table.define_symbol(
            name,
            SymbolKind::Variable,
            DefineOpts {
                ty: var_ty,
                context_span: stmt.span,
                target_span: Some(stmt.span),
                mutability: if mutable {
                    Mutability::Mutable
                } else {
                    Mutability::Immutable
                },
                initialized: init.is_some(),
                payload,
                ..DefineOpts::default()
            },
        );
        self.report_duplicate(outcome.replaced, name, stmt.span);
    }

    /// Warn when a new binding hides one from an enclosing scope
    fn warn_shadowed(&mut self, name: &str, stmt: &Stmt) {
        let current = self.table.current_scope();
        let Some(parent) = self.table.scope(current).ok().and_then(|s| s.parent) else {
            return;
        };
        let Some(outer) = self.table.lookup_symbol_in_parent_scopes(name, parent) else {
            return;
        };
        if outer.is_builtin() {
            return;
        }
        let code = match outer.kind {
            SymbolKind::Parameter => DiagnosticCode::ShadowedParameter,
            SymbolKind::Function => DiagnosticCode::ShadowedFunction,
            SymbolKind::Variable => DiagnosticCode::ShadowedVariable,
            _ => return,
        };
        self.report(
            Diagnostic::new(code, format!("'{name}' shadows an outer declaration"))
                .with_subject(name)
                .with_target_span(stmt.span),
        );
    }

    // ----- loops -----

    fn validate_loop(&mut self, condition: Option<&Expr>, body: &[Stmt]) -> CompileResult<()> {
        if let Some(condition) = condition {
            if let Some(cond_ty) = self.infer_expr_type(condition) {
                if !cond_ty.is_bool() {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::ConditionNotBool,
                            format!("loop condition must be bool, found {cond_ty}"),
                        )
                        .with_target_span(condition.span),
                    );
                }
            }
        }
        self.loop_depth += 1;
        let result = self.validate_block(body, ScopeKind::Loop, "");
        self.loop_depth -= 1;
        result
    }

    fn validate_for(&mut self, binding: &str, iterable: &Expr, body: &[Stmt]) -> CompileResult<()> {
        let iter_ty = self.infer_expr_type(iterable);
        let element_ty = iter_ty
            .as_ref()
            .and_then(|ty| self.element_type(ty))
            .unwrap_or_else(|| TypeNode::primitive(PrimitiveType::Any, iterable.span));

        if let Some(iter_ty) = &iter_ty {
            if self.element_type(iter_ty).is_none() && !iter_ty.is_any() {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::CannotIndexType,
                        format!("cannot iterate over a value of type {iter_ty}"),
                    )
                    .with_target_span(iterable.span),
                );
            }
        }

        let scope = self.table.create_scope(ScopeKind::Loop, "", None)?;
        let prev_scope = self.ctx.scope();
        self.table.enter_scope(scope)?;
        self.ctx.set_scope(scope);
        self.table.define_symbol(
            binding,
            SymbolKind::Variable,
            DefineOpts {
                ty: Some(element_ty),
                context_span: iterable.span,
                target_span: Some(iterable.span),
                initialized: true,
                ..DefineOpts::default()
            },
        );

        self.loop_depth += 1;
        for stmt in body {
            self.validate_stmt(stmt);
        }
        self.loop_depth -= 1;

        self.report_unused(scope);
        self.table.enter_scope(prev_scope)?;
        self.ctx.set_scope(prev_scope);
        Ok(())
    }

    // ----- control flow -----

    fn validate_return(&mut self, value: Option<&Expr>, stmt: &Stmt) {
        if !self.in_function {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::ReturnOutsideFunction,
                    "return statement outside a function",
                )
                .with_target_span(stmt.span),
            );
            return;
        }

        let expected = self.current_return_type.clone();
        match (value, expected) {
            (Some(value), Some(expected)) => {
                if let Some(actual) = self.infer_expr_type(value) {
                    if !self.is_type_compatible(&expected, &actual) {
                        self.report(
                            Diagnostic::new(
                                DiagnosticCode::ReturnTypeMismatch,
                                format!("return type mismatch: expected {expected}, found {actual}"),
                            )
                            .with_target_span(value.span),
                        );
                    }
                }
            }
            (Some(value), None) => {
                if let Some(actual) = self.infer_expr_type(value) {
                    if !actual.is_void() {
                        self.report(
                            Diagnostic::new(
                                DiagnosticCode::ReturnTypeMismatch,
                                format!("function has no return type but returns {actual}"),
                            )
                            .with_target_span(value.span),
                        );
                    }
                }
            }
            (None, Some(expected)) => {
                if !expected.is_void() {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::ReturnTypeMismatch,
                            format!("empty return in a function returning {expected}"),
                        )
                        .with_target_span(stmt.span),
                    );
                }
            }
            (None, None) => {}
        }
    }
}

impl Default for TypeValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
