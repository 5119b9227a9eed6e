//! Function declaration, body validation and call checking

use crate::ast::{Expr, ExprKind, FuncDecl, PrimitiveType, Stmt, StmtKind, TypeKind, TypeNode};
use crate::common::CompileResult;
use crate::sema::diagnostics::{Diagnostic, DiagnosticCode};
use crate::sema::scope::{ResolveFlags, ScopeKind};
use crate::sema::symbol::{DefineOpts, SymbolId, SymbolKind, SymbolPayload, Visibility};

use super::TypeValidator;

impl TypeValidator {
    /// Register a function symbol in the current scope. Unannotated
    /// parameters are typed `any`.
    pub(crate) fn declare_function(
        &mut self,
        func: &FuncDecl,
        namespace: Option<&str>,
    ) -> SymbolId {
        let param_types: Vec<TypeNode> = func
            .params
            .iter()
            .map(|p| {
                p.ty.clone()
                    .unwrap_or_else(|| TypeNode::primitive(PrimitiveType::Any, p.span))
            })
            .collect();
        let return_type = func
            .return_type
            .clone()
            .unwrap_or_else(|| TypeNode::void(func.span));

        let outcome = self.table.define_symbol(
            &func.name,
            SymbolKind::Function,
            DefineOpts {
                ty: Some(TypeNode::new(
                    TypeKind::Function {
                        params: param_types.clone(),
                        ret: Box::new(return_type),
                    },
                    func.span,
                )),
                context_span: func.span,
                target_span: Some(func.span),
                visibility: if func.is_public {
                    Visibility::Public
                } else {
                    Visibility::Private
                },
                payload: SymbolPayload::Function {
                    params: param_types,
                    return_type: func.return_type.clone(),
                    is_static: func.is_static,
                    is_builtin: false,
                },
                namespace: namespace.map(str::to_string),
                initialized: true,
                ..DefineOpts::default()
            },
        );
        self.report_duplicate(outcome.replaced, &func.name, func.span);
        outcome.id
    }

    pub(crate) fn validate_function(&mut self, func: &FuncDecl) -> CompileResult<()> {
        // nested functions were not seen by the collection pre-pass
        let already_declared = self
            .table
            .resolve_symbol(
                &func.name,
                ResolveFlags {
                    current_scope_only: true,
                    ..ResolveFlags::default()
                },
            )
            .is_some();
        if !already_declared {
            self.declare_function(func, None);
        }

        for param in &func.params {
            if let Some(ty) = &param.ty {
                self.check_type_refs(ty);
            }
        }
        if let Some(ret) = &func.return_type {
            self.check_type_refs(ret);
        }
        if let Some(err) = &func.error_type {
            self.check_type_refs(err);
        }

        let scope = self
            .table
            .create_scope(ScopeKind::Function, &func.name, None)?;
        let prev_scope = self.ctx.scope();
        self.table.enter_scope(scope)?;
        self.ctx.set_scope(scope);

        // instance methods see `self` as an implicit first binding
        if let Some(method) = self.method_context.clone() {
            if !method.is_static {
                self.table.define_symbol(
                    "self",
                    SymbolKind::Parameter,
                    DefineOpts {
                        ty: Some(TypeNode::named(&method.struct_name, func.span)),
                        context_span: func.span,
                        initialized: true,
                        ..DefineOpts::default()
                    },
                );
            }
        }
        for param in &func.params {
            let ty = param
                .ty
                .clone()
                .unwrap_or_else(|| TypeNode::primitive(PrimitiveType::Any, param.span));
            let outcome = self.table.define_symbol(
                &param.name,
                SymbolKind::Parameter,
                DefineOpts {
                    ty: Some(ty),
                    context_span: param.span,
                    target_span: Some(param.span),
                    initialized: true,
                    ..DefineOpts::default()
                },
            );
            self.report_duplicate(outcome.replaced, &param.name, param.span);
        }

        let prev_return = self.current_return_type.replace(
            func.return_type
                .clone()
                .unwrap_or_else(|| TypeNode::void(func.span)),
        );
        let prev_error = std::mem::replace(&mut self.current_error_type, func.error_type.clone());
        let prev_in_function = std::mem::replace(&mut self.in_function, true);
        let prev_loop_depth = std::mem::take(&mut self.loop_depth);

        for stmt in &func.body {
            self.validate_stmt(stmt);
        }
        self.check_missing_return(func);
        self.report_unused(scope);

        self.current_return_type = prev_return;
        self.current_error_type = prev_error;
        self.in_function = prev_in_function;
        self.loop_depth = prev_loop_depth;
        self.table.enter_scope(prev_scope)?;
        self.ctx.set_scope(prev_scope);
        Ok(())
    }

    /// A function with a non-void return type must end on a path that
    /// returns; a declared error type lets a throwing path count instead
    fn check_missing_return(&mut self, func: &FuncDecl) {
        let Some(return_type) = &func.return_type else {
            return;
        };
        if return_type.is_void() || return_type.is_any() {
            return;
        }
        if body_can_exit(&func.body) {
            return;
        }
        self.report(
            Diagnostic::new(
                DiagnosticCode::MissingReturn,
                format!(
                    "function '{}' may finish without returning {return_type}",
                    func.name
                ),
            )
            .with_subject(&func.name)
            .with_target_span(func.span),
        );
    }

    // ----- calls -----

    pub(crate) fn validate_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        expr: &Expr,
    ) -> Option<TypeNode> {
        let callee_ty = if let Some(name) = callee.as_identifier() {
            let Some(symbol) = self.table.lookup_symbol(name) else {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::UndefinedFunction,
                        format!("undefined function '{name}'"),
                    )
                    .with_subject(name)
                    .with_target_span(callee.span),
                );
                return None;
            };
            let id = symbol.id;
            let kind = symbol.kind;
            let ty = symbol.ty.clone();
            let is_static_member = symbol.is_static_member();
            let owning_scope = symbol.owning_scope;
            let _ = self.table.mark_symbol_used(id);
            if self.bare_instance_access_in_static(
                name,
                kind,
                is_static_member,
                owning_scope,
                callee.span,
            ) {
                return None;
            }
            ty
        } else {
            self.infer_expr_type(callee)
        };
        let callee_ty = self.resolve_alias(callee_ty?);

        let TypeKind::Function { params, ret } = &callee_ty.kind else {
            if callee_ty.is_any() {
                for arg in args {
                    self.infer_expr_type(arg);
                }
                return Some(TypeNode::primitive(PrimitiveType::Any, expr.span));
            }
            self.report(
                Diagnostic::new(
                    DiagnosticCode::NotCallable,
                    format!("cannot call a value of type {callee_ty}"),
                )
                .with_target_span(callee.span),
            );
            return None;
        };
        let params = params.clone();
        let ret = (**ret).clone();

        if args.len() != params.len() {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::ArgumentCountMismatch,
                    format!(
                        "call expects {} argument{}, found {}",
                        params.len(),
                        if params.len() == 1 { "" } else { "s" },
                        args.len()
                    ),
                )
                .with_target_span(expr.span),
            );
        }

        for (index, (arg, param)) in args.iter().zip(&params).enumerate() {
            let Some(arg_ty) = self.infer_expr_type(arg) else {
                continue;
            };
            if !self.is_type_compatible(param, &arg_ty) {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::ParameterTypeMismatch,
                        format!(
                            "argument {} has type {arg_ty}, expected {param}",
                            index + 1
                        ),
                    )
                    .with_target_span(arg.span),
                );
            }
            if param.is_integer() && arg_ty.is_comptime() {
                self.evaluate_comptime(arg, &crate::sema::eval::EvalContext::with_target(param));
            }
        }
        // excess arguments still get their subtrees checked
        for arg in args.iter().skip(params.len()) {
            self.infer_expr_type(arg);
        }

        Some(TypeNode::new(ret.kind, expr.span))
    }

    // ----- throw -----

    pub(crate) fn validate_throw(&mut self, value: &Expr, stmt: &Stmt) {
        if !self.in_function {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::ThrowOutsideFunction,
                    "throw statement outside a function",
                )
                .with_target_span(stmt.span),
            );
            return;
        }
        let Some(error_type) = self.current_error_type.clone() else {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::ThrowWithoutErrorType,
                    "cannot throw from a function with no declared error type",
                )
                .with_target_span(stmt.span),
            );
            return;
        };

        let value_ty = self.infer_expr_type(value);

        if error_type.is_anyerror() {
            // anyerror accepts any error-set member
            if let Some(value_ty) = value_ty {
                let resolved = self.resolve_alias(value_ty);
                if !resolved.is_error_set() && !resolved.is_anyerror() {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::InvalidErrorType,
                            format!("cannot throw a value of type {resolved}"),
                        )
                        .with_target_span(value.span),
                    );
                }
            }
            return;
        }

        let resolved_error = self.resolve_alias(error_type.clone());
        let Some(declared_set) = resolved_error.as_error_set().cloned() else {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::InvalidErrorType,
                    format!("declared error type {error_type} is not an error set"),
                )
                .with_target_span(stmt.span),
            );
            return;
        };

        // a concrete error set requires a literal member of that set
        let member = match &value.kind {
            ExprKind::Member { member, .. } => Some(member.as_str()),
            ExprKind::Identifier(name) => Some(name.as_str()),
            _ => None,
        };
        match member {
            Some(member) if declared_set.has_member(member) => {}
            Some(member) => {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::ThrowTypeMismatch,
                        format!(
                            "error set '{}' has no member '{member}'",
                            declared_set.name
                        ),
                    )
                    .with_subject(member)
                    .with_target_span(value.span),
                );
            }
            None => {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::ThrowTypeMismatch,
                        format!(
                            "thrown value must name a member of error set '{}'",
                            declared_set.name
                        ),
                    )
                    .with_target_span(value.span),
                );
            }
        }
    }
}

/// Whether the body contains a return or throw reachable outside of
/// conditional constructs; not a full control-flow analysis
fn body_can_exit(body: &[Stmt]) -> bool {
    body.iter().any(stmt_can_exit)
}

fn stmt_can_exit(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) | StmtKind::Throw(_) => true,
        StmtKind::Block(body)
        | StmtKind::While { body, .. }
        | StmtKind::DoWhile { body, .. }
        | StmtKind::For { body, .. } => body_can_exit(body),
        _ => false,
    }
}
