//! Struct, enum and error-set definitions, literals and member access
//!
//! Each nominal type gets a `Type`-kind scope holding its fields,
//! methods, variants or members, so unqualified names inside the module
//! can reach them through the scope chain and qualified access walks the
//! same symbols.

use crate::ast::{
    EnumDecl, ErrorSetDecl, Expr, FuncDecl, PrimitiveType, Stmt, StructDecl, StructLiteral,
    TypeKind, TypeNode,
};
use crate::common::CompileResult;
use crate::sema::diagnostics::{Diagnostic, DiagnosticCode};
use crate::sema::eval::EvalContext;
use crate::sema::scope::ScopeKind;
use crate::sema::symbol::{DefineOpts, SymbolKind, SymbolPayload};

use super::{MethodContext, TypeValidator};

impl TypeValidator {
    // ----- definitions -----

    pub(crate) fn validate_struct_def(
        &mut self,
        name: &str,
        decl: &StructDecl,
        stmt: &Stmt,
    ) -> CompileResult<()> {
        if !decl.name.is_empty() && decl.name != name {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::StructNameMismatch,
                    format!(
                        "struct is declared as '{}' but bound to '{name}'",
                        decl.name
                    ),
                )
                .with_subject(name)
                .with_target_span(stmt.span),
            );
        }

        let scope = self.table.create_scope(ScopeKind::Type, name, None)?;
        let prev_scope = self.ctx.scope();
        self.table.enter_scope(scope)?;
        self.ctx.set_scope(scope);

        let mut seen: Vec<&str> = Vec::new();
        for field in &decl.fields {
            if seen.contains(&field.name.as_str()) {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::DuplicateField,
                        format!("struct '{name}' declares field '{}' twice", field.name),
                    )
                    .with_subject(&field.name)
                    .with_target_span(field.span),
                );
                continue;
            }
            seen.push(&field.name);

            self.check_type_refs(&field.ty);
            if let Some(default) = &field.default {
                if let Some(default_ty) = self.infer_expr_type(default) {
                    if !self.is_type_compatible(&field.ty, &default_ty) {
                        self.report(
                            Diagnostic::new(
                                DiagnosticCode::DefaultValueTypeMismatch,
                                format!(
                                    "default value for field '{}' has type {default_ty}, expected {}",
                                    field.name, field.ty
                                ),
                            )
                            .with_subject(&field.name)
                            .with_target_span(default.span),
                        );
                    } else if field.ty.is_integer() {
                        self.evaluate_comptime(default, &EvalContext::with_target(&field.ty));
                    }
                }
            }

            self.table.define_symbol(
                &field.name,
                SymbolKind::StructField,
                DefineOpts {
                    ty: Some(field.ty.clone()),
                    context_span: field.span,
                    target_span: Some(field.span),
                    payload: SymbolPayload::Field {
                        is_static: field.is_static,
                        has_default: field.default.is_some(),
                    },
                    namespace: Some(name.to_string()),
                    initialized: true,
                    ..DefineOpts::default()
                },
            );
        }

        for method in &decl.methods {
            self.declare_function(method, Some(name));
        }
        for method in &decl.methods {
            let prev_method = self.method_context.replace(MethodContext {
                struct_name: name.to_string(),
                is_static: method.is_static,
            });
            let result = self.validate_function(method);
            self.method_context = prev_method;
            result?;
        }

        self.table.enter_scope(prev_scope)?;
        self.ctx.set_scope(prev_scope);
        Ok(())
    }

    pub(crate) fn validate_enum_def(
        &mut self,
        name: &str,
        decl: &EnumDecl,
        stmt: &Stmt,
    ) -> CompileResult<()> {
        if !decl.name.is_empty() && decl.name != name {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::StructNameMismatch,
                    format!("enum is declared as '{}' but bound to '{name}'", decl.name),
                )
                .with_subject(name)
                .with_target_span(stmt.span),
            );
        }

        let scope = self.table.create_scope(ScopeKind::Type, name, None)?;
        self.table.with_scope(scope, |table| {
            for (index, (variant, span)) in decl.variants.iter().enumerate() {
                table.define_symbol(
                    variant,
                    SymbolKind::EnumVariant,
                    DefineOpts {
                        ty: Some(TypeNode::named(name, *span)),
                        context_span: *span,
                        target_span: Some(*span),
                        payload: SymbolPayload::EnumVariant {
                            owner: name.to_string(),
                            index,
                        },
                        namespace: Some(name.to_string()),
                        initialized: true,
                        ..DefineOpts::default()
                    },
                );
            }
            Ok(())
        })?;

        let mut seen: Vec<&str> = Vec::new();
        for (variant, span) in &decl.variants {
            if seen.contains(&variant.as_str()) {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::DuplicateSymbol,
                        format!("enum '{name}' declares variant '{variant}' twice"),
                    )
                    .with_subject(variant)
                    .with_target_span(*span),
                );
            }
            seen.push(variant);
        }
        Ok(())
    }

    pub(crate) fn validate_error_set_def(
        &mut self,
        name: &str,
        decl: &ErrorSetDecl,
        stmt: &Stmt,
    ) -> CompileResult<()> {
        if !decl.name.is_empty() && decl.name != name {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::StructNameMismatch,
                    format!(
                        "error set is declared as '{}' but bound to '{name}'",
                        decl.name
                    ),
                )
                .with_subject(name)
                .with_target_span(stmt.span),
            );
        }

        let scope = self.table.create_scope(ScopeKind::Type, name, None)?;
        self.table.with_scope(scope, |table| {
            for (member, span) in &decl.members {
                table.define_symbol(
                    member,
                    SymbolKind::Error,
                    DefineOpts {
                        ty: Some(TypeNode::named(name, *span)),
                        context_span: *span,
                        target_span: Some(*span),
                        payload: SymbolPayload::ErrorMember {
                            owner: name.to_string(),
                        },
                        namespace: Some(name.to_string()),
                        initialized: true,
                        ..DefineOpts::default()
                    },
                );
            }
            Ok(())
        })?;

        let mut seen: Vec<&str> = Vec::new();
        for (member, span) in &decl.members {
            if seen.contains(&member.as_str()) {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::DuplicateSymbol,
                        format!("error set '{name}' declares member '{member}' twice"),
                    )
                    .with_subject(member)
                    .with_target_span(*span),
                );
            }
            seen.push(member);
        }
        Ok(())
    }

    // ----- struct literals -----

    pub(crate) fn validate_struct_literal(
        &mut self,
        lit: &StructLiteral,
        expr: &Expr,
    ) -> Option<TypeNode> {
        let Some(name) = &lit.name else {
            return self.infer_anonymous_literal(lit, expr);
        };
        let name = name.clone();

        let Some(symbol) = self.table.lookup_symbol(&name) else {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::UndefinedType,
                    format!("undefined type '{name}'"),
                )
                .with_subject(&name)
                .with_target_span(expr.span),
            );
            return None;
        };
        let id = symbol.id;
        let symbol_ty = symbol.ty.clone();
        let _ = self.table.mark_symbol_used(id);

        let resolved = self.resolve_alias(symbol_ty?);
        let Some(decl) = resolved.as_struct().cloned() else {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::NotAType,
                    format!("'{name}' is not a struct type"),
                )
                .with_subject(&name)
                .with_target_span(expr.span),
            );
            return None;
        };

        let mut seen: Vec<&str> = Vec::new();
        for init in &lit.fields {
            if seen.contains(&init.name.as_str()) {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::DuplicateField,
                        format!("field '{}' is set twice", init.name),
                    )
                    .with_subject(&init.name)
                    .with_target_span(init.span),
                );
                continue;
            }
            seen.push(&init.name);

            let Some(field) = decl.field(&init.name) else {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::UnknownField,
                        format!("struct '{name}' has no field '{}'", init.name),
                    )
                    .with_subject(&init.name)
                    .with_target_span(init.span),
                );
                continue;
            };
            if field.is_static {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::StaticFieldInConstructor,
                        format!("static field '{}' cannot be set in a constructor", init.name),
                    )
                    .with_subject(&init.name)
                    .with_target_span(init.span),
                );
                continue;
            }

            let field_ty = field.ty.clone();
            if let Some(value_ty) = self.infer_expr_type(&init.value) {
                if !self.is_type_compatible(&field_ty, &value_ty) {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::FieldTypeMismatch,
                            format!(
                                "field '{}' has type {field_ty}, cannot assign {value_ty}",
                                init.name
                            ),
                        )
                        .with_subject(&init.name)
                        .with_target_span(init.value.span),
                    );
                } else if field_ty.is_integer() && value_ty.is_comptime() {
                    self.evaluate_comptime(&init.value, &EvalContext::with_target(&field_ty));
                }
            }
        }

        for field in &decl.fields {
            if field.is_static || field.default.is_some() {
                continue;
            }
            if !seen.contains(&field.name.as_str()) {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::MissingField,
                        format!(
                            "missing field '{}' in construction of '{name}'",
                            field.name
                        ),
                    )
                    .with_subject(&field.name)
                    .with_target_span(expr.span),
                );
            }
        }

        Some(TypeNode::named(name, expr.span))
    }

    /// Anonymous `.{ ... }` literals get a structural type from their
    /// field values
    fn infer_anonymous_literal(&mut self, lit: &StructLiteral, expr: &Expr) -> Option<TypeNode> {
        let mut fields = Vec::with_capacity(lit.fields.len());
        for init in &lit.fields {
            let value_ty = self.infer_expr_type(&init.value)?;
            fields.push(crate::ast::StructFieldDecl {
                name: init.name.clone(),
                ty: self.concretize(value_ty),
                is_static: false,
                default: None,
                span: init.span,
            });
        }
        Some(TypeNode::new(
            TypeKind::Struct(StructDecl {
                name: String::new(),
                fields,
                methods: Vec::new(),
            }),
            expr.span,
        ))
    }

    // ----- member access -----

    pub(crate) fn infer_member(
        &mut self,
        object: &Expr,
        member: &str,
        expr: &Expr,
    ) -> Option<TypeNode> {
        if let Some(name) = object.as_identifier() {
            if name == "self" {
                return self.infer_self_member(member, expr);
            }
            if let Some(through_name) = self.infer_named_member(name, member, expr) {
                return through_name;
            }
        }

        let object_ty = self.infer_expr_type(object)?;
        let resolved = self.resolve_alias(object_ty);
        self.infer_instance_member(&resolved, member, expr)
    }

    fn infer_self_member(&mut self, member: &str, expr: &Expr) -> Option<TypeNode> {
        let Some(method) = self.method_context.clone() else {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::SelfOutsideMethod,
                    "'self' is only available inside methods",
                )
                .with_target_span(expr.span),
            );
            return None;
        };
        if method.is_static {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::InstanceAccessInStatic,
                    format!("cannot access instance member '{member}' from a static method"),
                )
                .with_subject(member)
                .with_target_span(expr.span),
            );
            return None;
        }
        let owner = TypeNode::named(&method.struct_name, expr.span);
        let resolved = self.resolve_alias(owner);
        self.infer_instance_member(&resolved, member, expr)
    }

    /// Member access where the object is a bare name: enum variants,
    /// error members, static struct access and imported modules all route
    /// through the named symbol instead of a value
    fn infer_named_member(
        &mut self,
        name: &str,
        member: &str,
        expr: &Expr,
    ) -> Option<Option<TypeNode>> {
        let symbol = self.table.lookup_symbol(name)?;
        if symbol.is_import() {
            let id = symbol.id;
            let _ = self.table.mark_symbol_used(id);
            // imported module contents are linked by a later phase
            return Some(Some(TypeNode::primitive(PrimitiveType::Any, expr.span)));
        }
        if symbol.kind != SymbolKind::Definition {
            return None;
        }
        let id = symbol.id;
        let symbol_ty = symbol.ty.clone()?;
        let resolved = self.resolve_alias(symbol_ty);

        match &resolved.kind {
            TypeKind::Enum(decl) => {
                let _ = self.table.mark_symbol_used(id);
                if !decl.has_variant(member) {
                    let enum_name = decl.name.clone();
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::UnknownEnumVariant,
                            format!("enum '{enum_name}' has no variant '{member}'"),
                        )
                        .with_subject(member)
                        .with_target_span(expr.span),
                    );
                    return Some(None);
                }
                Some(Some(TypeNode::named(name, expr.span)))
            }
            TypeKind::ErrorSet(decl) => {
                let _ = self.table.mark_symbol_used(id);
                if !decl.has_member(member) {
                    let set_name = decl.name.clone();
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::ErrorMemberNotFound,
                            format!("error set '{set_name}' has no member '{member}'"),
                        )
                        .with_subject(member)
                        .with_target_span(expr.span),
                    );
                    return Some(None);
                }
                Some(Some(TypeNode::named(name, expr.span)))
            }
            TypeKind::Struct(decl) => {
                let _ = self.table.mark_symbol_used(id);
                Some(self.infer_static_member(&decl.clone(), member, expr))
            }
            _ => None,
        }
    }

    /// Access through the type name requires a static member
    fn infer_static_member(
        &mut self,
        decl: &StructDecl,
        member: &str,
        expr: &Expr,
    ) -> Option<TypeNode> {
        if let Some(field) = decl.field(member) {
            if !field.is_static {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::InvalidStaticAccess,
                        format!(
                            "instance field '{member}' cannot be accessed through type '{}'",
                            decl.name
                        ),
                    )
                    .with_subject(member)
                    .with_target_span(expr.span),
                );
                return None;
            }
            return Some(field.ty.clone());
        }
        if let Some(method) = decl.method(member) {
            if !method.is_static {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::InvalidStaticAccess,
                        format!(
                            "instance method '{member}' cannot be called through type '{}'",
                            decl.name
                        ),
                    )
                    .with_subject(member)
                    .with_target_span(expr.span),
                );
                return None;
            }
            return Some(method_fn_type(method, expr));
        }
        self.report(
            Diagnostic::new(
                DiagnosticCode::UnknownField,
                format!("struct '{}' has no member '{member}'", decl.name),
            )
            .with_subject(member)
            .with_target_span(expr.span),
        );
        None
    }

    /// Access through a value; static members remain reachable this way
    fn infer_instance_member(
        &mut self,
        resolved: &TypeNode,
        member: &str,
        expr: &Expr,
    ) -> Option<TypeNode> {
        match &resolved.kind {
            TypeKind::Struct(decl) => {
                if let Some(field) = decl.field(member) {
                    return Some(field.ty.clone());
                }
                if let Some(method) = decl.method(member) {
                    return Some(method_fn_type(method, expr));
                }
                let struct_name = decl.name.clone();
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::UnknownField,
                        format!("struct '{struct_name}' has no field '{member}'"),
                    )
                    .with_subject(member)
                    .with_target_span(expr.span),
                );
                None
            }
            TypeKind::Pointer { inner, .. } => {
                let inner = self.resolve_alias((**inner).clone());
                self.infer_instance_member(&inner, member, expr)
            }
            TypeKind::Optional(_) => {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::InvalidMemberAccess,
                        format!(
                            "cannot access member '{member}' of optional {resolved} without unwrapping"
                        ),
                    )
                    .with_subject(member)
                    .with_target_span(expr.span),
                );
                None
            }
            TypeKind::Primitive(PrimitiveType::Any) => {
                Some(TypeNode::primitive(PrimitiveType::Any, expr.span))
            }
            _ => {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::InvalidMemberAccess,
                        format!("type {resolved} has no member '{member}'"),
                    )
                    .with_subject(member)
                    .with_target_span(expr.span),
                );
                None
            }
        }
    }
}

/// Function type node for a declared method
fn method_fn_type(method: &FuncDecl, expr: &Expr) -> TypeNode {
    let params = method
        .params
        .iter()
        .map(|p| {
            p.ty.clone()
                .unwrap_or_else(|| TypeNode::primitive(PrimitiveType::Any, p.span))
        })
        .collect();
    let ret = method
        .return_type
        .clone()
        .unwrap_or_else(|| TypeNode::void(method.span));
    TypeNode::new(
        TypeKind::Function {
            params,
            ret: Box::new(ret),
        },
        expr.span,
    )
}
