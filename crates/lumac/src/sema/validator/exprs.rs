//! Expression type inference and operator checking
//!
//! Inference is memoized per (module, span, node kind) so re-visited
//! subtrees cost one hash lookup. Every failure path reports a diagnostic
//! and returns `None`; callers treat an absent type as "already reported"
//! and keep going.

use crate::ast::{
    BinaryOp, Expr, ExprKind, PrimitiveType, SwitchArm, TypeKind, TypeNode, UnaryOp,
};
use crate::common::Span;
use crate::sema::diagnostics::{Diagnostic, DiagnosticCode};
use crate::sema::eval::EvalContext;
use crate::sema::scope::{ScopeId, ScopeKind};
use crate::sema::symbol::{Mutability, SymbolKind};

use super::{TypeValidator, TYPE_CACHE_LIMIT};

impl TypeValidator {
    /// Infer the type of an expression, memoized. `None` means a
    /// diagnostic was already reported for this subtree.
    pub fn infer_expr_type(&mut self, expr: &Expr) -> Option<TypeNode> {
        let key = (
            self.ctx.module_name().unwrap_or("").to_string(),
            expr.span.start,
            expr.span.end,
            expr.kind_name(),
        );
        if let Some(cached) = self.type_cache.get(&key) {
            return Some(cached.clone());
        }
        if !self.inference_in_progress.insert(key.clone()) {
            // self-referential inference, the circular check reports it
            return None;
        }

        let inferred = self.infer_expr_inner(expr);

        self.inference_in_progress.remove(&key);
        if let Some(ty) = &inferred {
            if self.type_cache.len() >= TYPE_CACHE_LIMIT {
                let drop_count = self.cache_order.len() / 2;
                for old in self.cache_order.drain(..drop_count) {
                    self.type_cache.remove(&old);
                }
            }
            self.type_cache.insert(key.clone(), ty.clone());
            self.cache_order.push(key);
        }
        inferred
    }

    fn infer_expr_inner(&mut self, expr: &Expr) -> Option<TypeNode> {
        match &expr.kind {
            ExprKind::IntLiteral(_) => {
                Some(TypeNode::primitive(PrimitiveType::ComptimeInt, expr.span))
            }
            ExprKind::FloatLiteral(_) => {
                Some(TypeNode::primitive(PrimitiveType::ComptimeFloat, expr.span))
            }
            ExprKind::BoolLiteral(_) => Some(TypeNode::bool(expr.span)),
            ExprKind::NullLiteral => Some(TypeNode::primitive(PrimitiveType::Null, expr.span)),
            ExprKind::StringLiteral(_) => Some(TypeNode::pointer(
                TypeNode::primitive(PrimitiveType::U8, expr.span),
                false,
            )),
            ExprKind::Identifier(name) => self.infer_identifier(name, expr),
            ExprKind::Binary { op, lhs, rhs } => self.infer_binary(*op, lhs, rhs, expr),
            ExprKind::Unary { op, operand } => self.infer_unary(*op, operand, expr),
            ExprKind::Call { callee, args } => self.validate_call(callee, args, expr),
            ExprKind::Member { object, member } => self.infer_member(object, member, expr),
            ExprKind::Index { object, index } => self.infer_index(object, index, expr),
            ExprKind::StructLiteral(lit) => self.validate_struct_literal(lit, expr),
            ExprKind::ArrayLiteral(elements) => self.infer_array_literal(elements, expr),
            ExprKind::TupleLiteral(elements) => {
                let mut item_types = Vec::with_capacity(elements.len());
                for element in elements {
                    item_types.push(self.infer_expr_type(element)?);
                }
                Some(TypeNode::new(TypeKind::Tuple(item_types), expr.span))
            }
            ExprKind::Assign { target, value } => self.validate_assignment(target, value, expr),
            ExprKind::Switch { scrutinee, arms } => self.validate_switch(scrutinee, arms, expr),
            ExprKind::SizeOf(ty) => {
                self.check_type_refs(ty);
                Some(TypeNode::primitive(PrimitiveType::ComptimeInt, expr.span))
            }
        }
    }

    // ----- identifiers -----

    fn infer_identifier(&mut self, name: &str, expr: &Expr) -> Option<TypeNode> {
        let Some(symbol) = self.table.lookup_symbol(name) else {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::UndefinedIdentifier,
                    format!("undefined identifier '{name}'"),
                )
                .with_subject(name)
                .with_target_span(expr.span),
            );
            return None;
        };

        let id = symbol.id;
        let kind = symbol.kind;
        let initialized = symbol.initialized;
        let ty = symbol.ty.clone();
        let initializer = symbol.initializer().cloned();
        let is_static_member = symbol.is_static_member();
        let owning_scope = symbol.owning_scope;
        let _ = self.table.mark_symbol_used(id);

        if self.bare_instance_access_in_static(name, kind, is_static_member, owning_scope, expr.span)
        {
            return None;
        }

        if kind == SymbolKind::Variable && !initialized {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::UsedBeforeInitialized,
                    format!("'{name}' is used before it is initialized"),
                )
                .with_subject(name)
                .with_target_span(expr.span),
            );
        }

        if let Some(ty) = ty {
            return Some(ty);
        }
        // untyped constant: fall back to its initializer
        if let Some(init) = initializer {
            return self.infer_expr_type(&init);
        }
        self.report(
            Diagnostic::new(
                DiagnosticCode::TypeInferenceFailed,
                format!("cannot determine the type of '{name}'"),
            )
            .with_subject(name)
            .with_target_span(expr.span),
        );
        None
    }

    /// A bare name inside a static method can reach the enclosing
    /// struct's instance members through the type scope; report and
    /// return `true` when that happens
    pub(crate) fn bare_instance_access_in_static(
        &mut self,
        name: &str,
        kind: SymbolKind,
        is_static_member: bool,
        owning_scope: ScopeId,
        span: Span,
    ) -> bool {
        if is_static_member || !matches!(kind, SymbolKind::StructField | SymbolKind::Function) {
            return false;
        }
        let Some(mc) = self.method_context.clone() else {
            return false;
        };
        if !mc.is_static {
            return false;
        }
        let in_enclosing_struct = self
            .table
            .scope(owning_scope)
            .is_ok_and(|s| s.kind == ScopeKind::Type && s.name == mc.struct_name);
        if !in_enclosing_struct {
            return false;
        }
        self.report(
            Diagnostic::new(
                DiagnosticCode::InstanceAccessInStatic,
                format!("cannot access instance member '{name}' from a static method"),
            )
            .with_subject(name)
            .with_target_span(span),
        );
        true
    }

    // ----- operators -----

    fn infer_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        expr: &Expr,
    ) -> Option<TypeNode> {
        let lhs_ty = self.infer_expr_type(lhs);
        let rhs_ty = self.infer_expr_type(rhs);
        let (lhs_ty, rhs_ty) = (lhs_ty?, rhs_ty?);

        if op.is_logical() {
            for (ty, side) in [(&lhs_ty, lhs), (&rhs_ty, rhs)] {
                if !ty.is_bool() {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::TypeMismatch,
                            format!("operator '{op}' requires bool operands, found {ty}"),
                        )
                        .with_target_span(side.span),
                    );
                    return None;
                }
            }
            return Some(TypeNode::bool(expr.span));
        }

        if op.is_comparison() {
            let comparable = self.is_type_compatible(&lhs_ty, &rhs_ty)
                || self.is_type_compatible(&rhs_ty, &lhs_ty)
                || (op.is_equality() && (lhs_ty.is_null() || rhs_ty.is_null()));
            if !comparable {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::IncompatibleOperands,
                        format!("cannot compare {lhs_ty} with {rhs_ty}"),
                    )
                    .with_target_span(expr.span),
                );
                return None;
            }
            return Some(TypeNode::bool(expr.span));
        }

        // arithmetic, bitwise and shift operate on numbers
        for (ty, side) in [(&lhs_ty, lhs), (&rhs_ty, rhs)] {
            if ty.is_bool() {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::BooleanOperandNotAllowed,
                        format!("operator '{op}' cannot be applied to bool"),
                    )
                    .with_target_span(side.span),
                );
                return None;
            }
            if ty.is_null() {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::NullOperandNotAllowed,
                        format!("operator '{op}' cannot be applied to null"),
                    )
                    .with_target_span(side.span),
                );
                return None;
            }
        }

        if op.is_bitwise() || op.is_shift() {
            for (ty, side) in [(&lhs_ty, lhs), (&rhs_ty, rhs)] {
                if !ty.is_integer() {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::InvalidOperandType,
                            format!("operator '{op}' requires integer operands, found {ty}"),
                        )
                        .with_target_span(side.span),
                    );
                    return None;
                }
            }
            return Some(self.unify_numeric(&lhs_ty, &rhs_ty, expr));
        }

        if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::InvalidOperandType,
                    format!("operator '{op}' cannot combine {lhs_ty} and {rhs_ty}"),
                )
                .with_target_span(expr.span),
            );
            return None;
        }
        if !self.is_type_compatible(&lhs_ty, &rhs_ty) && !self.is_type_compatible(&rhs_ty, &lhs_ty)
        {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::IncompatibleOperands,
                    format!("cannot combine {lhs_ty} and {rhs_ty} with '{op}'"),
                )
                .with_target_span(expr.span),
            );
            return None;
        }

        let result = self.unify_numeric(&lhs_ty, &rhs_ty, expr);
        // fold fully-comptime arithmetic now so division by zero and
        // overflow surface at this site
        if lhs_ty.is_comptime() && rhs_ty.is_comptime() {
            self.evaluate_comptime(expr, &EvalContext::default());
        }
        Some(result)
    }

    /// Resulting numeric type of a binary operation: the concrete side
    /// wins over a comptime literal, the left side wins a concrete tie
    fn unify_numeric(&self, lhs: &TypeNode, rhs: &TypeNode, expr: &Expr) -> TypeNode {
        let picked = if lhs.is_comptime() && !rhs.is_comptime() {
            rhs
        } else {
            lhs
        };
        TypeNode::new(picked.kind.clone(), expr.span)
    }

    fn infer_unary(&mut self, op: UnaryOp, operand: &Expr, expr: &Expr) -> Option<TypeNode> {
        let operand_ty = self.infer_expr_type(operand)?;
        match op {
            UnaryOp::Neg => {
                if !operand_ty.is_numeric() {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::InvalidOperandType,
                            format!("cannot negate a value of type {operand_ty}"),
                        )
                        .with_target_span(operand.span),
                    );
                    return None;
                }
                if operand_ty.is_unsigned() {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::InvalidOperandType,
                            format!("cannot negate the unsigned type {operand_ty}"),
                        )
                        .with_target_span(operand.span),
                    );
                    return None;
                }
                Some(TypeNode::new(operand_ty.kind, expr.span))
            }
            UnaryOp::Not => {
                if !operand_ty.is_bool() {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::TypeMismatch,
                            format!("operator 'not' requires bool, found {operand_ty}"),
                        )
                        .with_target_span(operand.span),
                    );
                    return None;
                }
                Some(TypeNode::bool(expr.span))
            }
            UnaryOp::Deref => match operand_ty.kind {
                TypeKind::Pointer { inner, .. } => Some(*inner),
                _ => {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::InvalidOperandType,
                            format!("cannot dereference a value of type {operand_ty}"),
                        )
                        .with_target_span(operand.span),
                    );
                    None
                }
            },
            UnaryOp::AddrOf => {
                let mutable = self.expr_is_mutable(operand);
                Some(TypeNode::pointer(operand_ty, mutable))
            }
        }
    }

    // ----- indexing -----

    fn infer_index(&mut self, object: &Expr, index: &Expr, expr: &Expr) -> Option<TypeNode> {
        let object_ty = self.infer_expr_type(object);
        if let Some(index_ty) = self.infer_expr_type(index) {
            if !index_ty.is_integer() {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::TypeMismatch,
                        format!("index must be an integer, found {index_ty}"),
                    )
                    .with_target_span(index.span),
                );
            }
        }

        let object_ty = self.resolve_alias(object_ty?);
        match &object_ty.kind {
            TypeKind::Array { element, .. } => Some((**element).clone()),
            TypeKind::Pointer { inner, .. } => Some((**inner).clone()),
            TypeKind::Tuple(items) => {
                let index_value =
                    self.evaluate_comptime(index, &EvalContext::ints_only())?.as_int()?;
                match usize::try_from(index_value).ok().and_then(|i| items.get(i)) {
                    Some(item) => Some(item.clone()),
                    None => {
                        self.report(
                            Diagnostic::new(
                                DiagnosticCode::TupleArityMismatch,
                                format!(
                                    "tuple index {index_value} is out of bounds for {object_ty}"
                                ),
                            )
                            .with_target_span(index.span),
                        );
                        None
                    }
                }
            }
            _ => {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::CannotIndexType,
                        format!("cannot index a value of type {object_ty}"),
                    )
                    .with_target_span(expr.span),
                );
                None
            }
        }
    }

    fn infer_array_literal(&mut self, elements: &[Expr], expr: &Expr) -> Option<TypeNode> {
        let Some((first, rest)) = elements.split_first() else {
            return Some(TypeNode::new(
                TypeKind::Array {
                    element: Box::new(TypeNode::primitive(PrimitiveType::Any, expr.span)),
                    size: None,
                },
                expr.span,
            ));
        };

        let first_ty = self.infer_expr_type(first)?;
        let element_ty = self.concretize(first_ty);
        for element in rest {
            let Some(ty) = self.infer_expr_type(element) else {
                continue;
            };
            if !self.is_type_compatible(&element_ty, &ty) {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::ArrayElementMismatch,
                        format!("array element has type {ty}, expected {element_ty}"),
                    )
                    .with_target_span(element.span),
                );
            }
        }
        Some(TypeNode::new(
            TypeKind::Array {
                element: Box::new(element_ty),
                size: None,
            },
            expr.span,
        ))
    }

    // ----- assignment -----

    fn validate_assignment(&mut self, target: &Expr, value: &Expr, expr: &Expr) -> Option<TypeNode> {
        if !matches!(
            target.kind,
            ExprKind::Identifier(_)
                | ExprKind::Member { .. }
                | ExprKind::Index { .. }
                | ExprKind::Unary {
                    op: UnaryOp::Deref,
                    ..
                }
        ) {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::InvalidAssignmentTarget,
                    format!("cannot assign to a {} expression", target.kind_name()),
                )
                .with_target_span(target.span),
            );
            return None;
        }

        // mutability is checked before types so an immutable binding gets
        // exactly one diagnostic
        if !self.expr_is_mutable(target) {
            let subject = target.as_identifier().map(str::to_string);
            let what = subject.as_deref().map_or_else(
                || "this expression".to_string(),
                |name| format!("'{name}'"),
            );
            let mut diagnostic = Diagnostic::new(
                DiagnosticCode::MutabilityMismatch,
                format!("cannot assign to {what}: it is immutable"),
            )
            .with_target_span(target.span);
            if let Some(subject) = subject {
                diagnostic = diagnostic.with_subject(subject);
            }
            self.report(diagnostic);
            return None;
        }

        let target_ty = self.infer_expr_type(target)?;
        let value_ty = self.infer_expr_type(value)?;
        if !self.is_type_compatible(&target_ty, &value_ty) {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::AssignmentTypeMismatch,
                    format!("cannot assign {value_ty} to a target of type {target_ty}"),
                )
                .with_target_span(value.span),
            );
            return None;
        }
        if target_ty.is_integer() && value_ty.is_comptime() {
            self.evaluate_comptime(value, &EvalContext::with_target(&target_ty));
        }

        if let Some(name) = target.as_identifier() {
            if let Some(symbol) = self.table.lookup_symbol(name) {
                let id = symbol.id;
                if let Ok(symbol) = self.table.symbol_mut(id) {
                    symbol.initialized = true;
                }
            }
        }
        Some(TypeNode::void(expr.span))
    }

    /// Whether an expression names a place that may be written
    pub(crate) fn expr_is_mutable(&self, expr: &Expr) -> bool {
        match &expr.kind {
            ExprKind::Identifier(name) => self
                .table
                .lookup_symbol(name)
                .is_some_and(|s| s.mutability == Mutability::Mutable),
            ExprKind::Member { object, .. } | ExprKind::Index { object, .. } => {
                self.expr_is_mutable(object)
            }
            ExprKind::Unary {
                op: UnaryOp::Deref,
                operand,
            } => self
                .pointer_mutability(operand)
                .unwrap_or(false),
            _ => false,
        }
    }

    fn pointer_mutability(&self, operand: &Expr) -> Option<bool> {
        let name = operand.as_identifier()?;
        let ty = self.table.lookup_symbol(name)?.ty.as_ref()?;
        match &ty.kind {
            TypeKind::Pointer { mutable, .. } => Some(*mutable),
            _ => None,
        }
    }

    // ----- switch -----

    fn validate_switch(
        &mut self,
        scrutinee: &Expr,
        arms: &[SwitchArm],
        expr: &Expr,
    ) -> Option<TypeNode> {
        let scrutinee_ty = self.infer_expr_type(scrutinee)?;
        let resolved = self.resolve_alias(scrutinee_ty.clone());

        let mut covered: Vec<String> = Vec::new();
        let mut bool_covered = [false, false];
        let mut has_default = false;
        for arm in arms {
            if arm.is_default {
                has_default = true;
            }
            for label in &arm.labels {
                if let Some(variant) = self.switch_label_name(label) {
                    covered.push(variant);
                }
                if let ExprKind::BoolLiteral(value) = label.kind {
                    bool_covered[usize::from(value)] = true;
                }
                if let Some(label_ty) = self.infer_expr_type(label) {
                    if !self.is_type_compatible(&scrutinee_ty, &label_ty)
                        && !self.is_type_compatible(&label_ty, &scrutinee_ty)
                    {
                        self.report(
                            Diagnostic::new(
                                DiagnosticCode::TypeMismatch,
                                format!(
                                    "switch case has type {label_ty}, expected {scrutinee_ty}"
                                ),
                            )
                            .with_target_span(label.span),
                        );
                    }
                }
            }
        }

        // a bool scrutinee needs both literals or a default arm
        if resolved.is_bool() && !has_default {
            for (value, seen) in [(false, bool_covered[0]), (true, bool_covered[1])] {
                if !seen {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::TypeMismatch,
                            format!("switch over bool does not cover '{value}'"),
                        )
                        .with_target_span(expr.span),
                    );
                }
            }
        }

        // enum scrutinees must be exhaustive unless a default arm exists
        if let Some(decl) = resolved.as_enum() {
            if !has_default {
                for (variant, _) in &decl.variants {
                    if !covered.iter().any(|c| c == variant) {
                        self.report(
                            Diagnostic::new(
                                DiagnosticCode::TypeMismatch,
                                format!(
                                    "switch over {} does not cover variant '{variant}'",
                                    decl.name
                                ),
                            )
                            .with_subject(variant.clone())
                            .with_target_span(expr.span),
                        );
                    }
                }
            }
        }

        let mut result: Option<TypeNode> = None;
        for arm in arms {
            let Some(body_ty) = self.infer_expr_type(&arm.body) else {
                continue;
            };
            match &result {
                None => result = Some(self.concretize(body_ty)),
                Some(expected) => {
                    if !self.is_type_compatible(expected, &body_ty) {
                        self.report(
                            Diagnostic::new(
                                DiagnosticCode::TypeMismatch,
                                format!("switch arm has type {body_ty}, expected {expected}"),
                            )
                            .with_target_span(arm.span),
                        );
                    }
                }
            }
        }
        result.map(|ty| TypeNode::new(ty.kind, expr.span))
    }

    /// Variant name a case label refers to, for exhaustiveness tracking
    fn switch_label_name(&self, label: &Expr) -> Option<String> {
        if let Some((_, member)) = label.as_member() {
            return Some(member.to_string());
        }
        label.as_identifier().map(str::to_string)
    }

    // ----- helpers shared with statements -----

    /// Replace comptime literal types with their default concrete type
    pub(crate) fn concretize(&self, ty: TypeNode) -> TypeNode {
        match ty.kind {
            TypeKind::Primitive(PrimitiveType::ComptimeInt) => {
                TypeNode::primitive(PrimitiveType::I32, ty.span)
            }
            TypeKind::Primitive(PrimitiveType::ComptimeFloat) => {
                TypeNode::primitive(PrimitiveType::F64, ty.span)
            }
            _ => ty,
        }
    }

    /// Element type yielded when iterating or indexing a value
    pub(crate) fn element_type(&self, ty: &TypeNode) -> Option<TypeNode> {
        let resolved = self.resolve_alias(ty.clone());
        match &resolved.kind {
            TypeKind::Array { element, .. } => Some((**element).clone()),
            TypeKind::Pointer { inner, .. } => match &inner.kind {
                TypeKind::Array { element, .. } => Some((**element).clone()),
                _ => Some((**inner).clone()),
            },
            _ => None,
        }
    }

    /// Follow `Named` references through the symbol table to the
    /// underlying type; bounded so a cyclic alias cannot hang inference
    pub(crate) fn resolve_alias(&self, ty: TypeNode) -> TypeNode {
        let mut current = ty;
        for _ in 0..32 {
            let Some(name) = current.as_named().map(str::to_string) else {
                return current;
            };
            let Some(underlying) = self
                .table
                .lookup_symbol(&name)
                .and_then(|s| s.ty.clone())
            else {
                return current;
            };
            // a definition naming itself resolves once and stops
            if underlying.as_named() == Some(name.as_str()) {
                return underlying;
            }
            current = underlying;
        }
        current
    }
}
