//! Type compatibility and structural type checks
//!
//! Compatibility is an ordered chain: earlier rules decide before later
//! ones get a say, so `any` absorbs everything before numerics are even
//! compared, and bool is excluded from numeric coercion outright.

use crate::ast::{Expr, StructDecl, TypeKind, TypeNode};
use crate::sema::diagnostics::{Diagnostic, DiagnosticCode};
use crate::sema::eval::EvalContext;
use crate::sema::symbol::SymbolKind;

use super::TypeValidator;

/// Named-reference chains deeper than this are rejected as nesting, not
/// chased further
const MAX_TYPE_DEPTH: usize = 64;

/// Array sizes are limited to what fits an i32 index
const MAX_ARRAY_SIZE: i64 = i32::MAX as i64;

impl TypeValidator {
    /// Whether a value of type `actual` may appear where `expected` is
    /// required. Asymmetric: `expected` drives the decision.
    pub fn is_type_compatible(&mut self, expected: &TypeNode, actual: &TypeNode) -> bool {
        if expected.is_any() || actual.is_any() {
            return true;
        }
        if expected.is_anyerror() {
            let actual = self.resolve_alias(actual.clone());
            return actual.is_error_set() || actual.is_anyerror();
        }

        let expected = self.resolve_alias(expected.clone());
        let actual = self.resolve_alias(actual.clone());

        // bool stands apart from the numeric tower
        if expected.is_bool() || actual.is_bool() {
            return expected.is_bool() && actual.is_bool();
        }

        if expected.is_numeric() && actual.is_numeric() {
            // comptime literals adopt any numeric type; concrete numerics
            // are permissive across widths, with overflow checked
            // separately at the assignment site. A float never narrows
            // into an integer implicitly.
            if expected.is_integer() && actual.is_float() && !actual.is_comptime() {
                return false;
            }
            return true;
        }

        match (&expected.kind, &actual.kind) {
            (TypeKind::Union(alternatives), _) => {
                let alternatives = alternatives.clone();
                alternatives
                    .iter()
                    .any(|alt| self.is_type_compatible(alt, &actual))
            }
            (_, TypeKind::Union(alternatives)) => {
                let alternatives = alternatives.clone();
                alternatives
                    .iter()
                    .all(|alt| self.is_type_compatible(&expected, alt))
            }
            (TypeKind::Optional(inner), _) => {
                if actual.is_null() {
                    return true;
                }
                let inner = (**inner).clone();
                if let TypeKind::Optional(actual_inner) = &actual.kind {
                    let actual_inner = (**actual_inner).clone();
                    return self.is_type_compatible(&inner, &actual_inner);
                }
                self.is_type_compatible(&inner, &actual)
            }
            (
                TypeKind::Array {
                    element: expected_element,
                    size: expected_size,
                },
                TypeKind::Array {
                    element: actual_element,
                    size: actual_size,
                },
            ) => {
                let expected_element = (**expected_element).clone();
                let actual_element = (**actual_element).clone();
                let expected_size = expected_size.clone();
                let actual_size = actual_size.clone();
                if !self.is_type_compatible(&expected_element, &actual_element) {
                    return false;
                }
                match (expected_size, actual_size) {
                    (Some(expected_size), Some(actual_size)) => {
                        let expected_count = self.comptime_size(&expected_size);
                        let actual_count = self.comptime_size(&actual_size);
                        match (expected_count, actual_count) {
                            (Some(a), Some(b)) => a == b,
                            _ => true,
                        }
                    }
                    _ => true,
                }
            }
            (
                TypeKind::Pointer {
                    mutable: expected_mutable,
                    inner: expected_inner,
                },
                TypeKind::Pointer {
                    mutable: actual_mutable,
                    inner: actual_inner,
                },
            ) => {
                // a mutable pointer target cannot be satisfied by an
                // immutable pointer
                if *expected_mutable && !*actual_mutable {
                    return false;
                }
                let expected_inner = (**expected_inner).clone();
                let actual_inner = (**actual_inner).clone();
                self.is_type_compatible(&expected_inner, &actual_inner)
            }
            (TypeKind::Tuple(expected_items), TypeKind::Tuple(actual_items)) => {
                if expected_items.len() != actual_items.len() {
                    return false;
                }
                let pairs: Vec<(TypeNode, TypeNode)> = expected_items
                    .iter()
                    .cloned()
                    .zip(actual_items.iter().cloned())
                    .collect();
                pairs.iter().all(|(e, a)| self.is_type_compatible(e, a))
            }
            (TypeKind::Struct(expected_decl), TypeKind::Struct(actual_decl)) => {
                expected_decl.name == actual_decl.name
                    || self.structs_compatible(expected_decl, actual_decl)
            }
            (TypeKind::Enum(expected_decl), TypeKind::Enum(actual_decl)) => {
                expected_decl.name == actual_decl.name
            }
            (TypeKind::ErrorSet(expected_decl), TypeKind::ErrorSet(actual_decl)) => {
                expected_decl.name == actual_decl.name
            }
            (
                TypeKind::Function {
                    params: expected_params,
                    ret: expected_ret,
                },
                TypeKind::Function {
                    params: actual_params,
                    ret: actual_ret,
                },
            ) => {
                if expected_params.len() != actual_params.len() {
                    return false;
                }
                let pairs: Vec<(TypeNode, TypeNode)> = expected_params
                    .iter()
                    .cloned()
                    .zip(actual_params.iter().cloned())
                    .collect();
                let expected_ret = (**expected_ret).clone();
                let actual_ret = (**actual_ret).clone();
                pairs.iter().all(|(e, a)| self.is_type_compatible(e, a))
                    && self.is_type_compatible(&expected_ret, &actual_ret)
            }
            (TypeKind::Primitive(e), TypeKind::Primitive(a)) => e == a,
            (TypeKind::Named(e), TypeKind::Named(a)) => e == a,
            _ => false,
        }
    }

    /// Anonymous struct literals match by shape: same field names with
    /// pairwise-compatible types
    fn structs_compatible(&mut self, expected: &StructDecl, actual: &StructDecl) -> bool {
        if expected.fields.len() != actual.fields.len() {
            return false;
        }
        for field in expected.fields.clone() {
            let Some(other) = actual.field(&field.name).cloned() else {
                return false;
            };
            if !self.is_type_compatible(&field.ty, &other.ty) {
                return false;
            }
        }
        true
    }

    fn comptime_size(&mut self, size: &Expr) -> Option<i64> {
        self.evaluate_comptime(size, &EvalContext::ints_only())?.as_int()
    }

    // ----- reference checking -----

    /// Verify every `Named` reference inside a type resolves to a type
    pub(crate) fn check_type_refs(&mut self, ty: &TypeNode) {
        match &ty.kind {
            TypeKind::Named(name) => {
                let Some(symbol) = self.table.lookup_symbol(name) else {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::UndefinedType,
                            format!("undefined type '{name}'"),
                        )
                        .with_subject(name)
                        .with_target_span(ty.span),
                    );
                    return;
                };
                let id = symbol.id;
                let kind = symbol.kind;
                let _ = self.table.mark_symbol_used(id);
                if !matches!(kind, SymbolKind::Definition | SymbolKind::Use) {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::NotAType,
                            format!("'{name}' is not a type"),
                        )
                        .with_subject(name)
                        .with_target_span(ty.span),
                    );
                }
            }
            TypeKind::Optional(inner) => self.check_type_refs(inner),
            TypeKind::Pointer { inner, .. } => self.check_type_refs(inner),
            TypeKind::Array { element, size } => {
                self.check_type_refs(element);
                if let Some(size) = size {
                    self.validate_array_size(size);
                }
            }
            TypeKind::Tuple(items) | TypeKind::Union(items) => {
                for item in items {
                    self.check_type_refs(item);
                }
            }
            TypeKind::Struct(decl) => {
                for field in &decl.fields {
                    self.check_type_refs(&field.ty);
                }
            }
            TypeKind::Function { params, ret } => {
                for param in params {
                    self.check_type_refs(param);
                }
                self.check_type_refs(ret);
            }
            TypeKind::Primitive(_) | TypeKind::Enum(_) | TypeKind::ErrorSet(_) => {}
        }
    }

    /// Array sizes must be comptime-evaluable positive integers that fit
    /// an i32 index
    pub(crate) fn validate_array_size(&mut self, size: &Expr) {
        let Some(value) = self.comptime_size(size) else {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::ArraySizeNotComptime,
                    "array size must be a compile-time integer",
                )
                .with_target_span(size.span),
            );
            return;
        };
        if value <= 0 {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::InvalidArraySize,
                    format!("array size must be positive, found {value}"),
                )
                .with_target_span(size.span),
            );
        } else if value > MAX_ARRAY_SIZE {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::ArraySizeTooLarge,
                    format!("array size {value} exceeds the maximum of {MAX_ARRAY_SIZE}"),
                )
                .with_target_span(size.span),
            );
        }
    }

    // ----- circular types -----

    /// Reject value-level type cycles. Pointer and optional wrappers
    /// add indirection and break a cycle; a cycle reached without one
    /// would make the type infinitely sized.
    pub(crate) fn check_circular_type(&mut self, name: &str, ty: &TypeNode) {
        let key = (name.to_string(), type_kind_name(ty), ty.span.start);
        if !self.circular_guard.insert(key) {
            return;
        }
        let mut trail = vec![name.to_string()];
        self.check_circular_inner(name, ty, &mut trail);
    }

    fn check_circular_inner(&mut self, origin: &str, ty: &TypeNode, trail: &mut Vec<String>) {
        if trail.len() > MAX_TYPE_DEPTH {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::TypeNestingTooDeep,
                    format!("type '{origin}' nests deeper than {MAX_TYPE_DEPTH} levels"),
                )
                .with_subject(origin)
                .with_target_span(ty.span),
            );
            return;
        }
        match &ty.kind {
            TypeKind::Named(referenced) => {
                if trail.iter().any(|seen| seen == referenced) {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::CircularTypeDependency,
                            format!(
                                "type '{origin}' depends on itself through '{referenced}'"
                            ),
                        )
                        .with_subject(origin)
                        .with_target_span(ty.span),
                    );
                    return;
                }
                let Some(underlying) =
                    self.table.lookup_symbol(referenced).and_then(|s| s.ty.clone())
                else {
                    return;
                };
                trail.push(referenced.clone());
                self.check_circular_inner(origin, &underlying, trail);
                trail.pop();
            }
            TypeKind::Array { element, .. } => {
                let element = (**element).clone();
                self.check_circular_inner(origin, &element, trail);
            }
            TypeKind::Tuple(items) | TypeKind::Union(items) => {
                for item in items.clone() {
                    self.check_circular_inner(origin, &item, trail);
                }
            }
            TypeKind::Struct(decl) => {
                for field in decl.fields.clone() {
                    if field.is_static {
                        continue;
                    }
                    self.check_circular_inner(origin, &field.ty, trail);
                }
            }
            // pointer and optional indirection break the cycle safely
            TypeKind::Optional(_)
            | TypeKind::Pointer { .. }
            | TypeKind::Function { .. }
            | TypeKind::Primitive(_)
            | TypeKind::Enum(_)
            | TypeKind::ErrorSet(_) => {}
        }
    }
}

/// Stable discriminant name for circular-check keys
fn type_kind_name(ty: &TypeNode) -> &'static str {
    match &ty.kind {
        TypeKind::Primitive(_) => "Primitive",
        TypeKind::Named(_) => "Named",
        TypeKind::Optional(_) => "Optional",
        TypeKind::Pointer { .. } => "Pointer",
        TypeKind::Array { .. } => "Array",
        TypeKind::Tuple(_) => "Tuple",
        TypeKind::Struct(_) => "Struct",
        TypeKind::Enum(_) => "Enum",
        TypeKind::ErrorSet(_) => "ErrorSet",
        TypeKind::Union(_) => "Union",
        TypeKind::Function { .. } => "Function",
    }
}
