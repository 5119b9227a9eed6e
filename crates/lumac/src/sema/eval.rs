//! Compile-time expression evaluation
//!
//! Folds constant expressions into values for contexts that require them:
//! array sizes, `sizeof`, and overflow pre-checks. Evaluation is pure
//! given fixed inputs; failures emit exactly one diagnostic and yield
//! `None`, which callers read as "not a compile-time constant".
//!
//! Integers are computed through i128 and bounded to the canonical signed
//! 64-bit working range; when a target type is supplied, the produced
//! value is re-checked against that type's actual width and signedness.

use crate::ast::{BinaryOp, Expr, ExprKind, TypeKind, TypeNode, UnaryOp};
use crate::sema::context::AnalysisContext;
use crate::sema::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::sema::scope::SymbolTable;
use crate::sema::symbol::{SymbolId, SymbolKind};
use std::collections::HashSet;

/// Maximum exponent admitted by `**`; protects against runaway folding
const MAX_EXPONENT: i64 = 10_000;

/// Semantic kind of a comptime value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Int,
    Float,
    Bool,
    Null,
}

/// A fully folded constant
#[derive(Debug, Clone, PartialEq)]
pub enum ComptimeValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl ComptimeValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::Bool(_) => ValueKind::Bool,
            Self::Null => ValueKind::Null,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Caller-supplied evaluation policy
#[derive(Debug, Clone)]
pub struct EvalContext<'t> {
    pub allow_floats: bool,
    pub min_int: i64,
    pub max_int: i64,
    /// Bounds are re-checked against this type after evaluation
    pub target_type: Option<&'t TypeNode>,
}

impl Default for EvalContext<'_> {
    fn default() -> Self {
        Self {
            allow_floats: true,
            min_int: i64::MIN,
            max_int: i64::MAX,
            target_type: None,
        }
    }
}

impl<'t> EvalContext<'t> {
    pub fn with_target(target: &'t TypeNode) -> Self {
        Self {
            target_type: Some(target),
            ..Self::default()
        }
    }

    pub fn ints_only() -> Self {
        Self {
            allow_floats: false,
            ..Self::default()
        }
    }
}

/// Signed bounds for a target type: `[-2^(w-1), 2^(w-1)-1]` signed,
/// `[0, 2^w-1]` unsigned; unspecified and comptime types default to the
/// canonical 64-bit range
fn target_bounds(target: &TypeNode) -> (i128, i128) {
    let canonical = (i64::MIN as i128, i64::MAX as i128);
    let Some(width) = target.bit_width() else {
        return canonical;
    };
    if target.is_unsigned() {
        if width >= 64 {
            // u64 max exceeds the canonical container; clamp there
            return (0, i64::MAX as i128);
        }
        (0, (1i128 << width) - 1)
    } else if target.is_signed() {
        (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1)
    } else {
        canonical
    }
}

/// The compile-time evaluator; borrows the table for constant-identifier
/// lookups and the collector for failure reporting
pub struct ComptimeEvaluator<'a> {
    table: &'a SymbolTable,
    diagnostics: &'a mut DiagnosticCollector,
    ctx: &'a AnalysisContext,
    /// Constants currently being inlined; guards user-written cycles
    visiting: HashSet<SymbolId>,
    /// Type names currently being sized; re-entry means the size is
    /// unknown (self-referential types behind indirection)
    sizing: HashSet<String>,
}

impl<'a> ComptimeEvaluator<'a> {
    pub fn new(
        table: &'a SymbolTable,
        diagnostics: &'a mut DiagnosticCollector,
        ctx: &'a AnalysisContext,
    ) -> Self {
        Self {
            table,
            diagnostics,
            ctx,
            visiting: HashSet::new(),
            sizing: HashSet::new(),
        }
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic, self.ctx);
    }

    /// Fold `expr` into a value, or report why it is not a constant
    pub fn evaluate(&mut self, expr: &Expr, ectx: &EvalContext<'_>) -> Option<ComptimeValue> {
        let value = self.evaluate_inner(expr, ectx)?;
        self.check_target(&value, expr, ectx)
    }

    fn evaluate_inner(&mut self, expr: &Expr, ectx: &EvalContext<'_>) -> Option<ComptimeValue> {
        match &expr.kind {
            ExprKind::IntLiteral(text) => self.eval_int_literal(text, expr, ectx),
            ExprKind::FloatLiteral(value) => {
                if !ectx.allow_floats {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::FloatNotAllowed,
                            "float value not allowed in this comptime context",
                        )
                        .with_target_span(expr.span),
                    );
                    return None;
                }
                if !value.is_finite() {
                    self.report(
                        Diagnostic::new(
                            DiagnosticCode::NonFiniteFloat,
                            "float literal overflows to a non-finite value",
                        )
                        .with_target_span(expr.span),
                    );
                    return None;
                }
                Some(ComptimeValue::Float(*value))
            }
            ExprKind::BoolLiteral(value) => Some(ComptimeValue::Bool(*value)),
            ExprKind::NullLiteral => Some(ComptimeValue::Null),
            ExprKind::Identifier(name) => self.eval_identifier(name, expr, ectx),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand, expr, ectx),
            ExprKind::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, expr, ectx),
            ExprKind::SizeOf(ty) => self.size_of(ty).map(ComptimeValue::Int),
            _ => None,
        }
    }

    fn eval_int_literal(
        &mut self,
        text: &str,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<ComptimeValue> {
        let cleaned: String = text.chars().filter(|&c| c != '_').collect();
        let (digits, radix) = if let Some(hex) = cleaned.strip_prefix("0x") {
            (hex, 16)
        } else if let Some(oct) = cleaned.strip_prefix("0o") {
            (oct, 8)
        } else if let Some(bin) = cleaned.strip_prefix("0b") {
            (bin, 2)
        } else {
            (cleaned.as_str(), 10)
        };

        let Ok(value) = i128::from_str_radix(digits, radix) else {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::LiteralOverflow,
                    format!("integer literal {text} exceeds the comptime integer range"),
                )
                .with_target_span(expr.span),
            );
            return None;
        };

        self.bounded_int(value, expr, ectx)
    }

    fn eval_identifier(
        &mut self,
        name: &str,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<ComptimeValue> {
        let symbol = self.table.lookup_symbol(name)?;
        if !matches!(symbol.kind, SymbolKind::Definition | SymbolKind::Variable) {
            return None;
        }
        if symbol.is_mutable() {
            return None;
        }
        let initializer = symbol.initializer()?.clone();

        if !self.visiting.insert(symbol.id) {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::RecursiveConstant,
                    format!("constant '{name}' depends on itself"),
                )
                .with_subject(name)
                .with_target_span(expr.span),
            );
            return None;
        }
        let value = self.evaluate_inner(&initializer, ectx);
        self.visiting.remove(&symbol.id);
        value
    }

    fn eval_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<ComptimeValue> {
        let value = self.evaluate_inner(operand, ectx)?;
        match (op, value) {
            (UnaryOp::Neg, ComptimeValue::Int(v)) => {
                self.bounded_int(-(v as i128), expr, ectx)
            }
            (UnaryOp::Neg, ComptimeValue::Float(v)) => Some(ComptimeValue::Float(-v)),
            (UnaryOp::Not, ComptimeValue::Bool(v)) => Some(ComptimeValue::Bool(!v)),
            (UnaryOp::Not, ComptimeValue::Int(v)) => Some(ComptimeValue::Int(!v)),
            _ => {
                self.report(
                    Diagnostic::new(
                        DiagnosticCode::InvalidOperandType,
                        "operand type not valid for this comptime operator",
                    )
                    .with_target_span(expr.span),
                );
                None
            }
        }
    }

    /// Explicit operand-compatibility gate, checked before any operator
    /// is applied
    fn operands_compatible(op: BinaryOp, lhs: ValueKind, rhs: ValueKind) -> bool {
        use ValueKind::*;
        match (lhs, rhs) {
            (Bool, Bool) => op.is_logical() || op.is_equality() || op.is_relational(),
            (Null, Null) => op.is_equality() || op.is_relational(),
            (Int, Int) | (Float, Float) => !op.is_logical(),
            // numeric kinds may mix for arithmetic and power only
            (Int, Float) | (Float, Int) => op.is_arithmetic(),
            _ => false,
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<ComptimeValue> {
        let left = self.evaluate_inner(lhs, ectx)?;
        let right = self.evaluate_inner(rhs, ectx)?;

        if !Self::operands_compatible(op, left.kind(), right.kind()) {
            let code = match (left.kind(), right.kind()) {
                (ValueKind::Bool, _) | (_, ValueKind::Bool) => {
                    DiagnosticCode::BooleanOperandNotAllowed
                }
                (ValueKind::Null, _) | (_, ValueKind::Null) => {
                    DiagnosticCode::NullOperandNotAllowed
                }
                _ => DiagnosticCode::IncompatibleOperands,
            };
            self.report(
                Diagnostic::new(
                    code,
                    format!("operands not valid for comptime operator '{op}'"),
                )
                .with_target_span(expr.span),
            );
            return None;
        }

        if (op.is_bitwise() || op.is_shift())
            && !(left.kind() == ValueKind::Int && right.kind() == ValueKind::Int)
        {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::IncompatibleOperands,
                    format!("operator '{op}' requires integer operands on both sides"),
                )
                .with_target_span(expr.span),
            );
            return None;
        }

        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
                self.eval_additive(op, left, right, expr, ectx)
            }
            BinaryOp::Div | BinaryOp::Mod => self.eval_division(op, left, right, expr, ectx),
            BinaryOp::Pow => self.eval_power(left, right, expr, ectx),
            BinaryOp::Shl | BinaryOp::Shr => self.eval_shift(op, left, right, expr),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                let (ComptimeValue::Int(a), ComptimeValue::Int(b)) = (left, right) else {
                    return None;
                };
                let result = match op {
                    BinaryOp::BitAnd => a & b,
                    BinaryOp::BitOr => a | b,
                    _ => a ^ b,
                };
                Some(ComptimeValue::Int(result))
            }
            BinaryOp::And | BinaryOp::Or => {
                let (ComptimeValue::Bool(a), ComptimeValue::Bool(b)) = (left, right) else {
                    return None;
                };
                Some(ComptimeValue::Bool(if op == BinaryOp::And { a && b } else { a || b }))
            }
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt
            | BinaryOp::Ge => Some(ComptimeValue::Bool(Self::compare(op, &left, &right))),
        }
    }

    fn eval_additive(
        &mut self,
        op: BinaryOp,
        left: ComptimeValue,
        right: ComptimeValue,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<ComptimeValue> {
        match (left, right) {
            (ComptimeValue::Int(a), ComptimeValue::Int(b)) => {
                let (a, b) = (a as i128, b as i128);
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    _ => a * b,
                };
                self.bounded_int(result, expr, ectx)
            }
            (left, right) => {
                let a = Self::as_float(&left)?;
                let b = Self::as_float(&right)?;
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    _ => a * b,
                };
                self.finite_float(result, expr)
            }
        }
    }

    fn eval_division(
        &mut self,
        op: BinaryOp,
        left: ComptimeValue,
        right: ComptimeValue,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<ComptimeValue> {
        let zero = match &right {
            ComptimeValue::Int(v) => *v == 0,
            ComptimeValue::Float(v) => *v == 0.0,
            _ => false,
        };
        if zero {
            let what = if op == BinaryOp::Div { "division" } else { "modulo" };
            self.report(
                Diagnostic::new(DiagnosticCode::DivisionByZero, format!("{what} by zero"))
                    .with_target_span(expr.span),
            );
            return None;
        }

        match (left, right) {
            (ComptimeValue::Int(a), ComptimeValue::Int(b)) => {
                let (a, b) = (a as i128, b as i128);
                let result = if op == BinaryOp::Div { a / b } else { a % b };
                self.bounded_int(result, expr, ectx)
            }
            (left, right) => {
                let a = Self::as_float(&left)?;
                let b = Self::as_float(&right)?;
                let result = if op == BinaryOp::Div { a / b } else { a % b };
                self.finite_float(result, expr)
            }
        }
    }

    fn eval_power(
        &mut self,
        left: ComptimeValue,
        right: ComptimeValue,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<ComptimeValue> {
        let exponent = match &right {
            ComptimeValue::Int(v) => *v,
            ComptimeValue::Float(v) => *v as i64,
            _ => return None,
        };
        if exponent < 0 {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::NegativeExponent,
                    "negative exponents are not allowed at comptime",
                )
                .with_target_span(expr.span),
            );
            return None;
        }
        if exponent >= MAX_EXPONENT {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::ExponentTooLarge,
                    format!("exponent too large: {exponent} exceeds the comptime limit"),
                )
                .with_target_span(expr.span),
            );
            return None;
        }

        match left {
            ComptimeValue::Int(base) => {
                let result = (base as i128).checked_pow(exponent as u32);
                match result {
                    Some(value) => self.bounded_int(value, expr, ectx),
                    None => {
                        self.overflow(expr, ectx);
                        None
                    }
                }
            }
            ComptimeValue::Float(base) => self.finite_float(base.powi(exponent as i32), expr),
            _ => None,
        }
    }

    fn eval_shift(
        &mut self,
        op: BinaryOp,
        left: ComptimeValue,
        right: ComptimeValue,
        expr: &Expr,
    ) -> Option<ComptimeValue> {
        let (ComptimeValue::Int(value), ComptimeValue::Int(amount)) = (left, right) else {
            return None;
        };
        if !(0..=63).contains(&amount) {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::InvalidShiftAmount,
                    format!("shift amount {amount} must be between 0 and 63"),
                )
                .with_target_span(expr.span),
            );
            return None;
        }
        // shift cannot leave the 64-bit container by construction, so the
        // result is not range-re-checked
        let result = if op == BinaryOp::Shl {
            value.wrapping_shl(amount as u32)
        } else {
            value >> amount
        };
        Some(ComptimeValue::Int(result))
    }

    fn compare(op: BinaryOp, left: &ComptimeValue, right: &ComptimeValue) -> bool {
        use std::cmp::Ordering;
        let ordering = match (left, right) {
            (ComptimeValue::Int(a), ComptimeValue::Int(b)) => a.partial_cmp(b),
            (ComptimeValue::Float(a), ComptimeValue::Float(b)) => a.partial_cmp(b),
            (ComptimeValue::Bool(a), ComptimeValue::Bool(b)) => a.partial_cmp(b),
            (ComptimeValue::Null, ComptimeValue::Null) => Some(Ordering::Equal),
            _ => None,
        };
        match op {
            BinaryOp::Eq => ordering == Some(Ordering::Equal),
            BinaryOp::Ne => ordering != Some(Ordering::Equal),
            BinaryOp::Lt => ordering == Some(Ordering::Less),
            BinaryOp::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            BinaryOp::Gt => ordering == Some(Ordering::Greater),
            BinaryOp::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            _ => false,
        }
    }

    fn as_float(value: &ComptimeValue) -> Option<f64> {
        match value {
            ComptimeValue::Int(v) => Some(*v as f64),
            ComptimeValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn finite_float(&mut self, value: f64, expr: &Expr) -> Option<ComptimeValue> {
        if value.is_finite() {
            Some(ComptimeValue::Float(value))
        } else {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::NonFiniteFloat,
                    "comptime float result is not finite",
                )
                .with_target_span(expr.span),
            );
            None
        }
    }

    /// Clamp an i128 intermediate to the caller's working range
    fn bounded_int(
        &mut self,
        value: i128,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<ComptimeValue> {
        if value < ectx.min_int as i128 || value > ectx.max_int as i128 {
            self.overflow(expr, ectx);
            return None;
        }
        Some(ComptimeValue::Int(value as i64))
    }

    fn overflow(&mut self, expr: &Expr, ectx: &EvalContext<'_>) {
        self.report(
            Diagnostic::new(
                DiagnosticCode::ComptimeOverflow,
                format!(
                    "comptime integer result out of range ({}..{})",
                    ectx.min_int, ectx.max_int
                ),
            )
            .with_target_span(expr.span),
        );
    }

    /// Re-check a produced value against the target type's own bounds
    fn check_target(
        &mut self,
        value: &ComptimeValue,
        expr: &Expr,
        ectx: &EvalContext<'_>,
    ) -> Option<ComptimeValue> {
        let Some(target) = ectx.target_type else {
            return Some(value.clone());
        };
        let ComptimeValue::Int(v) = value else {
            return Some(value.clone());
        };
        let (min, max) = target_bounds(target);
        if (*v as i128) < min || (*v as i128) > max {
            self.report(
                Diagnostic::new(
                    DiagnosticCode::LiteralOverflow,
                    format!("value {v} does not fit in {target} ({min}..{max})"),
                )
                .with_target_span(expr.span),
            );
            return None;
        }
        Some(value.clone())
    }

    // ----- static type sizes -----

    /// Structural size (in bits) of a type; `None` when any component's
    /// size is unknown
    pub fn size_of(&mut self, ty: &TypeNode) -> Option<i64> {
        match &ty.kind {
            TypeKind::Primitive(p) => p.bit_width().map(i64::from),
            TypeKind::Pointer { .. } => Some(64),
            TypeKind::Optional(inner) => self.size_of(inner).map(|s| s + 1),
            TypeKind::Array { element, size } => {
                let count = self
                    .evaluate(size.as_deref()?, &EvalContext::ints_only())?
                    .as_int()?;
                let element = self.size_of(element)?;
                Some(element * count)
            }
            TypeKind::Tuple(items) => {
                let mut total = 0;
                for item in items {
                    total += self.size_of(item)?;
                }
                Some(total)
            }
            TypeKind::Struct(decl) => {
                let mut total = 0;
                for field in decl.fields.iter().filter(|f| !f.is_static) {
                    total += self.size_of(&field.ty)?;
                }
                Some(total)
            }
            TypeKind::Named(name) => {
                if !self.sizing.insert(name.clone()) {
                    return None;
                }
                let target = self.table.lookup_symbol(name).and_then(|s| s.ty.clone());
                let size = match target {
                    Some(target) => self.size_of(&target),
                    None => None,
                };
                self.sizing.remove(name);
                size
            }
            TypeKind::Enum(_)
            | TypeKind::ErrorSet(_)
            | TypeKind::Union(_)
            | TypeKind::Function { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PrimitiveType;
    use crate::common::Span;
    use crate::sema::scope::ScopeKind;
    use crate::sema::symbol::{DefineOpts, SymbolPayload};
    use pretty_assertions::assert_eq;

    struct Fixture {
        table: SymbolTable,
        diagnostics: DiagnosticCollector,
        ctx: AnalysisContext,
    }

    impl Fixture {
        fn new() -> Self {
            let mut table = SymbolTable::new();
            let module = table
                .create_scope(ScopeKind::Module, "test", None)
                .unwrap();
            table.enter_scope(module).unwrap();
            Self {
                table,
                diagnostics: DiagnosticCollector::new(),
                ctx: AnalysisContext::new(),
            }
        }

        fn eval(&mut self, expr: &Expr, ectx: &EvalContext<'_>) -> Option<ComptimeValue> {
            let mut evaluator =
                ComptimeEvaluator::new(&self.table, &mut self.diagnostics, &self.ctx);
            evaluator.evaluate(expr, ectx)
        }
    }

    fn span() -> Span {
        Span::new(0, 1)
    }

    fn int(text: &str) -> Expr {
        Expr::int(text, span())
    }

    #[test]
    fn test_one_plus_two() {
        let mut fx = Fixture::new();
        let expr = Expr::binary(BinaryOp::Add, int("1"), int("2"));
        assert_eq!(fx.eval(&expr, &EvalContext::default()), Some(ComptimeValue::Int(3)));
        assert!(fx.diagnostics.is_empty());
    }

    #[test]
    fn test_target_type_overflow_cites_range() {
        let mut fx = Fixture::new();
        let target = TypeNode::primitive(PrimitiveType::I8, span());
        let result = fx.eval(&int("200"), &EvalContext::with_target(&target));
        assert_eq!(result, None);

        let kept = fx.diagnostics.diagnostics();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].code, DiagnosticCode::LiteralOverflow);
        assert!(kept[0].message.contains("-128..127"), "{}", kept[0].message);
    }

    #[test]
    fn test_unsigned_target_bounds() {
        let mut fx = Fixture::new();
        let target = TypeNode::primitive(PrimitiveType::U8, span());
        assert_eq!(
            fx.eval(&int("255"), &EvalContext::with_target(&target)),
            Some(ComptimeValue::Int(255))
        );
        let negative = Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(int("1")),
            },
            span(),
        );
        assert_eq!(fx.eval(&negative, &EvalContext::with_target(&target)), None);
    }

    #[test]
    fn test_division_and_modulo_by_zero() {
        for op in [BinaryOp::Div, BinaryOp::Mod] {
            let mut fx = Fixture::new();
            let expr = Expr::binary(op, int("5"), int("0"));
            assert_eq!(fx.eval(&expr, &EvalContext::default()), None);
            let kept = fx.diagnostics.diagnostics();
            assert_eq!(kept.len(), 1);
            assert_eq!(kept[0].code, DiagnosticCode::DivisionByZero);
        }
    }

    #[test]
    fn test_exponent_too_large() {
        let mut fx = Fixture::new();
        let expr = Expr::binary(
            BinaryOp::Add,
            Expr::binary(BinaryOp::Pow, int("2"), int("10000")),
            int("1"),
        );
        assert_eq!(fx.eval(&expr, &EvalContext::default()), None);
        let kept = fx.diagnostics.diagnostics();
        assert_eq!(kept[0].code, DiagnosticCode::ExponentTooLarge);
    }

    #[test]
    fn test_negative_exponent() {
        let mut fx = Fixture::new();
        let neg = Expr::new(
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(int("2")),
            },
            span(),
        );
        let expr = Expr::binary(BinaryOp::Pow, int("2"), neg);
        assert_eq!(fx.eval(&expr, &EvalContext::default()), None);
        assert_eq!(
            fx.diagnostics.diagnostics()[0].code,
            DiagnosticCode::NegativeExponent
        );
    }

    #[test]
    fn test_shift_amount_rejected() {
        let mut fx = Fixture::new();
        let expr = Expr::binary(BinaryOp::Shl, int("1"), int("64"));
        assert_eq!(fx.eval(&expr, &EvalContext::default()), None);
        assert_eq!(
            fx.diagnostics.diagnostics()[0].code,
            DiagnosticCode::InvalidShiftAmount
        );
    }

    #[test]
    fn test_evaluation_is_pure() {
        let mut fx = Fixture::new();
        let target = TypeNode::primitive(PrimitiveType::I8, span());
        let expr = Expr::binary(BinaryOp::Mul, int("100"), int("2"));

        let first = fx.eval(&expr, &EvalContext::with_target(&target));
        assert_eq!(first, None);
        assert_eq!(fx.diagnostics.raw_count(), 1);
        let second = fx.eval(&expr, &EvalContext::with_target(&target));
        assert_eq!(second, None);
        // same diagnostic again, nothing extra, nothing different
        assert_eq!(fx.diagnostics.raw_count(), 2);
        let kept = fx.diagnostics.diagnostics();
        assert!(kept.iter().all(|d| d.code == DiagnosticCode::LiteralOverflow));
    }

    #[test]
    fn test_bool_operand_rejected_in_arithmetic() {
        let mut fx = Fixture::new();
        let expr = Expr::binary(BinaryOp::Add, Expr::boolean(true, span()), int("1"));
        assert_eq!(fx.eval(&expr, &EvalContext::default()), None);
        assert_eq!(
            fx.diagnostics.diagnostics()[0].code,
            DiagnosticCode::BooleanOperandNotAllowed
        );
    }

    #[test]
    fn test_constant_identifier_inlined() {
        let mut fx = Fixture::new();
        fx.table.define_symbol(
            "WIDTH",
            SymbolKind::Definition,
            DefineOpts {
                payload: SymbolPayload::Const {
                    initializer: Box::new(int("320")),
                },
                initialized: true,
                ..DefineOpts::default()
            },
        );

        let expr = Expr::binary(BinaryOp::Mul, Expr::ident("WIDTH", span()), int("2"));
        assert_eq!(fx.eval(&expr, &EvalContext::default()), Some(ComptimeValue::Int(640)));
    }

    #[test]
    fn test_constant_cycle_guard() {
        let mut fx = Fixture::new();
        fx.table.define_symbol(
            "A",
            SymbolKind::Definition,
            DefineOpts {
                payload: SymbolPayload::Const {
                    initializer: Box::new(Expr::ident("B", span())),
                },
                ..DefineOpts::default()
            },
        );
        fx.table.define_symbol(
            "B",
            SymbolKind::Definition,
            DefineOpts {
                payload: SymbolPayload::Const {
                    initializer: Box::new(Expr::ident("A", span())),
                },
                ..DefineOpts::default()
            },
        );

        assert_eq!(fx.eval(&Expr::ident("A", span()), &EvalContext::default()), None);
        let kept = fx.diagnostics.diagnostics();
        assert_eq!(kept[0].code, DiagnosticCode::RecursiveConstant);
    }

    #[test]
    fn test_size_of_structures() {
        let mut fx = Fixture::new();
        let mut evaluator =
            ComptimeEvaluator::new(&fx.table, &mut fx.diagnostics, &fx.ctx);

        let b = TypeNode::bool(span());
        assert_eq!(evaluator.size_of(&b), Some(1));
        assert_eq!(evaluator.size_of(&TypeNode::void(span())), Some(0));
        assert_eq!(
            evaluator.size_of(&TypeNode::pointer(TypeNode::bool(span()), false)),
            Some(64)
        );
        // optional adds one tag bit
        assert_eq!(
            evaluator.size_of(&TypeNode::optional(TypeNode::primitive(
                PrimitiveType::I32,
                span()
            ))),
            Some(33)
        );

        let array = TypeNode::new(
            TypeKind::Array {
                element: Box::new(TypeNode::primitive(PrimitiveType::U8, span())),
                size: Some(Box::new(int("4"))),
            },
            span(),
        );
        assert_eq!(evaluator.size_of(&array), Some(32));

        let unsized_array = TypeNode::new(
            TypeKind::Array {
                element: Box::new(TypeNode::primitive(PrimitiveType::U8, span())),
                size: None,
            },
            span(),
        );
        assert_eq!(evaluator.size_of(&unsized_array), None);
    }

    #[test]
    fn test_size_of_self_referential_type_is_unknown() {
        use crate::ast::{StructDecl, StructFieldDecl};

        let mut fx = Fixture::new();
        let node_ty = TypeNode::new(
            TypeKind::Struct(StructDecl {
                name: "Node".to_string(),
                fields: vec![StructFieldDecl {
                    name: "next".to_string(),
                    ty: TypeNode::optional(TypeNode::named("Node", span())),
                    is_static: false,
                    default: None,
                    span: span(),
                }],
                methods: Vec::new(),
            }),
            span(),
        );
        fx.table.define_symbol(
            "Node",
            SymbolKind::Definition,
            DefineOpts {
                ty: Some(node_ty),
                initialized: true,
                ..DefineOpts::default()
            },
        );

        let mut evaluator =
            ComptimeEvaluator::new(&fx.table, &mut fx.diagnostics, &fx.ctx);
        assert_eq!(evaluator.size_of(&TypeNode::named("Node", span())), None);
        assert!(fx.diagnostics.is_empty());
    }
}
