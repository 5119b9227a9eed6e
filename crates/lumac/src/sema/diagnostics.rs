//! Diagnostic collection, deduplication and ranking
//!
//! Diagnostics are appended during a pass and read through a de-noised
//! view: overlapping findings that describe the same underlying issue are
//! collapsed to the single most specific one, so a cascade like
//! "undefined identifier" → "type inference failed" reaches the user as
//! one message instead of three.

use crate::common::Span;
use crate::sema::context::AnalysisContext;

/// Diagnostic severity, ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Every finding the analysis core can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // internal faults
    InternalError,
    AnalysisError,
    ParserError,

    // resolution failures
    SymbolNotFound,
    ModuleNotFound,
    TypeNotFound,
    SymbolNotExported,
    SymbolNotAccessible,
    UndefinedIdentifier,
    UndefinedBuiltin,
    UndefinedFunction,
    UndefinedType,
    UsedBeforeDeclared,
    UsedBeforeInitialized,

    // type-system violations
    TypeMismatch,
    CallTypeMismatch,
    AssignmentTypeMismatch,
    ReturnTypeMismatch,
    ParameterTypeMismatch,
    FieldTypeMismatch,
    ArrayElementMismatch,
    ConditionNotBool,
    LiteralOverflow,
    CannotInferType,
    TypeInferenceFailed,
    CannotIndexType,
    NotCallable,
    ArgumentCountMismatch,
    UnknownField,
    MissingField,
    DuplicateField,
    TupleArityMismatch,
    VoidValueUsed,
    NotAType,
    NotAValue,
    InvalidMemberAccess,
    UnknownEnumVariant,
    StructNameMismatch,
    DefaultValueTypeMismatch,
    InvalidAssignmentTarget,
    MissingReturn,

    // error-handling specific
    ThrowWithoutErrorType,
    ThrowTypeMismatch,
    ThrowOutsideFunction,
    InvalidErrorType,
    ErrorMemberNotFound,

    // mutability / visibility / static access
    MutabilityMismatch,
    PointerMutabilityMismatch,
    InvalidVisibility,
    InvalidStaticAccess,
    InstanceAccessInStatic,
    StaticFieldInConstructor,
    SelfOutsideMethod,

    // arithmetic
    DivisionByZero,
    ModuloByZero,
    InvalidShiftAmount,
    ArithmeticOverflow,
    ComptimeOverflow,
    PrecisionLoss,
    NegativeExponent,
    ExponentTooLarge,
    NonFiniteFloat,
    FloatNotAllowed,
    InvalidOperandType,
    BooleanOperandNotAllowed,
    NullOperandNotAllowed,
    IncompatibleOperands,
    RecursiveConstant,

    // structural
    DuplicateSymbol,
    ShadowedVariable,
    ShadowedParameter,
    ShadowedFunction,
    UnusedVariable,
    UnusedParameter,
    UnusedFunction,
    ArraySizeMismatch,
    InvalidArraySize,
    ArraySizeNotComptime,
    ArraySizeTooLarge,
    CircularTypeDependency,
    TypeNestingTooDeep,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    ReturnOutsideFunction,

    // import system
    ImportNotFound,
    CircularImport,
    PrivateSymbolImport,
}

impl DiagnosticCode {
    /// Default severity for the code
    pub fn severity(self) -> Severity {
        use DiagnosticCode::*;
        match self {
            UnusedVariable | UnusedParameter | UnusedFunction | ShadowedVariable
            | ShadowedParameter | ShadowedFunction | DuplicateSymbol | PrecisionLoss => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    /// Specificity priority used when two diagnostics merge; higher wins.
    /// Unlisted codes sit at the 50 midpoint.
    pub fn priority(self) -> u8 {
        use DiagnosticCode::*;
        match self {
            UndefinedIdentifier => 100,
            SymbolNotFound => 95,
            ModuleNotFound | ImportNotFound => 90,
            UsedBeforeDeclared => 85,
            UsedBeforeInitialized => 80,
            MutabilityMismatch | PointerMutabilityMismatch => 75,
            UndefinedFunction | UndefinedType | UndefinedBuiltin => 72,
            TypeMismatch => 70,
            ThrowWithoutErrorType | ThrowTypeMismatch => 65,
            DivisionByZero | ModuloByZero => 60,
            ArithmeticOverflow | LiteralOverflow | ComptimeOverflow => 55,
            CannotInferType => 30,
            TypeInferenceFailed => 20,
            AnalysisError => 15,
            InternalError => 10,
            _ => 50,
        }
    }

    /// Codes that are never merged with each other, even at identical
    /// spans: each occurrence is an independent user-facing problem
    pub fn is_always_distinct(self) -> bool {
        use DiagnosticCode::*;
        matches!(
            self,
            ModuleNotFound
                | TypeMismatch
                | SymbolNotFound
                | UsedBeforeDeclared
                | UsedBeforeInitialized
                | MutabilityMismatch
        )
    }

    /// The duplicate/shadowing warning family
    pub fn is_shadowing_family(self) -> bool {
        use DiagnosticCode::*;
        matches!(
            self,
            DuplicateSymbol | ShadowedVariable | ShadowedParameter | ShadowedFunction
        )
    }

    /// The type-error family merged on identical context spans
    pub fn is_type_error_family(self) -> bool {
        use DiagnosticCode::*;
        matches!(
            self,
            TypeMismatch | ArithmeticOverflow | LiteralOverflow | CannotInferType
        )
    }
}

/// Known root-cause → cascade pairs: when both appear over overlapping
/// spans, the cascade is the same issue as its root
const CASCADE_PAIRS: &[(DiagnosticCode, DiagnosticCode)] = &[
    (DiagnosticCode::UndefinedIdentifier, DiagnosticCode::TypeInferenceFailed),
    (DiagnosticCode::UndefinedIdentifier, DiagnosticCode::CannotInferType),
    (DiagnosticCode::UndefinedFunction, DiagnosticCode::TypeInferenceFailed),
    (DiagnosticCode::UndefinedType, DiagnosticCode::TypeInferenceFailed),
    (DiagnosticCode::TypeNotFound, DiagnosticCode::CannotInferType),
    (DiagnosticCode::UndefinedIdentifier, DiagnosticCode::NotCallable),
    (DiagnosticCode::CircularTypeDependency, DiagnosticCode::TypeInferenceFailed),
    (DiagnosticCode::RecursiveConstant, DiagnosticCode::ArraySizeNotComptime),
];

/// A structured analysis finding
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub context_span: Option<Span>,
    pub target_span: Option<Span>,
    pub message: String,
    /// Identifier this finding is about, carried structurally so the
    /// deduplicator does not have to mine it out of the message text
    pub subject: Option<String>,
    pub fixes: Vec<String>,
    pub source_module_name: Option<String>,
    pub source_module_path: Option<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            context_span: None,
            target_span: None,
            message: message.into(),
            subject: None,
            fixes: Vec::new(),
            source_module_name: None,
            source_module_path: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_target_span(mut self, span: Span) -> Self {
        self.target_span = Some(span);
        self
    }

    pub fn with_context_span(mut self, span: Span) -> Self {
        self.context_span = Some(span);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fixes.push(fix.into());
        self
    }

    /// Identifier the diagnostic is about: the structured subject when
    /// present, else the first quoted name in the message
    fn subject_identifier(&self) -> Option<&str> {
        if let Some(subject) = &self.subject {
            return Some(subject);
        }
        extract_quoted(&self.message)
    }
}

/// First `'name'`-quoted identifier in a message, the legacy fallback for
/// subject matching
fn extract_quoted(message: &str) -> Option<&str> {
    let start = message.find('\'')?;
    let rest = &message[start + 1..];
    let end = rest.find('\'')?;
    let name = &rest[..end];
    if name.is_empty() { None } else { Some(name) }
}

/// Key a kept diagnostic is retained under: its target span, or a single
/// sentinel bucket for untargeted diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetainKey {
    Target(usize, usize),
    NoTarget,
}

fn retain_key(diagnostic: &Diagnostic) -> RetainKey {
    match diagnostic.target_span {
        Some(span) => RetainKey::Target(span.start, span.end),
        None => RetainKey::NoTarget,
    }
}

/// Append-only diagnostic sink with a deduplicating read side
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    entries: Vec<Diagnostic>,
    strict: bool,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// In strict mode, once any diagnostic exists, later Error-severity
    /// pushes are dropped; Warning/Info always get through. First error
    /// wins. Kept as observed behavior, not to be "fixed".
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Append a diagnostic, back-filling module and context-span fields
    /// from the ambient context when the reporting site omitted them
    pub fn push(&mut self, mut diagnostic: Diagnostic, ctx: &AnalysisContext) {
        if diagnostic.source_module_name.is_none() {
            diagnostic.source_module_name = ctx.module_name().map(str::to_string);
        }
        if diagnostic.source_module_path.is_none() {
            diagnostic.source_module_path = ctx.module_path().map(str::to_string);
        }
        if diagnostic.context_span.is_none() {
            diagnostic.context_span = ctx.current_span();
        }

        if self.strict && diagnostic.severity == Severity::Error && !self.entries.is_empty() {
            return;
        }
        self.entries.push(diagnostic);
    }

    /// Raw count before deduplication; feeds pass statistics only
    pub fn raw_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` if the deduplicated view still contains an error
    pub fn has_errors(&self) -> bool {
        self.diagnostics()
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// The deduplicated, ranked view
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut kept: Vec<(RetainKey, Diagnostic)> = Vec::new();

        for candidate in &self.entries {
            if let Some(slot) = kept
                .iter_mut()
                .find(|(_, existing)| same_issue(existing, candidate))
            {
                // keep the more specific one under the retained key
                if specificity_beats(candidate, &slot.1) {
                    slot.1 = candidate.clone();
                }
                continue;
            }

            let key = retain_key(candidate);
            if let Some(slot) = kept.iter_mut().find(|(k, _)| *k == key) {
                if specificity_beats(candidate, &slot.1) {
                    slot.1 = candidate.clone();
                }
            } else {
                kept.push((key, candidate.clone()));
            }
        }

        kept.into_iter().map(|(_, d)| d).collect()
    }
}

/// The "same underlying issue" predicate, evaluated in documented order
fn same_issue(a: &Diagnostic, b: &Diagnostic) -> bool {
    // 1. always-distinct codes never merge, even at identical spans
    if a.code.is_always_distinct() && b.code.is_always_distinct() {
        return false;
    }

    // 2. overlapping target spans
    if let (Some(span_a), Some(span_b)) = (a.target_span, b.target_span) {
        if span_a.overlaps(span_b) {
            if CASCADE_PAIRS
                .iter()
                .any(|&(root, cascade)| {
                    (a.code == root && b.code == cascade) || (b.code == root && a.code == cascade)
                })
            {
                return true;
            }
            // diagnostics about two different named subjects are two
            // different problems, overlap or not
            if let (Some(subj_a), Some(subj_b)) = (a.subject_identifier(), b.subject_identifier()) {
                return subj_a == subj_b;
            }
            if a.code.is_shadowing_family() && b.code.is_shadowing_family() {
                return true;
            }
            // default: overlap alone is enough
            return true;
        }
    }

    // 3. identical non-empty context span within the type-error family
    if let (Some(ctx_a), Some(ctx_b)) = (a.context_span, b.context_span) {
        if ctx_a == ctx_b
            && !ctx_a.is_empty()
            && a.code.is_type_error_family()
            && b.code.is_type_error_family()
        {
            return true;
        }
    }

    false
}

fn severity_rank(severity: Severity) -> u8 {
    match severity {
        Severity::Error => 2,
        Severity::Warning => 1,
        Severity::Info => 0,
    }
}

/// `true` if `challenger` is more specific than `incumbent`
fn specificity_beats(challenger: &Diagnostic, incumbent: &Diagnostic) -> bool {
    let by_priority = challenger.code.priority().cmp(&incumbent.code.priority());
    if by_priority != std::cmp::Ordering::Equal {
        return by_priority == std::cmp::Ordering::Greater;
    }

    // message length is a proxy for contextual detail
    let by_message = challenger.message.len().cmp(&incumbent.message.len());
    if by_message != std::cmp::Ordering::Equal {
        return by_message == std::cmp::Ordering::Greater;
    }

    let width = |d: &Diagnostic| d.target_span.map_or(0, |s| s.len());
    let by_width = width(challenger).cmp(&width(incumbent));
    if by_width != std::cmp::Ordering::Equal {
        return by_width == std::cmp::Ordering::Greater;
    }

    severity_rank(challenger.severity) > severity_rank(incumbent.severity)
}
