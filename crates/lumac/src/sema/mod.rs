//! Luma semantic analysis
//!
//! Four tightly coupled subsystems: the scope & symbol table, the
//! compile-time evaluator, the type validator, and the diagnostic
//! collector. The validator drives the other three.

pub mod context;
pub mod diagnostics;
pub mod eval;
pub mod scope;
pub mod symbol;
pub mod validator;

pub use context::{AnalysisContext, AnalysisPhase};
pub use diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector, Severity};
pub use eval::{ComptimeEvaluator, ComptimeValue, EvalContext};
pub use scope::{ScopeId, ScopeKind, SymbolTable};
pub use symbol::{Mutability, Symbol, SymbolId, SymbolKind, SymbolPayload, Visibility};
pub use validator::TypeValidator;
