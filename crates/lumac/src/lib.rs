//! Luma semantic analysis core
//!
//! This library implements the semantic-analysis stage of the Luma
//! compiler: scope and symbol management, compile-time evaluation of
//! constant expressions, type validation, and diagnostic collection.
//!
//! ## Architecture
//!
//! The crate is organized into:
//! - **AST** (`ast/`): The node contract the analysis consumes (parsing
//!   lives upstream)
//! - **Sema** (`sema/`): Symbol table, comptime evaluator, type
//!   validator and diagnostics
//! - **Common** (`common/`): Shared infrastructure (errors, spans, id
//!   generation, terminal reporting)

pub mod ast;
pub mod common;
pub mod sema;

// Re-exports for convenience
pub use common::{CompileError, CompileResult, DiagnosticReporter, Span};
pub use sema::{
    AnalysisContext, ComptimeEvaluator, ComptimeValue, Diagnostic, DiagnosticCode,
    DiagnosticCollector, Severity, SymbolTable, TypeValidator,
};
