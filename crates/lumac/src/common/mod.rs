//! Common infrastructure shared across the analysis core

mod error;
mod ids;
mod report;
mod span;

pub use error::{CompileError, CompileResult};
pub use ids::IdGen;
pub use report::DiagnosticReporter;
pub use span::Span;
