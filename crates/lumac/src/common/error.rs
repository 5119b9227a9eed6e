//! Internal error types for the analysis core
//!
//! These are programmer-error conditions (broken referential integrity,
//! unexpected analysis state), not user-facing diagnostics. The validator catches them at statement and module
//! boundaries and rewrites them into INTERNAL_ERROR / ANALYSIS_ERROR
//! diagnostics so a single malformed module cannot abort a pass.

use super::Span;
use thiserror::Error;

/// Internal fault raised by the analysis core
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("analysis error at {span:?}: {message}")]
    Analysis { message: String, span: Span },

    #[error("unknown scope id {0}")]
    UnknownScope(u32),

    #[error("unknown symbol id {0}")]
    UnknownSymbol(u32),
}

impl CompileError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn analysis(message: impl Into<String>, span: Span) -> Self {
        Self::Analysis {
            message: message.into(),
            span,
        }
    }

}

pub type CompileResult<T> = Result<T, CompileError>;
