//! Ambient analysis context
//!
//! Tracks the mutable cursors the walk threads through every recursive
//! call: the context-span stack, the current module, the current scope id
//! and the analysis phase. The diagnostic collector reads this state to
//! back-fill locations the reporting site omitted. `snapshot`/`restore`
//! bracket nested module validation so a failing sub-walk cannot leave a
//! stale cursor behind.

use crate::common::Span;
use crate::sema::scope::ScopeId;

/// Which stage of the pass is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisPhase {
    #[default]
    Idle,
    Collecting,
    Validating,
    Finishing,
}

/// Saved cursor state, restored after a nested operation
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    module_name: Option<String>,
    module_path: Option<String>,
    span_stack_len: usize,
    scope: ScopeId,
    phase: AnalysisPhase,
}

/// The ambient tracker shared by the validator, evaluator and collector
#[derive(Debug, Default)]
pub struct AnalysisContext {
    module_name: Option<String>,
    module_path: Option<String>,
    span_stack: Vec<Span>,
    scope: ScopeId,
    phase: AnalysisPhase,
}

impl AnalysisContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_span(&mut self, span: Span) {
        self.span_stack.push(span);
    }

    pub fn pop_span(&mut self) -> Option<Span> {
        self.span_stack.pop()
    }

    /// Innermost context span, if any statement is being validated
    pub fn current_span(&self) -> Option<Span> {
        self.span_stack.last().copied()
    }

    pub fn set_module(&mut self, name: impl Into<String>, path: impl Into<String>) {
        self.module_name = Some(name.into());
        self.module_path = Some(path.into());
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    pub fn module_path(&self) -> Option<&str> {
        self.module_path.as_deref()
    }

    pub fn set_scope(&mut self, scope: ScopeId) {
        self.scope = scope;
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn set_phase(&mut self, phase: AnalysisPhase) {
        self.phase = phase;
    }

    pub fn phase(&self) -> AnalysisPhase {
        self.phase
    }

    /// Capture every cursor for a later `restore`
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            module_name: self.module_name.clone(),
            module_path: self.module_path.clone(),
            span_stack_len: self.span_stack.len(),
            scope: self.scope,
            phase: self.phase,
        }
    }

    /// Restore a snapshot, truncating any spans pushed since it was taken
    pub fn restore(&mut self, snapshot: ContextSnapshot) {
        self.module_name = snapshot.module_name;
        self.module_path = snapshot.module_path;
        self.span_stack.truncate(snapshot.span_stack_len);
        self.scope = snapshot.scope;
        self.phase = snapshot.phase;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_restore() {
        let mut ctx = AnalysisContext::new();
        ctx.set_module("main", "src/main.lm");
        ctx.push_span(Span::new(0, 10));
        let snap = ctx.snapshot();

        ctx.set_module("other", "src/other.lm");
        ctx.push_span(Span::new(20, 30));
        ctx.push_span(Span::new(25, 28));
        ctx.set_scope(ScopeId(7));

        ctx.restore(snap);
        assert_eq!(ctx.module_name(), Some("main"));
        assert_eq!(ctx.current_span(), Some(Span::new(0, 10)));
        assert_eq!(ctx.scope(), ScopeId::ROOT);
    }
}
