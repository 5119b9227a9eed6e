//! Pretty terminal rendering of analysis diagnostics

use crate::sema::diagnostics::{Diagnostic as SemaDiagnostic, Severity};
use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

/// Diagnostic reporter for pretty error output
pub struct DiagnosticReporter {
    files: SimpleFiles<String, String>,
    writer: StandardStream,
    config: term::Config,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
            writer: StandardStream::stderr(ColorChoice::Auto),
            config: term::Config::default(),
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, source: impl Into<String>) -> usize {
        self.files.add(name.into(), source.into())
    }

    /// Emit one analysis diagnostic against a registered file
    pub fn report(&self, file_id: usize, diagnostic: &SemaDiagnostic) {
        let rendered = match diagnostic.severity {
            Severity::Error => Diagnostic::error(),
            Severity::Warning => Diagnostic::warning(),
            Severity::Info => Diagnostic::note(),
        };

        let mut labels = Vec::new();
        if let Some(span) = diagnostic.target_span {
            labels.push(Label::primary(file_id, span.start..span.end).with_message(&diagnostic.message));
        }
        if let Some(span) = diagnostic.context_span {
            labels.push(Label::secondary(file_id, span.start..span.end).with_message("in this context"));
        }

        let rendered = rendered
            .with_message(format!("{:?}: {}", diagnostic.code, diagnostic.message))
            .with_labels(labels)
            .with_notes(diagnostic.fixes.clone());

        let _ = term::emit(&mut self.writer.lock(), &self.config, &self.files, &rendered);
    }

    /// Emit a whole (already deduplicated) diagnostic list
    pub fn report_all(&self, file_id: usize, diagnostics: &[SemaDiagnostic]) {
        for diagnostic in diagnostics {
            self.report(file_id, diagnostic);
        }
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}
