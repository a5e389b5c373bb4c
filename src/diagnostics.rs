use crate::{
    language::{span::Span, typecheck},
    project::{FileErrors, LoadedProgram, SourceText},
};
use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct SyntaxDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("{label}")]
    span: SourceSpan,
    #[help]
    help: Option<String>,
    message: String,
    label: String,
}

pub fn emit_syntax_errors(errors: &[FileErrors]) {
    for file in errors {
        let src = NamedSource::new(file.path.display().to_string(), file.source.clone());
        for err in &file.errors {
            let diagnostic = SyntaxDiagnostic {
                src: src.clone(),
                span: err.to_source_span(),
                help: err.help.clone(),
                message: err.message.clone(),
                label: err.label.clone(),
            };
            eprintln!("{:?}", Report::new(diagnostic));
        }
    }
}

#[derive(Debug, Error, Diagnostic, Clone)]
#[error("{message}")]
pub struct TypeDiagnostic {
    #[source_code]
    src: NamedSource<String>,
    #[label("here")]
    span: SourceSpan,
    message: String,
    #[help]
    help: Option<String>,
}

impl TypeDiagnostic {
    pub fn new(text: &SourceText, diagnostic: &typecheck::Diagnostic) -> Self {
        Self {
            src: NamedSource::new(text.path.display().to_string(), text.source.clone()),
            span: span_to_source_span(diagnostic.location.span),
            message: diagnostic.kind.to_string(),
            help: diagnostic.kind.help().map(str::to_string),
        }
    }
}

pub fn emit_type_errors(diagnostics: &[typecheck::Diagnostic], program: &LoadedProgram) {
    for diagnostic in diagnostics {
        match program.source(diagnostic.location.file) {
            Some(text) => eprintln!("{:?}", Report::new(TypeDiagnostic::new(text, diagnostic))),
            None => eprintln!("type error at {} - {}", diagnostic.location, diagnostic.kind),
        }
    }
}

pub fn report_internal_error(error: &typecheck::InternalError) {
    eprintln!("internal compiler error: {error}");
}

pub fn report_io_error(path: &Path, error: &std::io::Error) {
    eprintln!("Failed to access {}: {}", path.display(), error);
}

fn span_to_source_span(span: Span) -> SourceSpan {
    SourceSpan::from((span.start, span.end.saturating_sub(span.start)))
}
