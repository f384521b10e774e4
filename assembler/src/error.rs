use std::io;
use std::ops::Range;

use annotate_snippets::display_list::{DisplayList, FormatOptions};
use annotate_snippets::snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation};
use thiserror::Error;

use crate::analysis::symbol_table::MAX_SYMBOL_LEN;
use crate::parser::MAX_OPERANDS;

pub type Span = Range<usize>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot read instruction catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("catalog line {line}: expected `name format opcode operand-count`, found {text:?}")]
    Malformed { line: usize, text: String },
    #[error("catalog line {line}: unsupported instruction format {format:?}")]
    BadFormat { line: usize, format: String },
    #[error("catalog line {line}: invalid opcode {opcode:?}")]
    BadOpcode { line: usize, opcode: String },
}

/// Failures that abort pass 1. Every variant knows the line it came from
/// and the byte range of the offending text within that line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: {found} operands given, at most {max} are allowed", max = MAX_OPERANDS)]
    TooManyOperands { line: usize, found: usize, span: Span },
    #[error("line {line}: label `{label}` is longer than {max} characters", max = MAX_SYMBOL_LEN)]
    LabelTooLong { line: usize, label: String, span: Span },
    #[error("line {line}: label `{label}` is already defined in this block")]
    DuplicateLabel { line: usize, label: String, span: Span },
    #[error("line {line}: malformed constant `{text}`")]
    MalformedConstant { line: usize, text: String, span: Span },
    #[error("line {line}: location counter {location:#X} is outside the address space")]
    AddressOverflow { line: usize, location: u64, span: Span },
}

impl ParseError {
    pub fn line(&self) -> usize {
        use ParseError::*;
        match self {
            TooManyOperands { line, .. }
            | LabelTooLong { line, .. }
            | DuplicateLabel { line, .. }
            | MalformedConstant { line, .. }
            | AddressOverflow { line, .. } => *line,
        }
    }

    pub fn span(&self) -> Span {
        use ParseError::*;
        match self {
            TooManyOperands { span, .. }
            | LabelTooLong { span, .. }
            | DuplicateLabel { span, .. }
            | MalformedConstant { span, .. }
            | AddressOverflow { span, .. } => span.clone(),
        }
    }

    fn annotation_label(&self) -> &'static str {
        use ParseError::*;
        match self {
            TooManyOperands { .. } => "operand list here",
            LabelTooLong { .. } => "label here",
            DuplicateLabel { .. } => "redefined here",
            MalformedConstant { .. } => "constant here",
            AddressOverflow { .. } => "statement here",
        }
    }

    /// Renders the error as an annotated excerpt of `source`, the full text
    /// the error was produced from.
    pub fn render(&self, source: &str, origin: Option<&str>, color: bool) -> String {
        let message = self.to_string();
        let line_text = source.lines().nth(self.line().saturating_sub(1)).unwrap_or("");

        let span = self.span();
        let end = span.end.min(line_text.len());
        let start = span.start.min(end);

        let mut annotations = Vec::new();
        if start < end {
            annotations.push(SourceAnnotation {
                range: (start, end),
                label: self.annotation_label(),
                annotation_type: AnnotationType::Error,
            });
        }

        let snippet = Snippet {
            title: Some(Annotation {
                label: Some(&message),
                id: None,
                annotation_type: AnnotationType::Error,
            }),
            footer: vec![],
            slices: vec![Slice {
                source: line_text,
                line_start: self.line(),
                origin,
                fold: false,
                annotations,
            }],
            opt: FormatOptions {
                color,
                ..Default::default()
            },
        };
        DisplayList::from(snippet).to_string()
    }
}

#[derive(Debug, Error)]
#[error("cannot write {destination}: {source}")]
pub struct OutputError {
    pub destination: String,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("cannot read source {path}: {source}")]
    Source {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Output(#[from] OutputError),
}
