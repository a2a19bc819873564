//! Error handling for the parse and composition layers.
//!
//! The rewriter core is total over well-formed trees and never constructs an
//! error; everything here belongs to the boundary around it. A single
//! [`LucidError`] type carries what went wrong, where in the source it
//! happened, and a stable diagnostic code, and renders through miette.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};

use crate::syntax::EcmaVersion;

/// The single error type: kind plus source location plus diagnostic extras.
#[derive(Debug)]
pub struct LucidError {
    pub kind: ErrorKind,
    pub source_info: SourceInfo,
    pub diagnostic_info: DiagnosticInfo,
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The grammar rejected the input outright.
    UnexpectedSyntax { detail: String },
    /// The construct exists, but not in the selected grammar revision.
    UnsupportedFeature {
        feature: String,
        version: EcmaVersion,
    },
    /// A literal that matched the grammar but failed value conversion.
    InvalidLiteral { literal_type: String, value: String },
    /// Assignment to something that is not an identifier or member.
    InvalidAssignmentTarget,
    /// A construct the lowering could not give a shape to.
    MalformedConstruct { construct: String },
}

/// Where it happened.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
}

/// How to help.
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

impl LucidError {
    /// Build an error against a named source text.
    pub fn new(
        kind: ErrorKind,
        source_name: impl Into<String>,
        source_text: impl Into<String>,
        span: SourceSpan,
    ) -> Self {
        let name: String = source_name.into();
        let text: String = source_text.into();
        let error_code = format!("lucid::parse::{}", kind.code_suffix());
        let help = kind.default_help();
        LucidError {
            kind,
            source_info: SourceInfo {
                source: Arc::new(NamedSource::new(name, text)),
                primary_span: span,
            },
            diagnostic_info: DiagnosticInfo { help, error_code },
        }
    }

    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::UnexpectedSyntax { .. } => "unexpected syntax".into(),
            ErrorKind::UnsupportedFeature { .. } => "not in this grammar revision".into(),
            ErrorKind::InvalidLiteral { .. } => "invalid literal".into(),
            ErrorKind::InvalidAssignmentTarget => "cannot assign to this".into(),
            ErrorKind::MalformedConstruct { .. } => "malformed syntax".into(),
        }
    }
}

impl ErrorKind {
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::UnexpectedSyntax { .. } => "unexpected_syntax",
            Self::UnsupportedFeature { .. } => "unsupported_feature",
            Self::InvalidLiteral { .. } => "invalid_literal",
            Self::InvalidAssignmentTarget => "invalid_assignment_target",
            Self::MalformedConstruct { .. } => "malformed_construct",
        }
    }

    fn default_help(&self) -> Option<String> {
        match self {
            Self::UnsupportedFeature { version, .. } => Some(format!(
                "the input was parsed as {}; select a newer grammar revision",
                version
            )),
            Self::InvalidAssignmentTarget => {
                Some("only identifiers and member expressions can be assigned to".into())
            }
            _ => None,
        }
    }
}

impl std::error::Error for LucidError {}

impl fmt::Display for LucidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::UnexpectedSyntax { detail } => {
                write!(f, "Parse error: {}", detail)
            }
            ErrorKind::UnsupportedFeature { feature, version } => {
                write!(f, "Parse error: {} is not available in {}", feature, version)
            }
            ErrorKind::InvalidLiteral {
                literal_type,
                value,
            } => {
                write!(f, "Parse error: invalid {} '{}'", literal_type, value)
            }
            ErrorKind::InvalidAssignmentTarget => {
                write!(f, "Parse error: invalid assignment target")
            }
            ErrorKind::MalformedConstruct { construct } => {
                write!(f, "Parse error: malformed {}", construct)
            }
        }
    }
}

impl Diagnostic for LucidError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

/// Prints a [`LucidError`] with full miette diagnostics to stderr.
pub fn print_error(error: LucidError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}
