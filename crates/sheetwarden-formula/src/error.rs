//! Formula error types

use std::fmt;

use thiserror::Error;

use crate::policy::FunctionCategory;
use crate::validator::FormulaClass;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Which complexity bound a formula exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexityLimit {
    /// Characters in the formula body
    Length,
    /// Lexical tokens
    Tokens,
    /// Parenthesis nesting depth
    Depth,
}

impl fmt::Display for ComplexityLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComplexityLimit::Length => "length",
            ComplexityLimit::Tokens => "token count",
            ComplexityLimit::Depth => "nesting depth",
        })
    }
}

/// Kind of external link found in a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// `[Book.xlsx]Sheet!A1` or a path-qualified quoted sheet name
    Workbook,
    /// `http://`, `https://`, `ftp://` or `file://`
    Url,
    /// `\\server\share`
    Unc,
    /// `app|topic!item`
    Dde,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkKind::Workbook => "external workbook reference",
            LinkKind::Url => "URL",
            LinkKind::Unc => "UNC path",
            LinkKind::Dde => "DDE link",
        })
    }
}

/// Errors that can occur while validating a formula
#[derive(Debug, Error)]
pub enum FormulaError {
    /// Nothing after the leading `=`
    #[error("Formula is empty")]
    Empty,

    /// Lexically malformed formula
    #[error("Malformed formula: {0}")]
    Malformed(String),

    /// Formula exceeds a configured complexity bound
    #[error("Formula {limit} {actual} exceeds the limit of {max}")]
    TooComplex {
        limit: ComplexityLimit,
        actual: usize,
        max: usize,
    },

    /// Call to a blocked function
    #[error("Function {name} is blocked ({category})")]
    BlockedFunction {
        name: String,
        category: FunctionCategory,
    },

    /// External link syntax
    #[error("Formula contains a {kind}: {text}")]
    ExternalLink { kind: LinkKind, text: String },

    /// Reference to a sheet the workbook does not have
    #[error("Formula references unknown sheet '{sheet}'")]
    UnknownSheet { sheet: String },
}

impl FormulaError {
    /// Classification carried by a rejection. Malformed input has none.
    pub fn classification(&self) -> Option<FormulaClass> {
        match self {
            FormulaError::Empty | FormulaError::Malformed(_) => None,
            FormulaError::TooComplex { .. } => Some(FormulaClass::Oversized),
            FormulaError::BlockedFunction { .. } | FormulaError::ExternalLink { .. } => {
                Some(FormulaClass::Dangerous)
            }
            FormulaError::UnknownSheet { .. } => Some(FormulaClass::InvalidReference),
        }
    }

    /// Whether the rejection is a security-policy violation
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            FormulaError::BlockedFunction { .. } | FormulaError::ExternalLink { .. }
        )
    }
}
