//! # sheetwarden-formula
//!
//! Formula vetting for sheetwarden.
//!
//! This crate provides:
//! - A formula lexer (text → tokens)
//! - The security policy as data: blocked functions, complexity limits and
//!   external-link patterns
//! - [`FormulaValidator`], which classifies formula text before it is
//!   written into a workbook
//!
//! Formulas are never evaluated here.
//!
//! ## Example
//!
//! ```rust
//! use sheetwarden_formula::{validate_formula, FormulaError, ValidationOptions};
//!
//! let sheets = ["Assumptions", "Forecast"];
//! let ok = validate_formula("=Assumptions!B2*C4", &sheets, ValidationOptions::default()).unwrap();
//! assert_eq!(ok.referenced_sheets, vec!["Assumptions"]);
//!
//! let err = validate_formula("=Outputs!B2", &sheets, ValidationOptions::default()).unwrap_err();
//! assert!(matches!(err, FormulaError::UnknownSheet { .. }));
//! ```

pub mod error;
pub mod lexer;
pub mod policy;
pub mod validator;

pub use error::{ComplexityLimit, FormulaError, FormulaResult, LinkKind};
pub use policy::{BlockedFunction, FunctionCategory, ValidatorLimits, BLOCKED_FUNCTIONS};
pub use validator::{
    validate_formula, FormulaClass, FormulaValidator, ValidatedFormula, ValidationOptions,
};
