//! Formula security validator
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. normalize the leading `=` and reject empty bodies
//! 2. complexity bounds and lexical well-formedness
//! 3. blocked function calls
//! 4. sheet references against the workbook's sheets
//! 5. external link syntax (workbook qualifiers, URLs, UNC paths, DDE)
//!
//! This is a filter over tokens, not a parser. Anything it cannot place is
//! rejected rather than waved through.

use std::fmt;

use ahash::AHashSet;
use log::warn;

use crate::error::{ComplexityLimit, FormulaError, FormulaResult, LinkKind};
use crate::lexer::{tokenize, Token};
use crate::policy::{find_blocked, find_link_text, ValidatorLimits};

/// Classification of a formula after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormulaClass {
    /// Passed every check
    Safe,
    /// Uses external data or blocked functions, accepted because the
    /// caller allowed external access
    ExternalReference,
    /// Rejected by the security policy
    Dangerous,
    /// Rejected by a complexity bound
    Oversized,
    /// Rejected for referencing an unknown sheet
    InvalidReference,
}

impl FormulaClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaClass::Safe => "safe",
            FormulaClass::ExternalReference => "external_reference",
            FormulaClass::Dangerous => "dangerous",
            FormulaClass::Oversized => "oversized",
            FormulaClass::InvalidReference => "invalid_reference",
        }
    }
}

impl fmt::Display for FormulaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Require every `Sheet!` qualifier to name a known sheet
    pub validate_refs: bool,
    /// Accept blocked functions and external links (classified
    /// [`FormulaClass::ExternalReference`])
    pub allow_external: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            validate_refs: true,
            allow_external: false,
        }
    }
}

/// A formula that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFormula {
    /// Formula text with exactly one leading `=`
    pub text: String,
    pub class: FormulaClass,
    /// Sheets named by local `Sheet!` qualifiers, in first-seen order
    pub referenced_sheets: Vec<String>,
    /// Blocked functions and external links accepted under `allow_external`
    pub overrides: Vec<String>,
}

/// Validates formula text against [`ValidatorLimits`] and the blocklist
#[derive(Debug, Clone, Default)]
pub struct FormulaValidator {
    limits: ValidatorLimits,
}

impl FormulaValidator {
    pub fn new(limits: ValidatorLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ValidatorLimits {
        &self.limits
    }

    /// Validate `formula` for a workbook whose sheets are `known_sheets`
    ///
    /// ```
    /// use sheetwarden_formula::{FormulaClass, FormulaValidator, ValidationOptions};
    ///
    /// let validator = FormulaValidator::default();
    /// let ok = validator
    ///     .validate("SUM(B2:B9)", &["Income"], ValidationOptions::default())
    ///     .unwrap();
    /// assert_eq!(ok.text, "=SUM(B2:B9)");
    /// assert_eq!(ok.class, FormulaClass::Safe);
    ///
    /// let err = validator
    ///     .validate("=WEBSERVICE(\"x\")", &["Income"], ValidationOptions::default())
    ///     .unwrap_err();
    /// assert!(err.is_security_violation());
    /// ```
    pub fn validate<S: AsRef<str>>(
        &self,
        formula: &str,
        known_sheets: &[S],
        options: ValidationOptions,
    ) -> FormulaResult<ValidatedFormula> {
        // 1. Normalize
        let trimmed = formula.trim();
        let body = trimmed.strip_prefix('=').unwrap_or(trimmed).trim();
        if body.is_empty() {
            return Err(FormulaError::Empty);
        }
        let text = format!("={}", body);

        // 2. Complexity and well-formedness
        let length = body.chars().count();
        if length > self.limits.max_length {
            return Err(FormulaError::TooComplex {
                limit: ComplexityLimit::Length,
                actual: length,
                max: self.limits.max_length,
            });
        }
        let tokens = tokenize(body)?;
        if tokens.len() > self.limits.max_tokens {
            return Err(FormulaError::TooComplex {
                limit: ComplexityLimit::Tokens,
                actual: tokens.len(),
                max: self.limits.max_tokens,
            });
        }
        self.check_nesting(&tokens)?;

        let mut overrides = Vec::new();

        // 3. Blocked functions, called or passed as a value (`MAP(r,RUN)`)
        let mut seen_blocked = AHashSet::new();
        for name in identifiers(&tokens) {
            if let Some(blocked) = find_blocked(name) {
                if !seen_blocked.insert(blocked.name) {
                    continue;
                }
                if !options.allow_external {
                    return Err(FormulaError::BlockedFunction {
                        name: blocked.name.to_string(),
                        category: blocked.category,
                    });
                }
                overrides.push(format!("{} ({})", blocked.name, blocked.category));
            }
        }

        // 4. Local sheet references
        let referenced_sheets = local_sheets(&tokens);
        if options.validate_refs {
            let known: AHashSet<String> = known_sheets
                .iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect();
            if let Some(missing) = referenced_sheets
                .iter()
                .find(|s| !known.contains(&s.to_lowercase()))
            {
                return Err(FormulaError::UnknownSheet {
                    sheet: missing.clone(),
                });
            }
        }

        // 5. External links
        if let Some((kind, link)) = find_external_link(&tokens, &text) {
            if !options.allow_external {
                return Err(FormulaError::ExternalLink { kind, text: link });
            }
            overrides.push(format!("{}: {}", kind, link));
        }

        let class = if overrides.is_empty() {
            FormulaClass::Safe
        } else {
            warn!(
                "Accepting formula {} with external access: {}",
                text,
                overrides.join(", ")
            );
            FormulaClass::ExternalReference
        };

        Ok(ValidatedFormula {
            text,
            class,
            referenced_sheets,
            overrides,
        })
    }

    fn check_nesting(&self, tokens: &[Token]) -> FormulaResult<()> {
        let mut parens = 0usize;
        let mut braces = 0usize;

        for token in tokens {
            match token {
                Token::LeftParen => {
                    parens += 1;
                    if parens > self.limits.max_depth {
                        return Err(FormulaError::TooComplex {
                            limit: ComplexityLimit::Depth,
                            actual: parens,
                            max: self.limits.max_depth,
                        });
                    }
                }
                Token::RightParen => {
                    parens = parens
                        .checked_sub(1)
                        .ok_or_else(|| FormulaError::Malformed("unbalanced ')'".into()))?;
                }
                Token::LeftBrace => braces += 1,
                Token::RightBrace => {
                    braces = braces
                        .checked_sub(1)
                        .ok_or_else(|| FormulaError::Malformed("unbalanced '}'".into()))?;
                }
                _ => {}
            }
        }

        if parens != 0 {
            return Err(FormulaError::Malformed("unbalanced '('".into()));
        }
        if braces != 0 {
            return Err(FormulaError::Malformed("unbalanced '{'".into()));
        }
        Ok(())
    }
}

/// Every bare name in the formula: function calls, defined names and
/// functions passed to `LAMBDA` helpers
fn identifiers(tokens: &[Token]) -> impl Iterator<Item = &str> {
    tokens.iter().filter_map(|token| match token {
        Token::Identifier(name) => Some(name.as_str()),
        _ => None,
    })
}

/// Sheet names from qualifiers that are not workbook-external, deduplicated
/// case-insensitively
fn local_sheets(tokens: &[Token]) -> Vec<String> {
    let mut seen = AHashSet::new();
    let mut sheets = Vec::new();
    for token in tokens {
        if let Token::SheetRef(sheet) = token {
            if sheet.is_external() {
                continue;
            }
            for name in sheet.sheets() {
                if seen.insert(name.to_lowercase()) {
                    sheets.push(name.to_string());
                }
            }
        }
    }
    sheets
}

fn find_external_link(tokens: &[Token], text: &str) -> Option<(LinkKind, String)> {
    for token in tokens {
        match token {
            Token::Pipe => return Some((LinkKind::Dde, "|".to_string())),
            Token::ExternalWorkbook(book) => return Some((LinkKind::Workbook, book.clone())),
            Token::SheetRef(sheet) => {
                if let Some(book) = &sheet.workbook {
                    return Some((LinkKind::Workbook, format!("{}{}", book, sheet.first)));
                }
            }
            _ => {}
        }
    }

    find_link_text(text).map(|(kind, link)| (kind, link.to_string()))
}

/// Validate with default limits
pub fn validate_formula<S: AsRef<str>>(
    formula: &str,
    known_sheets: &[S],
    options: ValidationOptions,
) -> FormulaResult<ValidatedFormula> {
    FormulaValidator::default().validate(formula, known_sheets, options)
}
