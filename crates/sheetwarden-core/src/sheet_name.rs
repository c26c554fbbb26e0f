//! Sheet name validation and sanitization

use std::fmt;

use ahash::AHashSet;

use crate::error::{Error, Result};
use crate::MAX_SHEET_NAME_LEN;

/// Placeholder base used when sanitizing leaves nothing of the original name
const PLACEHOLDER_BASE: &str = "Sheet";

/// A single rule broken by a sheet name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetNameViolation {
    /// Name is empty
    Empty,
    /// Name is longer than the configured maximum (in characters)
    TooLong { len: usize, max: usize },
    /// Name contains forbidden characters
    ForbiddenChars(Vec<char>),
    /// Name starts or ends with an apostrophe
    EdgeApostrophe,
    /// Name matches a reserved name
    Reserved(String),
}

impl fmt::Display for SheetNameViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetNameViolation::Empty => write!(f, "name is empty"),
            SheetNameViolation::TooLong { len, max } => {
                write!(f, "name is {} characters long (maximum {})", len, max)
            }
            SheetNameViolation::ForbiddenChars(chars) => {
                let list: Vec<String> = chars.iter().map(|c| format!("'{}'", c)).collect();
                write!(f, "contains forbidden characters {}", list.join(" "))
            }
            SheetNameViolation::EdgeApostrophe => {
                write!(f, "must not start or end with an apostrophe")
            }
            SheetNameViolation::Reserved(name) => write!(f, "'{}' is a reserved name", name),
        }
    }
}

/// Rule set for worksheet names
///
/// The default matches what Excel enforces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetNameRules {
    /// Maximum length in characters
    pub max_len: usize,
    /// Characters that may not appear anywhere in a name
    pub forbidden_chars: Vec<char>,
    /// Names that may not be used (compared case-insensitively)
    pub reserved_names: Vec<String>,
    /// Reject names starting or ending with `'`
    pub forbid_edge_apostrophe: bool,
}

impl Default for SheetNameRules {
    fn default() -> Self {
        Self {
            max_len: MAX_SHEET_NAME_LEN,
            forbidden_chars: vec!['/', '\\', '?', '*', '[', ']', ':'],
            reserved_names: vec!["History".to_string()],
            forbid_edge_apostrophe: true,
        }
    }
}

impl SheetNameRules {
    /// List every rule `name` breaks. An empty list means the name is valid.
    ///
    /// Collisions with other sheets are not checked here, see [`Self::collides`].
    pub fn violations(&self, name: &str) -> Vec<SheetNameViolation> {
        let mut violations = Vec::new();

        if name.is_empty() {
            violations.push(SheetNameViolation::Empty);
            return violations;
        }

        let len = name.chars().count();
        if len > self.max_len {
            violations.push(SheetNameViolation::TooLong {
                len,
                max: self.max_len,
            });
        }

        let mut found: Vec<char> = Vec::new();
        for c in name.chars() {
            if self.forbidden_chars.contains(&c) && !found.contains(&c) {
                found.push(c);
            }
        }
        if !found.is_empty() {
            violations.push(SheetNameViolation::ForbiddenChars(found));
        }

        if self.forbid_edge_apostrophe && (name.starts_with('\'') || name.ends_with('\'')) {
            violations.push(SheetNameViolation::EdgeApostrophe);
        }

        if let Some(reserved) = self.reserved_match(name) {
            violations.push(SheetNameViolation::Reserved(reserved.to_string()));
        }

        violations
    }

    /// Validate a name, failing with [`Error::InvalidSheetName`] on any violation
    pub fn validate(&self, name: &str) -> Result<()> {
        let violations = self.violations(name);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidSheetName {
                name: name.to_string(),
                violations,
            })
        }
    }

    /// Whether `name` equals any of `existing` under case-insensitive comparison
    pub fn collides<'a, I>(name: &str, existing: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let key = normalize(name);
        existing.into_iter().any(|other| normalize(other) == key)
    }

    /// Map any name to one that passes [`Self::validate`] and does not collide
    /// with `existing`.
    ///
    /// Forbidden characters are dropped, edge apostrophes trimmed, and the
    /// result truncated to the maximum length. Empty results and reserved
    /// names fall back to a placeholder. A collision appends ` (2)`, ` (3)`,
    /// ... shortening the stem so the suffix still fits. The mapping is
    /// deterministic for a given `existing` set.
    ///
    /// ```
    /// use sheetwarden_core::SheetNameRules;
    ///
    /// let rules = SheetNameRules::default();
    /// assert_eq!(rules.sanitize("Q1: Revenue/Costs", &["Inputs"]), "Q1 RevenueCosts");
    /// assert_eq!(rules.sanitize("Data", &["DATA"]), "Data (2)");
    /// ```
    pub fn sanitize<S: AsRef<str>>(&self, name: &str, existing: &[S]) -> String {
        let taken: AHashSet<String> = existing.iter().map(|s| normalize(s.as_ref())).collect();

        let mut stem: String = name
            .chars()
            .filter(|c| !self.forbidden_chars.contains(c) && !c.is_control())
            .collect();
        stem = self.trim_edges(&stem).to_string();
        stem = truncate_chars(&stem, self.max_len);
        stem = self.trim_edges(&stem).to_string();

        if stem.is_empty() || self.reserved_match(&stem).is_some() {
            // Placeholders are always numbered: Sheet1, Sheet2, ...
            return self.with_suffix(PLACEHOLDER_BASE, &taken, 1);
        }

        if !taken.contains(&normalize(&stem)) {
            return stem;
        }
        self.with_suffix(&stem, &taken, 2)
    }

    fn with_suffix(&self, stem: &str, taken: &AHashSet<String>, start: usize) -> String {
        let mut n = start;
        loop {
            let digits = n.to_string();
            if digits.chars().count() > self.max_len {
                // Every name that fits is taken
                return truncate_chars(&digits, self.max_len);
            }
            let mut suffix = if stem == PLACEHOLDER_BASE {
                digits.clone()
            } else {
                format!(" ({})", n)
            };
            if suffix.chars().count() >= self.max_len {
                // No room for the stem: the bare number is the name
                suffix = digits;
            }
            let room = self.max_len.saturating_sub(suffix.chars().count());
            let base = truncate_chars(stem, room);
            let base = self.trim_edges(&base);
            let candidate = format!("{}{}", base, suffix);
            if !taken.contains(&normalize(&candidate)) && self.reserved_match(&candidate).is_none()
            {
                return candidate;
            }
            n += 1;
        }
    }

    fn trim_edges<'a>(&self, s: &'a str) -> &'a str {
        let apostrophe = self.forbid_edge_apostrophe;
        s.trim_matches(|c: char| c.is_whitespace() || (apostrophe && c == '\''))
    }

    fn reserved_match(&self, name: &str) -> Option<&str> {
        let key = normalize(name);
        self.reserved_names
            .iter()
            .find(|r| normalize(r) == key)
            .map(|r| r.as_str())
    }
}

/// Key used for case-insensitive sheet-name comparison
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
