//! Security policy data: blocked functions, complexity limits and
//! external-link patterns

use std::fmt;

use lazy_regex::regex_find;

use crate::error::LinkKind;

/// Why a function is blocked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCategory {
    /// Fetches data over the network
    Network,
    /// Runs code or touches the file system (XLM macro functions)
    Execution,
    /// Dynamic data exchange with another application
    DynamicDataExchange,
}

impl fmt::Display for FunctionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FunctionCategory::Network => "network access",
            FunctionCategory::Execution => "code execution",
            FunctionCategory::DynamicDataExchange => "dynamic data exchange",
        })
    }
}

/// A function that may not be called from a written formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockedFunction {
    pub name: &'static str,
    pub category: FunctionCategory,
}

const fn blocked(name: &'static str, category: FunctionCategory) -> BlockedFunction {
    BlockedFunction { name, category }
}

/// Functions rejected unless external access is explicitly allowed
pub const BLOCKED_FUNCTIONS: &[BlockedFunction] = &[
    blocked("WEBSERVICE", FunctionCategory::Network),
    blocked("FILTERXML", FunctionCategory::Network),
    blocked("IMAGE", FunctionCategory::Network),
    blocked("STOCKHISTORY", FunctionCategory::Network),
    blocked("SQL.REQUEST", FunctionCategory::Network),
    blocked("CALL", FunctionCategory::Execution),
    blocked("REGISTER", FunctionCategory::Execution),
    blocked("REGISTER.ID", FunctionCategory::Execution),
    blocked("UNREGISTER", FunctionCategory::Execution),
    blocked("EXEC", FunctionCategory::Execution),
    blocked("RUN", FunctionCategory::Execution),
    blocked("EVALUATE", FunctionCategory::Execution),
    blocked("FOPEN", FunctionCategory::Execution),
    blocked("FWRITE", FunctionCategory::Execution),
    blocked("FWRITELN", FunctionCategory::Execution),
    blocked("FREAD", FunctionCategory::Execution),
    blocked("FREADLN", FunctionCategory::Execution),
    blocked("FCLOSE", FunctionCategory::Execution),
    blocked("FILES", FunctionCategory::Execution),
    blocked("DIRECTORY", FunctionCategory::Execution),
    blocked("RTD", FunctionCategory::DynamicDataExchange),
    blocked("DDE", FunctionCategory::DynamicDataExchange),
    blocked("INITIATE", FunctionCategory::DynamicDataExchange),
    blocked("REQUEST", FunctionCategory::DynamicDataExchange),
    blocked("POKE", FunctionCategory::DynamicDataExchange),
    blocked("EXECUTE", FunctionCategory::DynamicDataExchange),
    blocked("TERMINATE", FunctionCategory::DynamicDataExchange),
];

/// Prefixes Excel adds to newer or add-in functions in stored formulas
const FUNCTION_PREFIXES: [&str; 3] = ["_xlfn.", "_xll.", "_xlws."];

/// Look up a function name in [`BLOCKED_FUNCTIONS`]
///
/// Matching ignores case and the `_xlfn.`/`_xll.`/`_xlws.` storage prefixes.
/// A dotted name that is not itself listed is also matched by its last
/// segment, so unknown namespaces cannot hide a blocked function.
///
/// ```
/// use sheetwarden_formula::policy::{find_blocked, FunctionCategory};
///
/// assert_eq!(find_blocked("_xlfn.webservice").unwrap().category, FunctionCategory::Network);
/// assert_eq!(find_blocked("_xludf.RUN").unwrap().name, "RUN");
/// assert!(find_blocked("SUM").is_none());
/// ```
pub fn find_blocked(name: &str) -> Option<&'static BlockedFunction> {
    let mut bare = name;
    // Prefixes can stack (`_xlfn._xlws.SORT`)
    while let Some(stripped) = FUNCTION_PREFIXES.iter().find_map(|p| strip_prefix_ci(bare, p)) {
        bare = stripped;
    }
    lookup(bare).or_else(|| {
        let (_, last) = bare.rsplit_once('.')?;
        lookup(last)
    })
}

fn lookup(name: &str) -> Option<&'static BlockedFunction> {
    BLOCKED_FUNCTIONS
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name))
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

/// Complexity bounds for formula text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorLimits {
    /// Maximum characters after the leading `=` (Excel: 8192)
    pub max_length: usize,
    /// Maximum lexical tokens
    pub max_tokens: usize,
    /// Maximum parenthesis nesting depth (Excel: 64 nested functions)
    pub max_depth: usize,
}

impl Default for ValidatorLimits {
    fn default() -> Self {
        Self {
            max_length: 8192,
            max_tokens: 1024,
            max_depth: 64,
        }
    }
}

/// Find URL or UNC link text anywhere in a formula, string literals included
pub fn find_link_text(formula: &str) -> Option<(LinkKind, &str)> {
    if let Some(url) = regex_find!(r"(?i)\b(?:https?|ftp|file)://[^\s\x22']*", formula) {
        return Some((LinkKind::Url, url));
    }
    if let Some(unc) = regex_find!(r#"\\\\[^\\\s"']+\\[^\s"']*"#, formula) {
        return Some((LinkKind::Unc, unc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocklist_names_are_canonical() {
        for f in BLOCKED_FUNCTIONS {
            assert_eq!(f.name, f.name.to_ascii_uppercase());
            assert_eq!(find_blocked(f.name), Some(f));
        }
    }

    #[test]
    fn test_prefix_stripping() {
        assert!(find_blocked("_xll.CALL").is_some());
        assert!(find_blocked("_XLFN._XLWS.RTD").is_some());
        assert!(find_blocked("_xlfn.SUM").is_none());
        assert!(find_blocked("MYCALL").is_none());
    }

    #[test]
    fn test_dotted_names() {
        assert_eq!(find_blocked("sql.request").unwrap().name, "SQL.REQUEST");
        assert_eq!(find_blocked("REGISTER.ID").unwrap().name, "REGISTER.ID");
        assert_eq!(find_blocked("Addin.Webservice").unwrap().name, "WEBSERVICE");
        assert!(find_blocked("T.TEST").is_none());
        assert!(find_blocked("FORECAST.ETS").is_none());
    }

    #[test]
    fn test_link_text() {
        assert_eq!(
            find_link_text("=HYPERLINK(\"https://example.com/x\")"),
            Some((LinkKind::Url, "https://example.com/x"))
        );
        assert_eq!(
            find_link_text("='\\\\fileserver\\share\\[Book.xlsx]S'!A1").map(|(k, _)| k),
            Some(LinkKind::Unc)
        );
        assert_eq!(find_link_text("=SUM(A1:A3)/2"), None);
        // A single backslash is a legal name character, not a UNC path
        assert_eq!(find_link_text("=\\rate*2"), None);
    }
}
