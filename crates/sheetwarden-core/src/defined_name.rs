//! Defined names (named ranges and constants)
//!
//! The model only carries names through a read/save cycle; formulas that
//! use them are never evaluated here.

/// Scope of a defined name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    /// Visible from every sheet
    Workbook,
    /// Local to the sheet at this index
    Sheet(usize),
}

/// A defined name such as `TaxRate` -> `Inputs!$B$2`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    /// Reference or expression, stored without a leading `=`
    pub refers_to: String,
    pub scope: NameScope,
    pub hidden: bool,
}

impl DefinedName {
    /// Workbook-scoped, visible name
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Self {
        let refers_to = refers_to.into();
        Self {
            name: name.into(),
            refers_to: refers_to
                .strip_prefix('=')
                .map(str::to_string)
                .unwrap_or(refers_to),
            scope: NameScope::Workbook,
            hidden: false,
        }
    }

    /// Same name restricted to one sheet
    pub fn local_to(mut self, sheet_index: usize) -> Self {
        self.scope = NameScope::Sheet(sheet_index);
        self
    }

    /// Sheet index for `localSheetId`, if any
    pub fn local_sheet(&self) -> Option<usize> {
        match self.scope {
            NameScope::Workbook => None,
            NameScope::Sheet(i) => Some(i),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_equals_dropped() {
        let name = DefinedName::new("TaxRate", "=Inputs!$B$2");
        assert_eq!(name.refers_to, "Inputs!$B$2");
        assert_eq!(name.local_sheet(), None);
        assert_eq!(name.local_to(1).local_sheet(), Some(1));
    }
}
