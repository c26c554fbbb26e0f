//! Workbook type - the main document structure

use crate::defined_name::{DefinedName, NameScope};
use crate::error::{Error, Result};
use crate::sheet_name::SheetNameRules;
use crate::worksheet::Worksheet;

/// A workbook (spreadsheet document)
///
/// An ordered list of worksheets whose names are unique under
/// case-insensitive comparison.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    /// Active sheet index
    active_sheet: usize,
    rules: SheetNameRules,
    defined_names: Vec<DefinedName>,
}

impl Workbook {
    /// Create a workbook with no worksheets and default naming rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a workbook with no worksheets and custom naming rules
    pub fn with_rules(rules: SheetNameRules) -> Self {
        Self {
            rules,
            ..Self::default()
        }
    }

    /// Naming rules applied by [`Self::add_worksheet`]
    pub fn rules(&self) -> &SheetNameRules {
        &self.rules
    }

    /// Get the number of worksheets
    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Check if the workbook has no worksheets
    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    /// Get a worksheet by index
    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    /// Get a mutable worksheet by index
    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Get a worksheet by name (case-insensitive)
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).map(|i| &self.worksheets[i])
    }

    /// Get a mutable worksheet by name (case-insensitive)
    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheet_index(name).map(move |i| &mut self.worksheets[i])
    }

    /// Get a worksheet by name, failing with [`Error::SheetNotFound`]
    pub fn require_sheet(&self, name: &str) -> Result<&Worksheet> {
        match self.sheet_index(name) {
            Some(i) => Ok(&self.worksheets[i]),
            None => Err(self.not_found(name)),
        }
    }

    /// Mutable variant of [`Self::require_sheet`]
    pub fn require_sheet_mut(&mut self, name: &str) -> Result<&mut Worksheet> {
        match self.sheet_index(name) {
            Some(i) => Ok(&mut self.worksheets[i]),
            None => Err(self.not_found(name)),
        }
    }

    /// Get the index of a worksheet by name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.worksheets
            .iter()
            .position(|ws| SheetNameRules::collides(name, [ws.name()]))
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(|ws| ws.name()).collect()
    }

    /// Iterate over all worksheets
    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    /// Iterate over all worksheets mutably
    pub fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Add a new empty worksheet after validating its name
    pub fn add_worksheet(&mut self, name: &str) -> Result<usize> {
        self.rules.validate(name)?;
        self.push_worksheet(Worksheet::new(name))
    }

    /// Append an already-built worksheet (e.g. one read from a file)
    ///
    /// Only uniqueness is enforced: names coming from an existing file are
    /// kept as Excel wrote them.
    pub fn push_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        if self.sheet_index(worksheet.name()).is_some() {
            return Err(Error::DuplicateSheetName(worksheet.name().to_string()));
        }
        self.worksheets.push(worksheet);
        Ok(self.worksheets.len() - 1)
    }

    /// Get the active sheet index
    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    /// Set the active sheet, ignoring out-of-range indices
    pub fn set_active_sheet(&mut self, index: usize) {
        if index < self.worksheets.len() {
            self.active_sheet = index;
        }
    }

    /// Defined names in file order
    pub fn defined_names(&self) -> &[DefinedName] {
        &self.defined_names
    }

    /// Add a defined name, replacing one with the same name and scope
    ///
    /// Sheet-local names must point at an existing sheet.
    pub fn define_name(&mut self, name: DefinedName) -> Result<()> {
        if let NameScope::Sheet(index) = name.scope {
            if index >= self.worksheets.len() {
                return Err(Error::InvalidSheetIndex(index));
            }
        }
        match self.defined_names.iter_mut().find(|existing| {
            existing.scope == name.scope && existing.name.eq_ignore_ascii_case(&name.name)
        }) {
            Some(existing) => *existing = name,
            None => self.defined_names.push(name),
        }
        Ok(())
    }

    fn not_found(&self, name: &str) -> Error {
        Error::SheetNotFound {
            name: name.to_string(),
            available: self.sheet_names().iter().map(|s| s.to_string()).collect(),
        }
    }
}
