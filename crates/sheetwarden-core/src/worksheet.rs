//! Worksheet type

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::address::{CellAddress, RangeAddress};
use crate::note::CellNote;
use crate::style::CellStyle;
use crate::value::CellValue;

/// Everything stored for one cell
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    /// Explicit formatting; `None` uses the workbook default
    pub style: Option<CellStyle>,
    pub note: Option<CellNote>,
}

impl Cell {
    /// A cell carrying nothing worth storing
    pub fn is_blank(&self) -> bool {
        self.value.is_empty() && self.style.is_none() && self.note.is_none()
    }
}

/// A single worksheet in a workbook
///
/// Cells are stored sparsely, keyed by address. [`CellAddress`] orders
/// row-major, so iteration walks rows top to bottom and left to right.
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    cells: BTreeMap<CellAddress, Cell>,
}

impl Worksheet {
    /// Create a new empty worksheet. The name is not validated here;
    /// [`crate::Workbook::add_worksheet`] does that.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    /// Get the worksheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    // === Cell access ===

    /// Get a cell if anything is stored at `addr`
    pub fn cell(&self, addr: CellAddress) -> Option<&Cell> {
        self.cells.get(&addr)
    }

    /// Get the value at `addr` (`Empty` when nothing is stored)
    pub fn value(&self, addr: CellAddress) -> &CellValue {
        self.cells
            .get(&addr)
            .map(|c| &c.value)
            .unwrap_or(&CellValue::Empty)
    }

    /// Set the value at `addr`, keeping any style and note already there
    pub fn set_value(&mut self, addr: CellAddress, value: CellValue) {
        self.cells.entry(addr).or_default().value = value;
        self.prune(addr);
    }

    /// Set or clear the explicit style at `addr`
    pub fn set_style(&mut self, addr: CellAddress, style: Option<CellStyle>) {
        self.cells.entry(addr).or_default().style = style;
        self.prune(addr);
    }

    /// Set or clear the note at `addr`
    pub fn set_note(&mut self, addr: CellAddress, note: Option<CellNote>) {
        self.cells.entry(addr).or_default().note = note;
        self.prune(addr);
    }

    /// Get the formula text at `addr`
    pub fn formula(&self, addr: CellAddress) -> Option<&str> {
        self.cells.get(&addr).and_then(|c| c.value.formula_text())
    }

    fn prune(&mut self, addr: CellAddress) {
        if self.cells.get(&addr).is_some_and(Cell::is_blank) {
            self.cells.remove(&addr);
        }
    }

    // === Iteration ===

    /// Iterate over stored cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &Cell)> {
        self.cells.iter().map(|(addr, cell)| (*addr, cell))
    }

    /// Stored cells of one row within a column span, in column order
    pub fn row_cells(
        &self,
        row: u32,
        cols: RangeInclusive<u16>,
    ) -> impl Iterator<Item = (CellAddress, &Cell)> {
        let start = CellAddress {
            row,
            col: *cols.start(),
        };
        let end = CellAddress {
            row,
            col: *cols.end(),
        };
        self.cells.range(start..=end).map(|(addr, cell)| (*addr, cell))
    }

    /// Apply `f` to every stored cell, dropping cells left blank afterwards
    pub fn update_cells<F>(&mut self, mut f: F)
    where
        F: FnMut(CellAddress, &mut Cell),
    {
        for (addr, cell) in self.cells.iter_mut() {
            f(*addr, cell);
        }
        self.cells.retain(|_, cell| !cell.is_blank());
    }

    // === Statistics ===

    /// Smallest range enclosing every stored cell, if any
    pub fn used_range(&self) -> Option<RangeAddress> {
        let first = self.cells.keys().next()?;
        let last = self.cells.keys().next_back()?;

        let (min_col, max_col) = self
            .cells
            .keys()
            .fold((u16::MAX, 0u16), |(lo, hi), a| (lo.min(a.col), hi.max(a.col)));

        Some(RangeAddress::new(
            CellAddress {
                row: first.row,
                col: min_col,
            },
            CellAddress {
                row: last.row,
                col: max_col,
            },
        ))
    }

    /// Number of cells holding a value (formulas included)
    pub fn cell_count(&self) -> usize {
        self.cells.values().filter(|c| !c.value.is_empty()).count()
    }

    /// Number of formula cells
    pub fn formula_count(&self) -> usize {
        self.cells.values().filter(|c| c.value.is_formula()).count()
    }

    /// Number of cells with a note
    pub fn note_count(&self) -> usize {
        self.cells.values().filter(|c| c.note.is_some()).count()
    }

    /// Whether no cells are stored
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
