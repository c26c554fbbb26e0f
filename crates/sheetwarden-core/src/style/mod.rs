//! Cell styling types
//!
//! This module contains the formatting subset sheetwarden writes:
//! - [`CellStyle`] - Fill, bold, border, number format and protection
//! - [`Color`] - RGB color
//! - [`StyleCatalog`] - Named presets for semantic intents
//! - [`number_format`] - Format patterns for currency, percent, number, accounting

mod catalog;
mod color;
mod format;

pub use catalog::{StyleCatalog, StylePreset, ASSUMPTION_PRESET};
pub use color::Color;
pub use format::{number_format, number_format_named, FormatType, MAX_DECIMALS};

use std::fmt;

/// Outline drawn around all four edges of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BorderKind {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
}

impl BorderKind {
    /// The `style` attribute value used in SpreadsheetML
    pub fn as_xlsx_str(&self) -> Option<&'static str> {
        match self {
            BorderKind::None => None,
            BorderKind::Thin => Some("thin"),
            BorderKind::Medium => Some("medium"),
            BorderKind::Thick => Some("thick"),
        }
    }

    /// Parse a SpreadsheetML border style. Unsupported line styles map to `Thin`.
    pub fn from_xlsx_str(s: &str) -> Self {
        match s {
            "" | "none" => BorderKind::None,
            "medium" | "mediumDashed" | "mediumDashDot" | "mediumDashDotDot" => {
                BorderKind::Medium
            }
            "thick" | "double" => BorderKind::Thick,
            _ => BorderKind::Thin,
        }
    }
}

impl fmt::Display for BorderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_xlsx_str().unwrap_or("none"))
    }
}

/// Complete cell style
///
/// The default is what a fresh cell looks like: no fill, regular weight, no
/// border, `General` number format, locked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellStyle {
    /// Solid background fill
    pub fill: Option<Color>,
    /// Bold font
    pub bold: bool,
    /// Border on all four edges
    pub border: BorderKind,
    /// Number-format pattern; `None` means `General`
    pub number_format: Option<String>,
    /// Cell protection flag (effective only when the sheet is protected)
    pub locked: bool,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            fill: None,
            bold: false,
            border: BorderKind::None,
            number_format: None,
            locked: true,
        }
    }
}

impl CellStyle {
    /// Create a new default style
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a solid fill color
    pub fn fill(mut self, color: Color) -> Self {
        self.fill = Some(color);
        self
    }

    /// Set font to bold
    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    /// Set the border on all edges
    pub fn border(mut self, border: BorderKind) -> Self {
        self.border = border;
        self
    }

    /// Set number format pattern
    pub fn number_format<S: Into<String>>(mut self, format: S) -> Self {
        self.number_format = Some(format.into());
        self
    }

    /// Set cell protection
    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    /// Check if this is the default style
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
