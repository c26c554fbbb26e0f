//! Named style presets

use ahash::AHashMap;

use super::{BorderKind, CellStyle, Color};
use crate::error::{Error, Result};

/// Name of the preset used to flag manually entered model drivers
pub const ASSUMPTION_PRESET: &str = "assumption";

/// A semantic intent mapped to concrete formatting
#[derive(Debug, Clone, PartialEq)]
pub struct StylePreset {
    /// Lookup name (stored lowercase)
    pub name: String,
    /// One-line description shown by `info`-style listings
    pub description: String,
    /// Formatting applied by the preset
    pub style: CellStyle,
}

impl StylePreset {
    pub fn new<N: Into<String>, D: Into<String>>(name: N, description: D, style: CellStyle) -> Self {
        Self {
            name: name.into().to_lowercase(),
            description: description.into(),
            style,
        }
    }
}

/// Case-insensitive registry of [`StylePreset`]s
///
/// ```
/// use sheetwarden_core::{Color, StyleCatalog, ASSUMPTION_PRESET};
///
/// let catalog = StyleCatalog::new();
/// let preset = catalog.get("Assumption").unwrap();
/// assert_eq!(preset.name, ASSUMPTION_PRESET);
/// assert_eq!(preset.style.fill, Some(Color::YELLOW));
/// assert!(!preset.style.locked);
/// assert!(catalog.get("sparkles").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    presets: AHashMap<String, StylePreset>,
}

impl Default for StyleCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleCatalog {
    /// Catalog with the built-in presets
    pub fn new() -> Self {
        let mut catalog = Self::empty();
        for preset in builtin_presets() {
            catalog.insert(preset);
        }
        catalog
    }

    /// Catalog with no presets
    pub fn empty() -> Self {
        Self {
            presets: AHashMap::new(),
        }
    }

    /// Add or replace a preset
    pub fn insert(&mut self, preset: StylePreset) {
        self.presets.insert(preset.name.to_lowercase(), preset);
    }

    /// Look up a preset by name, ignoring case
    pub fn get(&self, name: &str) -> Result<&StylePreset> {
        self.presets
            .get(&name.trim().to_lowercase())
            .ok_or_else(|| Error::UnknownStyle(name.to_string()))
    }

    /// Style for a preset name
    pub fn style(&self, name: &str) -> Result<CellStyle> {
        self.get(name).map(|p| p.style.clone())
    }

    /// Preset names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.presets.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn builtin_presets() -> Vec<StylePreset> {
    vec![
        StylePreset::new(
            ASSUMPTION_PRESET,
            "Manually entered model driver",
            CellStyle::new()
                .fill(Color::YELLOW)
                .border(BorderKind::Thin)
                .locked(false),
        ),
        StylePreset::new(
            "header",
            "Column or section header",
            CellStyle::new()
                .bold(true)
                .fill(Color::LIGHT_GREY)
                .border(BorderKind::Thin),
        ),
        StylePreset::new(
            "input",
            "Editable input cell",
            CellStyle::new().fill(Color::LIGHT_BLUE).locked(false),
        ),
        StylePreset::new("calculation", "Derived value", CellStyle::new()),
        StylePreset::new(
            "output",
            "Key result",
            CellStyle::new()
                .bold(true)
                .fill(Color::LIGHT_GREEN)
                .border(BorderKind::Medium),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_names() {
        let catalog = StyleCatalog::new();
        assert_eq!(
            catalog.names(),
            vec!["assumption", "calculation", "header", "input", "output"]
        );
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let catalog = StyleCatalog::new();
        assert_eq!(catalog.get("HEADER").unwrap().name, "header");
        assert_eq!(catalog.get(" output ").unwrap().name, "output");
    }

    #[test]
    fn test_preset_contents() {
        let catalog = StyleCatalog::new();

        let header = catalog.style("header").unwrap();
        assert!(header.bold);
        assert!(header.locked);
        assert_eq!(header.border, BorderKind::Thin);

        let calc = catalog.style("calculation").unwrap();
        assert!(calc.is_default());

        let output = catalog.style("output").unwrap();
        assert_eq!(output.border, BorderKind::Medium);
        assert_eq!(output.fill, Some(Color::LIGHT_GREEN));
    }

    #[test]
    fn test_unknown_style() {
        let err = StyleCatalog::new().get("fancy").unwrap_err();
        assert!(matches!(err, Error::UnknownStyle(ref s) if s == "fancy"));
    }

    #[test]
    fn test_custom_preset_replaces() {
        let mut catalog = StyleCatalog::new();
        catalog.insert(StylePreset::new(
            "Input",
            "Orange inputs",
            CellStyle::new().fill(Color::rgb(0xFF, 0xC0, 0x00)),
        ));
        assert_eq!(catalog.names().len(), 5);
        assert_eq!(
            catalog.style("input").unwrap().fill,
            Some(Color::rgb(0xFF, 0xC0, 0x00))
        );
    }
}
