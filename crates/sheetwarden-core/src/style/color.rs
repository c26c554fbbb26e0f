//! Color representation

use std::fmt;

/// An opaque RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    pub const YELLOW: Color = Color::rgb(0xFF, 0xFF, 0x00);
    pub const LIGHT_GREY: Color = Color::rgb(0xD9, 0xD9, 0xD9);
    pub const LIGHT_BLUE: Color = Color::rgb(0xDD, 0xEB, 0xF7);
    pub const LIGHT_GREEN: Color = Color::rgb(0xE2, 0xEF, 0xDA);

    /// Create an RGB color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Create from a hex string (e.g., "#FF0000", "FF0000" or ARGB "FFFF0000")
    ///
    /// The alpha channel of an ARGB value is dropped.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let rgb = match hex.len() {
            6 => hex,
            8 => hex.get(2..)?,
            _ => return None,
        };

        let r = u8::from_str_radix(rgb.get(0..2)?, 16).ok()?;
        let g = u8::from_str_radix(rgb.get(2..4)?, 16).ok()?;
        let b = u8::from_str_radix(rgb.get(4..6)?, 16).ok()?;
        Some(Color { r, g, b })
    }

    /// Convert to hex string (without # prefix)
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Convert to opaque ARGB hex string (8 characters, used by XLSX)
    pub fn to_argb_hex(&self) -> String {
        format!("FF{}", self.to_hex())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        assert_eq!(Color::from_hex("#FFFF00"), Some(Color::YELLOW));
        assert_eq!(Color::from_hex("FFFFFF00"), Some(Color::YELLOW));
        assert_eq!(Color::YELLOW.to_argb_hex(), "FFFFFF00");
        assert_eq!(Color::LIGHT_GREY.to_string(), "#D9D9D9");
    }

    #[test]
    fn test_bad_hex() {
        assert_eq!(Color::from_hex("FFF"), None);
        assert_eq!(Color::from_hex("GG0000"), None);
        assert_eq!(Color::from_hex("ÿÿÿ"), None);
    }
}
