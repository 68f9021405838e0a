//! Background themes and the symbol palettes tied to them.

use crate::color::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Brightness class of the basemap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BgTheme {
    /// Light background
    #[default]
    Light,
    /// Dark background
    Dark,
}

impl FromStr for BgTheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

impl fmt::Display for BgTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Light => "light",
            Self::Dark => "dark",
        })
    }
}

/// Colors used by default symbols, labels and special classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolPalette {
    /// Default feature fill
    pub feature: Color,
    /// Default outline
    pub outline: Color,
    /// Label text
    pub label_text: Color,
    /// Label halo
    pub label_halo: Color,
    /// Low stop of the random color variable
    pub random_low: Color,
    /// High stop of the random color variable
    pub random_high: Color,
    /// Fill of the "Others" class
    pub others: Color,
    /// Fill of the "No value" class
    pub no_value_fill: Color,
    /// Outline of the "No value" class
    pub no_value_ring: Color,
}

impl SymbolPalette {
    /// Palette for light basemaps.
    #[must_use]
    pub fn light() -> Self {
        Self {
            feature: Color::from_rgb8(0x46, 0x82, 0xb4),
            outline: Color::WHITE,
            label_text: Color::WHITE,
            label_halo: Color::from_rgb8(0x46, 0x82, 0xb4),
            random_low: Color::from_rgb8(0x46, 0x82, 0xb4),
            random_high: Color::from_rgb8(0x32, 0x5d, 0x81),
            others: Color::from_rgb8(0xb2, 0xb2, 0xb2),
            no_value_fill: Color::from_rgb8(0x80, 0x80, 0x80),
            no_value_ring: Color::WHITE,
        }
    }

    /// Palette for dark basemaps.
    #[must_use]
    pub fn dark() -> Self {
        Self {
            feature: Color::from_rgb8(0xad, 0xd8, 0xe6),
            outline: Color::BLACK,
            label_text: Color::WHITE,
            label_halo: Color::BLACK,
            ..Self::light()
        }
    }

    /// Palette for a theme.
    #[must_use]
    pub fn for_theme(theme: BgTheme) -> Self {
        match theme {
            BgTheme::Light => Self::light(),
            BgTheme::Dark => Self::dark(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parse() {
        assert_eq!("Dark".parse::<BgTheme>(), Ok(BgTheme::Dark));
        assert!("dim".parse::<BgTheme>().is_err());
        assert_eq!(BgTheme::default(), BgTheme::Light);
    }

    #[test]
    fn test_palette_colors() {
        assert_eq!(SymbolPalette::light().feature.to_hex(), "#4682b4");
        assert_eq!(SymbolPalette::dark().feature.to_hex(), "#add8e6");
        assert_eq!(SymbolPalette::light().outline, Color::WHITE);
        assert_eq!(SymbolPalette::dark().outline, Color::BLACK);
    }

    #[test]
    fn test_halo_inverts() {
        assert_ne!(
            SymbolPalette::light().label_halo,
            SymbolPalette::dark().label_halo
        );
        assert_eq!(SymbolPalette::dark().label_halo, Color::BLACK);
    }
}
