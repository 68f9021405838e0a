//! Colors and color ramps for symbology.

use serde::{Deserialize, Serialize};

/// RGBA color with components in `[0.0, 1.0]`.
///
/// Serialized as a hex string (`#rrggbb`, or `#rrggbbaa` when translucent).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Color {
    /// Red component
    pub r: f32,
    /// Green component
    pub g: f32,
    /// Blue component
    pub b: f32,
    /// Alpha component
    pub a: f32,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    /// Opaque black.
    pub const BLACK: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    /// Create a color, clamping components.
    #[must_use]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Opaque color from 8-bit channels.
    #[must_use]
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            1.0,
        )
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Result<Self, ColorParseError> {
        let hex = hex.trim_start_matches('#');
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or(ColorParseError::InvalidHex)
        };
        match hex.len() {
            6 => Ok(Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Self::from_rgb8(channel(0)?, channel(2)?, channel(4)?)
                .with_alpha(f32::from(channel(6)?) / 255.0)),
            _ => Err(ColorParseError::InvalidLength),
        }
    }

    /// Same color with a different alpha.
    #[must_use]
    pub fn with_alpha(self, a: f32) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// `#rrggbb`
    #[must_use]
    pub fn to_hex(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8
        )
    }

    /// `#rrggbbaa`
    #[must_use]
    pub fn to_hex_with_alpha(&self) -> String {
        format!("{}{:02x}", self.to_hex(), (self.a * 255.0).round() as u8)
    }

    /// Scale RGB intensity, keeping alpha.
    #[must_use]
    pub fn scale(&self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor, self.a)
    }

    /// Linear interpolation.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }

    /// Relative luminance (WCAG 2.1).
    #[must_use]
    pub fn relative_luminance(&self) -> f32 {
        let lin = |c: f32| {
            if c <= 0.039_28 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * lin(self.r) + 0.7152 * lin(self.g) + 0.0722 * lin(self.b)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        if c.a < 1.0 {
            c.to_hex_with_alpha()
        } else {
            c.to_hex()
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

/// Hex color parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ColorParseError {
    /// Non-hex characters
    #[error("invalid hex digits")]
    InvalidHex,
    /// Neither 6 nor 8 digits
    #[error("hex color must have 6 or 8 digits")]
    InvalidLength,
}

const CATEGORICAL: [[u8; 3]; 10] = [
    [0xed, 0x51, 0x51],
    [0x14, 0x9e, 0xce],
    [0xa7, 0xc6, 0x36],
    [0x9e, 0x55, 0x9c],
    [0xfc, 0x92, 0x1f],
    [0xff, 0xde, 0x3e],
    [0xf7, 0x89, 0xd8],
    [0xb7, 0x81, 0x4a],
    [0x3c, 0xaf, 0x99],
    [0x6b, 0x6b, 0xd6],
];

const SEQUENTIAL: [[u8; 3]; 3] = [[0xff, 0xff, 0xcc], [0x41, 0xb6, 0xc4], [0x0c, 0x2c, 0x84]];

/// Ordered list of colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRamp {
    /// Ramp colors
    pub colors: Vec<Color>,
}

impl ColorRamp {
    fn from_table(table: &[[u8; 3]]) -> Self {
        Self {
            colors: table
                .iter()
                .map(|[r, g, b]| Color::from_rgb8(*r, *g, *b))
                .collect(),
        }
    }

    /// Qualitative ramp for categorical classes.
    #[must_use]
    pub fn categorical() -> Self {
        Self::from_table(&CATEGORICAL)
    }

    /// Light-to-dark ramp for continuous values.
    #[must_use]
    pub fn sequential() -> Self {
        Self::from_table(&SEQUENTIAL)
    }

    /// Color at `index`, cycling past the end.
    #[must_use]
    pub fn cycled(&self, index: usize) -> Color {
        if self.colors.is_empty() {
            return Color::BLACK;
        }
        self.colors[index % self.colors.len()]
    }

    /// Color at `t` in `[0, 1]`, interpolated.
    #[must_use]
    pub fn sample(&self, t: f32) -> Color {
        match self.colors.len() {
            0 => Color::BLACK,
            1 => self.colors[0],
            n => {
                let pos = t.clamp(0.0, 1.0) * (n - 1) as f32;
                if pos >= (n - 1) as f32 {
                    return self.colors[n - 1];
                }
                let i = (pos.floor() as usize).min(n - 2);
                self.colors[i].lerp(&self.colors[i + 1], pos - i as f32)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let c = Color::from_hex("#4682b4").unwrap();
        assert_eq!(c.to_hex(), "#4682b4");
        assert_eq!(Color::from_hex("4682b480").unwrap().to_hex_with_alpha(), "#4682b480");
    }

    #[test]
    fn test_hex_errors() {
        assert_eq!(Color::from_hex("#12345"), Err(ColorParseError::InvalidLength));
        assert_eq!(Color::from_hex("#zz0000"), Err(ColorParseError::InvalidHex));
    }

    #[test]
    fn test_scale_halves_intensity() {
        let c = Color::from_rgb8(200, 100, 50).scale(0.5);
        assert_eq!(c.to_hex(), "#643219");
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_serde_as_hex() {
        let json = serde_json::to_string(&Color::WHITE).unwrap();
        assert_eq!(json, "\"#ffffff\"");
        let back: Color = serde_json::from_str("\"#000000\"").unwrap();
        assert_eq!(back, Color::BLACK);
    }

    #[test]
    fn test_ramp_cycles() {
        let ramp = ColorRamp::categorical();
        assert_eq!(ramp.cycled(0), ramp.cycled(ramp.colors.len()));
        assert_ne!(ramp.cycled(0), ramp.cycled(1));
    }

    #[test]
    fn test_ramp_sample_ends() {
        let ramp = ColorRamp::sequential();
        assert_eq!(ramp.sample(0.0), ramp.colors[0]);
        assert_eq!(ramp.sample(1.0), ramp.colors[2]);
        assert_eq!(ramp.sample(1.5), ramp.colors[2]);
        assert_eq!(ramp.sample(-0.5), ramp.colors[0]);
    }

    #[test]
    fn test_ramp_sample_exact_stops() {
        let ramp = ColorRamp {
            colors: vec![Color::BLACK, Color::WHITE, Color::BLACK],
        };
        assert_eq!(ramp.sample(1.0), Color::BLACK);
        assert_eq!(ramp.sample(0.5), Color::WHITE);
    }

    #[test]
    fn test_luminance_orders() {
        assert!(Color::WHITE.relative_luminance() > Color::BLACK.relative_luminance());
    }
}
