//! Ink color palette
//!
//! Keeps the picker swatches and the drawing colors in sync. Material Design
//! 500 values are used by default.

use crate::annotation::Color;

/// Default swatches: black, red, blue, green, yellow, pink, gray, cyan, white
pub const DEFAULT_COLORS: [Color; 9] = [
    Color { r: 0x00, g: 0x00, b: 0x00, a: 0xFF },
    Color { r: 0xF4, g: 0x43, b: 0x36, a: 0xFF },
    Color { r: 0x21, g: 0x96, b: 0xF3, a: 0xFF },
    Color { r: 0x4C, g: 0xAF, b: 0x50, a: 0xFF },
    Color { r: 0xFF, g: 0xEB, b: 0x3B, a: 0xFF },
    Color { r: 0xE9, g: 0x1E, b: 0x63, a: 0xFF },
    Color { r: 0x9E, g: 0x9E, b: 0x9E, a: 0xFF },
    Color { r: 0x00, g: 0xBC, b: 0xD4, a: 0xFF },
    Color { r: 0xFF, g: 0xFF, b: 0xFF, a: 0xFF },
];

/// Swatch names, index-aligned with [`DEFAULT_COLORS`]
pub const COLOR_NAMES: [&str; 9] =
    ["Black", "Red", "Blue", "Green", "Yellow", "Pink", "Gray", "Cyan", "White"];

/// Fixed-size set of ink colors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPalette {
    colors: [Color; 9],
}

impl ColorPalette {
    /// Palette with the default swatches
    pub fn new() -> Self {
        Self { colors: DEFAULT_COLORS }
    }

    /// Override the leading swatches; missing slots keep their defaults and
    /// extra colors are ignored.
    pub fn with_colors(custom: &[Color]) -> Self {
        let mut palette = Self::new();
        for (slot, color) in palette.colors.iter_mut().zip(custom) {
            *slot = *color;
        }
        palette
    }

    /// Build from hex strings. Unparsable entries keep the default swatch.
    pub fn from_hex_strings(hex_colors: &[&str]) -> Self {
        let mut palette = Self::new();
        for (slot, hex) in palette.colors.iter_mut().zip(hex_colors) {
            if let Some(color) = Color::from_hex(hex) {
                *slot = color;
            }
        }
        palette
    }

    /// Color at `index`, black when out of range
    pub fn color(&self, index: usize) -> Color {
        self.colors.get(index).copied().unwrap_or(Color::BLACK)
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::new()
    }
}
