use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use image::{Rgb, Rgba};
use palette::Srgb;

use crate::error::PaletteError;

/// The RGB projection of a pixel. Alpha never takes part in grouping or
/// mapping, so two pixels that differ only in alpha share a `Color`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Upper-case `RRGGBB`, no leading `#`.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Parse `#rrggbb`, `rrggbb` or the short `#rgb` form.
    pub fn from_hex(s: &str) -> Result<Self, PaletteError> {
        let trimmed = s.trim();
        let hex = trimmed.trim_start_matches('#');
        Srgb::<u8>::from_str(hex)
            .map(Self::from)
            .map_err(|e| PaletteError::InvalidInput(format!("invalid hex colour {trimmed:?}: {e}")))
    }

    /// Opaque RGBA pixel of this colour.
    pub fn to_rgba(self, alpha: u8) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, alpha])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

impl From<Srgb<u8>> for Color {
    fn from(c: Srgb<u8>) -> Self {
        Self::new(c.red, c.green, c.blue)
    }
}

impl From<Color> for Srgb<u8> {
    fn from(c: Color) -> Self {
        Srgb::new(c.r, c.g, c.b)
    }
}

impl From<Rgba<u8>> for Color {
    fn from(p: Rgba<u8>) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl From<Rgb<u8>> for Color {
    fn from(p: Rgb<u8>) -> Self {
        Self::new(p[0], p[1], p[2])
    }
}

impl From<Color> for Rgb<u8> {
    fn from(c: Color) -> Self {
        Rgb([c.r, c.g, c.b])
    }
}

// ------------------------------------------------------------
// Sort keys
// ------------------------------------------------------------

/// Scalar used to rank colours from dark to light.
///
/// Key values are integers so that "two colours share a key" is an exact
/// comparison rather than a float equality test.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OrderKey {
    /// Perceived brightness `0.299 R + 0.587 G + 0.114 B`, in thousandths.
    #[default]
    Brightness,
    /// Plain `R + G + B`.
    ChannelSum,
}

impl OrderKey {
    #[inline(always)]
    pub fn key(self, c: Color) -> u32 {
        let (r, g, b) = (c.r as u32, c.g as u32, c.b as u32);
        match self {
            OrderKey::Brightness => 299 * r + 587 * g + 114 * b,
            OrderKey::ChannelSum => r + g + b,
        }
    }

    /// Human readable form of a key produced by [`OrderKey::key`].
    pub fn format_key(self, key: u32) -> String {
        match self {
            OrderKey::Brightness => format!("{:.3}", key as f64 / 1000.0),
            OrderKey::ChannelSum => key.to_string(),
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKey::Brightness => f.write_str("brightness"),
            OrderKey::ChannelSum => f.write_str("total RGB value"),
        }
    }
}

// ------------------------------------------------------------
// Palette
// ------------------------------------------------------------

/// An ordered sequence of colours. Position is the rank used to pair two
/// palettes, so order carries meaning.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette(Vec<Color>);

impl Palette {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a palette that must not contain the same colour twice.
    pub fn try_from_colors(colors: Vec<Color>) -> Result<Self, PaletteError> {
        let mut seen = HashSet::with_capacity(colors.len());
        for c in &colors {
            if !seen.insert(*c) {
                return Err(PaletteError::InvalidInput(format!(
                    "colour {c} appears more than once in palette"
                )));
            }
        }
        Ok(Self(colors))
    }

    /// Take colours in the order a palette strip stores them. The strip is
    /// trusted as curated, so no duplicate check happens here.
    pub fn from_strip(colors: Vec<Color>) -> Self {
        Self(colors)
    }

    /// Parse a list of hex strings, e.g. from a command line.
    pub fn from_hex_list<S: AsRef<str>>(list: &[S]) -> Result<Self, PaletteError> {
        let colors = list
            .iter()
            .map(|s| Color::from_hex(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::try_from_colors(colors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Color> {
        self.0.iter()
    }

    pub fn reverse(&mut self) {
        self.0.reverse();
    }

    pub fn reversed(mut self) -> Self {
        self.0.reverse();
        self
    }

    pub fn to_hex(&self) -> Vec<String> {
        self.0.iter().map(|c| c.to_hex()).collect()
    }

    pub fn into_inner(self) -> Vec<Color> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a Color;
    type IntoIter = std::slice::Iter<'a, Color>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
