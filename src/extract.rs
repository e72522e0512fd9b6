//! Palette extraction.
//!
//! Two modes:
//! - **Linear**: a 1-pixel-tall strip is read left to right and trusted as
//!   already ordered (stored dark to light, returned light to dark).
//! - **Sorted**: every pixel of an arbitrary surface is counted, rare colours
//!   are dropped, and survivors are ordered by an [`OrderKey`].

use std::collections::{BTreeMap, HashMap};

use crate::color::{Color, OrderKey, Palette};
use crate::error::PaletteError;
use crate::surface::{ProgressSink, ProgressSpan, Surface};

/// Knobs for Sorted-mode extraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Count pixels whose alpha is exactly zero.
    pub include_transparent: bool,
    /// Colours seen this many times or fewer are dropped.
    pub count_threshold: u32,
    pub order_key: OrderKey,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            include_transparent: true,
            count_threshold: 0,
            order_key: OrderKey::Brightness,
        }
    }
}

// ------------------------------------------------------------
// Colour tally
// ------------------------------------------------------------

/// Number of pixels seen per colour.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorTally {
    counts: HashMap<Color, u32>,
}

impl ColorTally {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn record(&mut self, color: Color) {
        match self.counts.get_mut(&color) {
            Some(n) => *n += 1,
            None => {
                self.counts.insert(color, 1);
            }
        }
    }

    /// Fold another tally into this one.
    pub fn merge(&mut self, other: ColorTally) {
        for (color, n) in other.counts {
            *self.counts.entry(color).or_insert(0) += n;
        }
    }

    pub fn count_of(&self, color: Color) -> u32 {
        self.counts.get(&color).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Colours seen strictly more than `threshold` times, sorted by colour so
    /// downstream checks visit them in a stable order.
    pub fn survivors(&self, threshold: u32) -> Vec<(Color, u32)> {
        let mut out: Vec<(Color, u32)> = self
            .counts
            .iter()
            .filter(|(_, n)| **n > threshold)
            .map(|(c, n)| (*c, *n))
            .collect();
        out.sort_unstable_by_key(|(c, _)| *c);
        out
    }
}

// ------------------------------------------------------------
// Linear mode
// ------------------------------------------------------------

/// Read a 1-pixel-tall strip left to right and return it reversed, so the
/// lightest entry of a dark-to-light strip comes first.
pub fn extract_linear_palette<S: Surface + ?Sized>(
    surface: &S,
    progress: &mut dyn ProgressSink,
    span: ProgressSpan,
) -> Result<Palette, PaletteError> {
    if surface.height() != 1 {
        return Err(PaletteError::PaletteShape(format!(
            "palette strip must be 1 pixel high, got {}. Use palette to layer to generate one.",
            surface.height()
        )));
    }
    if surface.width() == 0 {
        return Err(PaletteError::InvalidInput("palette strip has zero width".into()));
    }

    let mut colors: Vec<Color> = (0..surface.width()).map(|x| surface.color(x, 0)).collect();
    colors.reverse();

    span.report(progress, 1.0);
    Ok(Palette::from_strip(colors))
}

// ------------------------------------------------------------
// Sorted mode
// ------------------------------------------------------------

/// Count every colour on `surface`, honouring the transparency rule.
pub fn tally_colors<S: Surface + ?Sized>(
    surface: &S,
    include_transparent: bool,
    progress: &mut dyn ProgressSink,
    span: ProgressSpan,
) -> ColorTally {
    let (w, h) = (surface.width(), surface.height());
    let skip_clear = surface.has_alpha() && !include_transparent;
    let mut tally = ColorTally::new();

    for y in 0..h {
        tally_row(surface, y, w, skip_clear, &mut tally);
        span.report(progress, (y + 1) as f32 / h as f32);
    }
    tally
}

#[inline(always)]
fn tally_row<S: Surface + ?Sized>(surface: &S, y: u32, w: u32, skip_clear: bool, tally: &mut ColorTally) {
    for x in 0..w {
        let px = surface.pixel(x, y);
        if skip_clear && px[3] == 0 {
            continue;
        }
        tally.record(Color::from(px));
    }
}

/// Row-parallel variant of [`tally_colors`]. Each worker tallies a band of
/// rows; the partial tallies are merged before anything is sorted.
#[cfg(feature = "threads")]
pub fn tally_colors_par<S: Surface + Sync + ?Sized>(
    surface: &S,
    include_transparent: bool,
    progress: &mut dyn ProgressSink,
    span: ProgressSpan,
) -> ColorTally {
    use rayon::prelude::*;

    let (w, h) = (surface.width(), surface.height());
    let skip_clear = surface.has_alpha() && !include_transparent;

    let tally = (0..h)
        .into_par_iter()
        .fold(ColorTally::new, |mut acc, y| {
            tally_row(surface, y, w, skip_clear, &mut acc);
            acc
        })
        .reduce(ColorTally::new, |mut a, b| {
            a.merge(b);
            a
        });

    span.report(progress, 1.0);
    tally
}

/// Order the surviving colours of `tally` by `order_key`.
///
/// Fails if two distinct survivors share a key.
pub fn sort_tally(
    tally: &ColorTally,
    count_threshold: u32,
    order_key: OrderKey,
) -> Result<Palette, PaletteError> {
    let mut by_key: BTreeMap<u32, Color> = BTreeMap::new();

    for (color, count) in tally.survivors(count_threshold) {
        let key = order_key.key(color);
        match by_key.get(&key) {
            Some(&existing) if existing != color => {
                return Err(PaletteError::AmbiguousOrdering {
                    order_key,
                    key,
                    key_display: order_key.format_key(key),
                    first: existing,
                    first_count: tally.count_of(existing),
                    second: color,
                    second_count: count,
                });
            }
            Some(_) => {}
            None => {
                by_key.insert(key, color);
            }
        }
    }

    Ok(Palette::from_strip(by_key.into_values().collect()))
}

/// Histogram `surface` and return its colours darkest first.
pub fn extract_sorted_palette<S: Surface + Sync + ?Sized>(
    surface: &S,
    options: &ExtractOptions,
    progress: &mut dyn ProgressSink,
    span: ProgressSpan,
) -> Result<Palette, PaletteError> {
    if surface.width() == 0 || surface.height() == 0 {
        return Err(PaletteError::InvalidInput(format!(
            "cannot extract a palette from a {}x{} layer",
            surface.width(),
            surface.height()
        )));
    }

    #[cfg(feature = "threads")]
    let tally = tally_colors_par(surface, options.include_transparent, progress, span);
    #[cfg(not(feature = "threads"))]
    let tally = tally_colors(surface, options.include_transparent, progress, span);

    log::debug!(
        "tallied {} distinct colours over {}x{} pixels",
        tally.len(),
        surface.width(),
        surface.height()
    );

    sort_tally(&tally, options.count_threshold, options.order_key)
}

/// Linear mode for 1-pixel-tall surfaces, Sorted mode for everything else.
pub fn extract_palette_auto<S: Surface + Sync + ?Sized>(
    surface: &S,
    options: &ExtractOptions,
    progress: &mut dyn ProgressSink,
    span: ProgressSpan,
) -> Result<Palette, PaletteError> {
    if surface.height() == 1 {
        extract_linear_palette(surface, progress, span)
    } else {
        extract_sorted_palette(surface, options, progress, span)
    }
}
