//! The three user-facing operations, run against a [`Document`].
//!
//! Each one brackets its work in an [`EditScope`] so the host sees a single
//! undoable edit and gets its foreground colour back, even on failure.

use image::RgbaImage;

use crate::color::{OrderKey, Palette};
use crate::document::{Document, EditScope, LayerId};
use crate::error::PaletteError;
use crate::extract::{ExtractOptions, extract_linear_palette, extract_palette_auto, extract_sorted_palette};
use crate::mapper::apply_palette_map;
use crate::surface::{ProgressSink, ProgressSpan};

const SAMPLE_SPAN: ProgressSpan = ProgressSpan::new(0.0, 0.4);
const TARGET_SPAN: ProgressSpan = ProgressSpan::new(0.4, 0.4);
const MAP_SPAN: ProgressSpan = ProgressSpan::new(0.8, 0.2);

/// Options for [`palette_swap_simple`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapOptions {
    /// Sample colours from fully transparent pixels too.
    pub include_transparent: bool,
    /// Pair lightest with lightest instead of darkest with darkest. Only
    /// matters when the two palettes differ in length.
    pub light_first: bool,
    /// Ignore colours with this many pixels or fewer.
    pub count_threshold: u32,
    pub order_key: OrderKey,
}

impl Default for SwapOptions {
    fn default() -> Self {
        Self {
            include_transparent: true,
            light_first: false,
            count_threshold: 0,
            order_key: OrderKey::Brightness,
        }
    }
}

impl SwapOptions {
    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            include_transparent: self.include_transparent,
            count_threshold: self.count_threshold,
            order_key: self.order_key,
        }
    }
}

/// What a swap did: the palettes as they were paired, and how many pixels
/// changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapReport {
    pub old: Palette,
    pub new: Palette,
    pub pixels_changed: usize,
}

/// Rank the colours of `sample` and of `target`, then recolour `target` so
/// each of its colours takes the sample colour of the same rank.
///
/// A 1-pixel-tall sample is read as a palette strip; anything else is
/// histogrammed. The target is always histogrammed.
pub fn palette_swap_simple(
    doc: &mut Document,
    target: LayerId,
    sample: LayerId,
    options: &SwapOptions,
    progress: &mut dyn ProgressSink,
) -> Result<SwapReport, PaletteError> {
    let mut scope = EditScope::open(doc);
    let extract = options.extract_options();

    let sample_layer = scope.layer(sample)?;
    let target_name = scope.layer(target)?.name.clone();
    log::info!("Swapping palette from {} onto {}...", sample_layer.name, target_name);

    log::info!("Finding {} palette...", sample_layer.name);
    let mut new = extract_palette_auto(sample_layer, &extract, progress, SAMPLE_SPAN)?;
    log::debug!("{} palette: {:?}", sample_layer.name, new.to_hex());

    log::info!("Finding {target_name} palette...");
    let mut old = extract_sorted_palette(scope.layer(target)?, &extract, progress, TARGET_SPAN)?;
    log::debug!("{target_name} palette: {:?}", old.to_hex());

    if options.light_first {
        old.reverse();
        new.reverse();
    }

    let layer = scope.layer_mut(target)?;
    let pixels_changed = apply_palette_map(layer, &old, &new, progress, MAP_SPAN);

    Ok(SwapReport { old, new, pixels_changed })
}

/// Recolour `target` using two hand-made palette strips that line up 1:1.
///
/// Both strips must be 1 pixel tall and equally wide. Everything is
/// validated before the first pixel is written.
pub fn palette_swap_linear(
    doc: &mut Document,
    target: LayerId,
    old_strip: LayerId,
    new_strip: LayerId,
    progress: &mut dyn ProgressSink,
) -> Result<SwapReport, PaletteError> {
    let mut scope = EditScope::open(doc);

    let old_layer = scope.layer(old_strip)?;
    let new_layer = scope.layer(new_strip)?;
    let target_name = scope.layer(target)?.name.clone();
    log::info!(
        "Swapping palette from {} to {} for {}...",
        old_layer.name,
        new_layer.name,
        target_name
    );

    log::info!("Finding {} palette...", new_layer.name);
    let new = extract_linear_palette(new_layer, progress, SAMPLE_SPAN)?;

    log::info!("Finding {} palette...", old_layer.name);
    let old = extract_linear_palette(old_layer, progress, TARGET_SPAN)?;

    if old.len() != new.len() {
        return Err(PaletteError::PaletteShape(format!(
            "palettes are differing lengths: {} has {} colours, {} has {}",
            old_layer.name,
            old.len(),
            new_layer.name,
            new.len()
        )));
    }

    let layer = scope.layer_mut(target)?;
    let pixels_changed = apply_palette_map(layer, &old, &new, progress, MAP_SPAN);

    Ok(SwapReport { old, new, pixels_changed })
}

/// Extract the palette of `source` and add it as a 1-pixel-tall strip layer
/// called `name` directly above `source`. Returns the new layer's handle.
pub fn palette_to_layer(
    doc: &mut Document,
    source: LayerId,
    name: &str,
    options: &ExtractOptions,
    progress: &mut dyn ProgressSink,
) -> Result<LayerId, PaletteError> {
    let mut scope = EditScope::open(doc);

    let source_layer = scope.layer(source)?;
    log::info!("Finding {} palette...", source_layer.name);
    let palette = extract_sorted_palette(source_layer, options, progress, ProgressSpan::FULL)?;
    log::debug!("{} palette: {:?}", source_layer.name, palette.to_hex());

    if palette.is_empty() {
        return Err(PaletteError::InvalidInput(format!(
            "no colours in {} survived extraction; cannot build an empty strip",
            source_layer.name
        )));
    }

    scope.new_strip_layer(name, &palette, source)
}

/// Lay a palette out as a fully opaque 1-pixel-tall strip.
///
/// Strips store the lightest colour on the left, so the palette (darkest
/// first) is written in reverse. Reading the strip back with
/// [`extract_linear_palette`] yields the same palette.
pub fn palette_to_strip(palette: &Palette) -> RgbaImage {
    let colors = palette.colors();
    let n = colors.len();
    RgbaImage::from_fn(n as u32, 1, |x, _| colors[n - 1 - x as usize].to_rgba(255))
}
