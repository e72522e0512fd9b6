use std::collections::HashMap;

use crate::color::{Color, Palette};
use crate::surface::{ProgressSink, ProgressSpan, Surface};

/// Positional pairs `old[i] -> new[i]`, cut to the shorter palette.
pub fn palette_map_pairs<'a>(
    old: &'a Palette,
    new: &'a Palette,
) -> impl Iterator<Item = (Color, Color)> + 'a {
    old.iter().copied().zip(new.iter().copied())
}

/// Lookup table from the pairs. When `old` lists a colour twice, the later
/// pair wins. Identity pairs are dropped.
pub fn palette_map_table(old: &Palette, new: &Palette) -> HashMap<Color, Color> {
    let mut table: HashMap<Color, Color> = palette_map_pairs(old, new).collect();
    table.retain(|from, to| from != to);
    table
}

/// Recolour `surface` so every pixel matching `old[i]` becomes `new[i]`.
///
/// One pass over the pixels: each pixel's colour is read before it is
/// written and looked up once, so a pixel recoloured to `new[j]` is never
/// picked up again by a later `old[i]`. A swap `[A, B] -> [B, A]` therefore
/// exchanges the two colours instead of collapsing them. Alpha is left
/// untouched.
///
/// Returns the number of pixels rewritten.
pub fn apply_palette_map<S: Surface + ?Sized>(
    surface: &mut S,
    old: &Palette,
    new: &Palette,
    progress: &mut dyn ProgressSink,
    span: ProgressSpan,
) -> usize {
    if old.len() != new.len() {
        log::warn!(
            "palette lengths differ ({} vs {}); mapping only the first {} colours",
            old.len(),
            new.len(),
            old.len().min(new.len())
        );
    }

    let table = palette_map_table(old, new);
    let (w, h) = (surface.width(), surface.height());
    let mut rewritten = 0;

    if !table.is_empty() {
        for y in 0..h {
            for x in 0..w {
                if let Some(&to) = table.get(&surface.color(x, y)) {
                    surface.set_color(x, y, to);
                    rewritten += 1;
                }
            }
            span.report(progress, (y + 1) as f32 / h as f32);
        }
    }

    log::debug!("recoloured {rewritten} pixels across {} palette entries", table.len());
    span.report(progress, 1.0);
    rewritten
}
