use image::{ImageBuffer, Rgb, RgbImage, Rgba, RgbaImage};

use crate::color::Color;

/// A mutable grid of pixels owned by somebody else.
///
/// The palette code only borrows a surface for the duration of a call: it
/// reads pixels, builds selections and recolours them. Writes through
/// [`Surface::set_color`] and [`Surface::fill_selection`] never touch alpha.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn has_alpha(&self) -> bool;

    /// RGBA value at `(x, y)`. Surfaces without alpha report 255.
    fn pixel(&self, x: u32, y: u32) -> Rgba<u8>;

    /// Replace the RGB part of `(x, y)`, keeping its alpha.
    fn set_color(&mut self, x: u32, y: u32, color: Color);

    fn color(&self, x: u32, y: u32) -> Color {
        Color::from(self.pixel(x, y))
    }

    /// Every pixel whose RGB exactly equals `color`.
    fn select_color(&self, color: Color) -> Selection {
        let (w, h) = (self.width(), self.height());
        let mut selection = Selection::empty(w, h);
        for y in 0..h {
            for x in 0..w {
                if self.color(x, y) == color {
                    selection.add(x, y);
                }
            }
        }
        selection
    }

    /// Recolour every selected pixel, keeping alpha.
    fn fill_selection(&mut self, selection: &Selection, color: Color) {
        for (x, y) in selection.iter() {
            self.set_color(x, y, color);
        }
    }
}

/// A row-major pixel mask with the same dimensions as the surface it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    width: u32,
    height: u32,
    mask: Vec<bool>,
    count: usize,
}

impl Selection {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            mask: vec![false; (width as usize) * (height as usize)],
            count: 0,
        }
    }

    #[inline(always)]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    pub fn add(&mut self, x: u32, y: u32) {
        let idx = self.index(x, y);
        if !self.mask[idx] {
            self.mask[idx] = true;
            self.count += 1;
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.mask[self.index(x, y)]
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Selected `(x, y)` coordinates in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let w = self.width as usize;
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(move |(i, _)| ((i % w) as u32, (i / w) as u32))
    }
}

impl Surface for RgbaImage {
    fn width(&self) -> u32 {
        ImageBuffer::width(self)
    }

    fn height(&self) -> u32 {
        ImageBuffer::height(self)
    }

    fn has_alpha(&self) -> bool {
        true
    }

    fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.get_pixel(x, y)
    }

    fn set_color(&mut self, x: u32, y: u32, color: Color) {
        let p = self.get_pixel_mut(x, y);
        p[0] = color.r;
        p[1] = color.g;
        p[2] = color.b;
    }
}

impl Surface for RgbImage {
    fn width(&self) -> u32 {
        ImageBuffer::width(self)
    }

    fn height(&self) -> u32 {
        ImageBuffer::height(self)
    }

    fn has_alpha(&self) -> bool {
        false
    }

    fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        let Rgb([r, g, b]) = *self.get_pixel(x, y);
        Rgba([r, g, b, 255])
    }

    fn set_color(&mut self, x: u32, y: u32, color: Color) {
        self.put_pixel(x, y, Rgb::from(color));
    }
}

// ------------------------------------------------------------
// Progress reporting
// ------------------------------------------------------------

/// Receives completion fractions in `[0, 1]`. Purely advisory.
pub trait ProgressSink {
    fn update(&mut self, fraction: f32);
}

impl<F: FnMut(f32)> ProgressSink for F {
    fn update(&mut self, fraction: f32) {
        self(fraction)
    }
}

/// Discards every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn update(&mut self, _fraction: f32) {}
}

/// Forwards updates to the `log` facade at debug level.
#[derive(Clone, Debug, Default)]
pub struct LogProgress {
    last_percent: Option<u32>,
}

impl ProgressSink for LogProgress {
    fn update(&mut self, fraction: f32) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            log::debug!("progress: {percent}%");
        }
    }
}

/// The slice of the overall progress bar that one sub-step owns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgressSpan {
    pub start: f32,
    pub fraction: f32,
}

impl ProgressSpan {
    pub const FULL: ProgressSpan = ProgressSpan { start: 0.0, fraction: 1.0 };

    pub const fn new(start: f32, fraction: f32) -> Self {
        Self { start, fraction }
    }

    /// Report `local` (0..=1 within this span) as an overall fraction.
    pub fn report(&self, sink: &mut dyn ProgressSink, local: f32) {
        let overall = self.start + self.fraction * local.clamp(0.0, 1.0);
        sink.update(overall.clamp(0.0, 1.0));
    }
}
