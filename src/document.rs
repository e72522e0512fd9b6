//! An in-memory stand-in for the host image: a stack of named layers plus
//! the bits of host state the palette operations bracket (edit groups and
//! the current drawing colour).

use std::ops::{Deref, DerefMut};

use image::{Rgba, RgbImage, RgbaImage};

use crate::color::{Color, Palette};
use crate::error::PaletteError;
use crate::surface::Surface;
use crate::swap::palette_to_strip;

/// Stable handle to a layer. Survives insertions above or below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(usize);

impl LayerId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub name: String,
    pub pixels: RgbaImage,
    /// Whether alpha is meaningful. Opaque layers still store RGBA, with
    /// alpha pinned at 255.
    pub has_alpha: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self { name: name.into(), pixels, has_alpha: true }
    }

    /// A layer without an alpha channel.
    pub fn opaque(name: impl Into<String>, pixels: &RgbImage) -> Self {
        let rgba = RgbaImage::from_fn(pixels.width(), pixels.height(), |x, y| {
            let p = pixels.get_pixel(x, y);
            Rgba([p[0], p[1], p[2], 255])
        });
        Self { name: name.into(), pixels: rgba, has_alpha: false }
    }

    /// An opaque 1-pixel-tall strip holding `palette`, lightest on the left.
    pub fn strip(name: impl Into<String>, palette: &Palette) -> Self {
        Self { name: name.into(), pixels: palette_to_strip(palette), has_alpha: false }
    }
}

impl Surface for Layer {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.pixels.get_pixel(x, y)
    }

    fn set_color(&mut self, x: u32, y: u32, color: Color) {
        self.pixels.set_color(x, y, color);
    }
}

// ------------------------------------------------------------
// Host hooks
// ------------------------------------------------------------

/// What the palette operations need from whatever owns the image.
pub trait EditHost {
    /// Open a group so the following edits undo as one step.
    fn begin_edit_group(&mut self);
    fn end_edit_group(&mut self);

    fn foreground(&self) -> Color;
    fn set_foreground(&mut self, color: Color);

    /// Ask any views of the image to redraw.
    fn flush_displays(&mut self) {}
}

/// Brackets an operation: saves the foreground and opens an edit group on
/// creation, and on drop restores the foreground, closes the group and
/// flushes displays. Runs on every exit path, including early `?` returns.
pub struct EditScope<'a, H: EditHost + ?Sized> {
    host: &'a mut H,
    saved_foreground: Color,
}

impl<'a, H: EditHost + ?Sized> EditScope<'a, H> {
    pub fn open(host: &'a mut H) -> Self {
        let saved_foreground = host.foreground();
        host.begin_edit_group();
        Self { host, saved_foreground }
    }
}

impl<H: EditHost + ?Sized> Deref for EditScope<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: EditHost + ?Sized> DerefMut for EditScope<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: EditHost + ?Sized> Drop for EditScope<'_, H> {
    fn drop(&mut self) {
        self.host.set_foreground(self.saved_foreground);
        self.host.end_edit_group();
        self.host.flush_displays();
    }
}

// ------------------------------------------------------------
// Document
// ------------------------------------------------------------

/// A stack of layers, top first.
#[derive(Clone, Debug, Default)]
pub struct Document {
    layers: Vec<(LayerId, Layer)>,
    next_id: usize,
    foreground: Color,
    open_groups: u32,
    closed_groups: u32,
    display_flushes: u32,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `layer` at stack `position` (0 = top, clamped to the bottom).
    pub fn insert_layer(&mut self, layer: Layer, position: usize) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        let position = position.min(self.layers.len());
        self.layers.insert(position, (id, layer));
        id
    }

    /// Put `layer` on top of the stack.
    pub fn push_layer(&mut self, layer: Layer) -> LayerId {
        self.insert_layer(layer, 0)
    }

    /// Insert `layer` directly above `anchor`.
    pub fn insert_above(&mut self, anchor: LayerId, layer: Layer) -> Result<LayerId, PaletteError> {
        let position = self.position_of(anchor)?;
        Ok(self.insert_layer(layer, position))
    }

    /// Build a strip layer for `palette` and insert it directly above `anchor`.
    pub fn new_strip_layer(&mut self, name: &str, palette: &Palette, anchor: LayerId) -> Result<LayerId, PaletteError> {
        if palette.is_empty() {
            return Err(PaletteError::InvalidInput(format!("cannot build an empty palette strip {name:?}")));
        }
        self.insert_above(anchor, Layer::strip(name, palette))
    }

    pub fn position_of(&self, id: LayerId) -> Result<usize, PaletteError> {
        self.layers
            .iter()
            .position(|(lid, _)| *lid == id)
            .ok_or(PaletteError::UnknownLayer(id.0))
    }

    pub fn layer(&self, id: LayerId) -> Result<&Layer, PaletteError> {
        self.layers
            .iter()
            .find(|(lid, _)| *lid == id)
            .map(|(_, l)| l)
            .ok_or(PaletteError::UnknownLayer(id.0))
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Result<&mut Layer, PaletteError> {
        self.layers
            .iter_mut()
            .find(|(lid, _)| *lid == id)
            .map(|(_, l)| l)
            .ok_or(PaletteError::UnknownLayer(id.0))
    }

    pub fn find_by_name(&self, name: &str) -> Option<LayerId> {
        self.layers.iter().find(|(_, l)| l.name == name).map(|(id, _)| *id)
    }

    /// Layers from top to bottom.
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &Layer)> {
        self.layers.iter().map(|(id, l)| (*id, l))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Edit groups currently open.
    pub fn open_groups(&self) -> u32 {
        self.open_groups
    }

    /// Edit groups opened and closed so far.
    pub fn closed_groups(&self) -> u32 {
        self.closed_groups
    }

    pub fn display_flushes(&self) -> u32 {
        self.display_flushes
    }
}

impl EditHost for Document {
    fn begin_edit_group(&mut self) {
        self.open_groups += 1;
    }

    fn end_edit_group(&mut self) {
        if self.open_groups > 0 {
            self.open_groups -= 1;
            self.closed_groups += 1;
        }
    }

    fn foreground(&self) -> Color {
        self.foreground
    }

    fn set_foreground(&mut self, color: Color) {
        self.foreground = color;
    }

    fn flush_displays(&mut self) {
        self.display_flushes += 1;
    }
}
