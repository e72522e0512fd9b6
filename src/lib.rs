use wasm_bindgen::prelude::*;
use image::{DynamicImage, ImageFormat, RgbaImage};
use js_sys::{Array, Object, Reflect, Uint8Array};
#[cfg(not(target_arch = "wasm32"))]
use anyhow::{Context, Result};

pub mod color;
pub mod document;
pub mod error;
pub mod extract;
pub mod mapper;
pub mod surface;
pub mod swap;

pub use color::{Color, OrderKey, Palette};
pub use document::{Document, EditHost, EditScope, Layer, LayerId};
pub use error::PaletteError;
pub use extract::{
    ColorTally, ExtractOptions, extract_linear_palette, extract_palette_auto, extract_sorted_palette,
};
pub use mapper::{apply_palette_map, palette_map_pairs, palette_map_table};
pub use surface::{LogProgress, NoProgress, ProgressSink, ProgressSpan, Selection, Surface};
pub use swap::{SwapOptions, SwapReport, palette_swap_linear, palette_swap_simple, palette_to_layer, palette_to_strip};

// ------------------------------------------------------------
// PNG helpers
// ------------------------------------------------------------

/// Decode any format `image` understands into a layer. Formats without an
/// alpha channel give a layer whose transparency rule never applies.
pub fn decode_layer(name: &str, bytes: &[u8]) -> Result<Layer, PaletteError> {
    let img = image::load_from_memory(bytes)?;
    let has_alpha = img.color().has_alpha();
    Ok(Layer { name: name.to_string(), pixels: img.to_rgba8(), has_alpha })
}

/// PNG-encode a layer, dropping the alpha channel if the layer has none.
pub fn encode_layer_png(layer: &Layer) -> Result<Vec<u8>, PaletteError> {
    encode_png(&layer.pixels, layer.has_alpha)
}

fn encode_png(pixels: &RgbaImage, keep_alpha: bool) -> Result<Vec<u8>, PaletteError> {
    let img = DynamicImage::ImageRgba8(pixels.clone());
    let img = if keep_alpha { img } else { DynamicImage::ImageRgb8(img.to_rgb8()) };

    let mut buf = Vec::new();
    {
        let mut cursor = std::io::Cursor::new(&mut buf);
        img.write_to(&mut cursor, ImageFormat::Png)?;
    }
    Ok(buf)
}

/// Swap `target`'s palette for the one sampled from `sample`, returning the
/// recoloured target and the report.
fn swap_layers(target: Layer, sample: Layer, options: &SwapOptions) -> Result<(Layer, SwapReport), PaletteError> {
    let mut doc = Document::new();
    let target_id = doc.push_layer(target);
    let sample_id = doc.push_layer(sample);
    let report = palette_swap_simple(&mut doc, target_id, sample_id, options, &mut LogProgress::default())?;
    Ok((doc.layer(target_id)?.clone(), report))
}

fn swap_linear_layers(target: Layer, old_strip: Layer, new_strip: Layer) -> Result<(Layer, SwapReport), PaletteError> {
    let mut doc = Document::new();
    let target_id = doc.push_layer(target);
    let old_id = doc.push_layer(old_strip);
    let new_id = doc.push_layer(new_strip);
    let report = palette_swap_linear(&mut doc, target_id, old_id, new_id, &mut LogProgress::default())?;
    Ok((doc.layer(target_id)?.clone(), report))
}

fn strip_for_layer(source: Layer, options: &ExtractOptions) -> Result<Layer, PaletteError> {
    let mut doc = Document::new();
    let source_id = doc.push_layer(source);
    let strip_id = palette_to_layer(&mut doc, source_id, "Palette", options, &mut LogProgress::default())?;
    Ok(doc.layer(strip_id)?.clone())
}

/// Palette of a strip layer, in stored (left to right) order.
fn strip_hex(strip: &Layer) -> Vec<String> {
    (0..strip.width()).map(|x| strip.color(x, 0).to_hex()).collect()
}

// ------------------------------------------------------------
// wasm entry points
// ------------------------------------------------------------

fn js_err(e: PaletteError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn js_result(png: Vec<u8>, palette_hex: Vec<String>) -> Result<Object, JsValue> {
    let img_js = Uint8Array::from(png.as_slice());
    let palette_js = Array::new();
    for hex in palette_hex {
        palette_js.push(&JsValue::from_str(&hex));
    }

    let result = Object::new();
    Reflect::set(&result, &JsValue::from_str("image"), &img_js)?;
    Reflect::set(&result, &JsValue::from_str("palette"), &palette_js)?;
    Ok(result)
}

/// Recolour `target` with the palette ranked from `sample`.
///
/// Both inputs are encoded images. The returned object holds the recoloured
/// PNG under `image` and the sample palette, darkest first, under `palette`.
#[wasm_bindgen(js_name = paletteSwap)]
pub fn palette_swap_png(
    target: Vec<u8>,
    sample: Vec<u8>,
    include_transparent: bool,
    light_first: bool,
    count_threshold: u32,
) -> Result<Object, JsValue> {
    let target = decode_layer("target", &target).map_err(js_err)?;
    let sample = decode_layer("sample", &sample).map_err(js_err)?;
    let options = SwapOptions { include_transparent, light_first, count_threshold, ..Default::default() };

    let (recoloured, report) = swap_layers(target, sample, &options).map_err(js_err)?;
    let png = encode_layer_png(&recoloured).map_err(js_err)?;
    js_result(png, report.new.to_hex())
}

/// Recolour `target` from one palette strip to another.
#[wasm_bindgen(js_name = paletteSwapLinear)]
pub fn palette_swap_linear_png(target: Vec<u8>, old_strip: Vec<u8>, new_strip: Vec<u8>) -> Result<Object, JsValue> {
    let target = decode_layer("target", &target).map_err(js_err)?;
    let old_strip = decode_layer("old palette", &old_strip).map_err(js_err)?;
    let new_strip = decode_layer("new palette", &new_strip).map_err(js_err)?;

    let (recoloured, report) = swap_linear_layers(target, old_strip, new_strip).map_err(js_err)?;
    let png = encode_layer_png(&recoloured).map_err(js_err)?;
    js_result(png, report.new.to_hex())
}

/// Build a palette strip from `source`. `image` is the strip PNG and
/// `palette` lists its colours left to right.
#[wasm_bindgen(js_name = paletteToLayer)]
pub fn palette_to_layer_png(source: Vec<u8>, include_transparent: bool, count_threshold: u32) -> Result<Object, JsValue> {
    let source = decode_layer("source", &source).map_err(js_err)?;
    let options = ExtractOptions { include_transparent, count_threshold, ..Default::default() };

    let strip = strip_for_layer(source, &options).map_err(js_err)?;
    let png = encode_layer_png(&strip).map_err(js_err)?;
    js_result(png, strip_hex(&strip))
}

// ------------------------------------------------------------
// Native byte-level API
// ------------------------------------------------------------

/// Recolour the `target` image with the palette ranked from `sample`.
/// Returns the PNG and the sample palette (darkest first) as hex.
#[cfg(not(target_arch = "wasm32"))]
pub fn palette_swap_bytes(target: &[u8], sample: &[u8], options: &SwapOptions) -> Result<(Vec<u8>, Vec<String>)> {
    let target = decode_layer("target", target).context("decoding target image")?;
    let sample = decode_layer("sample", sample).context("decoding sample image")?;
    let (recoloured, report) = swap_layers(target, sample, options)?;
    Ok((encode_layer_png(&recoloured)?, report.new.to_hex()))
}

/// Like [`palette_swap_bytes`], but with an explicit palette listed darkest
/// first instead of a sample image.
#[cfg(not(target_arch = "wasm32"))]
pub fn palette_swap_with_palette_bytes(
    target: &[u8],
    palette: &Palette,
    options: &SwapOptions,
) -> Result<(Vec<u8>, Vec<String>)> {
    if palette.is_empty() {
        anyhow::bail!("replacement palette is empty");
    }
    let target = decode_layer("target", target).context("decoding target image")?;
    let sample = Layer::strip("palette", palette);
    let (recoloured, report) = swap_layers(target, sample, options)?;
    Ok((encode_layer_png(&recoloured)?, report.new.to_hex()))
}

/// Recolour `target` from the `old_strip` palette to the `new_strip` one.
#[cfg(not(target_arch = "wasm32"))]
pub fn palette_swap_linear_bytes(target: &[u8], old_strip: &[u8], new_strip: &[u8]) -> Result<(Vec<u8>, Vec<String>)> {
    let target = decode_layer("target", target).context("decoding target image")?;
    let old_strip = decode_layer("old palette", old_strip).context("decoding old palette strip")?;
    let new_strip = decode_layer("new palette", new_strip).context("decoding new palette strip")?;
    let (recoloured, report) = swap_linear_layers(target, old_strip, new_strip)?;
    Ok((encode_layer_png(&recoloured)?, report.new.to_hex()))
}

/// Build a palette strip PNG from `source`. Returns the PNG and its colours
/// left to right.
#[cfg(not(target_arch = "wasm32"))]
pub fn palette_to_layer_bytes(source: &[u8], options: &ExtractOptions) -> Result<(Vec<u8>, Vec<String>)> {
    let source = decode_layer("source", source).context("decoding source image")?;
    let strip = strip_for_layer(source, options)?;
    Ok((encode_layer_png(&strip)?, strip_hex(&strip)))
}

/// Palette of an image as hex strings, darkest first. 1-pixel-tall images
/// are read as strips, anything else is histogrammed.
#[cfg(not(target_arch = "wasm32"))]
pub fn extract_palette_bytes(input: &[u8], options: &ExtractOptions) -> Result<Vec<String>> {
    let layer = decode_layer("input", input).context("decoding input image")?;
    let palette = extract_palette_auto(&layer, options, &mut LogProgress::default(), ProgressSpan::FULL)?;
    Ok(palette.to_hex())
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use image::Rgba;

    fn png(img: &RgbaImage) -> Vec<u8> {
        encode_png(img, true).unwrap()
    }

    #[test]
    fn test_decode_encode_keeps_pixels() {
        let img = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8 * 40, y as u8 * 90, 7, 200]));
        let layer = decode_layer("l", &png(&img)).unwrap();
        assert!(layer.has_alpha);
        assert_eq!(layer.pixels, img);
    }

    #[test]
    fn test_swap_bytes_recolours() {
        let target = RgbaImage::from_fn(2, 2, |x, _| if x == 0 { Rgba([0, 0, 0, 255]) } else { Rgba([250, 250, 250, 255]) });
        let sample = RgbaImage::from_fn(2, 2, |_, y| if y == 0 { Rgba([20, 0, 0, 255]) } else { Rgba([0, 0, 200, 255]) });

        let (out, hex) = palette_swap_bytes(&png(&target), &png(&sample), &SwapOptions::default()).unwrap();
        // Red (5.98) is darker than blue (22.8) by weighted brightness.
        assert_eq!(hex, vec!["140000", "0000C8"]);
        let out = decode_layer("out", &out).unwrap();
        assert_eq!(*out.pixels.get_pixel(0, 0), Rgba([20, 0, 0, 255]));
        assert_eq!(*out.pixels.get_pixel(1, 1), Rgba([0, 0, 200, 255]));
    }

    #[test]
    fn test_to_layer_bytes_stores_light_first() {
        let source = RgbaImage::from_fn(2, 1, |x, _| if x == 0 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) });
        let (strip_png, hex) = palette_to_layer_bytes(&png(&source), &ExtractOptions::default()).unwrap();
        assert_eq!(hex, vec!["FFFFFF", "000000"]);

        let strip = decode_layer("strip", &strip_png).unwrap();
        assert!(!strip.has_alpha);
        assert_eq!(strip.pixels.dimensions(), (2, 1));
        assert_eq!(extract_palette_bytes(&strip_png, &ExtractOptions::default()).unwrap(), vec!["000000", "FFFFFF"]);
    }

    #[test]
    fn test_swap_with_explicit_palette() {
        let target = RgbaImage::from_fn(2, 2, |x, _| if x == 0 { Rgba([5, 5, 5, 255]) } else { Rgba([99, 99, 99, 128]) });
        let palette = Palette::from_hex_list(&["#102030", "#F0E0D0"]).unwrap();
        let (out, _) = palette_swap_with_palette_bytes(&png(&target), &palette, &SwapOptions::default()).unwrap();
        let out = decode_layer("out", &out).unwrap();
        assert_eq!(*out.pixels.get_pixel(0, 1), Rgba([0x10, 0x20, 0x30, 255]));
        assert_eq!(*out.pixels.get_pixel(1, 0), Rgba([0xF0, 0xE0, 0xD0, 128]));
    }

    #[test]
    fn test_linear_bytes_length_mismatch() {
        let target = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let old = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        let new = RgbaImage::from_pixel(3, 1, Rgba([9, 9, 9, 255]));
        let err = palette_swap_linear_bytes(&png(&target), &png(&old), &png(&new)).unwrap_err();
        assert!(matches!(err.downcast_ref::<PaletteError>(), Some(PaletteError::PaletteShape(_))));
    }
}
