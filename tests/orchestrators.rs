//! End-to-end checks of the three palette operations against an in-memory document.

use image::{Rgba, RgbaImage};
use palette_swap_wasm::{
    Color, Document, EditHost, ExtractOptions, Layer, NoProgress, Palette, PaletteError, ProgressSpan,
    Surface, SwapOptions, extract_linear_palette, extract_sorted_palette, palette_swap_linear,
    palette_swap_simple, palette_to_layer, palette_to_strip,
};

fn layer_from(name: &str, w: u32, h: u32, f: impl Fn(u32, u32) -> [u8; 4]) -> Layer {
    Layer::new(name, RgbaImage::from_fn(w, h, |x, y| Rgba(f(x, y))))
}

fn strip(name: &str, colors: &[[u8; 3]]) -> Layer {
    layer_from(name, colors.len() as u32, 1, |x, _| {
        let [r, g, b] = colors[x as usize];
        [r, g, b, 255]
    })
}

const BLACK: [u8; 3] = [0, 0, 0];
const GREY: [u8; 3] = [128, 128, 128];
const WHITE: [u8; 3] = [255, 255, 255];
const NAVY: [u8; 3] = [0, 0, 90];
const TEAL: [u8; 3] = [0, 120, 120];
const SAND: [u8; 3] = [230, 210, 160];

fn rgb(c: [u8; 3]) -> Color {
    Color::new(c[0], c[1], c[2])
}

#[test]
fn swap_simple_pairs_by_brightness_rank() {
    let mut doc = Document::new();
    let target = doc.push_layer(layer_from("sprite", 3, 2, |x, _| {
        let c = [BLACK, GREY, WHITE][x as usize];
        [c[0], c[1], c[2], 255]
    }));
    let sample = doc.push_layer(layer_from("sample", 3, 3, |_, y| {
        let c = [SAND, NAVY, TEAL][y as usize];
        [c[0], c[1], c[2], 255]
    }));

    let report = palette_swap_simple(&mut doc, target, sample, &SwapOptions::default(), &mut NoProgress).unwrap();
    assert_eq!(report.new.colors(), &[rgb(NAVY), rgb(TEAL), rgb(SAND)]);
    assert_eq!(report.pixels_changed, 6);

    let sprite = doc.layer(target).unwrap();
    assert_eq!(sprite.color(0, 1), rgb(NAVY));
    assert_eq!(sprite.color(1, 0), rgb(TEAL));
    assert_eq!(sprite.color(2, 1), rgb(SAND));

    // The sample is only read.
    assert_eq!(doc.layer(sample).unwrap().color(0, 0), rgb(SAND));
    assert_eq!(doc.open_groups(), 0);
    assert_eq!(doc.closed_groups(), 1);
}

#[test]
fn swap_simple_reads_strip_samples_linearly() {
    let mut doc = Document::new();
    let target = doc.push_layer(layer_from("sprite", 2, 2, |x, _| if x == 0 { [0, 0, 0, 255] } else { [255, 255, 255, 255] }));
    // Stored light to dark; deliberately not in brightness order to prove the strip is trusted.
    let sample = doc.push_layer(strip("strip", &[NAVY, SAND]));

    palette_swap_simple(&mut doc, target, sample, &SwapOptions::default(), &mut NoProgress).unwrap();
    let sprite = doc.layer(target).unwrap();
    assert_eq!(sprite.color(0, 0), rgb(SAND));
    assert_eq!(sprite.color(1, 0), rgb(NAVY));
}

#[test]
fn swap_simple_light_first_changes_truncation_side() {
    let build = || {
        let mut doc = Document::new();
        let target = doc.push_layer(layer_from("sprite", 2, 2, |x, _| if x == 0 { [0, 0, 0, 255] } else { [255, 255, 255, 255] }));
        let sample = doc.push_layer(layer_from("sample", 3, 2, |x, _| {
            let c = [NAVY, TEAL, SAND][x as usize];
            [c[0], c[1], c[2], 255]
        }));
        (doc, target, sample)
    };

    let (mut doc, target, sample) = build();
    palette_swap_simple(&mut doc, target, sample, &SwapOptions::default(), &mut NoProgress).unwrap();
    let sprite = doc.layer(target).unwrap();
    assert_eq!((sprite.color(0, 0), sprite.color(1, 0)), (rgb(NAVY), rgb(TEAL)));

    let (mut doc, target, sample) = build();
    let opts = SwapOptions { light_first: true, ..Default::default() };
    let report = palette_swap_simple(&mut doc, target, sample, &opts, &mut NoProgress).unwrap();
    assert_eq!(report.old.colors(), &[rgb(WHITE), rgb(BLACK)]);
    let sprite = doc.layer(target).unwrap();
    assert_eq!((sprite.color(0, 0), sprite.color(1, 0)), (rgb(TEAL), rgb(SAND)));
}

#[test]
fn swap_simple_ignores_transparent_and_rare_colours() {
    let mut doc = Document::new();
    let target = doc.push_layer(layer_from("sprite", 4, 1, |x, _| match x {
        0 | 1 => [10, 10, 10, 255],
        2 => [77, 0, 0, 0],
        _ => [10, 10, 10, 255],
    }));
    let sample = doc.push_layer(layer_from("sample", 2, 2, |x, y| match (x, y) {
        (0, 0) => [200, 0, 0, 0],
        _ => [40, 40, 40, 255],
    }));

    let opts = SwapOptions { include_transparent: false, ..Default::default() };
    let report = palette_swap_simple(&mut doc, target, sample, &opts, &mut NoProgress).unwrap();
    assert_eq!(report.new.colors(), &[Color::new(40, 40, 40)]);
    assert_eq!(report.old.colors(), &[Color::new(10, 10, 10)]);

    let sprite = doc.layer(target).unwrap();
    assert_eq!(sprite.pixel(0, 0), Rgba([40, 40, 40, 255]));
    // The transparent pixel's colour was never part of the mapping.
    assert_eq!(sprite.pixel(2, 0), Rgba([77, 0, 0, 0]));
}

#[test]
fn swap_simple_ambiguous_target_leaves_layer_untouched() {
    let mut doc = Document::new();
    doc.set_foreground(Color::new(3, 3, 3));
    // 114*34 == 299*11 + 587*1
    let target = doc.push_layer(layer_from("sprite", 3, 1, |x, _| if x == 0 { [0, 0, 34, 255] } else { [11, 1, 0, 255] }));
    let sample = doc.push_layer(layer_from("sample", 2, 2, |_, _| [1, 2, 3, 255]));
    let before = doc.layer(target).unwrap().clone();

    let err = palette_swap_simple(&mut doc, target, sample, &SwapOptions::default(), &mut NoProgress).unwrap_err();
    match err {
        PaletteError::AmbiguousOrdering { first, first_count, second, second_count, .. } => {
            assert_eq!((first, first_count), (Color::new(0, 0, 34), 1));
            assert_eq!((second, second_count), (Color::new(11, 1, 0), 2));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(doc.layer(target).unwrap(), &before);
    assert_eq!(doc.foreground(), Color::new(3, 3, 3));
    assert_eq!(doc.open_groups(), 0);

    // Dropping the one-pixel colour resolves the ambiguity.
    let opts = SwapOptions { count_threshold: 1, ..Default::default() };
    palette_swap_simple(&mut doc, target, sample, &opts, &mut NoProgress).unwrap();
    assert_eq!(doc.layer(target).unwrap().color(1, 0), Color::new(1, 2, 3));
    assert_eq!(doc.layer(target).unwrap().color(0, 0), Color::new(0, 0, 34));
}

#[test]
fn swap_linear_maps_strips_one_to_one() {
    let mut doc = Document::new();
    let target = doc.push_layer(layer_from("sprite", 3, 1, |x, _| {
        let c = [WHITE, GREY, BLACK][x as usize];
        [c[0], c[1], c[2], 180]
    }));
    let old = doc.push_layer(strip("old", &[WHITE, GREY, BLACK]));
    let new = doc.push_layer(strip("new", &[SAND, TEAL, NAVY]));

    let report = palette_swap_linear(&mut doc, target, old, new, &mut NoProgress).unwrap();
    assert_eq!(report.pixels_changed, 3);
    let sprite = doc.layer(target).unwrap();
    assert_eq!(sprite.pixel(0, 0), Rgba([SAND[0], SAND[1], SAND[2], 180]));
    assert_eq!(sprite.color(1, 0), rgb(TEAL));
    assert_eq!(sprite.color(2, 0), rgb(NAVY));
}

#[test]
fn swap_linear_rejects_mismatched_strips_before_writing() {
    let mut doc = Document::new();
    let target = doc.push_layer(layer_from("sprite", 2, 1, |_, _| [255, 255, 255, 255]));
    let old = doc.push_layer(strip("old", &[WHITE, BLACK]));
    let new = doc.push_layer(strip("new", &[SAND, TEAL, NAVY]));
    let before = doc.layer(target).unwrap().clone();

    let err = palette_swap_linear(&mut doc, target, old, new, &mut NoProgress).unwrap_err();
    assert!(matches!(err, PaletteError::PaletteShape(_)));
    assert_eq!(doc.layer(target).unwrap(), &before);
    assert_eq!(doc.open_groups(), 0);
}

#[test]
fn swap_linear_rejects_tall_strip() {
    let mut doc = Document::new();
    let target = doc.push_layer(layer_from("sprite", 2, 2, |_, _| [0, 0, 0, 255]));
    let old = doc.push_layer(layer_from("old", 2, 2, |_, _| [0, 0, 0, 255]));
    let new = doc.push_layer(strip("new", &[SAND, TEAL]));

    let err = palette_swap_linear(&mut doc, target, old, new, &mut NoProgress).unwrap_err();
    assert!(matches!(err, PaletteError::PaletteShape(_)));
}

#[test]
fn palette_to_layer_inserts_strip_above_source() {
    let mut doc = Document::new();
    let bottom = doc.push_layer(layer_from("background", 1, 1, |_, _| [0, 0, 0, 255]));
    let source = doc.insert_layer(
        layer_from("sprite", 4, 4, |x, y| {
            let c = [NAVY, SAND, TEAL, BLACK][((x + y) % 4) as usize];
            [c[0], c[1], c[2], 255]
        }),
        0,
    );

    let strip_id = palette_to_layer(&mut doc, source, "Palette", &ExtractOptions::default(), &mut NoProgress).unwrap();
    assert_eq!(doc.position_of(strip_id).unwrap() + 1, doc.position_of(source).unwrap());
    assert_eq!(doc.position_of(bottom).unwrap(), 2);

    let strip = doc.layer(strip_id).unwrap();
    assert_eq!(strip.name, "Palette");
    assert_eq!((strip.width(), strip.height()), (4, 1));
    assert!(!strip.has_alpha());
    let stored: Vec<Color> = (0..4).map(|x| strip.color(x, 0)).collect();
    assert_eq!(stored, vec![rgb(SAND), rgb(TEAL), rgb(NAVY), rgb(BLACK)]);
    assert_eq!(doc.closed_groups(), 1);

    // Feeding the strip back as a linear palette gives the sorted palette.
    let sorted = extract_sorted_palette(doc.layer(source).unwrap(), &ExtractOptions::default(), &mut NoProgress, ProgressSpan::FULL).unwrap();
    let linear = extract_linear_palette(strip, &mut NoProgress, ProgressSpan::FULL).unwrap();
    assert_eq!(linear, sorted);
}

#[test]
fn palette_to_layer_rejects_empty_palette() {
    let mut doc = Document::new();
    let source = doc.push_layer(layer_from("ghost", 2, 2, |_, _| [5, 5, 5, 0]));
    let opts = ExtractOptions { include_transparent: false, ..Default::default() };
    let err = palette_to_layer(&mut doc, source, "Palette", &opts, &mut NoProgress).unwrap_err();
    assert!(matches!(err, PaletteError::InvalidInput(_)));
    assert_eq!(doc.len(), 1);
}

#[test]
fn strip_round_trip_for_arbitrary_palette() {
    let colors: Vec<Color> = (0..32u8).map(|i| Color::new(i * 7, 255 - i * 3, i ^ 0x55)).collect();
    let p = Palette::try_from_colors(colors).unwrap();
    let layer = Layer::new("strip", palette_to_strip(&p));
    assert_eq!(extract_linear_palette(&layer, &mut NoProgress, ProgressSpan::FULL).unwrap(), p);
}

#[test]
fn progress_is_monotonic_and_completes() {
    let mut doc = Document::new();
    let target = doc.push_layer(layer_from("sprite", 5, 5, |x, y| [(x * 40) as u8, (y * 3) as u8, 0, 255]));
    let sample = doc.push_layer(layer_from("sample", 5, 5, |x, y| [0, (x * 40) as u8, (y * 3) as u8, 255]));

    let mut updates = Vec::new();
    let mut sink = |f: f32| updates.push(f);
    palette_swap_simple(&mut doc, target, sample, &SwapOptions::default(), &mut sink).unwrap();

    assert!(!updates.is_empty());
    assert!(updates.windows(2).all(|w| w[0] <= w[1] + 1e-6));
    assert!((updates.last().copied().unwrap() - 1.0).abs() < 1e-6);
    assert!(updates.iter().all(|f| (0.0..=1.0).contains(f)));
}

#[test]
fn unknown_layer_is_reported() {
    let mut doc = Document::new();
    let target = doc.push_layer(layer_from("sprite", 1, 1, |_, _| [0, 0, 0, 255]));
    let mut other = Document::new();
    other.push_layer(layer_from("a", 1, 1, |_, _| [0, 0, 0, 255]));
    let foreign = other.push_layer(layer_from("b", 1, 1, |_, _| [0, 0, 0, 255]));

    let err = palette_swap_simple(&mut doc, target, foreign, &SwapOptions::default(), &mut NoProgress).unwrap_err();
    assert!(matches!(err, PaletteError::UnknownLayer(1)));
}
