//! Integration tests: drive the public API end to end on small synthetic
//! images with known edge maps.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use image::Rgba;
use patchwork_pipeline::colorize::ColorSummary;
use patchwork_pipeline::{
    Coordinate, FixedColors, Pipeline, RegionColorer, RgbaImage, SegmentConfig, codec,
};

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

fn on_border(x: u32, y: u32, w: u32, h: u32) -> bool {
    x == 0 || y == 0 || x == w - 1 || y == h - 1
}

#[test]
fn black_square_floods_interior_with_one_color() {
    let png = codec::encode_png(&RgbaImage::from_pixel(5, 5, BLACK)).unwrap();
    let config = SegmentConfig {
        seed: Some(1),
        ..SegmentConfig::default()
    };

    let result = patchwork_pipeline::process_bytes(&png, &config).expect("pipeline should succeed");
    let out = codec::decode_rgba(&codec::encode_png(&result.image).unwrap()).unwrap();

    let interior_color = out.get_pixel(1, 1).0;
    for (x, y, p) in out.enumerate_pixels() {
        if on_border(x, y, 5, 5) {
            assert_eq!(*p, BLACK, "border ({x}, {y}) changed");
        } else {
            assert_eq!(p.0[..3], interior_color[..3], "interior ({x}, {y})");
            assert_eq!(p.0[3], 255);
        }
    }
    assert!(result.regions_painted >= 1);
}

#[test]
fn bright_line_splits_clusters_and_paints_center_row() {
    let img = RgbaImage::from_fn(5, 5, |_, y| if y == 2 { WHITE } else { BLACK });
    let clustered = Pipeline::from_rgba(img, SegmentConfig::default())
        .unwrap()
        .filter()
        .unwrap()
        .build_graph()
        .unwrap()
        .cluster()
        .unwrap();

    let edges = clustered.edges();
    for x in 1..4 {
        assert_eq!(edges.get_pixel(x, 1).0[0], 255);
        assert_eq!(edges.get_pixel(x, 2).0[0], 0);
        assert_eq!(edges.get_pixel(x, 3).0[0], 255);
    }

    let partition = clustered.partition();
    assert!(partition.same_component(Coordinate::new(1, 1), Coordinate::new(3, 1)));
    assert!(partition.same_component(Coordinate::new(1, 3), Coordinate::new(3, 3)));
    assert!(!partition.same_component(Coordinate::new(2, 1), Coordinate::new(2, 3)));
    let multi_pixel = partition
        .component_sizes()
        .into_iter()
        .filter(|&size| size >= 3)
        .count();
    assert!(multi_pixel >= 2);

    let colored = clustered
        .colorize(&mut FixedColors::new([[180, 60, 20]]))
        .unwrap();
    assert_eq!(colored.summary().regions, 1);
    let out = colored.output();
    for x in 1..4 {
        assert_eq!(out.get_pixel(x, 2).0, [180, 60, 20, 255]);
        assert_eq!(out.get_pixel(x, 1).0[0], 255);
        assert_eq!(out.get_pixel(x, 3).0[0], 255);
    }
    // The border keeps the original bright line ends.
    assert_eq!(*out.get_pixel(0, 2), WHITE);
    assert_eq!(*out.get_pixel(4, 2), WHITE);
}

#[test]
fn recoloring_a_painted_buffer_is_a_noop() {
    let img = RgbaImage::from_fn(9, 7, |x, y| if (x * y) % 4 == 1 { WHITE } else { BLACK });
    let mut colors = FixedColors::new([[64, 128, 192], [200, 100, 50]]);
    let result = patchwork_pipeline::process(img, &SegmentConfig::default(), &mut colors).unwrap();

    let mut again = result.image.clone();
    let summary = RegionColorer::default()
        .color_regions(&mut again, &mut colors)
        .unwrap();
    assert_eq!(summary, ColorSummary::default());
    assert_eq!(again, result.image);
}

#[test]
fn raw_buffer_round_trips_through_png() {
    let raw: Vec<u8> = (0..6 * 4 * 4).map(|i| (i * 7 % 256) as u8).collect();
    let img = codec::rgba_from_raw(6, 4, raw.clone()).unwrap();
    let result = patchwork_pipeline::process(
        img,
        &SegmentConfig::default(),
        &mut FixedColors::new([[255, 255, 255]]),
    )
    .unwrap();

    assert_eq!(result.image.dimensions(), (6, 4));
    assert_eq!(result.image.as_raw().len(), raw.len());
    let decoded = codec::decode_rgba(&codec::encode_png(&result.image).unwrap()).unwrap();
    assert_eq!(decoded, result.image);
}
