//! patchwork-pipeline: Pure region segmentation pipeline (sans-IO).
//!
//! Turns a raster image into flat-colored regions through:
//! Sobel edge filter -> pixel graph -> disjoint-set clustering ->
//! flood-fill region coloring.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and RGBA buffers. Reading and writing files lives in
//! `patchwork-cli`.

pub mod codec;
pub mod colorize;
pub mod diagnostics;
pub mod edge;
pub mod forest;
pub mod graph;
pub mod pipeline;
pub mod types;

pub use colorize::{ColorSource, FixedColors, RandomColors, RegionColorer};
pub use forest::{MergeCriteria, Partition};
pub use graph::PixelGraph;
pub use pipeline::Pipeline;
pub use types::{Coordinate, Dimensions, RgbaImage, SegmentConfig, SegmentError, SegmentResult};

/// Segment and recolor a decoded RGBA image.
///
/// # Pipeline steps
///
/// 1. Sobel edge filter, in place (border ring keeps its colors)
/// 2. Pixel graph over the edge map
/// 3. Disjoint-set clustering of color-similar neighbors
/// 4. Flood-fill painting of low-intensity regions, in place
///
/// The partition from step 3 is returned alongside the painted buffer;
/// painting in step 4 does not consult it.
///
/// # Errors
///
/// Returns [`SegmentError::InvalidConfig`] if `config` fails validation
/// and [`SegmentError::Allocation`] if working memory cannot be
/// reserved. On error no partially painted buffer is returned.
pub fn process(
    mut image: RgbaImage,
    config: &SegmentConfig,
    colors: &mut dyn ColorSource,
) -> Result<SegmentResult, SegmentError> {
    config.validate()?;
    let dimensions = Dimensions::of(&image);
    tracing::debug!(
        width = dimensions.width,
        height = dimensions.height,
        "segmenting image"
    );

    // 1. Edge filter.
    edge::sobel_magnitude_in_place(&mut image)?;

    // 2-3. Graph and clustering. The graph is dropped once labeled.
    let partition = {
        let mut graph = PixelGraph::build(&image)?;
        graph.find_components(MergeCriteria::from(config));
        graph.partition()?
    };

    // 4. Region coloring.
    let colored = RegionColorer::new(config.fill_threshold).color_regions(&mut image, colors)?;

    Ok(SegmentResult {
        image,
        partition,
        regions_painted: colored.regions,
        dimensions,
    })
}

/// Decode image bytes and run [`process`] with colors drawn from
/// [`RandomColors::from_config`].
///
/// # Errors
///
/// Returns [`SegmentError::EmptyInput`] if `image_bytes` is empty and
/// [`SegmentError::ImageDecode`] if the image cannot be decoded; the
/// segmentation stages do not run in either case. Otherwise as
/// [`process`].
pub fn process_bytes(
    image_bytes: &[u8],
    config: &SegmentConfig,
) -> Result<SegmentResult, SegmentError> {
    config.validate()?;
    let image = codec::decode_rgba(image_bytes)?;
    let mut colors = RandomColors::from_config(config);
    process(image, config, &mut colors)
}
