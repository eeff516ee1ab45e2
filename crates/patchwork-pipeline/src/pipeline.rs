//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! Unlike [`crate::process`] which runs the entire pipeline in one call,
//! [`Pipeline`] lets the caller drive execution one step at a time:
//!
//! ```rust
//! # use patchwork_pipeline::{Pipeline, SegmentConfig, SegmentError};
//! # use patchwork_pipeline::colorize::RandomColors;
//! # fn run(png: Vec<u8>) -> Result<(), SegmentError> {
//! let config = SegmentConfig::default();
//! let mut colors = RandomColors::from_config(&config);
//! let colored = Pipeline::new(png, config)
//!     .decode()?
//!     .filter()?
//!     .build_graph()?
//!     .cluster()?
//!     .colorize(&mut colors)?;
//!
//! let result = colored.into_result();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline state,
//! carrying the previously computed intermediates.
//!
//! # Memory
//!
//! Stages from [`Filtered`] onward keep both the original RGBA image and
//! the edge map, and [`Colored`] adds the painted output: three
//! full-size buffers. [`GraphBuilt`] additionally holds the node arena,
//! which is dropped as soon as [`GraphBuilt::cluster`] has labeled the
//! components. Callers that only need the painted buffer should prefer
//! [`crate::process`], which filters and paints a single buffer in place.

use crate::colorize::{ColorSource, ColorSummary, RegionColorer};
use crate::diagnostics::{StageMetrics, count_edge_pixels};
use crate::forest::{ClusterSummary, MergeCriteria, Partition};
use crate::graph::PixelGraph;
use crate::types::{Dimensions, RgbaImage, SegmentConfig, SegmentError, SegmentResult};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`decode`](Self::decode) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .decode() to continue"]
pub struct Pending {
    config: SegmentConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Validate the config, decode the source image and advance to the
    /// [`Decoded`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidConfig`] for an invalid config,
    /// [`SegmentError::EmptyInput`] if the source bytes are empty, and
    /// [`SegmentError::ImageDecode`] if the image cannot be decoded.
    pub fn decode(self) -> Result<Decoded, SegmentError> {
        self.config.validate()?;
        let original = crate::codec::decode_rgba(&self.source)?;
        Ok(Decoded {
            config: self.config,
            original,
            source_len: self.source.len(),
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state holding the decoded RGBA image.
///
/// Call [`filter`](Self::filter) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .filter() to continue"]
pub struct Decoded {
    config: SegmentConfig,
    original: RgbaImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let dims = Dimensions::of(&self.original);
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: dims.width,
            height: dims.height,
            pixel_count: dims.pixel_count() as u64,
        }
    }

    /// Run the Sobel edge filter over a copy of the original and advance
    /// to the [`Filtered`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Allocation`] if the edge map or the
    /// filter's scratch buffer cannot be allocated.
    pub fn filter(self) -> Result<Filtered, SegmentError> {
        let mut edges = try_clone(&self.original)?;
        crate::edge::sobel_magnitude_in_place(&mut edges)?;
        Ok(Filtered {
            config: self.config,
            original: self.original,
            edges,
        })
    }
}

// ───────────────────────── Stage 2: Filtered ─────────────────────────

/// Pipeline state after Sobel edge filtering.
///
/// Call [`build_graph`](Self::build_graph) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .build_graph() to continue"]
pub struct Filtered {
    config: SegmentConfig,
    original: RgbaImage,
    edges: RgbaImage,
}

impl Filtered {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// The grayscale edge map (border ring keeps the original colors).
    #[must_use]
    pub const fn edges(&self) -> &RgbaImage {
        &self.edges
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let dims = Dimensions::of(&self.edges);
        let interior = if dims.has_interior() {
            u64::from(dims.width - 2) * u64::from(dims.height - 2)
        } else {
            0
        };
        StageMetrics::EdgeFilter {
            edge_pixel_count: count_edge_pixels(&self.edges),
            interior_pixel_count: interior,
        }
    }

    /// Build the pixel adjacency graph over the edge map and advance to
    /// the [`GraphBuilt`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Allocation`] if the node arena cannot be
    /// allocated.
    pub fn build_graph(self) -> Result<GraphBuilt, SegmentError> {
        let graph = PixelGraph::build(&self.edges)?;
        Ok(GraphBuilt {
            config: self.config,
            original: self.original,
            edges: self.edges,
            graph,
        })
    }
}

// ───────────────────────── Stage 3: GraphBuilt ───────────────────────

/// Pipeline state holding the freshly built pixel graph, every node a
/// singleton set.
///
/// Call [`cluster`](Self::cluster) to advance to the next stage.
#[must_use = "pipeline stages are consumed by advancing — call .cluster() to continue"]
pub struct GraphBuilt {
    config: SegmentConfig,
    original: RgbaImage,
    edges: RgbaImage,
    graph: PixelGraph,
}

impl GraphBuilt {
    /// The pixel graph.
    #[must_use]
    pub const fn graph(&self) -> &PixelGraph {
        &self.graph
    }

    /// The grayscale edge map the graph was built from.
    #[must_use]
    pub const fn edges(&self) -> &RgbaImage {
        &self.edges
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::GraphBuild {
            node_count: self.graph.len(),
        }
    }

    /// Cluster color-similar neighbors, label the components, drop the
    /// graph and advance to the [`Clustered`] stage.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Allocation`] if the label buffers cannot
    /// be allocated.
    pub fn cluster(mut self) -> Result<Clustered, SegmentError> {
        let criteria = MergeCriteria::from(&self.config);
        let summary = self.graph.find_components(criteria);
        let partition = self.graph.partition()?;
        Ok(Clustered {
            config: self.config,
            original: self.original,
            edges: self.edges,
            partition,
            summary,
        })
    }
}

// ───────────────────────── Stage 4: Clustered ────────────────────────

/// Pipeline state after disjoint-set clustering.
///
/// Call [`colorize`](Self::colorize) to advance to the final stage.
#[must_use = "pipeline stages are consumed by advancing — call .colorize() to continue"]
pub struct Clustered {
    config: SegmentConfig,
    original: RgbaImage,
    edges: RgbaImage,
    partition: Partition,
    summary: ClusterSummary,
}

impl Clustered {
    /// Component labels for every pixel.
    #[must_use]
    pub const fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Merge and component counts from the clustering pass.
    #[must_use]
    pub const fn summary(&self) -> ClusterSummary {
        self.summary
    }

    /// The grayscale edge map.
    #[must_use]
    pub const fn edges(&self) -> &RgbaImage {
        &self.edges
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Clustering {
            merge_threshold: self.config.merge_threshold,
            dark_guard: self.config.dark_guard,
            merges: self.summary.merges,
            component_count: self.summary.component_count,
            largest_component: self.partition.largest_component(),
        }
    }

    /// Paint low-intensity regions of a copy of the edge map and advance
    /// to the [`Colored`] stage.
    ///
    /// Painting follows edge-map intensity only; the partition is
    /// carried along unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Allocation`] if the output buffer or the
    /// colorer's working memory cannot be allocated.
    pub fn colorize(self, colors: &mut dyn ColorSource) -> Result<Colored, SegmentError> {
        let mut output = try_clone(&self.edges)?;
        let colored =
            RegionColorer::new(self.config.fill_threshold).color_regions(&mut output, colors)?;
        Ok(Colored {
            config: self.config,
            original: self.original,
            edges: self.edges,
            partition: self.partition,
            output,
            colored,
        })
    }
}

// ───────────────────────── Stage 5: Colored ──────────────────────────

/// Final pipeline state: the painted output is ready.
#[must_use = "call .into_result() to obtain the SegmentResult"]
pub struct Colored {
    config: SegmentConfig,
    original: RgbaImage,
    edges: RgbaImage,
    partition: Partition,
    output: RgbaImage,
    colored: ColorSummary,
}

impl Colored {
    /// The decoded RGBA image.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// The grayscale edge map before painting.
    #[must_use]
    pub const fn edges(&self) -> &RgbaImage {
        &self.edges
    }

    /// The painted output buffer.
    #[must_use]
    pub const fn output(&self) -> &RgbaImage {
        &self.output
    }

    /// Region and pixel counts from the colorer.
    #[must_use]
    pub const fn summary(&self) -> ColorSummary {
        self.colored
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Colorize {
            fill_threshold: self.config.fill_threshold,
            regions: self.colored.regions,
            pixels_painted: self.colored.pixels_painted,
        }
    }

    /// Consume the final stage and return the [`SegmentResult`].
    pub fn into_result(self) -> SegmentResult {
        SegmentResult {
            dimensions: Dimensions::of(&self.output),
            image: self.output,
            partition: self.partition,
            regions_painted: self.colored.regions,
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental segmentation pipeline.
///
/// Created via [`Pipeline::new`] from encoded bytes, or via
/// [`Pipeline::from_rgba`] when the caller already holds a decoded
/// buffer. Each stage method consumes the current state and returns the
/// next, making it a compile-time error to skip stages or call them out
/// of order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline from source image bytes and config.
    ///
    /// No processing is performed; call [`.decode()`](Pending::decode)
    /// to begin.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: SegmentConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }

    /// Start from an already-decoded RGBA buffer.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidConfig`] for an invalid config.
    pub fn from_rgba(image: RgbaImage, config: SegmentConfig) -> Result<Decoded, SegmentError> {
        config.validate()?;
        Ok(Decoded {
            config,
            source_len: image.as_raw().len(),
            original: image,
        })
    }
}

/// Fallible clone of an image buffer.
fn try_clone(image: &RgbaImage) -> Result<RgbaImage, SegmentError> {
    let raw = image.as_raw();
    let mut copy: Vec<u8> = Vec::new();
    copy.try_reserve_exact(raw.len())
        .map_err(|_| SegmentError::allocation::<u8>(raw.len()))?;
    copy.extend_from_slice(raw);
    crate::codec::rgba_from_raw(image.width(), image.height(), copy)
}
