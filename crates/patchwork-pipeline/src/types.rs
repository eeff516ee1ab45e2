//! Shared types for the patchwork segmentation pipeline.

use serde::{Deserialize, Serialize};

use crate::forest::Partition;

/// Re-export `RgbaImage` so downstream crates can hand pixel buffers to
/// the pipeline without depending on `image` directly.
pub use image::RgbaImage;

/// A pixel position in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    /// Column (pixels from left edge).
    pub x: u32,
    /// Row (pixels from top edge).
    pub y: u32,
}

impl Coordinate {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing image.
    #[must_use]
    pub fn of(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Whether at least one pixel has a full 3x3 neighborhood.
    ///
    /// Images narrower or shorter than 3 pixels have no interior; the
    /// edge filter and region colorer leave them untouched.
    #[must_use]
    pub const fn has_interior(self) -> bool {
        self.width >= 3 && self.height >= 3
    }

    /// Row-major index of `(x, y)`. The caller guarantees the position
    /// is in bounds.
    #[must_use]
    pub const fn index(self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Whether `(x, y)` lies inside `[0, width) x [0, height)`.
    #[must_use]
    pub const fn contains(self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    /// Whether `(x, y)` lies strictly inside the one-pixel border ring,
    /// i.e. in `[1, width - 1) x [1, height - 1)`.
    #[must_use]
    pub const fn is_interior(self, x: u32, y: u32) -> bool {
        x >= 1 && y >= 1 && x < self.width.saturating_sub(1) && y < self.height.saturating_sub(1)
    }
}

/// Configuration for the segmentation pipeline.
///
/// All parameters default to the values the pipeline was tuned with.
/// Use [`validate`](Self::validate) before running on untrusted input
/// (e.g. a config parsed from JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Maximum Euclidean RGB distance (exclusive) at which two adjacent
    /// pixels are merged into the same component.
    pub merge_threshold: f64,

    /// Red-channel value below which a pair of pixels is treated as a
    /// dark boundary and never merged. Both pixels must be below it.
    pub dark_guard: u8,

    /// Red-channel value for the region colorer. Pixels below it seed a
    /// flood fill; the fill spreads through pixels at or below it.
    pub fill_threshold: u8,

    /// Seed for the region color generator. `None` draws from the thread
    /// RNG, so colors differ between runs.
    pub seed: Option<u64>,
}

impl SegmentConfig {
    /// Default color merge distance.
    pub const DEFAULT_MERGE_THRESHOLD: f64 = 28.0;
    /// Default dark-pixel union guard.
    pub const DEFAULT_DARK_GUARD: u8 = 40;
    /// Default flood-fill seed/containment threshold.
    pub const DEFAULT_FILL_THRESHOLD: u8 = 28;

    /// Check the invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::InvalidConfig`] if `merge_threshold` is
    /// NaN, infinite, or negative.
    pub fn validate(&self) -> Result<(), SegmentError> {
        if !self.merge_threshold.is_finite() {
            return Err(SegmentError::InvalidConfig(format!(
                "merge_threshold must be finite, got {}",
                self.merge_threshold
            )));
        }
        if self.merge_threshold < 0.0 {
            return Err(SegmentError::InvalidConfig(format!(
                "merge_threshold must be non-negative, got {}",
                self.merge_threshold
            )));
        }
        Ok(())
    }
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            merge_threshold: Self::DEFAULT_MERGE_THRESHOLD,
            dark_guard: Self::DEFAULT_DARK_GUARD,
            fill_threshold: Self::DEFAULT_FILL_THRESHOLD,
            seed: None,
        }
    }
}

/// Result of running the full segmentation pipeline.
#[derive(Debug, Clone)]
pub struct SegmentResult {
    /// The recolored buffer, same layout and dimensions as the input.
    pub image: RgbaImage,

    /// Color-similarity components over the edge map.
    ///
    /// Computed in full but not used to paint `image`; available for
    /// callers that want component boundaries.
    pub partition: Partition,

    /// Number of flood fills the colorer started.
    pub regions_painted: usize,

    /// Dimensions of the source image in pixels.
    pub dimensions: Dimensions,
}

/// Errors that can occur during pipeline processing.
#[derive(Debug, thiserror::Error)]
pub enum SegmentError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to encode the output image.
    #[error("failed to encode image: {0}")]
    ImageEncode(String),

    /// A raw RGBA buffer does not match its declared dimensions.
    #[error("buffer of {actual} bytes does not hold a {width}x{height} RGBA image")]
    BufferSize {
        /// Declared width in pixels.
        width: u32,
        /// Declared height in pixels.
        height: u32,
        /// Actual buffer length in bytes.
        actual: usize,
    },

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// A working buffer could not be allocated.
    #[error("failed to allocate {bytes} bytes of working memory")]
    Allocation {
        /// Size of the failed request in bytes.
        bytes: usize,
    },
}

impl SegmentError {
    /// Allocation failure for `count` elements of `T`.
    pub(crate) const fn allocation<T>(count: usize) -> Self {
        Self::Allocation {
            bytes: count.saturating_mul(size_of::<T>()),
        }
    }
}
