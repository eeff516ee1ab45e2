//! Flat-color region painting by iterative flood fill.
//!
//! [`RegionColorer`] scans the interior of an edge map in row-major
//! order. Every pixel whose red value is below the fill threshold seeds
//! a flood fill that paints the whole 4-connected low-intensity region
//! with one color drawn from a [`ColorSource`].
//!
//! The fill uses an explicit work list rather than recursion, so region
//! size is bounded by memory, not stack depth. Neighbors are only queued
//! when they lie strictly inside the one-pixel border ring; the ring
//! itself is painted only when it is the seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Coordinate, Dimensions, RgbaImage, SegmentConfig, SegmentError};

/// Neighbor offsets visited from each painted pixel.
const DIRECTIONS: [(i32, i32); 4] = [(0, 1), (1, 0), (0, -1), (-1, 0)];

/// Supplies one RGB color per painted region.
pub trait ColorSource {
    /// The color for the next region.
    fn next_color(&mut self) -> [u8; 3];
}

/// Uniformly random colors from a [`StdRng`].
#[derive(Debug, Clone)]
pub struct RandomColors {
    rng: StdRng,
}

impl RandomColors {
    /// Reproducible colors from a fixed seed.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Colors seeded from the operating system's entropy source.
    #[must_use]
    pub fn from_os_rng() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Seeded when `config.seed` is set, OS-seeded otherwise.
    #[must_use]
    pub fn from_config(config: &SegmentConfig) -> Self {
        config.seed.map_or_else(Self::from_os_rng, Self::seeded)
    }
}

impl ColorSource for RandomColors {
    fn next_color(&mut self) -> [u8; 3] {
        [self.rng.random(), self.rng.random(), self.rng.random()]
    }
}

/// Cycles through a fixed list of colors.
///
/// An empty list yields white for every region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedColors {
    colors: Vec<[u8; 3]>,
    next: usize,
}

impl FixedColors {
    /// Create a source that returns `colors` in order, wrapping around.
    #[must_use]
    pub fn new(colors: impl Into<Vec<[u8; 3]>>) -> Self {
        Self {
            colors: colors.into(),
            next: 0,
        }
    }
}

impl ColorSource for FixedColors {
    fn next_color(&mut self) -> [u8; 3] {
        if self.colors.is_empty() {
            return [255, 255, 255];
        }
        let color = self.colors[self.next % self.colors.len()];
        self.next = (self.next + 1) % self.colors.len();
        color
    }
}

/// Counts from one [`RegionColorer::color_regions`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColorSummary {
    /// Flood fills started (one color draw each).
    pub regions: usize,
    /// Pixel writes across all fills. Repainted pixels count again.
    pub pixels_painted: usize,
}

/// Paints contiguous low-intensity regions of an edge map.
#[derive(Debug, Clone)]
pub struct RegionColorer {
    fill_threshold: u8,
    /// Per-pixel id of the fill that last painted it.
    stamps: Vec<u32>,
    generation: u32,
}

impl RegionColorer {
    /// A colorer that seeds below and spreads at or below `fill_threshold`.
    #[must_use]
    pub const fn new(fill_threshold: u8) -> Self {
        Self {
            fill_threshold,
            stamps: Vec::new(),
            generation: 0,
        }
    }

    /// The configured seed/containment threshold.
    #[must_use]
    pub const fn fill_threshold(&self) -> u8 {
        self.fill_threshold
    }

    /// Scan the interior in row-major order and flood-fill every region
    /// whose seed pixel has red below the threshold.
    ///
    /// A painted pixel normally stops qualifying as a seed. If a drawn
    /// color itself has red below the threshold, the scan will reseed
    /// that region with a fresh color; this costs time but never paints
    /// outside the region.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Allocation`] if the stamp buffer or a
    /// flood-fill work list cannot grow. Pixels painted before the
    /// failure stay painted.
    pub fn color_regions(
        &mut self,
        image: &mut RgbaImage,
        colors: &mut dyn ColorSource,
    ) -> Result<ColorSummary, SegmentError> {
        let dims = Dimensions::of(image);
        let mut summary = ColorSummary::default();
        if !dims.has_interior() {
            tracing::warn!(
                width = dims.width,
                height = dims.height,
                "image has no interior pixels, nothing to color"
            );
            return Ok(summary);
        }

        for y in 1..dims.height - 1 {
            for x in 1..dims.width - 1 {
                if image.get_pixel(x, y).0[0] >= self.fill_threshold {
                    continue;
                }
                let color = colors.next_color();
                let painted = self.flood_fill(image, Coordinate::new(x, y), color)?;
                tracing::trace!(x, y, ?color, painted, "region painted");
                summary.regions += 1;
                summary.pixels_painted += painted;
            }
        }

        tracing::debug!(
            regions = summary.regions,
            pixels = summary.pixels_painted,
            threshold = self.fill_threshold,
            "region coloring complete"
        );
        Ok(summary)
    }

    /// Paint the region reachable from `seed` with `color` and return the
    /// number of pixels written.
    ///
    /// A popped position is skipped when it lies outside the image, when
    /// its red value exceeds the threshold, or when this fill has already
    /// painted it. Only neighbors inside `[1, width - 1) x [1, height - 1)`
    /// are queued.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Allocation`] if the stamp buffer or the
    /// work list cannot grow.
    pub fn flood_fill(
        &mut self,
        image: &mut RgbaImage,
        seed: Coordinate,
        color: [u8; 3],
    ) -> Result<usize, SegmentError> {
        let dims = Dimensions::of(image);
        let generation = self.next_generation(dims.pixel_count())?;

        let mut stack: Vec<Coordinate> = Vec::new();
        push(&mut stack, seed)?;

        let mut painted = 0;
        while let Some(Coordinate { x, y }) = stack.pop() {
            if !dims.contains(x, y) {
                continue;
            }
            let index = dims.index(x, y);
            if !self.is_fillable(image, dims, x, y, generation) {
                continue;
            }

            image.get_pixel_mut(x, y).0[..3].copy_from_slice(&color);
            self.stamps[index] = generation;
            painted += 1;

            for (dx, dy) in DIRECTIONS {
                let (Some(nx), Some(ny)) = (x.checked_add_signed(dx), y.checked_add_signed(dy))
                else {
                    continue;
                };
                if dims.is_interior(nx, ny) && self.is_fillable(image, dims, nx, ny, generation) {
                    push(&mut stack, Coordinate::new(nx, ny))?;
                }
            }
        }
        Ok(painted)
    }

    /// Whether the in-bounds pixel `(x, y)` is at or below the threshold
    /// and not yet painted by fill `generation`.
    fn is_fillable(&self, image: &RgbaImage, dims: Dimensions, x: u32, y: u32, generation: u32) -> bool {
        image.get_pixel(x, y).0[0] <= self.fill_threshold
            && self.stamps[dims.index(x, y)] != generation
    }

    /// Size the stamp buffer for `pixel_count` pixels and return a fill id
    /// not yet present in it.
    fn next_generation(&mut self, pixel_count: usize) -> Result<u32, SegmentError> {
        if self.stamps.len() != pixel_count || self.generation == u32::MAX {
            self.stamps.clear();
            self.stamps
                .try_reserve_exact(pixel_count)
                .map_err(|_| SegmentError::allocation::<u32>(pixel_count))?;
            self.stamps.resize(pixel_count, 0);
            self.generation = 0;
        }
        self.generation += 1;
        Ok(self.generation)
    }
}

impl Default for RegionColorer {
    fn default() -> Self {
        Self::new(SegmentConfig::DEFAULT_FILL_THRESHOLD)
    }
}

fn push(stack: &mut Vec<Coordinate>, at: Coordinate) -> Result<(), SegmentError> {
    stack
        .try_reserve(1)
        .map_err(|_| SegmentError::allocation::<Coordinate>(stack.len() + 1))?;
    stack.push(at);
    Ok(())
}
