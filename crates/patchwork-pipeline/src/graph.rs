//! Pixel adjacency graph.
//!
//! One [`GraphNode`] per pixel, stored in a flat arena addressed by
//! row-major index. Neighbor and parent links are indices into the same
//! arena, so the mutual up/down/left/right relations and the changing
//! disjoint-set parent tree need no shared ownership.
//!
//! Each node keeps a snapshot of its pixel's RGBA value taken at build
//! time. Clustering (see [`crate::forest`]) compares snapshots only and
//! never reads the image again.

use crate::types::{Coordinate, Dimensions, RgbaImage, SegmentError};

/// A single pixel in the adjacency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphNode {
    /// RGBA value of the pixel when the graph was built.
    pub color: [u8; 4],
    /// Index of the pixel above, `None` on the top row.
    pub up: Option<usize>,
    /// Index of the pixel below, `None` on the bottom row.
    pub down: Option<usize>,
    /// Index of the pixel to the left, `None` in the first column.
    pub left: Option<usize>,
    /// Index of the pixel to the right, `None` in the last column.
    pub right: Option<usize>,
    pub(crate) parent: usize,
    pub(crate) rank: u32,
}

impl GraphNode {
    /// Red channel of the snapshot.
    #[must_use]
    pub const fn red(&self) -> u8 {
        self.color[0]
    }

    /// Current disjoint-set parent. Equal to the node's own index for a
    /// set representative.
    #[must_use]
    pub const fn parent(&self) -> usize {
        self.parent
    }

    /// Union-by-rank tree height bound.
    #[must_use]
    pub const fn rank(&self) -> u32 {
        self.rank
    }

    /// Existing neighbors in up, down, left, right order.
    pub fn neighbors(&self) -> impl Iterator<Item = usize> + use<> {
        [self.up, self.down, self.left, self.right]
            .into_iter()
            .flatten()
    }

    /// Euclidean distance between the RGB snapshots of two nodes.
    #[must_use]
    pub fn color_distance(&self, other: &Self) -> f64 {
        self.color[..3]
            .iter()
            .zip(&other.color[..3])
            .map(|(&a, &b)| {
                let d = f64::from(a) - f64::from(b);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}

/// Grid of [`GraphNode`]s covering every pixel of an image.
#[derive(Debug, Clone)]
pub struct PixelGraph {
    dimensions: Dimensions,
    pub(crate) nodes: Vec<GraphNode>,
}

impl PixelGraph {
    /// Build the graph over `image`: one node per pixel, 4-neighbor
    /// links, every node its own singleton set with rank 0.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Allocation`] if the node arena cannot be
    /// reserved.
    pub fn build(image: &RgbaImage) -> Result<Self, SegmentError> {
        let dimensions = Dimensions::of(image);
        let count = dimensions.pixel_count();

        let mut nodes: Vec<GraphNode> = Vec::new();
        nodes
            .try_reserve_exact(count)
            .map_err(|_| SegmentError::allocation::<GraphNode>(count))?;

        for (x, y, pixel) in image.enumerate_pixels() {
            let index = dimensions.index(x, y);
            nodes.push(GraphNode {
                color: pixel.0,
                up: (y > 0).then(|| dimensions.index(x, y - 1)),
                down: (y + 1 < dimensions.height).then(|| dimensions.index(x, y + 1)),
                left: (x > 0).then(|| dimensions.index(x - 1, y)),
                right: (x + 1 < dimensions.width).then(|| dimensions.index(x + 1, y)),
                parent: index,
                rank: 0,
            });
        }

        tracing::debug!(nodes = nodes.len(), "pixel graph built");
        Ok(Self { dimensions, nodes })
    }

    /// Dimensions of the image the graph was built from.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of nodes (one per pixel).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` for a graph over a zero-area image.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in row-major order.
    #[must_use]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Node at arena index `index`.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&GraphNode> {
        self.nodes.get(index)
    }

    /// Arena index of the pixel at `at`, if it is inside the image.
    #[must_use]
    pub const fn index_of(&self, at: Coordinate) -> Option<usize> {
        if self.dimensions.contains(at.x, at.y) {
            Some(self.dimensions.index(at.x, at.y))
        } else {
            None
        }
    }
}
