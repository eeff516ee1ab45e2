//! Disjoint-set clustering over a [`PixelGraph`].
//!
//! The forest lives inside the graph's node arena: each node's `parent`
//! index points toward its set representative, and `rank` bounds the
//! tree height. [`PixelGraph::find`] halves paths as it walks them and
//! [`PixelGraph::union`] merges by rank, so a full
//! [`find_components`](PixelGraph::find_components) pass is close to
//! linear in the pixel count.
//!
//! Merges are gated on color: two pixels join only when their RGB
//! snapshots are closer than the merge threshold, and never when both
//! are darker than the dark guard (strong boundaries in the edge map).

use serde::{Deserialize, Serialize};

use crate::graph::PixelGraph;
use crate::types::{Coordinate, Dimensions, SegmentConfig, SegmentError};

/// Thresholds deciding whether two adjacent nodes may merge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeCriteria {
    /// Merge only when the RGB distance is strictly below this.
    pub threshold: f64,
    /// Never merge when both red snapshots are below this.
    pub dark_guard: u8,
}

impl From<&SegmentConfig> for MergeCriteria {
    fn from(config: &SegmentConfig) -> Self {
        Self {
            threshold: config.merge_threshold,
            dark_guard: config.dark_guard,
        }
    }
}

impl Default for MergeCriteria {
    fn default() -> Self {
        Self::from(&SegmentConfig::default())
    }
}

/// Counts from one [`find_components`](PixelGraph::find_components) pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Number of unions that joined two distinct sets.
    pub merges: usize,
    /// Number of sets remaining after the pass.
    pub component_count: usize,
}

impl PixelGraph {
    /// Representative of the set containing node `index`.
    ///
    /// Every visited node is re-pointed at its grandparent on the way
    /// up, so repeated lookups flatten the tree.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a node of this graph.
    pub fn find(&mut self, index: usize) -> usize {
        let mut current = index;
        loop {
            let parent = self.nodes[current].parent;
            if parent == current {
                return current;
            }
            let grandparent = self.nodes[parent].parent;
            self.nodes[current].parent = grandparent;
            current = grandparent;
        }
    }

    /// Merge the sets containing nodes `a` and `b` if their snapshots
    /// are similar enough. Returns `true` if two distinct sets were
    /// joined.
    ///
    /// The shallower tree goes under the deeper one; on a rank tie `a`'s
    /// root goes under `b`'s root and `b`'s root gains a rank.
    ///
    /// # Panics
    ///
    /// Panics if `a` or `b` is not a node of this graph.
    pub fn union(&mut self, a: usize, b: usize, criteria: MergeCriteria) -> bool {
        let node_a = self.nodes[a];
        let node_b = self.nodes[b];
        if node_a.red() < criteria.dark_guard && node_b.red() < criteria.dark_guard {
            return false;
        }

        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b || node_a.color_distance(&node_b) >= criteria.threshold {
            return false;
        }

        let rank_a = self.nodes[root_a].rank;
        let rank_b = self.nodes[root_b].rank;
        if rank_a > rank_b {
            self.nodes[root_b].parent = root_a;
        } else {
            self.nodes[root_a].parent = root_b;
            if rank_a == rank_b {
                self.nodes[root_b].rank += 1;
            }
        }
        true
    }

    /// Try to union every node with each of its neighbors.
    ///
    /// Each edge is attempted from both ends; the second attempt is a
    /// no-op once the first has merged.
    pub fn find_components(&mut self, criteria: MergeCriteria) -> ClusterSummary {
        let mut merges = 0;
        for index in 0..self.nodes.len() {
            for neighbor in self.nodes[index].neighbors() {
                if self.union(index, neighbor, criteria) {
                    merges += 1;
                }
            }
        }

        let summary = ClusterSummary {
            merges,
            component_count: self.nodes.len() - merges,
        };
        tracing::debug!(
            merges = summary.merges,
            components = summary.component_count,
            threshold = criteria.threshold,
            dark_guard = criteria.dark_guard,
            "clustering complete"
        );
        summary
    }

    /// Snapshot the current sets as dense component labels.
    ///
    /// Labels are numbered `0..component_count` in row-major order of
    /// each component's first pixel.
    ///
    /// # Errors
    ///
    /// Returns [`SegmentError::Allocation`] if the label buffers cannot
    /// be reserved.
    pub fn partition(&mut self) -> Result<Partition, SegmentError> {
        let count = self.nodes.len();
        let mut root_labels: Vec<usize> = Vec::new();
        root_labels
            .try_reserve_exact(count)
            .map_err(|_| SegmentError::allocation::<usize>(count))?;
        root_labels.resize(count, usize::MAX);

        let mut labels: Vec<usize> = Vec::new();
        labels
            .try_reserve_exact(count)
            .map_err(|_| SegmentError::allocation::<usize>(count))?;

        let mut component_count = 0;
        for index in 0..count {
            let root = self.find(index);
            if root_labels[root] == usize::MAX {
                root_labels[root] = component_count;
                component_count += 1;
            }
            labels.push(root_labels[root]);
        }

        Ok(Partition {
            dimensions: self.dimensions(),
            labels,
            component_count,
        })
    }
}

/// A labeling of every pixel with its color-similarity component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    dimensions: Dimensions,
    labels: Vec<usize>,
    component_count: usize,
}

impl Partition {
    /// Dimensions of the labeled image.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Number of distinct components.
    #[must_use]
    pub const fn component_count(&self) -> usize {
        self.component_count
    }

    /// Per-pixel labels in row-major order.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Label of the pixel at `at`, or `None` outside the image.
    #[must_use]
    pub fn label(&self, at: Coordinate) -> Option<usize> {
        if self.dimensions.contains(at.x, at.y) {
            self.labels.get(self.dimensions.index(at.x, at.y)).copied()
        } else {
            None
        }
    }

    /// Whether two in-bounds pixels share a component.
    #[must_use]
    pub fn same_component(&self, a: Coordinate, b: Coordinate) -> bool {
        matches!((self.label(a), self.label(b)), (Some(la), Some(lb)) if la == lb)
    }

    /// Pixel count of each component, indexed by label.
    #[must_use]
    pub fn component_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.component_count];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }

    /// Size of the largest component, 0 for an empty image.
    #[must_use]
    pub fn largest_component(&self) -> usize {
        self.component_sizes().into_iter().max().unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::RgbaImage;
    use image::Rgba;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn row_graph(colors: &[[u8; 3]]) -> PixelGraph {
        #[allow(clippy::cast_possible_truncation)]
        let width = colors.len() as u32;
        let img = RgbaImage::from_fn(width, 1, |x, _| {
            let [r, g, b] = colors[x as usize];
            Rgba([r, g, b, 255])
        });
        PixelGraph::build(&img).unwrap()
    }

    #[test]
    fn singleton_is_its_own_representative() {
        let mut graph = row_graph(&[[100, 0, 0], [200, 0, 0]]);
        assert_eq!(graph.find(0), 0);
        assert_eq!(graph.find(1), 1);
    }

    #[test]
    fn find_is_idempotent() {
        let mut graph = row_graph(&[[100, 100, 100]; 6]);
        graph.find_components(MergeCriteria::default());
        for index in 0..graph.len() {
            let first = graph.find(index);
            assert_eq!(graph.find(index), first);
        }
    }

    #[test]
    fn similar_bright_pixels_merge() {
        let mut graph = row_graph(&[[100, 100, 100], [110, 105, 100]]);
        assert!(graph.union(0, 1, MergeCriteria::default()));
        assert_eq!(graph.find(0), graph.find(1));
        // Already merged: second attempt is a no-op.
        assert!(!graph.union(1, 0, MergeCriteria::default()));
    }

    #[test]
    fn dark_pairs_never_merge() {
        let mut graph = row_graph(&[[39, 0, 0], [39, 0, 0], [0, 0, 0]]);
        assert!(!graph.union(0, 1, MergeCriteria::default()));
        assert!(!graph.union(1, 2, MergeCriteria::default()));
        assert_ne!(graph.find(0), graph.find(1));
        assert_ne!(graph.find(1), graph.find(2));
    }

    #[test]
    fn one_dark_pixel_does_not_block_merge() {
        let mut graph = row_graph(&[[39, 0, 0], [41, 0, 0]]);
        assert!(graph.union(0, 1, MergeCriteria::default()));
    }

    #[test]
    fn distance_must_be_strictly_below_threshold() {
        // Distance exactly 28.
        let mut graph = row_graph(&[[100, 0, 0], [128, 0, 0]]);
        assert!(!graph.union(0, 1, MergeCriteria::default()));
        let looser = MergeCriteria {
            threshold: 28.5,
            ..MergeCriteria::default()
        };
        assert!(graph.union(0, 1, looser));
    }

    #[test]
    fn equal_ranks_promote_second_root() {
        let mut graph = row_graph(&[[100, 0, 0]; 3]);
        graph.union(0, 1, MergeCriteria::default());
        assert_eq!(graph.find(0), 1);
        assert_eq!(graph.nodes()[1].rank(), 1);
        assert_eq!(graph.nodes()[0].rank(), 0);

        // Rank 0 singleton goes under the rank 1 root.
        graph.union(2, 1, MergeCriteria::default());
        assert_eq!(graph.find(2), 1);
        assert_eq!(graph.nodes()[1].rank(), 1);
    }

    #[test]
    fn find_halves_the_path() {
        let mut graph = row_graph(&[[100, 0, 0]; 4]);
        // Chain 0 -> 1 -> 2 -> 3.
        graph.nodes[0].parent = 1;
        graph.nodes[1].parent = 2;
        graph.nodes[2].parent = 3;

        assert_eq!(graph.find(0), 3);
        assert_eq!(graph.nodes()[0].parent(), 2);
        assert_eq!(graph.nodes()[2].parent(), 3);

        assert_eq!(graph.find(0), 3);
        assert_eq!(graph.nodes()[0].parent(), 3);
    }

    #[test]
    fn partitions_only_coarsen() {
        let mut rng = StdRng::seed_from_u64(11);
        let img = RgbaImage::from_fn(8, 8, |_, _| {
            Rgba([rng.random_range(30..90), rng.random_range(0..40), 0, 255])
        });
        let mut graph = PixelGraph::build(&img).unwrap();
        let criteria = MergeCriteria::default();
        let n = graph.len();

        let mut ops = StdRng::seed_from_u64(12);
        let mut before = graph.partition().unwrap();
        for _ in 0..10 {
            for _ in 0..20 {
                let a = ops.random_range(0..n);
                let b = ops.random_range(0..n);
                graph.union(a, b, criteria);
            }
            let after = graph.partition().unwrap();
            for a in 0..n {
                for b in 0..n {
                    if before.labels()[a] == before.labels()[b] {
                        assert_eq!(after.labels()[a], after.labels()[b]);
                    }
                }
            }
            assert!(after.component_count() <= before.component_count());
            before = after;
        }
    }

    #[test]
    fn find_components_counts_merges() {
        // Two bright runs separated by a far-off color.
        let mut graph = row_graph(&[
            [200, 200, 200],
            [205, 200, 200],
            [50, 50, 250],
            [100, 100, 100],
            [100, 100, 110],
        ]);
        let summary = graph.find_components(MergeCriteria::default());
        assert_eq!(
            summary,
            ClusterSummary {
                merges: 2,
                component_count: 3
            }
        );

        let partition = graph.partition().unwrap();
        assert_eq!(partition.component_count(), 3);
        assert_eq!(partition.labels(), &[0, 0, 1, 2, 2]);
        assert_eq!(partition.component_sizes(), vec![2, 1, 2]);
        assert_eq!(partition.largest_component(), 2);
        assert!(partition.same_component(Coordinate::new(3, 0), Coordinate::new(4, 0)));
        assert!(!partition.same_component(Coordinate::new(1, 0), Coordinate::new(2, 0)));
        assert!(!partition.same_component(Coordinate::new(0, 0), Coordinate::new(9, 0)));
    }

    #[test]
    fn all_black_image_stays_fully_split() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        let mut graph = PixelGraph::build(&img).unwrap();
        let summary = graph.find_components(MergeCriteria::default());
        assert_eq!(summary.merges, 0);
        assert_eq!(graph.partition().unwrap().component_count(), 16);
    }

    #[test]
    fn criteria_from_config() {
        let config = SegmentConfig {
            merge_threshold: 3.5,
            dark_guard: 9,
            ..SegmentConfig::default()
        };
        let criteria = MergeCriteria::from(&config);
        assert!((criteria.threshold - 3.5).abs() < f64::EPSILON);
        assert_eq!(criteria.dark_guard, 9);
    }
}
