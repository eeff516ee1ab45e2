//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! [`process_with_diagnostics`] runs the same stages as
//! [`crate::process_bytes`] through the staged [`Pipeline`] and records
//! how long each took and what it produced. Useful for tuning the merge
//! and fill thresholds.
//!
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::colorize::ColorSource;
use crate::pipeline::Pipeline;
use crate::types::{RgbaImage, SegmentConfig, SegmentError, SegmentResult};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Stage 1: image decoding.
    pub decode: StageDiagnostics,
    /// Stage 2: Sobel edge filter.
    pub edge_filter: StageDiagnostics,
    /// Stage 3: pixel graph construction.
    pub graph_build: StageDiagnostics,
    /// Stage 4: disjoint-set clustering and labeling.
    pub clustering: StageDiagnostics,
    /// Stage 5: flood-fill region coloring.
    pub colorize: StageDiagnostics,
    /// Total wall-clock duration of the entire pipeline (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary counts across all stages.
    pub summary: PipelineSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding metrics.
    Decode {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Decoded image width in pixels.
        width: u32,
        /// Decoded image height in pixels.
        height: u32,
        /// Total pixel count (`width * height`).
        pixel_count: u64,
    },
    /// Sobel edge filter metrics.
    EdgeFilter {
        /// Interior pixels with a non-zero gradient magnitude.
        edge_pixel_count: u64,
        /// Pixels with a full 3x3 neighborhood.
        interior_pixel_count: u64,
    },
    /// Pixel graph metrics.
    GraphBuild {
        /// Number of nodes (one per pixel).
        node_count: usize,
    },
    /// Clustering metrics.
    Clustering {
        /// Color distance merge threshold.
        merge_threshold: f64,
        /// Dark-pixel union guard.
        dark_guard: u8,
        /// Successful unions.
        merges: usize,
        /// Components after clustering.
        component_count: usize,
        /// Pixels in the largest component.
        largest_component: usize,
    },
    /// Region coloring metrics.
    Colorize {
        /// Flood-fill seed/containment threshold.
        fill_threshold: u8,
        /// Flood fills started.
        regions: usize,
        /// Pixel writes across all fills.
        pixels_painted: usize,
    },
}

/// High-level summary counts for the entire pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Components found by clustering.
    pub component_count: usize,
    /// Regions painted by the colorer.
    pub regions_painted: usize,
}

/// Run the full pipeline on encoded image bytes, timing every stage.
///
/// # Errors
///
/// Returns the first [`SegmentError`] any stage produces.
pub fn process_with_diagnostics(
    image_bytes: &[u8],
    config: &SegmentConfig,
    colors: &mut dyn ColorSource,
) -> Result<(SegmentResult, PipelineDiagnostics), SegmentError> {
    let start = Instant::now();

    let t = Instant::now();
    let decoded = Pipeline::new(image_bytes.to_vec(), config.clone()).decode()?;
    let decode = StageDiagnostics {
        duration: t.elapsed(),
        metrics: decoded.metrics(),
    };

    let t = Instant::now();
    let filtered = decoded.filter()?;
    let edge_filter = StageDiagnostics {
        duration: t.elapsed(),
        metrics: filtered.metrics(),
    };

    let t = Instant::now();
    let built = filtered.build_graph()?;
    let graph_build = StageDiagnostics {
        duration: t.elapsed(),
        metrics: built.metrics(),
    };

    let t = Instant::now();
    let clustered = built.cluster()?;
    let clustering = StageDiagnostics {
        duration: t.elapsed(),
        metrics: clustered.metrics(),
    };

    let t = Instant::now();
    let colored = clustered.colorize(colors)?;
    let colorize = StageDiagnostics {
        duration: t.elapsed(),
        metrics: colored.metrics(),
    };

    let result = colored.into_result();
    let summary = PipelineSummary {
        image_width: result.dimensions.width,
        image_height: result.dimensions.height,
        pixel_count: result.dimensions.pixel_count() as u64,
        component_count: result.partition.component_count(),
        regions_painted: result.regions_painted,
    };

    let diagnostics = PipelineDiagnostics {
        decode,
        edge_filter,
        graph_build,
        clustering,
        colorize,
        total_duration: start.elapsed(),
        summary,
    };
    Ok((result, diagnostics))
}

impl PipelineDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.pixel_count,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Edge Filter", &self.edge_filter),
            ("Graph Build", &self.graph_build),
            ("Clustering", &self.clustering),
            ("Colorize", &self.colorize),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Components: {}  |  Regions painted: {}",
            self.summary.component_count, self.summary.regions_painted,
        ));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::EdgeFilter {
            edge_pixel_count,
            interior_pixel_count,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *interior_pixel_count > 0 {
                *edge_pixel_count as f64 / *interior_pixel_count as f64 * 100.0
            } else {
                0.0
            };
            format!("edges={edge_pixel_count} ({density:.1}% of interior)")
        }
        StageMetrics::GraphBuild { node_count } => format!("{node_count} nodes"),
        StageMetrics::Clustering {
            merge_threshold,
            dark_guard,
            merges,
            component_count,
            largest_component,
        } => format!(
            "eps={merge_threshold:.1} guard={dark_guard} merges={merges} components={component_count} largest={largest_component}",
        ),
        StageMetrics::Colorize {
            fill_threshold,
            regions,
            pixels_painted,
        } => format!("threshold={fill_threshold} regions={regions} painted={pixels_painted}"),
    }
}

/// Count interior pixels with a non-zero gradient magnitude in an edge map.
pub(crate) fn count_edge_pixels(edges: &RgbaImage) -> u64 {
    let (w, h) = edges.dimensions();
    edges
        .enumerate_pixels()
        .filter(|(x, y, _)| *x > 0 && *y > 0 && *x + 1 < w && *y + 1 < h)
        .map(|(_, _, p)| u64::from(p.0[0] > 0))
        .sum()
}
