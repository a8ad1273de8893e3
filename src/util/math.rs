//! Mathematical helpers for curve energies.

use crate::curve::{CurvatureMode, Point};

/// Segments shorter than this are treated as degenerate.
const MIN_SEGMENT_LEN: f64 = 1e-12;

/// Euclidean distance between two points.
pub(crate) fn distance(a: Point, b: Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Discrete curvature energy of the corner `p0 -> p1 -> p2`.
///
/// The turning angle between the two segments is raised to `power` and
/// normalized by the segment lengths according to `mode`:
///
/// * [`CurvatureMode::HalfLength`] estimates the curvature as the angle
///   divided by the mean incident segment length and integrates it over that
///   length, giving `angle^p / mean_len^(p-1)`.
/// * [`CurvatureMode::Bruckstein`] splits the angle mass per incident
///   segment, `angle^p / 2 * (1 / l1^(p-1) + 1 / l2^(p-1))`.
///
/// Both modes agree when the incident segments have equal length. The result
/// is non-negative; corners with a degenerate incident segment contribute
/// zero.
pub(crate) fn curv_weight(p0: Point, p1: Point, p2: Point, power: f64, mode: CurvatureMode) -> f64 {
    let d1x = p1.x - p0.x;
    let d1y = p1.y - p0.y;
    let d2x = p2.x - p1.x;
    let d2y = p2.y - p1.y;

    let l1 = (d1x * d1x + d1y * d1y).sqrt();
    let l2 = (d2x * d2x + d2y * d2y).sqrt();
    if l1 < MIN_SEGMENT_LEN || l2 < MIN_SEGMENT_LEN {
        return 0.0;
    }

    let cos_angle = ((d1x * d2x + d1y * d2y) / (l1 * l2)).clamp(-1.0, 1.0);
    let angle = cos_angle.acos();

    match mode {
        CurvatureMode::HalfLength => {
            let mean_len = 0.5 * (l1 + l2);
            angle.powf(power) / mean_len.powf(power - 1.0)
        }
        CurvatureMode::Bruckstein => {
            0.5 * angle.powf(power) * (1.0 / l1.powf(power - 1.0) + 1.0 / l2.powf(power - 1.0))
        }
    }
}
