//! SegCurve performs local refinement of a closed segmentation curve.
//!
//! Given a per-pixel data term (positive favors foreground) and an initial
//! closed polygon, the curve is evolved by per-vertex coordinate descent to
//! minimize a composite energy of data-term disagreement, curve length and
//! discrete curvature. Edge contributions to the data energy are evaluated in
//! closed form from row-wise prefix sums, so no pixels are rasterized during
//! optimization. Per-sweep progress events are available via the optional
//! `tracing` feature.

pub mod curve;
pub mod field;
pub mod mask;
pub mod render;
mod trace;
pub mod util;

pub use curve::{CurvatureMode, CurveParams, Point, RefineReport, SegmentationCurve, StopReason};
pub use field::{RowIntegralField, SharedField};
pub use util::{SegCurveError, SegCurveResult};
