//! Evolving segmentation curve.
//!
//! `SegmentationCurve` owns a cyclic sequence of sub-pixel vertices tracing
//! the foreground boundary. Its composite energy is the signed data-term
//! integral enclosed by the polygon plus length and curvature penalties;
//! derivatives are taken numerically, which keeps the non-smooth curvature
//! term out of the analytic path.

mod refine;

pub use refine::{RefineReport, StopReason};

use crate::field::{FieldPerturbation, SharedField};
use crate::util::math::{curv_weight, distance};
use crate::util::{SegCurveError, SegCurveResult};

/// Central-difference step for the numeric gradient.
const GRAD_STEP: f64 = 1e-4;

/// Data-term offset applied by the membership test.
const MEMBERSHIP_OFFSET: f64 = 1.0;

/// Energy-difference threshold deciding membership.
const MEMBERSHIP_THRESHOLD: f64 = 0.5;

/// A vertex in continuous image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a point from its coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Discrete-curvature formula used for the curvature penalty.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CurvatureMode {
    /// Turning angle normalized by the mean incident segment length.
    #[default]
    HalfLength,
    /// Angle mass split per incident segment (Bruckstein-style elastica).
    Bruckstein,
}

/// Scalar configuration of the curve energy, fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct CurveParams {
    /// Length weight.
    pub lambda: f64,
    /// Curvature weight.
    pub gamma: f64,
    /// Exponent applied to the turning angle.
    pub curv_power: f64,
    /// Curvature discretization.
    pub curvature: CurvatureMode,
}

impl Default for CurveParams {
    fn default() -> Self {
        Self {
            lambda: 1.0,
            gamma: 1.0,
            curv_power: 2.0,
            curvature: CurvatureMode::HalfLength,
        }
    }
}

/// A closed polygonal curve refined against a shared data-term field.
pub struct SegmentationCurve {
    field: SharedField,
    params: CurveParams,
    vertices: Vec<Point>,
    /// Frozen copy of the initial polygon; bounds per-vertex drift during
    /// refinement and is drawn alongside the result.
    original: Vec<Point>,
}

impl SegmentationCurve {
    /// Creates a curve from an initial closed polygon.
    ///
    /// The polygon is interpreted cyclically and needs at least three
    /// vertices. A negative `sign` reverses the traversal order, flipping
    /// the sign convention of the enclosed data-term integral.
    pub fn new(
        field: SharedField,
        vertices: Vec<Point>,
        sign: f64,
        params: CurveParams,
    ) -> SegCurveResult<Self> {
        if vertices.len() < 3 {
            return Err(SegCurveError::PolygonTooSmall {
                got: vertices.len(),
            });
        }
        let original = vertices.clone();
        let mut curve = Self {
            field,
            params,
            vertices,
            original,
        };
        if sign < 0.0 {
            curve.vertices.reverse();
            curve.original.reverse();
        }
        Ok(curve)
    }

    /// Returns the current vertex sequence.
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Returns the initial vertex sequence as of construction.
    pub fn original_vertices(&self) -> &[Point] {
        &self.original
    }

    /// Signed data-term integral enclosed by the current polygon.
    pub fn data_energy(&self) -> f64 {
        self.field.borrow().polygon_energy(&self.vertices)
    }

    /// Length and curvature penalties of the current polygon.
    pub fn smooth_energy(&self) -> f64 {
        let n = self.vertices.len();
        let mut energy = 0.0;
        for i in 0..n {
            let prev = self.vertices[(i + n - 1) % n];
            let here = self.vertices[i];
            let next = self.vertices[(i + 1) % n];

            energy += 0.5 * self.params.lambda * (distance(here, prev) + distance(here, next));
            energy += self.params.gamma
                * curv_weight(prev, here, next, self.params.curv_power, self.params.curvature);
        }
        energy
    }

    /// Total composite energy of the current polygon.
    pub fn total_energy(&self) -> f64 {
        self.data_energy() + self.smooth_energy()
    }

    /// Energy terms that depend on vertex `i` if it were moved to `(x, y)`.
    ///
    /// Two full-weight length terms, the three curvature triples touching
    /// the vertex and the two incident edge energies. Shared terms are
    /// counted once per incident vertex, so summing this over all vertices
    /// does not reproduce [`Self::total_energy`]; the value is meaningful
    /// only for comparing candidate positions of the same vertex.
    pub(crate) fn vertex_local_energy(&self, i: usize, x: f64, y: f64) -> f64 {
        let n = self.vertices.len();
        //   p0 --- p1 --- (x, y) --- p2 --- p3
        let p0 = self.vertices[(i + n - 2) % n];
        let p1 = self.vertices[(i + n - 1) % n];
        let p2 = self.vertices[(i + 1) % n];
        let p3 = self.vertices[(i + 2) % n];
        let moved = Point::new(x, y);

        let mut energy = self.params.lambda * (distance(moved, p1) + distance(moved, p2));

        let power = self.params.curv_power;
        let mode = self.params.curvature;
        energy += self.params.gamma * curv_weight(p0, p1, moved, power, mode);
        energy += self.params.gamma * curv_weight(p1, moved, p2, power, mode);
        energy += self.params.gamma * curv_weight(moved, p2, p3, power, mode);

        let field = self.field.borrow();
        energy += field.line_energy(p1, moved);
        energy += field.line_energy(moved, p2);
        energy
    }

    /// Central-difference gradient of the local energy of vertex `i`.
    pub(crate) fn gradient(&self, i: usize) -> (f64, f64) {
        let Point { x, y } = self.vertices[i];
        let h = GRAD_STEP;
        let dx = (self.vertex_local_energy(i, x + h, y) - self.vertex_local_energy(i, x - h, y))
            / (2.0 * h);
        let dy = (self.vertex_local_energy(i, x, y + h) - self.vertex_local_energy(i, x, y - h))
            / (2.0 * h);
        (dx, dy)
    }

    /// Tests whether the pixel `(x, y)` lies inside the curve.
    ///
    /// The field sample at the pixel is perturbed through a scoped guard and
    /// the resulting change of the total energy is compared against a fixed
    /// threshold; an enclosed pixel moves the enclosed integral by roughly
    /// the full offset. Diagnostic primitive, not used by the optimization
    /// loop. Out-of-range pixels are outside by definition.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        {
            let field = self.field.borrow();
            if x >= field.width() || y >= field.height() {
                return false;
            }
        }

        let before = self.total_energy();
        let guard = FieldPerturbation::apply(&self.field, x, y, MEMBERSHIP_OFFSET);
        let during = self.total_energy();
        drop(guard);

        (before - during).abs() > MEMBERSHIP_THRESHOLD
    }
}
