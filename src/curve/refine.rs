//! Iterative refinement of the curve.
//!
//! One sweep of per-vertex coordinate descent moves each vertex along its
//! negative local-energy gradient with a forward-tracking line search. The
//! driver accepts a sweep only when the exact total energy strictly drops,
//! caps the lifetime drift of every vertex and repairs coincident vertices
//! before iterating.

use std::collections::HashMap;

use crate::curve::{Point, SegmentationCurve};
use crate::trace::{trace_event, trace_span};

/// Hard cap on coordinate-descent sweeps.
const MAX_SWEEPS: usize = 200;

/// Initial line-search step.
const STEP_INIT: f64 = 0.05;

/// Multiplicative growth of the line-search step.
const STEP_GROWTH: f64 = 1.1;

/// Step bound for a single-vertex search.
const STEP_MAX_VERTEX: f64 = 0.4;

/// Step bound for the whole-curve search.
const STEP_MAX_GLOBAL: f64 = 1.0;

/// Squared lifetime displacement allowed per vertex.
const MAX_DRIFT_SQ: f64 = 25.0;

/// Why `refine` stopped. All three are normal termination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// A sweep moved no vertex.
    Converged,
    /// A sweep failed to lower the total energy and was rolled back.
    Rejected,
    /// The sweep cap was reached.
    IterationCap,
}

/// Outcome of a `refine` run.
#[derive(Clone, Copy, Debug)]
pub struct RefineReport {
    pub reason: StopReason,
    /// Sweeps executed, including a terminal rolled-back one.
    pub sweeps: usize,
    /// Total energy of the final polygon.
    pub energy: f64,
}

fn coordinate_key(p: Point) -> (u64, u64) {
    // Adding 0.0 collapses -0.0 onto +0.0, keeping the key in agreement
    // with coordinate equality.
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

impl SegmentationCurve {
    /// One coordinate-descent sweep. Returns whether any vertex moved.
    ///
    /// Vertices are updated sequentially: later vertices in the sweep see
    /// the already-moved positions of earlier ones.
    pub(crate) fn sweep_descent(&mut self) -> bool {
        let mut any_moved = false;

        for i in 0..self.vertices.len() {
            let Point { x, y } = self.vertices[i];
            let e1 = self.vertex_local_energy(i, x, y);

            let (mut gx, mut gy) = self.gradient(i);
            let norm = (gx * gx + gy * gy).sqrt();
            if norm > 1.0 {
                gx /= norm;
                gy /= norm;
            }

            // Forward-tracking search: keep growing the step while the
            // local energy keeps dropping.
            let mut e2 = e1;
            let mut tau = STEP_INIT;
            loop {
                let trial = STEP_GROWTH * tau;
                let e_new = self.vertex_local_energy(i, x - trial * gx, y - trial * gy);
                if e_new >= e2 {
                    break;
                }
                tau = trial;
                e2 = e_new;
                if tau > STEP_MAX_VERTEX {
                    break;
                }
            }

            if e2 < e1 {
                self.vertices[i] = Point::new(x - tau * gx, y - tau * gy);
                any_moved = true;
            }
        }

        any_moved
    }

    /// Alternate strategy: one simultaneous gradient step for all vertices.
    ///
    /// Gradients are scaled by the single largest norm in the curve and a
    /// global step is line-searched against the exact total energy. Cheaper
    /// per evaluation than a sweep but less able to adapt per vertex; not
    /// called by [`Self::refine`]. Returns whether the energy decreased.
    pub fn step_whole_gradient(&mut self) -> bool {
        let n = self.vertices.len();
        let mut gx = vec![0.0f64; n];
        let mut gy = vec![0.0f64; n];
        let mut max_norm = 0.0f64;
        for i in 0..n {
            let (dx, dy) = self.gradient(i);
            gx[i] = dx;
            gy[i] = dy;
            max_norm = max_norm.max((dx * dx + dy * dy).sqrt());
        }
        if max_norm < 1e-12 {
            return false;
        }
        for i in 0..n {
            gx[i] /= max_norm;
            gy[i] /= max_norm;
        }

        let e1 = self.total_energy();
        let mut e2 = e1;
        let start = self.vertices.clone();
        let mut best = start.clone();
        let mut tau = STEP_INIT;

        loop {
            let trial = STEP_GROWTH * tau;
            for i in 0..n {
                self.vertices[i] =
                    Point::new(start[i].x - trial * gx[i], start[i].y - trial * gy[i]);
            }
            let e_new = self.total_energy();
            if e_new >= e2 {
                break;
            }
            if tau > STEP_MAX_GLOBAL {
                break;
            }
            tau = trial;
            e2 = e_new;
            best.copy_from_slice(&self.vertices);
        }

        self.vertices = best;
        e2 < e1
    }

    /// Whether any two vertices share exactly the same coordinates.
    pub(crate) fn self_intersects(&self) -> bool {
        let mut seen = HashMap::new();
        self.vertices
            .iter()
            .enumerate()
            .any(|(i, &p)| seen.insert(coordinate_key(p), i).is_some())
    }

    /// Snaps every pair of coincident vertices to their neighbor midpoints.
    ///
    /// Both offenders move to the midpoint of their own cyclic neighbors,
    /// with neighbor indices wrapping by true modulo (index 0 wraps to
    /// `n - 1`, never underflows). This only resolves exact coordinate
    /// collisions, not crossing edges.
    pub(crate) fn repair_self_intersections(&mut self) {
        let n = self.vertices.len();
        let mut first_at: HashMap<(u64, u64), usize> = HashMap::new();

        for i in 0..n {
            let key = coordinate_key(self.vertices[i]);
            if let Some(&j) = first_at.get(&key) {
                let mid = |k: usize| {
                    let prev = self.vertices[(k + n - 1) % n];
                    let next = self.vertices[(k + 1) % n];
                    Point::new(0.5 * (prev.x + next.x), 0.5 * (prev.y + next.y))
                };
                let moved_i = mid(i);
                let moved_j = mid(j);
                self.vertices[i] = moved_i;
                self.vertices[j] = moved_j;
            } else {
                first_at.insert(key, i);
            }
        }
    }

    /// Applies the driver's acceptance rule to one finished sweep.
    ///
    /// A stalled sweep, or one whose exact total energy failed to strictly
    /// drop, restores `snapshot` verbatim and returns the stop reason. An
    /// accepted sweep only reverts vertices that exceed the lifetime drift
    /// bound.
    fn settle_sweep(
        &mut self,
        snapshot: &[Point],
        any_moved: bool,
        e_start: f64,
        e_end: f64,
    ) -> Option<StopReason> {
        if !any_moved {
            self.vertices.copy_from_slice(snapshot);
            return Some(StopReason::Converged);
        }

        if e_end >= e_start {
            // Per-vertex searches only check local energy; this is the
            // global safety valve. Ties count as failures.
            self.vertices.copy_from_slice(snapshot);
            return Some(StopReason::Rejected);
        }

        for i in 0..self.vertices.len() {
            let dx = self.vertices[i].x - self.original[i].x;
            let dy = self.vertices[i].y - self.original[i].y;
            if dx * dx + dy * dy >= MAX_DRIFT_SQ {
                self.vertices[i] = snapshot[i];
            }
        }
        None
    }

    /// Runs coordinate-descent sweeps until convergence or the sweep cap.
    ///
    /// Every sweep is validated against the exact total energy: a sweep that
    /// does not strictly decrease it is rolled back and refinement stops.
    /// After an accepted sweep, any single vertex that has strayed too far
    /// from its initial position is reverted to its pre-sweep location.
    pub fn refine(&mut self) -> RefineReport {
        let _span = trace_span!("refine", vertices = self.vertices.len()).entered();

        if self.self_intersects() {
            trace_event!("initial_self_intersection");
            self.repair_self_intersections();
        }

        let mut reason = StopReason::IterationCap;
        let mut sweeps = 0;

        for iter in 1..=MAX_SWEEPS {
            let e_start = self.total_energy();
            let snapshot = self.vertices.clone();

            let any_moved = self.sweep_descent();
            let e_end = self.total_energy();
            sweeps = iter;
            trace_event!("sweep", iter = iter, energy = e_end, moved = any_moved);

            if let Some(stop) = self.settle_sweep(&snapshot, any_moved, e_start, e_end) {
                reason = stop;
                break;
            }
        }

        let energy = self.total_energy();
        trace_event!("refine_done", sweeps = sweeps, energy = energy);
        RefineReport {
            reason,
            sweeps,
            energy,
        }
    }
}
