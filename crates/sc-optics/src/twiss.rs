// ─────────────────────────────────────────────────────────────────────
// SCPN Space Charge — Periodic Linear Optics
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Thin-lens periodic Twiss functions, dispersion and closed orbit.
//!
//! Each transverse plane is transported with an affine map
//! `u -> M u + v` acting on `(u, u')`. The 2x2 part `M` carries the linear
//! focusing; two inhomogeneous terms ride along it: the dispersion source
//! (bending angle per unit momentum offset) and the orbit source (steering
//! kicks). Periodic dispersion and closed orbit are the fixed points of the
//! one-turn map, β/α follow from its trace and off-diagonal terms.

use crate::lattice::{ElementKind, Sequence};
use ndarray::Array1;
use sc_types::error::{SpaceChargeError, SpaceChargeResult};
use sc_types::state::OpticsSample;
use std::f64::consts::PI;

/// Below this |sin μ| the one-turn map is treated as a resonance.
const MIN_SIN_MU: f64 = 1e-9;

/// Affine transport of one transverse plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneMap {
    pub m: [[f64; 2]; 2],
    /// Dispersion source: `(D, D')` gained per unit δ.
    pub disp: [f64; 2],
    /// Orbit source: `(u, u')` gained from steering.
    pub orbit: [f64; 2],
}

impl PlaneMap {
    pub fn identity() -> Self {
        PlaneMap {
            m: [[1.0, 0.0], [0.0, 1.0]],
            disp: [0.0, 0.0],
            orbit: [0.0, 0.0],
        }
    }

    pub fn drift(length: f64) -> Self {
        PlaneMap {
            m: [[1.0, length], [0.0, 1.0]],
            ..Self::identity()
        }
    }

    /// Thin lens with integrated focusing strength `k` (positive focuses).
    pub fn thin_lens(k: f64) -> Self {
        PlaneMap {
            m: [[1.0, 0.0], [-k, 1.0]],
            ..Self::identity()
        }
    }

    pub fn thin_bend(angle: f64) -> Self {
        PlaneMap {
            disp: [0.0, angle],
            ..Self::identity()
        }
    }

    pub fn thin_kick(kick: f64) -> Self {
        PlaneMap {
            orbit: [0.0, kick],
            ..Self::identity()
        }
    }

    /// `self` applied after `first`.
    pub fn compose(&self, first: &PlaneMap) -> PlaneMap {
        let a = &self.m;
        let b = &first.m;
        PlaneMap {
            m: [
                [
                    a[0][0] * b[0][0] + a[0][1] * b[1][0],
                    a[0][0] * b[0][1] + a[0][1] * b[1][1],
                ],
                [
                    a[1][0] * b[0][0] + a[1][1] * b[1][0],
                    a[1][0] * b[0][1] + a[1][1] * b[1][1],
                ],
            ],
            disp: add(mat_vec(a, first.disp), self.disp),
            orbit: add(mat_vec(a, first.orbit), self.orbit),
        }
    }

    pub fn trace(&self) -> f64 {
        self.m[0][0] + self.m[1][1]
    }
}

fn mat_vec(m: &[[f64; 2]; 2], v: [f64; 2]) -> [f64; 2] {
    [
        m[0][0] * v[0] + m[0][1] * v[1],
        m[1][0] * v[0] + m[1][1] * v[1],
    ]
}

fn add(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [a[0] + b[0], a[1] + b[1]]
}

/// Fixed point of `u -> M u + v`, i.e. solve `(I - M) u = v`.
fn affine_fixed_point(m: &[[f64; 2]; 2], v: [f64; 2]) -> SpaceChargeResult<[f64; 2]> {
    let a = 1.0 - m[0][0];
    let b = -m[0][1];
    let c = -m[1][0];
    let d = 1.0 - m[1][1];
    let det = a * d - b * c;
    if !det.is_finite() || det.abs() < MIN_SIN_MU {
        return Err(SpaceChargeError::ExternalEngine(format!(
            "one-turn map has no unique fixed point (det(I-M)={det:.3e}); integer tune?"
        )));
    }
    Ok([(d * v[0] - b * v[1]) / det, (a * v[1] - c * v[0]) / det])
}

/// Periodic Twiss parameters at the start of the ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodicSolution {
    pub beta: f64,
    pub alpha: f64,
    /// Fractional tune from the one-turn trace.
    pub tune_fraction: f64,
    pub dispersion: [f64; 2],
    pub orbit: [f64; 2],
}

/// Periodic solution of a one-turn plane map.
pub fn periodic_solution(one_turn: &PlaneMap, plane: &str) -> SpaceChargeResult<PeriodicSolution> {
    let m = &one_turn.m;
    let cos_mu = 0.5 * one_turn.trace();
    if !cos_mu.is_finite() || cos_mu.abs() >= 1.0 {
        return Err(SpaceChargeError::ExternalEngine(format!(
            "{plane} plane is unstable: |cos mu| = {:.6} >= 1",
            cos_mu.abs()
        )));
    }
    let sin_mu = m[0][1].signum() * (1.0 - cos_mu * cos_mu).sqrt();
    if sin_mu.abs() < MIN_SIN_MU {
        return Err(SpaceChargeError::ExternalEngine(format!(
            "{plane} plane sits on a half-integer or integer resonance"
        )));
    }
    let beta = m[0][1] / sin_mu;
    let alpha = (m[0][0] - m[1][1]) / (2.0 * sin_mu);
    let mu = sin_mu.atan2(cos_mu).rem_euclid(2.0 * PI);
    Ok(PeriodicSolution {
        beta,
        alpha,
        tune_fraction: mu / (2.0 * PI),
        dispersion: affine_fixed_point(m, one_turn.disp)?,
        orbit: affine_fixed_point(m, one_turn.orbit)?,
    })
}

/// Propagate (β, α) through a plane map.
pub fn propagate_twiss(m: &[[f64; 2]; 2], beta: f64, alpha: f64) -> (f64, f64) {
    let gamma = (1.0 + alpha * alpha) / beta;
    let (c, s, cp, sp) = (m[0][0], m[0][1], m[1][0], m[1][1]);
    let beta_new = c * c * beta - 2.0 * c * s * alpha + s * s * gamma;
    let alpha_new = -c * cp * beta + (c * sp + s * cp) * alpha - s * sp * gamma;
    (beta_new, alpha_new)
}

/// Phase advance through a plane map starting from (β, α).
pub fn phase_advance(m: &[[f64; 2]; 2], beta: f64, alpha: f64) -> f64 {
    m[0][1].atan2(m[0][0] * beta - m[0][1] * alpha)
}

/// Horizontal and vertical maps of a single thin element.
pub fn element_maps(kind: &ElementKind) -> (PlaneMap, PlaneMap) {
    match *kind {
        ElementKind::Quadrupole { k1l } => (PlaneMap::thin_lens(k1l), PlaneMap::thin_lens(-k1l)),
        ElementKind::Sbend { angle } => (PlaneMap::thin_bend(angle), PlaneMap::identity()),
        ElementKind::HKicker { kick } => (PlaneMap::thin_kick(kick), PlaneMap::identity()),
        ElementKind::VKicker { kick } => (PlaneMap::identity(), PlaneMap::thin_kick(kick)),
        ElementKind::Marker | ElementKind::RfCavity { .. } | ElementKind::Placeholder { .. } => {
            (PlaneMap::identity(), PlaneMap::identity())
        }
    }
}

/// One-turn maps `(x, y)` of a sequence, starting and ending at s = 0.
pub fn one_turn_maps(seq: &Sequence) -> (PlaneMap, PlaneMap) {
    let mut mx = PlaneMap::identity();
    let mut my = PlaneMap::identity();
    let mut s_prev = 0.0;
    for el in &seq.elements {
        let drift = PlaneMap::drift(el.at - s_prev);
        let (ex, ey) = element_maps(&el.kind);
        mx = ex.compose(&drift.compose(&mx));
        my = ey.compose(&drift.compose(&my));
        s_prev = el.at;
    }
    let closing = PlaneMap::drift(seq.length - s_prev);
    (closing.compose(&mx), closing.compose(&my))
}

/// Twiss table: one row per element, values at the element exit.
#[derive(Debug, Clone)]
pub struct TwissTable {
    pub sequence: String,
    pub length: f64,
    pub q1: f64,
    pub q2: f64,
    pub name: Vec<String>,
    pub s: Array1<f64>,
    pub betx: Array1<f64>,
    pub alfx: Array1<f64>,
    pub mux: Array1<f64>,
    pub bety: Array1<f64>,
    pub alfy: Array1<f64>,
    pub muy: Array1<f64>,
    pub dx: Array1<f64>,
    pub dpx: Array1<f64>,
    pub dy: Array1<f64>,
    pub dpy: Array1<f64>,
    pub x: Array1<f64>,
    pub px: Array1<f64>,
    pub y: Array1<f64>,
    pub py: Array1<f64>,
}

impl TwissTable {
    pub fn len(&self) -> usize {
        self.name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn row(&self, name: &str) -> Option<usize> {
        self.name.iter().position(|n| n == name)
    }

    pub fn sample(&self, row: usize) -> OpticsSample {
        OpticsSample {
            name: self.name[row].clone(),
            s: self.s[row],
            beta_x: self.betx[row],
            beta_y: self.bety[row],
            dispersion_x: self.dx[row],
            dispersion_y: self.dy[row],
            x: self.x[row],
            y: self.y[row],
        }
    }
}

/// Running state of one plane while walking the ring.
struct PlaneWalker {
    beta: f64,
    alpha: f64,
    mu: f64,
    disp: [f64; 2],
    orbit: [f64; 2],
}

impl PlaneWalker {
    fn new(sol: &PeriodicSolution) -> Self {
        PlaneWalker {
            beta: sol.beta,
            alpha: sol.alpha,
            mu: 0.0,
            disp: sol.dispersion,
            orbit: sol.orbit,
        }
    }

    fn advance(&mut self, map: &PlaneMap) {
        self.mu += phase_advance(&map.m, self.beta, self.alpha);
        let (b, a) = propagate_twiss(&map.m, self.beta, self.alpha);
        self.beta = b;
        self.alpha = a;
        self.disp = add(mat_vec(&map.m, self.disp), map.disp);
        self.orbit = add(mat_vec(&map.m, self.orbit), map.orbit);
    }
}

/// Periodic Twiss, dispersion and closed orbit at every element of `seq`.
pub fn compute_twiss(seq: &Sequence) -> SpaceChargeResult<TwissTable> {
    seq.validate()?;
    let (turn_x, turn_y) = one_turn_maps(seq);
    let sol_x = periodic_solution(&turn_x, "horizontal")?;
    let sol_y = periodic_solution(&turn_y, "vertical")?;

    let n = seq.elements.len();
    let mut name = Vec::with_capacity(n);
    let mut cols: [Vec<f64>; 15] = std::array::from_fn(|_| Vec::with_capacity(n));

    let mut wx = PlaneWalker::new(&sol_x);
    let mut wy = PlaneWalker::new(&sol_y);
    let mut s_prev = 0.0;
    for el in &seq.elements {
        let drift = PlaneMap::drift(el.at - s_prev);
        let (ex, ey) = element_maps(&el.kind);
        wx.advance(&ex.compose(&drift));
        wy.advance(&ey.compose(&drift));
        s_prev = el.at;

        name.push(el.name.clone());
        let row = [
            el.at, wx.beta, wx.alpha, wx.mu, wy.beta, wy.alpha, wy.mu, wx.disp[0], wx.disp[1],
            wy.disp[0], wy.disp[1], wx.orbit[0], wx.orbit[1], wy.orbit[0], wy.orbit[1],
        ];
        for (col, v) in cols.iter_mut().zip(row) {
            col.push(v);
        }
    }
    let closing = PlaneMap::drift(seq.length - s_prev);
    wx.advance(&closing);
    wy.advance(&closing);

    let [s, betx, alfx, mux, bety, alfy, muy, dx, dpx, dy, dpy, x, px, y, py] =
        cols.map(Array1::from);
    Ok(TwissTable {
        sequence: seq.name.clone(),
        length: seq.length,
        q1: wx.mu / (2.0 * PI),
        q2: wy.mu / (2.0 * PI),
        name,
        s,
        betx,
        alfx,
        mux: mux / (2.0 * PI),
        bety,
        alfy,
        muy: muy / (2.0 * PI),
        dx,
        dpx,
        dy,
        dpy,
        x,
        px,
        y,
        py,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Sequence;

    /// Symmetric thin FODO cell of length `l` with focal length `f`:
    /// QF at 0, QD at l/2, closing drift back to l.
    fn fodo(l: f64, f: f64) -> Sequence {
        let mut seq = Sequence::new("fodo", l);
        seq.install("qf", 0.0, ElementKind::Quadrupole { k1l: 1.0 / f })
            .unwrap();
        seq.install("qd", 0.5 * l, ElementKind::Quadrupole { k1l: -1.0 / f })
            .unwrap();
        seq
    }

    #[test]
    fn test_fodo_beta_matches_thin_lens_formula() {
        let (l, f) = (10.0, 4.0);
        let seq = fodo(l, f);
        let tw = compute_twiss(&seq).unwrap();
        // Thin FODO with full-strength quads: half-cell L = l/2, kappa = 2f/L.
        let half = 0.5 * l;
        let kappa = 2.0 * f / half;
        let beta_max = half * kappa * (kappa + 1.0) / (kappa * kappa - 1.0).sqrt();
        let beta_min = half * kappa * (kappa - 1.0) / (kappa * kappa - 1.0).sqrt();
        assert!(
            (tw.betx[0] - beta_max).abs() < 1e-9,
            "betx at QF = {}, expected {beta_max}",
            tw.betx[0]
        );
        assert!(
            (tw.bety[0] - beta_min).abs() < 1e-9,
            "bety at QF = {}, expected {beta_min}",
            tw.bety[0]
        );
        // Mirror symmetry at QD.
        assert!((tw.betx[1] - beta_min).abs() < 1e-9);
        assert!((tw.bety[1] - beta_max).abs() < 1e-9);
    }

    #[test]
    fn test_fodo_tune_matches_phase_advance() {
        let (l, f) = (10.0, 4.0);
        let tw = compute_twiss(&fodo(l, f)).unwrap();
        // sin(mu/2) = L / (2f) with L the half-cell length.
        let mu = 2.0 * (0.5 * l / (2.0 * f)).asin();
        let expected = mu / (2.0 * PI);
        assert!((tw.q1 - expected).abs() < 1e-9, "q1 = {}, expected {expected}", tw.q1);
        assert!((tw.q2 - expected).abs() < 1e-9, "q2 = {}, expected {expected}", tw.q2);
    }

    #[test]
    fn test_periodicity_of_beta() {
        let mut seq = fodo(10.0, 4.0);
        seq.install("end", 10.0, ElementKind::Marker).unwrap();
        let tw = compute_twiss(&seq).unwrap();
        // A thin lens leaves beta unchanged, so the marker at s = length must
        // reproduce the values at QF one turn earlier.
        assert!((tw.betx[2] - tw.betx[0]).abs() < 1e-9);
        assert!((tw.bety[2] - tw.bety[0]).abs() < 1e-9);
        assert!((tw.mux[2] - tw.q1).abs() < 1e-12);
    }

    #[test]
    fn test_no_bends_no_dispersion_no_kicks_no_orbit() {
        let tw = compute_twiss(&fodo(10.0, 4.0)).unwrap();
        for i in 0..tw.len() {
            assert!(tw.dx[i].abs() < 1e-15);
            assert!(tw.dy[i].abs() < 1e-15);
            assert!(tw.x[i].abs() < 1e-15);
            assert!(tw.y[i].abs() < 1e-15);
        }
    }

    #[test]
    fn test_bend_creates_positive_horizontal_dispersion() {
        let mut seq = fodo(10.0, 4.0);
        seq.install("mb1", 2.5, ElementKind::Sbend { angle: 0.05 })
            .unwrap();
        seq.install("mb2", 7.5, ElementKind::Sbend { angle: 0.05 })
            .unwrap();
        seq.flatten();
        let tw = compute_twiss(&seq).unwrap();
        let qf = tw.row("qf").unwrap();
        // Periodic solution of this cell: D = 0.84 m, D' = 0.105 at QF entrance.
        assert!((tw.dx[qf] - 0.84).abs() < 1e-9, "dx at QF = {}", tw.dx[qf]);
        assert!(tw.dx.iter().all(|&d| d > 0.0));
        for i in 0..tw.len() {
            assert!(tw.dy[i].abs() < 1e-15);
        }
    }

    #[test]
    fn test_kicker_creates_closed_orbit() {
        let mut seq = fodo(10.0, 4.0);
        seq.install("vk", 2.5, ElementKind::VKicker { kick: 1e-4 })
            .unwrap();
        seq.flatten();
        let tw = compute_twiss(&seq).unwrap();
        let max_y = tw.y.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        assert!(max_y > 0.0);
        for i in 0..tw.len() {
            assert!(tw.x[i].abs() < 1e-15);
        }
        // Orbit is periodic: walking one more turn from the last element returns it.
        let (_, turn_y) = one_turn_maps(&seq);
        let sol = periodic_solution(&turn_y, "vertical").unwrap();
        let back = add(mat_vec(&turn_y.m, sol.orbit), turn_y.orbit);
        assert!((back[0] - sol.orbit[0]).abs() < 1e-15);
        assert!((back[1] - sol.orbit[1]).abs() < 1e-15);
    }

    #[test]
    fn test_unstable_lattice_is_engine_error() {
        // Focal length far shorter than a quarter cell: |cos mu| > 1.
        let err = compute_twiss(&fodo(10.0, 1.0)).unwrap_err();
        assert!(matches!(err, SpaceChargeError::ExternalEngine(_)));
    }

    #[test]
    fn test_placeholder_is_transparent() {
        let base = compute_twiss(&fodo(10.0, 4.0)).unwrap();
        let mut seq = fodo(10.0, 4.0);
        seq.install("sc0", 3.0, ElementKind::Placeholder { slot_id: 2 })
            .unwrap();
        seq.flatten();
        let tw = compute_twiss(&seq).unwrap();
        assert!((tw.q1 - base.q1).abs() < 1e-12);
        assert!((tw.betx[tw.row("qd").unwrap()] - base.betx[1]).abs() < 1e-9);
        let sample = tw.sample(tw.row("sc0").unwrap());
        assert_eq!(sample.name, "sc0");
        assert!((sample.s - 3.0).abs() < 1e-12);
        assert!(sample.beta_x > 0.0 && sample.beta_y > 0.0);
    }
}
