//! Elliptic arc parameterization and cubic approximation.
//!
//! All renderers go through [`earc_params`]: bounds, flattening, affine
//! transform and cubic conversion all reason about an arc as a sweep on the
//! unit circle carried into place by a 2×2 basis matrix plus a center.

use std::f64::consts::TAU;

use glam::dvec2;

use crate::math::{M2, P2, V2};

/// Epsilon for zero comparisons in geometry routines.
pub(crate) const EPS: f64 = 1e-9;

pub(crate) fn round_zero(v: f64) -> f64 {
    if v.abs() < EPS {
        0.0
    } else {
        v
    }
}

/// Center parameterization of an elliptic arc.
///
/// The arc is `point(t) = center + m * (cos t, sin t)` for `t` sweeping
/// from `t0` to `t1`; the sign of `t1 - t0` encodes the orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcParams {
    pub center: P2,
    pub m: M2,
    pub t0: f64,
    pub t1: f64,
}

impl ArcParams {
    /// Point on the arc's ellipse at angle `t` of the unit-circle frame.
    pub fn point(&self, t: f64) -> P2 {
        self.center + self.m * dvec2(t.cos(), t.sin())
    }

    /// Velocity of the sweep at angle `t`.
    pub fn tangent(&self, t: f64) -> V2 {
        self.m * dvec2(-t.sin(), t.cos())
    }
}

/// Computes the center parameterization of the elliptic arc from `p0` to
/// `p1` with x-axis rotation `angle` and radii `radii`, selecting among the
/// four candidate arcs with `large` and `cw`.
///
/// Returns `None` when the arc is degenerate: a radius is (nearly) zero,
/// the endpoints coincide, or the endpoints are too far apart for the
/// radii. Callers treat a degenerate arc as a straight line to `p1`.
pub fn earc_params(p0: P2, large: bool, cw: bool, angle: f64, radii: V2, p1: P2) -> Option<ArcParams> {
    let (rx, ry) = (radii.x, radii.y);
    if rx.abs() < EPS || ry.abs() < EPS {
        return None;
    }
    if (p0 - p1).abs().max_element() < EPS {
        return None;
    }
    let sina = round_zero(angle.sin());
    let cosa = round_zero(angle.cos());

    // Endpoints in the frame where the ellipse is the unit circle.
    let u0 = dvec2((cosa * p0.x + sina * p0.y) / rx, (-sina * p0.x + cosa * p0.y) / ry);
    let u1 = dvec2((cosa * p1.x + sina * p1.y) / rx, (-sina * p1.x + cosa * p1.y) / ry);
    let chord = u1 - u0;
    let norm2 = chord.length_squared();
    if norm2 < EPS {
        return None;
    }

    // Center on the chord's perpendicular bisector, at unit distance from
    // both endpoints. No solution when the chord is longer than the
    // diameter.
    let x = 1.0 / norm2 - 0.25;
    if x < 0.0 {
        return None;
    }
    let mut d = x.sqrt();
    if large == cw {
        d = -d;
    }
    let c = (u0 + u1) * 0.5 + d * dvec2(chord.y, -chord.x);

    let t0 = (u0.y - c.y).atan2(u0.x - c.x);
    let mut t1 = (u1.y - c.y).atan2(u1.x - c.x);
    // Wrap t1 so the sweep direction matches the requested orientation.
    if cw {
        if t1 > t0 {
            t1 -= TAU;
        }
    } else if t1 < t0 {
        t1 += TAU;
    }

    let m = M2::from_cols(dvec2(cosa * rx, sina * rx), dvec2(-sina * ry, cosa * ry));
    Some(ArcParams {
        center: m * c,
        m,
        t0,
        t1,
    })
}

/// Per-level deviation of a cubic approximating a sweep of `dt` radians on
/// the unit circle.
fn cubic_arc_err(dt: f64) -> f64 {
    let q = dt / 4.0;
    let s = q.sin();
    2.0 * s.powi(6) / (27.0 * q.cos().powi(2))
}

/// Approximates the elliptic arc from `p0` to `p1` by cubic Bézier
/// segments, folding `cubic(acc, c0, c1, to)` over the pieces in sweep
/// order. The arc is bisected until each piece deviates from the true
/// ellipse by at most `tol`. A degenerate arc emits a single cubic along
/// the chord.
pub fn cubic_earc<A, F>(
    tol: f64,
    mut cubic: F,
    acc: A,
    p0: P2,
    large: bool,
    cw: bool,
    angle: f64,
    radii: V2,
    p1: P2,
) -> A
where
    F: FnMut(A, P2, P2, P2) -> A,
{
    let params = match earc_params(p0, large, cw, angle, radii, p1) {
        None => {
            let c0 = p0 + (p1 - p0) / 3.0;
            let c1 = p0 + (p1 - p0) * (2.0 / 3.0);
            return cubic(acc, c0, c1, p1);
        }
        Some(params) => params,
    };
    // The unit-circle bound scales by the largest radius.
    let tol = tol / radii.x.abs().max(radii.y.abs());

    let mut acc = acc;
    let mut stack = vec![(params.t0, params.t1)];
    while let Some((a, b)) = stack.pop() {
        let dt = b - a;
        if cubic_arc_err(dt) <= tol {
            // Tangent-length construction for the leaf segment.
            let l = (4.0 / 3.0) * (dt / 4.0).tan();
            let e0 = params.point(a);
            let e1 = params.point(b);
            let c0 = e0 + l * params.tangent(a);
            let c1 = e1 - l * params.tangent(b);
            acc = cubic(acc, c0, c1, e1);
        } else {
            let mid = (a + b) / 2.0;
            stack.push((mid, b));
            stack.push((a, mid));
        }
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    fn assert_p2_close(a: P2, b: P2) {
        assert!((a - b).length() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn quarter_circle_params() {
        let p =
            earc_params(dvec2(1.0, 0.0), false, false, 0.0, dvec2(1.0, 1.0), dvec2(0.0, 1.0))
                .unwrap();
        assert_p2_close(p.center, dvec2(0.0, 0.0));
        assert_close(p.t0, 0.0);
        assert_close(p.t1, FRAC_PI_2);
    }

    #[test]
    fn flag_combinations_select_the_four_arcs() {
        let p0 = dvec2(1.0, 0.0);
        let p1 = dvec2(0.0, 1.0);
        let r = dvec2(1.0, 1.0);
        let sweep = |large, cw| {
            let p = earc_params(p0, large, cw, 0.0, r, p1).unwrap();
            p.t1 - p.t0
        };
        assert_close(sweep(false, false), FRAC_PI_2);
        assert_close(sweep(true, false), 3.0 * FRAC_PI_2);
        assert_close(sweep(false, true), -FRAC_PI_2);
        assert_close(sweep(true, true), -3.0 * FRAC_PI_2);
    }

    #[test]
    fn endpoints_lie_on_the_arc() {
        let p0 = dvec2(2.0, 0.5);
        let p1 = dvec2(-0.5, 1.25);
        let p = earc_params(p0, true, false, 0.3, dvec2(2.0, 1.5), p1).unwrap();
        assert_p2_close(p.point(p.t0), p0);
        assert_p2_close(p.point(p.t1), p1);
    }

    #[test]
    fn degenerate_arcs_have_no_params() {
        let p0 = dvec2(0.0, 0.0);
        let p1 = dvec2(1.0, 0.0);
        // Zero radius.
        assert!(earc_params(p0, false, false, 0.0, dvec2(0.0, 1.0), p1).is_none());
        // Coincident endpoints.
        assert!(earc_params(p0, false, false, 0.0, dvec2(1.0, 1.0), p0).is_none());
        // Endpoints further apart than the diameter.
        assert!(earc_params(p0, false, false, 0.0, dvec2(0.25, 0.25), p1).is_none());
    }

    #[test]
    fn rotated_ellipse_endpoints_are_exact() {
        let p0 = dvec2(1.0, 2.0);
        let p1 = dvec2(3.0, 1.0);
        for &(large, cw) in &[(false, false), (false, true), (true, false), (true, true)] {
            let p = earc_params(p0, large, cw, PI / 5.0, dvec2(2.5, 1.25), p1).unwrap();
            assert_p2_close(p.point(p.t0), p0);
            assert_p2_close(p.point(p.t1), p1);
        }
    }

    #[test]
    fn cubic_quarter_circle_uses_the_classic_tangent_length() {
        // One leaf covers a quarter circle at this tolerance and its
        // control points sit at the classic 0.5523 offset.
        let kappa = (4.0 / 3.0) * (FRAC_PI_2 / 4.0).tan();
        let cubics = cubic_earc(
            1e-3,
            |mut acc: Vec<(P2, P2, P2)>, c0, c1, to| {
                acc.push((c0, c1, to));
                acc
            },
            Vec::new(),
            dvec2(1.0, 0.0),
            false,
            false,
            0.0,
            dvec2(1.0, 1.0),
            dvec2(0.0, 1.0),
        );
        assert_eq!(cubics.len(), 1);
        let (c0, c1, to) = cubics[0];
        assert_p2_close(c0, dvec2(1.0, kappa));
        assert_p2_close(c1, dvec2(kappa, 1.0));
        assert_p2_close(to, dvec2(0.0, 1.0));
    }

    #[test]
    fn cubic_earc_pieces_stay_within_tolerance() {
        let tol = 1e-4;
        let r = dvec2(2.0, 1.0);
        let midpoints = cubic_earc(
            tol,
            |mut acc: Vec<(P2, P2, P2, P2)>, c0, c1, to| {
                let from = acc.last().map(|s| s.3).unwrap_or(dvec2(2.0, 0.0));
                acc.push((from, c0, c1, to));
                acc
            },
            Vec::new(),
            dvec2(2.0, 0.0),
            false,
            false,
            0.0,
            r,
            dvec2(-2.0, 0.0),
        );
        assert!(midpoints.len() > 1);
        for (p0, c0, c1, p1) in midpoints {
            // De Casteljau midpoint of each piece sits close to the ellipse.
            let m01 = (p0 + c0) * 0.5;
            let m12 = (c0 + c1) * 0.5;
            let m23 = (c1 + p1) * 0.5;
            let m = ((m01 + m12) * 0.5 + (m12 + m23) * 0.5) * 0.5;
            let on = (m.x / r.x).powi(2) + (m.y / r.y).powi(2);
            assert!((on - 1.0).abs() < 1e-3, "midpoint off ellipse: {}", on);
        }
    }
}
