//! Adaptive flattening and arclength sampling.

use crate::math::P2;

use super::arc::earc_params;
use super::{Path, Segment};

/// Default flattening tolerance, in path coordinate units.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// A segment of a flattened path: only subpath starts, straight lines and
/// closes survive flattening.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlatSeg {
    Sub(P2),
    Line(P2),
    Close,
}

/// An event of an arclength sampling walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleSeg {
    Sub(P2),
    Sample(P2),
    Close,
}

fn mid(a: P2, b: P2) -> P2 {
    (a + b) * 0.5
}

/// Squared cross product of the chord `a -> b` with `a -> p`. Comparing it
/// against `tol² * |b - a|²` tests the perpendicular distance of `p` from
/// the chord without a division.
fn cross2(a: P2, b: P2, p: P2) -> f64 {
    let c = b - a;
    let d = p - a;
    let cross = c.x * d.y - c.y * d.x;
    cross * cross
}

impl Path {
    /// Folds `f` over a polyline approximation of the path.
    ///
    /// Curves are recursively bisected until flat under `tol`; the events
    /// are only [`FlatSeg::Sub`], [`FlatSeg::Line`] and [`FlatSeg::Close`].
    pub fn linear_fold<A, F>(&self, tol: f64, acc: A, mut f: F) -> A
    where
        F: FnMut(A, FlatSeg) -> A,
    {
        let tol16 = 16.0 * tol * tol;
        let mut acc = acc;
        let mut last = P2::ZERO;
        let mut start = P2::ZERO;
        for seg in &self.segs {
            match *seg {
                Segment::Sub(p) => {
                    acc = f(acc, FlatSeg::Sub(p));
                    last = p;
                    start = p;
                }
                Segment::Line(p) => {
                    acc = f(acc, FlatSeg::Line(p));
                    last = p;
                }
                Segment::QCurve(c, p) => {
                    let mut stack = vec![(last, c, p)];
                    while let Some((p0, c0, p1)) = stack.pop() {
                        let err = (2.0 * c0 - p0 - p1).length_squared();
                        if err <= tol16 {
                            acc = f(acc, FlatSeg::Line(p1));
                        } else {
                            let m0 = mid(p0, c0);
                            let m1 = mid(c0, p1);
                            let m = mid(m0, m1);
                            stack.push((m, m1, p1));
                            stack.push((p0, m0, m));
                        }
                    }
                    last = p;
                }
                Segment::CCurve(c0, c1, p) => {
                    let mut stack = vec![(last, c0, c1, p)];
                    while let Some((p0, c0, c1, p1)) = stack.pop() {
                        let e0 = (3.0 * c0 - 2.0 * p0 - p1).length_squared();
                        let e1 = (3.0 * c1 - 2.0 * p1 - p0).length_squared();
                        if e0.max(e1) <= tol16 {
                            acc = f(acc, FlatSeg::Line(p1));
                        } else {
                            let m0 = mid(p0, c0);
                            let mc = mid(c0, c1);
                            let m1 = mid(c1, p1);
                            let l1 = mid(m0, mc);
                            let r0 = mid(mc, m1);
                            let m = mid(l1, r0);
                            stack.push((m, r0, m1, p1));
                            stack.push((p0, m0, l1, m));
                        }
                    }
                    last = p;
                }
                Segment::EArc {
                    large,
                    cw,
                    angle,
                    radii,
                    to,
                } => {
                    match earc_params(last, large, cw, angle, radii, to) {
                        None => acc = f(acc, FlatSeg::Line(to)),
                        Some(params) => {
                            let tol2 = tol * tol;
                            let mut stack = vec![(params.t0, last, params.t1, to)];
                            while let Some((t0, p0, t1, p1)) = stack.pop() {
                                let tm = (t0 + t1) / 2.0;
                                let pm = params.point(tm);
                                // Midpoint deviation from the chord.
                                if cross2(p0, p1, pm) <= tol2 * (p1 - p0).length_squared() {
                                    acc = f(acc, FlatSeg::Line(p1));
                                } else {
                                    stack.push((tm, pm, t1, p1));
                                    stack.push((t0, p0, tm, pm));
                                }
                            }
                        }
                    }
                    last = to;
                }
                Segment::Close => {
                    acc = f(acc, FlatSeg::Close);
                    last = start;
                }
            }
        }
        acc
    }

    /// Folds `f` over [`SampleSeg`] events: points uniformly spaced by
    /// `period` in arclength along the flattened path. The residual
    /// distance carries across segments so sampling is uniform per
    /// subpath; a subpath start resets it. The closing chord is sampled
    /// like any other segment.
    pub fn sample<A, F>(&self, tol: f64, period: f64, acc: A, mut f: F) -> A
    where
        F: FnMut(A, SampleSeg) -> A,
    {
        struct St<A> {
            acc: A,
            last: P2,
            start: P2,
            walked: f64,
        }
        let st = self.linear_fold(
            tol,
            St {
                acc,
                last: P2::ZERO,
                start: P2::ZERO,
                walked: 0.0,
            },
            |mut st: St<A>, seg| {
                let to = match seg {
                    FlatSeg::Sub(p) => {
                        st.acc = f(st.acc, SampleSeg::Sub(p));
                        st.last = p;
                        st.start = p;
                        st.walked = 0.0;
                        return st;
                    }
                    FlatSeg::Line(p) => p,
                    FlatSeg::Close => st.start,
                };
                let v = to - st.last;
                let len = v.length();
                if len > 0.0 {
                    let dir = v / len;
                    let mut d = period - st.walked;
                    while d <= len {
                        st.acc = f(st.acc, SampleSeg::Sample(st.last + dir * d));
                        d += period;
                    }
                    st.walked = len - (d - period);
                }
                st.last = to;
                if let FlatSeg::Close = seg {
                    st.acc = f(st.acc, SampleSeg::Close);
                }
                st
            },
        );
        st.acc
    }
}
