//! Immutable path values and their geometry.
//!
//! A [`Path`] is an ordered sequence of [`Segment`]s grouped into subpaths.
//! Builder methods consume the path and return a new one, so `Path` values
//! compose as a fluent chain:
//!
//! ```
//! use glam::dvec2;
//! use vellum::Path;
//!
//! let square = Path::new()
//!     .sub(dvec2(0.0, 0.0))
//!     .line(dvec2(1.0, 0.0))
//!     .line(dvec2(1.0, 1.0))
//!     .line(dvec2(0.0, 1.0))
//!     .close();
//! assert_eq!(square.segments().len(), 5);
//! ```
//!
//! Calling a drawing operation on the empty path or right after a close
//! implicitly opens a subpath at the origin of the previous subpath (or
//! `(0, 0)` when there is none), so chains never fail.

pub mod arc;
pub mod flatten;

use std::cmp::Ordering;
use std::fmt;

use glam::dvec2;

use crate::errors::{Error, Result};
use crate::math::{Box2, M3, P2, V2};

pub use arc::{earc_params, ArcParams};
pub use flatten::{FlatSeg, SampleSeg, DEFAULT_TOLERANCE};

use arc::EPS;

/// Line cap style for outline areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    Butt,
    Round,
    Square,
}

/// Segment join style for outline areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Join {
    Miter,
    Round,
    Bevel,
}

/// Dash phase and pattern.
pub type Dashes = (f64, Vec<f64>);

/// Outline parameters for stroked cuts.
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub width: f64,
    pub cap: Cap,
    pub join: Join,
    pub miter_angle: f64,
    pub dashes: Option<Dashes>,
}

impl Default for Outline {
    fn default() -> Self {
        Outline {
            width: 1.0,
            cap: Cap::Butt,
            join: Join::Miter,
            miter_angle: 0.0,
            dashes: None,
        }
    }
}

/// How a path delimits an area when used to cut an image.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Area {
    /// Non-zero winding fill rule.
    #[default]
    NonZero,
    /// Even-odd fill rule.
    EvenOdd,
    /// The stroked outline of the path.
    Outline(Outline),
}

impl Area {
    pub(crate) fn equal_f(&self, eq: &mut impl FnMut(f64, f64) -> bool, other: &Area) -> bool {
        match (self, other) {
            (Area::NonZero, Area::NonZero) | (Area::EvenOdd, Area::EvenOdd) => true,
            (Area::Outline(a), Area::Outline(b)) => {
                let dashes = match (&a.dashes, &b.dashes) {
                    (None, None) => true,
                    (Some((fa, pa)), Some((fb, pb))) => {
                        eq(*fa, *fb)
                            && pa.len() == pb.len()
                            && pa.iter().zip(pb).all(|(x, y)| eq(*x, *y))
                    }
                    _ => false,
                };
                eq(a.width, b.width)
                    && a.cap == b.cap
                    && a.join == b.join
                    && eq(a.miter_angle, b.miter_angle)
                    && dashes
            }
            _ => false,
        }
    }

    pub(crate) fn compare_f(
        &self,
        cmp: &mut impl FnMut(f64, f64) -> Ordering,
        other: &Area,
    ) -> Ordering {
        fn rank(a: &Area) -> u8 {
            match a {
                Area::NonZero => 0,
                Area::EvenOdd => 1,
                Area::Outline(_) => 2,
            }
        }
        match (self, other) {
            (Area::Outline(a), Area::Outline(b)) => cmp(a.width, b.width)
                .then_with(|| (a.cap as u8).cmp(&(b.cap as u8)))
                .then_with(|| (a.join as u8).cmp(&(b.join as u8)))
                .then_with(|| cmp(a.miter_angle, b.miter_angle))
                .then_with(|| match (&a.dashes, &b.dashes) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (Some((fa, pa)), Some((fb, pb))) => cmp(*fa, *fb)
                        .then_with(|| {
                            for (x, y) in pa.iter().zip(pb) {
                                let o = cmp(*x, *y);
                                if o != Ordering::Equal {
                                    return o;
                                }
                            }
                            Ordering::Equal
                        })
                        .then_with(|| pa.len().cmp(&pb.len())),
                }),
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::NonZero => write!(f, "anz"),
            Area::EvenOdd => write!(f, "aeo"),
            Area::Outline(o) => {
                write!(f, "(outline width:{}", o.width)?;
                if let Some((phase, pattern)) = &o.dashes {
                    write!(f, " dashes:{}:{:?}", phase, pattern)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// A path segment.
///
/// A segment's points are absolute; the implicit start of every non-`Sub`
/// segment is the endpoint of the segment before it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Starts a new subpath at the point.
    Sub(P2),
    /// Straight line to the point.
    Line(P2),
    /// Quadratic Bézier with one control point.
    QCurve(P2, P2),
    /// Cubic Bézier with two control points.
    CCurve(P2, P2, P2),
    /// Elliptic arc to `to`; `large` selects the sweep of more than half a
    /// turn, `cw` the clockwise traversal, `angle` is the x-axis rotation
    /// of the ellipse.
    EArc {
        large: bool,
        cw: bool,
        angle: f64,
        radii: V2,
        to: P2,
    },
    /// Closes the current subpath with a straight chord to its start.
    Close,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Segment::Sub(p) => write!(f, "M {} {}", p.x, p.y),
            Segment::Line(p) => write!(f, "L {} {}", p.x, p.y),
            Segment::QCurve(c, p) => write!(f, "Q {} {} {} {}", c.x, c.y, p.x, p.y),
            Segment::CCurve(c0, c1, p) => write!(
                f,
                "C {} {} {} {} {} {}",
                c0.x, c0.y, c1.x, c1.y, p.x, p.y
            ),
            Segment::EArc {
                large,
                cw,
                angle,
                radii,
                to,
            } => write!(
                f,
                "A {} {} {} {} {} {} {}",
                radii.x, radii.y, angle, large as u8, cw as u8, to.x, to.y
            ),
            Segment::Close => write!(f, "Z"),
        }
    }
}

/// An immutable path value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    pub(crate) segs: Vec<Segment>,
}

impl Path {
    /// The empty path.
    pub fn new() -> Path {
        Path::default()
    }

    pub fn is_empty(&self) -> bool {
        self.segs.is_empty()
    }

    /// Raw segment storage, in drawing order.
    pub fn segments(&self) -> &[Segment] {
        &self.segs
    }

    /// The point the next drawing operation continues from.
    ///
    /// Errors with [`Error::EmptyPath`] on the empty path. After a close
    /// the current point is the start of the closed subpath.
    pub fn current_point(&self) -> Result<P2> {
        match self.segs.last() {
            None => Err(Error::EmptyPath),
            Some(Segment::Close) => Ok(self.subpath_start()),
            Some(seg) => Ok(seg_end(seg)),
        }
    }

    /// Start point of the most recent subpath, `(0, 0)` for the empty path.
    fn subpath_start(&self) -> P2 {
        for seg in self.segs.iter().rev() {
            if let Segment::Sub(p) = seg {
                return *p;
            }
        }
        P2::ZERO
    }

    /// Opens an implicit subpath if a drawing operation has nowhere to
    /// continue from.
    fn prep(mut self) -> Path {
        match self.segs.last() {
            None => self.segs.push(Segment::Sub(P2::ZERO)),
            Some(Segment::Close) => {
                let start = self.subpath_start();
                self.segs.push(Segment::Sub(start));
            }
            _ => {}
        }
        self
    }

    fn last_point(&self) -> P2 {
        // Only called after prep: the path is non-empty and does not end
        // in a close.
        self.segs.last().map(seg_end).unwrap_or(P2::ZERO)
    }

    /// Starts a new subpath at `p`. An empty trailing subpath is replaced
    /// rather than kept around.
    pub fn sub(mut self, p: P2) -> Path {
        if let Some(Segment::Sub(_)) = self.segs.last() {
            self.segs.pop();
        }
        self.segs.push(Segment::Sub(p));
        self
    }

    /// Starts a new subpath at the previous subpath's origin offset by `v`.
    pub fn sub_rel(self, v: V2) -> Path {
        let origin = self.subpath_start();
        self.sub(origin + v)
    }

    /// Straight line to `p`.
    pub fn line(self, p: P2) -> Path {
        let mut path = self.prep();
        path.segs.push(Segment::Line(p));
        path
    }

    /// Straight line to the current point offset by `v`.
    pub fn line_rel(self, v: V2) -> Path {
        let path = self.prep();
        let p = path.last_point() + v;
        path.line(p)
    }

    /// Quadratic Bézier to `p` with control point `c`.
    pub fn qcurve(self, c: P2, p: P2) -> Path {
        let mut path = self.prep();
        path.segs.push(Segment::QCurve(c, p));
        path
    }

    /// Quadratic Bézier with both points relative to the current point.
    pub fn qcurve_rel(self, c: V2, p: V2) -> Path {
        let path = self.prep();
        let base = path.last_point();
        path.qcurve(base + c, base + p)
    }

    /// Cubic Bézier to `p` with control points `c0` and `c1`.
    pub fn ccurve(self, c0: P2, c1: P2, p: P2) -> Path {
        let mut path = self.prep();
        path.segs.push(Segment::CCurve(c0, c1, p));
        path
    }

    /// Cubic Bézier with all points relative to the current point.
    pub fn ccurve_rel(self, c0: V2, c1: V2, p: V2) -> Path {
        let path = self.prep();
        let base = path.last_point();
        path.ccurve(base + c0, base + c1, base + p)
    }

    /// Elliptic arc to `p`; see [`Segment::EArc`] for the flags.
    pub fn earc(self, large: bool, cw: bool, angle: f64, radii: V2, p: P2) -> Path {
        let mut path = self.prep();
        path.segs.push(Segment::EArc {
            large,
            cw,
            angle,
            radii,
            to: p,
        });
        path
    }

    /// Elliptic arc with the endpoint relative to the current point.
    pub fn earc_rel(self, large: bool, cw: bool, angle: f64, radii: V2, p: V2) -> Path {
        let path = self.prep();
        let base = path.last_point();
        path.earc(large, cw, angle, radii, base + p)
    }

    /// Closes the current subpath.
    ///
    /// A no-op when there is nothing to close: the path is empty, the
    /// subpath was just closed, or the subpath has no drawing segment yet.
    pub fn close(mut self) -> Path {
        match self.segs.last() {
            None | Some(Segment::Close) | Some(Segment::Sub(_)) => self,
            _ => {
                self.segs.push(Segment::Close);
                self
            }
        }
    }

    /// Appends a full circle of radius `r` centered on `c` as its own
    /// subpath, built from two half-turn arcs.
    pub fn circle(self, c: P2, r: f64) -> Path {
        self.ellipse(c, dvec2(r, r))
    }

    /// Appends a full axis-aligned ellipse as its own subpath.
    pub fn ellipse(self, c: P2, radii: V2) -> Path {
        let east = c + dvec2(radii.x, 0.0);
        let west = c - dvec2(radii.x, 0.0);
        self.sub(east)
            .earc(false, false, 0.0, radii, west)
            .earc(false, false, 0.0, radii, east)
            .close()
    }

    /// Appends an axis-aligned rectangle as its own subpath.
    pub fn rect(self, b: Box2) -> Path {
        if b.is_empty() {
            return self;
        }
        self.sub(b.min)
            .line(dvec2(b.max.x, b.min.y))
            .line(b.max)
            .line(dvec2(b.min.x, b.max.y))
            .close()
    }

    /// Appends an axis-aligned rounded rectangle with corner radii `r`,
    /// four lines and four quarter arcs.
    pub fn rrect(self, b: Box2, r: V2) -> Path {
        if b.is_empty() {
            return self;
        }
        let (x0, y0) = (b.min.x, b.min.y);
        let (x1, y1) = (b.max.x, b.max.y);
        let (rx, ry) = (r.x, r.y);
        self.sub(dvec2(x0 + rx, y1))
            .line(dvec2(x1 - rx, y1))
            .earc(false, true, 0.0, r, dvec2(x1, y1 - ry))
            .line(dvec2(x1, y0 + ry))
            .earc(false, true, 0.0, r, dvec2(x1 - rx, y0))
            .line(dvec2(x0 + rx, y0))
            .earc(false, true, 0.0, r, dvec2(x0, y0 + ry))
            .line(dvec2(x0, y1 - ry))
            .earc(false, true, 0.0, r, dvec2(x0 + rx, y1))
            .close()
    }

    /// Folds `f` over the segments in drawing order.
    pub fn fold<A, F: FnMut(A, Segment) -> A>(&self, acc: A, mut f: F) -> A {
        self.segs.iter().fold(acc, |acc, s| f(acc, *s))
    }

    /// Folds `f` over the segments in reverse order.
    pub fn fold_rev<A, F: FnMut(A, Segment) -> A>(&self, acc: A, mut f: F) -> A {
        self.segs.iter().rev().fold(acc, |acc, s| f(acc, *s))
    }

    /// The path mapped through the affine transform `m`.
    ///
    /// Arc segments transform their ellipse axis vectors and re-measure
    /// rotation and radii; endpoints stay exact under any affine map, but
    /// a reflection leaves the `large`/`cw` flags untouched and thus flips
    /// the apparent sweep.
    pub fn tr(&self, m: M3) -> Path {
        let segs = self
            .segs
            .iter()
            .map(|seg| match *seg {
                Segment::Sub(p) => Segment::Sub(m.transform_point2(p)),
                Segment::Line(p) => Segment::Line(m.transform_point2(p)),
                Segment::QCurve(c, p) => {
                    Segment::QCurve(m.transform_point2(c), m.transform_point2(p))
                }
                Segment::CCurve(c0, c1, p) => Segment::CCurve(
                    m.transform_point2(c0),
                    m.transform_point2(c1),
                    m.transform_point2(p),
                ),
                Segment::EArc {
                    large,
                    cw,
                    angle,
                    radii,
                    to,
                } => {
                    let (sina, cosa) = angle.sin_cos();
                    let ax = m.transform_vector2(dvec2(cosa * radii.x, sina * radii.x));
                    let ay = m.transform_vector2(dvec2(-sina * radii.y, cosa * radii.y));
                    Segment::EArc {
                        large,
                        cw,
                        angle: ax.y.atan2(ax.x),
                        radii: dvec2(ax.length(), ay.length()),
                        to: m.transform_point2(to),
                    }
                }
                Segment::Close => Segment::Close,
            })
            .collect();
        Path { segs }
    }

    /// Axis-aligned bounding box of the path, the empty box for the empty
    /// path.
    ///
    /// With `ctrl` the box bounds the control polygon: cheap and
    /// conservative. Without it the box is tight: curve extrema are
    /// tracked per coordinate and arcs contribute their endpoints and
    /// midpoint sample.
    pub fn bounds(&self, ctrl: bool) -> Box2 {
        let mut b = Box2::EMPTY;
        let mut last = P2::ZERO;
        let mut start = P2::ZERO;
        for seg in &self.segs {
            match *seg {
                Segment::Sub(p) => {
                    b.expand_point(p);
                    last = p;
                    start = p;
                }
                Segment::Line(p) => {
                    b.expand_point(p);
                    last = p;
                }
                Segment::QCurve(c, p) => {
                    if ctrl {
                        b.expand_point(c);
                    } else {
                        // Extremum of the derivative, per coordinate.
                        for i in 0..2 {
                            let denom = last[i] - 2.0 * c[i] + p[i];
                            if denom.abs() > EPS {
                                let t = (last[i] - c[i]) / denom;
                                if t > 0.0 && t < 1.0 {
                                    b.expand_point(quad_point(last, c, p, t));
                                }
                            }
                        }
                    }
                    b.expand_point(p);
                    last = p;
                }
                Segment::CCurve(c0, c1, p) => {
                    if ctrl {
                        b.expand_point(c0);
                        b.expand_point(c1);
                    } else {
                        // Roots of the quadratic derivative, per coordinate,
                        // solved with the numerically stable form and
                        // evaluated by de Casteljau.
                        for i in 0..2 {
                            let a = p[i] - 3.0 * c1[i] + 3.0 * c0[i] - last[i];
                            let bq = 2.0 * (c1[i] - 2.0 * c0[i] + last[i]);
                            let cq = c0[i] - last[i];
                            let (roots, n) = quadratic_roots(a, bq, cq);
                            for &t in &roots[..n] {
                                if t > 0.0 && t < 1.0 {
                                    b.expand_point(cubic_point(last, c0, c1, p, t));
                                }
                            }
                        }
                    }
                    b.expand_point(p);
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
                        None => {}
                        Some(params) => {
                            if ctrl {
                                // Whole-ellipse box: conservative and cheap.
                                let ex = params.m.x_axis.x.hypot(params.m.y_axis.x);
                                let ey = params.m.x_axis.y.hypot(params.m.y_axis.y);
                                b.expand_point(params.center - dvec2(ex, ey));
                                b.expand_point(params.center + dvec2(ex, ey));
                            } else {
                                b.expand_point(params.point((params.t0 + params.t1) / 2.0));
                            }
                        }
                    }
                    b.expand_point(to);
                    last = to;
                }
                Segment::Close => {
                    last = start;
                }
            }
        }
        b
    }

    /// Structural equality with floats compared through `eq`.
    pub fn equal_f<F: FnMut(f64, f64) -> bool>(&self, mut eq: F, other: &Path) -> bool {
        if self.segs.len() != other.segs.len() {
            return false;
        }
        let mut p2 = |a: P2, b: P2, eq: &mut F| eq(a.x, b.x) && eq(a.y, b.y);
        self.segs.iter().zip(&other.segs).all(|(a, b)| match (a, b) {
            (Segment::Sub(pa), Segment::Sub(pb)) | (Segment::Line(pa), Segment::Line(pb)) => {
                p2(*pa, *pb, &mut eq)
            }
            (Segment::QCurve(ca, pa), Segment::QCurve(cb, pb)) => {
                p2(*ca, *cb, &mut eq) && p2(*pa, *pb, &mut eq)
            }
            (Segment::CCurve(ca0, ca1, pa), Segment::CCurve(cb0, cb1, pb)) => {
                p2(*ca0, *cb0, &mut eq) && p2(*ca1, *cb1, &mut eq) && p2(*pa, *pb, &mut eq)
            }
            (
                Segment::EArc {
                    large: la,
                    cw: wa,
                    angle: aa,
                    radii: ra,
                    to: pa,
                },
                Segment::EArc {
                    large: lb,
                    cw: wb,
                    angle: ab,
                    radii: rb,
                    to: pb,
                },
            ) => {
                la == lb && wa == wb && eq(*aa, *ab) && p2(*ra, *rb, &mut eq) && p2(*pa, *pb, &mut eq)
            }
            (Segment::Close, Segment::Close) => true,
            _ => false,
        })
    }

    /// Total order over paths using `f64::total_cmp` on coordinates.
    pub fn compare(&self, other: &Path) -> Ordering {
        self.compare_f(|a, b| f64::total_cmp(&a, &b), other)
    }

    /// Total order over paths with floats ordered through `cmp`.
    pub fn compare_f<F: FnMut(f64, f64) -> Ordering>(&self, mut cmp: F, other: &Path) -> Ordering {
        fn rank(s: &Segment) -> u8 {
            match s {
                Segment::Sub(_) => 0,
                Segment::Line(_) => 1,
                Segment::QCurve(..) => 2,
                Segment::CCurve(..) => 3,
                Segment::EArc { .. } => 4,
                Segment::Close => 5,
            }
        }
        let mut p2 = |a: P2, b: P2, cmp: &mut F| cmp(a.x, b.x).then_with(|| cmp(a.y, b.y));
        for (a, b) in self.segs.iter().zip(&other.segs) {
            let o = match (a, b) {
                (Segment::Sub(pa), Segment::Sub(pb)) | (Segment::Line(pa), Segment::Line(pb)) => {
                    p2(*pa, *pb, &mut cmp)
                }
                (Segment::QCurve(ca, pa), Segment::QCurve(cb, pb)) => {
                    p2(*ca, *cb, &mut cmp).then_with(|| p2(*pa, *pb, &mut cmp))
                }
                (Segment::CCurve(ca0, ca1, pa), Segment::CCurve(cb0, cb1, pb)) => {
                    p2(*ca0, *cb0, &mut cmp)
                        .then_with(|| p2(*ca1, *cb1, &mut cmp))
                        .then_with(|| p2(*pa, *pb, &mut cmp))
                }
                (
                    Segment::EArc {
                        large: la,
                        cw: wa,
                        angle: aa,
                        radii: ra,
                        to: pa,
                    },
                    Segment::EArc {
                        large: lb,
                        cw: wb,
                        angle: ab,
                        radii: rb,
                        to: pb,
                    },
                ) => la
                    .cmp(lb)
                    .then_with(|| wa.cmp(wb))
                    .then_with(|| cmp(*aa, *ab))
                    .then_with(|| p2(*ra, *rb, &mut cmp))
                    .then_with(|| p2(*pa, *pb, &mut cmp)),
                (Segment::Close, Segment::Close) => Ordering::Equal,
                _ => rank(a).cmp(&rank(b)),
            };
            if o != Ordering::Equal {
                return o;
            }
        }
        self.segs.len().cmp(&other.segs.len())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segs.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

fn seg_end(seg: &Segment) -> P2 {
    match *seg {
        Segment::Sub(p)
        | Segment::Line(p)
        | Segment::QCurve(_, p)
        | Segment::CCurve(_, _, p)
        | Segment::EArc { to: p, .. } => p,
        // The caller resolves the subpath start for closes.
        Segment::Close => P2::ZERO,
    }
}

fn quad_point(p0: P2, c: P2, p1: P2, t: f64) -> P2 {
    let m0 = p0.lerp(c, t);
    let m1 = c.lerp(p1, t);
    m0.lerp(m1, t)
}

fn cubic_point(p0: P2, c0: P2, c1: P2, p1: P2, t: f64) -> P2 {
    let m0 = p0.lerp(c0, t);
    let mc = c0.lerp(c1, t);
    let m1 = c1.lerp(p1, t);
    let l = m0.lerp(mc, t);
    let r = mc.lerp(m1, t);
    l.lerp(r, t)
}

/// Real roots of `a·t² + b·t + c`, computed with the sign-matched
/// discriminant form to avoid cancellation.
fn quadratic_roots(a: f64, b: f64, c: f64) -> ([f64; 2], usize) {
    if a.abs() < EPS {
        if b.abs() < EPS {
            return ([0.0; 2], 0);
        }
        return ([-c / b, 0.0], 1);
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return ([0.0; 2], 0);
    }
    let q = -0.5 * (b + b.signum() * disc.sqrt());
    if q.abs() < EPS {
        return ([0.0, 0.0], 1);
    }
    ([q / a, c / q], 2)
}
