//! Immutable, compositional image values.
//!
//! An [`Image`] is a tree: leaves are primitive fills (colors, gradients,
//! raster samples) and interior nodes cut by a path, blend two images,
//! transform, or annotate a subtree. Images are cheap to clone and share
//! structurally.
//!
//! All tree traversals here (equality, compare, printing) are iterative
//! with an explicit work stack; image trees can be deep enough that
//! recursion would exhaust the call stack.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::math::{Box2, Color, ColorStop, M3, P2, Raster, Stops, V2};
use crate::meta::Meta;
use crate::path::{Area, Path};

/// A primitive fill, the leaf of an image tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Uniform color everywhere.
    Const(Color),
    /// Linear gradient along the axis between the two points.
    Axial(Stops, P2, P2),
    /// Radial gradient on the circle of the given center and radius, seen
    /// from the focus point.
    Radial(Stops, P2, P2, f64),
    /// Raster samples mapped onto the box.
    Raster(Box2, Raster),
}

/// Blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blender {
    Atop,
    In,
    Out,
    Over,
    Plus,
    Copy,
    Xor,
}

impl fmt::Display for Blender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Blender::Atop => "atop",
            Blender::In => "in",
            Blender::Out => "out",
            Blender::Over => "over",
            Blender::Plus => "plus",
            Blender::Copy => "copy",
            Blender::Xor => "xor",
        };
        f.write_str(name)
    }
}

/// A 2D transform, kept symbolic until a backend needs the matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    Move(V2),
    Rot(f64),
    Scale(V2),
    Matrix(M3),
}

impl Transform {
    /// The transform as an affine matrix.
    pub fn matrix(&self) -> M3 {
        match *self {
            Transform::Move(v) => M3::from_translation(v),
            Transform::Rot(a) => M3::from_angle(a),
            Transform::Scale(s) => M3::from_scale(s),
            Transform::Matrix(m) => m,
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Transform::Move(v) => write!(f, "(move {} {})", v.x, v.y),
            Transform::Rot(a) => write!(f, "(rot {})", a),
            Transform::Scale(s) => write!(f, "(scale {} {})", s.x, s.y),
            Transform::Matrix(m) => write!(f, "(matrix {:?})", m.to_cols_array()),
        }
    }
}

/// An image tree node. Backends match on this through [`Image::node`].
#[derive(Debug)]
pub enum Node {
    Primitive(Primitive),
    Cut(Area, Path, Image),
    Blend(Blender, Option<f64>, Image, Image),
    Tr(Transform, Image),
    Meta(Meta, Image),
}

/// An immutable image value.
#[derive(Clone)]
pub struct Image(Arc<Node>);

static VOID: LazyLock<Image> =
    LazyLock::new(|| Image(Arc::new(Node::Primitive(Primitive::Const(Color::TRANSPARENT)))));

impl Image {
    fn from_node(n: Node) -> Image {
        Image(Arc::new(n))
    }

    /// The root node of the tree.
    pub fn node(&self) -> &Node {
        &self.0
    }

    /// Uniform color everywhere.
    pub fn uniform(c: Color) -> Image {
        Image::from_node(Node::Primitive(Primitive::Const(c)))
    }

    /// The invisible image: uniform transparent black.
    pub fn void() -> Image {
        VOID.clone()
    }

    /// Whether this is *the* void image. Identity-based fast path;
    /// structural equality still holds against any uniform transparent.
    pub fn is_void(&self) -> bool {
        Arc::ptr_eq(&self.0, &VOID.0)
    }

    /// Linear gradient along `p0 -> p1`.
    pub fn axial(stops: Stops, p0: P2, p1: P2) -> Image {
        Image::from_node(Node::Primitive(Primitive::Axial(stops, p0, p1)))
    }

    /// Radial gradient with the focus at the center.
    pub fn radial(stops: Stops, center: P2, r: f64) -> Image {
        Image::radial_focus(stops, center, center, r)
    }

    /// Radial gradient with an explicit focus inside the circle.
    pub fn radial_focus(stops: Stops, focus: P2, center: P2, r: f64) -> Image {
        Image::from_node(Node::Primitive(Primitive::Radial(stops, focus, center, r)))
    }

    /// Raster samples mapped onto `bounds`.
    pub fn raster(bounds: Box2, r: Raster) -> Image {
        Image::from_node(Node::Primitive(Primitive::Raster(bounds, r)))
    }

    /// Clips the image to the interior of `p` under the non-zero rule.
    pub fn cut(self, p: Path) -> Image {
        self.cut_area(Area::default(), p)
    }

    /// Clips the image to the area `p` delimits under `area`; with
    /// [`Area::Outline`] the area is the stroked outline of the path.
    pub fn cut_area(self, area: Area, p: Path) -> Image {
        Image::from_node(Node::Cut(area, p, self))
    }

    /// Places `self` atop `below` with the default `Over` blender.
    pub fn blend(self, below: Image) -> Image {
        self.blend_with(Blender::Over, None, below)
    }

    /// Places `self` atop `below`; `alpha`, when given, scales the blend
    /// globally, otherwise only the images' inherent alpha is used.
    pub fn blend_with(self, blender: Blender, alpha: Option<f64>, below: Image) -> Image {
        Image::from_node(Node::Blend(blender, alpha, self, below))
    }

    /// Translates the image geometry by `v`.
    pub fn translate(self, v: V2) -> Image {
        Image::from_node(Node::Tr(Transform::Move(v), self))
    }

    /// Rotates the image geometry by `a` radians around the origin.
    pub fn rotate(self, a: f64) -> Image {
        Image::from_node(Node::Tr(Transform::Rot(a), self))
    }

    /// Scales the image geometry by `s`.
    pub fn scale(self, s: V2) -> Image {
        Image::from_node(Node::Tr(Transform::Scale(s), self))
    }

    /// Transforms the image geometry by the affine matrix `m`.
    pub fn transform(self, m: M3) -> Image {
        Image::from_node(Node::Tr(Transform::Matrix(m), self))
    }

    /// Annotates the image with metadata; purely informational, never
    /// changes rendering.
    pub fn tag(self, meta: Meta) -> Image {
        Image::from_node(Node::Meta(meta, self))
    }

    /// Structural equality with floats compared through `eq`.
    pub fn equal_f<F: FnMut(f64, f64) -> bool>(&self, mut eq: F, other: &Image) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if Arc::ptr_eq(&a.0, &b.0) {
                continue;
            }
            match (&*a.0, &*b.0) {
                (Node::Primitive(pa), Node::Primitive(pb)) => {
                    if !prim_equal_f(&mut eq, pa, pb) {
                        return false;
                    }
                }
                (Node::Cut(aa, pa, ia), Node::Cut(ab, pb, ib)) => {
                    if !aa.equal_f(&mut eq, ab) || !pa.equal_f(&mut eq, pb) {
                        return false;
                    }
                    stack.push((ia, ib));
                }
                (Node::Blend(ba, la, i0a, i1a), Node::Blend(bb, lb, i0b, i1b)) => {
                    if ba != bb {
                        return false;
                    }
                    match (la, lb) {
                        (None, None) => {}
                        (Some(x), Some(y)) => {
                            if !eq(*x, *y) {
                                return false;
                            }
                        }
                        _ => return false,
                    }
                    stack.push((i1a, i1b));
                    stack.push((i0a, i0b));
                }
                (Node::Tr(ta, ia), Node::Tr(tb, ib)) => {
                    if !tr_equal_f(&mut eq, ta, tb) {
                        return false;
                    }
                    stack.push((ia, ib));
                }
                (Node::Meta(ma, ia), Node::Meta(mb, ib)) => {
                    if ma != mb {
                        return false;
                    }
                    stack.push((ia, ib));
                }
                _ => return false,
            }
        }
        true
    }

    /// Total order over images using `f64::total_cmp` on scalars.
    pub fn compare(&self, other: &Image) -> Ordering {
        self.compare_f(|a, b| f64::total_cmp(&a, &b), other)
    }

    /// Total order over images with floats ordered through `cmp`.
    pub fn compare_f<F: FnMut(f64, f64) -> Ordering>(&self, mut cmp: F, other: &Image) -> Ordering {
        fn rank(n: &Node) -> u8 {
            match n {
                Node::Primitive(_) => 0,
                Node::Cut(..) => 1,
                Node::Blend(..) => 2,
                Node::Tr(..) => 3,
                Node::Meta(..) => 4,
            }
        }
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            if Arc::ptr_eq(&a.0, &b.0) {
                continue;
            }
            let o = match (&*a.0, &*b.0) {
                (Node::Primitive(pa), Node::Primitive(pb)) => prim_compare_f(&mut cmp, pa, pb),
                (Node::Cut(aa, pa, ia), Node::Cut(ab, pb, ib)) => {
                    let o = aa
                        .compare_f(&mut cmp, ab)
                        .then_with(|| pa.compare_f(&mut cmp, pb));
                    if o == Ordering::Equal {
                        stack.push((ia, ib));
                    }
                    o
                }
                (Node::Blend(ba, la, i0a, i1a), Node::Blend(bb, lb, i0b, i1b)) => {
                    let o = (*ba as u8).cmp(&(*bb as u8)).then_with(|| match (la, lb) {
                        (None, None) => Ordering::Equal,
                        (None, Some(_)) => Ordering::Less,
                        (Some(_), None) => Ordering::Greater,
                        (Some(x), Some(y)) => cmp(*x, *y),
                    });
                    if o == Ordering::Equal {
                        stack.push((i1a, i1b));
                        stack.push((i0a, i0b));
                    }
                    o
                }
                (Node::Tr(ta, ia), Node::Tr(tb, ib)) => {
                    let o = tr_compare_f(&mut cmp, ta, tb);
                    if o == Ordering::Equal {
                        stack.push((ia, ib));
                    }
                    o
                }
                (Node::Meta(ma, ia), Node::Meta(mb, ib)) => {
                    let o = ma.compare(mb);
                    if o == Ordering::Equal {
                        stack.push((ia, ib));
                    }
                    o
                }
                (na, nb) => rank(na).cmp(&rank(nb)),
            };
            if o != Ordering::Equal {
                return o;
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.equal_f(|a, b| a == b, other)
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        // Unlink children iteratively; dropping a deep chain through the
        // default drop glue would recurse once per node.
        let mut stack: Vec<Arc<Node>> = Vec::new();
        if let Some(node) = Arc::get_mut(&mut self.0) {
            detach_children(node, &mut stack);
        }
        while let Some(mut arc) = stack.pop() {
            if let Some(node) = Arc::get_mut(&mut arc) {
                detach_children(node, &mut stack);
            }
        }
    }
}

/// Swaps each child image for the shared void so the node can be dropped
/// without recursing into the subtree.
fn detach_children(node: &mut Node, stack: &mut Vec<Arc<Node>>) {
    fn take(img: &mut Image) -> Arc<Node> {
        std::mem::replace(&mut img.0, VOID.0.clone())
    }
    match node {
        Node::Primitive(_) => {}
        Node::Cut(_, _, i) | Node::Tr(_, i) | Node::Meta(_, i) => stack.push(take(i)),
        Node::Blend(_, _, i0, i1) => {
            stack.push(take(i0));
            stack.push(take(i1));
        }
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Tok<'a> {
            Img(&'a Image),
            Lit(&'static str),
        }
        let mut stack = vec![Tok::Img(self)];
        while let Some(tok) = stack.pop() {
            match tok {
                Tok::Lit(s) => f.write_str(s)?,
                Tok::Img(i) => match &*i.0 {
                    Node::Primitive(p) => fmt_primitive(p, f)?,
                    Node::Cut(a, p, img) => {
                        write!(f, "(cut {} ({}) ", a, p)?;
                        stack.push(Tok::Lit(")"));
                        stack.push(Tok::Img(img));
                    }
                    Node::Blend(b, alpha, i0, i1) => {
                        write!(f, "(blend {}", b)?;
                        if let Some(a) = alpha {
                            write!(f, " alpha:{}", a)?;
                        }
                        f.write_str(" ")?;
                        stack.push(Tok::Lit(")"));
                        stack.push(Tok::Img(i1));
                        stack.push(Tok::Lit(" "));
                        stack.push(Tok::Img(i0));
                    }
                    Node::Tr(t, img) => {
                        write!(f, "(tr {} ", t)?;
                        stack.push(Tok::Lit(")"));
                        stack.push(Tok::Img(img));
                    }
                    Node::Meta(m, img) => {
                        write!(f, "(meta {} ", m)?;
                        stack.push(Tok::Lit(")"));
                        stack.push(Tok::Img(img));
                    }
                },
            }
        }
        Ok(())
    }
}

fn fmt_primitive(p: &Primitive, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match p {
        Primitive::Const(c) => write!(f, "(const {})", c),
        Primitive::Axial(stops, p0, p1) => {
            write!(f, "(axial ")?;
            fmt_stops(stops, f)?;
            write!(f, " ({} {}) ({} {}))", p0.x, p0.y, p1.x, p1.y)
        }
        Primitive::Radial(stops, focus, center, r) => {
            write!(f, "(radial ")?;
            fmt_stops(stops, f)?;
            write!(
                f,
                " focus:({} {}) ({} {}) {})",
                focus.x, focus.y, center.x, center.y, r
            )
        }
        Primitive::Raster(b, r) => write!(f, "(raster {} {})", b, r),
    }
}

fn fmt_stops(stops: &Stops, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[")?;
    for (i, s) in stops.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}:{}", s.t, s.color)?;
    }
    write!(f, "]")
}

fn color_equal_f(eq: &mut impl FnMut(f64, f64) -> bool, a: Color, b: Color) -> bool {
    eq(a.r, b.r) && eq(a.g, b.g) && eq(a.b, b.b) && eq(a.a, b.a)
}

fn stops_equal_f(eq: &mut impl FnMut(f64, f64) -> bool, a: &[ColorStop], b: &[ColorStop]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| eq(x.t, y.t) && color_equal_f(eq, x.color, y.color))
}

fn p2_equal_f(eq: &mut impl FnMut(f64, f64) -> bool, a: P2, b: P2) -> bool {
    eq(a.x, b.x) && eq(a.y, b.y)
}

fn prim_equal_f(eq: &mut impl FnMut(f64, f64) -> bool, a: &Primitive, b: &Primitive) -> bool {
    match (a, b) {
        (Primitive::Const(ca), Primitive::Const(cb)) => color_equal_f(eq, *ca, *cb),
        (Primitive::Axial(sa, a0, a1), Primitive::Axial(sb, b0, b1)) => {
            stops_equal_f(eq, sa, sb) && p2_equal_f(eq, *a0, *b0) && p2_equal_f(eq, *a1, *b1)
        }
        (Primitive::Radial(sa, fa, ca, ra), Primitive::Radial(sb, fb, cb, rb)) => {
            stops_equal_f(eq, sa, sb)
                && p2_equal_f(eq, *fa, *fb)
                && p2_equal_f(eq, *ca, *cb)
                && eq(*ra, *rb)
        }
        (Primitive::Raster(ba, ra), Primitive::Raster(bb, rb)) => {
            p2_equal_f(eq, ba.min, bb.min) && p2_equal_f(eq, ba.max, bb.max) && ra == rb
        }
        _ => false,
    }
}

fn tr_equal_f(eq: &mut impl FnMut(f64, f64) -> bool, a: &Transform, b: &Transform) -> bool {
    match (a, b) {
        (Transform::Move(va), Transform::Move(vb)) => p2_equal_f(eq, *va, *vb),
        (Transform::Rot(aa), Transform::Rot(ab)) => eq(*aa, *ab),
        (Transform::Scale(sa), Transform::Scale(sb)) => p2_equal_f(eq, *sa, *sb),
        (Transform::Matrix(ma), Transform::Matrix(mb)) => ma
            .to_cols_array()
            .iter()
            .zip(mb.to_cols_array().iter())
            .all(|(x, y)| eq(*x, *y)),
        _ => false,
    }
}

fn p2_compare_f(cmp: &mut impl FnMut(f64, f64) -> Ordering, a: P2, b: P2) -> Ordering {
    cmp(a.x, b.x).then_with(|| cmp(a.y, b.y))
}

fn color_compare_f(cmp: &mut impl FnMut(f64, f64) -> Ordering, a: Color, b: Color) -> Ordering {
    cmp(a.r, b.r)
        .then_with(|| cmp(a.g, b.g))
        .then_with(|| cmp(a.b, b.b))
        .then_with(|| cmp(a.a, b.a))
}

fn stops_compare_f(
    cmp: &mut impl FnMut(f64, f64) -> Ordering,
    a: &[ColorStop],
    b: &[ColorStop],
) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        let o = cmp(x.t, y.t).then_with(|| color_compare_f(cmp, x.color, y.color));
        if o != Ordering::Equal {
            return o;
        }
    }
    a.len().cmp(&b.len())
}

fn prim_compare_f(
    cmp: &mut impl FnMut(f64, f64) -> Ordering,
    a: &Primitive,
    b: &Primitive,
) -> Ordering {
    fn rank(p: &Primitive) -> u8 {
        match p {
            Primitive::Const(_) => 0,
            Primitive::Axial(..) => 1,
            Primitive::Radial(..) => 2,
            Primitive::Raster(..) => 3,
        }
    }
    match (a, b) {
        (Primitive::Const(ca), Primitive::Const(cb)) => color_compare_f(cmp, *ca, *cb),
        (Primitive::Axial(sa, a0, a1), Primitive::Axial(sb, b0, b1)) => {
            stops_compare_f(cmp, sa, sb)
                .then_with(|| p2_compare_f(cmp, *a0, *b0))
                .then_with(|| p2_compare_f(cmp, *a1, *b1))
        }
        (Primitive::Radial(sa, fa, ca, ra), Primitive::Radial(sb, fb, cb, rb)) => {
            stops_compare_f(cmp, sa, sb)
                .then_with(|| p2_compare_f(cmp, *fa, *fb))
                .then_with(|| p2_compare_f(cmp, *ca, *cb))
                .then_with(|| cmp(*ra, *rb))
        }
        (Primitive::Raster(ba, ra), Primitive::Raster(bb, rb)) => p2_compare_f(cmp, ba.min, bb.min)
            .then_with(|| p2_compare_f(cmp, ba.max, bb.max))
            .then_with(|| ra.cmp(rb)),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn tr_compare_f(cmp: &mut impl FnMut(f64, f64) -> Ordering, a: &Transform, b: &Transform) -> Ordering {
    fn rank(t: &Transform) -> u8 {
        match t {
            Transform::Move(_) => 0,
            Transform::Rot(_) => 1,
            Transform::Scale(_) => 2,
            Transform::Matrix(_) => 3,
        }
    }
    match (a, b) {
        (Transform::Move(va), Transform::Move(vb)) => p2_compare_f(cmp, *va, *vb),
        (Transform::Rot(aa), Transform::Rot(ab)) => cmp(*aa, *ab),
        (Transform::Scale(sa), Transform::Scale(sb)) => p2_compare_f(cmp, *sa, *sb),
        (Transform::Matrix(ma), Transform::Matrix(mb)) => {
            let xs = ma.to_cols_array();
            let ys = mb.to_cols_array();
            for (x, y) in xs.iter().zip(ys.iter()) {
                let o = cmp(*x, *y);
                if o != Ordering::Equal {
                    return o;
                }
            }
            Ordering::Equal
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
