//! Declarative 2D vector graphics.
//!
//! Describe an image as an immutable value — paths cut primitive fills,
//! blends stack them, transforms place them — then hand it to a
//! [`Renderer`] driving a [`Backend`] towards a buffer, a sink, or a
//! caller-managed output window.
//!
//! ```
//! use glam::dvec2;
//! use vellum::{Box2, Color, Image, Path};
//!
//! let square = Path::new().rect(Box2::new(dvec2(0.0, 0.0), dvec2(1.0, 1.0)));
//! let red = Image::uniform(Color::rgb(1.0, 0.0, 0.0)).cut(square);
//! let dot = Image::uniform(Color::rgb(0.0, 0.0, 1.0))
//!     .cut(Path::new().circle(dvec2(0.5, 0.5), 0.25))
//!     .blend(red);
//! assert!(!dot.is_void());
//! ```
//!
//! Vector and matrix types come from [`glam`]; points, vectors and
//! matrices in this crate are plain `DVec2`/`DMat2`/`DMat3`.

pub mod errors;
pub mod image;
pub mod log;
pub mod math;
pub mod meta;
pub mod path;
pub mod render;

pub use errors::{Error, Result};
pub use image::{Blender, Image, Primitive, Transform};
pub use math::{Box2, Color, ColorStop, Raster, Size2, Stops, M2, M3, P2, V2};
pub use meta::{Key, Meta};
pub use path::{Area, Cap, Dashes, Join, Outline, Path, Segment};
pub use render::{
    manual, Backend, Driver, Dst, DstKind, Event, Renderable, Renderer, Status, Warning,
};

/// The backend SPI: everything a renderer backend outside this crate
/// needs, and nothing else — the raw path and image representations, the
/// arc parameterization helpers, and the driver's writer surface.
pub mod spi {
    pub use crate::image::Node;
    pub use crate::path::arc::{cubic_earc, earc_params, ArcParams};
    pub use crate::path::flatten::{FlatSeg, SampleSeg, DEFAULT_TOLERANCE};
    pub use crate::path::Segment;
    pub use crate::render::{Backend, Driver, IO_BUFFER_SIZE};
}
