//! Streaming renderer driver.
//!
//! A [`Renderer`] feeds [`Renderable`]s through a [`Backend`] towards a
//! destination. Rendering is incremental: the backend writes bytes through
//! the [`Driver`] window primitives, and under a [`Dst::Manual`]
//! destination a full window suspends rendering with [`Status::Partial`]
//! until the caller installs a fresh window ([`manual::dst`]) and resumes
//! with [`Event::Await`].
//!
//! A backend chooses at creation whether it renders exactly one image
//! (once mode) or arbitrarily many before the final [`Event::End`].

mod driver;

use std::fmt;
use std::io;

use crate::errors::{Error, Result};
use crate::image::Image;
use crate::math::{Box2, Size2};
use crate::meta::Meta;

pub(crate) use driver::Out;
pub use driver::{Driver, Warning, IO_BUFFER_SIZE};

/// What to render: a physical size in millimeters, the rectangle of image
/// space mapped onto that size, and the image itself.
#[derive(Debug, Clone)]
pub struct Renderable {
    pub size: Size2,
    pub view: Box2,
    pub image: Image,
}

impl Renderable {
    pub fn new(size: Size2, view: Box2, image: Image) -> Self {
        Renderable { size, view, image }
    }
}

/// Events the user sends to a renderer.
#[derive(Debug, Clone)]
pub enum Event {
    /// Resume a suspended rendering after refilling the window.
    Await,
    /// Render this renderable.
    Image(Renderable),
    /// Finish rendering.
    End,
}

/// Outcome of a `render` call.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The event was fully consumed.
    Ok,
    /// The backend wants more output space; install a window and `Await`.
    Partial,
}

/// A render destination.
pub enum Dst {
    /// Driver-owned growable buffer; read it back with
    /// [`Renderer::buffer`] or [`Renderer::into_buffer`].
    Buffer,
    /// A sink the driver writes full windows to.
    Channel(Box<dyn io::Write>),
    /// Caller-managed windows, installed through [`manual::dst`].
    Manual,
    /// The backend manages output itself; writer primitives are inert.
    Other,
}

impl fmt::Debug for Dst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dst::Buffer => "Buffer",
            Dst::Channel(_) => "Channel(..)",
            Dst::Manual => "Manual",
            Dst::Other => "Other",
        })
    }
}

/// Destination kind descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstKind {
    Buffer,
    Channel,
    Manual,
    Other,
}

/// A renderer backend.
///
/// `render` is called once per user event; when it returns
/// [`Status::Partial`] it is re-entered with [`Event::Await`] after the
/// caller provides output space, and is expected to resume from state it
/// kept itself.
pub trait Backend {
    /// Whether this backend accepts a single image before `End`.
    fn once(&self) -> bool {
        false
    }

    fn render(&mut self, drv: &mut Driver, ev: &Event) -> Result<Status>;
}

#[derive(Debug, Clone, Copy)]
enum State {
    Ready { images: usize },
    Parked { on_end: bool, images: usize },
    Ended,
}

/// A renderer: a backend, a destination, and the lifecycle state between
/// them.
///
/// Not shareable: it carries mutable window state; one `render` call at a
/// time.
pub struct Renderer {
    backend: Box<dyn Backend>,
    drv: Driver,
    state: State,
    kind: DstKind,
}

impl Renderer {
    /// Creates a renderer sending `backend` output to `dst`.
    pub fn new(backend: impl Backend + 'static, dst: Dst) -> Renderer {
        let (kind, out) = match dst {
            Dst::Buffer => (DstKind::Buffer, Out::Buffer(Vec::new())),
            Dst::Channel(w) => (DstKind::Channel, Out::Channel(w)),
            Dst::Manual => (DstKind::Manual, Out::Manual),
            Dst::Other => (DstKind::Other, Out::Other),
        };
        let window = match kind {
            DstKind::Buffer | DstKind::Channel => vec![0; IO_BUFFER_SIZE],
            DstKind::Manual | DstKind::Other => Vec::new(),
        };
        let end = window.len();
        Renderer {
            backend: Box::new(backend),
            drv: Driver {
                out,
                window,
                start: 0,
                pos: 0,
                end,
                limit: usize::MAX,
                meta: Meta::new(),
                warn: None,
            },
            state: State::Ready { images: 0 },
            kind,
        }
    }

    /// Sets the advisory rendering budget backends may consult.
    pub fn with_limit(mut self, limit: usize) -> Renderer {
        self.drv.limit = limit;
        self
    }

    /// Sets the renderer metadata.
    pub fn with_meta(mut self, meta: Meta) -> Renderer {
        self.drv.meta = meta;
        self
    }

    /// Installs a warning callback; without one, warnings go to the log.
    pub fn with_warn(mut self, warn: impl FnMut(&Warning) + 'static) -> Renderer {
        self.drv.warn = Some(Box::new(warn));
        self
    }

    pub fn dst(&self) -> DstKind {
        self.kind
    }

    pub fn meta(&self) -> &Meta {
        self.drv.meta()
    }

    pub fn limit(&self) -> usize {
        self.drv.limit()
    }

    /// Bytes accumulated so far on a `Buffer` destination.
    pub fn buffer(&self) -> Option<&[u8]> {
        match &self.drv.out {
            Out::Buffer(b) => Some(b),
            _ => None,
        }
    }

    /// Consumes the renderer, returning the `Buffer` destination contents.
    pub fn into_buffer(self) -> Option<Vec<u8>> {
        match self.drv.out {
            Out::Buffer(b) => Some(b),
            _ => None,
        }
    }

    /// Sends an event to the renderer.
    ///
    /// Misuse errors: any event after the final `End` completes is
    /// [`Error::EndRendered`]; an `Await` with nothing suspended, or a
    /// non-`Await` while suspended, is [`Error::AwaitExpected`]; a second
    /// image on a once-mode backend is [`Error::SingleImage`].
    pub fn render(&mut self, ev: Event) -> Result<Status> {
        match self.state {
            State::Ended => Err(Error::EndRendered),
            State::Parked { on_end, images } => match ev {
                Event::Await => match self.backend.render(&mut self.drv, &Event::Await)? {
                    Status::Partial => Ok(Status::Partial),
                    Status::Ok => {
                        if on_end {
                            self.finish()?;
                        } else {
                            self.state = State::Ready { images };
                        }
                        Ok(Status::Ok)
                    }
                },
                _ => Err(Error::AwaitExpected),
            },
            State::Ready { images } => match ev {
                Event::Await => Err(Error::AwaitExpected),
                Event::Image(_) => {
                    if images >= 1 && self.backend.once() {
                        return Err(Error::SingleImage);
                    }
                    let status = self.backend.render(&mut self.drv, &ev)?;
                    let images = images + 1;
                    match status {
                        Status::Partial => {
                            self.state = State::Parked {
                                on_end: false,
                                images,
                            };
                            Ok(Status::Partial)
                        }
                        Status::Ok => {
                            self.state = State::Ready { images };
                            Ok(Status::Ok)
                        }
                    }
                }
                Event::End => match self.backend.render(&mut self.drv, &Event::End)? {
                    Status::Partial => {
                        self.state = State::Parked {
                            on_end: true,
                            images,
                        };
                        Ok(Status::Partial)
                    }
                    Status::Ok => {
                        self.finish()?;
                        Ok(Status::Ok)
                    }
                },
            },
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.drv.flush_end()?;
        self.state = State::Ended;
        crate::log::debug!("rendering ended");
        Ok(())
    }
}

/// Window control for [`Dst::Manual`] renderers.
///
/// The window buffer moves into the renderer with [`dst`] and back out
/// with [`take`]; a typical loop installs a window, renders until
/// [`Status::Partial`], takes the written bytes, reinstalls and resumes
/// with [`Event::Await`].
pub mod manual {
    use super::*;

    /// Installs `buf[from..from + len]` as the renderer's output window.
    pub fn dst(r: &mut Renderer, buf: Vec<u8>, from: usize, len: usize) -> Result<()> {
        if r.kind != DstKind::Manual {
            return Err(Error::NotManual);
        }
        match from.checked_add(len) {
            Some(end) if end <= buf.len() => {
                r.drv.install_window(buf, from, len);
                Ok(())
            }
            _ => Err(Error::OutOfBounds {
                from,
                len,
                buf_len: buf.len(),
            }),
        }
    }

    /// Bytes still writable in the current window.
    pub fn dst_rem(r: &Renderer) -> usize {
        r.drv.rem()
    }

    /// Takes the window back: the buffer, the start offset of the window
    /// range, and how many bytes were written from that offset.
    pub fn take(r: &mut Renderer) -> Result<(Vec<u8>, usize, usize)> {
        if r.kind != DstKind::Manual {
            return Err(Error::NotManual);
        }
        Ok(r.drv.take_window())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend writing a fixed greeting per image.
    struct Greeter {
        once: bool,
    }

    impl Backend for Greeter {
        fn once(&self) -> bool {
            self.once
        }

        fn render(&mut self, drv: &mut Driver, ev: &Event) -> Result<Status> {
            match ev {
                Event::Image(_) => {
                    let n = drv.writes(b"hello ")?;
                    assert_eq!(n, 6);
                    Ok(Status::Ok)
                }
                Event::End => {
                    let ok = drv.writeb(b'!')?;
                    assert!(ok);
                    Ok(Status::Ok)
                }
                Event::Await => Ok(Status::Ok),
            }
        }
    }

    fn renderable() -> Renderable {
        Renderable::new(
            glam::dvec2(100.0, 100.0),
            Box2::new(glam::dvec2(0.0, 0.0), glam::dvec2(1.0, 1.0)),
            Image::void(),
        )
    }

    #[test]
    fn buffer_runs_accumulate_and_flush_on_end() {
        let mut r = Renderer::new(Greeter { once: false }, Dst::Buffer);
        assert_eq!(r.render(Event::Image(renderable())).unwrap(), Status::Ok);
        assert_eq!(r.render(Event::Image(renderable())).unwrap(), Status::Ok);
        assert_eq!(r.render(Event::End).unwrap(), Status::Ok);
        assert_eq!(r.into_buffer().unwrap(), b"hello hello !");
    }

    #[test]
    fn once_mode_rejects_a_second_image() {
        let mut r = Renderer::new(Greeter { once: true }, Dst::Buffer);
        assert_eq!(r.render(Event::Image(renderable())).unwrap(), Status::Ok);
        assert!(matches!(
            r.render(Event::Image(renderable())),
            Err(Error::SingleImage)
        ));
        // Still usable up to `End`.
        assert_eq!(r.render(Event::End).unwrap(), Status::Ok);
    }

    #[test]
    fn events_after_end_fail() {
        let mut r = Renderer::new(Greeter { once: false }, Dst::Buffer);
        assert_eq!(r.render(Event::End).unwrap(), Status::Ok);
        assert!(matches!(
            r.render(Event::Image(renderable())),
            Err(Error::EndRendered)
        ));
        assert!(matches!(r.render(Event::End), Err(Error::EndRendered)));
        assert!(matches!(r.render(Event::Await), Err(Error::EndRendered)));
    }

    #[test]
    fn await_without_a_suspension_fails() {
        let mut r = Renderer::new(Greeter { once: false }, Dst::Buffer);
        assert!(matches!(r.render(Event::Await), Err(Error::AwaitExpected)));
    }

    #[test]
    fn channel_destinations_write_through_the_sink() {
        use std::io::Write;
        use std::sync::{Arc, Mutex};

        #[derive(Clone)]
        struct Shared(Arc<Mutex<Vec<u8>>>);
        impl Write for Shared {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let sink = Shared(Arc::new(Mutex::new(Vec::new())));
        let mut r = Renderer::new(Greeter { once: false }, Dst::Channel(Box::new(sink.clone())));
        assert_eq!(r.render(Event::Image(renderable())).unwrap(), Status::Ok);
        assert_eq!(r.render(Event::End).unwrap(), Status::Ok);
        assert_eq!(&*sink.0.lock().unwrap(), b"hello !");
    }

    #[test]
    fn manual_dst_validates_ranges_and_destination_kind() {
        let mut r = Renderer::new(Greeter { once: false }, Dst::Manual);
        assert!(matches!(
            manual::dst(&mut r, vec![0; 4], 2, 10),
            Err(Error::OutOfBounds { .. })
        ));
        let mut rb = Renderer::new(Greeter { once: false }, Dst::Buffer);
        assert!(matches!(
            manual::dst(&mut rb, vec![0; 4], 0, 4),
            Err(Error::NotManual)
        ));
        assert!(matches!(manual::take(&mut rb), Err(Error::NotManual)));
        manual::dst(&mut r, vec![0; 8], 1, 6).unwrap();
        assert_eq!(manual::dst_rem(&r), 6);
    }

    #[test]
    fn limit_meta_and_dst_are_observable() {
        let meta = Meta::new();
        let r = Renderer::new(Greeter { once: false }, Dst::Other)
            .with_limit(42)
            .with_meta(meta);
        assert_eq!(r.limit(), 42);
        assert_eq!(r.dst(), DstKind::Other);
        assert!(r.meta().is_empty());
        assert!(r.buffer().is_none());
    }
}
