//! The renderer's output half: window management, writer primitives and
//! the warning channel. This is the surface backends program against.

use std::fmt;
use std::io::Write;

use crate::errors::Result;
use crate::image::Image;
use crate::meta::Meta;
use crate::path::Area;

/// Default output window size for `Buffer` and `Channel` destinations.
pub const IO_BUFFER_SIZE: usize = 64 * 1024;

/// A non-fatal condition reported by a backend during rendering.
///
/// Warnings never abort rendering; the backend degrades on a best-effort
/// basis. Nothing is guaranteed about their ordering or uniqueness.
#[derive(Debug, Clone)]
pub enum Warning {
    /// The backend cannot honor a cut with this area.
    UnsupportedCut(Area, Image),
    /// The backend cannot honor a glyph cut with this area.
    UnsupportedGlyphCut(Area, Image),
    /// Backend-specific condition.
    Other(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnsupportedCut(a, _) => write!(f, "unsupported cut area {}", a),
            Warning::UnsupportedGlyphCut(a, _) => write!(f, "unsupported glyph cut area {}", a),
            Warning::Other(msg) => write!(f, "{}", msg),
        }
    }
}

pub(crate) enum Out {
    Buffer(Vec<u8>),
    Channel(Box<dyn Write>),
    Manual,
    Other,
}

/// The output window and ambient state a backend renders through.
///
/// Bytes written through [`writeb`](Driver::writeb) and
/// [`writes`](Driver::writes) land in the current window in call order.
/// `Buffer` and `Channel` destinations flush the window transparently, so
/// writes always complete; under a `Manual` destination a full window
/// makes the write come up short, and the backend is expected to remember
/// its position, return a `Partial` and continue when it is re-entered
/// with an `Await`. For `Other` destinations the writer primitives are
/// inert: the backend owns its output handle.
pub struct Driver {
    pub(crate) out: Out,
    pub(crate) window: Vec<u8>,
    pub(crate) start: usize,
    pub(crate) pos: usize,
    pub(crate) end: usize,
    pub(crate) limit: usize,
    pub(crate) meta: Meta,
    pub(crate) warn: Option<Box<dyn FnMut(&Warning)>>,
}

impl Driver {
    /// Bytes still writable in the current window.
    pub fn rem(&self) -> usize {
        self.end - self.pos
    }

    /// Soft rendering budget configured by the user; purely advisory.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Renderer metadata. The driver never mutates it.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Reports a non-fatal warning through the installed callback, or the
    /// log when none is installed.
    pub fn warn(&mut self, w: Warning) {
        match &mut self.warn {
            Some(cb) => cb(&w),
            None => crate::log::warn!("renderer warning: {}", w),
        }
    }

    /// Writes one byte. Returns `false` when the window is full and the
    /// byte was not consumed; only `Manual` destinations do that.
    pub fn writeb(&mut self, b: u8) -> Result<bool> {
        if let Out::Other = self.out {
            return Ok(true);
        }
        if self.pos == self.end && !self.make_room()? {
            return Ok(false);
        }
        self.window[self.pos] = b;
        self.pos += 1;
        Ok(true)
    }

    /// Writes as much of `s` as fits, returning the number of bytes
    /// consumed. A short count means the window is full; only `Manual`
    /// destinations do that.
    pub fn writes(&mut self, s: &[u8]) -> Result<usize> {
        if let Out::Other = self.out {
            return Ok(s.len());
        }
        let mut written = 0;
        while written < s.len() {
            if self.pos == self.end && !self.make_room()? {
                break;
            }
            let n = (s.len() - written).min(self.end - self.pos);
            self.window[self.pos..self.pos + n].copy_from_slice(&s[written..written + n]);
            self.pos += n;
            written += n;
        }
        Ok(written)
    }

    /// Empties the window into the destination; `false` when the
    /// destination cannot absorb it (`Manual`).
    fn make_room(&mut self) -> Result<bool> {
        match &mut self.out {
            Out::Buffer(out) => {
                out.extend_from_slice(&self.window[self.start..self.pos]);
                self.pos = self.start;
                Ok(true)
            }
            Out::Channel(w) => {
                w.write_all(&self.window[self.start..self.pos])?;
                self.pos = self.start;
                Ok(true)
            }
            Out::Manual => Ok(false),
            Out::Other => Ok(true),
        }
    }

    /// Final flush when rendering ends.
    pub(crate) fn flush_end(&mut self) -> Result<()> {
        match &mut self.out {
            Out::Buffer(out) => {
                out.extend_from_slice(&self.window[self.start..self.pos]);
                self.pos = self.start;
            }
            Out::Channel(w) => {
                w.write_all(&self.window[self.start..self.pos])?;
                self.pos = self.start;
                w.flush()?;
            }
            Out::Manual | Out::Other => {}
        }
        Ok(())
    }

    pub(crate) fn install_window(&mut self, buf: Vec<u8>, from: usize, len: usize) {
        self.window = buf;
        self.start = from;
        self.pos = from;
        self.end = from + len;
    }

    pub(crate) fn take_window(&mut self) -> (Vec<u8>, usize, usize) {
        let written = self.pos - self.start;
        let from = self.start;
        let buf = std::mem::take(&mut self.window);
        self.start = 0;
        self.pos = 0;
        self.end = 0;
        (buf, from, written)
    }
}
