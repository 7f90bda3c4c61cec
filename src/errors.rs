//! Error types with diagnostic codes.
//!
//! All user-observable misuse is reported synchronously through [`Error`];
//! backend limitations are reported out-of-band as non-fatal
//! [`Warning`](crate::render::Warning)s instead.

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// A query that needs a current point was made on the empty path.
    #[error("empty path has no current point")]
    #[diagnostic(code(vellum::path::empty_path))]
    EmptyPath,

    /// A buffer sub-range fell outside the buffer.
    #[error("range {from}+{len} out of bounds for a buffer of {buf_len} bytes")]
    #[diagnostic(code(vellum::render::out_of_bounds))]
    OutOfBounds {
        from: usize,
        len: usize,
        buf_len: usize,
    },

    /// The renderer was expecting an `Await` and got something else, or
    /// got an `Await` while it had nothing suspended.
    #[error("an `Await` resolves a suspended `Partial` and nothing else")]
    #[diagnostic(code(vellum::render::await_expected))]
    AwaitExpected,

    /// An event was sent after the final `End` completed.
    #[error("rendering already ended")]
    #[diagnostic(code(vellum::render::end_rendered))]
    EndRendered,

    /// A second image was sent to a once-mode renderer.
    #[error("this renderer accepts a single image")]
    #[diagnostic(code(vellum::render::single_image))]
    SingleImage,

    /// A metadata key lookup found no binding.
    #[error("key `{name}` is not bound in the metadata map")]
    #[diagnostic(code(vellum::meta::unbound_key))]
    UnboundKey { name: String },

    /// A manual window operation on a non-`Manual` destination.
    #[error("renderer destination is not `Manual`")]
    #[diagnostic(code(vellum::render::not_manual))]
    NotManual,

    /// A `Channel` destination sink failed.
    #[error("channel sink error")]
    #[diagnostic(code(vellum::render::io))]
    Io(#[from] std::io::Error),
}
