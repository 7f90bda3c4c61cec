//! End-to-end renderer runs across destination kinds.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::sync::Once;

use glam::dvec2;
use vellum::{
    manual, Area, Backend, Box2, Color, Driver, Dst, Event, Image, Path, Renderable, Renderer,
    Result, Status, Warning,
};

static INIT_TRACING: Once = Once::new();

fn init_tracing() {
    INIT_TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .without_time()
            .init();
    });
}

/// Deterministic backend: streams a textual trace of every event through
/// the writer primitives, resuming from its own offset after a `Partial`.
#[derive(Default)]
struct Trace {
    once: bool,
    pending: Vec<u8>,
    sent: usize,
}

impl Trace {
    fn once() -> Trace {
        Trace {
            once: true,
            ..Trace::default()
        }
    }

    fn pump(&mut self, drv: &mut Driver) -> Result<Status> {
        let n = drv.writes(&self.pending[self.sent..])?;
        self.sent += n;
        if self.sent < self.pending.len() {
            Ok(Status::Partial)
        } else {
            Ok(Status::Ok)
        }
    }
}

impl Backend for Trace {
    fn once(&self) -> bool {
        self.once
    }

    fn render(&mut self, drv: &mut Driver, ev: &Event) -> Result<Status> {
        match ev {
            Event::Image(r) => {
                self.pending = format!(
                    "render {}x{} view {} image {}\n",
                    r.size.x, r.size.y, r.view, r.image
                )
                .into_bytes();
                self.sent = 0;
                self.pump(drv)
            }
            Event::End => {
                self.pending = b"end\n".to_vec();
                self.sent = 0;
                self.pump(drv)
            }
            Event::Await => self.pump(drv),
        }
    }
}

fn red_square() -> Renderable {
    let square = Path::new().rect(Box2::new(dvec2(0.0, 0.0), dvec2(1.0, 1.0)));
    let image = Image::uniform(Color::rgb(1.0, 0.0, 0.0)).cut(square);
    Renderable::new(
        dvec2(100.0, 100.0),
        Box2::new(dvec2(0.0, 0.0), dvec2(1.0, 1.0)),
        image,
    )
}

fn buffer_run(renderables: &[Renderable]) -> Vec<u8> {
    let mut r = Renderer::new(Trace::default(), Dst::Buffer);
    for renderable in renderables {
        assert_eq!(
            r.render(Event::Image(renderable.clone())).unwrap(),
            Status::Ok
        );
    }
    assert_eq!(r.render(Event::End).unwrap(), Status::Ok);
    r.into_buffer().unwrap()
}

/// Runs a `Manual` renderer with windows of `window` bytes, collecting
/// the stream by draining each filled window.
fn manual_run(renderables: &[Renderable], window: usize) -> Vec<u8> {
    let mut r = Renderer::new(Trace::default(), Dst::Manual);
    let mut out = Vec::new();
    manual::dst(&mut r, vec![0u8; window], 0, window).unwrap();

    let drive = |r: &mut Renderer, out: &mut Vec<u8>, ev: Event| {
        let mut status = r.render(ev).unwrap();
        while status == Status::Partial {
            let (buf, from, written) = manual::take(r).unwrap();
            out.extend_from_slice(&buf[from..from + written]);
            manual::dst(r, buf, 0, window).unwrap();
            status = r.render(Event::Await).unwrap();
        }
    };

    for renderable in renderables {
        drive(&mut r, &mut out, Event::Image(renderable.clone()));
    }
    drive(&mut r, &mut out, Event::End);

    // Remaining bytes sit in the final window.
    let (buf, from, written) = manual::take(&mut r).unwrap();
    out.extend_from_slice(&buf[from..from + written]);
    out
}

#[test]
fn buffer_and_manual_runs_are_byte_identical() {
    init_tracing();
    let scene = [red_square()];
    let by_buffer = buffer_run(&scene);
    assert!(!by_buffer.is_empty());
    for window in [1, 7, 64, 4096] {
        assert_eq!(manual_run(&scene, window), by_buffer, "window {}", window);
    }
}

#[test]
fn channel_and_buffer_runs_are_byte_identical() {
    init_tracing();

    #[derive(Clone, Default)]
    struct Sink(Rc<RefCell<Vec<u8>>>);
    impl io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let scene = [red_square(), red_square()];
    let sink = Sink::default();
    let mut r = Renderer::new(Trace::default(), Dst::Channel(Box::new(sink.clone())));
    for renderable in &scene {
        assert_eq!(
            r.render(Event::Image(renderable.clone())).unwrap(),
            Status::Ok
        );
    }
    assert_eq!(r.render(Event::End).unwrap(), Status::Ok);
    assert_eq!(*sink.0.borrow(), buffer_run(&scene));
}

#[test]
fn loop_mode_accepts_many_images_once_mode_one() {
    init_tracing();
    let scene: Vec<Renderable> = (0..5).map(|_| red_square()).collect();
    let bytes = String::from_utf8(buffer_run(&scene)).unwrap();
    assert_eq!(bytes.matches("render ").count(), 5);

    let mut once = Renderer::new(Trace::once(), Dst::Buffer);
    assert_eq!(once.render(Event::Image(red_square())).unwrap(), Status::Ok);
    assert!(matches!(
        once.render(Event::Image(red_square())),
        Err(vellum::Error::SingleImage)
    ));
}

#[test]
fn warnings_are_reported_and_never_abort() {
    init_tracing();

    struct Warny;
    impl Backend for Warny {
        fn render(&mut self, drv: &mut Driver, ev: &Event) -> Result<Status> {
            if let Event::Image(r) = ev {
                drv.warn(Warning::UnsupportedCut(Area::EvenOdd, r.image.clone()));
                drv.warn(Warning::Other("second warning".to_string()));
                let n = drv.writes(b"degraded\n")?;
                assert_eq!(n, 9);
            }
            Ok(Status::Ok)
        }
    }

    let seen = Rc::new(RefCell::new(Vec::new()));
    let hook = seen.clone();
    let mut r = Renderer::new(Warny, Dst::Buffer).with_warn(move |w| {
        hook.borrow_mut().push(w.to_string());
    });
    assert_eq!(r.render(Event::Image(red_square())).unwrap(), Status::Ok);
    assert_eq!(r.render(Event::End).unwrap(), Status::Ok);
    assert_eq!(
        *seen.borrow(),
        vec![
            "unsupported cut area aeo".to_string(),
            "second warning".to_string()
        ]
    );
    assert_eq!(r.into_buffer().unwrap(), b"degraded\n");
}

#[test]
fn a_parked_renderer_only_accepts_await() {
    init_tracing();
    let mut r = Renderer::new(Trace::default(), Dst::Manual);
    // No window installed: the first write suspends immediately.
    assert_eq!(
        r.render(Event::Image(red_square())).unwrap(),
        Status::Partial
    );
    assert!(matches!(
        r.render(Event::Image(red_square())),
        Err(vellum::Error::AwaitExpected)
    ));
    assert!(matches!(
        r.render(Event::End),
        Err(vellum::Error::AwaitExpected)
    ));
    // Provide space and finish normally.
    manual::dst(&mut r, vec![0u8; 1024], 0, 1024).unwrap();
    assert_eq!(r.render(Event::Await).unwrap(), Status::Ok);
    assert_eq!(r.render(Event::End).unwrap(), Status::Ok);
    let (buf, from, written) = manual::take(&mut r).unwrap();
    let bytes = &buf[from..from + written];
    assert!(bytes.ends_with(b"end\n"));
    assert_eq!(bytes, &buffer_run(&[red_square()])[..]);
}

#[test]
fn metadata_rides_along_unchanged() {
    init_tracing();
    use vellum::meta::keys;
    use vellum::Meta;

    struct MetaPeek;
    impl Backend for MetaPeek {
        fn render(&mut self, drv: &mut Driver, ev: &Event) -> Result<Status> {
            if let Event::End = ev {
                let title = drv.meta().get(&keys::TITLE).unwrap().clone();
                let line = format!("title: {}\n", title);
                let n = drv.writes(line.as_bytes())?;
                assert_eq!(n, line.len());
            }
            Ok(Status::Ok)
        }
    }

    let meta = Meta::new().add(&keys::TITLE, "doc".to_string());
    let mut r = Renderer::new(MetaPeek, Dst::Buffer).with_meta(meta.clone());
    assert_eq!(r.render(Event::Image(red_square())).unwrap(), Status::Ok);
    assert_eq!(r.render(Event::End).unwrap(), Status::Ok);
    assert!(r.meta() == &meta);
    assert_eq!(r.into_buffer().unwrap(), b"title: doc\n");
}
