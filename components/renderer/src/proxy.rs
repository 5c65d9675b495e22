//! Render thread and thread-affinity proxy

use crate::api::{Renderer, WindowHandle};
use crate::error::{RenderError, RenderResult};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, warn};
use zenplay_video_decoder::DecodedVideoFrame;

type RenderJob = Box<dyn FnOnce(&mut dyn Renderer) + Send>;

/// Dedicated thread hosting the renderer
///
/// All native-graphics calls execute here. The thread owns the run loop;
/// the renderer itself sits behind a mutex shared with the proxy so
/// callers already on this thread can run inline.
pub struct RenderThread {
    handle: Option<JoinHandle<()>>,
    sender: Sender<RenderJob>,
    thread_id: ThreadId,
    renderer: Arc<Mutex<Box<dyn Renderer>>>,
}

impl RenderThread {
    /// Spawns the thread and takes ownership of `renderer`
    pub fn spawn(renderer: Box<dyn Renderer>) -> RenderResult<Self> {
        let renderer = Arc::new(Mutex::new(renderer));
        let (sender, receiver): (Sender<RenderJob>, Receiver<RenderJob>) = unbounded();
        let (id_tx, id_rx) = bounded(1);

        let loop_renderer = Arc::clone(&renderer);
        let handle = thread::Builder::new()
            .name("zenplay-render".to_string())
            .spawn(move || {
                let _ = id_tx.send(thread::current().id());
                for job in receiver {
                    job(loop_renderer.lock().as_mut());
                }
                // Channel closed: release backend resources on the
                // thread that owns them.
                loop_renderer.lock().cleanup();
                debug!("render thread exited");
            })
            .map_err(|error| RenderError::InitFailed {
                details: format!("render thread spawn failed: {error}"),
            })?;

        let thread_id = id_rx.recv().map_err(|_| RenderError::ThreadGone)?;
        Ok(Self {
            handle: Some(handle),
            sender,
            thread_id,
            renderer,
        })
    }

    /// Creates a proxy for pipeline components
    pub fn proxy(&self) -> RendererProxy {
        RendererProxy {
            sender: self.sender.clone(),
            thread_id: self.thread_id,
            renderer: Arc::clone(&self.renderer),
        }
    }

    /// Stops the run loop and joins the thread
    pub fn shutdown(mut self) {
        drop(self.sender);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("render thread panicked during shutdown");
            }
        }
    }
}

/// Thread-affinity wrapper around the renderer
///
/// Every method checks the calling thread: on the render thread the
/// inner call runs inline; from anywhere else the call is posted to the
/// render thread's run loop and the caller blocks until it completes,
/// receiving the inner result. This is the only permitted route to the
/// renderer.
#[derive(Clone)]
pub struct RendererProxy {
    sender: Sender<RenderJob>,
    thread_id: ThreadId,
    renderer: Arc<Mutex<Box<dyn Renderer>>>,
}

impl RendererProxy {
    /// Binds the renderer to a window
    pub fn init(&self, window: WindowHandle, width: u32, height: u32) -> RenderResult<()> {
        self.call(move |renderer| renderer.init(window, width, height))
    }

    /// Draws one frame; the frame is consumed and dropped after the draw
    ///
    /// Dropping here matters on the hardware path: it releases the
    /// frame's surface back to the decoder's pool.
    pub fn render_frame(&self, frame: DecodedVideoFrame) -> RenderResult<()> {
        self.call(move |renderer| {
            let result = renderer.render_frame(&frame);
            drop(frame);
            result
        })
    }

    /// Flips the last drawn frame to the screen
    pub fn present(&self) -> RenderResult<()> {
        self.call(|renderer| renderer.present())
    }

    /// Adjusts to a new window size
    pub fn on_resize(&self, width: u32, height: u32) -> RenderResult<()> {
        self.call(move |renderer| renderer.on_resize(width, height))
    }

    /// Blanks the output
    pub fn clear(&self) -> RenderResult<()> {
        self.call(|renderer| renderer.clear())
    }

    fn call<R, F>(&self, f: F) -> RenderResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut dyn Renderer) -> RenderResult<R> + Send + 'static,
    {
        if thread::current().id() == self.thread_id {
            // Already on the render thread; run inline.
            return f(self.renderer.lock().as_mut());
        }

        let (reply_tx, reply_rx) = bounded(1);
        let job: RenderJob = Box::new(move |renderer| {
            let _ = reply_tx.send(f(renderer));
        });
        self.sender.send(job).map_err(|_| RenderError::ThreadGone)?;
        reply_rx.recv().map_err(|_| RenderError::ThreadGone)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renderer double that records which thread ran each call.
    struct RecordingRenderer {
        calls: Arc<AtomicUsize>,
        render_thread: Arc<Mutex<Option<ThreadId>>>,
    }

    impl Renderer for RecordingRenderer {
        fn init(&mut self, _window: WindowHandle, _w: u32, _h: u32) -> RenderResult<()> {
            Ok(())
        }

        fn render_frame(&mut self, _frame: &DecodedVideoFrame) -> RenderResult<()> {
            Ok(())
        }

        fn present(&mut self) -> RenderResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.render_thread.lock() = Some(thread::current().id());
            Ok(())
        }

        fn on_resize(&mut self, _w: u32, _h: u32) -> RenderResult<()> {
            Ok(())
        }

        fn clear(&mut self) -> RenderResult<()> {
            Err(RenderError::NotInitialized)
        }

        fn cleanup(&mut self) {}
    }

    #[test]
    fn test_calls_run_on_render_thread() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen_thread = Arc::new(Mutex::new(None));
        let renderer = RecordingRenderer {
            calls: Arc::clone(&calls),
            render_thread: Arc::clone(&seen_thread),
        };

        let thread = RenderThread::spawn(Box::new(renderer)).unwrap();
        let proxy = thread.proxy();

        proxy.present().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let render_thread_id = seen_thread.lock().unwrap();
        assert_ne!(render_thread_id, thread::current().id());

        thread.shutdown();
    }

    #[test]
    fn test_inner_errors_propagate_to_caller() {
        let renderer = RecordingRenderer {
            calls: Arc::new(AtomicUsize::new(0)),
            render_thread: Arc::new(Mutex::new(None)),
        };
        let thread = RenderThread::spawn(Box::new(renderer)).unwrap();
        let proxy = thread.proxy();

        assert_eq!(proxy.clear(), Err(RenderError::NotInitialized));
        thread.shutdown();
    }

    #[test]
    fn test_calls_after_shutdown_fail() {
        let renderer = RecordingRenderer {
            calls: Arc::new(AtomicUsize::new(0)),
            render_thread: Arc::new(Mutex::new(None)),
        };
        let thread = RenderThread::spawn(Box::new(renderer)).unwrap();
        let proxy = thread.proxy();
        thread.shutdown();

        assert_eq!(proxy.present(), Err(RenderError::ThreadGone));
    }

    #[test]
    fn test_concurrent_callers_serialize() {
        let calls = Arc::new(AtomicUsize::new(0));
        let renderer = RecordingRenderer {
            calls: Arc::clone(&calls),
            render_thread: Arc::new(Mutex::new(None)),
        };
        let thread = RenderThread::spawn(Box::new(renderer)).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let proxy = thread.proxy();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        proxy.present().unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 100);
        thread.shutdown();
    }
}
