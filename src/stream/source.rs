//! Frame sources and the adapter that turns borrowed callback buffers into
//! owned [`PixelFrame`]s

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::error::CaptureError;
use crate::models::{PixelFormat, PixelFrame};

/// Event delivered by a running frame source
///
/// `data` is only valid for the duration of the callback; sources reuse
/// their buffers as soon as it returns.
#[derive(Debug, Clone, Copy)]
pub enum FrameEvent<'a> {
    /// Capture resolution changed; later frames use the new size
    SizeChanged {
        /// New frame width
        width: usize,
        /// New frame height
        height: usize,
    },
    /// One frame in the source's native pixel format
    Frame {
        /// Borrowed pixel buffer
        data: &'a [u8],
        /// Frame width
        width: usize,
        /// Frame height
        height: usize,
    },
}

/// Callback installed by [`FrameSource::start`]
pub type FrameCallback = Box<dyn FnMut(FrameEvent<'_>) + Send>;

/// A camera or anything else that produces frames on its own thread
pub trait FrameSource: Send {
    /// Begin capture, delivering events to `callback` until `stop`
    fn start(&mut self, callback: FrameCallback) -> Result<(), CaptureError>;

    /// Release the capture session and drop the callback
    fn stop(&mut self);
}

/// Bridges a [`FrameSource`] to a frame consumer
pub struct FrameAdapter {
    source: Box<dyn FrameSource>,
    format: PixelFormat,
}

impl FrameAdapter {
    /// Adapt `source`, whose frames arrive in `format`
    pub fn new(source: Box<dyn FrameSource>, format: PixelFormat) -> Self {
        Self { source, format }
    }

    /// Pixel format frames are validated against
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Start the source; every valid frame is copied and handed to `consumer`
    /// on the producer's thread
    ///
    /// `consumer` must return quickly. Frames whose buffer is shorter than
    /// the declared format requires are logged and skipped.
    pub fn subscribe<C>(mut self, mut consumer: C) -> Result<Subscription, CaptureError>
    where
        C: FnMut(PixelFrame) + Send + 'static,
    {
        let format = self.format;
        let callback: FrameCallback = Box::new(move |event: FrameEvent<'_>| match event {
            FrameEvent::SizeChanged { width, height } => {
                debug!("capture size changed to {width}x{height}");
            }
            FrameEvent::Frame { data, width, height } => {
                match PixelFrame::copy_from(data, width, height, format) {
                    Ok(frame) => consumer(frame),
                    Err(err) => warn!("skipping frame: {err}"),
                }
            }
        });
        self.source.start(callback)?;
        info!("capture started ({format:?})");
        Ok(Subscription {
            source: self.source,
            active: true,
        })
    }
}

/// A running capture session; dropping it stops the source
pub struct Subscription {
    source: Box<dyn FrameSource>,
    active: bool,
}

impl Subscription {
    /// Stop the source now; later calls do nothing
    pub fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.source.stop();
            info!("capture stopped");
        }
    }

    /// Whether `stop` has not been called yet
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A frame source driven by the embedding application
///
/// Clones share one session: hand one clone to a [`FrameAdapter`] and push
/// frames through another, from any thread.
#[derive(Clone, Default)]
pub struct ManualSource {
    callback: Arc<Mutex<Option<FrameCallback>>>,
}

impl ManualSource {
    /// Create a stopped source
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one frame; returns `false` if the source is not running
    pub fn push_frame(&self, data: &[u8], width: usize, height: usize) -> bool {
        self.emit(FrameEvent::Frame { data, width, height })
    }

    /// Announce a new capture size; returns `false` if the source is not running
    pub fn resize(&self, width: usize, height: usize) -> bool {
        self.emit(FrameEvent::SizeChanged { width, height })
    }

    /// Whether a callback is installed
    pub fn is_running(&self) -> bool {
        lock(&self.callback).is_some()
    }

    fn emit(&self, event: FrameEvent<'_>) -> bool {
        match lock(&self.callback).as_mut() {
            Some(callback) => {
                callback(event);
                true
            }
            None => false,
        }
    }
}

impl FrameSource for ManualSource {
    fn start(&mut self, callback: FrameCallback) -> Result<(), CaptureError> {
        let mut slot = lock(&self.callback);
        if slot.is_some() {
            return Err(CaptureError::AlreadyStarted);
        }
        *slot = Some(callback);
        Ok(())
    }

    fn stop(&mut self) {
        let callback = lock(&self.callback).take();
        drop(callback);
    }
}
