use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::GrayImage;
use log::debug;

use super::source::{FrameCallback, FrameEvent, FrameSource};
use crate::error::{CaptureError, DecodeError};
use crate::models::PixelFormat;

/// Replays still images as an NV21 camera feed
///
/// Frames are emitted at a fixed interval from a dedicated producer thread,
/// with neutral chroma. One buffer is reused for every frame, as a camera
/// driver would.
pub struct ReplaySource {
    frames: Arc<Vec<GrayImage>>,
    interval: Duration,
    looping: bool,
    running: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl ReplaySource {
    /// Replay `frames` once, one every `interval`
    pub fn new(frames: Vec<GrayImage>, interval: Duration) -> Self {
        Self {
            frames: Arc::new(frames),
            interval,
            looping: false,
            running: Arc::new(AtomicBool::new(false)),
            producer: None,
        }
    }

    /// Load every image as grayscale
    pub fn from_paths<P: AsRef<Path>>(paths: &[P], interval: Duration) -> Result<Self, DecodeError> {
        let frames = paths
            .iter()
            .map(|p| Ok(image::open(p.as_ref())?.to_luma8()))
            .collect::<Result<Vec<_>, DecodeError>>()?;
        Ok(Self::new(frames, interval))
    }

    /// Start over from the first frame after the last one
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Number of distinct frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether there is nothing to replay
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn fill_nv21(image: &GrayImage, buffer: &mut Vec<u8>) {
    let (w, h) = (image.width() as usize, image.height() as usize);
    buffer.clear();
    buffer.extend_from_slice(image.as_raw());
    buffer.resize(PixelFormat::Nv21.frame_len(w, h), 128);
}

fn produce(
    frames: &[GrayImage],
    interval: Duration,
    looping: bool,
    running: &AtomicBool,
    callback: &mut FrameCallback,
) {
    let mut buffer = Vec::new();
    let mut size = None;
    loop {
        for image in frames {
            if !running.load(Ordering::Acquire) {
                return;
            }
            let dims = (image.width() as usize, image.height() as usize);
            if size != Some(dims) {
                size = Some(dims);
                callback(FrameEvent::SizeChanged {
                    width: dims.0,
                    height: dims.1,
                });
            }
            fill_nv21(image, &mut buffer);
            callback(FrameEvent::Frame {
                data: &buffer,
                width: dims.0,
                height: dims.1,
            });
            thread::sleep(interval);
        }
        if !looping {
            return;
        }
    }
}

impl FrameSource for ReplaySource {
    fn start(&mut self, mut callback: FrameCallback) -> Result<(), CaptureError> {
        if self.producer.is_some() {
            return Err(CaptureError::AlreadyStarted);
        }
        if self.frames.is_empty() {
            return Err(CaptureError::Start("no frames to replay".to_string()));
        }

        self.running.store(true, Ordering::Release);
        let frames = Arc::clone(&self.frames);
        let running = Arc::clone(&self.running);
        let (interval, looping) = (self.interval, self.looping);
        let handle = thread::Builder::new()
            .name("rxqr-replay".to_string())
            .spawn(move || {
                produce(&frames, interval, looping, &running, &mut callback);
                running.store(false, Ordering::Release);
                debug!("replay producer finished");
            })
            .map_err(|e| CaptureError::Start(e.to_string()))?;
        self.producer = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.producer.take() {
            // A stop issued from inside the callback cannot wait for itself
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for ReplaySource {
    fn drop(&mut self) {
        self.stop();
    }
}
