use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded, unbounded};
use log::{debug, error, info, trace};
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::source::{FrameAdapter, Subscription};
use crate::config::ScanConfig;
use crate::decoder::{QrReader, SingleShotDecoder, SymbolReader};
use crate::error::DecodeError;
use crate::luminance::frame_to_bitmap;
use crate::models::{DecodeOutcome, Decoded, PixelFrame};
use crate::utils::binarization::Binarizer;

/// How long an idle worker waits before re-checking for shutdown
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Frame counters for a camera scan
#[derive(Debug, Default)]
pub struct StreamStats {
    frames: AtomicU64,
    accepted: AtomicU64,
    dropped: AtomicU64,
    decoded: AtomicU64,
}

impl StreamStats {
    /// Valid frames delivered by the source
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Frames handed to an idle worker
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Frames discarded because every worker was busy
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Frames that yielded a symbol
    pub fn decoded(&self) -> u64 {
        self.decoded.load(Ordering::Relaxed)
    }
}

/// Terminates a scan exactly once, whichever side asks first
struct Shutdown {
    subscription: Mutex<Option<Subscription>>,
    terminated: AtomicBool,
    live_workers: AtomicUsize,
}

impl Shutdown {
    fn new(workers: usize) -> Self {
        Self {
            subscription: Mutex::new(None),
            terminated: AtomicBool::new(false),
            live_workers: AtomicUsize::new(workers),
        }
    }

    fn install(&self, subscription: Subscription) {
        let mut slot = self.subscription.lock().unwrap_or_else(|e| e.into_inner());
        if self.terminated.load(Ordering::Acquire) {
            drop(slot);
            drop(subscription);
        } else {
            *slot = Some(subscription);
        }
    }

    /// Stop capture; returns `true` for the call that actually terminated
    fn terminate(&self) -> bool {
        let first = !self.terminated.swap(true, Ordering::AcqRel);
        let subscription = self
            .subscription
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        drop(subscription);
        first
    }

    fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// The last worker out ends the scan, e.g. when a finite source runs dry
    fn worker_exited(&self) {
        if self.live_workers.fetch_sub(1, Ordering::AcqRel) == 1 && self.terminate() {
            info!("all decode workers exited, camera scan finished");
        }
    }
}

/// Continuous decoding of a camera feed
///
/// Frames are handed over a rendezvous channel: a frame reaches a worker only
/// if one is idle at the moment it arrives, otherwise it is dropped. Each
/// worker owns its own reader, built by the factory.
pub struct StreamingDecoder<F> {
    config: ScanConfig,
    factory: F,
}

impl StreamingDecoder<fn() -> QrReader> {
    /// Decoder backed by the bundled QR reader
    pub fn new(config: ScanConfig) -> Self {
        Self::with_reader_factory(config, QrReader::new)
    }
}

impl<F, R> StreamingDecoder<F>
where
    F: Fn() -> R,
    R: SymbolReader + Send + 'static,
{
    /// Decoder whose workers each use a reader from `factory`
    pub fn with_reader_factory(config: ScanConfig, factory: F) -> Self {
        Self { config, factory }
    }

    /// Subscribe to `adapter` and start decoding
    pub fn start(self, adapter: FrameAdapter) -> Result<CameraScan, DecodeError> {
        let workers = self.config.workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("rxqr-decode-{i}"))
            .build()
            .map_err(|e| DecodeError::WorkerPool(e.to_string()))?;

        let (frame_tx, frame_rx) = bounded::<PixelFrame>(0);
        let (result_tx, result_rx) = unbounded();
        let stats = Arc::new(StreamStats::default());
        let shutdown = Arc::new(Shutdown::new(workers));

        for id in 0..workers {
            let worker = Worker {
                id,
                decoder: SingleShotDecoder::new((self.factory)(), self.config.hints),
                binarizer: self.config.binarizer,
                frames: frame_rx.clone(),
                results: result_tx.clone(),
                stats: Arc::clone(&stats),
                shutdown: Arc::clone(&shutdown),
            };
            pool.spawn(move || worker.run());
        }
        drop(frame_rx);
        drop(result_tx);

        let counters = Arc::clone(&stats);
        let subscription = adapter.subscribe(move |frame| {
            counters.frames.fetch_add(1, Ordering::Relaxed);
            match frame_tx.try_send(frame) {
                Ok(()) => {
                    counters.accepted.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(_)) => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    trace!("all decode workers busy, frame dropped");
                }
                Err(TrySendError::Disconnected(_)) => {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        })?;
        shutdown.install(subscription);
        info!("camera scan started with {workers} decode worker(s)");

        Ok(CameraScan {
            results: result_rx,
            stats,
            shutdown,
            _pool: pool,
        })
    }
}

struct Worker<R> {
    id: usize,
    decoder: SingleShotDecoder<R>,
    binarizer: Binarizer,
    frames: Receiver<PixelFrame>,
    results: Sender<Result<Decoded, DecodeError>>,
    stats: Arc<StreamStats>,
    shutdown: Arc<Shutdown>,
}

impl<R: SymbolReader> Worker<R> {
    fn run(mut self) {
        debug!("decode worker {} started", self.id);
        loop {
            let frame = match self.frames.recv_timeout(IDLE_POLL) {
                Ok(frame) => frame,
                Err(RecvTimeoutError::Timeout) if !self.shutdown.is_terminated() => continue,
                Err(_) => break,
            };
            if self.shutdown.is_terminated() {
                break;
            }

            let bitmap = frame_to_bitmap(&frame, self.binarizer);
            drop(frame);

            match self.decoder.decode(&bitmap) {
                DecodeOutcome::Decoded(decoded) => {
                    self.stats.decoded.fetch_add(1, Ordering::Relaxed);
                    debug!("worker {} decoded {} byte(s)", self.id, decoded.bytes.len());
                    if self.results.send(Ok(decoded)).is_err() {
                        break;
                    }
                }
                DecodeOutcome::NotFound | DecodeOutcome::RecoverableFormatError(_) => {}
                DecodeOutcome::FatalError(err) => {
                    error!("decode worker {} failed, terminating scan: {err}", self.id);
                    if self.shutdown.terminate() {
                        let _ = self.results.send(Err(err));
                    }
                    break;
                }
            }
        }
        debug!("decode worker {} stopped", self.id);
        self.shutdown.worker_exited();
    }
}

/// Handle to a running camera scan
///
/// Dropping the handle stops the capture session.
pub struct CameraScan {
    results: Receiver<Result<Decoded, DecodeError>>,
    stats: Arc<StreamStats>,
    shutdown: Arc<Shutdown>,
    _pool: ThreadPool,
}

impl CameraScan {
    /// Decoded symbols, plus at most one fatal error after which the
    /// channel closes
    pub fn results(&self) -> &Receiver<Result<Decoded, DecodeError>> {
        &self.results
    }

    /// Live frame counters
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Stop capture and let the workers wind down
    pub fn stop(&self) {
        self.shutdown.terminate();
    }

    /// Whether the scan is still decoding: not stopped, no fatal error, and
    /// the source has not finished
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_terminated()
    }
}

impl Drop for CameraScan {
    fn drop(&mut self) {
        self.shutdown.terminate();
    }
}
