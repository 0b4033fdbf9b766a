//! # Listener Module
//!
//! Runs pitch estimation on a dedicated worker thread.
//!
//! ## Architecture
//! - **Worker thread**: starts the [`AudioSource`], estimates every window it
//!   delivers and sends one [`PitchEstimate`] per window back
//! - **Communication**: crossbeam channels for windows (bounded by
//!   [`WINDOW_BACKLOG`]), results and shutdown
//! - **Consumer**: polls for results on its own cadence (see [`POLL_INTERVAL`])
//!
//! Stopping is immediate: once [`Listener::stop`] is called no further result
//! is handed to the consumer, even if the worker had one in flight.

use crate::audio::{AudioSource, AudioWindow};
use crate::pitch::{PitchEstimate, PitchEstimator};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often a front-end is expected to poll for new estimates (~60 Hz).
pub const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Windows that may wait for the estimator. Live sources drop windows beyond
/// this, so a slow estimator never falls more than a few windows behind.
pub const WINDOW_BACKLOG: usize = 4;

/// Handle to a running estimation worker.
#[derive(Debug)]
pub struct Listener {
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
    results: Receiver<PitchEstimate>,
    cancelled: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl Listener {
    /// Spawns the worker and starts `source` on it.
    ///
    /// If the source cannot be started the error is logged and the listener
    /// simply never produces results; [`is_listening`](Self::is_listening)
    /// turns false.
    pub fn start<S: AudioSource>(source: S, estimator: PitchEstimator) -> Self {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
        let (result_tx, results) = crossbeam_channel::unbounded();
        let cancelled = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let worker_cancelled = Arc::clone(&cancelled);
        let worker_running = Arc::clone(&running);
        let thread_handle = thread::spawn(move || {
            run_worker(source, estimator, result_tx, shutdown_rx, &worker_cancelled);
            worker_running.store(false, Ordering::SeqCst);
        });

        Self {
            shutdown_tx,
            thread_handle: Some(thread_handle),
            results,
            cancelled,
            running,
        }
    }

    /// True while the source is delivering and `stop` has not been called.
    pub fn is_listening(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && self.running.load(Ordering::SeqCst)
    }

    /// Estimates produced since the last poll, oldest first.
    ///
    /// Always empty after `stop`.
    pub fn poll(&self) -> Vec<PitchEstimate> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Vec::new();
        }
        self.results.try_iter().collect()
    }

    /// Cancels the worker, releases the audio source and discards pending results.
    pub fn stop(&mut self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("[LISTENER] Stopping");
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[LISTENER] Worker thread panicked");
            }
        }
        self.results.try_iter().for_each(drop);
    }

    /// Waits for a finite source to run dry and returns every estimate not
    /// yet polled.
    pub fn join(mut self) -> Vec<PitchEstimate> {
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[LISTENER] Worker thread panicked");
            }
        }
        self.poll()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}

fn run_worker<S: AudioSource>(
    source: S,
    estimator: PitchEstimator,
    result_tx: Sender<PitchEstimate>,
    shutdown_rx: Receiver<()>,
    cancelled: &AtomicBool,
) {
    let (window_tx, window_rx) = crossbeam_channel::bounded::<AudioWindow>(WINDOW_BACKLOG);

    log::info!("[LISTENER] Starting audio source...");
    let guard = match source.start(window_tx) {
        Ok(guard) => guard,
        Err(e) => {
            log::error!("[LISTENER] Failed to start audio source: {:#}", e);
            return;
        }
    };

    log::info!("[LISTENER] Entering estimation loop");
    let mut windows = 0_usize;
    loop {
        crossbeam_channel::select! {
            recv(window_rx) -> msg => match msg {
                Ok(window) => {
                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    let estimate = estimator.estimate(&window);
                    windows += 1;
                    if result_tx.send(estimate).is_err() {
                        log::debug!("[LISTENER] Result channel closed");
                        break;
                    }
                }
                Err(_) => {
                    log::info!("[LISTENER] Audio source finished");
                    break;
                }
            },
            recv(shutdown_rx) -> _ => {
                log::debug!("[LISTENER] Received shutdown signal");
                break;
            },
        }
    }

    // Dropping the guard releases the device.
    drop(guard);
    log::info!("[LISTENER] Worker finished after {} windows", windows);
}
