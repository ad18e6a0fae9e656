//! Background trigger loop for the sync processor.
//!
//! # Responsibility
//! - Run a drain pass at startup, on every reconnect, on manual request and
//!   on a fixed interval for the lifetime of the session.
//!
//! # Invariants
//! - All passes run on the scheduler thread, one after another.
//! - Shutdown waits for the pass in progress to finish; passes are not
//!   cancelled midway.

use crate::sync::connectivity::NetworkMonitor;
use crate::sync::processor::{SyncPass, SyncProcessor};
use log::{error, info};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Why a pass was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Startup,
    Reconnect,
    Interval,
    Manual,
}

impl SyncTrigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Reconnect => "reconnect",
            Self::Interval => "interval",
            Self::Manual => "manual",
        }
    }
}

enum Signal {
    Run(SyncTrigger),
    Shutdown,
}

/// Handle to the running scheduler thread. Dropping it stops the thread.
pub struct SyncScheduler {
    sender: Sender<Signal>,
    worker: Option<JoinHandle<()>>,
    completed_passes: Arc<AtomicUsize>,
}

impl SyncScheduler {
    /// Spawns the scheduler thread and subscribes it to reconnect events.
    /// The subscription is dropped by the monitor on the first reconnect
    /// after the thread has stopped.
    ///
    /// # Errors
    /// - [`io::ErrorKind::InvalidInput`] when `interval` is zero.
    /// - Returns an error when the OS refuses to spawn the thread.
    pub fn start(
        processor: Arc<SyncProcessor>,
        monitor: &NetworkMonitor,
        interval: Duration,
    ) -> io::Result<Self> {
        if interval.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "sync interval must be greater than zero",
            ));
        }
        let (sender, receiver) = mpsc::channel();
        let completed_passes = Arc::new(AtomicUsize::new(0));

        let reconnect_sender = sender.clone();
        monitor.on_online(move || {
            reconnect_sender
                .send(Signal::Run(SyncTrigger::Reconnect))
                .is_ok()
        });

        let passes = Arc::clone(&completed_passes);
        let worker = thread::Builder::new()
            .name("tasky-sync".to_string())
            .spawn(move || run_loop(&processor, &receiver, interval, &passes))?;

        info!(
            "event=sync_scheduler module=sync status=start interval_ms={}",
            interval.as_millis()
        );
        Ok(Self {
            sender,
            worker: Some(worker),
            completed_passes,
        })
    }

    /// Requests one extra pass as soon as the current one (if any) finishes.
    pub fn trigger(&self) {
        let _ = self.sender.send(Signal::Run(SyncTrigger::Manual));
    }

    /// Number of passes finished so far, whatever their outcome.
    pub fn completed_passes(&self) -> usize {
        self.completed_passes.load(Ordering::SeqCst)
    }

    /// Stops the thread after the pass in progress.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.sender.send(Signal::Shutdown);
        if worker.join().is_err() {
            error!("event=sync_scheduler module=sync status=error error_code=worker_panicked");
        } else {
            info!("event=sync_scheduler module=sync status=ok action=stopped");
        }
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    processor: &SyncProcessor,
    receiver: &Receiver<Signal>,
    interval: Duration,
    passes: &AtomicUsize,
) {
    run_pass(processor, SyncTrigger::Startup, passes);

    let mut next_tick = Instant::now() + interval;
    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match receiver.recv_timeout(wait) {
            Ok(Signal::Run(trigger)) => run_pass(processor, trigger, passes),
            Ok(Signal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                run_pass(processor, SyncTrigger::Interval, passes);
                let now = Instant::now();
                next_tick += interval;
                if next_tick <= now {
                    next_tick = now + interval;
                }
            }
        }
    }
}

fn run_pass(processor: &SyncProcessor, trigger: SyncTrigger, passes: &AtomicUsize) {
    match processor.process_queue() {
        Ok(SyncPass::Drained(report)) => info!(
            "event=sync_trigger module=sync status=ok trigger={} applied={} failed={}",
            trigger.as_str(),
            report.applied,
            report.failed
        ),
        Ok(_) => {}
        Err(err) => error!(
            "event=sync_trigger module=sync status=error trigger={} error_code=queue_read_failed error={}",
            trigger.as_str(),
            err
        ),
    }
    passes.fetch_add(1, Ordering::SeqCst);
}
