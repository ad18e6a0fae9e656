//! Queue drain loop reconciling local edits with the remote document store.
//!
//! # Responsibility
//! - Apply queued operations to the remote store in enqueue order.
//! - Remove applied operations; keep failed ones for the next pass.
//!
//! # Invariants
//! - Availability and connectivity are checked once, at the start of a pass.
//! - One pass at a time: a pass started while another is in flight returns
//!   `AlreadyRunning` without touching the queue.
//! - Failed operations are retried forever; `retry_count` is not incremented
//!   and no operation is ever dead-lettered.
//! - A pass runs to the end of its queue snapshot; it is not cancellable.

use crate::db::{DbResult, LocalStore};
use crate::model::sync_op::{SyncOperation, SyncOperationType};
use crate::sync::connectivity::Connectivity;
use crate::sync::queue::SyncQueue;
use crate::sync::remote::{sanitize_payload, RemoteCollection, RemoteError, RemoteStore};
use crate::time::now_ms;
use log::{debug, error, info, warn};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Settings key holding the epoch-ms time of the last pass that applied work.
pub const LAST_SYNC_AT_SETTING: &str = "lastSyncAt";

/// Counters for one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub applied: usize,
    /// Left in the queue for retry.
    pub failed: usize,
    /// Unknown entity kind; dropped from the queue without a remote call.
    pub skipped: usize,
}

/// Result of one call to [`SyncProcessor::process_queue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPass {
    StoreUnavailable,
    Offline,
    AlreadyRunning,
    Empty,
    Drained(SyncReport),
}

enum Applied {
    Written,
    Skipped,
}

pub struct SyncProcessor {
    store: Arc<LocalStore>,
    queue: SyncQueue,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn Connectivity>,
    in_flight: AtomicBool,
}

impl SyncProcessor {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        Self {
            queue: SyncQueue::new(Arc::clone(&store)),
            store,
            remote,
            connectivity,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a pass is currently draining the queue.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Runs one drain pass.
    ///
    /// # Errors
    /// - Returns an error only when the queue itself cannot be read. Remote
    ///   failures are logged and counted in the report.
    pub fn process_queue(&self) -> DbResult<SyncPass> {
        if !self.store.is_available() {
            debug!("event=sync_pass module=sync status=skip reason=store_unavailable");
            return Ok(SyncPass::StoreUnavailable);
        }
        if !self.connectivity.is_online() {
            debug!("event=sync_pass module=sync status=skip reason=offline");
            return Ok(SyncPass::Offline);
        }
        let Some(_guard) = PassGuard::acquire(&self.in_flight) else {
            debug!("event=sync_pass module=sync status=skip reason=already_running");
            return Ok(SyncPass::AlreadyRunning);
        };

        let pending = self.queue.pending()?;
        if pending.is_empty() {
            return Ok(SyncPass::Empty);
        }

        let started_at = Instant::now();
        info!(
            "event=sync_pass module=sync status=start pending={}",
            pending.len()
        );

        let mut report = SyncReport::default();
        for op in &pending {
            report.attempted += 1;
            match self.apply(op) {
                Ok(Applied::Written) => report.applied += 1,
                Ok(Applied::Skipped) => {
                    report.skipped += 1;
                    debug!(
                        "event=sync_apply module=sync status=skip reason=unknown_entity op_id={}",
                        op.id
                    );
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=sync_apply module=sync status=error op_id={} op_type={} entity={} error_code={} retryable={} error={}",
                        op.id,
                        op.op_type.as_str(),
                        op.entity.as_str(),
                        err.code,
                        err.retryable,
                        err.message
                    );
                    continue;
                }
            }

            // The remote write is idempotent, so a lingering entry only costs
            // one more upload on the next pass.
            if let Err(err) = self.queue.remove(&op.id) {
                error!(
                    "event=queue_remove module=sync status=error op_id={} error={}",
                    op.id, err
                );
            }
        }

        if report.applied > 0 {
            if let Err(err) = self
                .store
                .put_setting(LAST_SYNC_AT_SETTING, &Value::from(now_ms()))
            {
                warn!(
                    "event=sync_pass module=sync status=error error_code=last_sync_write_failed error={}",
                    err
                );
            }
        }

        info!(
            "event=sync_pass module=sync status=ok duration_ms={} attempted={} applied={} failed={} skipped={}",
            started_at.elapsed().as_millis(),
            report.attempted,
            report.applied,
            report.failed,
            report.skipped
        );
        Ok(SyncPass::Drained(report))
    }

    fn apply(&self, op: &SyncOperation) -> Result<Applied, RemoteError> {
        let Some(collection) = RemoteCollection::for_entity(op.entity) else {
            return Ok(Applied::Skipped);
        };

        match op.op_type {
            SyncOperationType::Delete => self.remote.delete(collection, &op.entity_id)?,
            SyncOperationType::Create | SyncOperationType::Update => {
                let document = sanitize_payload(op.entity, &op.payload);
                self.remote
                    .upsert_merge(collection, &op.entity_id, &document)?
            }
        }
        Ok(Applied::Written)
    }
}

/// Single-flight flag held for the duration of one pass.
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
