//! Application root wiring storage, stores and sync together.
//!
//! # Responsibility
//! - Own the single local store handle and hand it to every component.
//! - Expose the three entity stores and the sync entry points.
//!
//! # Invariants
//! - All components share one `LocalStore` and one `Session`.
//! - At most one background scheduler is running per core.

use crate::config::{ConfigError, CoreConfig, DEFAULT_SYNC_INTERVAL};
use crate::db::{DbResult, LocalStore};
use crate::logging;
use crate::model::goal::Goal;
use crate::model::note::Note;
use crate::model::task::Task;
use crate::session::Session;
use crate::store::{BackRef, GoalStore, NoteStore, TaskStore};
use crate::sync::connectivity::{Connectivity, NetworkMonitor};
use crate::sync::processor::{SyncPass, SyncProcessor, LAST_SYNC_AT_SETTING};
use crate::sync::remote::RemoteStore;
use crate::sync::scheduler::SyncScheduler;
use log::info;
use std::io;
use std::sync::Arc;
use std::time::Duration;

pub struct TaskyCore {
    store: Arc<LocalStore>,
    session: Arc<Session>,
    monitor: Arc<NetworkMonitor>,
    processor: Arc<SyncProcessor>,
    scheduler: Option<SyncScheduler>,
    sync_interval: Duration,
    tasks: TaskStore,
    goals: GoalStore,
    notes: NoteStore,
}

impl TaskyCore {
    pub fn new(
        store: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        monitor: Arc<NetworkMonitor>,
    ) -> Self {
        let session = Arc::new(Session::new());
        let processor = Arc::new(SyncProcessor::new(
            Arc::clone(&store),
            remote,
            Arc::clone(&monitor) as Arc<dyn Connectivity>,
        ));
        Self {
            tasks: TaskStore::new(Arc::clone(&store), Arc::clone(&session)),
            goals: GoalStore::new(Arc::clone(&store), Arc::clone(&session)),
            notes: NoteStore::new(Arc::clone(&store), Arc::clone(&session)),
            store,
            session,
            monitor,
            processor,
            scheduler: None,
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }

    /// Builds a core from `config`: starts logging when `log_dir` is set,
    /// opens the database and keeps the sync interval for
    /// [`TaskyCore::start_sync_scheduler`]. A database that cannot be opened
    /// leaves the core running without durable storage.
    ///
    /// # Errors
    /// - Returns an error when `config` fails validation or its logging
    ///   settings are rejected.
    pub fn open(
        config: &CoreConfig,
        remote: Arc<dyn RemoteStore>,
        monitor: Arc<NetworkMonitor>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        logging::init_from_config(config)?;
        let store = LocalStore::open_or_unavailable(config.db_path.as_deref());
        info!(
            "event=core_open module=core status=ok storage={}",
            if store.is_available() { "available" } else { "unavailable" }
        );
        let mut core = Self::new(Arc::new(store), remote, monitor);
        core.sync_interval = config.sync_interval();
        Ok(core)
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn monitor(&self) -> &NetworkMonitor {
        &self.monitor
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut TaskStore {
        &mut self.tasks
    }

    pub fn goals(&self) -> &GoalStore {
        &self.goals
    }

    pub fn goals_mut(&mut self) -> &mut GoalStore {
        &mut self.goals
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut NoteStore {
        &mut self.notes
    }

    /// Reloads all three stores from durable storage.
    pub fn load_all(&mut self) {
        self.tasks.load();
        self.goals.load();
        self.notes.load();
    }

    /// Runs one drain pass on the calling thread.
    pub fn trigger_sync(&self) -> DbResult<SyncPass> {
        self.processor.process_queue()
    }

    /// Period used by [`TaskyCore::start_sync_scheduler`].
    pub fn sync_interval(&self) -> Duration {
        self.sync_interval
    }

    /// Starts the background scheduler at the configured interval. Calling
    /// it again while one is running is a no-op.
    ///
    /// # Errors
    /// - Returns an error when the scheduler thread cannot be spawned.
    pub fn start_sync_scheduler(&mut self) -> io::Result<()> {
        if self.scheduler.is_some() {
            return Ok(());
        }
        let scheduler =
            SyncScheduler::start(Arc::clone(&self.processor), &self.monitor, self.sync_interval)?;
        self.scheduler = Some(scheduler);
        Ok(())
    }

    pub fn scheduler(&self) -> Option<&SyncScheduler> {
        self.scheduler.as_ref()
    }

    /// Stops the background scheduler after its current pass.
    pub fn stop_sync_scheduler(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
    }

    /// Epoch ms of the last pass that applied at least one operation.
    pub fn last_sync_at(&self) -> DbResult<Option<i64>> {
        Ok(self
            .store
            .get_setting(LAST_SYNC_AT_SETTING)?
            .and_then(|value| value.as_i64()))
    }

    pub fn goal_of<'a>(&'a self, task: &'a Task) -> BackRef<'a, Goal> {
        self.goals.goal_of(task)
    }

    pub fn task_of<'a>(&'a self, note: &'a Note) -> BackRef<'a, Task> {
        BackRef::lookup(note.task_id.as_deref(), |id| self.tasks.get(id))
    }
}
