//! In-memory task store.
//!
//! # Responsibility
//! - Mirror the `tasks` table for synchronous reads.
//! - Create, update, delete, toggle and reorder tasks optimistically, then
//!   persist each change through the action layer.
//! - Provide the list projections the views read.
//!
//! # Invariants
//! - Every update bumps `updated_at` and marks `sync_status = Pending`.
//! - Completing a task with a fixed repeat rule and a due date spawns exactly
//!   one follow-up task due at the next occurrence.
//! - Reorder assigns dense zero-based `order` values and persists only the
//!   tasks whose value changed.

use crate::db::LocalStore;
use crate::model::task::{NewTaskOptions, Priority, SyncStatus, Task, TaskPatch, INBOX_LIST_ID};
use crate::service::local_actions::{ActionType, LocalActions};
use crate::session::Session;
use crate::store::cache::EntityCache;
use crate::store::BackRef;
use crate::time::{next_occurrence, now_ms};
use log::debug;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Result of toggling a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// Toggled task as stored.
    pub task: Task,
    /// Next occurrence created for a completed repeating task.
    pub follow_up: Option<Task>,
}

/// Completion summary for the tasks linked to one goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GoalProgress {
    pub total: usize,
    pub completed: usize,
    /// Rounded percentage; 0 when no task is linked.
    pub percent: u8,
}

pub struct TaskStore {
    cache: EntityCache<Task>,
    store: Arc<LocalStore>,
    actions: LocalActions,
    session: Arc<Session>,
}

impl TaskStore {
    pub fn new(store: Arc<LocalStore>, session: Arc<Session>) -> Self {
        Self {
            cache: EntityCache::new(),
            actions: LocalActions::new(Arc::clone(&store)),
            store,
            session,
        }
    }

    /// Replaces memory with the durable `tasks` table.
    pub fn load(&mut self) {
        self.cache.load(&self.store);
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading
    }

    pub fn tasks(&self) -> &HashMap<String, Task> {
        &self.cache.items
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.cache.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.cache.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.items.is_empty()
    }

    /// Adds a task to `list_id` (inbox when `None`) and queues its creation.
    pub fn add(
        &mut self,
        title: impl Into<String>,
        list_id: Option<&str>,
        options: NewTaskOptions,
    ) -> Task {
        let task = Task::create(
            self.session.current_user_id(),
            title,
            list_id.unwrap_or(INBOX_LIST_ID),
            options,
            now_ms(),
        );
        self.cache.items.insert(task.id.clone(), task.clone());
        self.actions.perform_local_action(&task, ActionType::Create);
        task
    }

    /// Merges `patch` into an existing task. Unknown ids are ignored.
    pub fn update(&mut self, id: &str, patch: TaskPatch) -> Option<Task> {
        let task = self.cache.items.get_mut(id)?;
        patch.apply(task);
        task.updated_at = now_ms();
        task.sync_status = Some(SyncStatus::Pending);
        let updated = task.clone();
        self.actions
            .perform_local_action(&updated, ActionType::Update);
        Some(updated)
    }

    /// Drops the task from memory and queues its deletion.
    ///
    /// The durable row and remote document are deleted even when the id is
    /// not cached, since memory may not have been loaded yet. Returns whether
    /// the task was cached.
    pub fn delete(&mut self, id: &str) -> bool {
        let was_cached = self.cache.items.remove(id).is_some();
        self.actions.perform_local_delete::<Task>(id);
        was_cached
    }

    /// Flips completion; spawns the next occurrence of a repeating task.
    pub fn toggle(&mut self, id: &str) -> Option<ToggleOutcome> {
        let original = self.cache.items.get(id)?.clone();
        let completed = !original.completed;
        let task = self.update(
            id,
            TaskPatch {
                completed: Some(completed),
                completed_at: Some(completed.then(now_ms)),
                ..TaskPatch::default()
            },
        )?;

        let follow_up = if completed {
            self.spawn_next_occurrence(&original)
        } else {
            None
        };
        Some(ToggleOutcome { task, follow_up })
    }

    fn spawn_next_occurrence(&mut self, completed: &Task) -> Option<Task> {
        let repeat = completed.recurring_rule()?;
        let due_date = completed.due_date?;
        let Some(next_due) = next_occurrence(due_date, repeat) else {
            debug!(
                "event=task_repeat module=store status=skip reason=date_out_of_range task_id={}",
                completed.id
            );
            return None;
        };
        Some(self.add(
            completed.title.clone(),
            Some(completed.list_id.as_str()),
            NewTaskOptions {
                due_date: Some(next_due),
                repeat: Some(repeat),
                priority: Some(completed.priority),
                ..NewTaskOptions::default()
            },
        ))
    }

    /// Moves `active_id` to the position of `over_id` and renumbers all tasks.
    ///
    /// Returns the number of tasks whose order changed. Unknown ids are a no-op.
    pub fn reorder(&mut self, active_id: &str, over_id: &str) -> usize {
        let mut ids: Vec<String> = self
            .sorted_by_order(|_| true)
            .into_iter()
            .map(|task| task.id.clone())
            .collect();

        let Some(old_index) = ids.iter().position(|id| id == active_id) else {
            return 0;
        };
        let Some(new_index) = ids.iter().position(|id| id == over_id) else {
            return 0;
        };
        let moved = ids.remove(old_index);
        ids.insert(new_index, moved);

        let mut changed = Vec::new();
        for (position, id) in ids.iter().enumerate() {
            let new_order = i64::try_from(position).unwrap_or(i64::MAX);
            if let Some(task) = self.cache.items.get_mut(id) {
                if task.order != new_order {
                    task.order = new_order;
                    changed.push(task.clone());
                }
            }
        }

        for task in &changed {
            self.actions.perform_local_action(task, ActionType::Update);
        }
        changed.len()
    }

    /// Live tasks in display order.
    pub fn ordered(&self) -> Vec<&Task> {
        self.sorted_by_order(|task| !task.is_deleted)
    }

    /// Open high-priority tasks, newest first.
    pub fn important(&self) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .live()
            .filter(|task| !task.completed && task.priority == Priority::High)
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    /// Open tasks due at or after `from_ms`, soonest first.
    pub fn upcoming(&self, from_ms: i64) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .live()
            .filter(|task| !task.completed && task.due_date.is_some_and(|due| due >= from_ms))
            .collect();
        tasks.sort_by_key(|task| task.due_date);
        tasks
    }

    /// Live tasks linked to a goal: open first, then newest first.
    pub fn for_goal(&self, goal_id: &str) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self
            .live()
            .filter(|task| task.goal_id.as_deref() == Some(goal_id))
            .collect();
        tasks.sort_by(|a, b| {
            a.completed
                .cmp(&b.completed)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        tasks
    }

    pub fn goal_progress(&self, goal_id: &str) -> GoalProgress {
        let linked = self.for_goal(goal_id);
        let total = linked.len();
        let completed = linked.iter().filter(|task| task.completed).count();
        let percent = if total == 0 {
            0
        } else {
            ((completed as f64 / total as f64) * 100.0).round() as u8
        };
        GoalProgress {
            total,
            completed,
            percent,
        }
    }

    /// Parent task of a sub-task.
    pub fn parent_of<'a>(&'a self, task: &'a Task) -> BackRef<'a, Task> {
        BackRef::lookup(task.parent_id.as_deref(), |id| self.cache.items.get(id))
    }

    /// Live direct sub-tasks of `parent_id` in display order.
    pub fn subtasks(&self, parent_id: &str) -> Vec<&Task> {
        self.sorted_by_order(|task| {
            !task.is_deleted && task.parent_id.as_deref() == Some(parent_id)
        })
    }

    fn live(&self) -> impl Iterator<Item = &Task> {
        self.cache.items.values().filter(|task| !task.is_deleted)
    }

    fn sorted_by_order(&self, keep: impl Fn(&Task) -> bool) -> Vec<&Task> {
        let mut tasks: Vec<&Task> = self.cache.items.values().filter(|task| keep(task)).collect();
        tasks.sort_by(|a, b| display_order(a, b));
        tasks
    }
}

fn display_order(a: &Task, b: &Task) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
