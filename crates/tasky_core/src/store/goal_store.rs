//! In-memory goal store.

use crate::db::LocalStore;
use crate::model::goal::{Goal, GoalPatch, GoalType};
use crate::model::task::Task;
use crate::service::local_actions::{ActionType, LocalActions};
use crate::session::Session;
use crate::store::cache::EntityCache;
use crate::store::BackRef;
use crate::time::now_ms;
use std::collections::HashMap;
use std::sync::Arc;

pub struct GoalStore {
    cache: EntityCache<Goal>,
    store: Arc<LocalStore>,
    actions: LocalActions,
    session: Arc<Session>,
}

impl GoalStore {
    pub fn new(store: Arc<LocalStore>, session: Arc<Session>) -> Self {
        Self {
            cache: EntityCache::new(),
            actions: LocalActions::new(Arc::clone(&store)),
            store,
            session,
        }
    }

    /// Replaces memory with the durable `goals` table.
    pub fn load(&mut self) {
        self.cache.load(&self.store);
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading
    }

    pub fn goals(&self) -> &HashMap<String, Goal> {
        &self.cache.items
    }

    pub fn get(&self, id: &str) -> Option<&Goal> {
        self.cache.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.cache.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.items.is_empty()
    }

    pub fn add(
        &mut self,
        title: impl Into<String>,
        kind: GoalType,
        start_date: i64,
        end_date: i64,
    ) -> Goal {
        let goal = Goal::create(
            self.session.current_user_id(),
            title,
            kind,
            start_date,
            end_date,
            now_ms(),
        );
        self.cache.items.insert(goal.id.clone(), goal.clone());
        self.actions.perform_local_action(&goal, ActionType::Create);
        goal
    }

    /// Merges `patch` into an existing goal. Unknown ids are ignored.
    pub fn update(&mut self, id: &str, patch: GoalPatch) -> Option<Goal> {
        let goal = self.cache.items.get_mut(id)?;
        patch.apply(goal);
        goal.updated_at = now_ms();
        let updated = goal.clone();
        self.actions.perform_local_action(&updated, ActionType::Update);
        Some(updated)
    }

    /// Marks the goal completed now, or clears completion.
    pub fn toggle(&mut self, id: &str) -> Option<Goal> {
        let was_completed = self.cache.items.get(id)?.is_completed();
        self.update(
            id,
            GoalPatch {
                completed_at: Some((!was_completed).then(now_ms)),
                ..GoalPatch::default()
            },
        )
    }

    /// Drops the goal from memory and queues its deletion. Tasks pointing at
    /// it keep their `goal_id` and resolve to a dangling reference.
    pub fn delete(&mut self, id: &str) -> bool {
        let was_cached = self.cache.items.remove(id).is_some();
        self.actions.perform_local_delete::<Goal>(id);
        was_cached
    }

    /// Live goals: open first, then by end date.
    pub fn active_sorted(&self) -> Vec<&Goal> {
        let mut goals: Vec<&Goal> = self
            .cache
            .items
            .values()
            .filter(|goal| !goal.is_deleted)
            .collect();
        goals.sort_by(|a, b| {
            a.is_completed()
                .cmp(&b.is_completed())
                .then_with(|| a.end_date.cmp(&b.end_date))
        });
        goals
    }

    /// Goal a task points at.
    pub fn goal_of<'a>(&'a self, task: &'a Task) -> BackRef<'a, Goal> {
        BackRef::lookup(task.goal_id.as_deref(), |id| self.cache.items.get(id))
    }
}
