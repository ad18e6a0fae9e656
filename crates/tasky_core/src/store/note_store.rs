//! In-memory note store.

use crate::db::LocalStore;
use crate::model::note::{NewNote, Note, NotePatch};
use crate::service::local_actions::{ActionType, LocalActions};
use crate::session::Session;
use crate::store::cache::EntityCache;
use crate::time::now_ms;
use std::collections::HashMap;
use std::sync::Arc;

pub struct NoteStore {
    cache: EntityCache<Note>,
    store: Arc<LocalStore>,
    actions: LocalActions,
    session: Arc<Session>,
}

impl NoteStore {
    pub fn new(store: Arc<LocalStore>, session: Arc<Session>) -> Self {
        Self {
            cache: EntityCache::new(),
            actions: LocalActions::new(Arc::clone(&store)),
            store,
            session,
        }
    }

    /// Replaces memory with the durable `notes` table.
    pub fn load(&mut self) {
        self.cache.load(&self.store);
    }

    pub fn is_loading(&self) -> bool {
        self.cache.is_loading
    }

    pub fn notes(&self) -> &HashMap<String, Note> {
        &self.cache.items
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.cache.items.get(id)
    }

    pub fn len(&self) -> usize {
        self.cache.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.items.is_empty()
    }

    pub fn add(&mut self, new_note: NewNote) -> Note {
        let note = Note::create(self.session.current_user_id(), new_note, now_ms());
        self.cache.items.insert(note.id.clone(), note.clone());
        self.actions.perform_local_action(&note, ActionType::Create);
        note
    }

    /// Merges `patch` into an existing note. Unknown ids are ignored.
    pub fn update(&mut self, id: &str, patch: NotePatch) -> Option<Note> {
        let note = self.cache.items.get_mut(id)?;
        patch.apply(note);
        note.updated_at = now_ms();
        let updated = note.clone();
        self.actions.perform_local_action(&updated, ActionType::Update);
        Some(updated)
    }

    pub fn pin(&mut self, id: &str) -> Option<Note> {
        let pinned = self.cache.items.get(id)?.pinned;
        self.update(
            id,
            NotePatch {
                pinned: Some(!pinned),
                ..NotePatch::default()
            },
        )
    }

    /// Drops the note from memory and queues its deletion.
    pub fn delete(&mut self, id: &str) -> bool {
        let was_cached = self.cache.items.remove(id).is_some();
        self.actions.perform_local_delete::<Note>(id);
        was_cached
    }

    /// Live pinned notes, most recently edited first.
    pub fn pinned(&self) -> Vec<&Note> {
        self.live_where(|note| note.pinned)
    }

    /// Live unpinned notes, most recently edited first.
    pub fn unpinned(&self) -> Vec<&Note> {
        self.live_where(|note| !note.pinned)
    }

    fn live_where(&self, keep: impl Fn(&Note) -> bool) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self
            .cache
            .items
            .values()
            .filter(|note| !note.is_deleted && keep(note))
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        notes
    }
}
