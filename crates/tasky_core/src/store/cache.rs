//! Keyed in-memory map shared by the entity stores.

use crate::db::LocalStore;
use crate::model::record::SyncEntity;
use log::{error, info};
use std::collections::HashMap;
use std::time::Instant;

pub(crate) struct EntityCache<E> {
    pub(crate) items: HashMap<String, E>,
    pub(crate) is_loading: bool,
}

impl<E: SyncEntity> EntityCache<E> {
    pub(crate) fn new() -> Self {
        Self {
            items: HashMap::new(),
            is_loading: true,
        }
    }

    /// Replaces memory with the durable table contents.
    ///
    /// Without storage, or when the read fails, memory is left as is.
    pub(crate) fn load(&mut self, store: &LocalStore) {
        let started_at = Instant::now();
        self.is_loading = true;

        if !store.is_available() {
            self.is_loading = false;
            return;
        }

        match store.get_all::<E>() {
            Ok(records) => {
                self.items = records
                    .into_iter()
                    .map(|record| (record.id().to_string(), record))
                    .collect();
                info!(
                    "event=store_load module=store status=ok table={} count={} duration_ms={}",
                    E::TABLE.name(),
                    self.items.len(),
                    started_at.elapsed().as_millis()
                );
            }
            Err(err) => error!(
                "event=store_load module=store status=error table={} error={}",
                E::TABLE.name(),
                err
            ),
        }
        self.is_loading = false;
    }
}
