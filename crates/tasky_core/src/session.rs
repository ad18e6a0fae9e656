//! Current-user context shared by the entity stores.

use crate::model::record::GUEST_USER_ID;
use std::sync::RwLock;

/// Identity used to stamp new entities. Unauthenticated sessions act as guest.
#[derive(Debug, Default)]
pub struct Session {
    user_id: RwLock<Option<String>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id.into())),
        }
    }

    pub fn set_user(&self, user_id: impl Into<String>) {
        *self
            .user_id
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(user_id.into());
    }

    pub fn clear_user(&self) {
        *self
            .user_id
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Signed-in user id, or `"guest"`.
    pub fn current_user_id(&self) -> String {
        self.user_id
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .unwrap_or_else(|| GUEST_USER_ID.to_string())
    }
}
