use log::debug;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

static ACTIVE_BATCHES: Lazy<Mutex<HashMap<Uuid, CancellationToken>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn registry() -> MutexGuard<'static, HashMap<Uuid, CancellationToken>> {
    ACTIVE_BATCHES
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Keeps a batch cancellable by id until dropped.
#[derive(Debug)]
pub struct BatchRegistration {
    id: Uuid,
    token: CancellationToken,
}

impl BatchRegistration {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Drop for BatchRegistration {
    fn drop(&mut self) {
        registry().remove(&self.id);
    }
}

pub fn register_batch() -> BatchRegistration {
    let id = Uuid::new_v4();
    let token = CancellationToken::new();
    registry().insert(id, token.clone());
    debug!("batch {} registered", id);
    BatchRegistration { id, token }
}

/// Cancel a running batch. Returns `false` when no such batch is active.
pub fn cancel_batch(id: Uuid) -> bool {
    let token = registry().get(&id).cloned();
    match token {
        Some(token) => {
            token.cancel();
            debug!("batch {} cancel requested", id);
            true
        }
        None => false,
    }
}

pub fn is_batch_active(id: Uuid) -> bool {
    registry().contains_key(&id)
}

pub fn active_batches() -> Vec<Uuid> {
    registry().keys().copied().collect()
}
