//! Session registry.
//!
//! An explicit object passed by reference, not a process-global
//! list; lifecycle is testable in isolation.

use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::Mutex;

use super::Session;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<FnvHashMap<u64, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Arc<Session>) {
        self.sessions.lock().insert(session.id(), session);
    }

    pub fn get(&self, id: u64) -> Option<Arc<Session>> {
        self.sessions.lock().get(&id).cloned()
    }

    pub fn remove(&self, id: u64) -> Option<Arc<Session>> {
        self.sessions.lock().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
