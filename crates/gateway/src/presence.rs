//! Online presence.
//!
//! A user is online while they have a connection. The set is keyed by user
//! id, so closing any one of several connections takes the user offline.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use crate::registry::TopicRegistry;
use crate::websocket::events::ServerEvent;

#[derive(Clone)]
pub struct PresenceTracker {
    online: Arc<Mutex<BTreeSet<String>>>,
    registry: TopicRegistry,
}

impl PresenceTracker {
    pub fn new(registry: TopicRegistry) -> Self {
        Self {
            online: Arc::new(Mutex::new(BTreeSet::new())),
            registry,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.online.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark the user online and push the new set to every connection.
    pub fn on_connect(&self, user_id: &str) {
        let mut online = self.lock();
        online.insert(user_id.to_string());
        info!(user_id, online = online.len(), "user online");
        // Published under the lock so updates reach clients in set order.
        self.registry.broadcast_all(&ServerEvent::PresenceUpdate {
            user_ids: online.iter().cloned().collect(),
        });
    }

    pub fn on_disconnect(&self, user_id: &str) {
        let mut online = self.lock();
        online.remove(user_id);
        info!(user_id, online = online.len(), "user offline");
        self.registry.broadcast_all(&ServerEvent::PresenceUpdate {
            user_ids: online.iter().cloned().collect(),
        });
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.lock().contains(user_id)
    }

    pub fn snapshot(&self) -> BTreeSet<String> {
        self.lock().clone()
    }
}
