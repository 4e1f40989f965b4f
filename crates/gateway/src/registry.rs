//! Topic registry: which live connections receive which events.
//!
//! Every connection is subscribed to its own user topic and to one topic per
//! group it belongs to. Publishing never blocks; a connection whose outbound
//! queue is full misses the event and the drop is logged.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use parley_auth::UserIdentity;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::websocket::events::ServerEvent;

pub type ConnectionId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    User(String),
    Group(String),
}

struct ConnectionEntry {
    identity: UserIdentity,
    sender: mpsc::Sender<ServerEvent>,
    topics: HashSet<Topic>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: ConnectionId,
    topics: HashMap<Topic, HashSet<ConnectionId>>,
    connections: HashMap<ConnectionId, ConnectionEntry>,
}

#[derive(Clone, Default)]
pub struct TopicRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the maps half-updated in a
    // way later callers care about, so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a connection together with its initial subscriptions. Nothing is
    /// published to it until every initial topic is in place.
    pub fn register(
        &self,
        identity: UserIdentity,
        sender: mpsc::Sender<ServerEvent>,
        topics: impl IntoIterator<Item = Topic>,
    ) -> ConnectionId {
        let mut inner = self.write();
        inner.next_id += 1;
        let id = inner.next_id;

        let topics: HashSet<Topic> = topics.into_iter().collect();
        for topic in &topics {
            inner.topics.entry(topic.clone()).or_default().insert(id);
        }
        debug!(connection_id = id, user_id = %identity.id, topics = topics.len(), "connection registered");
        inner.connections.insert(
            id,
            ConnectionEntry {
                identity,
                sender,
                topics,
            },
        );
        id
    }

    /// Returns false when the connection is gone.
    pub fn subscribe(&self, id: ConnectionId, topic: Topic) -> bool {
        let mut inner = self.write();
        let Some(entry) = inner.connections.get_mut(&id) else {
            return false;
        };
        entry.topics.insert(topic.clone());
        inner.topics.entry(topic).or_default().insert(id);
        true
    }

    pub fn unsubscribe(&self, id: ConnectionId, topic: &Topic) {
        let mut inner = self.write();
        if let Some(entry) = inner.connections.get_mut(&id) {
            entry.topics.remove(topic);
        }
        detach(&mut inner.topics, topic, id);
    }

    /// Drop a connection and all its subscriptions.
    pub fn remove(&self, id: ConnectionId) -> Option<UserIdentity> {
        let mut inner = self.write();
        let entry = inner.connections.remove(&id)?;
        for topic in &entry.topics {
            detach(&mut inner.topics, topic, id);
        }
        debug!(connection_id = id, user_id = %entry.identity.id, "connection removed");
        Some(entry.identity)
    }

    /// Queue an event for every subscriber of the topic. Returns how many
    /// connections accepted it.
    pub fn publish(&self, topic: &Topic, event: &ServerEvent) -> usize {
        let inner = self.read();
        let Some(ids) = inner.topics.get(topic) else {
            return 0;
        };
        ids.iter()
            .filter_map(|id| inner.connections.get(id).map(|entry| (*id, entry)))
            .filter(|(id, entry)| deliver(*id, &entry.sender, event.clone()))
            .count()
    }

    /// Queue an event for every live connection.
    pub fn broadcast_all(&self, event: &ServerEvent) -> usize {
        let inner = self.read();
        inner
            .connections
            .iter()
            .filter(|(id, entry)| deliver(**id, &entry.sender, event.clone()))
            .count()
    }

    /// Distinct identities with at least one live connection.
    pub fn connected_identities(&self) -> Vec<UserIdentity> {
        let inner = self.read();
        let mut seen = HashSet::new();
        inner
            .connections
            .values()
            .filter(|entry| seen.insert(entry.identity.id.clone()))
            .map(|entry| entry.identity.clone())
            .collect()
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.read().topics.get(topic).map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }
}

fn detach(topics: &mut HashMap<Topic, HashSet<ConnectionId>>, topic: &Topic, id: ConnectionId) {
    if let Some(ids) = topics.get_mut(topic) {
        ids.remove(&id);
        if ids.is_empty() {
            topics.remove(topic);
        }
    }
}

/// Queue without waiting. A full queue drops the event for this connection only.
pub(crate) fn deliver(
    id: ConnectionId,
    sender: &mpsc::Sender<ServerEvent>,
    event: ServerEvent,
) -> bool {
    match sender.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(connection_id = id, "outbound queue full, dropping event");
            false
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str) -> UserIdentity {
        UserIdentity {
            id: id.to_string(),
            display_name: id.to_string(),
            email: None,
            avatar_url: None,
            is_admin: false,
        }
    }

    fn hello(id: &str) -> ServerEvent {
        ServerEvent::Hello {
            user_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn publish_reaches_only_subscribers() {
        let registry = TopicRegistry::new();
        let (alice_tx, mut alice_rx) = mpsc::channel(8);
        let (bob_tx, mut bob_rx) = mpsc::channel(8);

        registry.register(
            identity("alice"),
            alice_tx,
            [Topic::User("alice".into()), Topic::Group("g1".into())],
        );
        registry.register(identity("bob"), bob_tx, [Topic::User("bob".into())]);

        assert_eq!(registry.publish(&Topic::Group("g1".into()), &hello("x")), 1);
        assert!(matches!(alice_rx.try_recv(), Ok(ServerEvent::Hello { .. })));
        assert!(bob_rx.try_recv().is_err());

        assert_eq!(registry.publish(&Topic::Group("nobody".into()), &hello("x")), 0);
        assert_eq!(registry.broadcast_all(&hello("y")), 2);
    }

    #[tokio::test]
    async fn subscribe_and_remove_maintain_topics() {
        let registry = TopicRegistry::new();
        let (tx, _rx) = mpsc::channel(8);
        let id = registry.register(identity("alice"), tx, [Topic::User("alice".into())]);

        assert!(registry.subscribe(id, Topic::Group("g1".into())));
        assert_eq!(registry.subscriber_count(&Topic::Group("g1".into())), 1);

        registry.unsubscribe(id, &Topic::Group("g1".into()));
        assert_eq!(registry.subscriber_count(&Topic::Group("g1".into())), 0);

        assert_eq!(registry.remove(id).map(|user| user.id), Some("alice".to_string()));
        assert_eq!(registry.subscriber_count(&Topic::User("alice".into())), 0);
        assert!(!registry.subscribe(id, Topic::Group("g1".into())));
        assert!(registry.remove(id).is_none());
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let registry = TopicRegistry::new();
        let (tx, mut rx) = mpsc::channel(1);
        registry.register(identity("alice"), tx, [Topic::User("alice".into())]);

        let topic = Topic::User("alice".into());
        assert_eq!(registry.publish(&topic, &hello("1")), 1);
        assert_eq!(registry.publish(&topic, &hello("2")), 0);

        match rx.try_recv() {
            Ok(ServerEvent::Hello { user_id }) => assert_eq!(user_id, "1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn identities_are_deduplicated_across_connections() {
        let registry = TopicRegistry::new();
        let (tx1, _rx1) = mpsc::channel(1);
        let (tx2, _rx2) = mpsc::channel(1);
        registry.register(identity("alice"), tx1, []);
        registry.register(identity("alice"), tx2, []);

        assert_eq!(registry.connection_count(), 2);
        assert_eq!(registry.connected_identities().len(), 1);
    }
}
