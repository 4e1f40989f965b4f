//! Shared application state for the gateway

use parley_auth::Authenticator;
use parley_chats::ChatServices;
use parley_config::RealtimeConfig;
use parley_database::Pool;

use crate::presence::PresenceTracker;
use crate::registry::TopicRegistry;

/// Everything a request or connection handler needs.
#[derive(Clone)]
pub struct GatewayState {
    pub services: ChatServices,
    pub authenticator: Authenticator,
    /// Live connections and their topic subscriptions.
    pub registry: TopicRegistry,
    pub presence: PresenceTracker,
    /// Capacity of each connection's outbound queue.
    pub outbound_buffer: usize,
}

impl GatewayState {
    pub fn new(pool: Pool, authenticator: Authenticator, realtime: &RealtimeConfig) -> Self {
        let registry = TopicRegistry::new();
        Self {
            services: ChatServices::new(pool),
            authenticator,
            presence: PresenceTracker::new(registry.clone()),
            registry,
            outbound_buffer: realtime.outbound_buffer.max(1),
        }
    }

    /// Online check handed to feed and context builders.
    pub fn online_check(&self) -> impl Fn(&str) -> bool {
        let online = self.presence.snapshot();
        move |user_id: &str| online.contains(user_id)
    }
}
