//! Chat services: one per pipeline, plus the feed aggregator.

mod authors;

pub mod broadcast_service;
pub mod direct_service;
pub mod directory;
pub mod feed_service;
pub mod group_service;
pub mod seen_service;

pub use broadcast_service::BroadcastService;
pub use direct_service::DirectMessageService;
pub use directory::UserDirectory;
pub use feed_service::FeedService;
pub use group_service::GroupService;
pub use seen_service::SeenService;

use parley_database::Pool;

/// Every chat service built over one pool.
#[derive(Clone)]
pub struct ChatServices {
    pub directory: UserDirectory,
    pub direct: DirectMessageService,
    pub groups: GroupService,
    pub broadcast: BroadcastService,
    pub seen: SeenService,
    pub feed: FeedService,
}

impl ChatServices {
    pub fn new(pool: Pool) -> Self {
        Self {
            directory: UserDirectory::new(pool.clone()),
            direct: DirectMessageService::new(pool.clone()),
            groups: GroupService::new(pool.clone()),
            broadcast: BroadcastService::new(pool.clone()),
            seen: SeenService::new(pool.clone()),
            feed: FeedService::new(pool),
        }
    }
}
