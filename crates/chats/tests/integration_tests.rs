//! Pipeline scenarios against an on-disk SQLite database.

use std::collections::BTreeSet;

use parley_auth::UserIdentity;
use parley_chats::{ChatError, ChatServices, FeedItem, MessageContent};
use parley_config::DatabaseConfig;
use parley_database::{initialize_database, NewUser, Pool, UserRepository};
use tempfile::TempDir;

struct Harness {
    pool: Pool,
    services: ChatServices,
    users: UserRepository,
    _dir: TempDir,
}

impl Harness {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let pool = initialize_database(&DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("chats.db").display()),
            max_connections: 4,
            busy_timeout_ms: 5_000,
        })
        .await
        .unwrap();

        Self {
            services: ChatServices::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
            _dir: dir,
        }
    }

    async fn user(&self, name: &str) -> UserIdentity {
        self.users.insert(&NewUser::named(name)).await.unwrap().into()
    }

    async fn admin(&self, name: &str) -> UserIdentity {
        self.users
            .insert(&NewUser::named(name).admin())
            .await
            .unwrap()
            .into()
    }

    async fn feed(&self, user: &UserIdentity) -> Vec<FeedItem> {
        self.services.feed.build_feed(user, |_| false).await.unwrap()
    }

    async fn count(&self, table: &str) -> i64 {
        parley_database::table_counts(&self.pool)
            .await
            .unwrap()
            .into_iter()
            .find(|(name, _)| *name == table)
            .map(|(_, count)| count)
            .unwrap()
    }
}

fn direct_unseen(feed: &[FeedItem]) -> Vec<i64> {
    feed.iter()
        .filter_map(|item| match item {
            FeedItem::Direct(entry) => Some(entry.unseen_count),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn first_direct_message_creates_exactly_one_conversation() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    let b = h.user("B").await;

    let thread = h
        .services
        .direct
        .submit(&a, &b.id, MessageContent::text("hi"))
        .await
        .unwrap();

    assert_eq!(h.count("conversations").await, 1);
    assert_eq!(thread.messages.len(), 1);
    assert_eq!(thread.messages[0].text.as_deref(), Some("hi"));
    assert!(!thread.messages[0].seen);
    assert!(thread.participants.contains(&a.id) && thread.participants.contains(&b.id));

    let from_b = h
        .services
        .direct
        .conversation_context(&b, &a.id, |_| true)
        .await
        .unwrap();
    assert_eq!(from_b.messages, thread.messages);
    assert_eq!(from_b.conversation_id.as_deref(), Some(thread.conversation_id.as_str()));
    assert!(from_b.counterpart.online);
    assert_eq!(from_b.counterpart.user.name, "A");
}

#[tokio::test]
async fn replies_reuse_the_pair_conversation() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    let b = h.user("B").await;

    h.services
        .direct
        .submit(&a, &b.id, MessageContent::text("one"))
        .await
        .unwrap();
    let thread = h
        .services
        .direct
        .submit(&b, &a.id, MessageContent::text("two"))
        .await
        .unwrap();

    assert_eq!(h.count("conversations").await, 1);
    let texts: Vec<_> = thread
        .messages
        .iter()
        .filter_map(|m| m.text.as_deref())
        .collect();
    assert_eq!(texts, vec!["one", "two"]);
}

#[tokio::test]
async fn concurrent_first_messages_share_one_conversation() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    let b = h.user("B").await;

    let mut tasks = Vec::new();
    for i in 0..6 {
        let direct = h.services.direct.clone();
        let (sender, receiver) = if i % 2 == 0 {
            (a.clone(), b.id.clone())
        } else {
            (b.clone(), a.id.clone())
        };
        tasks.push(tokio::spawn(async move {
            direct
                .submit(&sender, &receiver, MessageContent::text(format!("m{i}")))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.count("conversations").await, 1);
    assert_eq!(h.count("messages").await, 6);
}

#[tokio::test]
async fn empty_content_and_unknown_receiver_are_rejected() {
    let h = Harness::new().await;
    let a = h.user("A").await;

    let err = h
        .services
        .direct
        .submit(&a, &a.id, MessageContent::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation { .. }));

    let err = h
        .services
        .direct
        .submit(&a, "nobody", MessageContent::text("hello?"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotFound { entity: "user", .. }));
    assert_eq!(h.count("conversations").await, 0);
}

#[tokio::test]
async fn mark_seen_flips_only_counterpart_messages_and_is_idempotent() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    let b = h.user("B").await;

    for text in ["x", "y"] {
        h.services
            .direct
            .submit(&a, &b.id, MessageContent::text(text))
            .await
            .unwrap();
    }
    h.services
        .direct
        .submit(&b, &a.id, MessageContent::text("z"))
        .await
        .unwrap();

    assert_eq!(direct_unseen(&h.feed(&b).await), vec![2]);
    assert_eq!(direct_unseen(&h.feed(&a).await), vec![1]);

    let first = h.services.seen.mark_seen(&b, &a.id).await.unwrap();
    assert_eq!(first.updated, 2);
    let feed_after_first = h.feed(&b).await;

    let second = h.services.seen.mark_seen(&b, &a.id).await.unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(h.feed(&b).await, feed_after_first);

    assert_eq!(direct_unseen(&feed_after_first), vec![0]);
    assert_eq!(direct_unseen(&h.feed(&a).await), vec![1]);
}

#[tokio::test]
async fn mark_seen_without_conversation_changes_nothing() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    let b = h.user("B").await;

    let update = h.services.seen.mark_seen(&a, &b.id).await.unwrap();
    assert_eq!(update.conversation_id, None);
    assert_eq!(update.updated, 0);
    assert_eq!(update.participants, vec![a.id.clone(), b.id.clone()]);
}

#[tokio::test]
async fn mark_seen_on_a_self_thread_leaves_own_messages_unseen() {
    let h = Harness::new().await;
    let a = h.user("A").await;

    let thread = h
        .services
        .direct
        .submit(&a, &a.id, MessageContent::text("note to self"))
        .await
        .unwrap();

    let update = h.services.seen.mark_seen(&a, &a.id).await.unwrap();
    assert_eq!(update.conversation_id.as_deref(), Some(thread.conversation_id.as_str()));
    assert_eq!(update.updated, 0);

    let context = h
        .services
        .direct
        .conversation_context(&a, &a.id, |_| false)
        .await
        .unwrap();
    assert_eq!(context.messages.len(), 1);
    assert!(!context.messages[0].seen);
}

#[tokio::test]
async fn group_history_is_shared_by_every_member() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    let b = h.user("B").await;
    let c = h.user("C").await;

    let group = h
        .services
        .groups
        .create(&a, "crew", &[a.id.clone(), b.id.clone(), c.id.clone()])
        .await
        .unwrap();
    assert_eq!(group.members.len(), 3);
    assert_eq!(group.admins.len(), 1);
    assert_eq!(group.admins[0].id, a.id);

    let sent = h
        .services
        .groups
        .send(&b, &group.id, MessageContent::text("yo"))
        .await
        .unwrap();
    assert_eq!(sent.group_id, group.id);
    assert_eq!(sent.message.author.as_ref().map(|u| u.id.as_str()), Some(b.id.as_str()));

    for viewer in [&a, &b, &c] {
        let messages = h.services.groups.fetch(viewer, &group.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message.author_id, b.id);
        assert_eq!(messages[0].author.as_ref().unwrap().name, "B");
    }
}

#[tokio::test]
async fn group_rules_cover_names_membership_and_existence() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    let outsider = h.user("Outsider").await;

    let err = h.services.groups.create(&a, "  ", &[]).await.unwrap_err();
    assert!(matches!(err, ChatError::Validation { .. }));

    let err = h
        .services
        .groups
        .create(&a, "ghosts", &["ghost".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Validation { .. }));

    let group = h.services.groups.create(&a, "solo", &[]).await.unwrap();
    assert_eq!(group.members.len(), 1);

    let err = h
        .services
        .groups
        .send(&outsider, &group.id, MessageContent::text("let me in"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::Authorization { .. }));

    let err = h.services.groups.fetch(&outsider, &group.id).await.unwrap_err();
    assert!(matches!(err, ChatError::Authorization { .. }));

    let err = h
        .services
        .groups
        .send(&a, "missing-group", MessageContent::text("hello"))
        .await
        .unwrap_err();
    assert!(matches!(err, ChatError::NotFound { entity: "group", .. }));

    let detail = h.services.groups.detail(&a, &group.id).await.unwrap();
    assert!(detail.messages.is_empty());
    assert!(h.services.groups.list_for_user(&outsider).await.unwrap().is_empty());
    assert_eq!(
        h.services.groups.memberships(&a.id).await.unwrap(),
        vec![group.id.clone()]
    );
}

#[tokio::test]
async fn broadcast_entry_is_ranked_among_other_items_for_non_admins() {
    let h = Harness::new().await;
    let admin = h.admin("Root").await;
    let a = h.user("A").await;
    let b = h.user("B").await;

    h.services
        .direct
        .submit(&a, &b.id, MessageContent::text("earlier"))
        .await
        .unwrap();
    assert!(h
        .feed(&a)
        .await
        .iter()
        .all(|item| !matches!(item, FeedItem::Broadcast(_))));

    let history = h
        .services
        .broadcast
        .post(&admin, MessageContent::text("maintenance tonight"))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].author.as_ref().unwrap().name, "Root");

    let feed = h.feed(&a).await;
    assert_eq!(feed.len(), 2);
    assert!(matches!(feed[0], FeedItem::Broadcast(_)));
    assert!(matches!(feed[1], FeedItem::Direct(_)));

    h.services
        .direct
        .submit(&b, &a.id, MessageContent::text("later"))
        .await
        .unwrap();
    let feed = h.feed(&a).await;
    assert!(matches!(feed[0], FeedItem::Direct(_)));
    assert!(matches!(feed[1], FeedItem::Broadcast(_)));

    assert!(h.feed(&admin).await.is_empty());
}

#[tokio::test]
async fn feed_marks_online_counterparts() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    let b = h.user("B").await;
    h.services
        .direct
        .submit(&a, &b.id, MessageContent::text("ping"))
        .await
        .unwrap();

    let online: BTreeSet<String> = [b.id.clone()].into_iter().collect();
    let feed = h
        .services
        .feed
        .build_feed(&a, |id| online.contains(id))
        .await
        .unwrap();

    match &feed[0] {
        FeedItem::Direct(entry) => {
            assert!(entry.counterpart.online);
            assert_eq!(entry.counterpart.user.id, b.id);
            assert_eq!(entry.unseen_count, 0);
        }
        other => panic!("expected direct entry, got {other:?}"),
    }
}

#[tokio::test]
async fn group_messages_reorder_the_feed_on_next_build() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    let b = h.user("B").await;

    let group = h
        .services
        .groups
        .create(&a, "crew", &[b.id.clone()])
        .await
        .unwrap();
    h.services
        .direct
        .submit(&a, &b.id, MessageContent::text("direct"))
        .await
        .unwrap();
    assert!(matches!(h.feed(&a).await[0], FeedItem::Direct(_)));

    h.services
        .groups
        .send(&b, &group.id, MessageContent::text("group"))
        .await
        .unwrap();
    match &h.feed(&a).await[0] {
        FeedItem::Group(entry) => {
            assert_eq!(entry.member_count, 2);
            assert_eq!(
                entry.last_message.as_ref().unwrap().message.text.as_deref(),
                Some("group")
            );
        }
        other => panic!("expected group entry, got {other:?}"),
    }
}

#[tokio::test]
async fn directory_lists_everyone_but_the_viewer() {
    let h = Harness::new().await;
    let a = h.user("A").await;
    h.user("B").await;
    h.user("C").await;

    let others = h.services.directory.list_others(&a).await.unwrap();
    let names: Vec<_> = others.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["B", "C"]);
}
