//! Author resolution for message lists.

use std::collections::HashMap;

use parley_database::{MessageRecord, NewMessage, UserRepository};

use crate::types::{AuthoredMessage, ChatResult, MessageContent, UserView};

pub(crate) async fn with_authors(
    users: &UserRepository,
    messages: Vec<MessageRecord>,
) -> ChatResult<Vec<AuthoredMessage>> {
    let mut author_ids: Vec<String> = Vec::new();
    for message in &messages {
        if !author_ids.contains(&message.author_id) {
            author_ids.push(message.author_id.clone());
        }
    }

    let authors: HashMap<String, UserView> = users
        .find_many(&author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id.clone(), UserView::from(user)))
        .collect();

    Ok(messages
        .into_iter()
        .map(|message| AuthoredMessage {
            author: authors.get(&message.author_id).cloned(),
            message: message.into(),
        })
        .collect())
}

pub(crate) async fn with_author(
    users: &UserRepository,
    message: MessageRecord,
) -> ChatResult<AuthoredMessage> {
    let author = users.find_by_id(&message.author_id).await?.map(UserView::from);
    Ok(AuthoredMessage {
        message: message.into(),
        author,
    })
}

pub(crate) fn new_message(author_id: &str, content: MessageContent) -> NewMessage {
    NewMessage {
        author_id: author_id.to_string(),
        text: content.text,
        image_url: content.image_url,
        video_url: content.video_url,
    }
}
