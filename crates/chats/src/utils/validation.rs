//! Input validation for inbound requests.

use crate::types::{ChatError, ChatResult, MessageContent};

const MAX_ID_LEN: usize = 128;
const MAX_GROUP_NAME_LEN: usize = 100;

pub struct Validator;

impl Validator {
    /// Drop blank fields and require at least one of text, image or video.
    pub fn message_content(content: MessageContent) -> ChatResult<MessageContent> {
        let content = MessageContent {
            text: non_blank(content.text),
            image_url: non_blank(content.image_url),
            video_url: non_blank(content.video_url),
        };

        if content.text.is_none() && content.image_url.is_none() && content.video_url.is_none() {
            return Err(ChatError::validation(
                "message needs text, an image or a video",
            ));
        }

        Ok(content)
    }

    pub fn group_name(name: &str) -> ChatResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChatError::validation("group name cannot be empty"));
        }
        if name.chars().count() > MAX_GROUP_NAME_LEN {
            return Err(ChatError::validation(format!(
                "group name too long (max {MAX_GROUP_NAME_LEN} characters)"
            )));
        }
        Ok(name.to_string())
    }

    /// A well-formed entity id: non-empty, bounded, no whitespace.
    pub fn identifier<'a>(field: &str, id: &'a str) -> ChatResult<&'a str> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ChatError::validation(format!("{field} is required")));
        }
        if id.len() > MAX_ID_LEN || id.chars().any(char::is_whitespace) {
            return Err(ChatError::validation(format!("{field} is malformed")));
        }
        Ok(id)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
