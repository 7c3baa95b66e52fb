//! Telegram Bot API wire types
//!
//! Only the fields the bot reads are modeled; serde ignores the rest.

use serde::Deserialize;

/// Envelope around every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub date: i64,
    pub text: Option<String>,
    /// Available sizes of a photo, smallest first
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
}

impl Message {
    /// The highest resolution version of an attached photo
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo.last()
    }

    /// Id used to key history: the sender, or the chat for anonymous posts
    pub fn user_id(&self) -> i64 {
        self.from.as_ref().map(|u| u.id).unwrap_or(self.chat.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    /// "First Last", or just the first name
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub file_size: Option<u64>,
}

/// Result of `getFile`
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_size: Option<u64>,
    /// Relative download path, valid for at least an hour
    pub file_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_photo_update() {
        let json = r#"{
            "ok": true,
            "result": [{
                "update_id": 90001,
                "message": {
                    "message_id": 12,
                    "from": {"id": 4242, "is_bot": false, "first_name": "Ada",
                             "last_name": "Lovelace", "username": "ada", "language_code": "en"},
                    "chat": {"id": 4242, "type": "private", "first_name": "Ada"},
                    "date": 1740830400,
                    "photo": [
                        {"file_id": "small", "file_unique_id": "s", "width": 90, "height": 67, "file_size": 1200},
                        {"file_id": "large", "file_unique_id": "l", "width": 1280, "height": 960, "file_size": 98000}
                    ]
                }
            }]
        }"#;

        let response: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        assert!(response.ok);
        let updates = response.result.unwrap();
        let message = updates[0].message.as_ref().unwrap();

        assert_eq!(updates[0].update_id, 90001);
        assert_eq!(message.largest_photo().unwrap().file_id, "large");
        assert_eq!(message.user_id(), 4242);
        assert!(message.text.is_none());

        let user = message.from.as_ref().unwrap();
        assert_eq!(user.display_name(), "Ada Lovelace");
        assert_eq!(user.username.as_deref(), Some("ada"));
    }

    #[test]
    fn test_decode_text_update_without_photo() {
        let json = r#"{"update_id": 7, "message": {"message_id": 1,
            "from": {"id": 5, "is_bot": false, "first_name": "Bo"},
            "chat": {"id": 99, "type": "private"}, "date": 1, "text": "/stats"}}"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();
        assert!(message.largest_photo().is_none());
        assert_eq!(message.text.as_deref(), Some("/stats"));
        assert_eq!(message.from.unwrap().display_name(), "Bo");
    }

    #[test]
    fn test_anonymous_message_uses_chat_id() {
        let json = r#"{"message_id": 1, "chat": {"id": -100123}, "date": 1}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.user_id(), -100123);
    }

    #[test]
    fn test_decode_error_envelope() {
        let json = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(401));
        assert_eq!(response.description.as_deref(), Some("Unauthorized"));
    }
}
