use serde_json::Value;

use crate::channels::traits::{Identity, InboundMessage};

pub(super) fn parse_identity(user: &Value) -> Option<Identity> {
    let id = user.get("id").and_then(Value::as_i64)?;
    let username = user
        .get("username")
        .and_then(Value::as_str)
        .map(ToString::to_string);
    let first_name = user.get("first_name").and_then(Value::as_str).unwrap_or("");
    let last_name = user.get("last_name").and_then(Value::as_str).unwrap_or("");
    let display_name = format!("{first_name} {last_name}").trim().to_string();
    Some(Identity {
        id,
        username,
        display_name,
    })
}

/// Parse a Bot API `Message` object. Media messages fall back to their caption;
/// messages with neither text nor caption are skipped.
pub(super) fn parse_message(message: &Value) -> Option<InboundMessage> {
    let id = message.get("message_id").and_then(Value::as_i64)?;
    let chat_id = message
        .get("chat")
        .and_then(|chat| chat.get("id"))
        .and_then(Value::as_i64)?;
    let text = message
        .get("text")
        .or_else(|| message.get("caption"))
        .and_then(Value::as_str)?
        .to_string();
    let sender = message.get("from").and_then(parse_identity)?;
    let timestamp = message.get("date").and_then(Value::as_i64).unwrap_or_default();

    let reply_source = message.get("reply_to_message");
    let reply_to = reply_source
        .and_then(|reply| reply.get("message_id"))
        .and_then(Value::as_i64);
    let reply_snapshot = reply_source
        .and_then(parse_message)
        .map(Box::new);

    Some(InboundMessage {
        id,
        sender,
        text,
        chat_id,
        reply_to,
        timestamp,
        reply_snapshot,
    })
}

/// Parse one `getUpdates` entry; only `message` updates are delivered.
pub(crate) fn parse_update(update: &Value) -> Option<InboundMessage> {
    update.get("message").and_then(parse_message)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_update;

    #[test]
    fn parses_reply_with_snapshot() {
        let update = json!({
            "update_id": 10,
            "message": {
                "message_id": 42,
                "date": 1_700_000_000,
                "chat": {"id": -1001, "type": "supergroup"},
                "from": {"id": 7, "first_name": "Ann", "username": "ann"},
                "text": "why?",
                "reply_to_message": {
                    "message_id": 41,
                    "date": 1_699_999_990,
                    "chat": {"id": -1001, "type": "supergroup"},
                    "from": {"id": 99, "first_name": "Bot", "username": "chatter_bot", "is_bot": true},
                    "text": "hello there"
                }
            }
        });

        let message = parse_update(&update).expect("message should parse");
        assert_eq!(message.id, 42);
        assert_eq!(message.chat_id, -1001);
        assert_eq!(message.reply_to, Some(41));
        assert_eq!(message.sender.username.as_deref(), Some("ann"));
        let snapshot = message.reply_snapshot.expect("snapshot");
        assert_eq!(snapshot.sender.id, 99);
        assert_eq!(snapshot.text, "hello there");
    }

    #[test]
    fn skips_updates_without_text_or_caption() {
        let update = json!({
            "update_id": 11,
            "message": {
                "message_id": 43,
                "chat": {"id": -1001},
                "from": {"id": 7, "first_name": "Ann"},
                "sticker": {"file_id": "x"}
            }
        });
        assert!(parse_update(&update).is_none());
        assert!(parse_update(&json!({"update_id": 12, "edited_message": {}})).is_none());
    }

    #[test]
    fn caption_stands_in_for_text() {
        let update = json!({
            "update_id": 13,
            "message": {
                "message_id": 44,
                "chat": {"id": -1001},
                "from": {"id": 8, "first_name": "Bo", "last_name": "Li"},
                "caption": "look at this"
            }
        });
        let message = parse_update(&update).expect("message should parse");
        assert_eq!(message.text, "look at this");
        assert_eq!(message.sender.display_name, "Bo Li");
        assert_eq!(message.reply_to, None);
    }
}
