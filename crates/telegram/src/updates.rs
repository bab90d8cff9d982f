use serde::Deserialize;

/// Bot API `Update` object, reduced to the fields the bot consumes.
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Bot API `ChatMember`, used for the private-channel membership gate.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatMember {
    pub status: String,
}

impl ChatMember {
    pub fn counts_as_member(&self) -> bool {
        matches!(self.status.as_str(), "member" | "administrator" | "creator")
    }
}

/// One text turn of one conversation, the unit the dialog runtime consumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundTurn {
    pub chat_id: i64,
    pub user_id: i64,
    pub text: String,
}

impl InboundTurn {
    /// Updates without a text message (edits, stickers, joins) produce no
    /// turn and are skipped by the poller.
    pub fn from_update(update: &Update) -> Option<Self> {
        let message = update.message.as_ref()?;
        let text = message.text.as_deref()?.trim();
        if text.is_empty() {
            return None;
        }
        let user = message.from.as_ref()?;

        Some(Self { chat_id: message.chat.id, user_id: user.id, text: text.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatMember, InboundTurn, Update};

    #[test]
    fn text_message_updates_become_turns() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 101,
                "message": {
                    "message_id": 5,
                    "from": {"id": 42, "username": "dispatcher"},
                    "chat": {"id": 7},
                    "text": "  MC 123456  "
                }
            }"#,
        )
        .expect("update should deserialize");

        let turn = InboundTurn::from_update(&update).expect("turn should be extracted");
        assert_eq!(turn, InboundTurn { chat_id: 7, user_id: 42, text: "MC 123456".to_string() });
    }

    #[test]
    fn non_text_updates_are_skipped() {
        let update: Update = serde_json::from_str(
            r#"{"update_id": 102, "message": {"message_id": 6, "chat": {"id": 7}}}"#,
        )
        .expect("update should deserialize");

        assert_eq!(InboundTurn::from_update(&update), None);
    }

    #[test]
    fn membership_statuses_match_the_gate_policy() {
        for (status, expected) in [
            ("member", true),
            ("administrator", true),
            ("creator", true),
            ("left", false),
            ("kicked", false),
            ("restricted", false),
        ] {
            let member = ChatMember { status: status.to_string() };
            assert_eq!(member.counts_as_member(), expected, "status {status}");
        }
    }
}
