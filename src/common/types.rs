//! Shared types used across the application.

/// Identity of a conversation (private chat, group or supergroup).
pub type ChatId = i64;

/// Identity of a user account.
pub type UserId = i64;

/// Kind of conversation a message was posted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one conversation between a user and the bot.
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
            Self::Supergroup => "supergroup",
            Self::Channel => "channel",
        }
    }
}

impl std::fmt::Display for ChatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Membership status of a user in a chat, as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    /// The status could not be determined.
    Unknown,
}

impl MemberStatus {
    /// Whether a member with this status receives mention notifications.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

/// The fields of an inbound message the relay reads.
///
/// The transport adapter populates this from whatever shape its bot library
/// uses, so nothing past the adapter depends on that library.
#[derive(Debug, Clone)]
pub struct MessageContext {
    /// Transport message id, needed to forward the original message.
    pub message_id: i32,
    /// Chat the message was posted in.
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    /// Sender's user id, `None` for anonymous or channel posts.
    pub sender_id: Option<UserId>,
    /// Sender's `@`-less username, if they have one.
    pub sender_handle: Option<String>,
    /// Message text or media caption, empty when there is neither.
    pub text: String,
}

impl MessageContext {
    /// The sender's handle, treating an empty string as unset.
    pub fn sender_handle(&self) -> Option<&str> {
        self.sender_handle.as_deref().filter(|h| !h.is_empty())
    }

    /// Where replies to this message's sender should go.
    ///
    /// Private chats reply in place. From groups the reply goes to the
    /// sender's own private chat, whose id equals their user id.
    pub fn private_reply_chat(&self) -> Option<ChatId> {
        if self.chat_kind.is_private() {
            Some(self.chat_id)
        } else {
            self.sender_id
        }
    }
}

/// The bot's own account, used to recognize `/command@botname` and to skip
/// relaying its own messages.
#[derive(Debug, Clone)]
pub struct SelfIdentity {
    pub user_id: UserId,
    pub username: String,
}
