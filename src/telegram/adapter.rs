//! teloxide-backed [`ChatTransport`].
//!
//! All teloxide message and id shapes stay in this file; the relay only sees
//! [`MessageContext`] and plain integer ids.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberStatus, MessageId, UserId as TelegramUserId};
use tracing::debug;

use crate::common::error::TransportResult;
use crate::common::types::{
    ChatId as RelayChatId, ChatKind, MemberStatus, MessageContext, SelfIdentity,
    UserId as RelayUserId,
};
use crate::relay::ChatTransport;

/// Transport over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat_id: RelayChatId, text: &str) -> TransportResult<()> {
        self.bot.send_message(ChatId(chat_id), text).await?;
        Ok(())
    }

    async fn forward_message(
        &self,
        to_chat_id: RelayChatId,
        from_chat_id: RelayChatId,
        message_id: i32,
    ) -> TransportResult<()> {
        self.bot
            .forward_message(ChatId(to_chat_id), ChatId(from_chat_id), MessageId(message_id))
            .await?;
        Ok(())
    }

    async fn get_chat_member(
        &self,
        chat_id: RelayChatId,
        user_id: RelayUserId,
    ) -> TransportResult<MemberStatus> {
        let Ok(user_id) = u64::try_from(user_id) else {
            debug!("User id {} cannot belong to a Telegram account", user_id);
            return Ok(MemberStatus::Unknown);
        };

        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), TelegramUserId(user_id))
            .await?;
        Ok(member_status(member.kind.status()))
    }

    async fn get_self_identity(&self) -> TransportResult<SelfIdentity> {
        let me = self.bot.get_me().await?;
        Ok(SelfIdentity {
            user_id: me.id.0 as RelayUserId,
            username: me.username.clone().unwrap_or_default(),
        })
    }
}

/// Map Telegram's member status onto the relay's.
#[allow(unreachable_patterns)]
pub fn member_status(status: ChatMemberStatus) -> MemberStatus {
    match status {
        ChatMemberStatus::Owner => MemberStatus::Creator,
        ChatMemberStatus::Administrator => MemberStatus::Administrator,
        ChatMemberStatus::Member => MemberStatus::Member,
        ChatMemberStatus::Restricted => MemberStatus::Restricted,
        ChatMemberStatus::Left => MemberStatus::Left,
        ChatMemberStatus::Banned => MemberStatus::Kicked,
        _ => MemberStatus::Unknown,
    }
}

/// Extract the fields the relay reads from a Telegram message.
pub fn message_context(msg: &Message) -> MessageContext {
    let chat_kind = if msg.chat.is_private() {
        ChatKind::Private
    } else if msg.chat.is_supergroup() {
        ChatKind::Supergroup
    } else if msg.chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Group
    };

    // Media messages carry their text as a caption.
    let text = msg.text().or_else(|| msg.caption()).unwrap_or_default();

    MessageContext {
        message_id: msg.id.0,
        chat_id: msg.chat.id.0,
        chat_kind,
        sender_id: msg.from.as_ref().map(|user| user.id.0 as RelayUserId),
        sender_handle: msg.from.as_ref().and_then(|user| user.username.clone()),
        text: text.to_string(),
    }
}
