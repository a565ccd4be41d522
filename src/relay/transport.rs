//! Boundary between the relay and the chat platform.
//!
//! The relay only ever talks to the platform through [`ChatTransport`], so
//! the resolver and command handlers can be driven without a network.

use async_trait::async_trait;

use crate::common::error::TransportResult;
use crate::common::types::{ChatId, MemberStatus, SelfIdentity, UserId};

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a plain text message.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> TransportResult<()>;

    /// Forward `message_id` from `from_chat_id` to `to_chat_id`, keeping its
    /// original author attribution.
    async fn forward_message(
        &self,
        to_chat_id: ChatId,
        from_chat_id: ChatId,
        message_id: i32,
    ) -> TransportResult<()>;

    /// Membership status of `user_id` in `chat_id`.
    async fn get_chat_member(&self, chat_id: ChatId, user_id: UserId)
        -> TransportResult<MemberStatus>;

    /// The bot's own account.
    async fn get_self_identity(&self) -> TransportResult<SelfIdentity>;
}

#[cfg(test)]
pub mod mock {
    //! Recording transport for tests.

    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use teloxide::{ApiError, RequestError};

    use super::*;
    use crate::common::error::TransportError;

    /// A call the relay made on the transport.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Message { chat_id: ChatId, text: String },
        Forward { to: ChatId, from: ChatId, message_id: i32 },
    }

    #[derive(Default)]
    pub struct MockTransport {
        members: Mutex<HashMap<(ChatId, UserId), MemberStatus>>,
        unreachable: Mutex<HashSet<ChatId>>,
        sent: Mutex<Vec<Sent>>,
        membership_queries: Mutex<Vec<(ChatId, UserId)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_member(&self, chat_id: ChatId, user_id: UserId, status: MemberStatus) {
            self.members
                .lock()
                .unwrap()
                .insert((chat_id, user_id), status);
        }

        /// Make every delivery to `chat_id` fail.
        pub fn fail_deliveries_to(&self, chat_id: ChatId) {
            self.unreachable.lock().unwrap().insert(chat_id);
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }

        pub fn forwards(&self) -> Vec<Sent> {
            self.sent()
                .into_iter()
                .filter(|s| matches!(s, Sent::Forward { .. }))
                .collect()
        }

        pub fn messages(&self) -> Vec<(ChatId, String)> {
            self.sent()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Message { chat_id, text } => Some((chat_id, text)),
                    Sent::Forward { .. } => None,
                })
                .collect()
        }

        pub fn membership_queries(&self) -> Vec<(ChatId, UserId)> {
            self.membership_queries.lock().unwrap().clone()
        }

        fn deliver(&self, chat_id: ChatId, sent: Sent) -> TransportResult<()> {
            if self.unreachable.lock().unwrap().contains(&chat_id) {
                return Err(TransportError::Request(RequestError::Api(ApiError::BotBlocked)));
            }
            self.sent.lock().unwrap().push(sent);
            Ok(())
        }
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        async fn send_message(&self, chat_id: ChatId, text: &str) -> TransportResult<()> {
            self.deliver(
                chat_id,
                Sent::Message {
                    chat_id,
                    text: text.to_string(),
                },
            )
        }

        async fn forward_message(
            &self,
            to_chat_id: ChatId,
            from_chat_id: ChatId,
            message_id: i32,
        ) -> TransportResult<()> {
            self.deliver(
                to_chat_id,
                Sent::Forward {
                    to: to_chat_id,
                    from: from_chat_id,
                    message_id,
                },
            )
        }

        async fn get_chat_member(
            &self,
            chat_id: ChatId,
            user_id: UserId,
        ) -> TransportResult<MemberStatus> {
            self.membership_queries
                .lock()
                .unwrap()
                .push((chat_id, user_id));
            Ok(self
                .members
                .lock()
                .unwrap()
                .get(&(chat_id, user_id))
                .copied()
                .unwrap_or(MemberStatus::Left))
        }

        async fn get_self_identity(&self) -> TransportResult<SelfIdentity> {
            Ok(SelfIdentity {
                user_id: 999,
                username: "TagRelayBot".to_string(),
            })
        }
    }
}
