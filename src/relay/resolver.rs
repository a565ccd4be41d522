//! Mention resolution and notification.
//!
//! For each handle mentioned in a group message, looks up who registered it,
//! checks that they belong to the group, and forwards the message to their
//! private chat.

use tracing::{debug, info, warn};

use crate::common::error::StoreResult;
use crate::common::types::{MemberStatus, MessageContext};
use crate::relay::mentions::MentionExtractor;
use crate::relay::transport::ChatTransport;
use crate::store::RegistrationStore;

/// What happened to the mentions of one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyOutcome {
    /// Forwards handed to the transport successfully.
    pub forwarded: usize,
    /// Candidates dropped by lookup or eligibility checks.
    pub skipped: usize,
    /// Eligible forwards the transport failed to deliver.
    pub failed: usize,
}

/// Resolves mentions to registered users and forwards the message to them.
#[derive(Debug, Clone, Default)]
pub struct NotificationResolver {
    extractor: MentionExtractor,
}

impl NotificationResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every eligible user mentioned in `msg`.
    ///
    /// Candidates are handled in mention order and a handle mentioned twice
    /// is forwarded twice. Lookup misses and ineligible members are skipped
    /// silently; transport failures are logged and not retried. Only store
    /// failures abort the message.
    pub async fn notify<T>(
        &self,
        store: &RegistrationStore,
        transport: &T,
        msg: &MessageContext,
    ) -> StoreResult<NotifyOutcome>
    where
        T: ChatTransport + ?Sized,
    {
        let mut outcome = NotifyOutcome::default();

        if msg.chat_kind.is_private() {
            debug!("Ignoring mentions in private chat {}", msg.chat_id);
            return Ok(outcome);
        }

        for candidate in self.extractor.extract(&msg.text) {
            let Some(target_chat_id) = store.find_chat_id_by_handle(candidate)? else {
                debug!("No registration for @{}", candidate);
                outcome.skipped += 1;
                continue;
            };

            let Some(target_user_id) = store.find_user_id_by_chat_id(target_chat_id)? else {
                debug!("Registration for @{} vanished during lookup", candidate);
                outcome.skipped += 1;
                continue;
            };

            let status = match transport.get_chat_member(msg.chat_id, target_user_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(
                        "Membership check for user {} in chat {} failed: {}",
                        target_user_id, msg.chat_id, e
                    );
                    MemberStatus::Unknown
                }
            };

            if !status.is_eligible() {
                debug!(
                    "Not notifying @{}: status {:?} in chat {}",
                    candidate, status, msg.chat_id
                );
                outcome.skipped += 1;
                continue;
            }

            match transport
                .forward_message(target_chat_id, msg.chat_id, msg.message_id)
                .await
            {
                Ok(()) => {
                    info!(
                        "Forwarded message {} from chat {} to @{} (chat {})",
                        msg.message_id, msg.chat_id, candidate, target_chat_id
                    );
                    outcome.forwarded += 1;
                }
                Err(e) => {
                    warn!(
                        "Failed to forward message {} to chat {}: {}",
                        msg.message_id, target_chat_id, e
                    );
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }
}
