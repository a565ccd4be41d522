//! Per-message entry point.
//!
//! Each inbound message is offered to the command dispatcher first; anything
//! it does not consume goes on to mention resolution. Failures stay with the
//! message that caused them, except a store that can no longer be used,
//! which raises the shutdown flag.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::common::error::StoreResult;
use crate::common::types::{MessageContext, SelfIdentity};
use crate::relay::commands::{CommandDispatcher, Dispatch};
use crate::relay::resolver::{NotificationResolver, NotifyOutcome};
use crate::relay::transport::ChatTransport;
use crate::store::RegistrationStore;

/// What the relay did with one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Own message or nothing to read.
    Ignored,
    /// Consumed as a command; `replied` is false if the reply was not delivered.
    Command { replied: bool },
    /// Passed through mention resolution.
    Mentions(NotifyOutcome),
}

/// Shared message-processing state, one per bot.
pub struct Relay {
    store: Arc<RegistrationStore>,
    commands: CommandDispatcher,
    resolver: NotificationResolver,
    identity: SelfIdentity,
    shutdown_tx: watch::Sender<bool>,
}

impl Relay {
    pub fn new(
        store: Arc<RegistrationStore>,
        identity: SelfIdentity,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            store,
            commands: CommandDispatcher::new(identity.username.clone()),
            resolver: NotificationResolver::new(),
            identity,
            shutdown_tx,
        }
    }

    pub fn identity(&self) -> &SelfIdentity {
        &self.identity
    }

    /// Process one message, logging rather than returning failures.
    pub async fn process<T>(&self, transport: &T, msg: &MessageContext)
    where
        T: ChatTransport + ?Sized,
    {
        match self.handle_message(transport, msg).await {
            Ok(outcome) => debug!(
                "Message {} in chat {}: {:?}",
                msg.message_id, msg.chat_id, outcome
            ),
            Err(e) if e.is_fatal() => {
                error!(
                    "Registration store unusable while processing message {} in chat {}: {}",
                    msg.message_id, msg.chat_id, e
                );
                if let Err(e) = self.shutdown_tx.send(true) {
                    debug!("Shutdown channel closed: {}", e);
                }
            }
            Err(e) => error!(
                "Failed to process message {} in chat {}: {}",
                msg.message_id, msg.chat_id, e
            ),
        }
    }

    /// Run one message through the dispatcher, then the resolver.
    pub async fn handle_message<T>(
        &self,
        transport: &T,
        msg: &MessageContext,
    ) -> StoreResult<MessageOutcome>
    where
        T: ChatTransport + ?Sized,
    {
        if msg.sender_id == Some(self.identity.user_id) || msg.text.trim().is_empty() {
            return Ok(MessageOutcome::Ignored);
        }

        match self.commands.dispatch(&self.store, msg)? {
            Dispatch::NotCommand => {}
            Dispatch::Reply(reply) => {
                let replied = match transport.send_message(reply.chat_id, &reply.text).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("Failed to reply in chat {}: {}", reply.chat_id, e);
                        false
                    }
                };
                return Ok(MessageOutcome::Command { replied });
            }
            Dispatch::NoReplyChannel(command) => {
                debug!(
                    "No private chat to answer /{} from chat {}",
                    command.name(),
                    msg.chat_id
                );
                return Ok(MessageOutcome::Command { replied: false });
            }
        }

        let outcome = self.resolver.notify(&self.store, transport, msg).await?;
        Ok(MessageOutcome::Mentions(outcome))
    }
}
