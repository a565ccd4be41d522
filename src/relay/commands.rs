//! Bot commands (/register, /delete, /start, /help, /opensource).
//!
//! Registration commands only act in a private chat with the bot, since that
//! chat is where notifications get delivered. Every handled command produces
//! exactly one reply, addressed to the sender's private chat.

use tracing::{debug, info};

use crate::common::error::StoreResult;
use crate::common::types::{ChatId, MessageContext};
use crate::store::RegistrationStore;

/// Commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    OpenSource,
    Register,
    Delete,
}

/// A command handler: reads the message, may mutate the store, returns the
/// reply text.
pub type CommandFn = fn(&RegistrationStore, &MessageContext) -> StoreResult<String>;

/// Command name to handler table.
const COMMANDS: &[(&str, Command, CommandFn)] = &[
    ("start", Command::Start, handle_start),
    ("help", Command::Help, handle_help),
    ("opensource", Command::OpenSource, handle_opensource),
    ("register", Command::Register, handle_register),
    ("delete", Command::Delete, handle_delete),
];

impl Command {
    /// Parse the command at the start of `text`.
    ///
    /// `/cmd@name` is only ours when `name` is `bot_username`; commands meant
    /// for other bots and unknown commands return `None`.
    pub fn parse(text: &str, bot_username: &str) -> Option<Self> {
        let token = text.split_whitespace().next()?.strip_prefix('/')?;

        let name = match token.split_once('@') {
            Some((name, target)) => {
                if !target.eq_ignore_ascii_case(bot_username) {
                    return None;
                }
                name
            }
            None => token,
        };

        COMMANDS
            .iter()
            .find(|(command_name, _, _)| command_name.eq_ignore_ascii_case(name))
            .map(|(_, command, _)| *command)
    }

    pub fn name(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|(_, command, _)| *command == self)
            .map(|(name, _, _)| *name)
            .unwrap_or_default()
    }

    fn handler(self) -> CommandFn {
        COMMANDS
            .iter()
            .find(|(_, command, _)| *command == self)
            .map(|(_, _, handler)| *handler)
            .unwrap_or(handle_help)
    }
}

/// A reply to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub chat_id: ChatId,
    pub text: String,
}

/// Result of offering a message to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Not a command for this bot; the message continues to mention handling.
    NotCommand,
    /// Command handled; send this reply.
    Reply(Reply),
    /// Command handled, but the sender has no private chat to reply to
    /// (anonymous group admins, channel posts).
    NoReplyChannel(Command),
}

/// Maps command messages to store mutations and replies.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    bot_username: String,
}

impl CommandDispatcher {
    pub fn new(bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
        }
    }

    pub fn dispatch(&self, store: &RegistrationStore, msg: &MessageContext) -> StoreResult<Dispatch> {
        let Some(command) = Command::parse(&msg.text, &self.bot_username) else {
            return Ok(Dispatch::NotCommand);
        };

        debug!(
            "/{} from {:?} in {} chat {}",
            command.name(),
            msg.sender_id,
            msg.chat_kind,
            msg.chat_id
        );

        let text = (command.handler())(store, msg)?;

        Ok(match msg.private_reply_chat() {
            Some(chat_id) => Dispatch::Reply(Reply { chat_id, text }),
            None => Dispatch::NoReplyChannel(command),
        })
    }
}

fn handle_start(_store: &RegistrationStore, msg: &MessageContext) -> StoreResult<String> {
    let private = msg.chat_kind.is_private();
    Ok(match (private, msg.sender_handle()) {
        (true, Some(handle)) => texts::start_private(handle),
        (true, None) => texts::START_PRIVATE_NO_HANDLE.to_string(),
        (false, Some(handle)) => texts::start_group(handle),
        (false, None) => texts::START_GROUP_NO_HANDLE.to_string(),
    })
}

fn handle_help(_store: &RegistrationStore, _msg: &MessageContext) -> StoreResult<String> {
    Ok(texts::HELP.to_string())
}

fn handle_opensource(_store: &RegistrationStore, _msg: &MessageContext) -> StoreResult<String> {
    Ok(texts::opensource())
}

fn handle_register(store: &RegistrationStore, msg: &MessageContext) -> StoreResult<String> {
    if !msg.chat_kind.is_private() {
        return Ok(texts::PRIVATE_ONLY.to_string());
    }

    let Some(handle) = msg.sender_handle() else {
        return Ok(texts::REGISTER_NO_HANDLE.to_string());
    };
    let user_id = msg.sender_id.unwrap_or_default();
    let previous = store.find_by_chat_id(msg.chat_id)?;

    if store.upsert(user_id, msg.chat_id, handle)? {
        match previous {
            Some(old) if old.handle != handle => info!(
                "Chat {} changed handle from @{} to @{}",
                msg.chat_id, old.handle, handle
            ),
            Some(_) => debug!("Chat {} re-registered @{}", msg.chat_id, handle),
            None => info!("Registered @{} (user {}) for chat {}", handle, user_id, msg.chat_id),
        }
        Ok(texts::registered(handle))
    } else {
        Ok(texts::REGISTER_REJECTED.to_string())
    }
}

fn handle_delete(store: &RegistrationStore, msg: &MessageContext) -> StoreResult<String> {
    if !msg.chat_kind.is_private() {
        return Ok(texts::PRIVATE_ONLY.to_string());
    }

    if store.delete(msg.chat_id)? {
        info!("Deleted registration for chat {}", msg.chat_id);
        Ok(texts::DELETED.to_string())
    } else {
        Ok(texts::NOT_REGISTERED.to_string())
    }
}

/// Reply templates.
pub mod texts {
    pub const PRIVATE_ONLY: &str =
        "Please message me privately to manage your registration, not in a group.";

    pub const START_PRIVATE_NO_HANDLE: &str = "Hi! I forward group messages that mention you. \
         You need a Telegram username for that: set one in your settings, then send /register.";

    pub const START_GROUP_NO_HANDLE: &str = "Hi! To get notified of mentions you need a Telegram \
         username. Set one, then message me privately and send /register.";

    pub const REGISTER_NO_HANDLE: &str = "You have no Telegram username yet. \
         Set one in your settings, then send /register again.";

    pub const REGISTER_REJECTED: &str = "Sorry, I could not register you. Please try again.";

    pub const DELETED: &str =
        "Your registration was removed. You will no longer receive mention notifications.";

    pub const NOT_REGISTERED: &str = "You were not registered, so there was nothing to delete.";

    pub const HELP: &str = "I forward group messages that mention your @username to this chat.\n\n\
         /register - get notified when someone mentions you\n\
         /delete - stop notifications\n\
         /start - introduction\n\
         /opensource - where to find my source code\n\
         /help - show this message\n\n\
         You only get messages from groups you are a member of.";

    const SOURCE_URL: &str = env!("CARGO_PKG_REPOSITORY");

    pub fn start_private(handle: &str) -> String {
        format!(
            "Hi @{}! I forward group messages that mention you. \
             Send /register to start, /help for more.",
            handle
        )
    }

    pub fn start_group(handle: &str) -> String {
        format!(
            "Hi @{}! Message me privately and send /register to get notified when someone mentions you.",
            handle
        )
    }

    pub fn registered(handle: &str) -> String {
        format!(
            "Done! I will forward group messages mentioning @{} to this chat. Send /delete to stop.",
            handle
        )
    }

    pub fn opensource() -> String {
        let mut text = format!(
            "{} {} is open source software.",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
        if !SOURCE_URL.is_empty() {
            text.push_str(" Source: ");
            text.push_str(SOURCE_URL);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::ChatKind;

    const BOT: &str = "TagRelayBot";

    fn private_message(text: &str) -> MessageContext {
        MessageContext {
            message_id: 1,
            chat_id: 100,
            chat_kind: ChatKind::Private,
            sender_id: Some(1),
            sender_handle: Some("alice".to_string()),
            text: text.to_string(),
        }
    }

    fn group_message(text: &str) -> MessageContext {
        MessageContext {
            chat_id: -500,
            chat_kind: ChatKind::Group,
            ..private_message(text)
        }
    }

    fn reply(dispatch: Dispatch) -> Reply {
        match dispatch {
            Dispatch::Reply(reply) => reply,
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/register", BOT), Some(Command::Register));
        assert_eq!(Command::parse("/DELETE now", BOT), Some(Command::Delete));
        assert_eq!(Command::parse("  /help", BOT), Some(Command::Help));
        assert_eq!(Command::parse("/opensource", BOT), Some(Command::OpenSource));
        assert_eq!(Command::parse("/start@tagrelaybot", BOT), Some(Command::Start));
    }

    #[test]
    fn test_parse_rejects_non_commands() {
        assert_eq!(Command::parse("", BOT), None);
        assert_eq!(Command::parse("hello @alice", BOT), None);
        assert_eq!(Command::parse("/unknown", BOT), None);
        assert_eq!(Command::parse("say /register", BOT), None);
        assert_eq!(Command::parse("/register@OtherBot", BOT), None);
    }

    #[test]
    fn test_names_round_trip() {
        for (name, command, _) in COMMANDS {
            assert_eq!(command.name(), *name);
            assert_eq!(Command::parse(&format!("/{}", name), BOT), Some(*command));
        }
    }

    #[test]
    fn test_register_in_private_chat() {
        let store = RegistrationStore::open_in_memory().unwrap();
        let dispatcher = CommandDispatcher::new(BOT);

        let reply = reply(dispatcher.dispatch(&store, &private_message("/register")).unwrap());

        assert_eq!(reply.chat_id, 100);
        assert!(reply.text.contains("@alice"));
        assert_eq!(store.find_chat_id_by_handle("alice").unwrap(), Some(100));
        assert_eq!(store.find_user_id_by_chat_id(100).unwrap(), Some(1));
    }

    #[test]
    fn test_register_without_handle() {
        let store = RegistrationStore::open_in_memory().unwrap();
        let dispatcher = CommandDispatcher::new(BOT);
        let mut msg = private_message("/register");
        msg.sender_handle = None;

        let reply = reply(dispatcher.dispatch(&store, &msg).unwrap());

        assert_eq!(reply.text, texts::REGISTER_NO_HANDLE);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_register_rejected_by_store() {
        let store = RegistrationStore::open_in_memory().unwrap();
        let dispatcher = CommandDispatcher::new(BOT);
        let mut msg = private_message("/register");
        msg.sender_id = None;

        let reply = reply(dispatcher.dispatch(&store, &msg).unwrap());

        assert_eq!(reply.text, texts::REGISTER_REJECTED);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_register_from_group_is_refused() {
        let store = RegistrationStore::open_in_memory().unwrap();
        let dispatcher = CommandDispatcher::new(BOT);

        let reply = reply(dispatcher.dispatch(&store, &group_message("/register")).unwrap());

        assert_eq!(reply.text, texts::PRIVATE_ONLY);
        // Replies from groups go to the sender's private chat.
        assert_eq!(reply.chat_id, 1);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_delete_registered() {
        let store = RegistrationStore::open_in_memory().unwrap();
        store.upsert(1, 100, "alice").unwrap();
        let dispatcher = CommandDispatcher::new(BOT);

        let reply = reply(dispatcher.dispatch(&store, &private_message("/delete")).unwrap());

        assert_eq!(reply.text, texts::DELETED);
        assert_eq!(store.find_user_id_by_chat_id(100).unwrap(), None);
    }

    #[test]
    fn test_delete_unregistered() {
        let store = RegistrationStore::open_in_memory().unwrap();
        store.upsert(2, 200, "bob").unwrap();
        let dispatcher = CommandDispatcher::new(BOT);

        let reply = reply(dispatcher.dispatch(&store, &private_message("/delete")).unwrap());

        assert_eq!(reply.text, texts::NOT_REGISTERED);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_delete_from_group_is_refused() {
        let store = RegistrationStore::open_in_memory().unwrap();
        store.upsert(1, 100, "alice").unwrap();
        let dispatcher = CommandDispatcher::new(BOT);

        let reply = reply(dispatcher.dispatch(&store, &group_message("/delete")).unwrap());

        assert_eq!(reply.text, texts::PRIVATE_ONLY);
        assert_eq!(store.find_user_id_by_chat_id(100).unwrap(), Some(1));
    }

    #[test]
    fn test_start_branches() {
        let store = RegistrationStore::open_in_memory().unwrap();
        let dispatcher = CommandDispatcher::new(BOT);

        let private = reply(dispatcher.dispatch(&store, &private_message("/start")).unwrap());
        assert!(private.text.contains("@alice"));
        assert!(private.text.contains("/register"));

        let mut no_handle = private_message("/start");
        no_handle.sender_handle = None;
        let private_no_handle = reply(dispatcher.dispatch(&store, &no_handle).unwrap());
        assert_eq!(private_no_handle.text, texts::START_PRIVATE_NO_HANDLE);

        let group = reply(dispatcher.dispatch(&store, &group_message("/start")).unwrap());
        assert!(group.text.contains("privately"));
        assert!(group.text.contains("@alice"));

        let mut group_no_handle = group_message("/start");
        group_no_handle.sender_handle = None;
        let group_no_handle = reply(dispatcher.dispatch(&store, &group_no_handle).unwrap());
        assert_eq!(group_no_handle.text, texts::START_GROUP_NO_HANDLE);
    }

    #[test]
    fn test_informational_commands_leave_store_alone() {
        let store = RegistrationStore::open_in_memory().unwrap();
        let dispatcher = CommandDispatcher::new(BOT);

        let help = reply(dispatcher.dispatch(&store, &private_message("/help")).unwrap());
        assert_eq!(help.text, texts::HELP);

        let source = reply(dispatcher.dispatch(&store, &private_message("/opensource")).unwrap());
        assert!(source.text.contains(env!("CARGO_PKG_VERSION")));
        assert!(source.text.contains("https://github.com/tagrelay/tagrelay"));

        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_anonymous_group_command_has_no_reply_channel() {
        let store = RegistrationStore::open_in_memory().unwrap();
        let dispatcher = CommandDispatcher::new(BOT);
        let mut msg = group_message("/help");
        msg.sender_id = None;

        assert_eq!(
            dispatcher.dispatch(&store, &msg).unwrap(),
            Dispatch::NoReplyChannel(Command::Help)
        );
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        let store = RegistrationStore::open_in_memory().unwrap();
        let dispatcher = CommandDispatcher::new(BOT);

        assert_eq!(
            dispatcher.dispatch(&store, &group_message("hello @alice")).unwrap(),
            Dispatch::NotCommand
        );
    }
}
