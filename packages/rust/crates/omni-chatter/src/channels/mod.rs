//! Chat channels: transport contract, typing presence, Telegram Bot API adapter.

mod telegram;
mod traits;
mod typing;

pub(crate) use telegram::parse_update;
pub use telegram::{TELEGRAM_DEFAULT_API_BASE, TelegramTransport};
pub use traits::{ChatId, ChatTransport, GroupHandle, Identity, InboundMessage, MessageId};
pub use typing::{TYPING_REFRESH_INTERVAL, TypingGuard};
