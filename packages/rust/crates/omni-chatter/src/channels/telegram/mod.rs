//! Telegram Bot API transport.

mod client;
mod constants;
mod error;
mod listen;
mod parsing;
mod transport;

pub use constants::TELEGRAM_DEFAULT_API_BASE;
pub(crate) use parsing::parse_update;
pub use transport::TelegramTransport;
