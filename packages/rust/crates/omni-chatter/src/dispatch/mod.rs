//! Inbound event dispatch.

mod blame;
mod context;
mod engage;
mod router;

pub use blame::{BlameHandler, BlameOutcome, LOG_ROTATED_NOTICE};
pub use context::{BotContext, Collaborators, StartupState};
pub use engage::EngagementHandler;
pub use router::{BLAME_COMMAND, DispatchOutcome, EventHandler, EventKind, EventRouter};
