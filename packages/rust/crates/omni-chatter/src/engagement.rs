//! Engagement policy: decides whether and how the bot speaks for one message.
//!
//! The policy only reads its inputs. Randomness is injected so the decision is
//! reproducible under a seeded or degenerate probability.

use rand::Rng;

use crate::channels::{Identity, InboundMessage};
use crate::config::EngagementConfig;
use crate::predictor::Sentence;

/// Which slice of logged history seeds a spontaneous message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryContext {
    /// The last `n` logged messages, oldest first.
    Window(usize),
    /// Only the most recent logged message.
    Latest,
}

/// Why the policy chose to engage spontaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpontaneousTrigger {
    Chance,
    Mention,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngagementDecision {
    /// Reply to a message that answered the bot, seeded with `sentence`.
    DirectReply { sentence: Sentence },
    /// Post a new group message seeded from logged history.
    Spontaneous {
        context: HistoryContext,
        trigger: SpontaneousTrigger,
    },
    /// Log only.
    Ignore,
}

/// Everything the policy looks at for one inbound message.
#[derive(Debug, Clone, Copy)]
pub struct EngagementInput<'a> {
    pub message: &'a InboundMessage,
    /// The replied-to message, when `message` is a reply and it could be fetched.
    pub reply_target: Option<&'a InboundMessage>,
    pub own_identity: &'a Identity,
    /// Current spontaneous engagement probability.
    pub chance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementPolicy {
    /// Probability of seeding a direct reply with `[bot text, reply text]`.
    pub reply_context_chance: f64,
    /// Probability of seeding a spontaneous message with the history window.
    pub history_context_chance: f64,
    pub history_window: usize,
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self::from_config(&EngagementConfig::default())
    }
}

impl EngagementPolicy {
    pub fn from_config(config: &EngagementConfig) -> Self {
        Self {
            reply_context_chance: config.reply_context_chance,
            history_context_chance: config.history_context_chance,
            history_window: config.history_window.max(1),
        }
    }

    pub fn decide<R>(&self, input: &EngagementInput<'_>, rng: &mut R) -> EngagementDecision
    where
        R: Rng + ?Sized,
    {
        // A reply to the bot is always answered and never reaches the chance check.
        if let Some(target) = input.reply_target
            && target.sender.id == input.own_identity.id
        {
            let sentence = if rng.r#gen::<f64>() < self.reply_context_chance {
                Sentence::sequence([target.text.clone(), input.message.text.clone()])
            } else {
                Sentence::single(input.message.text.clone())
            };
            return EngagementDecision::DirectReply { sentence };
        }

        let trigger = if rng.r#gen::<f64>() < input.chance {
            Some(SpontaneousTrigger::Chance)
        } else if is_mention(&input.message.text, input.own_identity) {
            Some(SpontaneousTrigger::Mention)
        } else {
            None
        };
        let Some(trigger) = trigger else {
            return EngagementDecision::Ignore;
        };

        let context = if rng.r#gen::<f64>() < self.history_context_chance {
            HistoryContext::Window(self.history_window)
        } else {
            HistoryContext::Latest
        };
        EngagementDecision::Spontaneous { context, trigger }
    }
}

/// Whether `text` opens with `@<own username>`.
pub fn is_mention(text: &str, own_identity: &Identity) -> bool {
    own_identity
        .mention()
        .is_some_and(|mention| text.starts_with(&mention))
}
