#![allow(missing_docs)]

mod support;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use omni_chatter::{
    BotContext, DispatchOutcome, EventHandler, EventKind, EventRouter, InboundMessage,
    MessageLogger, Sentence,
};
use serde_json::json;

use support::{
    GROUP_CHAT_ID, Harness, OTHER_CHAT_ID, bot_identity, engagement, group_message,
    human, reply_message,
};

#[tokio::test]
async fn messages_outside_target_group_never_reach_logging_or_engagement() -> Result<()> {
    let harness = Harness::new(engagement(1.0, 1.0, 1.0));
    harness.bot_said(400, "bot line");
    harness.ctx.responses().put(400, json!("cached"));

    let shapes = [
        group_message(1, human(7, "ann"), "plain chatter"),
        group_message(2, human(7, "ann"), "@chatter_bot hello"),
        group_message(3, human(7, "ann"), "/blame"),
        reply_message(4, human(7, "ann"), "/blame", 400),
        reply_message(5, human(7, "ann"), "answering the bot", 400),
        group_message(6, bot_identity(), "echo of myself"),
        group_message(7, human(7, "ann"), ""),
    ];
    let router = EventRouter::standard();
    for mut message in shapes {
        message.chat_id = OTHER_CHAT_ID;
        assert_eq!(
            router.dispatch(&harness.ctx, &message).await,
            DispatchOutcome::Filtered
        );
    }

    assert!(harness.logger.is_empty());
    assert!(harness.transport.sent().is_empty());
    assert!(harness.predictor.calls().is_empty());
    assert_eq!(harness.transport.typing_stopped(), 0);
    Ok(())
}

#[tokio::test]
async fn zero_chance_plain_message_is_only_logged() -> Result<()> {
    let harness = Harness::new(engagement(0.0, 0.5, 0.5));
    let message = group_message(20, human(7, "ann"), "nothing to see");

    let outcome = EventRouter::standard().dispatch(&harness.ctx, &message).await;

    assert_eq!(outcome, DispatchOutcome::Handled(EventKind::Message));
    assert!(harness.predictor.calls().is_empty());
    assert!(harness.transport.sent().is_empty());
    assert!(harness.ctx.responses().is_empty());
    let logged: Vec<i64> = harness
        .logger
        .last_messages(5)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(logged, vec![20]);
    Ok(())
}

#[tokio::test]
async fn reply_to_bot_takes_direct_reply_path_only() -> Result<()> {
    let harness = Harness::new(engagement(1.0, 1.0, 1.0));
    harness.bot_said(700, "I like turtles");
    harness
        .predictor
        .push_prediction("me too", json!({"seq2seq": {"text": "me too"}}));

    let message = reply_message(21, human(7, "ann"), "@chatter_bot why turtles", 700);
    EventRouter::standard().dispatch(&harness.ctx, &message).await;

    assert_eq!(
        harness.predictor.calls(),
        vec![Sentence::sequence(["I like turtles", "@chatter_bot why turtles"])]
    );
    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 1, "spontaneous branch must not fire as well");
    assert_eq!(sent[0].reply_to, Some(21));
    assert_eq!(sent[0].text, "me too");
    assert_eq!(
        harness.ctx.responses().get(sent[0].id),
        Some(json!({"seq2seq": {"text": "me too"}}))
    );
    Ok(())
}

#[tokio::test]
async fn direct_reply_without_context_uses_reply_text_only() -> Result<()> {
    let harness = Harness::new(engagement(0.0, 0.0, 0.0));
    harness.bot_said(701, "ask me anything");

    let message = reply_message(22, human(7, "ann"), "what time is it", 701);
    EventRouter::standard().dispatch(&harness.ctx, &message).await;

    assert_eq!(
        harness.predictor.calls(),
        vec![Sentence::single("what time is it")]
    );
    assert_eq!(harness.transport.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn spontaneous_message_uses_history_window_oldest_first() -> Result<()> {
    let harness = Harness::new(engagement(1.0, 0.0, 1.0));
    for (id, text) in [(30, "one"), (31, "two"), (32, "three")] {
        harness
            .logger
            .log(&group_message(id, human(8, "bob"), text))
            .await?;
    }

    let message = group_message(33, human(7, "ann"), "four");
    EventRouter::standard().dispatch(&harness.ctx, &message).await;

    assert_eq!(
        harness.predictor.calls(),
        vec![Sentence::sequence(["one", "two", "three", "four"])]
    );
    let sent = harness.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].reply_to, None);
    assert_eq!(sent[0].chat_id, GROUP_CHAT_ID);
    assert!(harness.ctx.responses().get(sent[0].id).is_some());
    Ok(())
}

#[tokio::test]
async fn mention_with_zero_chance_uses_latest_message() -> Result<()> {
    let harness = Harness::new(engagement(0.0, 0.0, 0.0));

    let message = group_message(40, human(7, "ann"), "@chatter_bot say hi");
    EventRouter::standard().dispatch(&harness.ctx, &message).await;

    assert_eq!(
        harness.predictor.calls(),
        vec![Sentence::single("@chatter_bot say hi")]
    );
    assert_eq!(harness.transport.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn predictor_failure_drops_event_after_logging() -> Result<()> {
    let harness = Harness::new(engagement(1.0, 0.5, 0.5));
    harness.predictor.push_prediction_failure("backend down");

    let message = group_message(50, human(7, "ann"), "hello?");
    let outcome = EventRouter::standard().dispatch(&harness.ctx, &message).await;

    assert_eq!(outcome, DispatchOutcome::Handled(EventKind::Message));
    assert_eq!(harness.predictor.calls().len(), 1);
    assert!(harness.transport.sent().is_empty());
    assert!(harness.ctx.responses().is_empty());
    assert_eq!(harness.logger.last_message().await?.map(|m| m.id), Some(50));
    assert_eq!(
        harness.transport.typing_stopped(),
        1,
        "typing indicator released on failure"
    );

    let next = group_message(51, human(7, "ann"), "anyone?");
    EventRouter::standard().dispatch(&harness.ctx, &next).await;
    assert_eq!(harness.transport.sent().len(), 1, "next event handled normally");
    Ok(())
}

#[tokio::test]
async fn failed_send_leaves_cache_untouched() -> Result<()> {
    let harness = Harness::new(engagement(1.0, 0.5, 0.5));
    harness.transport.fail_sends(true);

    let message = group_message(60, human(7, "ann"), "talk to me");
    EventRouter::standard().dispatch(&harness.ctx, &message).await;

    assert_eq!(harness.predictor.calls().len(), 1);
    assert!(harness.ctx.responses().is_empty());
    Ok(())
}

#[tokio::test]
async fn no_cache_write_after_shutdown_began() -> Result<()> {
    let harness = Harness::new(engagement(1.0, 0.5, 0.5));
    harness.ctx.begin_shutdown();

    let message = group_message(70, human(7, "ann"), "late message");
    EventRouter::standard().dispatch(&harness.ctx, &message).await;

    assert!(harness.ctx.responses().is_closed());
    assert!(harness.ctx.responses().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn prediction_in_flight_at_shutdown_is_abandoned() -> Result<()> {
    let harness = Harness::new(engagement(1.0, 0.5, 0.5));
    harness.predictor.set_delay(Duration::from_secs(60));

    let ctx = Arc::clone(&harness.ctx);
    let message = group_message(71, human(7, "ann"), "slow backend");
    let dispatch = tokio::spawn(async move {
        EventRouter::standard().dispatch(&ctx, &message).await
    });

    while harness.predictor.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    harness.ctx.begin_shutdown();

    assert_eq!(dispatch.await?, DispatchOutcome::Handled(EventKind::Message));
    assert!(harness.transport.sent().is_empty());
    assert!(harness.ctx.responses().is_empty());
    assert!(harness.ctx.responses().last().is_none());
    Ok(())
}

#[tokio::test]
async fn chance_is_tunable_and_clamped() -> Result<()> {
    let harness = Harness::new(engagement(0.0, 0.0, 0.0));
    assert_eq!(harness.ctx.set_chance(2.5), 0.0);
    assert_eq!(harness.ctx.chance(), 1.0);

    let message = group_message(80, human(7, "ann"), "now you talk");
    EventRouter::standard().dispatch(&harness.ctx, &message).await;
    assert_eq!(harness.transport.sent().len(), 1);

    harness.ctx.set_chance(-1.0);
    assert_eq!(harness.ctx.chance(), 0.0);
    Ok(())
}

struct FailingHandler;

#[async_trait]
impl EventHandler for FailingHandler {
    async fn handle(&self, _ctx: &BotContext, message: &InboundMessage) -> anyhow::Result<()> {
        anyhow::bail!("handler exploded on {}", message.id)
    }
}

#[tokio::test]
async fn handler_failure_is_isolated_per_event() -> Result<()> {
    let harness = Harness::new(engagement(0.0, 0.0, 0.0));
    let mut router = EventRouter::new();
    router.register(EventKind::Message, Arc::new(FailingHandler));

    let first = group_message(90, human(7, "ann"), "first");
    let second = group_message(91, human(7, "ann"), "/blame");
    assert_eq!(
        router.dispatch(&harness.ctx, &first).await,
        DispatchOutcome::Failed(EventKind::Message)
    );
    assert_eq!(
        router.dispatch(&harness.ctx, &second).await,
        DispatchOutcome::Unhandled(EventKind::Blame)
    );
    assert_eq!(harness.logger.len(), 2);
    Ok(())
}
