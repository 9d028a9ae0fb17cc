#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio_util::sync::CancellationToken;

use omni_chatter::test_support::{FakePredictor, RecordingUploader, ScriptedTransport};
use omni_chatter::{
    BotContext, Collaborators, EngagementConfig, GroupHandle, Identity, InboundMessage,
    MemoryMessageLog, MessageId, StartupState,
};

pub const GROUP_CHAT_ID: i64 = -100_500;
pub const OTHER_CHAT_ID: i64 = -100_777;
pub const BOT_ID: i64 = 99;

pub fn bot_identity() -> Identity {
    Identity {
        id: BOT_ID,
        username: Some("chatter_bot".to_string()),
        display_name: "Chatter".to_string(),
    }
}

pub fn human(id: i64, username: &str) -> Identity {
    Identity {
        id,
        username: Some(username.to_string()),
        display_name: username.to_string(),
    }
}

pub fn group() -> GroupHandle {
    GroupHandle {
        chat_id: GROUP_CHAT_ID,
        title: Some("tea room".to_string()),
    }
}

pub fn group_message(id: MessageId, sender: Identity, text: &str) -> InboundMessage {
    InboundMessage {
        id,
        sender,
        text: text.to_string(),
        chat_id: GROUP_CHAT_ID,
        reply_to: None,
        timestamp: 1_700_000_000 + id,
        reply_snapshot: None,
    }
}

pub fn reply_message(
    id: MessageId,
    sender: Identity,
    text: &str,
    reply_to: MessageId,
) -> InboundMessage {
    InboundMessage {
        reply_to: Some(reply_to),
        ..group_message(id, sender, text)
    }
}

/// Engagement config with explicit probabilities and a small cache.
pub fn engagement(
    chance: f64,
    reply_context_chance: f64,
    history_context_chance: f64,
) -> EngagementConfig {
    EngagementConfig {
        chance,
        reply_context_chance,
        history_context_chance,
        history_window: 5,
        history_capacity: 100,
        response_cache_capacity: 4,
    }
}

/// Fakes plus a context built on top of them.
pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub predictor: Arc<FakePredictor>,
    pub logger: Arc<MemoryMessageLog>,
    pub uploader: Arc<RecordingUploader>,
    pub ctx: Arc<BotContext>,
}

impl Harness {
    pub fn new(engagement: EngagementConfig) -> Self {
        let transport = Arc::new(ScriptedTransport::new(bot_identity(), group()));
        let predictor = Arc::new(FakePredictor::new());
        let logger = Arc::new(MemoryMessageLog::new(engagement.history_capacity));
        let uploader = Arc::new(RecordingUploader::new());
        let collaborators = Collaborators {
            transport: transport.clone(),
            predictor: predictor.clone(),
            logger: logger.clone(),
            uploader: uploader.clone(),
        };
        let ctx = Arc::new(BotContext::new(
            StartupState {
                identity: bot_identity(),
                group: group(),
            },
            collaborators,
            &engagement,
            CancellationToken::new(),
        ));
        Self {
            transport,
            predictor,
            logger,
            uploader,
            ctx,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            transport: self.transport.clone(),
            predictor: self.predictor.clone(),
            logger: self.logger.clone(),
            uploader: self.uploader.clone(),
        }
    }

    /// Register a message as sent by the bot so replies to it resolve.
    pub fn bot_said(&self, id: MessageId, text: &str) -> InboundMessage {
        let message = group_message(id, bot_identity(), text);
        self.transport.remember(message.clone());
        message
    }
}

pub async fn spawn_test_server(app: Router) -> Result<Option<(String, tokio::task::JoinHandle<()>)>> {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            eprintln!("skipping test: local socket bind not permitted in this environment");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    wait_for_listener(addr).await;

    Ok(Some((format!("http://{addr}"), handle)))
}

async fn wait_for_listener(addr: std::net::SocketAddr) {
    for _ in 0..20 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
}
