use crate::config::EventsConfig;
use serde::Serialize;
use tokio::sync::mpsc;

/// Events emitted by the service layer for out-of-band consumers. Delivery is
/// fire-and-forget: at-least-once, unordered relative to the synchronous
/// response the caller sees.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "name", content = "data")]
pub enum AppEvent {
    #[serde(rename = "connection.request.created")]
    ConnectionRequestCreated {
        request_id: String,
        from_user_id: String,
        to_user_id: String,
    },
}

impl AppEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::ConnectionRequestCreated { .. } => "connection.request.created",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventBus {
    /// Spawns the dispatcher task and returns the sending handle.
    pub fn start(config: EventsConfig, client: reqwest::Client) -> Self {
        let (bus, mut rx) = Self::channel();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                dispatch(&event, &config, &client).await;
            }
        });
        bus
    }

    /// Bare channel without a dispatcher, for tests that want to assert on
    /// emitted events.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Never blocks; a closed dispatcher only costs the notification, never
    /// the request that produced it.
    pub fn send(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("event dispatcher is gone, dropping event");
        }
    }
}

async fn dispatch(event: &AppEvent, config: &EventsConfig, client: &reqwest::Client) {
    tracing::info!(event = event.name(), "dispatching event");
    let Some(sink_url) = config.sink_url.as_deref() else {
        return;
    };
    let result = client.post(sink_url).json(event).send().await;
    match result {
        Ok(response) if !response.status().is_success() => {
            tracing::warn!(
                event = event.name(),
                status = %response.status(),
                "event sink rejected event"
            );
        }
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(event = event.name(), error = %err, "event sink unreachable");
        }
    }
}
