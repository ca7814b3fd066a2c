//! Push-channel transport: maintains the WebSocket subscription the live
//! feed arrives on and carries operator events back out. Inbound frames are
//! validated into `FeedEvent`s at this boundary; anything malformed is
//! logged and dropped before it can reach the collection.

use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, handshake::client::Request, Message},
};
use url::Url;
use uuid::Uuid;

use crate::models::wire::{FeedEvent, OperatorEvent};
use crate::services::intake_store::{IntakeCommand, IntakeStore};

#[derive(Error, Debug)]
pub enum FeedClientError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid feed URL: {0}")]
    InvalidUrl(String),
    #[error("channel closed")]
    Closed,
}

/// Longest raw-frame prefix included in malformed-frame logs.
const FRAME_PREVIEW_LIMIT: usize = 200;

/// Clamp a raw frame for logging without splitting a multi-byte UTF-8
/// character, which would panic inside the receive loop.
fn frame_preview(raw: &str) -> &str {
    if raw.len() <= FRAME_PREVIEW_LIMIT {
        return raw;
    }
    let mut end = FRAME_PREVIEW_LIMIT;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    &raw[..end]
}

/// Credentials for the push channel, passed in explicitly at construction
/// instead of being looked up from ambient global state.
#[derive(Clone)]
pub struct ChannelSession {
    token: String,
}

impl ChannelSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub struct FeedClient {
    ws_url: String,
    session: ChannelSession,
    store: IntakeStore,
    reconnect_delay: Duration,
}

impl FeedClient {
    pub fn new(
        ws_url: String,
        session: ChannelSession,
        store: IntakeStore,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            ws_url,
            session,
            store,
            reconnect_delay,
        }
    }

    /// Run the subscription until the process shuts down, reconnecting
    /// after a fixed delay whenever the connection drops.
    pub async fn run(self, mut outbound_rx: mpsc::UnboundedReceiver<OperatorEvent>) {
        loop {
            match self.connect_and_relay(&mut outbound_rx).await {
                Ok(()) => info!("Feed connection closed by server"),
                Err(FeedClientError::Closed) => {
                    info!("Local side of the feed shut down, stopping client");
                    return;
                }
                Err(e) => error!("Feed client error: {}", e),
            }

            tokio::time::sleep(self.reconnect_delay).await;
            info!("Reconnecting to intake feed...");
        }
    }

    /// Build the handshake request with the session's bearer token.
    fn build_request(&self) -> Result<Request, FeedClientError> {
        Url::parse(&self.ws_url).map_err(|e| FeedClientError::InvalidUrl(e.to_string()))?;

        let mut request = self
            .ws_url
            .as_str()
            .into_client_request()
            .map_err(|e| FeedClientError::InvalidUrl(e.to_string()))?;

        request.headers_mut().insert(
            "Authorization",
            self.session
                .bearer()
                .parse()
                .map_err(|_| FeedClientError::Connect("Invalid Authorization header".to_string()))?,
        );
        Ok(request)
    }

    async fn connect_and_relay(
        &self,
        outbound_rx: &mut mpsc::UnboundedReceiver<OperatorEvent>,
    ) -> Result<(), FeedClientError> {
        let request = self.build_request()?;
        let connection_id = Uuid::new_v4();

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| FeedClientError::Connect(e.to_string()))?;
        info!(
            "Connected to intake feed at {} (connection {})",
            self.ws_url, connection_id
        );

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => {
                    match outbound {
                        Some(event) => {
                            match serde_json::to_string(&event) {
                                Ok(json) => {
                                    ws_sender
                                        .send(Message::Text(json.into()))
                                        .await
                                        .map_err(|e| FeedClientError::Transport(e.to_string()))?;
                                }
                                Err(e) => error!("Failed to serialize operator event: {}", e),
                            }
                        }
                        None => return Err(FeedClientError::Closed),
                    }
                }
                inbound = ws_receiver.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            match FeedEvent::parse(text.as_str()) {
                                Ok(event) => {
                                    if self.store.command(IntakeCommand::Feed(event)).is_err() {
                                        return Err(FeedClientError::Closed);
                                    }
                                }
                                Err(e) => {
                                    warn!(
                                        "Malformed feed event dropped: {} - raw: {}",
                                        e,
                                        frame_preview(text.as_str())
                                    );
                                }
                            }
                        }
                        Some(Ok(Message::Ping(_))) => {
                            // tungstenite answers pings on the next read
                            debug!("Received feed ping");
                        }
                        Some(Ok(Message::Close(_))) => return Ok(()),
                        Some(Ok(_)) => debug!("Ignoring non-text feed frame"),
                        Some(Err(e)) => return Err(FeedClientError::Transport(e.to_string())),
                        None => return Ok(()),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(ws_url: &str) -> FeedClient {
        let (store, reducer) = IntakeStore::spawn();
        reducer.abort();
        FeedClient::new(
            ws_url.to_string(),
            ChannelSession::new("secret-token"),
            store,
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn request_carries_bearer_token() {
        let request = client("ws://feed.example/live").build_request().unwrap();
        assert_eq!(
            request.headers().get("Authorization").unwrap(),
            "Bearer secret-token"
        );
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let err = client("not a url").build_request().unwrap_err();
        assert!(matches!(err, FeedClientError::InvalidUrl(_)));
    }

    #[test]
    fn frame_preview_respects_char_boundaries() {
        // 100 three-byte characters: byte 200 falls mid-character
        let raw = "あ".repeat(100);
        let preview = frame_preview(&raw);
        assert!(preview.len() <= FRAME_PREVIEW_LIMIT);
        assert_eq!(preview.len() % 3, 0);
        assert!(raw.starts_with(preview));

        let short = "plain ascii";
        assert_eq!(frame_preview(short), short);
    }

    #[tokio::test]
    async fn malformed_multibyte_frame_is_dropped_not_fatal() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // Unparseable frame longer than the preview limit, with a
            // multi-byte character straddling the cutoff
            ws.send(Message::Text("あ".repeat(100).into())).await.unwrap();
            ws.send(Message::Text(
                r#"{"event":"newPayment","paymentId":"p-1","userId":"u-1","howMuch":1000,"currencsy":"UZS"}"#.into(),
            ))
            .await
            .unwrap();
            // Hold the connection until the client has drained both frames
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let (mut store, _reducer) = IntakeStore::spawn();
        let feed = FeedClient::new(
            format!("ws://{}", addr),
            ChannelSession::new("secret-token"),
            store.clone(),
            Duration::from_secs(5),
        );
        // Keep the sender alive so the outbound side stays open
        let (_outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
        let relay = tokio::spawn(async move {
            let _ = feed.connect_and_relay(&mut outbound_rx).await;
        });

        // The valid event after the malformed one must still arrive
        tokio::time::timeout(Duration::from_secs(5), async {
            while !store.snapshot().iter().any(|r| r.payment_id == "p-1") {
                store.changed().await.unwrap();
            }
        })
        .await
        .expect("valid event after a malformed frame never reached the store");

        relay.abort();
        server.abort();
    }
}
