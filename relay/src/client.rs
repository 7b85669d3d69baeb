use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use sc_hub::{ClientMessage, HubError, HubEvent, ServerMessage, SnapshotPayload, StockSnapshot, Transport};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Websocket connection to a relay server
///
/// The server queues a catch-up snapshot for every new connection, so each
/// successful `connect` starts with the current headline list.
pub struct WsTransport {
    url: String,
    stream: Option<WsStream>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream: None,
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&mut self) -> sc_hub::Result<()> {
        self.close().await;
        let (stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| HubError::ConnectionError(e.to_string()))?;
        info!("Connected to {}", self.url);
        self.stream = Some(stream);
        Ok(())
    }

    async fn recv(&mut self) -> Option<sc_hub::Result<HubEvent>> {
        loop {
            let stream = self.stream.as_mut()?;
            match stream.next().await {
                Some(Ok(Message::Text(text))) => match ServerMessage::from_json(&text) {
                    Ok(message) => return Some(Ok(message.into_event())),
                    Err(e) => warn!("Ignoring malformed frame: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Server closed the connection");
                    self.stream = None;
                    return None;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.stream = None;
                    return Some(Err(HubError::ConnectionError(e.to_string())));
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.close(None).await;
        }
    }
}

/// Send one snapshot to a relay as an inbound `stock_update`
pub async fn publish(url: &str, snapshot: &StockSnapshot) -> anyhow::Result<()> {
    let (mut stream, _) = connect_async(url).await?;
    let message = ClientMessage::StockUpdate(SnapshotPayload::from(snapshot));
    stream.send(Message::Text(message.to_json()?)).await?;
    stream.close(None).await?;
    info!("Published {} to {}", snapshot.ticker, url);
    Ok(())
}
