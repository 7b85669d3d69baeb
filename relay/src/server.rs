use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use sc_hub::{BroadcastHub, ClientMessage, ServerMessage, SessionId, SnapshotPayload};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Accept websocket subscribers until `stop` flips
pub async fn serve(listener: TcpListener, hub: Arc<BroadcastHub>, mut stop: watch::Receiver<bool>) -> Result<()> {
    info!("Relay listening on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("Accept failed: {}", e);
                        continue;
                    }
                };
                let hub = hub.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, addr, hub).await {
                        warn!("Connection {} ended with error: {}", addr, e);
                    }
                });
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }

    hub.shutdown();
    info!("Relay stopped");
    Ok(())
}

async fn handle_connection(stream: TcpStream, addr: SocketAddr, hub: Arc<BroadcastHub>) -> Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut sink, mut source) = ws_stream.split();

    let mut subscriber = hub.subscribe();
    let id = subscriber.id();
    debug!("Session {} opened for {}", id, addr);

    // Writer drains the session queue; ends when the hub drops the session
    let writer = tokio::spawn(async move {
        while let Some(event) = subscriber.recv().await {
            let text = ServerMessage::from(event).to_json()?;
            sink.send(Message::Text(text)).await?;
        }
        let _ = sink.close().await;
        anyhow::Ok(())
    });

    while let Some(msg) = source.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                if let Err(e) = handle_message(&hub, &id, &text) {
                    warn!("Rejected message from {}: {}", addr, e);
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Websocket error from {}: {}", addr, e);
                break;
            }
        }
    }

    hub.unsubscribe(&id);
    writer.await??;
    Ok(())
}

/// Apply one inbound frame to the hub
pub fn handle_message(hub: &BroadcastHub, id: &SessionId, text: &str) -> sc_hub::Result<()> {
    match ClientMessage::from_json(text)? {
        ClientMessage::StockUpdate(payload) => {
            let snapshot = payload.validate()?;
            info!("Inbound update for {}", snapshot.ticker);
            hub.update_one(snapshot);
        }
        ClientMessage::TopStocksUpdate(payloads) => {
            let snapshots = payloads
                .into_iter()
                .map(SnapshotPayload::validate)
                .collect::<sc_hub::Result<Vec<_>>>()?;
            hub.update_batch(snapshots);
        }
        ClientMessage::GetTopStocks => hub.request_catch_up(id)?,
    }
    Ok(())
}
