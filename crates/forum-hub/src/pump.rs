//! Connection pumps
//!
//! Each connection runs two tasks: the inbound pump reads frames and hands
//! chat messages to the router, the outbound pump drains the connection's
//! queue to the transport. When either ends the other is stopped and the
//! connection is unregistered.

use crate::connection::{ConnectionId, Session};
use crate::hub::Hub;
use axum::extract::ws::Message;
use forum_core::InboundFrame;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

impl Hub {
    /// Run the pump pair of a registered connection over any message
    /// transport; returns once both pumps have finished.
    pub async fn serve_socket<S, E, K>(&self, session: Session, stream: S, sink: K)
    where
        S: Stream<Item = Result<Message, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
        K: Sink<Message> + Send + Unpin + 'static,
        K::Error: Display,
    {
        let Session {
            id,
            identity,
            outbound,
        } = session;

        let mut outbound_task = tokio::spawn(outbound_pump(id, outbound, sink));
        let mut inbound_task = tokio::spawn(inbound_pump(self.clone(), id, identity, stream));

        tokio::select! {
            result = &mut inbound_task => {
                if let Err(e) = result {
                    error!(conn_id = %id, error = %e, "Inbound pump panicked");
                }
                // Closing the queue lets the outbound pump flush and exit.
                self.disconnect(id).await;
                if let Err(e) = outbound_task.await {
                    error!(conn_id = %id, error = %e, "Outbound pump panicked");
                }
            }
            result = &mut outbound_task => {
                if let Err(e) = result {
                    error!(conn_id = %id, error = %e, "Outbound pump panicked");
                }
                inbound_task.abort();
                self.disconnect(id).await;
            }
        }

        debug!(conn_id = %id, "Connection pumps finished");
    }
}

async fn inbound_pump<S, E>(hub: Hub, id: ConnectionId, identity: String, mut stream: S)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let max_size = hub.config().max_message_size;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match InboundFrame::decode(text.as_str(), max_size) {
                Ok(frame) => {
                    hub.route(frame.into_message(&identity)).await;
                }
                Err(e) => {
                    warn!(identity = %identity, conn_id = %id, error = %e, "Dropping inbound frame");
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(identity = %identity, conn_id = %id, "Binary frames not supported");
            }
            Ok(Message::Close(_)) => {
                info!(identity = %identity, conn_id = %id, "Connection closed by client");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                warn!(identity = %identity, conn_id = %id, error = %e, "Transport read failed");
                break;
            }
        }
    }
}

async fn outbound_pump<K>(id: ConnectionId, mut queue: mpsc::Receiver<String>, mut sink: K)
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    while let Some(payload) = queue.recv().await {
        if let Err(e) = sink.send(Message::Text(payload.into())).await {
            warn!(conn_id = %id, error = %e, "Transport write failed");
            return;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(conn_id = %id, error = %e, "Transport close failed");
    }
}
