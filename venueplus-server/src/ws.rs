use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use log::debug;
use serde::Deserialize;
use tokio::sync::mpsc::UnboundedReceiver;
use venueplus_collab::Outbound;

use crate::context::ServerContext;

type Outgoing = SplitSink<WebSocket, Message>;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayQuery {
    /// The club the console starts out on
    #[serde(default)]
    club_id: Option<String>,
}

async fn gateway(
    State(context): State<ServerContext>,
    Query(query): Query<GatewayQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let club_id = query.club_id.unwrap_or_default();

    ws.on_upgrade(move |socket| run_connection(context, club_id, socket))
}

async fn run_connection(context: ServerContext, club_id: String, socket: WebSocket) {
    let (outgoing, mut incoming) = socket.split();

    let mut shutdown = context.collab.hub().shutdown_signal();
    let (dispatcher, outbound) = context.collab.connect(&club_id).await;
    let id = dispatcher.id();

    let writer = tokio::spawn(forward_outbound(outbound, outgoing));

    // Messages of one connection are handled strictly in receipt order
    let stopping = loop {
        tokio::select! {
            message = incoming.next() => match message {
                Some(Ok(Message::Text(text))) => dispatcher.handle_text(&text).await,
                Some(Ok(Message::Close(_))) | None => break false,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!("Connection {} errored: {}", id, err);
                    break false;
                }
            },
            _ = shutdown.changed() => break true,
        }
    };

    if stopping {
        // The hub queues a close frame and drops the sender after its grace period
        let _ = writer.await;
    } else {
        writer.abort();
    }

    debug!("Connection {} closed", id);
}

async fn forward_outbound(mut outbound: UnboundedReceiver<Outbound>, mut outgoing: Outgoing) {
    while let Some(message) = outbound.recv().await {
        let (frame, is_close) = match message {
            Outbound::Text(text) => (Message::Text(text), false),
            Outbound::Close(reason) => {
                let frame = CloseFrame {
                    code: close_code::NORMAL,
                    reason: reason.into(),
                };

                (Message::Close(Some(frame)), true)
            }
        };

        if outgoing.send(frame).await.is_err() || is_close {
            break;
        }
    }
}

pub fn router() -> Router<ServerContext> {
    Router::new().route("/ws", get(gateway))
}
