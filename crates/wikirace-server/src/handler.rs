//! Per-connection handler: join handshake, request dispatch, teardown.
//!
//! Each accepted connection gets its own task. The flow is:
//!   1. validate the join parameters from the handshake query
//!   2. attach to a room through the registry (creating one if needed) —
//!      the room pushes the `Init` snapshot as the first event
//!   3. pump: a writer task drains acks and room events into the socket
//!      while this task reads requests and dispatches them to the room
//!   4. on any exit, detach from the room (which may destroy it)

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use wikirace_engine::{JoinRequest, RoomHandle, RoomRegistry};
use wikirace_protocol::{
    AckData, ClientCommand, Request, RoomId, ServerEvent, ServerFrame, Username, decode, encode,
};
use wikirace_resolver::{ArticleResolver, is_supported_language};

use crate::ServerError;
use crate::transport::IncomingConnection;

/// State shared by every connection handler.
pub(crate) struct ServerState<R> {
    pub(crate) registry: Arc<Mutex<RoomRegistry>>,
    pub(crate) resolver: R,
}

/// Handles one connection from accept to close.
pub(crate) async fn handle_connection<R: ArticleResolver>(
    conn: IncomingConnection,
    state: Arc<ServerState<R>>,
) -> Result<(), ServerError> {
    let conn_id = conn.id;
    let query = conn.query;
    let (mut sink, mut stream) = conn.ws.split();

    // -- Step 1: validate the handshake -----------------------------------
    let Some(username) = query.username.clone() else {
        let frame = ServerFrame::Event {
            event: ServerEvent::InitError {
                message: "username is required".to_string(),
            },
        };
        let _ = sink.send(text_frame(&frame)?).await;
        let _ = sink.close().await;
        return Ok(());
    };
    let username = Username(username);

    if let Some(language) = &query.language {
        if !is_supported_language(language) {
            let frame = ServerFrame::Event {
                event: ServerEvent::InitError {
                    message: format!("Unsupported language: {language}"),
                },
            };
            let _ = sink.send(text_frame(&frame)?).await;
            let _ = sink.close().await;
            return Ok(());
        }
    }

    // -- Step 2: attach to a room -----------------------------------------
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let join = JoinRequest {
        username: username.clone(),
        room_id: query.room_id.map(RoomId),
        language: query.language,
        mode: query.mode,
    };
    let joined = state.registry.lock().await.join(join, event_tx).await;
    let room = match joined {
        Ok(handle) => handle,
        Err(e) => {
            tracing::info!(%conn_id, %username, error = %e, "join rejected");
            let frame = ServerFrame::Event {
                event: ServerEvent::InitError {
                    message: e.to_string(),
                },
            };
            let _ = sink.send(text_frame(&frame)?).await;
            let _ = sink.close().await;
            return Ok(());
        }
    };
    let room_id = room.room_id().clone();
    tracing::info!(%conn_id, %username, %room_id, "player connected");

    // -- Step 3: pump ------------------------------------------------------
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<ServerFrame>();
    let writer = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                Some(frame) = frame_rx.recv() => frame,
                Some(event) = event_rx.recv() => ServerFrame::Event { event },
                else => break,
            };
            let Ok(message) = text_frame(&frame) else {
                continue;
            };
            if sink.send(message).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(message) = stream.next().await {
        let data = match message {
            Ok(Message::Text(text)) => text.as_bytes().to_vec(),
            Ok(Message::Binary(data)) => data.to_vec(),
            Ok(Message::Close(_)) => break,
            // Ping/pong handled by tungstenite.
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(%conn_id, %username, error = %e, "recv error");
                break;
            }
        };

        let request: Request = match decode(&data) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(%conn_id, %username, error = %e, "undecodable request");
                let _ = frame_tx.send(ServerFrame::err(0, "invalid message"));
                continue;
            }
        };

        let frame = dispatch(&state, &room, &username, request).await;
        if frame_tx.send(frame).is_err() {
            break;
        }
    }

    // -- Step 4: teardown --------------------------------------------------
    tracing::info!(%conn_id, %username, %room_id, "player disconnected");
    state.registry.lock().await.leave(&room_id, &username).await;
    drop(frame_tx);
    let _ = writer.await;
    Ok(())
}

/// Routes one request to the room and shapes the ack.
async fn dispatch<R: ArticleResolver>(
    state: &ServerState<R>,
    room: &RoomHandle,
    username: &Username,
    request: Request,
) -> ServerFrame {
    let seq = request.seq;
    match request.command {
        ClientCommand::Update { patch } => {
            match room.update(&state.resolver, username, patch).await {
                Ok(delta) => ServerFrame::ok(seq, Some(AckData::Patch { patch: delta })),
                Err(e) => ServerFrame::err(seq, e.to_string()),
            }
        }
        ClientCommand::Start => match room.start(username.clone()).await {
            Ok(start) => ServerFrame::ok(seq, Some(AckData::Start(start))),
            Err(e) => ServerFrame::err(seq, e.to_string()),
        },
        ClientCommand::Click { article } => {
            match room.click(&state.resolver, username, &article).await {
                Ok(progress) => ServerFrame::ok(seq, Some(AckData::Progress(progress))),
                Err(e) => ServerFrame::err(seq, e.to_string()),
            }
        }
        ClientCommand::Navigate { article } => {
            match room.navigate(&state.resolver, username, &article).await {
                Ok(progress) => ServerFrame::ok(seq, Some(AckData::Progress(progress))),
                Err(e) => ServerFrame::err(seq, e.to_string()),
            }
        }
        ClientCommand::ChangeLang { language } => {
            match room.change_lang(username, &language).await {
                Ok(delta) => ServerFrame::ok(seq, Some(AckData::Patch { patch: delta })),
                Err(e) => ServerFrame::err(seq, e.to_string()),
            }
        }
    }
}

/// Encodes a frame as a text WebSocket message (the wire is JSON).
fn text_frame(frame: &ServerFrame) -> Result<Message, ServerError> {
    let bytes = encode(frame)?;
    let text = String::from_utf8(bytes).unwrap_or_default();
    Ok(Message::Text(text.into()))
}
