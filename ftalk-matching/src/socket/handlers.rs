use std::sync::Arc;

use serde::{Deserialize, Serialize};
use socketioxide::extract::{Data, SocketRef};
use uuid::Uuid;

use crate::matching::matchmaker;
use crate::store::{cache, sessions as store};
use crate::AppState;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct SessionRoomPayload {
    session_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SocketMessagePayload {
    session_id: Uuid,
    message: String,
    #[serde(default = "default_message_type")]
    message_type: String,
}

fn default_message_type() -> String {
    "text".into()
}

#[derive(Debug, Serialize)]
struct TypingPayload {
    session_id: Uuid,
    user_id: Uuid,
}

fn get_user_id(socket: &SocketRef) -> Option<Uuid> {
    socket.extensions.get::<Uuid>()
}

fn session_room(session_id: Uuid) -> String {
    format!("session:{session_id}")
}

// ---------------------------------------------------------------------------
// Connection handler
// ---------------------------------------------------------------------------

pub async fn on_connect_with_state(socket: SocketRef, state: Arc<AppState>) {
    let user_id = match authenticate_socket(&socket, &state) {
        Ok(id) => id,
        Err(msg) => {
            tracing::warn!(error = %msg, "socket auth failed");
            let _ = socket.emit(
                "error",
                &ErrorPayload {
                    code: "AUTH_FAILED".into(),
                    message: msg,
                },
            );
            socket.disconnect().ok();
            return;
        }
    };

    socket.extensions.insert(user_id);

    // Handlers must be registered before the first await: the client can
    // start emitting as soon as it receives the connect ack, and events
    // without a registered handler are dropped.
    socket.on("join_chat_session", {
        let state = state.clone();
        move |socket: SocketRef, Data::<SessionRoomPayload>(payload)| {
            let state = state.clone();
            async move { on_join_session(socket, payload, &state).await }
        }
    });

    socket.on(
        "leave_chat_session",
        |socket: SocketRef, Data::<SessionRoomPayload>(payload)| async move {
            // Leaving a room you are not in is a no-op, same as joining twice.
            socket.leave(session_room(payload.session_id)).ok();
        },
    );

    socket.on("chat_message", {
        let state = state.clone();
        move |socket: SocketRef, Data::<SocketMessagePayload>(payload)| {
            let state = state.clone();
            async move { on_chat_message(socket, payload, &state).await }
        }
    });

    socket.on(
        "chat_typing_start",
        |socket: SocketRef, Data::<SessionRoomPayload>(payload)| async move {
            relay_typing(&socket, payload.session_id, "chat_typing_start");
        },
    );

    socket.on(
        "chat_typing_stop",
        |socket: SocketRef, Data::<SessionRoomPayload>(payload)| async move {
            relay_typing(&socket, payload.session_id, "chat_typing_stop");
        },
    );

    socket.on_disconnect({
        let state = state.clone();
        move |socket: SocketRef| {
            let state = state.clone();
            async move { on_disconnect(socket, &state).await }
        }
    });

    // Per-user room for targeted pushes (match found, partner left, calls).
    socket.join(format!("user:{user_id}")).ok();

    tracing::info!(user_id = %user_id, sid = %socket.id, "socket connected");

    cache::set_presence(&state.redis, &user_id, &socket.id.to_string()).await;

    let _ = socket.emit("connected", &serde_json::json!({ "user_id": user_id }));
}

// ---------------------------------------------------------------------------
// Event: join_chat_session
// ---------------------------------------------------------------------------

async fn on_join_session(socket: SocketRef, payload: SessionRoomPayload, state: &Arc<AppState>) {
    let user_id = match get_user_id(&socket) {
        Some(id) => id,
        None => return,
    };

    let is_participant = {
        let mut conn = match state.db.get() {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "failed to get db connection for join_chat_session");
                return;
            }
        };
        match store::get_session(&mut conn, payload.session_id) {
            Ok(Some(session)) => session.is_participant(user_id),
            Ok(None) => false,
            Err(e) => {
                tracing::error!(error = %e, "failed to load session for join_chat_session");
                return;
            }
        }
    };

    if !is_participant {
        let _ = socket.emit(
            "error",
            &ErrorPayload {
                code: "NOT_SESSION_PARTICIPANT".into(),
                message: "you are not a participant of this session".into(),
            },
        );
        return;
    }

    // Joining an already-joined room is a no-op.
    socket.join(session_room(payload.session_id)).ok();

    let _ = socket.emit(
        "session_joined",
        &serde_json::json!({ "session_id": payload.session_id }),
    );

    tracing::debug!(user_id = %user_id, session_id = %payload.session_id, "joined session room");
}

// ---------------------------------------------------------------------------
// Event: chat_message
// ---------------------------------------------------------------------------

async fn on_chat_message(socket: SocketRef, payload: SocketMessagePayload, state: &Arc<AppState>) {
    let user_id = match get_user_id(&socket) {
        Some(id) => id,
        None => return,
    };

    if payload.message.trim().is_empty() {
        let _ = socket.emit(
            "error",
            &ErrorPayload {
                code: "INVALID_PAYLOAD".into(),
                message: "message must not be empty".into(),
            },
        );
        return;
    }

    // Persist through the matchmaker; it also fans the event out to the
    // session room and the partner's user room.
    if let Err(e) = matchmaker::send_message(
        state,
        payload.session_id,
        user_id,
        payload.message,
        payload.message_type,
    )
    .await
    {
        tracing::debug!(user_id = %user_id, error = %e, "socket chat_message rejected");
        let _ = socket.emit(
            "error",
            &ErrorPayload {
                code: "MESSAGE_REJECTED".into(),
                message: e.to_string(),
            },
        );
    }
}

// ---------------------------------------------------------------------------
// Typing indicators — relayed, never persisted
// ---------------------------------------------------------------------------

fn relay_typing(socket: &SocketRef, session_id: Uuid, event: &'static str) {
    let user_id = match get_user_id(socket) {
        Some(id) => id,
        None => return,
    };

    // `to` excludes the sender, so only the partner sees the indicator.
    let _ = socket.to(session_room(session_id)).emit(
        event,
        &TypingPayload {
            session_id,
            user_id,
        },
    );
}

// ---------------------------------------------------------------------------
// Disconnect handler
// ---------------------------------------------------------------------------

async fn on_disconnect(socket: SocketRef, state: &Arc<AppState>) {
    let user_id = match get_user_id(&socket) {
        Some(id) => id,
        None => return,
    };

    tracing::info!(user_id = %user_id, sid = %socket.id, "socket disconnected");

    // Presence is ephemeral; the chat session itself outlives the socket and
    // can be resumed or ended over REST.
    cache::clear_presence(&state.redis, &user_id).await;
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn authenticate_socket(socket: &SocketRef, state: &Arc<AppState>) -> Result<Uuid, String> {
    let connect_info = socket.req_parts();

    let query = connect_info.uri.query().unwrap_or_default();
    let token = query
        .split('&')
        .find_map(|pair| {
            let mut split = pair.splitn(2, '=');
            let key = split.next()?;
            let value = split.next()?;
            (key == "token").then(|| value.to_string())
        })
        .ok_or_else(|| "missing token query parameter".to_string())?;

    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;

    let token_data = jsonwebtoken::decode::<ftalk_shared::types::auth::Claims>(
        &token,
        &jsonwebtoken::DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|e| format!("invalid token: {e}"))?;

    if token_data.claims.is_expired() {
        return Err("token has expired".into());
    }

    Ok(token_data.claims.sub)
}
