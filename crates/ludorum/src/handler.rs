//! Per-connection handler: game-code parsing, auth-first, then pumping
//! frames between the socket and the room actor.
//!
//! The flow for each accepted connection:
//!   1. Parse the game code from the URL path (`/<GAMECODE>`).
//!   2. Wait for AUTH; resolve the token through the identity port
//!      under the auth timeout. Failure: `AUTH_FAILURE`, close 4001.
//!   3. Attach to the room from the registry (creating it lazily).
//!      Lookup failures close 1011.
//!   4. Loop: inbound frames become room actions; a writer task pumps
//!      the room's outbound frames to the socket.

use std::sync::Arc;

use ludorum_engine::GameCode;
use ludorum_protocol::{
    ClientAction, Codec, ServerFrame, CLOSE_AUTH_FAILURE, CLOSE_SERVER_ERROR,
};
use ludorum_room::{Persistence, RoomHandle};
use ludorum_session::{Identity, Inbound, Session, UserProfile, AUTH_TIMEOUT};
use ludorum_transport::{WsReceiver, WsSender};
use tokio::sync::mpsc;

use crate::server::ServerState;
use crate::LudorumError;

pub(crate) async fn handle_connection<I, P>(
    mut sender: WsSender,
    mut receiver: WsReceiver,
    path: String,
    state: Arc<ServerState<I, P>>,
) -> Result<(), LudorumError>
where
    I: Identity,
    P: Persistence,
{
    let conn_id = receiver.id();

    // --- Step 1: the game code rides in the path ---
    let code = match GameCode::parse(path.trim_start_matches('/')) {
        Ok(code) => code,
        Err(error) => {
            tracing::debug!(%conn_id, %path, %error, "bad game code");
            let _ = sender.close(CLOSE_SERVER_ERROR, "invalid game code").await;
            return Ok(());
        }
    };

    // --- Step 2: auth first ---
    let mut session = Session::new();
    let Some((profile, room, writer_rx)) =
        auth_phase(&mut sender, &mut receiver, &mut session, &code, &state).await?
    else {
        return Ok(()); // closed during auth, already handled
    };
    let user_id = profile.user_id.clone();
    tracing::info!(%conn_id, %code, %user_id, "session authenticated");

    // --- Step 3: writer task pumps room frames to the socket ---
    let codec = state.codec;
    let writer = tokio::spawn(pump_outbound(sender, writer_rx, codec));

    // --- Step 4: inbound loop ---
    loop {
        let data = match receiver.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%conn_id, %user_id, "connection closed");
                break;
            }
            Err(error) => {
                tracing::debug!(%conn_id, %user_id, %error, "receive error");
                break;
            }
        };

        let action = match ClientAction::parse(&data) {
            Ok(action) => action,
            Err(error) => {
                // Malformed frame: logged, connection kept, no response.
                tracing::debug!(%conn_id, %user_id, %error, "malformed frame");
                continue;
            }
        };

        match session.on_action(action) {
            Inbound::Forward(action) => {
                if room.action(user_id.clone(), action).await.is_err() {
                    tracing::debug!(%conn_id, %code, "room gone, closing");
                    break;
                }
            }
            Inbound::BeginAuth { .. } | Inbound::Ignore => {}
        }
    }

    session.close();
    // Disconnect (grace applies room-side); the writer drains and stops
    // when the room drops this peer.
    let _ = room.leave(user_id).await;
    writer.abort();
    Ok(())
}

/// Runs the unauthenticated phase: ignores everything until a valid
/// AUTH arrives, resolves it, and attaches to the room.
///
/// Returns `None` when the connection should simply end (peer gone, or
/// a failure that already closed the socket).
async fn auth_phase<I, P>(
    sender: &mut WsSender,
    receiver: &mut WsReceiver,
    session: &mut Session,
    code: &GameCode,
    state: &Arc<ServerState<I, P>>,
) -> Result<
    Option<(
        UserProfile,
        RoomHandle,
        mpsc::UnboundedReceiver<ServerFrame>,
    )>,
    LudorumError,
>
where
    I: Identity,
    P: Persistence,
{
    loop {
        let data = match receiver.recv().await {
            Ok(Some(data)) => data,
            Ok(None) | Err(_) => return Ok(None),
        };
        let action = match ClientAction::parse(&data) {
            Ok(action) => action,
            Err(error) => {
                tracing::debug!(%code, %error, "malformed frame before auth");
                continue;
            }
        };
        let token = match session.on_action(action) {
            Inbound::BeginAuth { token } => token,
            // Auth first: anything else is ignored.
            _ => continue,
        };

        let resolved =
            tokio::time::timeout(AUTH_TIMEOUT, state.identity.resolve(&token)).await;
        let profile = match resolved {
            Ok(Ok(profile)) => profile,
            Ok(Err(error)) => {
                tracing::info!(%code, %error, "auth rejected");
                return fail_auth(sender, &error.to_string()).await;
            }
            Err(_) => {
                tracing::info!(%code, "auth timed out");
                return fail_auth(sender, "authentication timed out").await;
            }
        };

        // Attach to the room; the room sends AUTH_SUCCESS plus the
        // snapshot through the writer channel.
        let room = match state.registry.attach(code).await {
            Ok(room) => room,
            Err(error) => {
                tracing::info!(%code, %error, "room attach failed");
                let _ = sender.close(CLOSE_SERVER_ERROR, &error.to_string()).await;
                return Ok(None);
            }
        };
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        if let Err(error) = room
            .join(
                profile.user_id.clone(),
                profile.display_name.clone(),
                writer_tx,
            )
            .await
        {
            tracing::info!(%code, %error, "join rejected");
            let _ = sender.close(CLOSE_SERVER_ERROR, &error.to_string()).await;
            return Ok(None);
        }

        session.authenticated(profile.clone());
        return Ok(Some((profile, room, writer_rx)));
    }
}

/// Emits AUTH_FAILURE and closes with 4001.
async fn fail_auth<T>(
    sender: &mut WsSender,
    message: &str,
) -> Result<Option<T>, LudorumError> {
    let frame = ServerFrame::AuthFailure {
        message: message.to_string(),
    };
    if let Ok(bytes) = ludorum_protocol::JsonCodec.encode(&frame) {
        let _ = sender.send(&bytes).await;
    }
    let _ = sender.close(CLOSE_AUTH_FAILURE, message).await;
    Ok(None)
}

/// Forwards room frames to the socket until either side goes away.
async fn pump_outbound(
    mut sender: WsSender,
    mut frames: mpsc::UnboundedReceiver<ServerFrame>,
    codec: ludorum_protocol::JsonCodec,
) {
    while let Some(frame) = frames.recv().await {
        let bytes = match codec.encode(&frame) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(%error, "frame encode failed");
                continue;
            }
        };
        if sender.send(&bytes).await.is_err() {
            break; // socket gone; the room prunes us on its next send
        }
    }
}
