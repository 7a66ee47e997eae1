//! Per-connection handler: handshake, then command routing.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbox onto the socket.
//! The flow is:
//!   1. Receive Handshake → validate version → send HandshakeAck
//!   2. Open a session, start the writer
//!   3. Loop: receive envelopes → run commands through the coordinator
//!   4. On close, keepalive timeout or error: close the session
//!
//! Every event after the handshake ack, whether it is a reply to this
//! connection or a room broadcast, goes through the outbox. That keeps a
//! single, gap-free `seq` per connection.

use std::sync::Arc;
use std::time::Duration;

use quickdraw_protocol::{
    ClientCommand, Codec, Envelope, ParticipantId, Payload, ProtocolError, ServerEvent,
};
use quickdraw_room::{Outbox, RoundAction};
use quickdraw_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::{Instant, MissedTickBehavior};

use crate::QuickdrawError;
use crate::server::{PROTOCOL_VERSION, ServerState};

/// Drop guard that closes a participant's session when the handler exits.
///
/// Runs even if the handler panics. `Drop` is synchronous, so the async
/// cleanup is spawned.
struct SessionGuard<C: Codec> {
    participant: ParticipantId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for SessionGuard<C> {
    fn drop(&mut self) {
        let participant = self.participant;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = state.coordinator.close_session(participant).await {
                tracing::debug!(%participant, error = %e, "session close failed");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), QuickdrawError> {
    let conn = Arc::new(conn);
    let participant = ParticipantId::from(conn.id());
    tracing::debug!(%participant, "handling new connection");

    // --- Step 1: Handshake ---
    if let Err(e) = perform_handshake(&conn, &state, participant).await {
        let _ = conn.close().await;
        return Err(e);
    }

    // --- Step 2: Session and writer ---
    state.coordinator.open_session(participant).await?;
    let _guard = SessionGuard {
        participant,
        state: Arc::clone(&state),
    };
    let sessions = state.coordinator.session_count().await;
    tracing::info!(
        %participant,
        sessions,
        "participant connected"
    );

    let (outbox, events) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(
        Arc::clone(&conn),
        events,
        Arc::clone(&state),
    ));

    // --- Step 3: Command loop ---
    let result = command_loop(&conn, &state, participant, &outbox).await;

    writer.abort();
    let _ = conn.close().await;
    // _guard drops here → session close fires.
    result
}

/// Receive Handshake, check the version, send the ack with `seq` 0.
async fn perform_handshake<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    participant: ParticipantId,
) -> Result<(), QuickdrawError> {
    let data = match tokio::time::timeout(state.config.handshake_timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(ProtocolError::InvalidMessage(
                "connection closed before handshake".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            send_error(conn, state, 400, "handshake timed out").await?;
            return Err(ProtocolError::InvalidMessage("handshake timed out".into()).into());
        }
    };

    let version = match state.codec.decode::<Envelope>(&data).map(|env| env.payload) {
        Ok(Payload::Command(ClientCommand::Handshake { version })) => version,
        _ => {
            send_error(conn, state, 400, "expected Handshake").await?;
            return Err(ProtocolError::InvalidMessage(
                "first message must be Handshake".into(),
            )
            .into());
        }
    };

    if version != PROTOCOL_VERSION {
        send_error(
            conn,
            state,
            400,
            &format!("version mismatch: expected {PROTOCOL_VERSION}, got {version}"),
        )
        .await?;
        return Err(ProtocolError::InvalidMessage("protocol version mismatch".into()).into());
    }

    let ack = ServerEvent::HandshakeAck {
        participant_id: participant,
        server_time: state.now_ms(),
    };
    send_direct(conn, state, ack).await
}

async fn command_loop<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    participant: ParticipantId,
    outbox: &Outbox,
) -> Result<(), QuickdrawError> {
    let period = state.config.keepalive_interval.max(Duration::from_millis(1));
    let mut keepalive = tokio::time::interval_at(Instant::now() + period, period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let received = tokio::select! {
            received = conn.recv() => received,
            _ = keepalive.tick() => {
                let silent = conn.idle_time();
                if silent >= state.config.keepalive_timeout {
                    tracing::info!(%participant, ?silent, "no reply to keepalive, dropping");
                    return Ok(());
                }
                if let Err(e) = conn.ping().await {
                    tracing::debug!(%participant, error = %e, "ping failed");
                    return Err(e.into());
                }
                continue;
            }
        };

        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%participant, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%participant, error = %e, "recv error");
                return Err(e.into());
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%participant, error = %e, "failed to decode envelope");
                continue;
            }
        };
        let Payload::Command(command) = envelope.payload else {
            tracing::debug!(%participant, "ignoring event sent by client");
            continue;
        };

        tracing::debug!(%participant, seq = envelope.seq, ?command, "command");
        if let Err(err) = execute(state, participant, command, outbox).await {
            tracing::debug!(%participant, error = %err, "command rejected");
            let _ = outbox.send(ServerEvent::Error {
                code: err.status_code(),
                message: err.user_message(),
            });
        }
    }
}

/// Runs one command. Its visible effects arrive through the outbox.
async fn execute<C: Codec>(
    state: &ServerState<C>,
    participant: ParticipantId,
    command: ClientCommand,
    outbox: &Outbox,
) -> Result<(), QuickdrawError> {
    let coordinator = &state.coordinator;
    match command {
        ClientCommand::Handshake { .. } => {
            return Err(ProtocolError::InvalidMessage("handshake already completed".into()).into());
        }
        ClientCommand::Heartbeat { client_time } => {
            let _ = outbox.send(ServerEvent::HeartbeatAck {
                client_time,
                server_time: state.now_ms(),
            });
        }
        ClientCommand::CreateRoom => {
            coordinator.create_room(participant, outbox).await?;
        }
        ClientCommand::JoinAsHost { code } => {
            coordinator.join_as_host(participant, &code, outbox).await?;
        }
        ClientCommand::JoinRoom { code, name } => {
            coordinator.join_room(participant, &code, &name, outbox).await?;
        }
        ClientCommand::StartRound => coordinator.round(participant, RoundAction::Start).await?,
        ClientCommand::StopRound => coordinator.round(participant, RoundAction::Stop).await?,
        ClientCommand::ResetRound => coordinator.round(participant, RoundAction::Reset).await?,
        ClientCommand::Signal => {
            coordinator.signal(participant).await?;
        }
        ClientCommand::RequestState => {
            coordinator.request_state(participant).await?;
        }
        ClientCommand::Leave => coordinator.leave(participant).await?,
    }
    Ok(())
}

/// Writer task: wraps each outbox event in an envelope and sends it.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    mut events: UnboundedReceiver<ServerEvent>,
    state: Arc<ServerState<C>>,
) {
    // 0 was the handshake ack.
    let mut seq: u64 = 1;
    while let Some(event) = events.recv().await {
        let envelope = Envelope::event(next_seq(&mut seq), state.now_ms(), event);
        let bytes = match state.codec.encode(&envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn = %conn.id(), error = %e, "send failed, writer stopping");
            break;
        }
    }
}

/// Sends an event straight to the socket, bypassing the outbox. Only
/// used before the writer exists, so `seq` is always 0.
async fn send_direct<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    event: ServerEvent,
) -> Result<(), QuickdrawError> {
    let envelope = Envelope::event(0, state.now_ms(), event);
    let bytes = state.codec.encode(&envelope)?;
    conn.send(&bytes).await?;
    Ok(())
}

async fn send_error<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    code: u16,
    message: &str,
) -> Result<(), QuickdrawError> {
    let event = ServerEvent::Error {
        code,
        message: message.to_string(),
    };
    send_direct(conn, state, event).await
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}
