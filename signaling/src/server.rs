//! The signaling WebSocket server.
//!
//! Accepts connections at `/ws`. Each connection is one independently
//! scheduled task: a read loop dispatching client frames, plus a writer
//! task draining the connection's outbound channel (which is also how
//! other members' frames reach this socket).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use vouch_session::{Actor, CoordMetrics, LifecycleEngine, SessionError, Transition};
use vouch_store::SessionStore;
use vouch_types::{ConnectionId, PeerRole, SessionStatus, SessionToken, Timestamp};

use crate::error::SignalError;
use crate::protocol::{ClientFrame, ServerFrame};
use crate::reaper::ExpiryReaper;
use crate::rooms::{authorize_join, RoomRegistry};

/// Shared state for the signaling server.
pub struct SignalState {
    pub registry: RoomRegistry,
    pub store: Arc<dyn SessionStore>,
    pub engine: Arc<LifecycleEngine>,
    pub reaper: ExpiryReaper,
    pub metrics: Arc<CoordMetrics>,
    next_connection: AtomicU64,
}

impl SignalState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        engine: Arc<LifecycleEngine>,
        metrics: Arc<CoordMetrics>,
    ) -> Self {
        Self {
            registry: RoomRegistry::new(),
            store,
            reaper: ExpiryReaper::new(engine.clone(), metrics.clone()),
            engine,
            metrics,
            next_connection: AtomicU64::new(1),
        }
    }

    fn allocate_connection_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection.fetch_add(1, Ordering::Relaxed))
    }

    async fn refresh_gauges(&self) {
        self.metrics
            .rooms_open
            .set(self.registry.room_count().await as i64);
        self.metrics
            .connections_open
            .set(self.registry.connection_count().await as i64);
    }
}

/// The signaling server, configured with a port and shared state.
pub struct SignalServer {
    pub port: u16,
    pub state: Arc<SignalState>,
}

impl SignalServer {
    pub fn new(port: u16, state: Arc<SignalState>) -> Self {
        Self { port, state }
    }

    /// Start listening for WebSocket connections. Runs until shutdown.
    pub async fn start(&self) -> Result<(), SignalError> {
        let state = self.state.clone();
        let app = Router::new()
            .route("/ws", get(ws_handler))
            .with_state(state);

        let addr = format!("0.0.0.0:{}", self.port);
        info!("signaling server listening on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SignalError::Server(e.to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| SignalError::Server(e.to_string()))?;
        Ok(())
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<SignalState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Connection-local state: which room this socket currently occupies.
struct ConnectionCtx {
    id: ConnectionId,
    joined: Option<(SessionToken, PeerRole)>,
    tx: mpsc::UnboundedSender<ServerFrame>,
}

impl ConnectionCtx {
    fn push(&self, frame: ServerFrame) {
        let _ = self.tx.send(frame);
    }

    fn push_error(&self, code: &str, message: impl Into<String>) {
        self.push(ServerFrame::Error {
            code: code.to_string(),
            message: message.into(),
        });
    }
}

/// Handle a single WebSocket connection until it closes.
async fn handle_socket(socket: WebSocket, state: Arc<SignalState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();

    let mut ctx = ConnectionCtx {
        id: state.allocate_connection_id(),
        joined: None,
        tx,
    };
    debug!(connection = %ctx.id, "signaling client connected");

    // Writer task: everything addressed to this connection funnels through
    // its outbound channel and is serialized here.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    warn!("failed to encode server frame: {e}");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                debug!(connection = %ctx.id, "receive error: {e}");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let frame: ClientFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        ctx.push_error("bad_frame", format!("invalid message: {e}"));
                        continue;
                    }
                };
                handle_frame(frame, &mut ctx, &state).await;
            }
            Message::Close(_) => {
                debug!(connection = %ctx.id, "client sent close frame");
                break;
            }
            // Transport pings are answered by the socket layer.
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
        }
    }

    // Disconnect: same path as an explicit leave.
    leave_current_room(&mut ctx, &state).await;
    writer.abort();
    debug!(connection = %ctx.id, "signaling client disconnected");
}

async fn handle_frame(frame: ClientFrame, ctx: &mut ConnectionCtx, state: &Arc<SignalState>) {
    match frame {
        ClientFrame::Join { token, role } => {
            handle_join(&token, role, ctx, state).await;
        }
        ClientFrame::Leave => {
            leave_current_room(ctx, state).await;
        }
        ClientFrame::Signal {
            kind,
            payload,
            target,
        } => {
            let Some((token, _)) = &ctx.joined else {
                ctx.push_error("not_joined", "join a session before signaling");
                return;
            };
            match state
                .registry
                .relay(token, ctx.id, kind, payload, target)
                .await
            {
                Ok(_) => state.metrics.signals_relayed.inc(),
                Err(SignalError::Unreachable(target_id)) => {
                    // At-most-once: the payload is dropped, the sender told.
                    ctx.push_error("unreachable", format!("{target_id} is not present"));
                }
                Err(e) => ctx.push_error("relay_failed", e.to_string()),
            }
        }
        ClientFrame::EndCall => {
            let Some((token, _)) = ctx.joined.take() else {
                ctx.push_error("not_joined", "no active session to end");
                return;
            };
            state.reaper.requester_ended(&token, Timestamp::now());
            state
                .registry
                .close_room(&token, "the call has ended")
                .await;
            state.refresh_gauges().await;
        }
        ClientFrame::Ping => ctx.push(ServerFrame::Pong),
    }
}

async fn handle_join(
    raw_token: &str,
    role: PeerRole,
    ctx: &mut ConnectionCtx,
    state: &Arc<SignalState>,
) {
    if ctx.joined.is_some() {
        ctx.push_error("already_joined", "this connection already occupies a room");
        return;
    }

    // Fresh authorization read at the real-time boundary; the HTTP check
    // may be arbitrarily stale by the time the socket opens.
    let record = match authorize_join(state.store.as_ref(), raw_token, Timestamp::now()) {
        Ok(record) => record,
        Err(SignalError::Closed { reason }) => {
            state.metrics.joins_rejected.inc();
            debug!(token = raw_token, "join rejected: {reason}");
            ctx.push(ServerFrame::SessionClosed { reason });
            return;
        }
        Err(e) => {
            state.metrics.joins_rejected.inc();
            ctx.push_error("join_failed", e.to_string());
            return;
        }
    };

    let token = record.token.clone();
    let peers = state
        .registry
        .join(&token, ctx.id, role, ctx.tx.clone())
        .await;
    ctx.joined = Some((token.clone(), role));

    // First join moves the session out of not_started. Losing this race to
    // a simultaneous join is fine; losing it to a terminal transition means
    // the membership just recorded must be rolled back.
    if record.status == SessionStatus::NotStarted {
        match state
            .engine
            .apply(&token, &Transition::FirstJoin, &Actor::System, Timestamp::now())
        {
            Ok(_) | Err(SessionError::StaleState { .. }) => {}
            Err(SessionError::Closed { status }) => {
                ctx.joined = None;
                state.registry.leave(&token, ctx.id).await;
                state.metrics.joins_rejected.inc();
                ctx.push(ServerFrame::SessionClosed {
                    reason: format!("this session has expired or been closed ({status})"),
                });
                state.refresh_gauges().await;
                return;
            }
            Err(e) => warn!(token = %token, error = %e, "first-join transition failed"),
        }
    }

    info!(connection = %ctx.id, token = %token, %role, "joined room");
    ctx.push(ServerFrame::Joined {
        connection_id: ctx.id,
        peers,
    });
    state.refresh_gauges().await;
}

async fn leave_current_room(ctx: &mut ConnectionCtx, state: &Arc<SignalState>) {
    let Some((token, _)) = ctx.joined.take() else {
        return;
    };
    let outcome = state.registry.leave(&token, ctx.id).await;
    if outcome.emptied {
        state.reaper.room_emptied(&token, Timestamp::now());
    }
    state.refresh_gauges().await;
}
