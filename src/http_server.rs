use crate::dispatch::{Dispatcher, Outcome, MESSAGE_TYPE_HEADER};
use crate::envelope;
use crate::error::RequestError;
use crate::verification::SignatureVerifier;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument};
use uuid::Uuid;

pub const REPUTATION_ALARM_PATH: &str = "/brokerpaks/ses/reputation-alarm";

/// Shared by all in-flight requests; nothing in it is mutated per request.
#[derive(Clone)]
pub struct ServerState {
    verifier: Arc<SignatureVerifier>,
    dispatcher: Arc<Dispatcher>,
}

impl ServerState {
    pub fn new(verifier: SignatureVerifier, dispatcher: Dispatcher) -> Self {
        Self {
            verifier: Arc::new(verifier),
            dispatcher: Arc::new(dispatcher),
        }
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(REPUTATION_ALARM_PATH, post(handle_sns))
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Bind `addr`, spawn the server and return the bound address.
pub async fn start(addr: &str, state: ServerState) -> Result<(SocketAddr, JoinHandle<()>), String> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to bind HTTP server: {e}"))?;
    let local = listener
        .local_addr()
        .map_err(|e| format!("failed to read bound address: {e}"))?;

    let handle = tokio::spawn(async move {
        if let Err(e) = serve(listener, state, std::future::pending()).await {
            error!("HTTP server error: {e}");
        }
    });

    Ok((local, handle))
}

/// Parse, verify and dispatch one request body.
pub async fn process(
    state: &ServerState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Outcome, RequestError> {
    let envelope = envelope::parse(body)?;
    let verified = state.verifier.verify(envelope).await?;

    // Only consulted after verification, and never trusted over the signed Type.
    let type_header = headers
        .get(MESSAGE_TYPE_HEADER)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    Ok(state
        .dispatcher
        .dispatch(&verified, type_header.as_deref())
        .await?)
}

async fn handle_sns(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("sns_request", %request_id);

    async move {
        match process(&state, &headers, &body).await {
            Ok(outcome) => {
                info!(?outcome, "processed SNS request");
                StatusCode::OK
            }
            Err(e) => {
                error!(code = e.code(), err = %e, "rejected SNS request");
                e.status()
            }
        }
    }
    .instrument(span)
    .await
}
