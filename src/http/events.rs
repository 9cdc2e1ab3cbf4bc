//! Relay endpoint: one SSE response, one relay session.

use axum::{
    extract::State,
    response::sse::{KeepAlive, Sse},
    response::IntoResponse,
};
use futures_util::StreamExt;
use std::convert::Infallible;
use std::time::Duration;

use crate::http::server::AppState;
use crate::relay::{emitter, HttpConnector, RelaySession, RelaySettings};

/// `GET /events`
///
/// Spawns a session bound to this response. The session ends when the client
/// goes away (the response stream, and with it the channel receiver, is
/// dropped) or when the server shuts down.
pub async fn relay_events(State(state): State<AppState>) -> impl IntoResponse {
    let config = state.config.load_full();

    let settings = RelaySettings::from_config(&config);
    let connector = HttpConnector::new(state.upstream.clone(), config.upstream.api_token.clone());
    let (emitter, events) = emitter::channel(config.relay.channel_capacity);
    let session = RelaySession::new(settings, connector, emitter, state.shutdown.child_token());

    tracing::info!(session_id = %session.id(), "Downstream consumer attached");
    tokio::spawn(session.run());

    Sse::new(events.map(Ok::<_, Infallible>))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(config.relay.keep_alive_secs)))
}
