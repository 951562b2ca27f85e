//! Axum router and all HTTP handlers for sawi-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Read handlers take the reconciler read lock only; the
//! one write route (`POST /v1/readings`) queues onto the push pump.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use sawi_telemetry::{decode_push_frame, Channel, PushFrame};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::{
    api_types::{
        CurrentResponse, ErrorResponse, HealthResponse, IngestResponse, ReadingView,
        RowsResponse, SeriesResponse, StatusResponse,
    },
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/channels/:slug/current", get(channel_current))
        .route("/v1/channels/:slug/series", get(channel_series))
        .route("/v1/rows", get(rows))
        .route("/v1/readings", post(post_reading))
        .route("/v1/stream", get(stream))
        .with_state(state)
}

fn error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

fn resolve_channel(slug: &str) -> Result<Channel, Response> {
    Channel::from_slug(slug)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("unknown channel: {slug}")))
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let rec = st.telemetry.read().await;
    let body = StatusResponse {
        daemon_uptime_secs: uptime_secs(),
        phase: rec.phase().as_str().to_string(),
        cap: rec.cap(),
        soil_len: rec.len(Channel::SoilMoisture),
        air_len: rec.len(Channel::AirTemperature),
    };
    (StatusCode::OK, Json(body))
}

// ---------------------------------------------------------------------------
// GET /v1/channels/:slug/current
// ---------------------------------------------------------------------------

pub(crate) async fn channel_current(
    State(st): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Response {
    let channel = match resolve_channel(&slug) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let rec = st.telemetry.read().await;
    let current = rec.current_value(channel);
    let body = CurrentResponse {
        channel: channel.slug().to_string(),
        phase: rec.phase().as_str().to_string(),
        from_push: rec.latest(channel).is_some(),
        current: current.as_ref().map(ReadingView::from),
    };
    (StatusCode::OK, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/channels/:slug/series
// ---------------------------------------------------------------------------

pub(crate) async fn channel_series(
    State(st): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Response {
    let channel = match resolve_channel(&slug) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let rec = st.telemetry.read().await;
    let readings: Vec<ReadingView> = rec.series(channel).iter().map(ReadingView::from).collect();
    let body = SeriesResponse {
        channel: channel.slug().to_string(),
        cap: rec.cap(),
        len: readings.len(),
        readings,
    };
    (StatusCode::OK, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/rows
// ---------------------------------------------------------------------------

pub(crate) async fn rows(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let rows: Vec<ReadingView> = st
        .telemetry
        .read()
        .await
        .combined_rows()
        .iter()
        .map(ReadingView::from)
        .collect();
    (
        StatusCode::OK,
        Json(RowsResponse {
            len: rows.len(),
            rows,
        }),
    )
}

// ---------------------------------------------------------------------------
// POST /v1/readings
// ---------------------------------------------------------------------------

/// Accept one push frame from a device or relay.
///
/// The frame is queued on the pump like a websocket frame; the handler never
/// touches the reconciler.
pub(crate) async fn post_reading(State(st): State<Arc<AppState>>, body: String) -> Response {
    let frame = match decode_push_frame(&body) {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            debug!("posted frame names no known channel");
            return (
                StatusCode::ACCEPTED,
                Json(IngestResponse {
                    accepted: false,
                    channel: None,
                    readings: 0,
                }),
            )
                .into_response();
        }
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let channel = frame.channel();
    let readings = match &frame {
        PushFrame::Reading(_) => 1,
        PushFrame::Batch(_, rs) => rs.len(),
    };

    if st.feed.send(frame).await.is_err() {
        warn!("push queue closed; rejecting posted frame");
        return error(StatusCode::SERVICE_UNAVAILABLE, "push queue closed");
    }

    info!(%channel, readings, "readings/post queued");
    (
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            accepted: true,
            channel: Some(channel.slug().to_string()),
            readings,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
