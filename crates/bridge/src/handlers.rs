use axum::{Json, extract::State, http::HeaderMap, response::Html};
use sextant_provider::ProviderEvent;
use tracing::{debug, trace};

use crate::{
    app::contents,
    state::BridgeState,
    types::{ApiResponse, WalletEvent, WireRequest, WireResponse},
};

/// Serves the embedded wallet page.
pub(crate) async fn serve_index() -> impl axum::response::IntoResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/html; charset=utf-8"),
    );
    (headers, Html(contents::INDEX_HTML))
}

/// Hands the oldest queued wallet call to the polling page.
pub(crate) async fn next_request(State(state): State<BridgeState>) -> Json<ApiResponse<WireRequest>> {
    match state.next_request() {
        Some(request) => {
            trace!(
                target: "relay",
                id = %request.id,
                method = request.call.method(),
                "handing request to wallet page"
            );
            Json(ApiResponse::Ok(request))
        }
        None => Json(ApiResponse::err("no pending request")),
    }
}

/// Accepts the wallet's answer to a previously collected call.
pub(crate) async fn post_response(
    State(state): State<BridgeState>,
    Json(response): Json<WireResponse>,
) -> Json<ApiResponse<()>> {
    let id = response.id;
    if state.resolve(response) {
        trace!(target: "relay", %id, "wallet response delivered");
        Json(ApiResponse::Ok(()))
    } else {
        debug!(target: "relay", %id, "response for unknown request id");
        Json(ApiResponse::err("unknown request id"))
    }
}

/// Accepts a wallet notification and forwards it to the session side.
pub(crate) async fn post_event(
    State(state): State<BridgeState>,
    Json(event): Json<WalletEvent>,
) -> Json<ApiResponse<()>> {
    let event = ProviderEvent::from(event);
    trace!(target: "relay", ?event, "wallet event");
    state.push_event(event);
    Json(ApiResponse::Ok(()))
}

/// Liveness check for the wallet page.
pub(crate) async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::Ok("ok"))
}
