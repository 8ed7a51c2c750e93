//! HTTP surface for the challenge handler.
//!
//! Every path and every method is served by the same handler. The
//! challenge is read from the request body of a POST, PUT or PATCH when
//! it is URL-encoded or multipart form data, otherwise from the query
//! string. A body value wins over the query even when it is empty, and
//! only the first occurrence of a repeated key counts.

use super::{ClientInfo, PollenHandler, Reply};
use axum::{
    extract::{ConnectInfo, FromRequest, Multipart, Query, Request, State},
    http::{header, Method},
    response::{IntoResponse, Response},
    Form, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Name of the request parameter holding the challenge.
const CHALLENGE_FIELD: &str = "challenge";

/// Builds the router serving `handler` on every path.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` to
/// get peer addresses in the request logs.
pub fn router(handler: Arc<PollenHandler>) -> Router {
    Router::new()
        .fallback(serve_challenge)
        .with_state(handler)
        .layer(TraceLayer::new_for_http())
}

async fn serve_challenge(
    State(handler): State<Arc<PollenHandler>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
) -> Reply {
    let client = ClientInfo {
        addr: connect_info.map(|ConnectInfo(addr)| addr),
        user_agent: request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    };

    let from_query = Query::<Vec<(String, String)>>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(pairs)| first_challenge(pairs));
    let challenge = body_challenge(request).await.or(from_query);

    handler.handle(challenge.as_deref(), &client).await
}

/// First challenge value among decoded form pairs.
fn first_challenge(pairs: Vec<(String, String)>) -> Option<String> {
    pairs
        .into_iter()
        .find(|(key, _)| key == CHALLENGE_FIELD)
        .map(|(_, value)| value)
}

/// Challenge carried in the request body, if the body is form data.
///
/// A body that cannot be decoded contributes nothing, leaving the query
/// string as the only source.
async fn body_challenge(request: Request) -> Option<String> {
    if ![Method::POST, Method::PUT, Method::PATCH].contains(request.method()) {
        return None;
    }

    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &()).await.ok()?;
        while let Ok(Some(field)) = multipart.next_field().await {
            // File parts are not form values
            if field.name() == Some(CHALLENGE_FIELD) && field.file_name().is_none() {
                return field.text().await.ok();
            }
        }
        None
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .ok()
            .and_then(|Form(pairs)| first_challenge(pairs))
    } else {
        None
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.body(),
        )
            .into_response()
    }
}
