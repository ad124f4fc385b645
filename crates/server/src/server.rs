use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
    typed_header::TypedHeaderRejection,
};
use tracing::Instrument;
use uuid::Uuid;

use std::{future::Future, sync::Arc, time::Instant};

use crate::{health, transactions};
use engine::{Engine, RequestContext};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

static X_REQUEST_ID: HeaderName = HeaderName::from_static(REQUEST_ID_HEADER);

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

/// `TypedHeader` for the request correlation ID.
///
/// Blank or non-ASCII values fail to decode and get replaced by a fresh ID.
#[derive(Debug)]
struct XRequestId(String);

impl Header for XRequestId {
    fn name() -> &'static HeaderName {
        &X_REQUEST_ID
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(AxumError::invalid());
        }

        Ok(XRequestId(value.to_string()))
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        match HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-request-id header"),
        }
    }
}

/// Assigns the request ID, hands it to the handlers as a [`RequestContext`]
/// and echoes it on the response.
async fn request_context(
    request_id: Result<TypedHeader<XRequestId>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = match request_id {
        Ok(TypedHeader(XRequestId(id))) => id,
        Err(_) => Uuid::new_v4().to_string(),
    };
    let span = tracing::info_span!("request", request_id = %request_id);

    async move {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();
        tracing::info!(%method, %path, "request received");

        request
            .extensions_mut()
            .insert(RequestContext::new(request_id.clone()));
        let mut response = next.run(request).await;

        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(X_REQUEST_ID.clone(), value);
        }
        tracing::info!(
            %method,
            %path,
            status = response.status().as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "response sent"
        );
        response
    }
    .instrument(span)
    .await
}

pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };

    Router::new()
        .route("/transactions", post(transactions::create))
        .route("/transactions/{id}", get(transactions::get))
        .route("/transactions/{id}/convert", get(transactions::convert))
        .route("/health", get(health::health))
        .layer(middleware::from_fn(request_context))
        .with_state(state)
}

/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn run_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(shutdown)
        .await
}

pub fn spawn_with_listener(
    engine: Arc<Engine>,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener, std::future::pending()).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
