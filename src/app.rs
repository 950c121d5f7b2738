use std::future::Future;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, State},
    routing::{get, patch},
    Router,
};
use tracing::{error, info, info_span, warn, Instrument};

use crate::handlers;
use crate::metrics::Metrics;
use crate::store::ItemStore;

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: ItemStore,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(store: ItemStore, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    /// Run a store call and record how long it took.
    pub async fn timed<T>(&self, operation: &'static str, call: impl Future<Output = T>) -> T {
        let start = Instant::now();
        let output = call.await;
        self.metrics.observe_db(operation, start.elapsed());
        output
    }
}

/// Item routes under `/items`, mirrored under `/api/grocery-items/` with
/// trailing slashes for the web client.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics));

    for (collection, bulk, member) in [
        ("/items", "/items/update-purchased", "/items/{id}"),
        (
            "/api/grocery-items/",
            "/api/grocery-items/update-purchased/",
            "/api/grocery-items/{id}/",
        ),
    ] {
        app = app
            .route(
                collection,
                get(handlers::list_items)
                    .post(handlers::create_item)
                    .delete(handlers::delete_all_items),
            )
            .route(bulk, patch(handlers::bulk_update_purchased))
            .route(
                member,
                get(handlers::get_item)
                    .patch(handlers::update_item)
                    .delete(handlers::delete_item),
            );
    }

    app.layer(axum::middleware::from_fn_with_state(
        state.clone(),
        http_tracing_middleware,
    ))
    .with_state(state)
}

async fn http_tracing_middleware(
    State(state): State<AppState>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string());

    let route = path.as_deref().unwrap_or("unmatched");

    let span = info_span!(
        "http_request",
        method = %method,
        path = route,
        uri = %uri,
    );

    let start = Instant::now();
    let response = next.run(req).instrument(span.clone()).await;
    let duration = start.elapsed();
    let status = response.status().as_u16();

    state
        .metrics
        .observe_http(method.as_str(), route, status, duration);

    if status >= 500 {
        error!(
            parent: &span,
            method = %method,
            path = route,
            status = status,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    } else if status >= 400 {
        warn!(
            parent: &span,
            method = %method,
            path = route,
            status = status,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    } else {
        info!(
            parent: &span,
            method = %method,
            path = route,
            status = status,
            duration_ms = duration.as_millis(),
            "HTTP request completed"
        );
    }

    response
}
