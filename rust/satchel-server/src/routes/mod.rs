use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::state::AppState;

mod files;
mod health;
mod resolve;
mod shares;

pub fn router(state: AppState) -> Router {
    // Every handler here takes a `Caller`, so each requires a bearer token
    let owned = Router::new()
        .route("/files", post(files::upload).get(files::list))
        .route(
            "/files/{id}",
            get(files::get).patch(files::rename).delete(files::delete),
        )
        .route("/files/{id}/trash", post(files::trash))
        .route("/files/{id}/shares", get(shares::list_for_file))
        .route("/shares", post(shares::create).get(shares::list))
        .route("/shares/{id}", delete(shares::revoke));

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/s/{id}", get(resolve::resolve))
        .route("/s/{id}/download", get(resolve::download));

    Router::new()
        .merge(owned)
        .merge(public)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(state.limits.request_timeout))
                .layer(DefaultBodyLimit::max(state.limits.max_upload)),
        )
        .with_state(state)
}
