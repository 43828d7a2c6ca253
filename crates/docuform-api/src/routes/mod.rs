//! Router construction.
//!
//! Template management (`PUT`/`DELETE /api/templates/{name}` and
//! `POST /api/templates/{name}/html`) sits behind [`AuthLayer`]; everything
//! else is public.

pub mod health;
pub mod students;
pub mod templates;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, AuthLayer, StaticTokenValidator};
use crate::state::AppState;
use crate::{Error, Result};

/// Largest accepted request body (template uploads).
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Build the complete router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    let auth = AuthLayer::new(
        Arc::new(StaticTokenValidator::new(
            state.auth_token.clone().unwrap_or_default(),
        )),
        AuthConfig {
            enabled: state.auth_token.is_some(),
        },
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/templates", get(templates::list_templates))
        .route(
            "/templates/{name}",
            get(templates::download_template).merge(
                put(templates::upload_template)
                    .delete(templates::delete_template)
                    .route_layer(auth.clone()),
            ),
        )
        .route(
            "/templates/{name}/html",
            post(templates::save_html_template).route_layer(auth),
        )
        .route("/templates/{name}/fields", get(templates::template_fields))
        .route("/templates/{name}/render", post(templates::render_template))
        .route(
            "/templates/{name}/prefill/{student_id}",
            get(templates::prefill_template),
        )
        .route("/students", get(students::search_students))
        .route("/students/{id}", get(students::get_student));

    Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run CPU-bound template work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("worker task failed: {e}")))?
}
