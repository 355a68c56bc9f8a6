//! HTTP router.
//!
//! Middleware stack on protected routes (outermost → innermost):
//! Extension → staff auth → access log → handler.

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the full router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/users/:id", get(endpoints::users::detail))
        .route("/users/:id/", get(endpoints::users::detail))
        .route("/admin/", get(endpoints::admin::index))
        .route("/admin/:entity", get(endpoints::admin::changelist))
        .route("/admin/:entity/", get(endpoints::admin::changelist))
        .route("/admin/:entity/:id", get(endpoints::admin::change_view))
        .route("/admin/:entity/:id/", get(endpoints::admin::change_view))
        .route(
            "/admin/:entity/:id/send",
            post(endpoints::admin::send_communication),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_staff))
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    Router::new().merge(protected).merge(unprotected)
}
