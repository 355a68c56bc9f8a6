//! Access logging for authenticated routes.
//!
//! Runs innermost, after auth has injected `StaffContext`.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::StaffContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user_id = req.extensions().get::<StaffContext>().map(|s| s.user.id);

    let response = next.run(req).await;

    tracing::info!(
        ?user_id,
        %method,
        path = %path,
        status = response.status().as_u16(),
        "Admin access"
    );
    response
}
