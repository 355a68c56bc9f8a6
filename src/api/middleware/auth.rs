//! Staff authentication for admin routes.
//!
//! Reads `Authorization: Basic <base64(email:password)>`, checks it against
//! the user directory, and injects `StaffContext` for downstream handlers.
//! Missing or rejected credentials are answered per the site's
//! `LoginWorkflow`: a 401 challenge, or a 303 to the account login page.

use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use base64::Engine;

use crate::accounts;
use crate::admin::{LoginWorkflow, ACCOUNT_LOGIN_URL};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};

/// Require an active staff account.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_staff(req: Request<axum::body::Body>, next: Next) -> Response {
    let Some(ctx) = req.extensions().get::<ApiContext>().cloned() else {
        return ApiError::Internal("missing API context".into()).into_response();
    };
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    match require_staff_inner(&ctx, req, next).await {
        Ok(resp) => resp,
        Err(ApiError::Unauthorized | ApiError::Forbidden)
            if ctx.admin.login() == LoginWorkflow::Accounts =>
        {
            Redirect::to(&login_redirect(&target)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn require_staff_inner(
    ctx: &ApiContext,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let (email, password) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic)
        .ok_or(ApiError::Unauthorized)?;

    // The connection lock covers the lookup only. PBKDF2 runs on a blocking
    // thread without it, so other requests keep the database meanwhile.
    let user = ctx
        .with_db(|conn| Ok(accounts::find_login_account(conn, &email)?))?
        .ok_or(ApiError::Unauthorized)?;
    let user = tokio::task::spawn_blocking(move || {
        accounts::verify_credentials(&user, &password).map(|ok| ok.then_some(user))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("authentication task: {e}")))??
    .ok_or(ApiError::Unauthorized)?;

    if !user.is_staff {
        tracing::warn!(user_id = user.id, "Non-staff account refused admin access");
        return Err(ApiError::Forbidden);
    }

    req.extensions_mut().insert(StaffContext { user });
    Ok(next.run(req).await)
}

/// `Basic <base64(email:password)>` → `(email, password)`.
fn parse_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}

/// `/accounts/login/?next=<target>`, with the target form-encoded.
pub fn login_redirect(target: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("next", target)
        .finish();
    format!("{ACCOUNT_LOGIN_URL}?{query}")
}
