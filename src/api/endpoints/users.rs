//! User detail endpoint, the target of `User::absolute_url`.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::User;

/// `GET /users/:id`: account detail. The password hash is never serialized.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    let user = ctx.with_db(|conn| {
        db::get_user(conn, id)?.ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))
    })?;
    Ok(Json(user))
}
