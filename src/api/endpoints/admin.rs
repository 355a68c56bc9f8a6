//! Admin endpoints.
//!
//! - `GET /admin/`: registered entities
//! - `GET /admin/:entity`: changelist (`q`, `page`, declared filters)
//! - `GET /admin/:entity/:id`: change view with inlines
//! - `POST /admin/:entity/:id/send`: re-dispatch a communication email

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::admin::{ChangeList, ChangeListQuery, ChangeView};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, StaffContext};
use crate::db;
use crate::messaging;
use crate::models::enums::EntityKind;

#[derive(Serialize)]
pub struct AdminEntry {
    pub entity: EntityKind,
    pub url: String,
}

#[derive(Serialize)]
pub struct AdminIndex {
    pub user: String,
    pub entities: Vec<AdminEntry>,
}

#[derive(Serialize)]
pub struct DispatchResponse {
    pub communication_id: i64,
    pub recipients: Vec<String>,
}

/// `GET /admin/`
pub async fn index(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
) -> Json<AdminIndex> {
    let entities = ctx
        .admin
        .entities()
        .map(|entity| AdminEntry {
            entity,
            url: format!("/admin/{entity}/"),
        })
        .collect();
    Json(AdminIndex {
        user: staff.user.email,
        entities,
    })
}

/// `GET /admin/:entity`
pub async fn changelist(
    State(ctx): State<ApiContext>,
    Path(entity): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<ChangeList>, ApiError> {
    let entity = ctx.admin.resolve(&entity)?;
    let query = ChangeListQuery::from_params(params)?;
    let list = ctx.with_db(|conn| Ok(ctx.admin.changelist(conn, entity, &query)?))?;
    Ok(Json(list))
}

/// `GET /admin/:entity/:id`
pub async fn change_view(
    State(ctx): State<ApiContext>,
    Path((entity, id)): Path<(String, i64)>,
) -> Result<Json<ChangeView>, ApiError> {
    let entity = ctx.admin.resolve(&entity)?;
    let view = ctx.with_db(|conn| Ok(ctx.admin.change_view(conn, entity, id)?))?;
    Ok(Json(view))
}

/// `POST /admin/:entity/:id/send`: communications only.
pub async fn send_communication(
    State(ctx): State<ApiContext>,
    Extension(staff): Extension<StaffContext>,
    Path((entity, id)): Path<(String, i64)>,
) -> Result<(StatusCode, Json<DispatchResponse>), ApiError> {
    if ctx.admin.resolve(&entity)? != EntityKind::Communication {
        return Err(ApiError::NotFound(format!("{entity} has no send action")));
    }

    let recipients = ctx.with_db(|conn| {
        let communication = db::get_communication(conn, id)?
            .ok_or_else(|| ApiError::NotFound(format!("communication {id} not found")))?;
        let sent = messaging::send_message(conn, ctx.mailer.as_ref(), &ctx.mail, &communication)?;
        Ok(sent.to)
    })?;

    tracing::info!(communication_id = id, staff_id = staff.user.id, "Communication re-sent");
    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchResponse {
            communication_id: id,
            recipients,
        }),
    ))
}
