use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use habitual_types::api::{Claims, CreateGroupRequest, GroupDetail, JoinGroupRequest};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::{AppState, with_db};

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let groups = with_db(&state, move |db| db.list_groups(claims.sub)).await?;
    Ok(Json(groups))
}

pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = with_db(&state, move |db| db.create_group(&req.name, claims.sub)).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn join_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<JoinGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let group = with_db(&state, move |db| db.join_group(claims.sub, &req.invite_code)).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// Group page: members, penalty suggestions and the group's check-ins.
/// Visible to members only.
pub async fn group_detail(
    State(state): State<AppState>,
    WithRejection(Path(group_id), _): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = with_db(&state, move |db| {
        let group = db.get_group(group_id)?;
        if !db.is_member(claims.sub, group_id)? {
            return Ok(None);
        }
        Ok(Some(GroupDetail {
            group,
            members: db.list_members(group_id)?,
            suggestions: db.list_suggestions(group_id)?,
            check_ins: db.list_group_check_ins(group_id)?,
        }))
    })
    .await?
    .ok_or_else(|| ApiError::Forbidden("not a member of this group".into()))?;

    Ok(Json(detail))
}
