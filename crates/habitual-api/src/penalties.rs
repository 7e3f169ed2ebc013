use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use habitual_db::StoreError;
use habitual_types::api::{
    Claims, DeriveRequest, MessageBody, SuggestPenaltyRequest, VoteCountQuery, VoteCountResponse,
    VoteRequest, VoteResponse,
};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, optional_id};
use crate::state::{AppState, with_db};

/// POST /penalties/vote
///
/// A repeat vote answers 400 with `{ "message": "Already voted" }`, which is
/// what existing clients look for.
pub async fn cast_vote(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<VoteRequest>,
) -> Result<Response, ApiError> {
    let user_id = optional_id(req.user_id.as_deref(), "user_id")?;
    let suggestion_id = optional_id(req.suggestion_id.as_deref(), "suggestion_id")?;
    let (Some(user_id), Some(suggestion_id)) = (user_id, suggestion_id) else {
        return Err(ApiError::Validation(
            "Missing required fields: user_id and suggestion_id".into(),
        ));
    };
    if user_id != claims.sub {
        return Err(ApiError::Forbidden(
            "user_id does not match the authenticated user".into(),
        ));
    }

    match with_db(&state, move |db| db.cast_vote(user_id, suggestion_id)).await {
        Ok(votes) => Ok(Json(VoteResponse {
            message: "Vote cast successfully".into(),
            votes,
        })
        .into_response()),
        Err(ApiError::Store(StoreError::Conflict(message))) => {
            Ok((StatusCode::BAD_REQUEST, Json(MessageBody { message })).into_response())
        }
        Err(e) => Err(e),
    }
}

/// GET /penalties/vote?suggestion_id=...
///
/// Only members of the suggestion's group may read its count. An unknown
/// suggestion reads as zero.
pub async fn vote_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Query(query), _): ApiQuery<VoteCountQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestion_id = optional_id(query.suggestion_id.as_deref(), "suggestion_id")?
        .ok_or_else(|| ApiError::Validation("Missing suggestion_id".into()))?;

    let count = with_db(&state, move |db| match db.suggestion_group(suggestion_id)? {
        Some(group_id) if !db.is_member(claims.sub, group_id)? => Err(StoreError::Forbidden(
            "only group members can see its vote counts".into(),
        )),
        _ => db.get_vote_count(suggestion_id),
    })
    .await?;
    Ok(Json(VoteCountResponse { count }))
}

/// POST /groups/{group_id}/suggestions
pub async fn suggest_penalty(
    State(state): State<AppState>,
    WithRejection(Path(group_id), _): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<SuggestPenaltyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestion = with_db(&state, move |db| {
        db.suggest_penalty(group_id, claims.sub, &req.text, req.target_user_id)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(suggestion)))
}

pub async fn list_penalties(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let penalties = with_db(&state, move |db| db.list_penalties(claims.sub)).await?;
    Ok(Json(penalties))
}

pub async fn complete_penalty(
    State(state): State<AppState>,
    WithRejection(Path(penalty_id), _): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let penalty = with_db(&state, move |db| db.complete_penalty(claims.sub, penalty_id)).await?;
    Ok(Json(penalty))
}

/// POST /penalties/derive?as_of=YYYY-MM-DD
///
/// Runs the missed check-in derivation for the caller. `as_of` defaults to
/// today (UTC); the derivation looks at the day before it.
pub async fn derive_penalties(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Query(req), _): ApiQuery<DeriveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let as_of = req
        .as_of
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let report = with_db(&state, move |db| db.derive_missed_penalties(claims.sub, as_of)).await?;
    Ok(Json(report))
}
