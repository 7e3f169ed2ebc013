use axum::{Extension, Json, extract::State, response::IntoResponse};
use axum_extra::extract::WithRejection;

use habitual_types::api::{Claims, UpdateProfileRequest};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::{AppState, with_db};

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = with_db(&state, move |db| db.get_profile(claims.sub)).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = with_db(&state, move |db| db.update_profile_name(claims.sub, &req.name)).await?;
    Ok(Json(profile))
}
