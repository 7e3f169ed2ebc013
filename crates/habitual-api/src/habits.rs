use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;

use habitual_types::api::{Claims, CreateHabitRequest};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::{AppState, with_db};

pub async fn list_habits(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let habits = with_db(&state, move |db| db.list_habits(claims.sub)).await?;
    Ok(Json(habits))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<CreateHabitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let habit = with_db(&state, move |db| db.create_habit(claims.sub, &req.name)).await?;
    Ok((StatusCode::CREATED, Json(habit)))
}
