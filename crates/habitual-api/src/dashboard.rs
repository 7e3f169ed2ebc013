use axum::{Extension, Json, extract::State, response::IntoResponse};

use habitual_types::api::{Claims, Dashboard};

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// GET /dashboard
///
/// Opening the dashboard also derives yesterday's penalties for the caller,
/// so they show up without waiting for the next sweep.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let today = chrono::Utc::now().date_naive();
    let user_id = claims.sub;

    let dashboard = with_db(&state, move |db| {
        let derivation = db.derive_missed_penalties(user_id, today)?;
        Ok(Dashboard {
            profile: db.get_profile(user_id)?,
            habits: db.list_habits(user_id)?,
            groups: db.list_groups(user_id)?,
            penalties: db.list_penalties(user_id)?,
            derivation,
        })
    })
    .await?;

    Ok(Json(dashboard))
}
