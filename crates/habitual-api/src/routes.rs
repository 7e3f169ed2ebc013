use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, checkins, dashboard, groups, habits, penalties, profiles};

/// Every HTTP route. Everything except auth and health sits behind
/// `require_auth`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/profile", get(profiles::get_profile).patch(profiles::update_profile))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/habits", get(habits::list_habits).post(habits::create_habit))
        .route("/groups", get(groups::list_groups).post(groups::create_group))
        .route("/groups/join", post(groups::join_group))
        .route("/groups/{group_id}", get(groups::group_detail))
        .route("/groups/{group_id}/suggestions", post(penalties::suggest_penalty))
        .route("/checkins", get(checkins::list_check_ins))
        .route("/checkins/create", post(checkins::create_check_in))
        .route("/penalties", get(penalties::list_penalties))
        .route("/penalties/vote", get(penalties::vote_count).post(penalties::cast_vote))
        .route("/penalties/derive", post(penalties::derive_penalties))
        .route("/penalties/{penalty_id}/complete", post(penalties::complete_penalty))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> &'static str {
    "ok"
}
