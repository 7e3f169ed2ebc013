use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use anyhow::anyhow;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use habitual_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::{AppState, with_db};

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password(req.password).await?;
    let user_id = Uuid::new_v4();
    let profile = with_db(&state, move |db| {
        db.create_profile(user_id, &req.name, &req.email, &password_hash)
    })
    .await?;

    let token = create_token(&state.jwt_secret, profile.id, &profile.name)?;
    info!("Registered user {}", profile.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: profile.id,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = with_db(&state, move |db| {
        let Some(row) = db.get_profile_row_by_email(&req.email)? else {
            return Ok(None);
        };
        let verified = PasswordHash::new(&row.password)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(req.password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false);
        Ok(verified.then_some(row))
    })
    .await?
    .ok_or(ApiError::Unauthorized)?;

    let token = create_token(&state.jwt_secret, row.id, &row.name)?;

    Ok(Json(LoginResponse {
        user_id: row.id,
        name: row.name,
        token,
    }))
}

/// Argon2id hash, computed on the blocking pool.
async fn hash_password(password: String) -> Result<String, ApiError> {
    let hash = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| anyhow!("cannot hash password: {}", e))
    })
    .await
    .map_err(anyhow::Error::from)??;
    Ok(hash)
}

pub fn create_token(secret: &str, user_id: Uuid, name: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        name: name.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
