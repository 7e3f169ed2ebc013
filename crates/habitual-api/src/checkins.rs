use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use uuid::Uuid;

use habitual_types::api::{CheckInCreatedResponse, Claims, CreateCheckInRequest};
use habitual_types::models::{CheckInStatus, CheckInTarget};

use crate::error::ApiError;
use crate::extract::{ApiJson, optional_id};
use crate::state::{AppState, with_db};

const MISSING_FIELDS: &str = "Missing required fields: user_id, date, and habit_id or group_id";

/// A validated `POST /checkins/create` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCheckIn {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub target: CheckInTarget,
    pub status: CheckInStatus,
}

impl TryFrom<CreateCheckInRequest> for NewCheckIn {
    type Error = ApiError;

    fn try_from(req: CreateCheckInRequest) -> Result<Self, Self::Error> {
        let missing = || ApiError::Validation(MISSING_FIELDS.into());

        let user_id = optional_id(req.user_id.as_deref(), "user_id")?.ok_or_else(missing)?;
        let habit_id = optional_id(req.habit_id.as_deref(), "habit_id")?;
        let group_id = optional_id(req.group_id.as_deref(), "group_id")?;
        let raw_date = req
            .date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(missing)?;
        let target = CheckInTarget::from_parts(habit_id, group_id).ok_or_else(missing)?;

        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d")
            .map_err(|_| ApiError::Validation(format!("invalid date: {raw_date}")))?;

        // An empty status falls back to the default, like an absent one.
        let status = match req.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<CheckInStatus>()
                .map_err(|e| ApiError::Validation(e.to_string()))?,
            None => CheckInStatus::default(),
        };

        Ok(Self {
            user_id,
            date,
            target,
            status,
        })
    }
}

/// POST /checkins/create
pub async fn create_check_in(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    WithRejection(Json(req), _): ApiJson<CreateCheckInRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new = NewCheckIn::try_from(req)?;
    if new.user_id != claims.sub {
        return Err(ApiError::Forbidden(
            "user_id does not match the authenticated user".into(),
        ));
    }

    let checkin = with_db(&state, move |db| {
        db.record_check_in(new.user_id, new.date, new.target, new.status)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckInCreatedResponse {
            message: "Check-in created".into(),
            checkin,
        }),
    ))
}

pub async fn list_check_ins(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let check_ins = with_db(&state, move |db| db.list_check_ins(claims.sub)).await?;
    Ok(Json(check_ins))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateCheckInRequest {
        CreateCheckInRequest {
            user_id: Some(Uuid::new_v4().to_string()),
            habit_id: Some(Uuid::new_v4().to_string()),
            group_id: None,
            date: Some("2025-06-01".into()),
            status: None,
        }
    }

    #[test]
    fn status_defaults_to_done() {
        let new = NewCheckIn::try_from(request()).unwrap();
        assert_eq!(new.status, CheckInStatus::Done);

        let new = NewCheckIn::try_from(CreateCheckInRequest {
            status: Some("".into()),
            ..request()
        })
        .unwrap();
        assert_eq!(new.status, CheckInStatus::Done);
    }

    #[test]
    fn missing_fields_are_rejected() {
        let no_user = CreateCheckInRequest {
            user_id: None,
            ..request()
        };
        let no_date = CreateCheckInRequest {
            date: Some("  ".into()),
            ..request()
        };
        let no_target = CreateCheckInRequest {
            habit_id: None,
            group_id: None,
            ..request()
        };
        let blank_user = CreateCheckInRequest {
            user_id: Some("".into()),
            ..request()
        };
        let blank_target = CreateCheckInRequest {
            habit_id: Some("".into()),
            group_id: Some(" ".into()),
            ..request()
        };

        for req in [no_user, no_date, no_target, blank_user, blank_target] {
            match NewCheckIn::try_from(req) {
                Err(ApiError::Validation(msg)) => assert_eq!(msg, MISSING_FIELDS),
                other => panic!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn malformed_date_and_status_are_rejected() {
        let bad_date = CreateCheckInRequest {
            date: Some("06/01/2025".into()),
            ..request()
        };
        assert!(matches!(
            NewCheckIn::try_from(bad_date),
            Err(ApiError::Validation(_))
        ));

        let bad_status = CreateCheckInRequest {
            status: Some("late".into()),
            ..request()
        };
        assert!(matches!(
            NewCheckIn::try_from(bad_status),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn blank_group_alongside_a_habit_is_ignored() {
        let req = request();
        let habit_id: Uuid = req.habit_id.as_deref().unwrap().parse().unwrap();
        let new = NewCheckIn::try_from(CreateCheckInRequest {
            group_id: Some("".into()),
            ..req
        })
        .unwrap();
        assert_eq!(
            new.target,
            CheckInTarget::Habit {
                habit_id,
                group_id: None
            }
        );

        let bad_group = CreateCheckInRequest {
            group_id: Some("G1".into()),
            ..request()
        };
        assert!(matches!(
            NewCheckIn::try_from(bad_group),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn group_only_target() {
        let group_id = Uuid::new_v4();
        let new = NewCheckIn::try_from(CreateCheckInRequest {
            habit_id: None,
            group_id: Some(group_id.to_string()),
            status: Some("skipped".into()),
            ..request()
        })
        .unwrap();
        assert_eq!(new.target, CheckInTarget::Group { group_id });
        assert_eq!(new.status, CheckInStatus::Skipped);
    }
}
