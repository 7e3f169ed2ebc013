use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    CheckIn, DerivationReport, Group, Habit, Member, Penalty, PenaltySuggestion, Profile,
};

// -- JWT Claims --

/// JWT claims issued at login and read back by the auth middleware.
/// `sub` is the request-scoped identity for every protected handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub exp: usize,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageBody {
    pub message: String,
}

// -- Auth / profiles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub name: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub name: String,
}

// -- Habits --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateHabitRequest {
    pub name: String,
}

// -- Groups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinGroupRequest {
    pub invite_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupDetail {
    pub group: Group,
    pub members: Vec<Member>,
    pub suggestions: Vec<PenaltySuggestion>,
    pub check_ins: Vec<CheckIn>,
}

// -- Check-ins --

/// Body of `POST /checkins/create`. Every field is optional raw text on the
/// wire: an absent, null or empty field counts as missing and ids are parsed
/// by the handler, so a bad value is reported as a 400.
#[derive(Debug, Default, Deserialize)]
pub struct CreateCheckInRequest {
    pub user_id: Option<String>,
    pub habit_id: Option<String>,
    pub group_id: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInCreatedResponse {
    pub message: String,
    pub checkin: CheckIn,
}

// -- Penalties --

#[derive(Debug, Default, Deserialize)]
pub struct VoteRequest {
    pub user_id: Option<String>,
    pub suggestion_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub message: String,
    pub votes: i64,
}

#[derive(Debug, Deserialize)]
pub struct VoteCountQuery {
    pub suggestion_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VoteCountResponse {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuggestPenaltyRequest {
    pub text: String,
    pub target_user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeriveRequest {
    pub as_of: Option<NaiveDate>,
}

// -- Dashboard --

#[derive(Debug, Serialize, Deserialize)]
pub struct Dashboard {
    pub profile: Profile,
    pub habits: Vec<Habit>,
    pub groups: Vec<Group>,
    pub penalties: Vec<Penalty>,
    pub derivation: DerivationReport,
}
