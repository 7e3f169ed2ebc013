pub mod auth;
pub mod checkins;
pub mod dashboard;
pub mod error;
pub mod extract;
pub mod groups;
pub mod habits;
pub mod middleware;
pub mod penalties;
pub mod profiles;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
