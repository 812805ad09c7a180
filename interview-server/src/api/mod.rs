//! HTTP API handlers for interview-server

pub mod events;
pub mod health;
pub mod interviews;
pub mod questions;
pub mod reports;
pub mod upload;
pub mod users;

pub use events::event_routes;
pub use health::health_routes;
pub use interviews::interview_routes;
pub use questions::question_routes;
pub use reports::report_routes;
pub use users::user_routes;
