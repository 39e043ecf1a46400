//! HTTP surface: the station upload hook and the dashboard.

pub mod handlers;
pub mod router;
pub mod schemas;

pub use router::create_router;
pub use schemas::AppState;
