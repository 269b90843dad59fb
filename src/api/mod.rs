//! API module.
//!
//! Contains HTTP handlers, routes, schemas, documentation and middleware.

pub mod docs;
pub mod handlers;
pub mod middlewares;
pub mod routes;
pub mod schemas;
pub mod state;

pub use handlers::{HealthResponse, ReadinessResponse};
pub use routes::create_routes;
pub use state::AppState;
