//! Model module.
//!
//! Contains domain entities and repository pattern for data access.

pub mod activity;
pub mod building;
pub mod organization;
pub mod seed;

pub use activity::*;
pub use building::*;
pub use organization::*;
pub use seed::seed_demo_data;
