//! Configuration module.

pub mod cache;
pub mod db;
pub mod env;

pub use cache::*;
pub use db::*;
pub use env::*;
