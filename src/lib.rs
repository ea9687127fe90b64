pub mod api_router;
pub mod auth;
pub mod employee;
pub mod fixtures;
pub mod org;
pub mod shared;
