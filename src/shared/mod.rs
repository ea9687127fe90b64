pub mod config;
pub mod dates;
pub mod error;
pub mod schema;
pub mod state;
pub mod utils;
