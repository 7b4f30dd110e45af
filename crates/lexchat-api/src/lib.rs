pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod prompts;
pub mod router;
pub mod routes;
pub mod state;

pub use router::build_router;
