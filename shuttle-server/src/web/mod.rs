//! Web layer for the shuttle tracker.
//!
//! Serves the arrival board as JSON and as a server-rendered page.

mod dto;
mod routes;
mod state;
pub mod templates;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
pub use templates::*;
