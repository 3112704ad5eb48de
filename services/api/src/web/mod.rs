pub mod assistants;
pub mod auth;
pub mod chats;
pub mod middleware;
pub mod rest;
pub mod settings;
pub mod state;
pub mod views;

// Re-export what the binaries need to build the web server.
pub use middleware::require_auth;
pub use rest::{router, ApiDoc};
pub use state::AppState;
