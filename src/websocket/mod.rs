// WebSocket module: HTTP routes, the upgrade handler with credential
// extraction, and the per-connection socket loop.

mod connection;
mod handler;
mod routes;

pub use handler::websocket_handler;
pub use routes::{create_router, health_handler, metrics_handler};
