//! Administrative HTTP surface.
//!
//! JSON over axum. `/health` is open; user detail and every `/admin/` route
//! sit behind staff authentication (HTTP Basic against the user directory).

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, shutdown_signal};
pub use types::ApiContext;
