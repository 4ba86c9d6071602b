//! Server-side token exchange for the GitHub login.
//!
//! Exchanges an authorization code for an access token using the OAuth app's
//! client secret, so the secret never reaches the web view.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use desk_shell::relay::{RelayConfig, relay_routes};
//!
//! let config = RelayConfig::from_env()?;
//! let app = axum::Router::new().merge(relay_routes(config));
//! ```

mod config;
mod error;
mod routes;
mod state;

pub use config::RelayConfig;
pub use error::RelayError;
pub use routes::relay_routes;
