#![doc = include_str!("../README.md")]

#[cfg(feature = "client")]
pub mod auth;
pub mod error;
#[cfg(feature = "client")]
pub mod github;
pub mod guard;
pub mod nav;
#[cfg(feature = "relay")]
pub mod relay;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-exports for convenient access
#[cfg(feature = "client")]
pub use auth::{
    CallbackData, Delivery, GithubAuth, LinkedAccount, LoginOptions, Navigator, Notification,
    Notifier, Platform, Popup, PopupGeometry, ScreenSize, WindowHost, WindowMessage,
};
pub use error::Error;
#[cfg(feature = "client")]
pub use github::{ContentEntry, GithubClient, GithubConfig, Repository};
pub use guard::redirect_for;
pub use nav::{NavCategory, NavEntry, PageCategory, RouteMeta, RouteRecord, build_catalog};
pub use session::{ProfileUpdate, Session, SessionUser};
pub use store::{KvStore, Lookup, StoreDir, StoreError, StoreOptions};
pub use types::{AccessToken, CorrelationId, RemoteIdentity};
