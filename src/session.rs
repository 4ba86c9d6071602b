//! The authenticated local user, mirrored to durable storage.
//!
//! A [`Session`] is created once by the shell (usually via
//! [`Session::hydrate`]) and shared through `Arc`. Every change to the held
//! user is written to the backing store before it becomes visible to
//! subscribers; clearing the user removes the durable copy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::store::{KvStore, Lookup, StoreError};
use crate::types::{AccessToken, RemoteIdentity};

/// Local storage key holding the serialized [`SessionUser`].
pub const CURRENT_USER_KEY: &str = "currentUser";
/// Local storage key caching the raw GitHub access token.
pub const GITHUB_TOKEN_KEY: &str = "gh_token";
/// Local storage key caching the serialized [`RemoteIdentity`].
pub const GITHUB_USER_KEY: &str = "gh_user";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub username: String,
    /// Identity key.
    pub email: String,
    #[serde(default)]
    pub is_github_connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<AccessToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl SessionUser {
    #[must_use]
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            is_github_connected: false,
            github_token: None,
            phone: None,
            address: None,
        }
    }

    fn from_identity(identity: &RemoteIdentity) -> Self {
        Self::new(
            identity.login.clone(),
            identity.email.clone().unwrap_or_default(),
        )
    }
}

/// Partial profile change; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

pub struct Session {
    store: Arc<KvStore>,
    current: watch::Sender<Option<SessionUser>>,
}

impl Session {
    /// Restore the session from `store`.
    ///
    /// A stored user that fails to parse is discarded and the session starts
    /// logged out. Never fails.
    pub async fn hydrate(store: Arc<KvStore>) -> Self {
        let user = match store.get_json::<SessionUser>(CURRENT_USER_KEY) {
            Lookup::Found(user) => Some(user),
            Lookup::NotFound => None,
            Lookup::Failed(e) => {
                tracing::error!(error = %e, "Error parsing stored user");
                if let Err(e) = store.remove(CURRENT_USER_KEY).await {
                    tracing::warn!(error = %e, "Failed to remove unreadable stored user");
                }
                None
            }
        };

        Self {
            store,
            current: watch::Sender::new(user),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }

    #[must_use]
    pub fn current(&self) -> Option<SessionUser> {
        self.current.borrow().clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Observe every change to the held user.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.current.subscribe()
    }

    /// Replace the held user.
    ///
    /// # Errors
    ///
    /// Returns the store error if the user cannot be persisted; the held
    /// user is then unchanged.
    pub async fn login(&self, user: SessionUser) -> Result<(), StoreError> {
        self.store.set_json(CURRENT_USER_KEY, &user).await?;
        self.current.send_replace(Some(user));
        Ok(())
    }

    /// Clear the held user and the cached GitHub credentials.
    ///
    /// The in-memory session is cleared even when removal from the store
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns the first store error hit while removing durable keys.
    pub async fn logout(&self) -> Result<(), StoreError> {
        self.current.send_replace(None);

        let mut first_err = None;
        for key in [CURRENT_USER_KEY, GITHUB_TOKEN_KEY, GITHUB_USER_KEY] {
            if let Err(e) = self.store.remove(key).await
                && first_err.is_none()
            {
                first_err = Some(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Mark the current user as connected to GitHub.
    ///
    /// With no current user, one is created from `identity`.
    ///
    /// # Errors
    ///
    /// Returns the store error if any of the writes fail.
    pub async fn link_github(
        &self,
        token: AccessToken,
        identity: &RemoteIdentity,
    ) -> Result<SessionUser, StoreError> {
        let base = self
            .current()
            .unwrap_or_else(|| SessionUser::from_identity(identity));
        let user = SessionUser {
            is_github_connected: true,
            github_token: Some(token.clone()),
            ..base
        };

        self.store.set(GITHUB_TOKEN_KEY, token.as_str()).await?;
        self.store.set_json(GITHUB_USER_KEY, identity).await?;
        self.login(user.clone()).await?;
        Ok(user)
    }

    /// Merge `update` into the current user.
    ///
    /// Returns `None` when nobody is logged in.
    ///
    /// # Errors
    ///
    /// Returns the store error if the updated user cannot be persisted.
    pub async fn update_profile(
        &self,
        update: ProfileUpdate,
    ) -> Result<Option<SessionUser>, StoreError> {
        let Some(mut user) = self.current() else {
            return Ok(None);
        };

        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        if let Some(address) = update.address {
            user.address = Some(address);
        }

        self.login(user.clone()).await?;
        Ok(Some(user))
    }

    /// Token cached by the last successful GitHub link.
    #[must_use]
    pub fn cached_token(&self) -> Option<AccessToken> {
        self.store
            .get(GITHUB_TOKEN_KEY)
            .into_option()
            .filter(|t| !t.is_empty())
            .map(AccessToken::from)
    }

    /// Remote identity cached by the last successful GitHub link.
    #[must_use]
    pub fn cached_identity(&self) -> Option<RemoteIdentity> {
        self.store.get_json(GITHUB_USER_KEY).into_option()
    }
}
