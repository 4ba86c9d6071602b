//! GitHub login through an authorization popup.
//!
//! The flow runs `idle → awaiting-authorization → exchanging-code →
//! fetching-identity → linked | failed`:
//!
//! 1. [`GithubAuth::login`] opens a centered popup on the authorization URL
//!    and parks a single-slot listener keyed by a fresh correlation token.
//! 2. The shell forwards the callback page's message to
//!    [`GithubAuth::deliver`]. The listener is consumed by the first message,
//!    whatever it contains.
//! 3. The code is exchanged through the relay, the identity is fetched and
//!    both are merged into the [`Session`].
//!
//! The login gives up when the popup is closed or after the absolute timeout.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use url::Url;

use crate::error::Error;
use crate::github::{GithubClient, Repository};
use crate::session::Session;
use crate::types::{AccessToken, CorrelationId, RemoteIdentity};

const POPUP_NAME: &str = "github-oauth";
const POPUP_WIDTH: u32 = 600;
const POPUP_HEIGHT: u32 = 700;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupGeometry {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl PopupGeometry {
    /// A `width` x `height` window centered on `screen`.
    #[must_use]
    pub fn centered(screen: ScreenSize, width: u32, height: u32) -> Self {
        let offset = |total: u32, size: u32| (i64::from(total) / 2 - i64::from(size) / 2) as i32;
        Self {
            width,
            height,
            left: offset(screen.width, width),
            top: offset(screen.height, height),
        }
    }

    /// `window.open` feature string.
    #[must_use]
    pub fn features(&self) -> String {
        format!(
            "width={},height={},top={},left={}",
            self.width, self.height, self.top, self.left
        )
    }
}

/// Handle to an open popup window.
pub trait Popup: Send + Sync {
    fn is_closed(&self) -> bool;
    fn close(&self);
}

/// Window management of the hosting web view.
pub trait WindowHost: Send + Sync + 'static {
    fn screen_size(&self) -> ScreenSize;

    /// Open a popup. `None` means the platform refused (popup blocked).
    fn open_popup(&self, url: &Url, name: &str, geometry: PopupGeometry) -> Option<Box<dyn Popup>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    #[must_use]
    pub fn success(body: impl Into<String>) -> Self {
        Self {
            title: "Success".into(),
            body: body.into(),
        }
    }

    #[must_use]
    pub fn failure(body: impl Into<String>) -> Self {
        Self {
            title: "Error".into(),
            body: body.into(),
        }
    }
}

/// Desktop notification sink.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

/// Client-side router.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, path: &str);
}

/// Platform collaborators the login flow drives.
#[derive(Clone)]
pub struct Platform {
    pub host: Arc<dyn WindowHost>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

/// A cross-window message as received by the opener.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowMessage {
    pub origin: String,
    #[serde(default)]
    pub data: CallbackData,
}

/// Payload posted by the callback page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackData {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What [`GithubAuth::deliver`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the pending login.
    Accepted,
    /// Came from a foreign origin. The listener is gone; the login keeps
    /// waiting for timeout or popup close.
    OriginRejected,
    /// No login is listening.
    NoListener,
}

#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub landing_path: String,
}

impl Default for LoginOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(1),
            landing_path: "/dashboard".into(),
        }
    }
}

impl LoginOptions {
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_landing_path(mut self, path: impl Into<String>) -> Self {
        self.landing_path = path.into();
        self
    }
}

/// Outcome of a successful login.
#[derive(Debug, Clone)]
pub struct LinkedAccount {
    pub identity: RemoteIdentity,
    pub access_token: AccessToken,
}

struct PendingLogin {
    correlation: CorrelationId,
    listener: Option<oneshot::Sender<CallbackData>>,
}

/// Clears the pending slot however the login future ends.
struct PendingGuard<'a>(&'a Mutex<Option<PendingLogin>>);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().take();
    }
}

pub struct GithubAuth {
    client: GithubClient,
    session: Arc<Session>,
    platform: Platform,
    options: LoginOptions,
    pending: Mutex<Option<PendingLogin>>,
}

impl GithubAuth {
    #[must_use]
    pub fn new(client: GithubClient, session: Arc<Session>, platform: Platform) -> Self {
        Self {
            client,
            session,
            platform,
            options: LoginOptions::default(),
            pending: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: LoginOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn client(&self) -> &GithubClient {
        &self.client
    }

    #[must_use]
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// True while a login is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// True while a login is waiting for its callback message.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|p| p.listener.is_some())
    }

    /// Run one GitHub login.
    ///
    /// # Errors
    ///
    /// - [`Error::LoginInProgress`] if another login is pending
    /// - [`Error::PopupBlocked`] if the popup could not be opened
    /// - [`Error::WindowClosed`] / [`Error::TimedOut`] on user cancellation
    /// - [`Error::Callback`], [`Error::StateMismatch`], [`Error::MissingCode`]
    ///   for a bad callback message
    /// - transport or remote errors from the exchange or identity fetch, after
    ///   the session has been cleared
    pub async fn login(&self) -> Result<LinkedAccount, Error> {
        let correlation = CorrelationId::generate();
        let url = self.client.authorization_url(&correlation);
        let (tx, rx) = oneshot::channel();

        let popup = {
            let mut pending = self.pending.lock();
            if pending.is_some() {
                return Err(Error::LoginInProgress);
            }

            let geometry = PopupGeometry::centered(
                self.platform.host.screen_size(),
                POPUP_WIDTH,
                POPUP_HEIGHT,
            );
            let Some(popup) = self.platform.host.open_popup(&url, POPUP_NAME, geometry) else {
                tracing::warn!("GitHub authorization popup was blocked");
                return Err(Error::PopupBlocked);
            };

            *pending = Some(PendingLogin {
                correlation: correlation.clone(),
                listener: Some(tx),
            });
            popup
        };
        let _guard = PendingGuard(&self.pending);

        tracing::debug!(state = %correlation, "Awaiting GitHub authorization");

        let data = match self.await_callback(rx, popup.as_ref()).await {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!(reason = %e, "GitHub login cancelled");
                return Err(e);
            }
        };

        self.complete(&correlation, data, popup.as_ref()).await
    }

    /// Hand a cross-window message to the pending login.
    ///
    /// The listener is removed before anything else, so at most one message
    /// is processed per login.
    pub fn deliver(&self, message: WindowMessage) -> Delivery {
        let listener = self
            .pending
            .lock()
            .as_mut()
            .and_then(|p| p.listener.take());
        let Some(listener) = listener else {
            tracing::debug!(origin = %message.origin, "No GitHub login listening for message");
            return Delivery::NoListener;
        };

        if message.origin != self.client.config().app_origin() {
            tracing::warn!(origin = %message.origin, "Invalid origin for auth message");
            return Delivery::OriginRejected;
        }

        if listener.send(message.data).is_err() {
            tracing::debug!("GitHub login stopped waiting before message arrived");
        }
        Delivery::Accepted
    }

    /// One page of the linked account's repositories.
    ///
    /// The session user's token wins over the cached `gh_token`. Without a
    /// token, or when GitHub fails, this degrades to an empty list.
    pub async fn fetch_repos(&self, page: u32, per_page: u32) -> Vec<Repository> {
        let token = self
            .session
            .current()
            .and_then(|u| u.github_token)
            .filter(|t| !t.as_str().is_empty())
            .or_else(|| self.session.cached_token());
        let Some(token) = token else {
            tracing::warn!("No GitHub token available");
            return Vec::new();
        };

        match self.client.list_repos(&token, page, per_page).await {
            Ok(repos) => repos,
            Err(e) => {
                tracing::error!(error = %e, "Error fetching repositories");
                self.platform
                    .notifier
                    .notify(Notification::failure("Failed to fetch GitHub repositories"));
                Vec::new()
            }
        }
    }

    async fn await_callback(
        &self,
        mut rx: oneshot::Receiver<CallbackData>,
        popup: &dyn Popup,
    ) -> Result<CallbackData, Error> {
        let deadline = tokio::time::sleep(self.options.timeout);
        tokio::pin!(deadline);
        let mut poll = tokio::time::interval(self.options.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut listening = true;

        loop {
            tokio::select! {
                biased;

                received = &mut rx, if listening => match received {
                    Ok(data) => return Ok(data),
                    // listener dropped by `deliver` (foreign origin)
                    Err(_) => listening = false,
                },
                () = &mut deadline => {
                    self.remove_listener();
                    return Err(Error::TimedOut);
                }
                _ = poll.tick() => {
                    if popup.is_closed() {
                        self.remove_listener();
                        return Err(Error::WindowClosed);
                    }
                }
            }
        }
    }

    async fn complete(
        &self,
        correlation: &CorrelationId,
        data: CallbackData,
        popup: &dyn Popup,
    ) -> Result<LinkedAccount, Error> {
        if let Some(error) = data.error {
            tracing::error!(error = %error, "Authentication error from callback");
            self.platform
                .notifier
                .notify(Notification::failure(error.clone()));
            close_popup(popup);
            return Err(Error::Callback(error));
        }

        if data.state.as_deref() != Some(correlation.as_str()) {
            tracing::warn!("OAuth state mismatch");
            close_popup(popup);
            return Err(Error::StateMismatch);
        }

        let Some(code) = data.code.filter(|c| !c.is_empty()) else {
            tracing::error!("No code received in callback");
            close_popup(popup);
            return Err(Error::MissingCode);
        };

        match self.link(&code).await {
            Ok(linked) => {
                tracing::info!(login = %linked.identity.login, "GitHub account linked");
                self.platform
                    .notifier
                    .notify(Notification::success("Successfully authenticated with GitHub"));
                close_popup(popup);
                self.platform.navigator.navigate(&self.options.landing_path);
                Ok(linked)
            }
            Err(e) => {
                tracing::error!(error = %e, "GitHub authentication failed");
                if let Err(store_err) = self.session.logout().await {
                    tracing::warn!(error = %store_err, "Session reset failed after auth error");
                }
                self.platform
                    .notifier
                    .notify(Notification::failure(e.to_string()));
                close_popup(popup);
                Err(e)
            }
        }
    }

    async fn link(&self, code: &str) -> Result<LinkedAccount, Error> {
        tracing::debug!("Exchanging code for token");
        let access_token = self.client.exchange_code(code).await?;

        tracing::debug!("Fetching GitHub user info");
        let identity = self.client.get_user(&access_token).await?;

        self.session
            .link_github(access_token.clone(), &identity)
            .await?;

        Ok(LinkedAccount {
            identity,
            access_token,
        })
    }

    fn remove_listener(&self) {
        if let Some(pending) = self.pending.lock().as_mut() {
            pending.listener = None;
        }
    }
}

fn close_popup(popup: &dyn Popup) {
    if !popup.is_closed() {
        popup.close();
    }
}
