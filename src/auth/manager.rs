use super::identity::IdentityClient;
use super::redirect::has_response_artifacts;
use super::{Session, SessionPhase, TokenOutcome};
use crate::error::IdentityError;
use crate::models::{Account, TokenRequest};
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use url::Url;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub request: TokenRequest,
    /// Location of the current page load, possibly carrying a redirect response
    pub page_url: Url,
    /// Ceiling for waiting on another caller's redirect processing
    pub redirect_wait: Duration,
}

/// Flags for one page load, published to subscribers on every change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub account: Option<Account>,
    pub initialized: bool,
    /// Page-load flow has not settled yet
    pub initializing: bool,
    pub redirect_processing: bool,
    /// The page URL's redirect response has been consumed
    pub redirect_handled: bool,
    pub interaction_locked: bool,
    pub has_redirected_once: bool,
    pub redirecting: bool,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        if self.redirecting {
            SessionPhase::Redirecting
        } else if self.redirect_processing {
            SessionPhase::ProcessingRedirect
        } else if self.initializing {
            SessionPhase::Initializing
        } else if self.account.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }
}

/// Clears `redirect_processing` when dropped, so every exit path releases waiters.
struct RedirectProcessing<'a> {
    state: &'a watch::Sender<SessionState>,
}

impl Drop for RedirectProcessing<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| {
            s.redirect_processing = false;
            s.redirect_handled = true;
        });
    }
}

/// Session state machine on top of a redirect-based identity client
pub struct SessionManager<C> {
    client: C,
    settings: SessionSettings,
    setup: OnceCell<()>,
    state: watch::Sender<SessionState>,
}

impl<C: IdentityClient> SessionManager<C> {
    pub fn new(client: C, settings: SessionSettings) -> Self {
        let account = client.all_accounts().into_iter().next();
        let (state, _) = watch::channel(SessionState {
            account,
            initializing: true,
            ..SessionState::default()
        });

        Self {
            client,
            settings,
            setup: OnceCell::new(),
            state,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    async fn ensure_initialized(&self) {
        self.setup
            .get_or_init(|| async {
                match self.client.initialize().await {
                    Ok(()) => tracing::debug!("Identity client initialized"),
                    // Degraded but usable; interactive calls set up lazily
                    Err(e) => tracing::warn!("Identity client initialize failed: {}", e),
                }
                self.state.send_modify(|s| s.initialized = true);
            })
            .await;
    }

    /// Block until no redirect response is being processed, up to the ceiling
    async fn wait_for_redirect_processing(&self) {
        let mut rx = self.state.subscribe();
        let timed_out = tokio::time::timeout(
            self.settings.redirect_wait,
            rx.wait_for(|s| !s.redirect_processing),
        )
        .await
        .is_err();

        if timed_out {
            tracing::debug!(
                "Redirect processing still running after {:?}; continuing",
                self.settings.redirect_wait
            );
        }
    }

    /// Parse the page URL's redirect response at most once per page load
    async fn consume_redirect_response(&self) {
        let claimed = self.state.send_if_modified(|s| {
            if s.redirect_processing || s.redirect_handled {
                return false;
            }
            s.redirect_processing = true;
            true
        });
        if !claimed {
            return;
        }
        let _processing = RedirectProcessing { state: &self.state };

        match self
            .client
            .handle_redirect_response(&self.settings.page_url)
            .await
        {
            Ok(Some(result)) => {
                tracing::info!("Redirect response accepted for {}", result.account.username);
                self.state.send_modify(|s| {
                    s.account = Some(result.account);
                    s.redirecting = false;
                    s.interaction_locked = false;
                });
            }
            Ok(None) => tracing::debug!("No redirect response in page URL"),
            Err(e) => tracing::warn!("Failed to process redirect response: {}", e),
        }
    }

    fn try_lock_interaction(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.interaction_locked {
                return false;
            }
            s.interaction_locked = true;
            s.has_redirected_once = true;
            s.redirecting = true;
            true
        })
    }

    fn release_interaction(&self) {
        self.state.send_modify(|s| {
            s.interaction_locked = false;
            s.redirecting = false;
        });
    }

    fn log_dispatch_error(action: &str, err: &IdentityError) {
        if err.is_interaction_in_progress() {
            tracing::debug!("{}: interaction already in progress", action);
        } else {
            tracing::error!("{} failed: {}", action, err);
        }
    }

    /// A benign in-progress error keeps the lock; anything else releases it
    fn dispatch_failed(&self, action: &str, err: IdentityError) {
        Self::log_dispatch_error(action, &err);
        if !err.is_interaction_in_progress() {
            self.release_interaction();
        }
    }

    /// The session's own account wins; a silent refresh may have rotated it
    fn active_account(&self) -> Option<Account> {
        let current = self.state.borrow().account.clone();
        current.or_else(|| self.client.all_accounts().into_iter().next())
    }
}

#[async_trait]
impl<C: IdentityClient> Session for SessionManager<C> {
    fn is_authenticated(&self) -> bool {
        self.state.borrow().account.is_some()
    }

    fn account(&self) -> Option<Account> {
        self.state.borrow().account.clone()
    }

    fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    async fn start(&self) -> SessionPhase {
        self.ensure_initialized().await;
        self.wait_for_redirect_processing().await;
        self.consume_redirect_response().await;

        if !self.is_authenticated() {
            if let Some(account) = self.client.all_accounts().into_iter().next() {
                tracing::debug!("Using cached account {}", account.username);
                self.state.send_modify(|s| s.account = Some(account));
            }
        }

        if self.is_authenticated() {
            self.state.send_modify(|s| {
                s.initializing = false;
                s.redirecting = false;
                s.interaction_locked = false;
            });
            return self.phase();
        }

        let first_redirect = self.state.send_if_modified(|s| {
            if s.has_redirected_once || s.interaction_locked {
                return false;
            }
            s.has_redirected_once = true;
            s.interaction_locked = true;
            s.redirecting = true;
            true
        });

        if first_redirect {
            tracing::info!("No account found; redirecting to sign-in");
            if let Err(e) = self.client.login_redirect(&self.settings.request).await {
                Self::log_dispatch_error("Sign-in redirect", &e);
                self.state.send_modify(|s| {
                    s.initializing = false;
                    s.redirecting = false;
                    s.interaction_locked = false;
                });
            }
        } else {
            self.state.send_modify(|s| s.initializing = false);
        }

        self.phase()
    }

    async fn login(&self) {
        self.ensure_initialized().await;

        let processing = self.state.borrow().redirect_processing;
        if processing || has_response_artifacts(&self.settings.page_url) {
            tracing::debug!("Skipping sign-in redirect: a redirect response is being processed");
            return;
        }
        if !self.try_lock_interaction() {
            tracing::debug!("Skipping sign-in redirect: interactive flow already locked");
            return;
        }

        if let Err(e) = self.client.login_redirect(&self.settings.request).await {
            self.dispatch_failed("Sign-in redirect", e);
        }
    }

    async fn logout(&self) {
        self.ensure_initialized().await;

        match self.client.logout_redirect(self.account()).await {
            Ok(()) => self.state.send_modify(|s| s.account = None),
            Err(e) => Self::log_dispatch_error("Sign-out redirect", &e),
        }
    }

    async fn acquire_token(&self) -> TokenOutcome {
        self.ensure_initialized().await;
        self.wait_for_redirect_processing().await;
        self.consume_redirect_response().await;

        let Some(account) = self.active_account() else {
            if self.try_lock_interaction() {
                tracing::info!("No account available; redirecting to sign-in");
                if let Err(e) = self.client.login_redirect(&self.settings.request).await {
                    self.dispatch_failed("Sign-in redirect", e);
                }
            } else {
                tracing::debug!("Interactive flow already locked");
            }
            return TokenOutcome::Redirecting;
        };

        match self
            .client
            .acquire_token_silent(&self.settings.request, &account)
            .await
        {
            Ok(result) => {
                let token = result.access_token;
                self.state.send_modify(|s| s.account = Some(result.account));
                TokenOutcome::Ready(token)
            }
            Err(silent_err) => {
                tracing::debug!("Silent token acquisition failed: {}", silent_err);
                if self.try_lock_interaction() {
                    if let Err(e) = self
                        .client
                        .acquire_token_redirect(&self.settings.request, &account)
                        .await
                    {
                        self.dispatch_failed("Token redirect", e);
                    }
                } else {
                    tracing::debug!("Interactive flow already locked; not redirecting for token");
                }
                // Callers always see the silent failure, whatever the fallback did
                TokenOutcome::Failed(silent_err)
            }
        }
    }
}
