// Sign-in and token acquisition
mod bypass;
mod identity;
mod manager;
mod navigator;
mod oidc;
mod redirect;
mod token_cache;

pub use bypass::BypassSession;
pub use manager::{SessionManager, SessionSettings};
pub use navigator::{set_headless_override, BrowserNavigator};
pub use oidc::{OidcClient, OidcSettings};
pub use token_cache::TokenCache;

use crate::config::Config;
use crate::error::{CardsError, IdentityError, Result};
use crate::models::Account;
use async_trait::async_trait;
use std::sync::Arc;
use url::Url;

/// Outcome of asking the session for an access token
#[derive(Debug)]
pub enum TokenOutcome {
    Ready(String),
    /// Navigation to the identity provider is pending; defer the request
    Redirecting,
    Failed(IdentityError),
}

impl TokenOutcome {
    pub fn into_result(self) -> Result<String> {
        match self {
            TokenOutcome::Ready(token) => Ok(token),
            TokenOutcome::Redirecting => Err(CardsError::Redirecting),
            TokenOutcome::Failed(err) => Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Initializing,
    ProcessingRedirect,
    Redirecting,
    Authenticated,
    Unauthenticated,
}

impl SessionPhase {
    pub fn as_str(&self) -> &str {
        match self {
            SessionPhase::Initializing => "INITIALIZING",
            SessionPhase::ProcessingRedirect => "PROCESSING_REDIRECT",
            SessionPhase::Redirecting => "REDIRECTING",
            SessionPhase::Authenticated => "AUTHENTICATED",
            SessionPhase::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

/// Authentication capability shared by every feature that calls the API
#[async_trait]
pub trait Session: Send + Sync {
    fn is_authenticated(&self) -> bool;

    fn account(&self) -> Option<Account>;

    fn phase(&self) -> SessionPhase;

    /// Page-load flow: initialize, consume a redirect response, and start
    /// sign-in automatically when no account is known
    async fn start(&self) -> SessionPhase;

    async fn login(&self);

    async fn logout(&self);

    async fn acquire_token(&self) -> TokenOutcome;
}

/// Build the session for this process from configuration
pub fn connect(config: &Config, page_url: Option<&str>) -> Result<Arc<dyn Session>> {
    if config.auth.bypass_enabled() {
        tracing::info!("Auth bypass enabled; using development session");
        return Ok(Arc::new(BypassSession::new()));
    }

    let redirect_uri = Url::parse(&config.auth.redirect_uri)?;
    let page_url = match page_url {
        Some(url) => Url::parse(url)?,
        None => redirect_uri.clone(),
    };

    let client = OidcClient::new(
        OidcSettings {
            authority: config.auth.authority(),
            client_id: config.auth.client_id.clone(),
            redirect_uri,
        },
        TokenCache::new()?,
        Arc::new(BrowserNavigator::default()),
    );

    let settings = SessionSettings {
        request: config.auth.token_request(),
        page_url,
        redirect_wait: config.auth.redirect_wait(),
    };

    Ok(Arc::new(SessionManager::new(client, settings)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_selects_bypass_in_debug_builds() {
        let mut config = Config::default();
        config.auth.bypass = true;

        let session = connect(&config, Some("not a url")).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.phase(), SessionPhase::Authenticated);
        let token = session.acquire_token().await.into_result().unwrap();
        assert_eq!(token, "dev-access-token");
    }

    #[test]
    fn test_connect_rejects_bad_page_url() {
        let config = Config::default();
        assert!(matches!(connect(&config, Some("::")), Err(CardsError::Url(_))));
    }

    #[test]
    fn test_token_outcome_into_result() {
        assert_eq!(TokenOutcome::Ready("t".to_string()).into_result().unwrap(), "t");
        assert!(matches!(
            TokenOutcome::Redirecting.into_result(),
            Err(CardsError::Redirecting)
        ));
        assert!(matches!(
            TokenOutcome::Failed(IdentityError::StateMismatch).into_result(),
            Err(CardsError::Identity(IdentityError::StateMismatch))
        ));
    }
}
