use crate::error::IdentityError;
use crate::models::{Account, AuthResult, TokenRequest};
use async_trait::async_trait;
use url::Url;

/// Connection to the identity provider.
///
/// Interactive methods navigate away from the current page load; they
/// return once navigation has been dispatched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// One-time setup (metadata discovery, cache loading)
    async fn initialize(&self) -> Result<(), IdentityError>;

    /// Consume a redirect response encoded in `page_url`, if any
    async fn handle_redirect_response(
        &self,
        page_url: &Url,
    ) -> Result<Option<AuthResult>, IdentityError>;

    /// Accounts with a cached session, most recently used first
    fn all_accounts(&self) -> Vec<Account>;

    async fn login_redirect(&self, request: &TokenRequest) -> Result<(), IdentityError>;

    async fn acquire_token_silent(
        &self,
        request: &TokenRequest,
        account: &Account,
    ) -> Result<AuthResult, IdentityError>;

    async fn acquire_token_redirect(
        &self,
        request: &TokenRequest,
        account: &Account,
    ) -> Result<(), IdentityError>;

    async fn logout_redirect(&self, account: Option<Account>) -> Result<(), IdentityError>;
}
