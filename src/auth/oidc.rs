use super::identity::IdentityClient;
use super::navigator::Navigator;
use super::redirect::RedirectParams;
use super::token_cache::{CachedSession, PendingInteraction, TokenCache};
use crate::error::IdentityError;
use crate::models::{Account, AuthResult, TokenRequest};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::sync::{Arc, OnceLock};
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct OidcSettings {
    /// e.g. `https://login.microsoftonline.com/{tenant}`
    pub authority: String,
    pub client_id: String,
    pub redirect_uri: Url,
}

#[derive(Debug, Clone, Deserialize)]
struct Endpoints {
    authorization_endpoint: String,
    token_endpoint: String,
    #[serde(default)]
    end_session_endpoint: Option<String>,
}

impl Endpoints {
    /// Endpoint layout used when metadata discovery is unavailable
    fn conventional(authority: &str) -> Self {
        let base = authority.trim_end_matches('/');
        Self {
            authorization_endpoint: format!("{}/oauth2/v2.0/authorize", base),
            token_endpoint: format!("{}/oauth2/v2.0/token", base),
            end_session_endpoint: Some(format!("{}/oauth2/v2.0/logout", base)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    tid: Option<String>,
    #[serde(default)]
    preferred_username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

fn code_verifier() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn auth_result(session: &CachedSession) -> AuthResult {
    AuthResult {
        access_token: session.access_token.clone(),
        expires_at: session.expires_at,
        account: session.account.clone(),
        scopes: session.scopes.clone(),
    }
}

/// OpenID Connect client using authorization code + PKCE over browser redirects
pub struct OidcClient {
    http: reqwest::Client,
    settings: OidcSettings,
    endpoints: OnceLock<Endpoints>,
    cache: TokenCache,
    navigator: Arc<dyn Navigator>,
}

impl OidcClient {
    pub fn new(settings: OidcSettings, cache: TokenCache, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
            endpoints: OnceLock::new(),
            cache,
            navigator,
        }
    }

    fn endpoints(&self) -> Endpoints {
        self.endpoints
            .get()
            .cloned()
            .unwrap_or_else(|| Endpoints::conventional(&self.settings.authority))
    }

    fn environment(&self) -> String {
        Url::parse(&self.settings.authority)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default()
    }

    async fn discover(&self) -> Result<Endpoints, IdentityError> {
        let url = format!(
            "{}/v2.0/.well-known/openid-configuration",
            self.settings.authority.trim_end_matches('/')
        );
        tracing::debug!("Fetching provider metadata from {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| IdentityError::Setup(format!("Metadata request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(IdentityError::Setup(format!(
                "Metadata request returned {}",
                response.status()
            )));
        }

        response
            .json::<Endpoints>()
            .await
            .map_err(|e| IdentityError::Setup(format!("Invalid provider metadata: {}", e)))
    }

    /// Record a pending interaction and send the browser to the authorize endpoint
    fn begin_interaction(
        &self,
        request: &TokenRequest,
        login_hint: Option<&str>,
    ) -> Result<(), IdentityError> {
        if let Some(pending) = self.cache.load_pending()? {
            if !pending.is_stale() {
                return Err(IdentityError::InteractionInProgress);
            }
            tracing::debug!("Discarding stale pending interaction");
        }

        let pending = PendingInteraction {
            state: Uuid::new_v4().to_string(),
            code_verifier: code_verifier(),
            scopes: request.scopes.clone(),
            created_at: Utc::now(),
        };

        let mut url = Url::parse(&self.endpoints().authorization_endpoint).map_err(|e| {
            IdentityError::InvalidResponse(format!("Invalid authorization endpoint: {}", e))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.settings.client_id)
                .append_pair("response_type", "code")
                .append_pair("response_mode", "query")
                .append_pair("redirect_uri", self.settings.redirect_uri.as_str())
                .append_pair("scope", &request.scope_param())
                .append_pair("state", &pending.state)
                .append_pair("code_challenge", &code_challenge(&pending.code_verifier))
                .append_pair("code_challenge_method", "S256");
            if let Some(hint) = login_hint {
                query.append_pair("login_hint", hint);
            }
        }

        self.cache.save_pending(&pending)?;
        if let Err(e) = self.navigator.navigate(&url) {
            self.cache.clear_pending()?;
            return Err(e);
        }
        Ok(())
    }

    async fn redeem(&self, form: &[(&str, &str)]) -> Result<TokenResponse, IdentityError> {
        let endpoint = self.endpoints().token_endpoint;
        let response = self
            .http
            .post(&endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| IdentityError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IdentityError::Http(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| IdentityError::InvalidResponse(format!("Bad token response: {}", e)));
        }

        match serde_json::from_str::<OAuthErrorResponse>(&body) {
            Ok(err) => Err(IdentityError::from_oauth(
                &err.error,
                err.error_description.as_deref(),
            )),
            Err(_) => Err(IdentityError::Http(format!(
                "Token endpoint returned {}",
                status
            ))),
        }
    }

    /// Read the account from ID token claims. The token comes straight from
    /// the token endpoint over TLS, so its signature is not re-checked here.
    fn account_from_id_token(&self, id_token: &str) -> Result<Account, IdentityError> {
        let payload = id_token
            .split('.')
            .nth(1)
            .ok_or_else(|| IdentityError::InvalidResponse("Malformed id_token".to_string()))?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| IdentityError::InvalidResponse(format!("Bad id_token encoding: {}", e)))?;
        let claims: IdTokenClaims = serde_json::from_slice(&bytes)
            .map_err(|e| IdentityError::InvalidResponse(format!("Bad id_token claims: {}", e)))?;

        let local_account_id = claims.oid.unwrap_or(claims.sub);
        let tenant_id = claims.tid.unwrap_or_default();
        Ok(Account {
            home_account_id: format!("{}.{}", local_account_id, tenant_id),
            local_account_id,
            environment: self.environment(),
            tenant_id,
            username: claims
                .preferred_username
                .or(claims.email)
                .unwrap_or_default(),
            name: claims.name,
        })
    }

    fn build_session(
        &self,
        response: TokenResponse,
        requested: &[String],
        previous: Option<CachedSession>,
    ) -> Result<CachedSession, IdentityError> {
        let account = match (&response.id_token, &previous) {
            (Some(id_token), _) => self.account_from_id_token(id_token)?,
            (None, Some(prev)) => prev.account.clone(),
            (None, None) => {
                return Err(IdentityError::InvalidResponse(
                    "Token response carried no id_token".to_string(),
                ))
            }
        };

        let scopes = response
            .scope
            .as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(|| requested.to_vec());

        Ok(CachedSession {
            account,
            access_token: response.access_token,
            expires_at: Utc::now() + Duration::seconds(response.expires_in),
            refresh_token: response
                .refresh_token
                .or_else(|| previous.and_then(|p| p.refresh_token)),
            scopes,
            last_used: Utc::now(),
        })
    }
}

#[async_trait]
impl IdentityClient for OidcClient {
    async fn initialize(&self) -> Result<(), IdentityError> {
        if self.settings.client_id.is_empty() {
            return Err(IdentityError::Setup("Client id not configured".to_string()));
        }
        if self.endpoints.get().is_some() {
            return Ok(());
        }

        let discovered = self.discover().await?;
        tracing::debug!("Token endpoint: {}", discovered.token_endpoint);
        let _ = self.endpoints.set(discovered);
        Ok(())
    }

    async fn handle_redirect_response(
        &self,
        page_url: &Url,
    ) -> Result<Option<AuthResult>, IdentityError> {
        let params = RedirectParams::from_url(page_url);
        if params.is_empty() {
            // A plain page load abandons any sign-in started by an earlier one
            if self.cache.load_pending()?.is_some() {
                tracing::debug!("Dropping pending interaction from an earlier page load");
                self.cache.clear_pending()?;
            }
            return Ok(None);
        }

        // A response consumes the pending interaction whatever its outcome
        let pending = self.cache.load_pending()?;
        self.cache.clear_pending()?;

        if let Some(code) = params.error {
            return Err(IdentityError::from_oauth(
                &code,
                params.error_description.as_deref(),
            ));
        }

        let pending = pending.ok_or(IdentityError::StateMismatch)?;
        if params.state.as_deref() != Some(pending.state.as_str()) {
            return Err(IdentityError::StateMismatch);
        }
        let code = params
            .code
            .ok_or_else(|| IdentityError::InvalidResponse("Missing authorization code".to_string()))?;

        let scope = TokenRequest::new(pending.scopes.iter().cloned()).scope_param();
        let response = self
            .redeem(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.settings.client_id.as_str()),
                ("code", code.as_str()),
                ("redirect_uri", self.settings.redirect_uri.as_str()),
                ("code_verifier", pending.code_verifier.as_str()),
                ("scope", scope.as_str()),
            ])
            .await?;

        let session = self.build_session(response, &pending.scopes, None)?;
        self.cache.save_session(&session)?;
        tracing::debug!("Cached session for {}", session.account.username);
        Ok(Some(auth_result(&session)))
    }

    fn all_accounts(&self) -> Vec<Account> {
        match self.cache.list_sessions() {
            Ok(sessions) => sessions.into_iter().map(|s| s.account).collect(),
            Err(e) => {
                tracing::warn!("Could not read token cache: {}", e);
                Vec::new()
            }
        }
    }

    async fn login_redirect(&self, request: &TokenRequest) -> Result<(), IdentityError> {
        self.begin_interaction(request, None)
    }

    async fn acquire_token_silent(
        &self,
        request: &TokenRequest,
        account: &Account,
    ) -> Result<AuthResult, IdentityError> {
        let mut session = self
            .cache
            .get_session(&account.home_account_id)?
            .ok_or_else(|| IdentityError::InteractionRequired("No cached session".to_string()))?;

        if !session.needs_renewal() && request.is_covered_by(&session.scopes) {
            session.last_used = Utc::now();
            self.cache.save_session(&session)?;
            return Ok(auth_result(&session));
        }

        let refresh_token = session
            .refresh_token
            .clone()
            .ok_or_else(|| IdentityError::InteractionRequired("No refresh token".to_string()))?;

        tracing::debug!("Refreshing access token for {}", account.username);
        let scope = request.scope_param();
        let response = self
            .redeem(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.settings.client_id.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("scope", scope.as_str()),
            ])
            .await?;

        let renewed = self.build_session(response, &request.scopes, Some(session))?;
        self.cache.save_session(&renewed)?;
        Ok(auth_result(&renewed))
    }

    async fn acquire_token_redirect(
        &self,
        request: &TokenRequest,
        account: &Account,
    ) -> Result<(), IdentityError> {
        self.begin_interaction(request, Some(&account.username))
    }

    async fn logout_redirect(&self, account: Option<Account>) -> Result<(), IdentityError> {
        match &account {
            Some(account) => self.cache.remove_session(&account.home_account_id)?,
            None => {
                for session in self.cache.list_sessions()? {
                    self.cache.remove_session(&session.account.home_account_id)?;
                }
            }
        }
        self.cache.clear_pending()?;

        let Some(endpoint) = self.endpoints().end_session_endpoint else {
            tracing::debug!("Provider has no end-session endpoint; local sign-out only");
            return Ok(());
        };
        let mut url = Url::parse(&endpoint)
            .map_err(|e| IdentityError::InvalidResponse(format!("Invalid end-session endpoint: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("post_logout_redirect_uri", self.settings.redirect_uri.as_str());
        if let Some(account) = &account {
            url.query_pairs_mut().append_pair("logout_hint", &account.username);
        }

        self.navigator.navigate(&url)
    }
}
