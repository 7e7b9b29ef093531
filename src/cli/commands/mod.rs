pub mod cards;
pub mod completions;
pub mod config;
pub mod login;
pub mod logout;
pub mod status;
pub mod token;

use crate::api::ApiClient;
use crate::auth::{self, Session, SessionPhase};
use crate::config::Config;
use crate::error::{CardsError, Result};
use std::sync::Arc;

/// Load and validate configuration, then build the session for this run
pub(crate) fn session(page_url: Option<&str>) -> Result<(Config, Arc<dyn Session>)> {
    let config = Config::load()?;
    config.validate()?;
    let session = auth::connect(&config, page_url)?;
    Ok((config, session))
}

/// Run the page-load flow and hand back a client for the backend API.
/// Fails with `Redirecting` when the browser was sent to sign in.
pub(crate) async fn api_client(page_url: Option<&str>) -> Result<ApiClient> {
    let (config, session) = session(page_url)?;
    match session.start().await {
        SessionPhase::Redirecting => Err(CardsError::Redirecting),
        phase => {
            tracing::debug!("Session phase after start: {}", phase.as_str());
            Ok(ApiClient::new(&config.api.base_url, session))
        }
    }
}

pub(crate) fn print_redirect_notice() {
    println!("Continue signing in in your browser.");
    println!("When it returns, re-run the command with the address it landed on:");
    println!("  flashcards --page-url '<address>' <command>");
}
