use thiserror::Error;

/// Failures reported by the identity client.
#[derive(Error, Debug, Clone)]
pub enum IdentityError {
    #[error("An interactive sign-in is already in progress")]
    InteractionInProgress,

    #[error("Interactive sign-in required: {0}")]
    InteractionRequired(String),

    #[error("Identity client setup failed: {0}")]
    Setup(String),

    #[error("Identity provider returned '{code}': {description}")]
    Server { code: String, description: String },

    #[error("Redirect response state does not match the pending sign-in")]
    StateMismatch,

    #[error("Invalid response from identity provider: {0}")]
    InvalidResponse(String),

    #[error("HTTP error talking to identity provider: {0}")]
    Http(String),

    #[error("Token cache error: {0}")]
    Cache(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),
}

impl IdentityError {
    /// Another interactive flow already owns the browser; callers treat this as benign.
    pub fn is_interaction_in_progress(&self) -> bool {
        matches!(self, IdentityError::InteractionInProgress)
    }

    /// Map an OAuth error code from the token endpoint
    pub fn from_oauth(code: &str, description: Option<&str>) -> Self {
        let description = description.unwrap_or("no description").to_string();
        match code {
            "invalid_grant" | "interaction_required" | "consent_required" | "login_required" => {
                IdentityError::InteractionRequired(format!("{}: {}", code, description))
            }
            _ => IdentityError::Server {
                code: code.to_string(),
                description,
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum CardsError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Redirecting to sign-in; retry once the browser flow completes")]
    Redirecting,

    #[error("API request to {path} failed with status {status}")]
    Api { path: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, CardsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_codes_requiring_interaction() {
        for code in ["invalid_grant", "interaction_required", "consent_required", "login_required"] {
            let err = IdentityError::from_oauth(code, Some("expired"));
            assert!(matches!(err, IdentityError::InteractionRequired(_)), "{}", code);
        }
    }

    #[test]
    fn test_other_oauth_codes_are_server_errors() {
        let err = IdentityError::from_oauth("invalid_client", None);
        match err {
            IdentityError::Server { code, description } => {
                assert_eq!(code, "invalid_client");
                assert_eq!(description, "no description");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!IdentityError::StateMismatch.is_interaction_in_progress());
        assert!(IdentityError::InteractionInProgress.is_interaction_in_progress());
    }
}
