// Fixed development session used when sign-in is bypassed
use super::{Session, SessionPhase, TokenOutcome};
use crate::models::Account;
use async_trait::async_trait;

pub const DEV_ACCESS_TOKEN: &str = "dev-access-token";

pub struct BypassSession {
    account: Account,
}

impl BypassSession {
    pub fn new() -> Self {
        Self {
            account: Account {
                home_account_id: "dev.account".to_string(),
                local_account_id: "dev".to_string(),
                environment: "local".to_string(),
                tenant_id: "dev".to_string(),
                username: "dev.user@local".to_string(),
                name: None,
            },
        }
    }
}

impl Default for BypassSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Session for BypassSession {
    fn is_authenticated(&self) -> bool {
        true
    }

    fn account(&self) -> Option<Account> {
        Some(self.account.clone())
    }

    fn phase(&self) -> SessionPhase {
        SessionPhase::Authenticated
    }

    async fn start(&self) -> SessionPhase {
        SessionPhase::Authenticated
    }

    async fn login(&self) {}

    async fn logout(&self) {}

    async fn acquire_token(&self) -> TokenOutcome {
        TokenOutcome::Ready(DEV_ACCESS_TOKEN.to_string())
    }
}
