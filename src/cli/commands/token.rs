use crate::auth::SessionPhase;
use crate::error::{CardsError, Result};

pub async fn execute(page_url: Option<&str>) -> Result<()> {
    let (_, session) = super::session(page_url)?;
    if session.start().await == SessionPhase::Redirecting {
        return Err(CardsError::Redirecting);
    }

    let token = session.acquire_token().await.into_result()?;
    println!("{}", token);
    Ok(())
}
