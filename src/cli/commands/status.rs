use crate::error::Result;
use serde_json::json;

pub async fn execute(page_url: Option<&str>, json: bool) -> Result<()> {
    let (_, session) = super::session(page_url)?;
    let account = session.account();

    if json {
        let status = match &account {
            Some(account) => json!({
                "authenticated": true,
                "username": account.username,
                "name": account.name,
                "tenant_id": account.tenant_id,
            }),
            None => json!({ "authenticated": false }),
        };
        println!("{}", status);
    } else {
        match &account {
            Some(account) => {
                println!("Signed in as {}", account.display_name());
                println!("  Username: {}", account.username);
                println!("  Tenant:   {}", account.tenant_id);
            }
            None => println!("Not signed in"),
        }
    }

    if account.is_none() {
        std::process::exit(1);
    }
    Ok(())
}
