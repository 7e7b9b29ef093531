use crate::error::Result;

pub async fn execute(page_url: Option<&str>) -> Result<()> {
    let (_, session) = super::session(page_url)?;

    let name = session.account().map(|a| a.display_name().to_string());
    session.logout().await;

    match name {
        Some(name) => println!("✓ Signed out {}", name),
        None => println!("✓ No cached session; signed out"),
    }
    Ok(())
}
