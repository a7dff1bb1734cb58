use anyhow::Result;
use isdash_core::auth::JwtClaims;

use super::context::Context;

pub async fn login(did: &str, jwt: &str) -> Result<()> {
    let ctx = Context::load().await?;
    let session = ctx.session(Vec::new());
    session.login(did, jwt).await?;

    match JwtClaims::decode(jwt).map(|claims| claims.expires_at()) {
        Ok(Some(expiry)) => println!("Logged in as {} until {}", did, expiry.to_rfc3339()),
        Ok(None) => println!("Logged in as {}", did),
        Err(e) => {
            tracing::warn!(error = %e, "stored a JWT that cannot be decoded");
            println!("Logged in as {}", did);
        }
    }
    if session.check_expiry().await? {
        anyhow::bail!("The JWT has already expired");
    }
    Ok(())
}

pub async fn logout() -> Result<()> {
    let ctx = Context::load().await?;
    ctx.session(Vec::new()).logout().await?;
    println!("Logged out");
    Ok(())
}
