//! Login, logout and refresh handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use folio_session::SessionClient;
use folio_session::gateway::Credentials;
use folio_session::token::mask_token;

pub async fn login(client: &SessionClient, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => read_password()?,
    };

    let identity = client
        .effects()
        .login(&Credentials::new(email, password))
        .await
        .map_err(|err| anyhow::anyhow!("Login failed: {}", err.user_message()))?;

    println!("✓ Logged in as {} <{}>", identity.display_name, identity.email);
    for company in &identity.companies {
        println!("  {} ({})", company.name, company.id);
    }
    if let Some(token) = client.context().store().token() {
        println!("  Token: {}", mask_token(&token));
    }
    Ok(())
}

fn read_password() -> Result<String> {
    if io::stdin().is_terminal() {
        print!("Password: ");
        io::stdout().flush()?;
    }
    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("read password from stdin")?;
    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password cannot be empty");
    }
    Ok(password)
}

pub async fn logout(client: &SessionClient) -> Result<()> {
    let was_authenticated = client.context().store().is_authenticated();
    client.effects().logout().await;

    if was_authenticated {
        println!("✓ Logged out");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub async fn refresh(client: &SessionClient) -> Result<()> {
    let claims = client
        .effects()
        .refresh_token()
        .await
        .context("Refresh failed")?;

    match claims.expires_at {
        Some(exp) => println!("✓ Token refreshed (expires {})", exp.to_rfc3339()),
        None => println!("✓ Token refreshed"),
    }
    Ok(())
}
