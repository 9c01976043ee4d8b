//! Session status display.

use chrono::Utc;
use folio_session::SessionClient;
use folio_session::token::{self, mask_token};

pub fn show(client: &SessionClient) {
    let state = client.context().store().snapshot();
    let (Some(token), Some(identity)) = (&state.token, &state.identity) else {
        println!("Not logged in.");
        return;
    };

    println!("Logged in as {} <{}>", identity.display_name, identity.email);
    println!("  User:    {} ({})", identity.id, identity.account_type.as_str());
    if identity.email_verified_at.is_none() {
        println!("  Email:   not verified");
    }
    for company in &identity.companies {
        println!("  Company: {} ({})", company.name, company.id);
    }
    println!("  Token:   {}", mask_token(token));

    if let Ok(claims) = token::decode(token)
        && let Some(exp) = claims.expires_at
    {
        if claims.is_expired_at(Utc::now()) {
            println!("  Expires: {} (expired; refreshed on next request)", exp.to_rfc3339());
        } else {
            println!("  Expires: {}", exp.to_rfc3339());
        }
    }
}
