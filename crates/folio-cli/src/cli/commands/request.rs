//! Authenticated request handler.

use anyhow::Result;
use folio_session::SessionClient;
use folio_session::transport::ApiRequest;

pub async fn get(client: &SessionClient, path: &str) -> Result<()> {
    let response = client.interceptor().execute(&ApiRequest::get(path)).await?;

    match serde_json::from_str::<serde_json::Value>(&response.body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", response.body),
    }

    if !response.is_success() {
        anyhow::bail!("GET {path} failed with HTTP {}", response.status);
    }
    Ok(())
}
