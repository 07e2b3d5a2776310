use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::DashboardError;

pub const DEFAULT_SIGNIN_URL: &str = "https://learn.reboot01.com/api/auth/signin";

/// `Basic <base64(identifier:secret)>`. The identifier may be a login or an email.
pub fn basic_header(identifier: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{identifier}:{secret}")))
}

/// The sign-in endpoint answers with a bare JSON string, an object carrying
/// `token`, or plain text, depending on the deployment.
pub fn parse_token(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(token)) => token,
        Ok(Value::Object(map)) => match map.get("token") {
            Some(Value::String(token)) => token.clone(),
            _ => body.trim().to_string(),
        },
        _ => body.trim().to_string(),
    }
}

pub async fn signin(
    url: &str,
    identifier: &str,
    secret: &str,
    timeout: Duration,
) -> Result<String, DashboardError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DashboardError::Network(e.to_string()))?;

    debug!(url, "signing in");
    let response = client
        .post(url)
        .header(AUTHORIZATION, basic_header(identifier, secret))
        .send()
        .await
        .map_err(|e| DashboardError::Network(e.to_string()))?;

    if !response.status().is_success() {
        debug!(status = %response.status(), "sign-in rejected");
        return Err(DashboardError::Auth);
    }

    let body = response
        .text()
        .await
        .map_err(|e| DashboardError::Network(e.to_string()))?;
    let token = parse_token(&body);
    if token.is_empty() {
        return Err(DashboardError::Auth);
    }

    info!("signed in");
    Ok(token)
}
