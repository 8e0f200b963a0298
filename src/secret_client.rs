use std::time::Duration;

use log::debug;
use reqwest::Client;
use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::config::ScssConfig;

// The secret service identifies clients by this agent string.
const SCSS_USER_AGENT: &str = "scss-client";
const SCSS_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("invalid TOTP seed: {0}")]
    Totp(String),
    #[error("secret service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("secret service answered with HTTP {0}")]
    Status(u16),
    #[error("secret service response carried no gpg_pass field")]
    MissingSecret,
}

/// Client for the secret-issuing service. One fetch at startup supplies the
/// bearer token the rest of the run uses; nothing downstream ever refreshes
/// it.
pub struct ScssClient {
    client: Client,
}

impl ScssClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SCSS_TIMEOUT_SECS))
            .user_agent(SCSS_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    pub async fn fetch_secret(&self, config: &ScssConfig) -> Result<String, SecretError> {
        let code = current_code(&config.otp_secret)?;
        let response = self
            .client
            .post(&config.url)
            .header("api-key", &config.api_key)
            .header("totp", code)
            .header("userid", &config.user)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SecretError::Status(response.status().as_u16()));
        }
        let body: serde_json::Value = response.json().await?;
        let secret = body
            .get("gpg_pass")
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .ok_or(SecretError::MissingSecret)?;
        debug!("credential retrieved from secret service");
        Ok(secret)
    }
}

/// Current six-digit code for the configured base32 seed.
fn current_code(otp_secret: &str) -> Result<String, SecretError> {
    let seed = Secret::Encoded(otp_secret.to_string())
        .to_bytes()
        .map_err(|e| SecretError::Totp(format!("{e:?}")))?;
    let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, seed)
        .map_err(|e| SecretError::Totp(format!("{e:?}")))?;
    totp.generate_current()
        .map_err(|e| SecretError::Totp(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_six_digits() {
        let code = current_code("JBSWY3DPEHPK3PXPJBSWY3DPEHPK3PXP").unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn garbage_seed_is_rejected() {
        assert!(matches!(
            current_code("not base32 at all!"),
            Err(SecretError::Totp(_))
        ));
    }
}
