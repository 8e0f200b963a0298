use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::MatchRecord;

const USER_AGENT: &str = concat!("mailsweep/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// One entry of a sweep response's `value` array. Every field is an opaque
/// service-assigned string; absent fields deserialize to empty strings and
/// are filtered out during normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepEntry {
    #[serde(default)]
    pub mailbox: String,
    #[serde(default)]
    pub mail_message_id: String,
    #[serde(default)]
    pub mail_unique_id: String,
    #[serde(default)]
    pub mail_message_delivery_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SweepResponse {
    #[serde(default)]
    pub value: Vec<SweepEntry>,
}

/// One element of a mitigation POST body. The service requires every field;
/// `service` and `account_provider` are fixed by the account setup.
#[derive(Debug, Clone, Serialize)]
pub struct MitigationEntry {
    pub action_type: String,
    pub service: &'static str,
    pub account_provider: &'static str,
    pub mailbox: String,
    pub mail_message_id: String,
    pub mail_unique_id: String,
    pub mail_message_delivery_time: String,
}

impl MitigationEntry {
    pub fn new(action_type: &str, record: &MatchRecord) -> Self {
        Self {
            action_type: action_type.to_string(),
            service: "exchange",
            account_provider: "office365",
            mailbox: record.mailbox.clone(),
            mail_message_id: record.message_id.clone(),
            mail_unique_id: record.unique_id.clone(),
            mail_message_delivery_time: record.delivery_time.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service answered with HTTP {0}")]
    Status(u16),
}

/// The two remote operations the engine performs. Behind a trait so the
/// sweep and mitigation flows can be exercised against an in-memory service.
#[async_trait]
pub trait MailThreatService {
    /// One sweep query. A non-success HTTP status is an error; the caller
    /// decides whether that aborts anything.
    async fn sweep(&self, params: &[(&'static str, String)]) -> Result<SweepResponse, ServiceError>;

    /// Submit one mitigation batch. Only HTTP 201 counts as accepted.
    async fn mitigate(&self, batch: &[MitigationEntry]) -> Result<(), ServiceError>;
}

/// Production implementation talking to the mailbox security service over
/// HTTPS with a pre-fetched bearer token.
pub struct HttpMailService {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpMailService {
    pub fn new(base_url: &str, token: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl MailThreatService for HttpMailService {
    async fn sweep(&self, params: &[(&'static str, String)]) -> Result<SweepResponse, ServiceError> {
        let url = format!("{}/v1/sweeping/mails", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ServiceError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }

    async fn mitigate(&self, batch: &[MitigationEntry]) -> Result<(), ServiceError> {
        let url = format!("{}/v1/mitigation/mails", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(batch)
            .send()
            .await?;
        if response.status() != StatusCode::CREATED {
            return Err(ServiceError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mitigation_entry_carries_delivery_time_verbatim() {
        let record = MatchRecord {
            mailbox: "user@example.com".to_string(),
            message_id: "<m@x>".to_string(),
            unique_id: "uid-1".to_string(),
            delivery_time: "2020-03-06T18:31:27.1234567Z".to_string(),
        };
        let entry = MitigationEntry::new("MAIL_QUARANTINE", &record);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action_type"], "MAIL_QUARANTINE");
        assert_eq!(json["service"], "exchange");
        assert_eq!(json["account_provider"], "office365");
        assert_eq!(
            json["mail_message_delivery_time"],
            "2020-03-06T18:31:27.1234567Z"
        );
    }

    #[test]
    fn sweep_response_tolerates_missing_fields() {
        let body = r#"{"value":[{"mailbox":"a@b.c","mail_message_id":"m1"}]}"#;
        let parsed: SweepResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.value.len(), 1);
        assert_eq!(parsed.value[0].mailbox, "a@b.c");
        assert!(parsed.value[0].mail_unique_id.is_empty());
    }

    #[test]
    fn sweep_response_without_value_is_empty() {
        let parsed: SweepResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.value.is_empty());
    }
}
