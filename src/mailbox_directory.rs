use std::collections::HashSet;
use std::time::Duration;

use log::{debug, info};
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::DirectoryConfig;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("roster URL is not valid: {0}")]
    BadUrl(#[from] url::ParseError),
    #[error("roster request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("roster endpoint answered with HTTP {0}")]
    Status(u16),
}

/// The set of mailboxes a run operates on, resolved exactly once at
/// startup and held for the session.
pub struct MailboxDirectory {
    mailboxes: Vec<String>,
}

impl MailboxDirectory {
    pub async fn load(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let raw = match config {
            DirectoryConfig::Static { mailboxes } => {
                debug!("using {} mailbox(es) from configuration", mailboxes.len());
                mailboxes.clone()
            }
            DirectoryConfig::Roster { url } => fetch_roster(url).await?,
        };
        let mut seen = HashSet::new();
        let mut mailboxes = Vec::with_capacity(raw.len());
        for address in raw {
            let address = address.trim().to_lowercase();
            if !address.is_empty() && seen.insert(address.clone()) {
                mailboxes.push(address);
            }
        }
        info!("mailbox directory resolved: {} mailbox(es)", mailboxes.len());
        Ok(Self { mailboxes })
    }

    pub fn mailboxes(&self) -> &[String] {
        &self.mailboxes
    }

    pub fn len(&self) -> usize {
        self.mailboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }
}

async fn fetch_roster(roster_url: &str) -> Result<Vec<String>, DirectoryError> {
    let parsed = Url::parse(roster_url)?;
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("mailsweep/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let response = client.get(parsed).send().await?;
    if !response.status().is_success() {
        return Err(DirectoryError::Status(response.status().as_u16()));
    }
    let addresses: Vec<String> = response.json().await?;
    debug!("roster endpoint returned {} address(es)", addresses.len());
    Ok(addresses)
}
