use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub scss: Option<ScssConfig>,
    #[serde(default)]
    pub feeds: Option<FeedsConfig>,
    #[serde(default)]
    pub test_mail: Option<TestMailConfig>,
}

/// The mailbox security service endpoint. When `token` is absent the
/// bearer token is fetched from the secret service at startup instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// Where the list of mailboxes to sweep comes from. Resolved once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum DirectoryConfig {
    /// Mailboxes listed directly in this file.
    Static { mailboxes: Vec<String> },
    /// HTTP endpoint answering with a JSON array of mailbox addresses.
    Roster { url: String },
}

/// Secret-issuing service reached with a TOTP-authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScssConfig {
    pub url: String,
    pub api_key: String,
    pub user: String,
    /// Base32-encoded TOTP seed.
    pub otp_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    pub phish_tank_api_key: Option<String>,
    #[serde(default = "default_true")]
    pub openphish: bool,
}

/// SMTP relay used only to send verification probes, never for remediation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestMailConfig {
    pub smtp_server: String,
    pub sender: String,
    pub recipient: String,
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "https://api.tmcas.trendmicro.com".to_string(),
                token: None,
            },
            directory: DirectoryConfig::Static { mailboxes: vec![] },
            scss: None,
            feeds: Some(FeedsConfig {
                phish_tank_api_key: None,
                openphish: true,
            }),
            test_mail: None,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
