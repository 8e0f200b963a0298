pub mod config;
pub mod criteria;
pub mod engine;
pub mod mail_service;
pub mod mailbox_directory;
pub mod rate_limiter;
pub mod record;
pub mod secret_client;
pub mod test_mailer;
pub mod threat_feeds;
pub mod validation;

pub use config::Config;
pub use criteria::{CriteriaError, SearchCriteria};
pub use engine::{RemediationAction, RemediationResult, SweepEngine};
pub use mail_service::{HttpMailService, MailThreatService};
pub use rate_limiter::RateLimiter;
pub use record::MatchRecord;
