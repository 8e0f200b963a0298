use std::fmt;
use std::time::Duration;

use log::{debug, info, warn};
use thiserror::Error;

use crate::criteria::SearchCriteria;
use crate::mail_service::{MailThreatService, MitigationEntry};
use crate::rate_limiter::RateLimiter;
use crate::record::MatchRecord;

/// The mitigation endpoint accepts at most this many messages per request.
pub const MAX_BATCH_SIZE: usize = 10;
/// Extra pause after submitting a full batch, on top of the rate limiter.
pub const INTER_BATCH_PAUSE_SECS: u64 = 30;

const BATCH_REJECTED_REASON: &str = "remote rejected batch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationAction {
    Quarantine,
    Delete,
}

impl RemediationAction {
    /// Action tag the mitigation endpoint expects.
    pub fn action_type(self) -> &'static str {
        match self {
            RemediationAction::Quarantine => "MAIL_QUARANTINE",
            RemediationAction::Delete => "MAIL_DELETE",
        }
    }
}

impl fmt::Display for RemediationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemediationAction::Quarantine => write!(f, "quarantine"),
            RemediationAction::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("remediation target at position {index} is missing required fields")]
    IncompleteRecord { index: usize },
}

/// A record whose batch the service refused, with the reason it is counted
/// as failed.
#[derive(Debug, Clone)]
pub struct FailedItem {
    pub record: MatchRecord,
    pub reason: String,
}

/// Aggregate outcome of one remediation run. Built fresh per call; nothing
/// in here is retried automatically.
#[derive(Debug, Default)]
pub struct RemediationResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedItem>,
}

/// Sweep-and-remediate engine for one session.
///
/// Owns the session's rate limiter; every remote call funnels through it.
/// Everything is sequential — one request in flight at a time, and
/// rate-limit cooldowns stall the whole engine on purpose.
pub struct SweepEngine<S> {
    service: S,
    limiter: RateLimiter,
}

impl<S: MailThreatService> SweepEngine<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            limiter: RateLimiter::new(),
        }
    }

    /// Sweep every mailbox for messages matching `criteria`.
    ///
    /// A mailbox whose sweep fails contributes nothing and never aborts the
    /// rest of the run; match order follows mailbox order, then response
    /// order within each mailbox. An empty result is a normal outcome.
    pub async fn search(
        &mut self,
        criteria: &SearchCriteria,
        mailboxes: &[String],
    ) -> Vec<MatchRecord> {
        let mut matches = Vec::new();
        for mailbox in mailboxes {
            self.limiter.permit().await;
            let params = criteria.query_params(mailbox);
            let response = match self.service.sweep(&params).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("sweep of {mailbox} failed, skipping mailbox: {e}");
                    continue;
                }
            };
            let before = matches.len();
            for entry in response.value {
                let record = MatchRecord {
                    mailbox: entry.mailbox,
                    message_id: entry.mail_message_id,
                    unique_id: entry.mail_unique_id,
                    delivery_time: entry.mail_message_delivery_time,
                };
                if !record.is_complete() {
                    warn!("dropping sweep entry with missing fields from {mailbox}");
                    continue;
                }
                matches.push(record);
            }
            let found = matches.len() - before;
            if found > 0 {
                info!("{found} message(s) matching {criteria} found in {mailbox}");
            }
        }
        matches
    }

    /// Remediate `matches` in input order, at most [`MAX_BATCH_SIZE`] per
    /// mitigation request.
    ///
    /// An incomplete record anywhere in the input fails the call before any
    /// request is made. A rejected batch marks all of its items failed and
    /// the run continues with the next batch.
    pub async fn remediate(
        &mut self,
        action: RemediationAction,
        matches: &[MatchRecord],
    ) -> Result<RemediationResult, EngineError> {
        if let Some(index) = matches.iter().position(|record| !record.is_complete()) {
            return Err(EngineError::IncompleteRecord { index });
        }

        let mut result = RemediationResult {
            attempted: matches.len(),
            ..Default::default()
        };
        let batches: Vec<&[MatchRecord]> = matches.chunks(MAX_BATCH_SIZE).collect();
        let total = batches.len();

        for (i, batch) in batches.iter().enumerate() {
            self.limiter.permit().await;
            let entries: Vec<MitigationEntry> = batch
                .iter()
                .map(|record| MitigationEntry::new(action.action_type(), record))
                .collect();
            match self.service.mitigate(&entries).await {
                Ok(()) => {
                    result.succeeded += batch.len();
                    info!(
                        "batch {}/{total}: {} message(s) submitted for {action}",
                        i + 1,
                        batch.len()
                    );
                }
                Err(e) => {
                    warn!("batch {}/{total} rejected by the service: {e}", i + 1);
                    result.failed.extend(batch.iter().map(|record| FailedItem {
                        record: record.clone(),
                        reason: BATCH_REJECTED_REASON.to_string(),
                    }));
                }
            }
            // Full batches get an extra breather before the next submission.
            if batch.len() == MAX_BATCH_SIZE && i + 1 < total {
                debug!("full batch submitted, pausing {INTER_BATCH_PAUSE_SECS}s");
                tokio::time::sleep(Duration::from_secs(INTER_BATCH_PAUSE_SECS)).await;
            }
        }
        Ok(result)
    }
}
