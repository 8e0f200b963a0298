use std::time::Duration;

use log::{info, warn};
use reqwest::Client;
use thiserror::Error;
use url::Url;

const OPENPHISH_FEED: &str = "https://openphish.com/feed.txt";
const PHISH_TANK_BASE: &str = "http://data.phishtank.com/data";
// OpenPhish serves an empty document to obvious non-browser clients.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/72.0.3626.121 Safari/537.36";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("feed endpoint answered with HTTP {0}")]
    Status(u16),
    #[error("feed document is empty")]
    EmptyFeed,
    #[error("feed document has no url column")]
    MissingUrlColumn,
}

/// Fetches candidate phishing URLs from the public blocklist feeds.
/// Each feed is pulled at most once per session, by the caller.
pub struct ThreatFeedClient {
    client: Client,
}

impl ThreatFeedClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Verified phishing URLs from the PhishTank CSV feed.
    pub async fn phish_tank_urls(&self, api_key: &str) -> Result<Vec<String>, FeedError> {
        let feed_url = format!("{PHISH_TANK_BASE}/{api_key}/online-valid.csv");
        let response = self.client.get(&feed_url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        let urls = parse_csv_url_column(&body)?;
        info!("PhishTank feed yielded {} URL(s)", urls.len());
        Ok(urls)
    }

    /// Verified phishing URLs from the OpenPhish text feed, one per line.
    pub async fn openphish_urls(&self) -> Result<Vec<String>, FeedError> {
        let response = self.client.get(OPENPHISH_FEED).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        let urls = parse_line_feed(&body);
        info!("OpenPhish feed yielded {} URL(s)", urls.len());
        Ok(urls)
    }
}

fn parse_line_feed(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pull the `url` column out of the feed CSV. Entries that don't parse as
/// URLs are dropped rather than handed to the sweep.
fn parse_csv_url_column(body: &str) -> Result<Vec<String>, FeedError> {
    let mut lines = body.lines().filter(|line| !line.trim().is_empty());
    let header = lines.next().ok_or(FeedError::EmptyFeed)?;
    let url_column = split_csv_line(header)
        .iter()
        .position(|column| column == "url")
        .ok_or(FeedError::MissingUrlColumn)?;

    let mut urls = Vec::new();
    for line in lines {
        let fields = split_csv_line(line);
        match fields.get(url_column) {
            Some(candidate) if Url::parse(candidate).is_ok() => urls.push(candidate.clone()),
            Some(candidate) => warn!("skipping malformed feed entry: {candidate}"),
            None => warn!("skipping short feed row: {line}"),
        }
    }
    Ok(urls)
}

// Minimal CSV field split: handles quoted fields and doubled-quote escapes,
// which is all the feed uses.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut field));
            }
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_column_is_extracted_by_header_position() {
        let csv = "phish_id,url,phish_detail_url,verified\n\
                   1,http://evil.test/a,http://tank.test/1,yes\n\
                   2,\"http://evil.test/b,c\",http://tank.test/2,yes\n";
        let urls = parse_csv_url_column(csv).unwrap();
        assert_eq!(
            urls,
            vec![
                "http://evil.test/a".to_string(),
                "http://evil.test/b,c".to_string()
            ]
        );
    }

    #[test]
    fn malformed_entries_are_dropped() {
        let csv = "phish_id,url\n1,http://evil.test/a\n2,not a url\n";
        let urls = parse_csv_url_column(csv).unwrap();
        assert_eq!(urls, vec!["http://evil.test/a".to_string()]);
    }

    #[test]
    fn missing_url_column_is_an_error() {
        let csv = "phish_id,target\n1,acme\n";
        assert!(matches!(
            parse_csv_url_column(csv),
            Err(FeedError::MissingUrlColumn)
        ));
    }

    #[test]
    fn empty_feed_is_an_error() {
        assert!(matches!(parse_csv_url_column("\n\n"), Err(FeedError::EmptyFeed)));
    }

    #[test]
    fn line_feed_skips_blanks() {
        let body = "http://evil.test/a\n\n  http://evil.test/b  \n";
        assert_eq!(
            parse_line_feed(body),
            vec![
                "http://evil.test/a".to_string(),
                "http://evil.test/b".to_string()
            ]
        );
    }

    #[test]
    fn quoted_fields_with_escapes_split_cleanly() {
        let fields = split_csv_line(r#"1,"say ""hi"", ok",last"#);
        assert_eq!(fields, vec!["1", r#"say "hi", ok"#, "last"]);
    }
}
