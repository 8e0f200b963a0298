use std::fmt;

use thiserror::Error;

/// Maximum number of matches requested per mailbox sweep.
pub const RESULT_LIMIT: u32 = 1000;

/// One search intent against the mailbox service.
///
/// The service treats `url` and `file_sha1` as self-sufficient query shapes;
/// they cannot be combined with the sender/subject/extension family. Only
/// the combinations enumerated here exist — anything else is rejected by
/// [`SearchCriteria::from_parts`] before a request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    Url {
        url: String,
    },
    FileHash {
        sha1: String,
    },
    SenderSubjectExtension {
        sender: String,
        subject: String,
        extension: String,
    },
    SenderSubject {
        sender: String,
        subject: String,
    },
    SenderExtension {
        sender: String,
        extension: String,
    },
    Sender {
        sender: String,
    },
    Subject {
        subject: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("no search fields supplied")]
    Empty,
    #[error("a URL search cannot be combined with other search fields")]
    UrlNotAlone,
    #[error("a file hash search cannot be combined with other search fields")]
    HashNotAlone,
    #[error("unsupported search field combination: {0}")]
    Unsupported(&'static str),
}

impl SearchCriteria {
    /// Build criteria from optional caller-supplied fields, rejecting any
    /// combination the service does not understand.
    pub fn from_parts(
        sender: Option<String>,
        subject: Option<String>,
        extension: Option<String>,
        file_hash: Option<String>,
        url: Option<String>,
    ) -> Result<Self, CriteriaError> {
        if let Some(url) = url {
            if sender.is_some() || subject.is_some() || extension.is_some() || file_hash.is_some()
            {
                return Err(CriteriaError::UrlNotAlone);
            }
            return Ok(SearchCriteria::Url { url });
        }
        if let Some(sha1) = file_hash {
            if sender.is_some() || subject.is_some() || extension.is_some() {
                return Err(CriteriaError::HashNotAlone);
            }
            return Ok(SearchCriteria::FileHash { sha1 });
        }
        match (sender, subject, extension) {
            (Some(sender), Some(subject), Some(extension)) => {
                Ok(SearchCriteria::SenderSubjectExtension {
                    sender,
                    subject,
                    extension,
                })
            }
            (Some(sender), Some(subject), None) => {
                Ok(SearchCriteria::SenderSubject { sender, subject })
            }
            (Some(sender), None, Some(extension)) => {
                Ok(SearchCriteria::SenderExtension { sender, extension })
            }
            (Some(sender), None, None) => Ok(SearchCriteria::Sender { sender }),
            (None, Some(subject), None) => Ok(SearchCriteria::Subject { subject }),
            (None, None, None) => Err(CriteriaError::Empty),
            (None, Some(_), Some(_)) => {
                Err(CriteriaError::Unsupported("subject + file extension"))
            }
            (None, None, Some(_)) => Err(CriteriaError::Unsupported("file extension alone")),
        }
    }

    /// Sweep window in days. File hash searches look back a week; everything
    /// else covers the last day.
    pub fn lookback_days(&self) -> u32 {
        match self {
            SearchCriteria::FileHash { .. } => 7,
            _ => 1,
        }
    }

    /// Query parameters for one per-mailbox sweep request.
    pub fn query_params(&self, mailbox: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("mailbox", mailbox.to_string()),
            ("lastndays", self.lookback_days().to_string()),
        ];
        match self {
            SearchCriteria::Url { url } => params.push(("url", url.clone())),
            SearchCriteria::FileHash { sha1 } => params.push(("file_sha1", sha1.clone())),
            SearchCriteria::SenderSubjectExtension {
                sender,
                subject,
                extension,
            } => {
                params.push(("sender", sender.clone()));
                params.push(("subject", subject.clone()));
                params.push(("file_extension", extension.clone()));
            }
            SearchCriteria::SenderSubject { sender, subject } => {
                params.push(("sender", sender.clone()));
                params.push(("subject", subject.clone()));
            }
            SearchCriteria::SenderExtension { sender, extension } => {
                params.push(("sender", sender.clone()));
                params.push(("file_extension", extension.clone()));
            }
            SearchCriteria::Sender { sender } => params.push(("sender", sender.clone())),
            SearchCriteria::Subject { subject } => params.push(("subject", subject.clone())),
        }
        params.push(("limit", RESULT_LIMIT.to_string()));
        params
    }
}

impl fmt::Display for SearchCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchCriteria::Url { url } => write!(f, "url {url}"),
            SearchCriteria::FileHash { sha1 } => write!(f, "file hash {sha1}"),
            SearchCriteria::SenderSubjectExtension {
                sender,
                subject,
                extension,
            } => write!(f, "sender {sender}, subject {subject:?}, extension {extension}"),
            SearchCriteria::SenderSubject { sender, subject } => {
                write!(f, "sender {sender}, subject {subject:?}")
            }
            SearchCriteria::SenderExtension { sender, extension } => {
                write!(f, "sender {sender}, extension {extension}")
            }
            SearchCriteria::Sender { sender } => write!(f, "sender {sender}"),
            SearchCriteria::Subject { subject } => write!(f, "subject {subject:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_map(criteria: &SearchCriteria) -> Vec<(&'static str, String)> {
        criteria.query_params("user@example.com")
    }

    #[test]
    fn url_alone_maps_to_one_day_url_query() {
        let criteria =
            SearchCriteria::from_parts(None, None, None, None, Some("https://evil.test/x".into()))
                .unwrap();
        assert_eq!(
            params_map(&criteria),
            vec![
                ("mailbox", "user@example.com".to_string()),
                ("lastndays", "1".to_string()),
                ("url", "https://evil.test/x".to_string()),
                ("limit", "1000".to_string()),
            ]
        );
    }

    #[test]
    fn file_hash_maps_to_seven_day_sha1_query() {
        let sha1 = "a".repeat(40);
        let criteria =
            SearchCriteria::from_parts(None, None, None, Some(sha1.clone()), None).unwrap();
        assert_eq!(criteria.lookback_days(), 7);
        assert_eq!(
            params_map(&criteria),
            vec![
                ("mailbox", "user@example.com".to_string()),
                ("lastndays", "7".to_string()),
                ("file_sha1", sha1),
                ("limit", "1000".to_string()),
            ]
        );
    }

    #[test]
    fn sender_subject_extension_combination() {
        let criteria = SearchCriteria::from_parts(
            Some("bad@evil.test".into()),
            Some("Invoice".into()),
            Some("iso".into()),
            None,
            None,
        )
        .unwrap();
        let params = params_map(&criteria);
        assert_eq!(params[2], ("sender", "bad@evil.test".to_string()));
        assert_eq!(params[3], ("subject", "Invoice".to_string()));
        assert_eq!(params[4], ("file_extension", "iso".to_string()));
        assert_eq!(params.last().unwrap(), &("limit", "1000".to_string()));
    }

    #[test]
    fn sender_subject_combination() {
        let criteria = SearchCriteria::from_parts(
            Some("bad@evil.test".into()),
            Some("Invoice".into()),
            None,
            None,
            None,
        )
        .unwrap();
        let keys: Vec<&str> = params_map(&criteria).iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["mailbox", "lastndays", "sender", "subject", "limit"]);
    }

    #[test]
    fn sender_extension_combination() {
        let criteria = SearchCriteria::from_parts(
            Some("bad@evil.test".into()),
            None,
            Some("zip".into()),
            None,
            None,
        )
        .unwrap();
        let keys: Vec<&str> = params_map(&criteria).iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec!["mailbox", "lastndays", "sender", "file_extension", "limit"]
        );
    }

    #[test]
    fn sender_alone_and_subject_alone() {
        let sender =
            SearchCriteria::from_parts(Some("bad@evil.test".into()), None, None, None, None)
                .unwrap();
        assert!(matches!(sender, SearchCriteria::Sender { .. }));

        let subject =
            SearchCriteria::from_parts(None, Some("Reset your password".into()), None, None, None)
                .unwrap();
        assert!(matches!(subject, SearchCriteria::Subject { .. }));
        assert_eq!(subject.lookback_days(), 1);
    }

    #[test]
    fn url_combined_with_sender_is_rejected() {
        let err = SearchCriteria::from_parts(
            Some("bad@evil.test".into()),
            None,
            None,
            None,
            Some("https://evil.test".into()),
        )
        .unwrap_err();
        assert_eq!(err, CriteriaError::UrlNotAlone);
    }

    #[test]
    fn hash_combined_with_subject_is_rejected() {
        let err = SearchCriteria::from_parts(
            None,
            Some("Invoice".into()),
            None,
            Some("b".repeat(40)),
            None,
        )
        .unwrap_err();
        assert_eq!(err, CriteriaError::HashNotAlone);
    }

    #[test]
    fn leftover_combinations_are_rejected() {
        assert_eq!(
            SearchCriteria::from_parts(None, None, None, None, None).unwrap_err(),
            CriteriaError::Empty
        );
        assert!(matches!(
            SearchCriteria::from_parts(None, Some("s".into()), Some("pdf".into()), None, None)
                .unwrap_err(),
            CriteriaError::Unsupported(_)
        ));
        assert!(matches!(
            SearchCriteria::from_parts(None, None, Some("pdf".into()), None, None).unwrap_err(),
            CriteriaError::Unsupported(_)
        ));
    }
}
