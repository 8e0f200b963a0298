/// One email message matched by a sweep, addressed precisely enough for the
/// mitigation endpoint to act on it.
///
/// All four fields are service-assigned opaque strings. `delivery_time` in
/// particular is echoed back verbatim on remediation — it is never parsed,
/// reformatted, or timezone-adjusted on this side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub mailbox: String,
    pub message_id: String,
    pub unique_id: String,
    pub delivery_time: String,
}

impl MatchRecord {
    /// A record is only actionable when every field is present. Incomplete
    /// records must never reach the mitigation endpoint.
    pub fn is_complete(&self) -> bool {
        !self.mailbox.is_empty()
            && !self.message_id.is_empty()
            && !self.unique_id.is_empty()
            && !self.delivery_time.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> MatchRecord {
        MatchRecord {
            mailbox: "user@example.com".to_string(),
            message_id: "<msg-1@example.com>".to_string(),
            unique_id: "AAMkAD-unique".to_string(),
            delivery_time: "2020-03-06T18:31:27.000Z".to_string(),
        }
    }

    #[test]
    fn complete_record_passes() {
        assert!(full_record().is_complete());
    }

    #[test]
    fn any_empty_field_fails() {
        for field in 0..4 {
            let mut record = full_record();
            match field {
                0 => record.mailbox.clear(),
                1 => record.message_id.clear(),
                2 => record.unique_id.clear(),
                _ => record.delivery_time.clear(),
            }
            assert!(!record.is_complete());
        }
    }
}
