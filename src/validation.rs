use regex::Regex;

/// Pre-flight checks for operator-supplied search fields. Everything here
/// runs before the first remote call; a failed check aborts the run.
pub struct InputValidator {
    email: Regex,
    sha1: Regex,
    file_ext: Regex,
    subject: Regex,
}

impl InputValidator {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            email: Regex::new(r"^[a-zA-Z0-9_.\-]{1,64}@[a-zA-Z0-9_.\-]{3,64}\.[a-zA-Z]{2,24}$")?,
            sha1: Regex::new(r"^[0-9a-fA-F]{40}$")?,
            // Extension without the leading dot.
            file_ext: Regex::new(r"^[a-zA-Z0-9]{1,8}$")?,
            // RFC 5322 caps a subject line well below this.
            subject: Regex::new(r"^.{1,998}$")?,
        })
    }

    pub fn email(&self, address: &str) -> bool {
        self.email.is_match(address)
    }

    pub fn sha1(&self, hash: &str) -> bool {
        self.sha1.is_match(hash)
    }

    pub fn file_ext(&self, extension: &str) -> bool {
        self.file_ext.is_match(extension)
    }

    pub fn subject(&self, subject: &str) -> bool {
        self.subject.is_match(subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> InputValidator {
        InputValidator::new().unwrap()
    }

    #[test]
    fn accepts_ordinary_sender_addresses() {
        let v = validator();
        assert!(v.email("alerts@evil-sender.example.com"));
        assert!(v.email("a@bcd.io"));
        assert!(!v.email("not-an-address"));
        assert!(!v.email("user@localhost"));
        assert!(!v.email("user@example.com extra"));
    }

    #[test]
    fn sha1_must_be_forty_hex_chars() {
        let v = validator();
        assert!(v.sha1(&"a1".repeat(20)));
        assert!(!v.sha1(&"a1".repeat(19)));
        assert!(!v.sha1(&"g".repeat(40)));
    }

    #[test]
    fn file_extension_has_no_dot() {
        let v = validator();
        assert!(v.file_ext("pdf"));
        assert!(v.file_ext("docx"));
        assert!(!v.file_ext(".pdf"));
        assert!(!v.file_ext(""));
    }

    #[test]
    fn subject_length_is_bounded() {
        let v = validator();
        assert!(v.subject("Urgent: verify your account"));
        assert!(!v.subject(""));
        assert!(!v.subject(&"x".repeat(999)));
    }
}
