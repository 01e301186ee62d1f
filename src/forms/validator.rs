use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Email shape accepted by signup and login. Matching is purely syntactic.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is a valid regular expression")
});

/// Accumulates field-level and form-level errors for one submission.
///
/// Every rule is evaluated by the caller; the accumulator only decides what
/// gets recorded. The first message recorded for a field is kept and later
/// messages for the same field are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validator {
    field_errors: BTreeMap<String, String>,
    non_field_errors: Vec<String>,
}

impl Validator {
    pub fn valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    pub fn add_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.field_errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    pub fn check_field(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors.get(field).map(String::as_str)
    }

    pub fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }
}

pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Length bounds count characters, not bytes.
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

pub fn matches(value: &str, pattern: &Regex) -> bool {
    pattern.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_blank_trims_whitespace() {
        assert!(not_blank("x"));
        assert!(not_blank("  x  "));
        assert!(!not_blank(""));
        assert!(!not_blank(" \t\n "));
    }

    #[test]
    fn test_char_bounds_count_characters() {
        let accented = "é".repeat(100);
        assert_eq!(accented.len(), 200);
        assert!(max_chars(&accented, 100));
        assert!(!max_chars(&accented, 99));
        assert!(min_chars("pässwörd", 8));
        assert!(!min_chars("short", 8));
    }

    #[test]
    fn test_permitted_expiry_values() {
        for ok in [1, 7, 365] {
            assert!(permitted_value(&ok, &[1, 7, 365]));
        }
        for bad in [0, 2, 366, -1] {
            assert!(!permitted_value(&bad, &[1, 7, 365]));
        }
    }

    #[test]
    fn test_email_pattern() {
        assert!(matches("alice@example.com", &EMAIL_RX));
        assert!(matches("first.last+tag@sub.example.co", &EMAIL_RX));
        assert!(!matches("alice", &EMAIL_RX));
        assert!(!matches("alice@", &EMAIL_RX));
        assert!(!matches("@example.com", &EMAIL_RX));
        assert!(!matches("alice@-example.com", &EMAIL_RX));
        assert!(!matches("alice@example.com extra", &EMAIL_RX));
    }

    #[test]
    fn test_first_failure_wins() {
        let mut validator = Validator::default();
        validator.check_field(false, "title", "This field cannot be blank");
        validator.check_field(false, "title", "This field cannot be more than 100 characters long");
        validator.check_field(true, "content", "unused");

        assert_eq!(
            validator.field_error("title"),
            Some("This field cannot be blank")
        );
        assert_eq!(validator.field_errors().len(), 1);
        assert!(!validator.valid());
    }

    #[test]
    fn test_add_field_error_keeps_existing_message() {
        let mut validator = Validator::default();
        validator.add_field_error("email", "first");
        validator.add_field_error("email", "second");
        assert_eq!(validator.field_error("email"), Some("first"));
    }

    #[test]
    fn test_non_field_errors_invalidate() {
        let mut validator = Validator::default();
        assert!(validator.valid());

        validator.add_non_field_error("Email or password is incorrect");
        validator.add_non_field_error("another");
        assert!(!validator.valid());
        assert_eq!(validator.non_field_errors().len(), 2);
        assert!(validator.field_errors().is_empty());
    }
}
