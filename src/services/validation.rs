//! Field validation for user forms and imported rows.
//!
//! Rules stop at the first failure per field, and every failing field is
//! reported, in the order the fields were checked.

use regex::Regex;
use serde::Serialize;
use serde::ser::SerializeMap;
use std::sync::LazyLock;

/// Maximum length of name and email fields, in characters.
pub const MAX_FIELD_LENGTH: usize = 255;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_LOCAL_PART_LENGTH: usize = 64;

#[allow(clippy::expect_used)]
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63}$",
    )
    .expect("static regex: email address pattern")
});

/// Returns whether `email` is a syntactically valid address.
///
/// Accepts a dot-atom local part and a dotted domain ending in an alphabetic
/// top-level label. Quoted local parts and IP-literal domains are rejected.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    match email.split_once('@') {
        Some((local, _)) if local.len() > MAX_LOCAL_PART_LENGTH => false,
        Some(_) => EMAIL_REGEX.is_match(email),
        None => false,
    }
}

/// Validation failures keyed by field, in insertion order.
///
/// Serializes as a JSON object of `field -> [messages]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: Vec<(String, Vec<String>)>,
}

impl ValidationErrors {
    /// Creates an empty error set.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Creates an error set with a single message.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Adds a message for `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        if let Some((_, messages)) = self.fields.iter_mut().find(|(f, _)| *f == field) {
            messages.push(message);
        } else {
            self.fields.push((field, vec![message]));
        }
    }

    /// Returns whether no field failed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the number of failing fields.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns the messages for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, messages)| messages.as_slice())
    }

    /// Returns whether `field` failed.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Returns the first message recorded.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        self.fields
            .first()
            .and_then(|(_, messages)| messages.first())
            .map(String::as_str)
    }

    /// Converts into `Ok(())` when empty, otherwise a validation error.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] carrying `self` when not empty.
    pub fn into_result(self) -> crate::Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(crate::Error::Validation(self))
        }
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// Checks a required string field against a maximum length.
///
/// Returns the message for the first failing rule, if any.
#[must_use]
pub fn check_required_max(field: &str, value: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some(format!("The {field} field is required."));
    }
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Some(format!(
            "The {field} field must not be greater than {MAX_FIELD_LENGTH} characters."
        ));
    }
    None
}

/// Checks the syntactic email rules: required, format, length.
///
/// Uniqueness needs the store and is checked by the caller.
#[must_use]
pub fn check_email(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return Some("The email field is required.".to_string());
    }
    // Checked before the format rule, which also rejects long addresses.
    if value.chars().count() > MAX_FIELD_LENGTH {
        return Some(format!(
            "The email field must not be greater than {MAX_FIELD_LENGTH} characters."
        ));
    }
    if !is_valid_email(value) {
        return Some("The email field must be a valid email address.".to_string());
    }
    None
}

/// Checks a password and its confirmation.
#[must_use]
pub fn check_password(password: &str, confirmation: Option<&str>) -> Option<String> {
    if password.trim().is_empty() {
        return Some("The password field is required.".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some(format!(
            "The password field must be at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if confirmation != Some(password) {
        return Some("The password field confirmation does not match.".to_string());
    }
    None
}

/// Message for an email owned by another user.
pub const EMAIL_TAKEN: &str = "The email has already been taken.";

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("user@example.com" ; "simple")]
    #[test_case("first.last+tag@sub.example.co.uk" ; "dots plus and subdomains")]
    #[test_case("o'brien@example.ie" ; "apostrophe")]
    #[test_case("x@a-b.io" ; "hyphenated domain")]
    fn test_valid_emails(email: &str) {
        assert!(is_valid_email(email), "{email} should be valid");
    }

    #[test_case("invalid-email-format" ; "no at sign")]
    #[test_case("@example.com" ; "empty local part")]
    #[test_case("user@" ; "empty domain")]
    #[test_case("user@localhost" ; "no dot in domain")]
    #[test_case("user@@example.com" ; "double at")]
    #[test_case(".user@example.com" ; "leading dot")]
    #[test_case("us..er@example.com" ; "consecutive dots")]
    #[test_case("user@-example.com" ; "label starts with hyphen")]
    #[test_case("user name@example.com" ; "space")]
    #[test_case("user@example.c0m" ; "numeric tld")]
    fn test_invalid_emails(email: &str) {
        assert!(!is_valid_email(email), "{email} should be invalid");
    }

    #[test]
    fn test_email_length_limits() {
        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(!is_valid_email(&long_local));
        let long_domain = format!("a@{}.com", "b".repeat(250));
        assert!(!is_valid_email(&long_domain));
    }

    #[test]
    fn test_validation_errors_order_and_serialization() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "The name field is required.");
        errors.add("email", "The email field is required.");
        errors.add("name", "second");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.first_message(), Some("The name field is required."));
        assert_eq!(errors.get("name").map(<[String]>::len), Some(2));
        assert!(!errors.has("password"));

        let json = serde_json::to_string(&errors).unwrap();
        assert_eq!(
            json,
            r#"{"name":["The name field is required.","second"],"email":["The email field is required."]}"#
        );
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let err = ValidationErrors::single("name", "bad").into_result().unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));
    }

    #[test]
    fn test_check_required_max() {
        assert_eq!(
            check_required_max("name", "  "),
            Some("The name field is required.".to_string())
        );
        assert!(check_required_max("name", &"x".repeat(255)).is_none());
        assert_eq!(
            check_required_max("name", &"x".repeat(256)),
            Some("The name field must not be greater than 255 characters.".to_string())
        );
    }

    #[test]
    fn test_check_email() {
        assert_eq!(
            check_email("invalid-email-format"),
            Some("The email field must be a valid email address.".to_string())
        );
        assert!(check_email("ok@example.com").is_none());
    }

    #[test_case(
        &format!("{}@example.com", "a".repeat(243)),
        Some("The email field must be a valid email address.") ;
        "255 characters falls through to format"
    )]
    #[test_case(
        &format!("{}@example.com", "a".repeat(244)),
        Some("The email field must not be greater than 255 characters.") ;
        "256 characters reports length"
    )]
    #[test_case(
        &format!("{}@{}.com", "a".repeat(40), "b".repeat(300)),
        Some("The email field must not be greater than 255 characters.") ;
        "length wins over format"
    )]
    fn test_check_email_length(email: &str, expected: Option<&str>) {
        assert_eq!(check_email(email).as_deref(), expected);
    }

    #[test]
    fn test_check_password() {
        assert_eq!(
            check_password("", None),
            Some("The password field is required.".to_string())
        );
        assert_eq!(
            check_password("        ", Some("        ")),
            Some("The password field is required.".to_string())
        );
        assert_eq!(
            check_password("short", Some("short")),
            Some("The password field must be at least 8 characters.".to_string())
        );
        assert_eq!(
            check_password("long-enough", Some("different")),
            Some("The password field confirmation does not match.".to_string())
        );
        assert_eq!(
            check_password("long-enough", None),
            Some("The password field confirmation does not match.".to_string())
        );
        assert!(check_password("long-enough", Some("long-enough")).is_none());
    }

    proptest! {
        #[test]
        fn prop_generated_addresses_are_valid(
            local in "[a-z0-9]{1,20}(\\.[a-z0-9]{1,10}){0,2}",
            domain in "[a-z0-9]{1,20}",
            tld in "[a-z]{2,6}",
        ) {
            let email = format!("{local}@{domain}.{tld}");
            prop_assert!(is_valid_email(&email));
        }

        #[test]
        fn prop_strings_without_at_are_invalid(s in "[^@]{0,80}") {
            prop_assert!(!is_valid_email(&s));
        }
    }
}
