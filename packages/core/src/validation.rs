// ABOUTME: Field-level input validation shared by request handlers
// ABOUTME: Collects the first error message per field for a 422 response

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Loose RFC 5322 address check used for registration and login
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap_or_else(|e| panic!("email regex must compile: {e}"))
});

/// Accumulates validation failures keyed by field name.
#[derive(Debug, Default, Clone)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record an error unless the field already has one.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_insert_with(|| message.into());
    }

    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn into_errors(self) -> BTreeMap<String, String> {
        self.errors
    }

    pub fn validate_email(&mut self, email: &str) {
        self.check(!email.is_empty(), "email", "must be provided");
        self.check(
            EMAIL_RX.is_match(email),
            "email",
            "must be a valid email address",
        );
    }

    pub fn validate_password_plaintext(&mut self, password: &str) {
        self.check(!password.is_empty(), "password", "must be provided");
        self.check(
            password.len() >= 8,
            "password",
            "must be at least 8 bytes long",
        );
        self.check(
            password.len() <= 72,
            "password",
            "must not be more than 72 bytes long",
        );
    }
}

/// True if `value` is one of `permitted`.
pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.iter().any(|p| p == value)
}
