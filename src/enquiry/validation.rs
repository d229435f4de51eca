use std::{collections::BTreeMap, fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::models::EnquiryForm;

/// Something before an `@`, something after it, and a dot in the domain part.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Field
///
/// The editable fields of the enquiry form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Phone,
    Message,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Name, Field::Email, Field::Phone, Field::Message];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Message => "message",
        }
    }
}

/// FieldErrors
///
/// Per-field validation messages. An empty set means the form may be submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<Field, &'static str>);

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.0.contains_key(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &'static str)> + '_ {
        self.0.iter().map(|(field, message)| (*field, *message))
    }

    pub(crate) fn clear_field(&mut self, field: Field) {
        self.0.remove(&field);
    }

    fn insert(&mut self, field: Field, message: &'static str) {
        self.0.insert(field, message);
    }

    /// Owned `field -> message` map for response bodies.
    pub fn to_messages(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(field, message)| (field.as_str().to_string(), message.to_string()))
            .collect()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.values().copied().collect();
        write!(f, "{}", messages.join("; "))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

/// validate
///
/// Required-field and email-shape checks over the current form state. Pure: no I/O, no clock.
/// `phone` is optional and never produces an error.
pub fn validate(form: &EnquiryForm) -> FieldErrors {
    let mut errors = FieldErrors::default();

    if form.name.trim().is_empty() {
        errors.insert(Field::Name, "Name is required");
    }

    if form.email.trim().is_empty() {
        errors.insert(Field::Email, "Email is required");
    } else if !is_valid_email(&form.email) {
        errors.insert(Field::Email, "Please enter a valid email address");
    }

    if form.message.trim().is_empty() {
        errors.insert(Field::Message, "Message is required");
    }

    errors
}
