use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};

/// Value of `source` on every enquiry raised from a content page.
pub const ENQUIRY_SOURCE: &str = "blog-enquiry";

// --- Enquiry Schemas ---

/// EnquiryForm
///
/// The editable lead-capture fields as the visitor typed them. Accepted both as JSON and as a
/// url-encoded form post. Empty strings are legal here; `enquiry::validate` decides what is missing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq, Eq)]
#[ts(export)]
pub struct EnquiryForm {
    #[serde(default)]
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    #[schema(example = "We have 200 laptops to retire.")]
    pub message: String,
}

/// PageRef
///
/// Identifies the content page an enquiry was raised on.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, IntoParams, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
#[ts(export)]
pub struct PageRef {
    #[serde(default)]
    pub blog_id: String,
    #[serde(default)]
    pub blog_title: String,
}

impl PageRef {
    pub fn new(blog_id: impl Into<String>, blog_title: impl Into<String>) -> Self {
        Self {
            blog_id: blog_id.into(),
            blog_title: blog_title.into(),
        }
    }
}

/// EnquirySubmission
///
/// The payload both sinks receive. Built once per submit from a valid form and the page it was
/// raised on, then dropped when the sinks settle.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnquirySubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
    pub blog_id: String,
    pub blog_title: String,
    pub source: String,
    #[serde(serialize_with = "serialize_millis")]
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

// Both sinks must carry the same timestamp text.
fn serialize_millis<S: serde::Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl EnquirySubmission {
    /// Trims the free-text fields and stamps the submission with `at`.
    pub fn new(form: &EnquiryForm, page: &PageRef, at: DateTime<Utc>) -> Self {
        Self {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            message: form.message.trim().to_string(),
            blog_id: page.blog_id.clone(),
            blog_title: page.blog_title.clone(),
            source: ENQUIRY_SOURCE.to_string(),
            timestamp: at,
        }
    }

    /// RFC 3339 timestamp with millisecond precision, as the relay receives it.
    pub fn timestamp_string(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// The lead fields in the order the relay renders them.
    pub fn lead_fields(&self) -> [(&'static str, String); 8] {
        [
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("phone", self.phone.clone()),
            ("message", self.message.clone()),
            ("blogId", self.blog_id.clone()),
            ("blogTitle", self.blog_title.clone()),
            ("source", self.source.clone()),
            ("timestamp", self.timestamp_string()),
        ]
    }
}

/// EnquiryRequest
///
/// JSON body of `POST /enquiries`. The page may be given here or in the query string.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnquiryRequest {
    #[serde(flatten)]
    pub form: EnquiryForm,
    #[serde(default)]
    pub blog_id: Option<String>,
    #[serde(default)]
    pub blog_title: Option<String>,
}

/// EnquiryAccepted
///
/// Success body of `POST /enquiries`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct EnquiryAccepted {
    pub status: String,
    pub api_delivered: bool,
    pub relay_delivered: bool,
}

/// EnquiryRejected
///
/// Error body of `POST /enquiries`: a single user-facing message plus per-field messages when
/// the form failed validation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct EnquiryRejected {
    pub error: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

// --- Access Schemas ---

/// RoleClaim
///
/// A user record may carry a single role or a list of roles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RoleClaim {
    One(String),
    Many(Vec<String>),
}

/// CurrentUser
///
/// The viewer as seen by the access gate. Comes either from the verified auth context or from a
/// JSON value persisted on the client. Fields this service does not know are kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CurrentUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RoleClaim>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl CurrentUser {
    pub fn with_role(email: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            role: Some(RoleClaim::One(role.into())),
            ..Self::default()
        }
    }
}

/// AccessQuery
///
/// Query string of `GET /access/check`. `roles` is a comma-separated list.
#[derive(Debug, Clone, Deserialize, IntoParams, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AccessQuery {
    pub permission: Option<String>,
    pub roles: Option<String>,
    #[serde(default)]
    pub require_all: bool,
}

/// AccessDecision
///
/// Outcome of a gate evaluation, UI ready.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AccessDecision {
    pub visible: bool,
    pub primary_role: Option<String>,
    // "no_user" | "missing_permission" | "role_mismatch", absent when visible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// UserProfile
///
/// Output schema for `GET /me`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: Option<String>,
    pub email: Option<String>,
    pub primary_role: String,
    pub permissions: Vec<String>,
}

/// RolePermissions
///
/// One row of the permission table, as served to administrators.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct RolePermissions {
    pub role: String,
    pub permissions: Vec<String>,
}
