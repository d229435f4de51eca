use async_trait::async_trait;
use reqwest::multipart::Form;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

use crate::models::EnquirySubmission;

/// Path of the first-party endpoint, relative to the configured API base URL.
pub const CONTACT_SUBMISSIONS_PATH: &str = "/api/ContactFormSubmissions";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{sink} rejected the enquiry with status {status}")]
    Rejected { sink: &'static str, status: u16 },

    #[error("{sink} did not answer in time")]
    Timeout { sink: &'static str },

    #[error("{sink} could not be reached: {message}")]
    Transport { sink: &'static str, message: String },

    #[error("{sink} was not attempted")]
    Skipped { sink: &'static str },
}

impl SinkError {
    /// The sink never answered, as opposed to answering with an error status.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SinkError::Timeout { .. } | SinkError::Transport { .. })
    }

    fn from_reqwest(sink: &'static str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            SinkError::Timeout { sink }
        } else {
            SinkError::Transport {
                sink,
                message: error.to_string(),
            }
        }
    }
}

/// SinkReceipt
///
/// Proof that a sink accepted the enquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    pub sink: &'static str,
    pub status: u16,
}

// 1. LeadSink Contract
/// LeadSink
///
/// One destination an enquiry is delivered to. The submitter only sees this trait, so the real
/// HTTP sinks and the recording `MockSink` are interchangeable.
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Short, stable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Delivers one submission. A non-2xx answer is an error, not a receipt.
    async fn deliver(&self, submission: &EnquirySubmission) -> Result<SinkReceipt, SinkError>;
}

/// SinkState
///
/// Shared handle to a sink, as held by the submitter.
pub type SinkState = Arc<dyn LeadSink>;

/// Builds the HTTP client both real sinks share. `timeout` bounds every request.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().timeout(timeout).build()
}

// 2. First-party API
/// ApiSink
///
/// Posts the submission as JSON to the site's own backend.
#[derive(Clone)]
pub struct ApiSink {
    client: reqwest::Client,
    endpoint: String,
}

impl ApiSink {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}{}",
                base_url.trim_end_matches('/'),
                CONTACT_SUBMISSIONS_PATH
            ),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl LeadSink for ApiSink {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn deliver(&self, submission: &EnquirySubmission) -> Result<SinkReceipt, SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(submission)
            .send()
            .await
            .map_err(|e| SinkError::from_reqwest(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                sink: self.name(),
                status: status.as_u16(),
            });
        }

        Ok(SinkReceipt {
            sink: self.name(),
            status: status.as_u16(),
        })
    }
}

// 3. Third-party relay
/// RelaySink
///
/// Posts the submission as multipart form data to the external form relay, which forwards it by
/// email. The `_`-prefixed fields are routing instructions for the relay, not lead data.
#[derive(Clone)]
pub struct RelaySink {
    client: reqwest::Client,
    url: String,
    cc: Vec<String>,
    webhook: String,
}

impl RelaySink {
    pub fn new(client: reqwest::Client, url: &str, cc: Vec<String>, webhook: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
            cc,
            webhook: webhook.to_string(),
        }
    }

    pub fn subject(submission: &EnquirySubmission) -> String {
        format!("New Enquiry from Blog: {}", submission.blog_title)
    }

    /// Routing metadata followed by the lead fields, in the order the relay lays out its table.
    pub fn form_fields(&self, submission: &EnquirySubmission) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("_subject", Self::subject(submission)),
            ("_cc", self.cc.join(",")),
            ("_webhook", self.webhook.clone()),
            ("_captcha", "false".to_string()),
            ("_template", "table".to_string()),
        ];
        fields.extend(submission.lead_fields());
        fields
    }
}

#[async_trait]
impl LeadSink for RelaySink {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn deliver(&self, submission: &EnquirySubmission) -> Result<SinkReceipt, SinkError> {
        let form = self
            .form_fields(submission)
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value));

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| SinkError::from_reqwest(self.name(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Rejected {
                sink: self.name(),
                status: status.as_u16(),
            });
        }

        Ok(SinkReceipt {
            sink: self.name(),
            status: status.as_u16(),
        })
    }
}

// 4. The Mock Implementation
/// MockSink
///
/// Records every delivery attempt in memory. Can be told to reject, to fail at the transport
/// level, or to take a while, and can share a journal with other mocks so tests can assert the
/// order sinks were called in.
#[derive(Clone)]
pub struct MockSink {
    name: &'static str,
    failure: Option<MockFailure>,
    latency: Option<Duration>,
    deliveries: Arc<Mutex<Vec<EnquirySubmission>>>,
    journal: Option<Arc<Mutex<Vec<&'static str>>>>,
}

#[derive(Clone, Copy, Debug)]
enum MockFailure {
    Reject(u16),
    Unreachable,
}

impl MockSink {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            failure: None,
            latency: None,
            deliveries: Arc::new(Mutex::new(Vec::new())),
            journal: None,
        }
    }

    /// Answers every delivery with the given non-2xx status.
    pub fn rejecting(name: &'static str, status: u16) -> Self {
        Self {
            failure: Some(MockFailure::Reject(status)),
            ..Self::new(name)
        }
    }

    /// Fails every delivery as if the endpoint could not be reached.
    pub fn unreachable(name: &'static str) -> Self {
        Self {
            failure: Some(MockFailure::Unreachable),
            ..Self::new(name)
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_journal(mut self, journal: Arc<Mutex<Vec<&'static str>>>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Every submission this sink was asked to deliver, accepted or not.
    pub fn deliveries(&self) -> Vec<EnquirySubmission> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls(&self) -> usize {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl LeadSink for MockSink {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn deliver(&self, submission: &EnquirySubmission) -> Result<SinkReceipt, SinkError> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(submission.clone());

        if let Some(journal) = &self.journal {
            journal
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(self.name);
        }

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.failure {
            None => Ok(SinkReceipt {
                sink: self.name,
                status: 200,
            }),
            Some(MockFailure::Reject(status)) => Err(SinkError::Rejected {
                sink: self.name,
                status,
            }),
            Some(MockFailure::Unreachable) => Err(SinkError::Transport {
                sink: self.name,
                message: "Mock Sink Error: Simulation requested".to_string(),
            }),
        }
    }
}
