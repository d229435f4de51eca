use std::{str::FromStr, sync::Arc};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::sink::{ApiSink, LeadSink, RelaySink, SinkError, SinkReceipt, SinkState, http_client};
use super::validation::{FieldErrors, validate};
use crate::config::AppConfig;
use crate::models::{EnquiryForm, EnquirySubmission, PageRef};

/// The single message a visitor sees when delivery fails, whatever the cause.
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to send enquiry. Please try again.";

/// DispatchMode
///
/// `Sequential` awaits the API before starting the relay, so the relay (and its webhook) always
/// sees a lead after the API has. `Concurrent` starts both and waits for both to settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    #[default]
    Sequential,
    Concurrent,
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(DispatchMode::Sequential),
            "concurrent" => Ok(DispatchMode::Concurrent),
            other => Err(format!("unknown dispatch mode `{other}`")),
        }
    }
}

/// DeliveryPolicy
///
/// Turns the two sink outcomes into one user-visible result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryPolicy {
    /// An API error status is only logged, but an unreachable API fails the submission and, in
    /// sequential mode, the relay is not attempted. The relay decides otherwise.
    #[default]
    RelayRequired,
    /// Every API failure is only logged; the relay alone decides.
    TolerateApi,
    /// At least one sink accepted.
    Any,
    /// Both sinks accepted.
    All,
}

type Outcome = Result<SinkReceipt, SinkError>;

impl DeliveryPolicy {
    pub fn accepts(&self, api: &Outcome, relay: &Outcome) -> bool {
        match self {
            DeliveryPolicy::RelayRequired => relay.is_ok() && !self.stops_after(api),
            DeliveryPolicy::TolerateApi => relay.is_ok(),
            DeliveryPolicy::Any => api.is_ok() || relay.is_ok(),
            DeliveryPolicy::All => api.is_ok() && relay.is_ok(),
        }
    }

    /// Whether this API outcome already decides a failed submission.
    pub fn stops_after(&self, api: &Outcome) -> bool {
        match self {
            DeliveryPolicy::RelayRequired => api.as_ref().is_err_and(|e| e.is_unreachable()),
            DeliveryPolicy::TolerateApi | DeliveryPolicy::Any | DeliveryPolicy::All => false,
        }
    }
}

impl FromStr for DeliveryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relay-required" => Ok(DeliveryPolicy::RelayRequired),
            "tolerate-api" => Ok(DeliveryPolicy::TolerateApi),
            "any" => Ok(DeliveryPolicy::Any),
            "all" => Ok(DeliveryPolicy::All),
            other => Err(format!("unknown delivery policy `{other}`")),
        }
    }
}

/// DeliveryReport
///
/// What each sink made of one submission.
#[derive(Debug)]
pub struct DeliveryReport {
    pub submission: EnquirySubmission,
    pub api: Result<SinkReceipt, SinkError>,
    pub relay: Result<SinkReceipt, SinkError>,
}

impl DeliveryReport {
    pub fn api_delivered(&self) -> bool {
        self.api.is_ok()
    }

    pub fn relay_delivered(&self) -> bool {
        self.relay.is_ok()
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("enquiry form is invalid: {0}")]
    Invalid(FieldErrors),

    #[error("enquiry could not be delivered")]
    Delivery(Box<DeliveryReport>),
}

impl SubmitError {
    /// Message to show next to the form.
    pub fn user_message(&self) -> &'static str {
        match self {
            SubmitError::Invalid(_) => "Please correct the highlighted fields.",
            SubmitError::Delivery(_) => SUBMIT_FAILED_MESSAGE,
        }
    }
}

/// EnquirySubmitter
///
/// Validates an enquiry form and delivers the resulting submission to the first-party API and
/// the third-party relay. There is no retry and no idempotency key: one call, one attempt per sink.
#[derive(Clone)]
pub struct EnquirySubmitter {
    api: SinkState,
    relay: SinkState,
    mode: DispatchMode,
    policy: DeliveryPolicy,
}

impl EnquirySubmitter {
    pub fn new(api: SinkState, relay: SinkState) -> Self {
        Self {
            api,
            relay,
            mode: DispatchMode::default(),
            policy: DeliveryPolicy::default(),
        }
    }

    /// Real HTTP sinks configured from `AppConfig`.
    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = http_client(config.sink_timeout)?;
        let api = Arc::new(ApiSink::new(client.clone(), &config.api_base_url)) as SinkState;
        let relay = Arc::new(RelaySink::new(
            client,
            &config.relay_url,
            config.relay_cc.clone(),
            &config.relay_webhook,
        )) as SinkState;

        Ok(Self::new(api, relay)
            .with_dispatch_mode(config.dispatch_mode)
            .with_policy(config.delivery_policy))
    }

    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_policy(mut self, policy: DeliveryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn policy(&self) -> DeliveryPolicy {
        self.policy
    }

    /// submit
    ///
    /// Validates `form`; an invalid form never reaches the network. A valid one is stamped with
    /// the current time, tied to `page`, and handed to `deliver`.
    pub async fn submit(
        &self,
        form: &EnquiryForm,
        page: &PageRef,
    ) -> Result<DeliveryReport, SubmitError> {
        let errors = validate(form);
        if !errors.is_empty() {
            tracing::debug!(blog_id = %page.blog_id, fields = %errors, "enquiry rejected by validation");
            return Err(SubmitError::Invalid(errors));
        }

        self.deliver(EnquirySubmission::new(form, page, Utc::now()))
            .await
    }

    /// deliver
    ///
    /// Sends an already validated submission to both sinks according to the dispatch mode, then
    /// applies the delivery policy. Each failing sink is logged with its name.
    pub async fn deliver(&self, submission: EnquirySubmission) -> Result<DeliveryReport, SubmitError> {
        let (api, relay) = match self.mode {
            DispatchMode::Sequential => {
                let api = self.api.deliver(&submission).await;
                let relay = if self.policy.stops_after(&api) {
                    Err(SinkError::Skipped {
                        sink: self.relay.name(),
                    })
                } else {
                    self.relay.deliver(&submission).await
                };
                (api, relay)
            }
            DispatchMode::Concurrent => {
                tokio::join!(self.api.deliver(&submission), self.relay.deliver(&submission))
            }
        };

        if let Err(e) = &api {
            tracing::warn!(sink = self.api.name(), error = %e, "first-party enquiry submission failed");
        }
        if let Err(e @ SinkError::Skipped { .. }) = &relay {
            tracing::debug!(sink = self.relay.name(), error = %e, "relay skipped after API failure");
        } else if let Err(e) = &relay {
            tracing::warn!(sink = self.relay.name(), error = %e, "relay enquiry submission failed");
        }

        let report = DeliveryReport {
            submission,
            api,
            relay,
        };

        if self.policy.accepts(&report.api, &report.relay) {
            tracing::info!(
                blog_id = %report.submission.blog_id,
                api = report.api_delivered(),
                relay = report.relay_delivered(),
                "enquiry delivered"
            );
            Ok(report)
        } else {
            tracing::error!(
                blog_id = %report.submission.blog_id,
                policy = ?self.policy,
                "enquiry delivery failed"
            );
            Err(SubmitError::Delivery(Box::new(report)))
        }
    }
}
