//! Lead enquiry submission.
//!
//! A visitor fills in the enquiry form on a content page; the form is validated locally and the
//! resulting `EnquirySubmission` is delivered to two independent sinks: the first-party API
//! (JSON) and the third-party relay (multipart) that turns leads into email notifications.

pub mod form;
pub mod sink;
pub mod submitter;
pub mod validation;

pub use form::{FormSession, FormStatus, SubmitOutcome};
pub use sink::{ApiSink, LeadSink, MockSink, RelaySink, SinkError, SinkReceipt, SinkState};
pub use submitter::{
    DeliveryPolicy, DeliveryReport, DispatchMode, EnquirySubmitter, SUBMIT_FAILED_MESSAGE,
    SubmitError,
};
pub use validation::{Field, FieldErrors, is_valid_email, validate};
