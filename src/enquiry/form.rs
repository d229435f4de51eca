use std::sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use super::submitter::{EnquirySubmitter, SubmitError};
use super::validation::{Field, FieldErrors, validate};
use crate::models::{EnquiryForm, PageRef};

/// FormStatus
///
/// Which view the enquiry form shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Editing,
    Submitting,
    /// The success view with its "send another" control.
    Submitted,
    /// Back on the form, fields intact, with a message above it.
    Failed(String),
}

/// SubmitOutcome
///
/// Result of one call to `FormSession::submit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Sent,
    Invalid(FieldErrors),
    Failed(String),
    /// A submission is already in flight; nothing was sent.
    InFlight,
    /// The session was disposed; nothing was sent or the result was dropped.
    Disposed,
}

#[derive(Debug)]
struct FormState {
    fields: EnquiryForm,
    errors: FieldErrors,
    status: FormStatus,
}

/// FormSession
///
/// State of one rendered enquiry form: its fields, its field errors and which view it shows.
///
/// Only one submission can be in flight per session. The lock is never held across an await, and
/// once `dispose` has been called no state is written after a sink call returns.
pub struct FormSession {
    submitter: EnquirySubmitter,
    page: PageRef,
    state: Mutex<FormState>,
    disposed: AtomicBool,
}

impl FormSession {
    pub fn new(submitter: EnquirySubmitter, page: PageRef) -> Self {
        Self {
            submitter,
            page,
            state: Mutex::new(FormState {
                fields: EnquiryForm::default(),
                errors: FieldErrors::default(),
                status: FormStatus::Editing,
            }),
            disposed: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FormState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn page(&self) -> &PageRef {
        &self.page
    }

    pub fn fields(&self) -> EnquiryForm {
        self.lock().fields.clone()
    }

    pub fn errors(&self) -> FieldErrors {
        self.lock().errors.clone()
    }

    pub fn status(&self) -> FormStatus {
        self.lock().status.clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Edits one field and drops its pending error. Refused while submitting or after disposal.
    pub fn set_field(&self, field: Field, value: impl Into<String>) -> bool {
        if self.is_disposed() {
            return false;
        }

        let mut state = self.lock();
        if state.status == FormStatus::Submitting {
            return false;
        }

        let value = value.into();
        match field {
            Field::Name => state.fields.name = value,
            Field::Email => state.fields.email = value,
            Field::Phone => state.fields.phone = value,
            Field::Message => state.fields.message = value,
        }
        state.errors.clear_field(field);
        true
    }

    /// submit
    ///
    /// Validates the current fields and, when valid, delivers them through the submitter.
    /// Success clears every field and shows the success view. Failure keeps the fields so the
    /// visitor can try again by hand.
    pub async fn submit(&self) -> SubmitOutcome {
        if self.is_disposed() {
            return SubmitOutcome::Disposed;
        }

        let fields = {
            let mut state = self.lock();
            if state.status == FormStatus::Submitting {
                tracing::debug!(blog_id = %self.page.blog_id, "enquiry already in flight");
                return SubmitOutcome::InFlight;
            }

            let errors = validate(&state.fields);
            if !errors.is_empty() {
                state.errors = errors.clone();
                state.status = FormStatus::Editing;
                return SubmitOutcome::Invalid(errors);
            }

            state.errors = FieldErrors::default();
            state.status = FormStatus::Submitting;
            state.fields.clone()
        };

        let result = self.submitter.submit(&fields, &self.page).await;

        if self.is_disposed() {
            tracing::debug!(blog_id = %self.page.blog_id, "form disposed before delivery settled");
            return SubmitOutcome::Disposed;
        }

        let mut state = self.lock();
        match result {
            Ok(_) => {
                state.fields = EnquiryForm::default();
                state.status = FormStatus::Submitted;
                SubmitOutcome::Sent
            }
            Err(SubmitError::Invalid(errors)) => {
                state.errors = errors.clone();
                state.status = FormStatus::Editing;
                SubmitOutcome::Invalid(errors)
            }
            Err(e) => {
                tracing::error!(error = %e, "error submitting enquiry");
                let message = e.user_message().to_string();
                state.status = FormStatus::Failed(message.clone());
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// The "send another" control: back to an editable form with no errors showing.
    pub fn reset(&self) -> bool {
        if self.is_disposed() {
            return false;
        }

        let mut state = self.lock();
        if state.status == FormStatus::Submitting {
            return false;
        }
        state.errors = FieldErrors::default();
        state.status = FormStatus::Editing;
        true
    }

    /// Tears the form down. A submission still in flight completes but its result is discarded.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}
