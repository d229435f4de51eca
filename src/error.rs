use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{enquiry::SubmitError, models::EnquiryRejected};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("Forbidden")]
    Forbidden,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Submit(e) => {
                let status = match &e {
                    SubmitError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    SubmitError::Delivery(_) => StatusCode::BAD_GATEWAY,
                };
                let fields = match &e {
                    SubmitError::Invalid(errors) => errors.to_messages(),
                    SubmitError::Delivery(_) => Default::default(),
                };
                let body = EnquiryRejected {
                    error: e.user_message().to_string(),
                    fields,
                };
                (status, Json(body)).into_response()
            }
            AppError::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }
}
