use std::error::Error as StdError;
use std::time::Duration;

use axum::{
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use diesel::result::Error as DieselError;
use thiserror::Error;

use crate::forms::DecodeError;
use crate::logging::SecurityEvent;
use crate::models::ModelError;
use crate::security::password::PasswordError;
use crate::session::SessionError;

/// Failures that abort a request. User-correctable problems (validation,
/// duplicate email, bad credentials) never become an `AppError`; they are
/// rendered back onto the form instead.
#[derive(Debug, Error)]
pub enum AppError {
    // Client errors
    #[error("malformed submission: {0}")]
    Decode(#[from] DecodeError),

    #[error("resource not found")]
    NotFound,

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("rate limit exceeded; please try again later")]
    RateLimitExceeded { retry_after: Option<Duration> },

    // Infrastructure errors
    #[error("database error")]
    Database(#[source] DieselError),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("password processing error")]
    Password(#[source] PasswordError),

    #[error("session error")]
    Session(#[from] SessionError),

    #[error("unexpected model outcome")]
    Model(#[source] ModelError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Decode(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,

            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Password(_)
            | AppError::Session(_)
            | AppError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text sent to the client. Only the canonical reason phrase is
    /// exposed; details stay in the logs.
    fn user_message(&self) -> &'static str {
        self.status_code()
            .canonical_reason()
            .unwrap_or("Internal Server Error")
    }

    fn log_error(&self) {
        match self.status_code() {
            code if code.is_client_error() => {
                tracing::warn!(
                    error = %self,
                    status_code = %code,
                    "Client error"
                );
            }
            code if code.is_server_error() => {
                tracing::error!(
                    error = %self,
                    status_code = %code,
                    source = ?self.source(),
                    "Server error"
                );
            }
            _ => {}
        }

        if let AppError::Session(SessionError::Unavailable(_)) = self {
            crate::log_security_event!(
                SecurityEvent::SessionStoreFailure,
                error = %self,
                "Session store rejected an operation"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log_error();

        let status = self.status_code();
        let mut response = (status, self.user_message()).into_response();

        if let AppError::RateLimitExceeded {
            retry_after: Some(retry_after),
        } = &self
            && let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string())
        {
            response.headers_mut().insert(RETRY_AFTER, value);
        }

        response
    }
}

impl From<ModelError> for AppError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::NoRecord => AppError::NotFound,
            ModelError::Database(err) => AppError::Database(err),
            ModelError::Pool(err) => AppError::Pool(err),
            ModelError::Password(err) => AppError::Password(err),
            other => AppError::Model(other),
        }
    }
}
