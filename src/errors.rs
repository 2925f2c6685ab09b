use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}

/// Input rejected before touching the data set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("{0} must not be negative")]
    Negative(&'static str),
    #[error("{0} exceeds the maximum allowed amount")]
    TooLarge(&'static str),
    #[error("billing_day must be between 1 and 28")]
    BillingDay,
    #[error("email address is invalid")]
    Email,
    #[error("invalid month '{0}', expected YYYY-MM")]
    Month(String),
    #[error("client {0} does not exist")]
    UnknownClient(u64),
    #[error("end_date must not be before start_date")]
    DateRange,
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.to_string())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BillingError {
    #[error("client {0} not found")]
    ClientNotFound(u64),
    #[error("billing record {0} not found")]
    RecordNotFound(u64),
    #[error("payment {0} not found")]
    PaymentNotFound(u64),
    #[error("payment amount must be greater than zero")]
    NonPositiveAmount,
    #[error("amount exceeds the maximum allowed amount")]
    AmountTooLarge,
    #[error("billing record {record} does not belong to client {client}")]
    ForeignRecord { record: u64, client: u64 },
    #[error("billing record {0} already has payments applied")]
    HasPayments(u64),
    #[error("amount due cannot be lower than the amount already paid ({0})")]
    BelowPaid(String),
    #[error("no outstanding balance to pay")]
    NothingOutstanding,
}

/// Failures while creating users or changing passwords.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Invalid(err) => err.into(),
            AuthError::Hash(_) => Self::internal(err),
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        let message = err.to_string();
        match err {
            BillingError::ClientNotFound(_)
            | BillingError::RecordNotFound(_)
            | BillingError::PaymentNotFound(_) => Self::not_found(message),
            BillingError::HasPayments(_) => Self::conflict(message),
            _ => Self::bad_request(message),
        }
    }
}
