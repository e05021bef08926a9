use axum::{
    http::{Error as HttpError, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures raised while answering plain HTTP requests (content, album art).
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid Range Header")]
    InvalidRange,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::InvalidRange => (StatusCode::RANGE_NOT_SATISFIABLE, self.to_string()),
            // Unsupported methods on resource URIs are answered with a 500, not a 405.
            AppError::MethodNotAllowed
            | AppError::Internal(_)
            | AppError::Io(_)
            | AppError::Http(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        (status, message).into_response()
    }
}

/// Failures of a UPnP action, each mapped to the error code a control point expects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Invalid Action")]
    InvalidAction,

    #[error("Invalid Args: {0}")]
    InvalidArgs(String),

    #[error("Action Not Implemented")]
    ActionNotImplemented,

    #[error("No Such Object")]
    NoSuchObject,

    #[error("Unsupported or invalid search criteria")]
    InvalidSearchCriteria,

    #[error("Unsupported or invalid sort criteria")]
    InvalidSortCriteria,

    #[error("No Such Container")]
    NoSuchContainer,

    #[error("Internal Error: {0}")]
    Internal(String),
}

impl ActionError {
    /// The numeric UPnP error code sent back in the SOAP fault.
    pub fn code(&self) -> u16 {
        match self {
            ActionError::InvalidAction => 401,
            ActionError::InvalidArgs(_) => 402,
            ActionError::ActionNotImplemented => 602,
            ActionError::NoSuchObject => 701,
            ActionError::InvalidSearchCriteria => 708,
            ActionError::InvalidSortCriteria => 709,
            ActionError::NoSuchContainer => 710,
            ActionError::Internal(_) => 800,
        }
    }

    /// Short description for the `errorDescription` element. Internal details stay in the logs.
    pub fn description(&self) -> &'static str {
        match self {
            ActionError::InvalidAction => "Invalid Action",
            ActionError::InvalidArgs(_) => "Invalid Args",
            ActionError::ActionNotImplemented => "Action Not Implemented",
            ActionError::NoSuchObject => "No Such Object",
            ActionError::InvalidSearchCriteria => "Unsupported or invalid search criteria",
            ActionError::InvalidSortCriteria => "Unsupported or invalid sort criteria",
            ActionError::NoSuchContainer => "No Such Container",
            ActionError::Internal(_) => "Internal Error",
        }
    }
}

impl From<std::io::Error> for ActionError {
    fn from(err: std::io::Error) -> Self {
        ActionError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_codes() {
        assert_eq!(ActionError::InvalidArgs("BrowseFlag".into()).code(), 402);
        assert_eq!(ActionError::NoSuchObject.code(), 701);
        assert_eq!(ActionError::InvalidSearchCriteria.code(), 708);
        assert_eq!(ActionError::InvalidSortCriteria.code(), 709);
        assert_eq!(ActionError::NoSuchContainer.code(), 710);
        assert_eq!(ActionError::Internal("boom".into()).code(), 800);
    }

    #[test]
    fn test_internal_description_hides_details() {
        let err = ActionError::Internal("/secret/path: permission denied".into());
        assert_eq!(err.description(), "Internal Error");
    }

    #[test]
    fn test_app_error_status() {
        assert_eq!(AppError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::MethodNotAllowed.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::InvalidRange.into_response().status(),
            StatusCode::RANGE_NOT_SATISFIABLE
        );
    }
}
