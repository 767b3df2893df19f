use spin_sdk::http::Response;
use thiserror::Error;

use crate::core::helpers::html_response;
use crate::templates;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Internal Error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> http::StatusCode {
        match self {
            ApiError::NotFound(_) => http::StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            ApiError::InternalError(_) => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the visitor. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::MethodNotAllowed => "That method is not allowed here.".to_string(),
            ApiError::InternalError(_) => "An unexpected error has occurred.".to_string(),
        }
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        let html = templates::render_error_page(status, &err.public_message());
        html_response(status.as_u16(), html)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status_and_body() {
        let resp: Response = ApiError::NotFound("User bob not found".to_string()).into();
        assert_eq!(*resp.status(), 404);
        let body = String::from_utf8(resp.body().to_vec()).unwrap();
        assert!(body.contains("User bob not found"));
    }

    #[test]
    fn test_internal_error_hides_details() {
        let err: ApiError = anyhow::anyhow!("connection refused on 10.0.0.3").into();
        let resp: Response = err.into();
        assert_eq!(*resp.status(), 500);
        let body = String::from_utf8(resp.body().to_vec()).unwrap();
        assert!(!body.contains("10.0.0.3"));
    }
}
