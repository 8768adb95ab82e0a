use std::convert::Infallible;

use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::models::ErrorResponse;
use crate::utils::error::ApiError;

/// A service error tagged with the endpoint's failure label.
#[derive(Debug)]
pub struct Failure {
    pub label: &'static str,
    pub error: ApiError,
}

impl warp::reject::Reject for Failure {}

impl Failure {
    pub fn new(label: &'static str, error: ApiError) -> Self {
        Self { label, error }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, error, message) = if let Some(failure) = err.find::<Failure>() {
        (
            failure.error.status_code(),
            failure.label.to_string(),
            failure.error.to_string(),
        )
    } else if err.is_not_found() {
        (
            StatusCode::NOT_FOUND,
            "Not found".to_string(),
            "no route matches the request".to_string(),
        )
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (
            StatusCode::BAD_REQUEST,
            "Invalid query".to_string(),
            e.to_string(),
        )
    } else if let Some(e) = err.find::<warp::reject::MethodNotAllowed>() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
            e.to_string(),
        )
    } else {
        tracing::error!(
            event = "unhandled_rejection",
            message = "Unhandled rejection",
            rejection = ?err
        );
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error".to_string(),
            format!("{:?}", err),
        )
    };

    let body = ErrorResponse { error, message };
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
