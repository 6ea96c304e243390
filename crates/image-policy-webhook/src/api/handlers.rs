use axum::{
    body::Bytes,
    extract::{self, rejection::BytesRejection},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    api::{api_error::ApiError, service::review, state::ApiServerState},
    cli::LOG_LEVELS,
    tracing::LogLevelHandle,
};

#[tracing::instrument(
    name = "mutation",
    fields(
        request_uid=tracing::field::Empty,
        host=crate::config::HOSTNAME.as_str(),
        name=tracing::field::Empty,
        namespace=tracing::field::Empty,
        operation=tracing::field::Empty,
        subresource=tracing::field::Empty,
        kind_group=tracing::field::Empty,
        kind_version=tracing::field::Empty,
        kind=tracing::field::Empty,
        resource_group=tracing::field::Empty,
        resource_version=tracing::field::Empty,
        resource=tracing::field::Empty,
        allowed=tracing::field::Empty,
        mutated=tracing::field::Empty,
        response_reason=tracing::field::Empty,
        response_message=tracing::field::Empty,
    ),
    skip_all)]
/// Compute the mutations of the object carried by an AdmissionReview.
pub(crate) async fn mutate_handler(
    extract::State(state): extract::State<Arc<ApiServerState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let body = body?;
    check_content_type(&headers)?;
    debug!(admission_review = %String::from_utf8_lossy(&body));

    let outcome = review(&state, &body);

    let payload = match state.codec.encode(outcome.response) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "cannot encode admission review");
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response());
        }
    };

    Ok((
        outcome.status,
        [(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())],
        payload,
    )
        .into_response())
}

fn check_content_type(headers: &HeaderMap) -> Result<(), ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default();

    if content_type != mime::APPLICATION_JSON.as_ref() {
        return Err(ApiError::bad_request(format!(
            "unsupported content type '{content_type}', only {} is supported",
            mime::APPLICATION_JSON
        )));
    }

    Ok(())
}

pub(crate) async fn health_handler() -> StatusCode {
    StatusCode::OK
}

/// Change the level of the logs emitted by the process.
pub(crate) async fn log_level_handler(
    extract::State(handle): extract::State<LogLevelHandle>,
    body: String,
) -> Result<StatusCode, ApiError> {
    let log_level = body.trim();
    if !LOG_LEVELS.contains(&log_level) {
        return Err(ApiError::bad_request(format!(
            "unknown log level '{log_level}', allowed values are: {}",
            LOG_LEVELS.join(", ")
        )));
    }

    handle.set_level(log_level).map_err(|e| ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: e.to_string(),
    })?;
    info!(log_level, "log level changed");

    Ok(StatusCode::OK)
}
