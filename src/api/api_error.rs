use crate::error::Error;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub(crate) struct ApiError(anyhow::Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let any_err = self.0;
        let status = match any_err.downcast_ref::<Error>() {
            Some(
                Error::MissingHostname | Error::UnknownRemote | Error::QueryExtractorRejection(_),
            ) => StatusCode::BAD_REQUEST,
            Some(Error::ZoneListing(_)) => StatusCode::FAILED_DEPENDENCY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("request failed: {any_err:#}");
        }
        (status, format!("{any_err}\n")).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err.into())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Error::QueryExtractorRejection(rejection).into()
    }
}
