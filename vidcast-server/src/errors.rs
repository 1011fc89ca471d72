use axum::{
    Json,
    http::StatusCode as HttpStatus,
    response::{IntoResponse, Response},
};
use serde_json::json;
use vidcast_core::CastError;

pub type ApiResult<T> = Result<T, ApiError>;

/// A controller rejection carried out to the wire.
///
/// The JSON body always holds the numeric cast status code; the HTTP status
/// is secondary. `NoCast` and `CastLoading` ride a 200 because remotes poll
/// them during normal operation.
#[derive(Debug)]
pub struct ApiError(pub CastError);

impl ApiError {
    pub fn invalid_parameters() -> Self {
        Self(CastError::InvalidParameters)
    }

    fn http_status(&self) -> HttpStatus {
        match self.0 {
            CastError::NoActiveCast | CastError::CastLoading => HttpStatus::OK,
            CastError::InvalidParameters | CastError::CastExpired => HttpStatus::BAD_REQUEST,
            CastError::NotOwner => HttpStatus::FORBIDDEN,
            CastError::Superseded => HttpStatus::CONFLICT,
            CastError::Player(_) | CastError::Resolve(_) => HttpStatus::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CastError> for ApiError {
    fn from(err: CastError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "status": self.0.status_code(),
            "error": self.0.to_string(),
        }));

        (self.http_status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_cast_is_not_an_http_failure() {
        assert_eq!(ApiError(CastError::NoActiveCast).http_status(), HttpStatus::OK);
        assert_eq!(ApiError(CastError::CastLoading).http_status(), HttpStatus::OK);
    }

    #[test]
    fn ownership_and_supersede_map_to_distinct_statuses() {
        assert_eq!(
            ApiError(CastError::NotOwner).http_status(),
            HttpStatus::FORBIDDEN
        );
        assert_eq!(
            ApiError(CastError::Superseded).http_status(),
            HttpStatus::CONFLICT
        );
    }
}
