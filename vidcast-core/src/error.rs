use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::player::PlayerError;
use crate::resolver::ResolveError;

/// Closed enumeration of wire status codes.
///
/// The numeric values for `Success`, `InvalidParameters`, `ExpiredCast`,
/// `NoCast` and `Internal` predate this implementation and are kept stable
/// for existing remotes; the remaining codes extend the vocabulary so
/// clients can distinguish "still loading" and "someone else is casting"
/// from a generic rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Success,
    InvalidParameters,
    ExpiredCast,
    NoCast,
    CastLoading,
    NotOwner,
    Superseded,
    Internal,
}

impl StatusCode {
    pub fn code(&self) -> u16 {
        match self {
            StatusCode::Success => 0,
            StatusCode::InvalidParameters => 101,
            StatusCode::ExpiredCast => 102,
            StatusCode::NoCast => 103,
            StatusCode::CastLoading => 104,
            StatusCode::NotOwner => 105,
            StatusCode::Superseded => 106,
            StatusCode::Internal => 1000,
        }
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

/// Rejections and failures surfaced by the session controller.
///
/// The ownership/timing variants (`NoActiveCast`, `CastLoading`, `NotOwner`,
/// `CastExpired`, `Superseded`) are part of normal multi-client operation
/// and are not logged as failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CastError {
    #[error("no cast has been started")]
    NoActiveCast,

    #[error("the cast is still loading")]
    CastLoading,

    #[error("caller does not own the active cast")]
    NotOwner,

    #[error("the cast has expired")]
    CastExpired,

    #[error("invalid parameters")]
    InvalidParameters,

    #[error("superseded by a newer cast")]
    Superseded,

    #[error("player error: {0}")]
    Player(String),

    #[error("resolver error: {0}")]
    Resolve(String),
}

impl CastError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CastError::NoActiveCast => StatusCode::NoCast,
            CastError::CastLoading => StatusCode::CastLoading,
            CastError::NotOwner => StatusCode::NotOwner,
            CastError::CastExpired => StatusCode::ExpiredCast,
            CastError::InvalidParameters => StatusCode::InvalidParameters,
            CastError::Superseded => StatusCode::Superseded,
            CastError::Player(_) | CastError::Resolve(_) => StatusCode::Internal,
        }
    }
}

impl From<PlayerError> for CastError {
    fn from(err: PlayerError) -> Self {
        CastError::Player(err.to_string())
    }
}

impl From<ResolveError> for CastError {
    fn from(err: ResolveError) -> Self {
        CastError::Resolve(err.to_string())
    }
}

pub type CastResult<T> = Result<T, CastError>;
