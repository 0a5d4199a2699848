//! JSON rejection responses.

use http::StatusCode;
use manifold_signature::SignatureError;

use crate::body::RejectionBody;

/// Content type of every rejection.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Message sent when a verifier fails with an unclassified error.
const UNVERIFIED_MESSAGE: &str = "Could not validate authenticity of the request";

/// Message sent when the request body cannot be buffered.
const UNREADABLE_BODY_MESSAGE: &str = "Could not read body from request";

/// A rejection, written to the caller as `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ErrorResponse {
    /// The HTTP status of the response.
    #[serde(skip)]
    pub status: StatusCode,
    /// Human readable reason for the rejection.
    pub message: String,
}

impl ErrorResponse {
    /// Create a rejection with an arbitrary status and message.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The generic rejection for verification failures without a classification.
    #[must_use]
    pub fn unverified() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, UNVERIFIED_MESSAGE)
    }

    /// The rejection for a request body that could not be read.
    #[must_use]
    pub fn unreadable_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, UNREADABLE_BODY_MESSAGE)
    }

    /// Classify a verifier error.
    ///
    /// [`SignatureError`]s keep their own status and message; anything else
    /// becomes [`ErrorResponse::unverified`] so internal detail never reaches
    /// the caller.
    #[must_use]
    pub fn from_verify_error(err: &(dyn std::error::Error + Send + Sync + 'static)) -> Self {
        err.downcast_ref::<SignatureError>()
            .map_or_else(Self::unverified, Self::from)
    }

    /// Serialize the JSON body.
    ///
    /// # Panics
    ///
    /// Panics if a single string field cannot be serialized, which would be a
    /// bug in `serde_json`.
    #[must_use]
    pub fn to_json(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("JSON serialization of error cannot fail")
    }

    /// Convert into a complete HTTP response.
    #[must_use]
    pub fn into_response(self) -> http::Response<RejectionBody> {
        let json = self.to_json();

        http::Response::builder()
            .status(self.status)
            .header(http::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(http::header::CONTENT_LENGTH, json.len())
            .body(RejectionBody::from_bytes(json))
            .expect("valid error response")
    }
}

impl From<&SignatureError> for ErrorResponse {
    fn from(err: &SignatureError) -> Self {
        Self::new(err.status_code(), err.to_string())
    }
}
