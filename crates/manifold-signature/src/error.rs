//! Error types for request signature verification.
//!
//! Request-time failures are represented by [`SignatureError`]. Each variant
//! carries a fixed HTTP status and a fixed message, which is exactly what is
//! written back to the caller. [`ChainParseError`] keeps the detail of why an
//! `X-Signature` header could not be parsed, and [`ConfigError`] covers
//! failures while constructing a verifier.

use http::StatusCode;

/// Errors that can occur while verifying a signed request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// The `X-Signature` header is missing or empty.
    #[error("Missing X-Signature header")]
    MissingSignature,

    /// The `X-Signature` header is not a valid signature chain.
    #[error("Could not parse X-Signature header")]
    MalformedSignature(#[source] ChainParseError),

    /// The `X-Signed-Headers` header is missing or empty.
    #[error("Missing X-Signed-Headers header")]
    MissingSignedHeaders,

    /// The `Date` header is missing or is not an RFC 3339 timestamp.
    #[error("Unable to read request date")]
    InvalidDate,

    /// The `Date` header is outside the permitted skew window.
    #[error("Request time skew is too great")]
    TimeSkew,

    /// The request body could not be read while building the canonical message.
    #[error("Unable to read request body")]
    UnreadableBody,

    /// The ephemeral public key is not endorsed by the master key.
    #[error("Request Public Key was not endorsed by Manifold")]
    NotEndorsed,

    /// The canonical message was not signed by the ephemeral public key.
    #[error("Request was not signed by included Public Key")]
    NotSigned,
}

impl SignatureError {
    /// The HTTP status code to respond with.
    ///
    /// Malformed and stale requests are `400 Bad Request`; failed
    /// cryptographic checks are `401 Unauthorized`.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        if self.is_authentication_failure() {
            StatusCode::UNAUTHORIZED
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    /// Whether this error comes from one of the signature chain checks.
    #[must_use]
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::NotEndorsed | Self::NotSigned)
    }
}

/// Errors produced while parsing an `X-Signature` header value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainParseError {
    /// The value did not split into exactly three space-separated components.
    #[error("Could not parse Signature chain: expected 3 components, found {0}")]
    ComponentCount(usize),

    /// One of the components was empty.
    #[error("Could not parse Signature chain: empty {0} component")]
    EmptyComponent(&'static str),

    /// One of the components was not valid unpadded URL-safe base64.
    #[error("Could not parse Signature chain: invalid base64 in {component} component")]
    InvalidEncoding {
        /// Which component failed to decode.
        component: &'static str,
        /// The underlying decode error.
        #[source]
        source: base64::DecodeError,
    },
}

/// Errors that can occur while building a [`Verifier`](crate::Verifier).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The master public key is not valid base64 or not a 32-byte Ed25519 key.
    #[error("The provided base64 public key is not valid")]
    InvalidPublicKey,

    /// A configuration value could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue {
        /// The configuration key.
        name: &'static str,
        /// The rejected raw value.
        value: String,
    },

    /// The permitted time skew cannot be represented.
    #[error("permitted time skew of {0:?} is out of range")]
    SkewOutOfRange(std::time::Duration),
}
