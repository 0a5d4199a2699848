//! The verification seam between the middleware and the signature checks.

use std::sync::Arc;

use manifold_signature::Verifier;

/// A type-erased verification error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Decides whether a fully buffered request is authentic.
///
/// Errors that downcast to [`manifold_signature::SignatureError`] are reported
/// to the caller with their own status and message. Any other error is
/// reported as a generic `401 Unauthorized`.
pub trait RequestVerifier: Send + Sync + 'static {
    /// Verify the request head against its buffered body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request must be rejected.
    fn verify_request(&self, parts: &http::request::Parts, body: &[u8]) -> Result<(), BoxError>;
}

impl RequestVerifier for Verifier {
    fn verify_request(&self, parts: &http::request::Parts, body: &[u8]) -> Result<(), BoxError> {
        self.verify(parts, body).map_err(Into::into)
    }
}

impl<V: RequestVerifier> RequestVerifier for Arc<V> {
    fn verify_request(&self, parts: &http::request::Parts, body: &[u8]) -> Result<(), BoxError> {
        self.as_ref().verify_request(parts, body)
    }
}
