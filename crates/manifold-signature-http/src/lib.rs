//! Hyper middleware for Manifold request signatures.
//!
//! This crate puts a [`manifold_signature::Verifier`] in front of any hyper
//! service:
//!
//! - **Verifier seam**: [`RequestVerifier`] decides whether a buffered request is trusted
//! - **Service**: [`SignatureVerification`] buffers the body, verifies, then calls the inner service
//! - **Response helpers**: JSON `{"message": ...}` rejections

pub mod body;
pub mod response;
pub mod service;
pub mod verifier;

pub use body::RejectionBody;
pub use response::{ErrorResponse, JSON_CONTENT_TYPE};
pub use service::{SignatureVerification, VerifiedResponse};
pub use verifier::{BoxError, RequestVerifier};
