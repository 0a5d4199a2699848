//! Verification of HTTP requests signed by Manifold.
//!
//! Every request Manifold sends carries a two-level Ed25519 signature chain:
//! an ephemeral key signs the canonical form of the request, and Manifold's
//! long-lived master key endorses that ephemeral key. This crate rebuilds the
//! canonical form of an incoming request and checks both links of the chain,
//! along with the freshness of the request's `Date` header.
//!
//! # Usage
//!
//! ```rust
//! use manifold_signature::{MANIFOLD_MASTER_KEY, Verifier};
//!
//! let verifier = Verifier::new(MANIFOLD_MASTER_KEY).unwrap();
//!
//! let (parts, body) = http::Request::builder()
//!     .method("PUT")
//!     .uri("/v1/resources/1")
//!     .body(b"{}".to_vec())
//!     .unwrap()
//!     .into_parts();
//!
//! // The request carries no X-Signature header, so it is rejected.
//! let err = verifier.verify(&parts, body.as_slice()).unwrap_err();
//! assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical message construction
//! - [`chain`] - `X-Signature` parsing and the endorsement chain checks
//! - [`clock`] - Time sources used for the freshness check
//! - [`config`] - Environment-driven verifier configuration
//! - [`error`] - Error types
//! - [`signer`] - Client-side signing with an endorsed ephemeral key
//! - [`verifier`] - The end-to-end request verifier

pub mod canonical;
pub mod chain;
pub mod clock;
pub mod config;
pub mod error;
pub mod signer;
pub mod verifier;

pub use canonical::{SIGNED_HEADERS_HEADER, build_canonical_message};
pub use chain::{ChainCheck, MANIFOLD_MASTER_KEY, MasterKey, SignatureChain};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::VerifierConfig;
pub use error::{ChainParseError, ConfigError, SignatureError};
pub use signer::{RequestSigner, endorse};
pub use verifier::{PERMITTED_TIME_SKEW, SIGNATURE_HEADER, Verifier};
