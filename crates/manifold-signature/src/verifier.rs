//! Request verification.
//!
//! A [`Verifier`] is built once at startup from a master public key and then
//! shared across requests. Each call to [`Verifier::verify`] is a single
//! pass-or-fail decision:
//!
//! 1. `X-Signature` is present and parses as a [`SignatureChain`].
//! 2. `X-Signed-Headers` is present.
//! 3. `Date` is an RFC 3339 timestamp within the permitted skew of now.
//! 4. The request canonicalizes, which reads the body.
//! 5. The chain validates against the canonical message.

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeDelta};
use http::header::DATE;
use http::request::Parts;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{SIGNED_HEADERS_HEADER, build_canonical_message};
use crate::chain::{MasterKey, SignatureChain};
use crate::clock::{Clock, SystemClock};
use crate::config::VerifierConfig;
use crate::error::{ConfigError, SignatureError};

/// Default maximum difference between a request's `Date` and the local clock.
pub const PERMITTED_TIME_SKEW: Duration = Duration::from_secs(5 * 60);

/// Name of the header carrying the signature chain.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// Verifies that requests were signed by a key endorsed by the master key.
#[derive(Clone)]
pub struct Verifier {
    master_key: MasterKey,
    permitted_skew: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for Verifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Verifier")
            .field("master_key", &self.master_key.to_base64())
            .field("permitted_skew", &self.permitted_skew)
            .finish_non_exhaustive()
    }
}

impl Verifier {
    /// Create a verifier for the given base64 encoded master public key.
    ///
    /// The verifier uses the system clock and a skew of
    /// [`PERMITTED_TIME_SKEW`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPublicKey`] if the key is not a valid
    /// Ed25519 public key.
    pub fn new(public_key: &str) -> Result<Self, ConfigError> {
        MasterKey::from_base64(public_key).map(Self::with_master_key)
    }

    /// Create a verifier trusting an already parsed master key.
    #[must_use]
    pub fn with_master_key(master_key: MasterKey) -> Self {
        Self {
            master_key,
            permitted_skew: TimeDelta::minutes(5),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a verifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the master key is invalid or the skew is out of range.
    pub fn from_config(config: &VerifierConfig) -> Result<Self, ConfigError> {
        Self::new(&config.master_key)?.with_permitted_skew(config.permitted_skew())
    }

    /// Replace the permitted clock skew.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SkewOutOfRange`] if the duration cannot be
    /// compared against timestamps.
    pub fn with_permitted_skew(mut self, skew: Duration) -> Result<Self, ConfigError> {
        self.permitted_skew =
            TimeDelta::from_std(skew).map_err(|_| ConfigError::SkewOutOfRange(skew))?;
        Ok(self)
    }

    /// Replace the time source used for the freshness check.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The trusted master key.
    #[must_use]
    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    /// The maximum accepted difference between a request's date and now.
    #[must_use]
    pub fn permitted_skew(&self) -> Duration {
        self.permitted_skew.to_std().unwrap_or(PERMITTED_TIME_SKEW)
    }

    /// Verify that a request was signed by Manifold.
    ///
    /// The body is not taken from `parts`; the caller supplies it so that it
    /// can be buffered and handed on after verification.
    ///
    /// # Errors
    ///
    /// Returns the first [`SignatureError`] encountered. Header and freshness
    /// failures are reported before the body is read.
    pub fn verify(&self, parts: &Parts, body: impl Read) -> Result<(), SignatureError> {
        let chain = parts
            .headers
            .get(SIGNATURE_HEADER)
            .filter(|v| !v.is_empty())
            .ok_or(SignatureError::MissingSignature)
            .inspect_err(|err| debug!(%err, "rejecting request"))?;

        let chain = SignatureChain::parse(&String::from_utf8_lossy(chain.as_bytes()))
            .map_err(SignatureError::MalformedSignature)
            .inspect_err(|err| debug!(%err, "rejecting request"))?;

        if parts
            .headers
            .get(SIGNED_HEADERS_HEADER)
            .is_none_or(http::HeaderValue::is_empty)
        {
            debug!("rejecting request without signed headers");
            return Err(SignatureError::MissingSignedHeaders);
        }

        let date = parts
            .headers
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_request_date)
            .ok_or(SignatureError::InvalidDate)
            .inspect_err(|err| debug!(%err, "rejecting request"))?;

        let skew = (self.clock.now() - date.to_utc()).abs();
        if skew > self.permitted_skew {
            debug!(skew_secs = skew.num_seconds(), "request date outside permitted skew");
            return Err(SignatureError::TimeSkew);
        }

        let message = build_canonical_message(parts, body).map_err(|err| {
            debug!(%err, "failed to read request body");
            SignatureError::UnreadableBody
        })?;

        debug!(
            len = message.len(),
            sha256 = %hex::encode(Sha256::digest(&message)),
            "built canonical message"
        );

        chain.validate(&self.master_key, &message)
    }
}

/// Parse a `Date` header as RFC 3339 with an uppercase `T` and `Z`.
fn parse_request_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let bytes = text.as_bytes();
    if bytes.get(10) != Some(&b'T') || bytes.last() == Some(&b'z') {
        return None;
    }
    DateTime::parse_from_rfc3339(text).ok()
}
