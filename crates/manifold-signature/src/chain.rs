//! The `X-Signature` endorsement chain.
//!
//! An `X-Signature` header carries three space-separated, unpadded URL-safe
//! base64 components:
//!
//! ```text
//! X-Signature: <payload signature> <ephemeral public key> <endorsement>
//! ```
//!
//! The chain is trusted when both links hold, checked in this order:
//!
//! 1. [`ChainCheck::Endorsement`]: the master key signed the raw bytes of the
//!    ephemeral public key.
//! 2. [`ChainCheck::Payload`]: the ephemeral key signed the canonical message.

use std::fmt;

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use ed25519_dalek::{PUBLIC_KEY_LENGTH, Signature, Verifier as _, VerifyingKey};
use tracing::debug;

use crate::error::{ChainParseError, ConfigError, SignatureError};

/// Manifold's public master signing key, base64 encoded.
pub const MANIFOLD_MASTER_KEY: &str = "PtISNzqQmQPBxNlUw3CdxsWczXbIwyExxlkRqZ7E690";

/// Decoder for `X-Signature` components and master keys.
///
/// Unpadded URL-safe base64 that tolerates non-zero trailing bits, which some
/// signers emit.
const HEADER_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// The root of trust: the Ed25519 key that endorses ephemeral request keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterKey(VerifyingKey);

impl MasterKey {
    /// Parse a base64 encoded master public key.
    ///
    /// Both the standard and URL-safe alphabets are accepted, with or without
    /// `=` padding. The decoded value must be a 32-byte Ed25519 public key.
    ///
    /// # Examples
    ///
    /// ```
    /// use manifold_signature::chain::{MANIFOLD_MASTER_KEY, MasterKey};
    ///
    /// assert!(MasterKey::from_base64(MANIFOLD_MASTER_KEY).is_ok());
    /// assert!(MasterKey::from_base64("not a key").is_err());
    /// ```
    pub fn from_base64(text: &str) -> Result<Self, ConfigError> {
        let normalized = text.replace('+', "-").replace('/', "_");
        let bytes = HEADER_ENGINE
            .decode(normalized.trim_end_matches('='))
            .map_err(|_| ConfigError::InvalidPublicKey)?;

        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| ConfigError::InvalidPublicKey)?;

        VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| ConfigError::InvalidPublicKey)
    }

    /// The underlying Ed25519 verifying key.
    #[must_use]
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.0
    }

    /// Encode the key as unpadded URL-safe base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0.as_bytes())
    }
}

impl From<VerifyingKey> for MasterKey {
    fn from(key: VerifyingKey) -> Self {
        Self(key)
    }
}

/// A parsed `X-Signature` header.
///
/// The components are kept as raw bytes; lengths are only checked when the
/// chain is validated, where a wrong length is an authentication failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureChain {
    payload_signature: Vec<u8>,
    ephemeral_key: Vec<u8>,
    endorsement: Vec<u8>,
}

impl SignatureChain {
    /// Assemble a chain from its raw components.
    #[must_use]
    pub fn new(payload_signature: Vec<u8>, ephemeral_key: Vec<u8>, endorsement: Vec<u8>) -> Self {
        Self {
            payload_signature,
            ephemeral_key,
            endorsement,
        }
    }

    /// Parse an `X-Signature` header value.
    ///
    /// # Errors
    ///
    /// Returns a [`ChainParseError`] if the value does not split on single
    /// spaces into exactly three non-empty components, or if any component is
    /// not valid unpadded URL-safe base64.
    pub fn parse(value: &str) -> Result<Self, ChainParseError> {
        let components: Vec<&str> = value.split(' ').collect();
        let [signature, key, endorsement] = components.as_slice() else {
            return Err(ChainParseError::ComponentCount(components.len()));
        };

        Ok(Self {
            payload_signature: decode_component("signature", signature)?,
            ephemeral_key: decode_component("public key", key)?,
            endorsement: decode_component("endorsement", endorsement)?,
        })
    }

    /// The ephemeral key's signature over the canonical message.
    #[must_use]
    pub fn payload_signature(&self) -> &[u8] {
        &self.payload_signature
    }

    /// The ephemeral public key that signed the request.
    #[must_use]
    pub fn ephemeral_key(&self) -> &[u8] {
        &self.ephemeral_key
    }

    /// The master key's signature over the ephemeral public key.
    #[must_use]
    pub fn endorsement(&self) -> &[u8] {
        &self.endorsement
    }

    /// Validate the chain against the master key and the canonical message.
    ///
    /// Runs [`ChainCheck::PIPELINE`] in order and stops at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::NotEndorsed`] or [`SignatureError::NotSigned`]
    /// for the first check that fails.
    pub fn validate(&self, master_key: &MasterKey, message: &[u8]) -> Result<(), SignatureError> {
        ChainCheck::PIPELINE
            .into_iter()
            .try_for_each(|check| check.run(self, master_key, message))
    }
}

impl fmt::Display for SignatureChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            HEADER_ENGINE.encode(&self.payload_signature),
            HEADER_ENGINE.encode(&self.ephemeral_key),
            HEADER_ENGINE.encode(&self.endorsement),
        )
    }
}

/// One link of the signature chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainCheck {
    /// The master key endorsed the ephemeral public key.
    Endorsement,
    /// The ephemeral key signed the canonical message.
    Payload,
}

impl ChainCheck {
    /// Every check, in the order they run.
    pub const PIPELINE: [Self; 2] = [Self::Endorsement, Self::Payload];

    /// Run this check against a chain.
    ///
    /// # Errors
    ///
    /// Returns [`ChainCheck::failure`] if the check does not hold.
    pub fn run(
        self,
        chain: &SignatureChain,
        master_key: &MasterKey,
        message: &[u8],
    ) -> Result<(), SignatureError> {
        let holds = match self {
            Self::Endorsement => verify_detached(
                master_key.verifying_key(),
                &chain.ephemeral_key,
                &chain.endorsement,
            ),
            Self::Payload => VerifyingKey::try_from(chain.ephemeral_key.as_slice())
                .is_ok_and(|key| verify_detached(&key, message, &chain.payload_signature)),
        };

        if holds {
            Ok(())
        } else {
            debug!(check = %self, "signature chain check failed");
            Err(self.failure())
        }
    }

    /// The error reported when this check fails.
    #[must_use]
    pub fn failure(self) -> SignatureError {
        match self {
            Self::Endorsement => SignatureError::NotEndorsed,
            Self::Payload => SignatureError::NotSigned,
        }
    }
}

impl fmt::Display for ChainCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Endorsement => "endorsement",
            Self::Payload => "payload",
        })
    }
}

fn decode_component(component: &'static str, text: &str) -> Result<Vec<u8>, ChainParseError> {
    if text.is_empty() {
        return Err(ChainParseError::EmptyComponent(component));
    }

    HEADER_ENGINE
        .decode(text)
        .map_err(|source| ChainParseError::InvalidEncoding { component, source })
}

/// Verify a detached signature, treating a malformed signature as invalid.
fn verify_detached(key: &VerifyingKey, message: &[u8], signature: &[u8]) -> bool {
    Signature::from_slice(signature).is_ok_and(|signature| key.verify(message, &signature).is_ok())
}
