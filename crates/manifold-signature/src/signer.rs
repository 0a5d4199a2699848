//! Request signing, the client side of [`Verifier`](crate::Verifier).
//!
//! The master key holder endorses an ephemeral key once with [`endorse`]; the
//! ephemeral key then signs individual requests through a [`RequestSigner`].

use std::fmt;
use std::io::{self, Read};

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};

use crate::canonical::build_canonical_message;
use crate::chain::SignatureChain;

/// Endorse an ephemeral public key with the master signing key.
#[must_use]
pub fn endorse(master: &SigningKey, ephemeral: &VerifyingKey) -> Signature {
    master.sign(ephemeral.as_bytes())
}

/// Signs requests with an endorsed ephemeral key.
#[derive(Clone)]
pub struct RequestSigner {
    ephemeral: SigningKey,
    endorsement: Signature,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("ephemeral", &self.ephemeral.verifying_key())
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Create a signer from an ephemeral key and its endorsement.
    #[must_use]
    pub fn new(ephemeral: SigningKey, endorsement: Signature) -> Self {
        Self {
            ephemeral,
            endorsement,
        }
    }

    /// Create a signer whose ephemeral key is endorsed by `master` on the spot.
    #[must_use]
    pub fn endorsed_by(master: &SigningKey, ephemeral: SigningKey) -> Self {
        let endorsement = endorse(master, &ephemeral.verifying_key());
        Self::new(ephemeral, endorsement)
    }

    /// The ephemeral public key carried in each signature.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.ephemeral.verifying_key()
    }

    /// Sign an already canonicalized message.
    #[must_use]
    pub fn sign_message(&self, message: &[u8]) -> SignatureChain {
        SignatureChain::new(
            self.ephemeral.sign(message).to_bytes().to_vec(),
            self.ephemeral.verifying_key().to_bytes().to_vec(),
            self.endorsement.to_bytes().to_vec(),
        )
    }

    /// Sign a request and return the `X-Signature` header value.
    ///
    /// The request must already carry the `X-Signed-Headers` header and every
    /// header it names.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised while reading `body`.
    pub fn sign(&self, parts: &http::request::Parts, body: impl Read) -> io::Result<String> {
        let message = build_canonical_message(parts, body)?;
        Ok(self.sign_message(&message).to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::chain::MasterKey;
    use crate::clock::FixedClock;
    use crate::error::SignatureError;
    use crate::verifier::Verifier;

    fn request(date: &str) -> http::request::Parts {
        http::Request::builder()
            .method("POST")
            .uri("http://api.example.com/v1/credentials?b=2&a=1")
            .header("date", date)
            .header("content-type", "application/json")
            .header("x-signed-headers", "host date content-type")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_should_sign_verifiable_request() {
        let master = SigningKey::from_bytes(&rand::random());
        let signer = RequestSigner::endorsed_by(&master, SigningKey::from_bytes(&rand::random()));

        let now = Utc::now();
        let mut parts = request(&now.to_rfc3339());
        let body = br#"{"name":"db"}"#;

        let header = signer.sign(&parts, &body[..]).unwrap();
        parts.headers.insert("x-signature", header.parse().unwrap());

        let verifier = Verifier::with_master_key(MasterKey::from(master.verifying_key()))
            .with_clock(Arc::new(FixedClock(now + TimeDelta::seconds(2))));
        assert_eq!(verifier.verify(&parts, &body[..]), Ok(()));
        assert_eq!(
            verifier.verify(&parts, &b"{}"[..]),
            Err(SignatureError::NotSigned)
        );
    }

    #[test]
    fn test_should_carry_endorsement_and_key() {
        let master = SigningKey::from_bytes(&[1; 32]);
        let ephemeral = SigningKey::from_bytes(&[2; 32]);
        let endorsement = endorse(&master, &ephemeral.verifying_key());
        let signer = RequestSigner::new(ephemeral.clone(), endorsement);

        assert_eq!(signer.verifying_key(), ephemeral.verifying_key());

        let chain = signer.sign_message(b"message");
        assert_eq!(chain.ephemeral_key(), signer.verifying_key().as_bytes());
        assert_eq!(chain.endorsement(), endorsement.to_bytes());
        assert_eq!(
            chain.validate(&MasterKey::from(master.verifying_key()), b"message"),
            Ok(())
        );
    }

    #[test]
    fn test_should_be_deterministic() {
        let master = SigningKey::from_bytes(&[1; 32]);
        let signer = RequestSigner::endorsed_by(&master, SigningKey::from_bytes(&[2; 32]));
        let parts = request("2017-03-05T23:53:08Z");

        assert_eq!(
            signer.sign(&parts, &b"x"[..]).unwrap(),
            signer.sign(&parts, &b"x"[..]).unwrap()
        );
    }

    #[test]
    fn test_should_not_leak_signing_key_in_debug() {
        let signer = RequestSigner::endorsed_by(
            &SigningKey::from_bytes(&[1; 32]),
            SigningKey::from_bytes(&[2; 32]),
        );
        let rendered = format!("{signer:?}");
        assert!(rendered.starts_with("RequestSigner"));
        assert!(!rendered.contains("SigningKey"));
    }
}
