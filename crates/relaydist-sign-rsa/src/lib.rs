//! A [`relaydist_core::adapters::Signer`] using RSA/PKCS#1v1.5 signatures
//! over SHA-256, the same algorithm family `cascette-protocol`'s V1 MIME
//! path (`rsa`, `sha2`) verifies, here used for the engine's own manifest
//! signing rather than for verifying a third-party certificate chain.
//!
//! The envelope is `length(4 bytes BE) || signature || message`: the
//! signature has a fixed length for a given key (its modulus size in
//! bytes), so storing that length up front lets [`RsaSigner::verify`]
//! split the bytes unambiguously without needing a delimiter.

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{Signer as _, SignatureEncoding, Verifier as _};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use tracing::trace;

use relaydist_core::adapters::{Signer, VerificationError};

/// Errors constructing an [`RsaSigner`] (key generation failures).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("RSA key generation failed: {0}")]
    KeyGen(#[source] rsa::Error),
}

/// An RSA-PKCS#1v1.5/SHA-256 [`Signer`].
///
/// Holds a [`VerifyingKey`] always, and a [`SigningKey`] only when this
/// instance was built to sign (the distribution side); an instance built
/// from a public key alone can verify but not sign, matching how a client
/// only ever needs the public half.
#[derive(Debug, Clone)]
pub struct RsaSigner {
    signing_key: Option<SigningKey<Sha256>>,
    verifying_key: VerifyingKey<Sha256>,
    signature_len: usize,
}

impl RsaSigner {
    /// Generate a fresh keypair at `bits` modulus size (2048 or larger is
    /// recommended).
    pub fn generate<R: rand::RngCore + rand::CryptoRng>(rng: &mut R, bits: usize) -> Result<Self, Error> {
        let private = RsaPrivateKey::new(rng, bits).map_err(Error::KeyGen)?;
        Ok(Self::from_private_key(private))
    }

    /// Build a signer/verifier from an existing private key.
    #[must_use]
    pub fn from_private_key(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        let signature_len = public_modulus_bytes(&public);
        Self {
            signing_key: Some(SigningKey::<Sha256>::new(private)),
            verifying_key: VerifyingKey::<Sha256>::new(public),
            signature_len,
        }
    }

    /// Build a verify-only instance from a public key. [`Signer::sign`]
    /// always fails on the result.
    #[must_use]
    pub fn from_public_key(public: RsaPublicKey) -> Self {
        let signature_len = public_modulus_bytes(&public);
        Self {
            signing_key: None,
            verifying_key: VerifyingKey::<Sha256>::new(public),
            signature_len,
        }
    }
}

fn public_modulus_bytes(public: &RsaPublicKey) -> usize {
    use rsa::traits::PublicKeyParts;
    public.size()
}

impl Signer for RsaSigner {
    fn sign(&self, contents: &[u8]) -> Result<Vec<u8>, VerificationError> {
        let key = self.signing_key.as_ref().ok_or_else(|| {
            VerificationError("no private key configured; this signer is verify-only".into())
        })?;
        let signature = key.sign(contents);
        let sig_bytes = signature.to_bytes();

        let mut out = Vec::with_capacity(4 + sig_bytes.len() + contents.len());
        out.extend_from_slice(&(sig_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(&sig_bytes);
        out.extend_from_slice(contents);
        trace!(bytes = contents.len(), sig_len = sig_bytes.len(), "signed manifest");
        Ok(out)
    }

    fn verify(&self, contents: &[u8]) -> Result<Vec<u8>, VerificationError> {
        if contents.len() < 4 {
            return Err(VerificationError("signed payload shorter than length prefix".into()));
        }
        let (len_bytes, rest) = contents.split_at(4);
        let sig_len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
        if sig_len != self.signature_len || rest.len() < sig_len {
            return Err(VerificationError("signature length does not match this key".into()));
        }
        let (sig_bytes, message) = rest.split_at(sig_len);

        let signature = Signature::try_from(sig_bytes)
            .map_err(|e| VerificationError(format!("malformed signature: {e}")))?;
        self.verifying_key
            .verify(message, &signature)
            .map_err(|e| VerificationError(format!("signature verification failed: {e}")))?;

        Ok(message.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_signer() -> RsaSigner {
        // A fixed seed keeps these tests fast and deterministic; 1024 bits
        // is well below what a real deployment should use but is plenty
        // to exercise the sign/verify/envelope logic.
        let mut rng = StdRng::seed_from_u64(42);
        RsaSigner::generate(&mut rng, 1024).unwrap()
    }

    #[test]
    fn round_trips_signed_message() {
        let signer = test_signer();
        let message = b"manifest contents";
        let signed = signer.sign(message).unwrap();
        let verified = signer.verify(&signed).unwrap();
        assert_eq!(verified, message);
    }

    #[test]
    fn tampered_message_fails_verification() {
        let signer = test_signer();
        let mut signed = signer.sign(b"original").unwrap();
        let last = signed.len() - 1;
        signed[last] ^= 0xFF;
        assert!(signer.verify(&signed).is_err());
    }

    #[test]
    fn verify_only_signer_cannot_sign() {
        let signer = test_signer();
        let public = signer.verifying_key.clone();
        let verify_only = RsaSigner {
            signing_key: None,
            verifying_key: public,
            signature_len: signer.signature_len,
        };
        assert!(verify_only.sign(b"anything").is_err());
    }
}
