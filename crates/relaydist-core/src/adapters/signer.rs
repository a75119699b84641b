//! The digital-signature adapter.

use std::fmt;

/// A digital signature scheme applied to the manifest before compression.
pub trait Signer: fmt::Debug + Send + Sync {
    /// Sign `contents`, returning the message with its signature attached
    /// (the exact envelope is up to the implementation).
    fn sign(&self, contents: &[u8]) -> Result<Vec<u8>, VerificationError>;

    /// Verify a signed message, returning the original `contents` with the
    /// signature stripped off.
    fn verify(&self, contents: &[u8]) -> Result<Vec<u8>, VerificationError>;
}

/// The signature did not verify.
#[derive(Debug, thiserror::Error)]
#[error("signature verification failed: {0}")]
pub struct VerificationError(pub String);

/// The identity signer: `sign`/`verify` are no-ops. Valid for unsigned
/// deployments, and the engine's default [`Signer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySigner;

impl Signer for IdentitySigner {
    fn sign(&self, contents: &[u8]) -> Result<Vec<u8>, VerificationError> {
        Ok(contents.to_vec())
    }

    fn verify(&self, contents: &[u8]) -> Result<Vec<u8>, VerificationError> {
        Ok(contents.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trips() {
        let s = IdentitySigner;
        let data = b"manifest bytes";
        assert_eq!(s.verify(&s.sign(data).unwrap()).unwrap(), data);
    }
}
