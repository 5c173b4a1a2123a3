//! The crypto engine: dispatches sign/decipher/key-agreement
//! operations to a [`backend::Backend`] using already-resolved key
//! material.
//!
//! Mirrors `Crypto::CryptoEngine` in `original_source`, minus the key
//! lookup it performs internally — here that's the caller's job
//! (typically a handler, via [`crate::key::KeyStorage`]), keeping this
//! facade a pure dispatch layer over the primitive backend.

pub mod backend;
pub mod mem;
pub mod mpi;

use backend::{Backend, EcCurve, HashAlgorithm};
use mem::Protected;

use crate::key::PrivateKeyMaterial;
use crate::{Error, Result};

/// Combines a primitive [`Backend`] with the key material a handler
/// has already loaded, and performs the requested operation.
pub struct CryptoEngine<'b> {
    backend: &'b dyn Backend,
}

impl<'b> CryptoEngine<'b> {
    /// Wraps `backend` for use by the current APDU.
    pub fn new(backend: &'b dyn Backend) -> Self {
        CryptoEngine { backend }
    }

    /// Fills `buf` with random bytes, for GetChallenge.
    pub fn random(&self, buf: &mut [u8]) -> Result<()> {
        self.backend.random(buf)
    }

    /// Hashes `data`, for KDF-DO password verification.
    pub fn hash(&self, algo: HashAlgorithm, data: &[u8]) -> Result<Protected> {
        self.backend.hash(algo, data)
    }

    /// Generates and returns a fresh RSA key pair.
    pub fn generate_rsa_key(&self, modulus_bits: usize) -> Result<backend::RsaKeyPair> {
        self.backend.rsa_generate_key(modulus_bits)
    }

    /// Generates and returns a fresh EC key pair on `curve`.
    pub fn generate_ec_key(&self, curve: EcCurve) -> Result<backend::EcKeyPair> {
        self.backend.ec_generate_key(curve)
    }

    /// Signs `digest` (or, for EdDSA, the raw message) with `key`,
    /// for PSO:CDS and InternalAuthenticate.
    pub fn sign(&self, key: &PrivateKeyMaterial, digest_or_message: &[u8]) -> Result<Vec<u8>> {
        match key {
            PrivateKeyMaterial::Rsa(rsa) => self.backend.rsa_sign_pkcs1(rsa, digest_or_message),
            PrivateKeyMaterial::Ec(ec) if ec.curve == EcCurve::Ed25519 => {
                self.backend.eddsa_sign(ec, digest_or_message)
            }
            PrivateKeyMaterial::Ec(ec) => self.backend.ecdsa_sign(ec, digest_or_message),
        }
    }

    /// Decrypts `ciphertext` with an RSA private key, for
    /// PSO:DECIPHER mode 0x00.
    pub fn decrypt_rsa(&self, key: &PrivateKeyMaterial, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match key {
            PrivateKeyMaterial::Rsa(rsa) => self.backend.rsa_decrypt_pkcs1(rsa, ciphertext),
            PrivateKeyMaterial::Ec(_) => Err(Error::ConditionsNotSatisfied),
        }
    }

    /// Computes an ECDH shared secret, for PSO:DECIPHER mode 0xA6.
    pub fn ecdh_shared_secret(
        &self,
        key: &PrivateKeyMaterial,
        peer_public: &[u8],
    ) -> Result<Protected> {
        match key {
            PrivateKeyMaterial::Ec(ec) => self.backend.ecdh_shared_secret(ec, peer_public),
            PrivateKeyMaterial::Rsa(_) => Err(Error::ConditionsNotSatisfied),
        }
    }

    /// Encrypts one or more 16-byte blocks under the AES key slot, for
    /// PSO:ENCIPHER.
    pub fn aes_encrypt(&self, key: &Protected, data: &[u8]) -> Result<Vec<u8>> {
        self.backend.aes_encrypt(key, data)
    }

    /// Decrypts data under the AES key slot, for PSO:DECIPHER mode
    /// 0x02.
    pub fn aes_decrypt(&self, key: &Protected, data: &[u8]) -> Result<Vec<u8>> {
        self.backend.aes_decrypt(key, data)
    }
}

#[cfg(all(test, feature = "backend-soft"))]
mod tests {
    use super::*;
    use crate::crypto::backend::soft::SoftBackend;
    use crate::crypto::backend::EcPrivateKey;

    #[test]
    fn sign_dispatches_ecdsa_for_p256() {
        let backend = SoftBackend;
        let engine = CryptoEngine::new(&backend);
        let pair = engine.generate_ec_key(EcCurve::NistP256).unwrap();
        let key = PrivateKeyMaterial::Ec(pair.private);
        let sig = engine.sign(&key, &[0x42; 32]).unwrap();
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn decrypt_rsa_rejects_ec_key() {
        let backend = SoftBackend;
        let engine = CryptoEngine::new(&backend);
        let key = PrivateKeyMaterial::Ec(EcPrivateKey {
            curve: EcCurve::NistP256,
            scalar: vec![0u8; 32].into(),
        });
        assert!(engine.decrypt_rsa(&key, &[0u8; 32]).is_err());
    }
}
