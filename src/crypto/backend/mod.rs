//! The crypto-backend abstraction.
//!
//! `Backend` is the seam between this crate and the physical RSA/ECC/
//! AES accelerator and random number generator a real card embeds.
//! Mirrors the shape of the upstream crate's `crypto::backend::Backend`
//! (one trait per capability class, a `backend()` name for diagnostics)
//! generalized from "OpenPGP message crypto" to "smart card crypto
//! engine": RSA/ECDSA/EdDSA signing, ECDH key agreement, AES for the
//! symmetric decryption key slot, and the SHA-256/SHA-512 hashing
//! KDF-DO needs, none of which this crate implements itself (spec
//! §1(d) lists them as external collaborators).

use crate::crypto::mem::Protected;
use crate::types::AlgorithmId;
use crate::Result;

#[cfg(feature = "backend-soft")]
pub mod soft;

/// Which SHA variant a hashing call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256, the default KDF-DO hash.
    Sha256,
    /// SHA-512, used when KDF-DO's algorithm byte selects it.
    Sha512,
}

/// Abstracts over the physical cryptographic accelerator.
///
/// Note: implementors should match exhaustively on [`AlgorithmId`] in
/// [`Backend::supports_algo`] rather than using a catch-all, so adding
/// a new algorithm id surfaces every backend that needs updating.
pub trait Backend {
    /// A short, human-readable description of the backend, for
    /// inclusion in diagnostics.
    fn name(&self) -> &'static str;

    /// Whether this backend can perform operations for `algo`.
    fn supports_algo(&self, algo: AlgorithmId) -> bool;

    /// Fills `buf` with output from a cryptographically secure PRNG.
    fn random(&self, buf: &mut [u8]) -> Result<()>;

    /// Hashes `data` with `algo`.
    fn hash(&self, algo: HashAlgorithm, data: &[u8]) -> Result<Protected>;

    /// Generates an RSA key pair with the given modulus length in
    /// bits. Returns the private exponent components needed to
    /// reconstruct a CRT-form key, plus the public modulus and
    /// exponent.
    fn rsa_generate_key(&self, modulus_bits: usize) -> Result<RsaKeyPair>;

    /// Signs `digest` (a pre-hashed message, padded per PKCS#1 v1.5 by
    /// the caller's choice of digest info) with an RSA private key.
    fn rsa_sign_pkcs1(&self, key: &RsaPrivateKey, digest: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts `ciphertext` (PKCS#1 v1.5-padded) with an RSA private
    /// key, for PSO:DECIPHER.
    fn rsa_decrypt_pkcs1(&self, key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Generates an ECDSA/EdDSA key pair on the given curve.
    fn ec_generate_key(&self, curve: EcCurve) -> Result<EcKeyPair>;

    /// Signs `digest` with an ECDSA private key, returning the raw
    /// `r || s` concatenation (no ASN.1 wrapping, per 3.3.1 §7.2.10).
    fn ecdsa_sign(&self, key: &EcPrivateKey, digest: &[u8]) -> Result<Vec<u8>>;

    /// Signs `message` with an EdDSA private key (Ed25519 signs the
    /// message directly, never a digest).
    fn eddsa_sign(&self, key: &EcPrivateKey, message: &[u8]) -> Result<Vec<u8>>;

    /// Computes an ECDH shared secret between our private key and the
    /// host-supplied ephemeral public point.
    fn ecdh_shared_secret(
        &self,
        key: &EcPrivateKey,
        peer_public: &[u8],
    ) -> Result<Protected>;

    /// Encrypts a single 16-byte AES block under `key` (the AES key
    /// slot only ever processes ECB-mode decryption per 3.3.1 §7.2.11,
    /// but encrypt is kept symmetric with decrypt for backend parity).
    fn aes_encrypt(&self, key: &Protected, block: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts data under `key` for PSO:DECIPHER with the AES slot.
    fn aes_decrypt(&self, key: &Protected, data: &[u8]) -> Result<Vec<u8>>;
}

/// The elliptic curves this crate's algorithm attributes can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    /// NIST P-256, used for ECDSA/ECDH.
    NistP256,
    /// Curve25519 in Ed25519 (signing) form.
    Ed25519,
    /// Curve25519 in X25519 (key agreement) form.
    X25519,
}

/// An RSA key pair as returned by key generation: the private
/// components needed to reconstruct a CRT-form key, plus the public
/// modulus and exponent for the 7F49 template.
pub struct RsaKeyPair {
    /// The private key.
    pub private: RsaPrivateKey,
    /// The public modulus `n`.
    pub modulus: crate::crypto::mpi::Mpi,
    /// The public exponent `e`.
    pub public_exponent: crate::crypto::mpi::Mpi,
}

/// An RSA private key in CRT form, matching the key parts the
/// standard's PutKey CRT template addresses (0x92 `p`, 0x93 `q`, 0x94
/// `1/q mod p`, 0x95 `d mod (p-1)`, 0x96 `d mod (q-1)`).
pub struct RsaPrivateKey {
    /// Smaller secret prime.
    pub p: Protected,
    /// Larger secret prime.
    pub q: Protected,
    /// `1/q mod p`.
    pub q_inv: Protected,
    /// `d mod (p-1)`.
    pub dp: Protected,
    /// `d mod (q-1)`.
    pub dq: Protected,
}

/// An ECDSA/EdDSA/ECDH key pair.
pub struct EcKeyPair {
    /// The private key.
    pub private: EcPrivateKey,
    /// The public point, `04 || X || Y` for NIST curves or the raw
    /// 32-byte compressed point for Curve25519.
    pub public: Vec<u8>,
}

/// An elliptic-curve private key.
pub struct EcPrivateKey {
    /// The curve this key belongs to.
    pub curve: EcCurve,
    /// The private scalar.
    pub scalar: Protected,
}
