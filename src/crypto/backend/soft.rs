//! A software [`Backend`], for bring-up and the test suite.
//!
//! Built on the RustCrypto stack, the same ecosystem the upstream
//! crate's `crypto-rust` backend draws from. **Never use this backend
//! to protect real cardholder secrets** — it has no protection against
//! a debugger or a cold-boot attack reading process memory, which is
//! the entire reason a real card pairs this crate with a hardware
//! accelerator instead.

use aes::{Aes128, Aes192, Aes256};
use cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit};
use ecb::{Decryptor as EcbDecryptor, Encryptor as EcbEncryptor};
use ed25519_dalek::{Signer, SigningKey};
use p256::ecdsa::{signature::Signer as _, Signature as P256Signature, SigningKey as P256SigningKey};
use rand::rngs::OsRng;
use rsa::pkcs1v15::{Pkcs1v15Encrypt, SigningKey as RsaSigningKey};
use rsa::signature::{SignatureEncoding, Signer as RsaSigner};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey as RsaKey;
use sha2::{Digest, Sha256, Sha512};

use crate::crypto::backend::{
    Backend, EcCurve, EcKeyPair, EcPrivateKey, HashAlgorithm, RsaKeyPair, RsaPrivateKey,
};
use crate::crypto::mem::Protected;
use crate::crypto::mpi::Mpi;
use crate::types::AlgorithmId;
use crate::{Error, Result};

/// The RustCrypto-backed software backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftBackend;

impl Backend for SoftBackend {
    fn name(&self) -> &'static str {
        "soft (RustCrypto)"
    }

    fn supports_algo(&self, algo: AlgorithmId) -> bool {
        match algo {
            AlgorithmId::Rsa | AlgorithmId::Ecdsa | AlgorithmId::EdDsa | AlgorithmId::Ecdh => true,
        }
    }

    fn random(&self, buf: &mut [u8]) -> Result<()> {
        use rand_core::RngCore;
        OsRng.fill_bytes(buf);
        Ok(())
    }

    fn hash(&self, algo: HashAlgorithm, data: &[u8]) -> Result<Protected> {
        let digest = match algo {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        };
        Ok(digest.into())
    }

    fn rsa_generate_key(&self, modulus_bits: usize) -> Result<RsaKeyPair> {
        let key = RsaKey::new(&mut OsRng, modulus_bits).map_err(|_| Error::CryptoOperationError)?;
        let primes = key.primes();
        let p = primes.first().ok_or(Error::CryptoResultError)?;
        let q = primes.get(1).ok_or(Error::CryptoResultError)?;
        let dp = key.dp().ok_or(Error::CryptoResultError)?;
        let dq = key.dq().ok_or(Error::CryptoResultError)?;
        let q_inv = key.qinv().ok_or(Error::CryptoResultError)?;

        Ok(RsaKeyPair {
            private: RsaPrivateKey {
                p: p.to_bytes_be().into(),
                q: q.to_bytes_be().into(),
                q_inv: q_inv.to_bytes_be().into(),
                dp: dp.to_bytes_be().into(),
                dq: dq.to_bytes_be().into(),
            },
            modulus: Mpi::new(&key.n().to_bytes_be()),
            public_exponent: Mpi::new(&key.e().to_bytes_be()),
        })
    }

    fn rsa_sign_pkcs1(&self, key: &RsaPrivateKey, digest: &[u8]) -> Result<Vec<u8>> {
        let rsa_key = reconstruct_rsa_key(key)?;
        let signing_key = RsaSigningKey::<Sha256>::new_unprefixed(rsa_key);
        let signature = signing_key
            .try_sign_prehash(digest)
            .map_err(|_| Error::CryptoOperationError)?;
        Ok(signature.to_vec())
    }

    fn rsa_decrypt_pkcs1(&self, key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let rsa_key = reconstruct_rsa_key(key)?;
        rsa_key
            .decrypt(Pkcs1v15Encrypt, ciphertext)
            .map_err(|_| Error::CryptoOperationError)
    }

    fn ec_generate_key(&self, curve: EcCurve) -> Result<EcKeyPair> {
        match curve {
            EcCurve::NistP256 => {
                let signing_key = P256SigningKey::random(&mut OsRng);
                let verifying_key = signing_key.verifying_key();
                let encoded_point = verifying_key.to_encoded_point(false);
                Ok(EcKeyPair {
                    private: EcPrivateKey {
                        curve,
                        scalar: signing_key.to_bytes().to_vec().into(),
                    },
                    public: encoded_point.as_bytes().to_vec(),
                })
            }
            EcCurve::Ed25519 => {
                let signing_key = SigningKey::generate(&mut OsRng);
                Ok(EcKeyPair {
                    private: EcPrivateKey {
                        curve,
                        scalar: signing_key.to_bytes().to_vec().into(),
                    },
                    public: signing_key.verifying_key().to_bytes().to_vec(),
                })
            }
            EcCurve::X25519 => {
                let secret = x25519_dalek::StaticSecret::random_from_rng(OsRng);
                let public = x25519_dalek::PublicKey::from(&secret);
                Ok(EcKeyPair {
                    private: EcPrivateKey {
                        curve,
                        scalar: secret.to_bytes().to_vec().into(),
                    },
                    public: public.to_bytes().to_vec(),
                })
            }
        }
    }

    fn ecdsa_sign(&self, key: &EcPrivateKey, digest: &[u8]) -> Result<Vec<u8>> {
        if key.curve != EcCurve::NistP256 {
            return Err(Error::CryptoDataError);
        }
        let signing_key = P256SigningKey::from_bytes(key.scalar.as_ref().into())
            .map_err(|_| Error::StoredKeyError)?;
        let signature: P256Signature = signing_key.sign(digest);
        Ok(signature.to_bytes().to_vec())
    }

    fn eddsa_sign(&self, key: &EcPrivateKey, message: &[u8]) -> Result<Vec<u8>> {
        if key.curve != EcCurve::Ed25519 {
            return Err(Error::CryptoDataError);
        }
        let bytes: [u8; 32] = key
            .scalar
            .as_ref()
            .try_into()
            .map_err(|_| Error::StoredKeyError)?;
        let signing_key = SigningKey::from_bytes(&bytes);
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    fn ecdh_shared_secret(&self, key: &EcPrivateKey, peer_public: &[u8]) -> Result<Protected> {
        match key.curve {
            EcCurve::NistP256 => {
                let scalar = p256::SecretKey::from_slice(key.scalar.as_ref())
                    .map_err(|_| Error::StoredKeyError)?;
                let public = p256::PublicKey::from_sec1_bytes(peer_public)
                    .map_err(|_| Error::CryptoDataError)?;
                let shared = p256::ecdh::diffie_hellman(
                    scalar.to_nonzero_scalar(),
                    public.as_affine(),
                );
                Ok(shared.raw_secret_bytes().to_vec().into())
            }
            EcCurve::X25519 => {
                let bytes: [u8; 32] = key
                    .scalar
                    .as_ref()
                    .try_into()
                    .map_err(|_| Error::StoredKeyError)?;
                let secret = x25519_dalek::StaticSecret::from(bytes);
                let peer_bytes: [u8; 32] =
                    peer_public.try_into().map_err(|_| Error::CryptoDataError)?;
                let peer = x25519_dalek::PublicKey::from(peer_bytes);
                Ok(secret.diffie_hellman(&peer).to_bytes().to_vec().into())
            }
            EcCurve::Ed25519 => Err(Error::CryptoDataError),
        }
    }

    fn aes_encrypt(&self, key: &Protected, block: &[u8]) -> Result<Vec<u8>> {
        match key.len() {
            16 => ecb_encrypt::<Aes128>(key.as_ref(), block),
            24 => ecb_encrypt::<Aes192>(key.as_ref(), block),
            32 => ecb_encrypt::<Aes256>(key.as_ref(), block),
            _ => Err(Error::StoredKeyError),
        }
    }

    fn aes_decrypt(&self, key: &Protected, data: &[u8]) -> Result<Vec<u8>> {
        match key.len() {
            16 => ecb_decrypt::<Aes128>(key.as_ref(), data),
            24 => ecb_decrypt::<Aes192>(key.as_ref(), data),
            32 => ecb_decrypt::<Aes256>(key.as_ref(), data),
            _ => Err(Error::StoredKeyError),
        }
    }
}

/// ECB-encrypts `block` (already a whole number of `C`'s block size)
/// under `key`, generic over the AES-128/192/256 block cipher so the
/// AES key slot's three permitted sizes (OpenPGP Card v3.3.1 §4.3.3.8)
/// share one implementation.
fn ecb_encrypt<C: KeyInit + BlockEncryptMut>(key: &[u8], block: &[u8]) -> Result<Vec<u8>> {
    let cipher = EcbEncryptor::<C>::new_from_slice(key).map_err(|_| Error::StoredKeyError)?;
    let mut buf = block.to_vec();
    cipher
        .encrypt_padded_mut::<cipher::block_padding::NoPadding>(&mut buf, block.len())
        .map_err(|_| Error::CryptoDataError)?;
    Ok(buf)
}

/// See [`ecb_encrypt`].
fn ecb_decrypt<C: KeyInit + BlockDecryptMut>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let cipher = EcbDecryptor::<C>::new_from_slice(key).map_err(|_| Error::StoredKeyError)?;
    let mut buf = data.to_vec();
    cipher
        .decrypt_padded_mut::<cipher::block_padding::NoPadding>(&mut buf)
        .map_err(|_| Error::CryptoDataError)?;
    Ok(buf)
}

/// Reconstructs an `rsa` crate private key from the CRT components this
/// applet actually persists (`p`, `q`, `qinv`, `dp`, `dq` — the same
/// five components OpenPGP Card v3.3.1's PutKey private key template
/// carries, §4.4.3.12). The crate's own private exponent `d` isn't one
/// of them, so it is re-derived here as `e^-1 mod (p-1)(q-1)` rather
/// than mistaken for `dp`/`dq`, which are reduced modulo `p-1`/`q-1`
/// respectively and are not interchangeable with `d` itself.
fn reconstruct_rsa_key(key: &RsaPrivateKey) -> Result<RsaKey> {
    use num_bigint_dig::{BigInt, Sign};
    use rsa::BigUint;

    let p = BigUint::from_bytes_be(&key.p);
    let q = BigUint::from_bytes_be(&key.q);
    let n = &p * &q;
    // The public exponent isn't carried in `RsaPrivateKey`; 65537 is
    // the only exponent this applet's key generation ever produces.
    let e = BigUint::from(65537u32);
    let one = BigUint::from(1u32);
    let phi = (&p - &one) * (&q - &one);

    let e_signed = BigInt::from_biguint(Sign::Plus, e.clone());
    let phi_signed = BigInt::from_biguint(Sign::Plus, phi);
    let d_signed = mod_inverse(&e_signed, &phi_signed).ok_or(Error::StoredKeyParamsError)?;
    let d = d_signed.to_biguint().ok_or(Error::StoredKeyParamsError)?;

    RsaKey::from_components(n, e, d, vec![p, q]).map_err(|_| Error::StoredKeyParamsError)
}

/// `a^-1 mod m` via the extended Euclidean algorithm, or `None` if `a`
/// and `m` share a common factor.
fn mod_inverse(a: &num_bigint_dig::BigInt, m: &num_bigint_dig::BigInt) -> Option<num_bigint_dig::BigInt> {
    let (g, x, _) = extended_gcd(a.clone(), m.clone());
    if g != num_bigint_dig::BigInt::from(1) {
        return None;
    }
    Some(((x % m) + m) % m)
}

fn extended_gcd(
    a: num_bigint_dig::BigInt,
    b: num_bigint_dig::BigInt,
) -> (num_bigint_dig::BigInt, num_bigint_dig::BigInt, num_bigint_dig::BigInt) {
    if a == num_bigint_dig::BigInt::from(0) {
        (b, num_bigint_dig::BigInt::from(0), num_bigint_dig::BigInt::from(1))
    } else {
        let (g, x1, y1) = extended_gcd(&b % &a, a.clone());
        let x = &y1 - (&b / &a) * &x1;
        (g, x, x1)
    }
}
