//! KDF-DO: the key-derivation-function configuration data object.
//!
//! OpenPGP Card v3.3.1 pages 18-20 and 29; mirrors `KDFDO` in
//! `original_source`'s `openpgpstruct.h`. When installed (tag 0x00F9),
//! password verification hashes the presented PIN with the configured
//! salt and iteration count before comparing it to the stored
//! verifier, instead of comparing raw bytes.

use crate::crypto::backend::{Backend, HashAlgorithm};
use crate::crypto::mem::Protected;
use crate::tlv;
use crate::types::{PasswordId, Tag};
use crate::{Error, Result};

/// No key derivation: passwords are compared as raw bytes.
pub const KDF_ALGORITHM_NONE: u8 = 0x00;
/// RFC 4880-style iterated, salted hashing.
pub const KDF_ALGORITHM_ITER_SALTED_S2K: u8 = 0x03;

const HASH_ALGORITHM_SHA256: u8 = 0x08;
const HASH_ALGORITHM_SHA512: u8 = 0x0A;

/// A decoded KDF-DO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfDo {
    /// `KDF_ALGORITHM_NONE` or `KDF_ALGORITHM_ITER_SALTED_S2K`.
    pub kdf_algorithm: u8,
    /// `HASH_ALGORITHM_SHA256` or `HASH_ALGORITHM_SHA512`.
    pub hash_algorithm: u8,
    /// How many times the salted input is re-hashed.
    pub iteration_count: u32,
    /// Salt for the PW1 context (shared by PW1-CDS and PW1).
    pub salt_pw1: Vec<u8>,
    /// Salt for the resetting code.
    pub salt_rc: Vec<u8>,
    /// Salt for PW3.
    pub salt_pw3: Vec<u8>,
}

impl KdfDo {
    /// Whether key derivation is configured at all.
    pub fn is_active(&self) -> bool {
        self.kdf_algorithm != KDF_ALGORITHM_NONE
    }

    /// Decodes a KDF-DO blob as stored at tag 0x00F9 (a flat sequence
    /// of sub-objects 0x81 algorithm id, 0x82 hash algorithm, 0x83
    /// iteration count, 0x84/0x85/0x86 salts for PW1/RC/PW3).
    pub fn decode(data: &[u8]) -> Result<Self> {
        let elements = tlv::parse_all(data)?;
        let mut kdf = KdfDo {
            kdf_algorithm: KDF_ALGORITHM_NONE,
            hash_algorithm: HASH_ALGORITHM_SHA256,
            iteration_count: 0,
            salt_pw1: Vec::new(),
            salt_rc: Vec::new(),
            salt_pw3: Vec::new(),
        };
        for element in elements {
            match element.tag {
                Tag(0x81) => {
                    kdf.kdf_algorithm = *element.value.first().ok_or(Error::TlvDecodeValue)?;
                }
                Tag(0x82) => {
                    kdf.hash_algorithm = *element.value.first().ok_or(Error::TlvDecodeValue)?;
                }
                Tag(0x83) => {
                    if element.value.len() != 4 {
                        return Err(Error::TlvDecodeValue);
                    }
                    kdf.iteration_count = u32::from_be_bytes(element.value.try_into().unwrap());
                }
                Tag(0x84) => kdf.salt_pw1 = element.value.to_vec(),
                Tag(0x85) => kdf.salt_rc = element.value.to_vec(),
                Tag(0x86) => kdf.salt_pw3 = element.value.to_vec(),
                _ => {}
            }
        }
        Ok(kdf)
    }

    /// Encodes this KDF-DO back to its wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = tlv::encode(Tag(0x81), &[self.kdf_algorithm]);
        out.extend(tlv::encode(Tag(0x82), &[self.hash_algorithm]));
        out.extend(tlv::encode(Tag(0x83), &self.iteration_count.to_be_bytes()));
        if !self.salt_pw1.is_empty() {
            out.extend(tlv::encode(Tag(0x84), &self.salt_pw1));
        }
        if !self.salt_rc.is_empty() {
            out.extend(tlv::encode(Tag(0x85), &self.salt_rc));
        }
        if !self.salt_pw3.is_empty() {
            out.extend(tlv::encode(Tag(0x86), &self.salt_pw3));
        }
        out
    }

    fn salt_for(&self, id: PasswordId) -> &[u8] {
        match id {
            PasswordId::Pw1Cds | PasswordId::Pw1 => &self.salt_pw1,
            PasswordId::Rc => &self.salt_rc,
            PasswordId::Pw3 => &self.salt_pw3,
        }
    }

    /// The hash function this KDF-DO's configuration selects.
    pub fn hash_algorithm_enum(&self) -> HashAlgorithm {
        if self.hash_algorithm == HASH_ALGORITHM_SHA512 {
            HashAlgorithm::Sha512
        } else {
            HashAlgorithm::Sha256
        }
    }

    /// Derives the verifier digest for `plain` under this KDF-DO's
    /// configuration for password context `id`: `H^n(salt || plain)`,
    /// re-hashing the digest `iteration_count` times.
    pub fn derive(&self, backend: &dyn Backend, id: PasswordId, plain: &[u8]) -> Result<Protected> {
        let algo = self.hash_algorithm_enum();
        let mut buf = self.salt_for(id).to_vec();
        buf.extend_from_slice(plain);
        let mut digest = backend.hash(algo, &buf)?;
        let rounds = self.iteration_count.saturating_sub(1);
        for _ in 0..rounds {
            digest = backend.hash(algo, &digest)?;
        }
        Ok(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::backend::soft::SoftBackend;

    #[test]
    fn kdf_do_roundtrip() {
        let kdf = KdfDo {
            kdf_algorithm: KDF_ALGORITHM_ITER_SALTED_S2K,
            hash_algorithm: HASH_ALGORITHM_SHA256,
            iteration_count: 1000,
            salt_pw1: vec![1, 2, 3, 4, 5, 6, 7, 8],
            salt_rc: vec![],
            salt_pw3: vec![9, 9, 9, 9, 9, 9, 9, 9],
        };
        let encoded = kdf.encode();
        let decoded = KdfDo::decode(&encoded).unwrap();
        assert_eq!(decoded, kdf);
    }

    #[test]
    fn inactive_by_default() {
        let kdf = KdfDo::decode(&[]).unwrap();
        assert!(!kdf.is_active());
    }

    #[test]
    fn derive_is_deterministic_and_salt_dependent() {
        let backend = SoftBackend;
        let kdf = KdfDo {
            kdf_algorithm: KDF_ALGORITHM_ITER_SALTED_S2K,
            hash_algorithm: HASH_ALGORITHM_SHA256,
            iteration_count: 3,
            salt_pw1: vec![0xAA; 8],
            salt_rc: vec![0xBB; 8],
            salt_pw3: vec![],
        };
        let d1 = kdf.derive(&backend, PasswordId::Pw1, b"123456").unwrap();
        let d2 = kdf.derive(&backend, PasswordId::Pw1, b"123456").unwrap();
        assert_eq!(&*d1, &*d2);

        let d3 = kdf.derive(&backend, PasswordId::Rc, b"123456").unwrap();
        assert_ne!(&*d1, &*d3);
    }
}
