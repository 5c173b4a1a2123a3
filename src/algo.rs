//! Algorithm attributes: the per-slot description of which algorithm
//! and key format a signature/decryption/authentication key uses.
//!
//! Stored at tags 0x00C1/0x00C2/0x00C3 (one blob per [`KeySlot`]) and
//! readable/writable via GetData/PutData. OpenPGP Card v3.3.1 §4.3.3.6
//! defines the RSA encoding, §4.3.3.7 the ECDSA/EdDSA/ECDH encoding;
//! this mirrors `Crypto::AlgoritmAttr`/`RSAAlgorithmAttr`/
//! `ECDSAAlgorithmAttr` in `original_source`.

use crate::types::{AlgorithmId, KeySlot};
use crate::{Error, Result};

/// The RSA key format byte, cf. `Crypto::RSAKeyImportFormat` in
/// `original_source`. Only the standard and CRT formats are produced
/// by GenerateAsymmetricKeyPair; the others exist for PutKey import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaKeyFormat {
    /// `e`, `p`, `q` only.
    Standard = 0x00,
    /// `e`, `p`, `q`, plus the public modulus `n`.
    StandardWithModulus = 0x01,
    /// `e`, `p`, `q`, `1/q mod p`, `d mod (p-1)`, `d mod (q-1)`.
    Crt = 0x02,
    /// CRT plus the public modulus `n`.
    CrtWithModulus = 0x03,
}

impl RsaKeyFormat {
    fn from_byte(b: u8) -> Result<Self> {
        match b {
            0x00 => Ok(RsaKeyFormat::Standard),
            0x01 => Ok(RsaKeyFormat::StandardWithModulus),
            0x02 => Ok(RsaKeyFormat::Crt),
            0x03 => Ok(RsaKeyFormat::CrtWithModulus),
            _ => Err(Error::StoredKeyParamsError),
        }
    }
}

/// RSA attributes: modulus and public-exponent bit lengths, plus the
/// key import format (OpenPGP Card v3.3.1 §4.3.3.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaAttr {
    /// Modulus length in bits, e.g. 2048.
    pub modulus_bits: u16,
    /// Public exponent length in bits, e.g. 32.
    pub public_exponent_bits: u16,
    /// Which parts PutKey expects to receive / GenerateAsymmetricKeyPair reports.
    pub key_format: RsaKeyFormat,
}

/// The elliptic curve an ECDSA/EdDSA/ECDH attribute names, identified
/// by its ASN.1 object identifier (OpenPGP Card v3.3.1 §4.3.3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    /// NIST P-256, OID `1.2.840.10045.3.1.7`.
    NistP256,
    /// Ed25519 in EdDSA mode, OID `1.3.6.1.4.1.11591.15.1`.
    Ed25519,
    /// Curve25519 in ECDH (X25519) mode, same OID as `Ed25519`; the
    /// two are distinguished by which key slot they're attached to.
    Cv25519,
}

const OID_NIST_P256: &[u8] = &[0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07];
const OID_25519: &[u8] = &[0x2B, 0x06, 0x01, 0x04, 0x01, 0xDA, 0x47, 0x0F, 0x01];

impl Curve {
    fn from_oid(oid: &[u8], slot: KeySlot) -> Result<Self> {
        match oid {
            OID_NIST_P256 => Ok(Curve::NistP256),
            OID_25519 if slot == KeySlot::Confidentiality => Ok(Curve::Cv25519),
            OID_25519 => Ok(Curve::Ed25519),
            _ => Err(Error::StoredKeyParamsError),
        }
    }

    fn oid(self) -> &'static [u8] {
        match self {
            Curve::NistP256 => OID_NIST_P256,
            Curve::Ed25519 | Curve::Cv25519 => OID_25519,
        }
    }

    /// The field size in bits, used to size 7F49 public-key points.
    pub fn field_bits(self) -> usize {
        match self {
            Curve::NistP256 => 256,
            Curve::Ed25519 | Curve::Cv25519 => 256,
        }
    }

    /// The [`crate::crypto::backend::EcCurve`] this curve maps onto.
    pub fn backend_curve(self) -> crate::crypto::backend::EcCurve {
        match self {
            Curve::NistP256 => crate::crypto::backend::EcCurve::NistP256,
            Curve::Ed25519 => crate::crypto::backend::EcCurve::Ed25519,
            Curve::Cv25519 => crate::crypto::backend::EcCurve::X25519,
        }
    }
}

/// EC attributes: the named curve and, for PutKey import, the format
/// byte (OpenPGP Card v3.3.1 §4.3.3.7; `0xFF` means "standard with
/// public key", the only format GenerateAsymmetricKeyPair produces).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcAttr {
    /// The named curve.
    pub curve: Curve,
    /// The key import format byte, if present (defaults to `0xFF`).
    pub key_format: u8,
}

/// A key slot's full algorithm-attribute blob, as stored at
/// 0x00C1/0x00C2/0x00C3 and read back whole by GetData.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmAttr {
    /// RSA attributes.
    Rsa(RsaAttr),
    /// ECDSA (signature/authentication slots) or ECDH (confidentiality
    /// slot) attributes; which one is active is implied by the slot,
    /// not stored separately.
    Ec(EcAttr),
    /// EdDSA attributes (Ed25519 in signing mode).
    EdDsa(EcAttr),
}

impl AlgorithmAttr {
    /// The [`AlgorithmId`] this attribute describes.
    pub fn algorithm_id(&self) -> AlgorithmId {
        match self {
            AlgorithmAttr::Rsa(_) => AlgorithmId::Rsa,
            AlgorithmAttr::Ec(attr) if attr.curve == Curve::Cv25519 => AlgorithmId::Ecdh,
            AlgorithmAttr::Ec(_) => AlgorithmId::Ecdsa,
            AlgorithmAttr::EdDsa(_) => AlgorithmId::EdDsa,
        }
    }

    /// Decodes an algorithm-attributes blob as stored at a key slot's
    /// tag. `slot` disambiguates Curve25519's two key-agreement
    /// semantics (Ed25519 signing vs. X25519 key agreement), which the
    /// wire encoding alone does not.
    pub fn decode(data: &[u8], slot: KeySlot) -> Result<Self> {
        let (&id_byte, rest) = data.split_first().ok_or(Error::StoredKeyParamsError)?;
        let algo = AlgorithmId::from_byte(id_byte)?;
        match algo {
            AlgorithmId::Rsa => {
                if rest.len() < 5 {
                    return Err(Error::StoredKeyParamsError);
                }
                let modulus_bits = u16::from_be_bytes([rest[0], rest[1]]);
                let public_exponent_bits = u16::from_be_bytes([rest[2], rest[3]]);
                let key_format = RsaKeyFormat::from_byte(rest[4])?;
                Ok(AlgorithmAttr::Rsa(RsaAttr {
                    modulus_bits,
                    public_exponent_bits,
                    key_format,
                }))
            }
            AlgorithmId::Ecdsa | AlgorithmId::Ecdh | AlgorithmId::EdDsa => {
                // The OID fills the rest of the blob, except an
                // optional trailing format byte.
                let (oid, key_format) = match rest.split_last() {
                    Some((&fmt, oid)) if fmt == 0xFF || !oid.is_empty() && is_format_byte(fmt, oid) => {
                        (oid, fmt)
                    }
                    _ => (rest, 0xFF),
                };
                let curve = Curve::from_oid(oid, slot)?;
                let attr = EcAttr { curve, key_format };
                Ok(if algo == AlgorithmId::EdDsa {
                    AlgorithmAttr::EdDsa(attr)
                } else {
                    AlgorithmAttr::Ec(attr)
                })
            }
        }
    }

    /// Encodes this attribute back into its wire form for GetData.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AlgorithmAttr::Rsa(attr) => {
                let mut out = vec![AlgorithmId::Rsa.to_byte()];
                out.extend_from_slice(&attr.modulus_bits.to_be_bytes());
                out.extend_from_slice(&attr.public_exponent_bits.to_be_bytes());
                out.push(attr.key_format as u8);
                out
            }
            AlgorithmAttr::Ec(attr) => {
                let algo = if attr.curve == Curve::Cv25519 {
                    AlgorithmId::Ecdh
                } else {
                    AlgorithmId::Ecdsa
                };
                let mut out = vec![algo.to_byte()];
                out.extend_from_slice(attr.curve.oid());
                out.push(attr.key_format);
                out
            }
            AlgorithmAttr::EdDsa(attr) => {
                let mut out = vec![AlgorithmId::EdDsa.to_byte()];
                out.extend_from_slice(attr.curve.oid());
                out.push(attr.key_format);
                out
            }
        }
    }
}

/// The default signature-key attribute set a freshly reset card ships
/// with: RSA-2048, `e`=32 bits, CRT-with-modulus format.
pub fn default_rsa2048() -> AlgorithmAttr {
    AlgorithmAttr::Rsa(RsaAttr {
        modulus_bits: 2048,
        public_exponent_bits: 32,
        key_format: RsaKeyFormat::CrtWithModulus,
    })
}

fn is_format_byte(fmt: u8, _oid_candidate: &[u8]) -> bool {
    // A trailing 0x00/0x01 after a 9-byte OID is ambiguous with an
    // OID that happens to end the same way; the OpenPGP OIDs this
    // applet supports never do, so any trailing byte not itself a
    // valid OID continuation is treated as the format byte.
    fmt == 0x00 || fmt == 0x01 || fmt == 0xFF
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsa_attr_roundtrip() {
        let attr = default_rsa2048();
        let encoded = attr.encode();
        let decoded = AlgorithmAttr::decode(&encoded, KeySlot::DigitalSignature).unwrap();
        assert_eq!(decoded, attr);
        assert_eq!(decoded.algorithm_id(), AlgorithmId::Rsa);
    }

    #[test]
    fn ecdsa_attr_roundtrip() {
        let attr = AlgorithmAttr::Ec(EcAttr {
            curve: Curve::NistP256,
            key_format: 0xFF,
        });
        let encoded = attr.encode();
        let decoded = AlgorithmAttr::decode(&encoded, KeySlot::Authentication).unwrap();
        assert_eq!(decoded, attr);
        assert_eq!(decoded.algorithm_id(), AlgorithmId::Ecdsa);
    }

    #[test]
    fn cv25519_distinguishes_by_slot() {
        let attr = AlgorithmAttr::Ec(EcAttr {
            curve: Curve::Cv25519,
            key_format: 0xFF,
        });
        let encoded = attr.encode();
        let decoded = AlgorithmAttr::decode(&encoded, KeySlot::Confidentiality).unwrap();
        assert_eq!(decoded.algorithm_id(), AlgorithmId::Ecdh);
    }

    #[test]
    fn decode_rejects_empty() {
        assert!(AlgorithmAttr::decode(&[], KeySlot::DigitalSignature).is_err());
    }

    #[test]
    fn decode_rejects_short_rsa() {
        assert!(AlgorithmAttr::decode(&[0x01, 0x08], KeySlot::DigitalSignature).is_err());
    }
}
