//! Small, closed enumerations shared across the crate.
//!
//! These mirror the identifiers defined by the OpenPGP Card v3.3.1
//! standard: applet identities, the two storage regions, the four
//! password contexts, the three private-key slots, and the public-key
//! algorithm identifiers a key slot may hold.

use std::fmt;

/// An applet this card can select.
///
/// The core only implements the OpenPGP applet family, but the type
/// is left open (non-exhaustive) so a future sibling applet (e.g. a
/// PIV or FIDO applet sharing the same file system facade) can be
/// added without reworking [`crate::fs::FileSystem`]'s key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AppId {
    /// The OpenPGP applet, `D2 76 00 01 24 01 ...`.
    OpenPgp,
}

/// The OpenPGP AID prefix, shared by every version/manufacturer of
/// the applet (OpenPGP Card v3.3.1, §4.2.1).
pub const OPENPGP_AID_PREFIX: &[u8] = &[0xD2, 0x76, 0x00, 0x01, 0x24, 0x01];

impl AppId {
    /// Matches `aid` against this applet's AID family by prefix.
    pub fn matches_aid(self, aid: &[u8]) -> bool {
        match self {
            AppId::OpenPgp => aid.starts_with(OPENPGP_AID_PREFIX),
        }
    }
}

/// The storage region a data object lives in.
///
/// The backing store may encrypt [`Region::Secure`] at rest; that
/// policy belongs to the concrete [`crate::fs::FileSystem`]
/// implementation, not to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// Plain data objects: cardholder data, login data, certificates.
    File,
    /// Objects whose disclosure would weaken the applet's security:
    /// algorithm attributes, the AES key, KDF-DO salts/hashes.
    Secure,
}

/// The three independently-verified password contexts, plus the
/// resetting code (RC), which can only be *verified*, not directly
/// authenticated against an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordId {
    /// PW1 used once (or several times) to authorize PSO:CDS. P2=0x81.
    Pw1Cds,
    /// PW1 used for everything else requiring user presence. P2=0x82.
    Pw1,
    /// PW3, the admin password. P2=0x83.
    Pw3,
    /// The resetting code, used only to unlock PW1 via
    /// ResetRetryCounter.
    Rc,
}

impl PasswordId {
    /// Recovers the context addressed by a Verify/ChangeReferenceData
    /// P2 byte, if any.
    pub fn from_p2(p2: u8) -> Option<Self> {
        match p2 {
            0x81 => Some(PasswordId::Pw1Cds),
            0x82 => Some(PasswordId::Pw1),
            0x83 => Some(PasswordId::Pw3),
            _ => None,
        }
    }
}

impl fmt::Display for PasswordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            PasswordId::Pw1Cds => "PW1-CDS",
            PasswordId::Pw1 => "PW1",
            PasswordId::Pw3 => "PW3",
            PasswordId::Rc => "RC",
        })
    }
}

/// A data-object tag: a 16-bit BER tag naming one of the card's
/// addressable objects.
///
/// Wraps `u16` rather than re-deriving the BER 1-/2-byte tag encoding
/// here; [`crate::tlv`] is responsible for encoding/decoding tags on
/// the wire, `Tag` just names them once decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(pub u16);

impl Tag {
    /// Application identifier.
    pub const AID: Tag = Tag(0x004F);
    /// Login data.
    pub const LOGIN_DATA: Tag = Tag(0x005E);
    /// Cardholder related data (constructed).
    pub const CARDHOLDER_DATA: Tag = Tag(0x0065);
    /// Application related data (constructed).
    pub const APPLICATION_RELATED_DATA: Tag = Tag(0x006E);
    /// Discretionary data objects (constructed).
    pub const DISCRETIONARY_DATA: Tag = Tag(0x0073);
    /// Security support template (constructed; wraps the DS counter).
    pub const SECURITY_SUPPORT_TEMPLATE: Tag = Tag(0x007A);
    /// Extended capabilities.
    pub const EXTENDED_CAPABILITIES: Tag = Tag(0x00C0);
    /// Algorithm attributes, signature key.
    pub const ALGO_ATTR_SIG: Tag = Tag(0x00C1);
    /// Algorithm attributes, decryption key.
    pub const ALGO_ATTR_DEC: Tag = Tag(0x00C2);
    /// Algorithm attributes, authentication key.
    pub const ALGO_ATTR_AUT: Tag = Tag(0x00C3);
    /// PW status bytes.
    pub const PW_STATUS: Tag = Tag(0x00C4);
    /// AES key (symmetric decryption).
    pub const AES_KEY: Tag = Tag(0x00D5);
    /// Cardholder certificate.
    pub const CARDHOLDER_CERTIFICATE: Tag = Tag(0x7F21);
    /// Public-key template, returned by GenerateAsymmetricKeyPair.
    pub const PUBLIC_KEY_TEMPLATE: Tag = Tag(0x7F49);
    /// Key derivation function data object.
    pub const KDF_DO: Tag = Tag(0x00F9);
    /// Digital signature counter, also nested inside
    /// [`Tag::SECURITY_SUPPORT_TEMPLATE`].
    pub const DS_COUNTER: Tag = Tag(0x0093);
    /// Extended header list, the PutKey (INS=0xDB) data object wrapping
    /// a CRT selector plus a private key template.
    pub const EXTENDED_HEADER_LIST: Tag = Tag(0x004D);
    /// Cardholder private key template, nested inside
    /// [`Tag::EXTENDED_HEADER_LIST`]: a list of component tags and
    /// their byte lengths, with no value bytes of its own.
    pub const PRIVATE_KEY_TEMPLATE: Tag = Tag(0x7F48);
    /// Concatenated key data, nested inside
    /// [`Tag::EXTENDED_HEADER_LIST`]: the raw bytes
    /// [`Tag::PRIVATE_KEY_TEMPLATE`] describes the layout of.
    pub const CONCATENATED_KEY_DATA: Tag = Tag(0x5F48);

    /// The cardholder name (0x5B), sex (0x5F35), and preferred
    /// language (0x5F2D) objects, each a child of 0x0065 but also
    /// individually addressable by GetData/PutData.
    pub const NAME: Tag = Tag(0x005B);
    /// See [`Tag::NAME`].
    pub const LANGUAGE: Tag = Tag(0x5F2D);
    /// See [`Tag::NAME`].
    pub const SEX: Tag = Tag(0x5F35);

    /// Login data DO, repeated here under its Put-only encoding; some
    /// hosts address the "special" DOs 0x0101-0x0104 by their private
    /// use tag rather than 0x5E/0x65's children.
    pub const PRIVATE_USE_1: Tag = Tag(0x0101);
    /// See [`Tag::PRIVATE_USE_1`].
    pub const PRIVATE_USE_2: Tag = Tag(0x0102);
    /// See [`Tag::PRIVATE_USE_1`].
    pub const PRIVATE_USE_3: Tag = Tag(0x0103);
    /// See [`Tag::PRIVATE_USE_1`].
    pub const PRIVATE_USE_4: Tag = Tag(0x0104);

    /// Returns the maximum blob size this tag accepts via PutData, if
    /// the tag has a documented cap (OpenPGP Card v3.3.1 §4.2-4.4).
    pub fn max_len(self) -> Option<usize> {
        match self {
            Tag::CARDHOLDER_CERTIFICATE => Some(2048),
            Tag::PRIVATE_USE_1
            | Tag::PRIVATE_USE_2
            | Tag::PRIVATE_USE_3
            | Tag::PRIVATE_USE_4
            | Tag::LOGIN_DATA
            | Tag::KDF_DO
            | Tag::ALGO_ATTR_SIG
            | Tag::ALGO_ATTR_DEC
            | Tag::ALGO_ATTR_AUT => Some(256),
            _ => None,
        }
    }

    /// Whether a write to this tag must land in [`Region::Secure`].
    pub fn is_secure(self) -> bool {
        matches!(
            self,
            Tag::ALGO_ATTR_SIG | Tag::ALGO_ATTR_DEC | Tag::ALGO_ATTR_AUT
                | Tag::AES_KEY | Tag::KDF_DO
        )
    }
}

impl From<(u8, u8)> for Tag {
    /// Builds a tag from a GetData/PutData `(P1, P2)` pair, as used by
    /// INS=0xCA/0xCB/0xDA/0xDB.
    fn from((p1, p2): (u8, u8)) -> Self {
        Tag(((p1 as u16) << 8) | p2 as u16)
    }
}

/// The three private-key slots plus the AES slot, addressed by file
/// id for algorithm-attribute lookup and key storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySlot {
    /// Signature key (file id 0xC1).
    DigitalSignature,
    /// Decryption key (file id 0xC2).
    Confidentiality,
    /// Authentication key (file id 0xC3).
    Authentication,
    /// Symmetric AES key (file id 0xD5); never holds a keypair.
    Aes,
}

impl KeySlot {
    /// The algorithm-attribute / key-storage file id for this slot.
    pub fn tag(self) -> Tag {
        match self {
            KeySlot::DigitalSignature => Tag::ALGO_ATTR_SIG,
            KeySlot::Confidentiality => Tag::ALGO_ATTR_DEC,
            KeySlot::Authentication => Tag::ALGO_ATTR_AUT,
            KeySlot::Aes => Tag::AES_KEY,
        }
    }

    /// Recovers the slot addressed by a GenerateAsymmetricKeyPair CRT
    /// selector byte (OpenPGP Card v3.3.1 §7.2.10: 0xB6 CDS, 0xB8
    /// decipher, 0xA4 auth).
    pub fn from_crt_selector(selector: u8) -> Option<Self> {
        match selector {
            0xB6 => Some(KeySlot::DigitalSignature),
            0xB8 => Some(KeySlot::Confidentiality),
            0xA4 => Some(KeySlot::Authentication),
            _ => None,
        }
    }
}

/// The public-key algorithms a key slot's attributes may describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmId {
    /// RSA (encrypt & sign).
    Rsa,
    /// NIST ECDSA, used for signing and (via key slot) internal auth.
    Ecdsa,
    /// EdDSA (Ed25519).
    EdDsa,
    /// ECDH (X25519 or a NIST curve in ECDH mode).
    Ecdh,
}

impl AlgorithmId {
    /// Decodes the one-byte algorithm id stored at the start of an
    /// algorithm-attributes blob (OpenPGP Card v3.3.1 §4.3.3.6/7).
    pub fn from_byte(b: u8) -> crate::Result<Self> {
        match b {
            0x01 => Ok(AlgorithmId::Rsa),
            0x13 => Ok(AlgorithmId::Ecdsa),
            0x16 => Ok(AlgorithmId::EdDsa),
            0x12 => Ok(AlgorithmId::Ecdh),
            _ => Err(crate::Error::StoredKeyParamsError),
        }
    }

    /// The one-byte wire encoding used in algorithm-attribute blobs.
    pub fn to_byte(self) -> u8 {
        match self {
            AlgorithmId::Rsa => 0x01,
            AlgorithmId::Ecdsa => 0x13,
            AlgorithmId::EdDsa => 0x16,
            AlgorithmId::Ecdh => 0x12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aid_matches_by_prefix() {
        let mut aid = OPENPGP_AID_PREFIX.to_vec();
        aid.extend_from_slice(&[0x03, 0x04, 0x00, 0x00, 0x00, 0x00]);
        assert!(AppId::OpenPgp.matches_aid(&aid));
        assert!(!AppId::OpenPgp.matches_aid(b"\xa0\x00\x00\x00\x03"));
    }

    #[test]
    fn tag_from_p1p2() {
        assert_eq!(Tag::from((0x00, 0x5E)), Tag::LOGIN_DATA);
        assert_eq!(Tag::from((0xC1, 0x00)), Tag(0xC100));
    }

    #[test]
    fn crt_selector_roundtrip() {
        assert_eq!(KeySlot::from_crt_selector(0xB6), Some(KeySlot::DigitalSignature));
        assert_eq!(KeySlot::from_crt_selector(0xB8), Some(KeySlot::Confidentiality));
        assert_eq!(KeySlot::from_crt_selector(0xA4), Some(KeySlot::Authentication));
        assert_eq!(KeySlot::from_crt_selector(0x00), None);
    }

    #[test]
    fn algorithm_id_roundtrip() {
        for algo in [AlgorithmId::Rsa, AlgorithmId::Ecdsa, AlgorithmId::EdDsa, AlgorithmId::Ecdh] {
            assert_eq!(AlgorithmId::from_byte(algo.to_byte()).unwrap(), algo);
        }
        assert!(AlgorithmId::from_byte(0xFF).is_err());
    }
}
