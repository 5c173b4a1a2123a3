//! Persisted RSA/ECC key material and 7F49 public-key template
//! synthesis.
//!
//! Mirrors `Crypto::KeyStorage` in `original_source`: keys are kept
//! split by part (modulus, exponent, CRT components, or private
//! scalar/public point) and `KeyStorage` knows how to rebuild the
//! standard's public-key response template from whichever parts are
//! on file. Private key material lives in its own tag namespace,
//! distinct from and never reachable through the GetData/PutData tags
//! a host can address (§3's Data Object tags stop at the algorithm
//! attributes and public artifacts; raw scalars/CRT parts are an
//! internal-only concern of this module).

use crate::algo::{AlgorithmAttr, Curve};
use crate::crypto::backend::{EcKeyPair, EcPrivateKey, RsaKeyPair, RsaPrivateKey};
use crate::fs::FileSystem;
use crate::tlv;
use crate::types::{AlgorithmId, AppId, KeySlot, Region, Tag};
use crate::{Error, Result};

/// Component tags used inside a PutKey (INS=0xDB) extended header
/// list's private key template (OpenPGP Card v3.3.1 §4.4.3.12).
/// Matches the component tags widely used by OpenPGP card hosts (e.g.
/// GnuPG's scdaemon) rather than anything `original_source` names,
/// since its `SetKeyExtHeader` receives the template pre-parsed by the
/// caller; see `DESIGN.md`.
pub mod component_tag {
    use crate::types::Tag;

    /// RSA public exponent `e`.
    pub const RSA_E: Tag = Tag(0x91);
    /// RSA secret prime `p`.
    pub const RSA_P: Tag = Tag(0x92);
    /// RSA secret prime `q`.
    pub const RSA_Q: Tag = Tag(0x93);
    /// RSA `1/q mod p`.
    pub const RSA_QINV: Tag = Tag(0x94);
    /// RSA `d mod (p-1)`.
    pub const RSA_DP1: Tag = Tag(0x95);
    /// RSA `d mod (q-1)`.
    pub const RSA_DQ1: Tag = Tag(0x96);
    /// RSA public modulus `n`.
    pub const RSA_N: Tag = Tag(0x97);
    /// EC private scalar.
    pub const EC_PRIVATE: Tag = Tag(0x92);
    /// EC public point.
    pub const EC_PUBLIC: Tag = Tag(0x99);
}

/// The private key material held for one key slot, reconstructed
/// from storage.
pub enum PrivateKeyMaterial {
    /// An RSA private key in CRT form.
    Rsa(RsaPrivateKey),
    /// An ECDSA/EdDSA/ECDH private scalar, tagged with its curve.
    Ec(EcPrivateKey),
}

/// Key storage: persists full keypairs and synthesizes the 7F49
/// public-key template GenerateAsymmetricKeyPair returns.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyStorage;

impl KeyStorage {
    /// A freshly constructed, stateless key storage facade; all state
    /// lives in the file system it's given.
    pub fn new() -> Self {
        KeyStorage
    }

    /// Persists a freshly generated RSA key pair for `slot`.
    pub fn put_rsa_full_key(
        &self,
        fs: &mut dyn FileSystem,
        app: AppId,
        slot: KeySlot,
        key: &RsaKeyPair,
    ) -> Result<()> {
        let mut blob = vec![AlgorithmId::Rsa.to_byte()];
        write_chunk(&mut blob, &key.public_exponent.value());
        write_chunk(&mut blob, key.modulus.value());
        write_chunk(&mut blob, &key.private.p);
        write_chunk(&mut blob, &key.private.q);
        write_chunk(&mut blob, &key.private.q_inv);
        write_chunk(&mut blob, &key.private.dp);
        write_chunk(&mut blob, &key.private.dq);
        fs.write_file(app, private_key_tag(slot), Region::Secure, &blob)
    }

    /// Persists a freshly generated ECDSA/EdDSA/ECDH key pair for
    /// `slot`.
    pub fn put_ec_full_key(
        &self,
        fs: &mut dyn FileSystem,
        app: AppId,
        slot: KeySlot,
        curve: Curve,
        key: &EcKeyPair,
    ) -> Result<()> {
        let algo_id = ec_algorithm_id(slot, curve);
        let mut blob = vec![algo_id.to_byte(), curve_byte(curve)];
        write_chunk(&mut blob, &key.private.scalar);
        write_chunk(&mut blob, &key.public);
        fs.write_file(app, private_key_tag(slot), Region::Secure, &blob)
    }

    /// Imports a host-supplied private key for `slot` via PutKey
    /// (INS=0xDB), per the raw components extracted from an extended
    /// header list's private key template. `attr` is the slot's
    /// current algorithm attributes, which say which components to
    /// expect; `components` is the (tag, value) list PutKey parsed out
    /// of the 5F48 concatenated key data per the 7F48 length list.
    ///
    /// Mirrors `Crypto::KeyStorage::SetKeyExtHeader` in
    /// `original_source`'s role, generalized from that function's
    /// single pre-parsed buffer to this crate's borrowed component
    /// list so the TLV walk stays in the PutKey handler.
    pub fn import_key(
        &self,
        fs: &mut dyn FileSystem,
        app: AppId,
        slot: KeySlot,
        attr: AlgorithmAttr,
        components: &[(Tag, &[u8])],
    ) -> Result<()> {
        let find = |tag: Tag| components.iter().find(|(t, _)| *t == tag).map(|(_, v)| *v);

        match attr {
            AlgorithmAttr::Rsa(_) => {
                let e = find(component_tag::RSA_E).ok_or(Error::WrongData)?;
                let n = find(component_tag::RSA_N).ok_or(Error::WrongData)?;
                let p = find(component_tag::RSA_P).ok_or(Error::WrongData)?;
                let q = find(component_tag::RSA_Q).ok_or(Error::WrongData)?;
                let q_inv = find(component_tag::RSA_QINV).ok_or(Error::WrongData)?;
                let dp = find(component_tag::RSA_DP1).ok_or(Error::WrongData)?;
                let dq = find(component_tag::RSA_DQ1).ok_or(Error::WrongData)?;

                let mut blob = vec![AlgorithmId::Rsa.to_byte()];
                write_chunk(&mut blob, e);
                write_chunk(&mut blob, n);
                write_chunk(&mut blob, p);
                write_chunk(&mut blob, q);
                write_chunk(&mut blob, q_inv);
                write_chunk(&mut blob, dp);
                write_chunk(&mut blob, dq);
                fs.write_file(app, private_key_tag(slot), Region::Secure, &blob)
            }
            AlgorithmAttr::Ec(ec_attr) | AlgorithmAttr::EdDsa(ec_attr) => {
                let scalar = find(component_tag::EC_PRIVATE).ok_or(Error::WrongData)?;
                let public = find(component_tag::EC_PUBLIC).ok_or(Error::WrongData)?;

                let algo_id = ec_algorithm_id(slot, ec_attr.curve);
                let mut blob = vec![algo_id.to_byte(), curve_byte(ec_attr.curve)];
                write_chunk(&mut blob, scalar);
                write_chunk(&mut blob, public);
                fs.write_file(app, private_key_tag(slot), Region::Secure, &blob)
            }
        }
    }

    /// Loads the private key material stored for `slot`, if a keypair
    /// has been generated there.
    pub fn load_private_key(
        &self,
        fs: &dyn FileSystem,
        app: AppId,
        slot: KeySlot,
    ) -> Result<PrivateKeyMaterial> {
        let blob = fs.read_file(app, private_key_tag(slot), Region::Secure)?;
        let (&algo_byte, rest) = blob.split_first().ok_or(Error::StoredKeyError)?;
        match AlgorithmId::from_byte(algo_byte)? {
            AlgorithmId::Rsa => {
                let (_e, rest) = read_chunk(rest)?;
                let (_n, rest) = read_chunk(rest)?;
                let (p, rest) = read_chunk(rest)?;
                let (q, rest) = read_chunk(rest)?;
                let (q_inv, rest) = read_chunk(rest)?;
                let (dp, rest) = read_chunk(rest)?;
                let (dq, _rest) = read_chunk(rest)?;
                Ok(PrivateKeyMaterial::Rsa(RsaPrivateKey {
                    p: p.into(),
                    q: q.into(),
                    q_inv: q_inv.into(),
                    dp: dp.into(),
                    dq: dq.into(),
                }))
            }
            AlgorithmId::Ecdsa | AlgorithmId::EdDsa | AlgorithmId::Ecdh => {
                let (&curve_b, rest) = rest.split_first().ok_or(Error::StoredKeyError)?;
                let curve = curve_from_byte(curve_b)?;
                let (scalar, _rest) = read_chunk(rest)?;
                Ok(PrivateKeyMaterial::Ec(EcPrivateKey {
                    curve: curve.backend_curve(),
                    scalar: scalar.into(),
                }))
            }
        }
    }

    /// Whether `slot` currently holds any generated key material.
    pub fn has_key(&self, fs: &dyn FileSystem, app: AppId, slot: KeySlot) -> Result<bool> {
        Ok(!fs.read_file(app, private_key_tag(slot), Region::Secure)?.is_empty())
    }

    /// Deletes whatever key material is stored for `slot`, if any.
    /// Called when a slot's algorithm attributes change, since key
    /// material generated under the old attributes can no longer be
    /// interpreted correctly.
    pub fn delete_key(&self, fs: &mut dyn FileSystem, app: AppId, slot: KeySlot) -> Result<()> {
        fs.delete_file(app, private_key_tag(slot), Region::Secure)
    }

    /// Builds the 7F49 public-key template for `slot`, from whatever
    /// key material is currently on file (OpenPGP Card v3.3.1 §7.2.10:
    /// tag 0x81 modulus / 0x82 exponent for RSA, tag 0x86 for the
    /// uncompressed EC point).
    pub fn get_public_key_7f49(
        &self,
        fs: &dyn FileSystem,
        app: AppId,
        slot: KeySlot,
    ) -> Result<Vec<u8>> {
        let blob = fs.read_file(app, private_key_tag(slot), Region::Secure)?;
        let (&algo_byte, rest) = blob.split_first().ok_or(Error::DataNotFound)?;
        match AlgorithmId::from_byte(algo_byte)? {
            AlgorithmId::Rsa => {
                let (e, rest) = read_chunk(rest)?;
                let (n, _rest) = read_chunk(rest)?;
                let children = vec![tlv::encode(Tag(0x82), e), tlv::encode(Tag(0x81), n)];
                Ok(tlv::encode_constructed(Tag::PUBLIC_KEY_TEMPLATE, &children))
            }
            AlgorithmId::Ecdsa | AlgorithmId::EdDsa | AlgorithmId::Ecdh => {
                let (_curve_b, rest) = rest.split_first().ok_or(Error::DataNotFound)?;
                let (_scalar, rest) = read_chunk(rest)?;
                let (public, _rest) = read_chunk(rest)?;
                let children = vec![tlv::encode(Tag(0x86), public)];
                Ok(tlv::encode_constructed(Tag::PUBLIC_KEY_TEMPLATE, &children))
            }
        }
    }
}

fn ec_algorithm_id(slot: KeySlot, curve: Curve) -> AlgorithmId {
    if curve == Curve::Cv25519 {
        AlgorithmId::Ecdh
    } else if matches!(slot, KeySlot::DigitalSignature | KeySlot::Authentication) && curve == Curve::Ed25519 {
        AlgorithmId::EdDsa
    } else {
        AlgorithmId::Ecdsa
    }
}

fn private_key_tag(slot: KeySlot) -> Tag {
    // Offset well above any standard DO tag (the largest, 0x7F49, is
    // `0x7F49`) so this internal namespace can never alias a tag the
    // host addresses through GetData/PutData.
    Tag(0x8000 | slot.tag().0)
}

fn curve_byte(curve: Curve) -> u8 {
    match curve {
        Curve::NistP256 => 0x01,
        Curve::Ed25519 => 0x02,
        Curve::Cv25519 => 0x03,
    }
}

fn curve_from_byte(b: u8) -> Result<Curve> {
    match b {
        0x01 => Ok(Curve::NistP256),
        0x02 => Ok(Curve::Ed25519),
        0x03 => Ok(Curve::Cv25519),
        _ => Err(Error::StoredKeyError),
    }
}

fn write_chunk(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
}

fn read_chunk(data: &[u8]) -> Result<(&[u8], &[u8])> {
    if data.len() < 2 {
        return Err(Error::StoredKeyError);
    }
    let len = u16::from_be_bytes([data[0], data[1]]) as usize;
    let rest = &data[2..];
    if rest.len() < len {
        return Err(Error::StoredKeyError);
    }
    Ok(rest.split_at(len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mpi::Mpi;
    use crate::fs::MemoryFileSystem;

    fn sample_rsa_pair() -> RsaKeyPair {
        RsaKeyPair {
            private: RsaPrivateKey {
                p: vec![0x11; 16].into(),
                q: vec![0x22; 16].into(),
                q_inv: vec![0x33; 16].into(),
                dp: vec![0x44; 16].into(),
                dq: vec![0x55; 16].into(),
            },
            modulus: Mpi::new(&[0x01; 32]),
            public_exponent: Mpi::new(&[0x01, 0x00, 0x01]),
        }
    }

    #[test]
    fn rsa_key_roundtrips_through_storage() {
        let mut fs = MemoryFileSystem::new();
        let storage = KeyStorage::new();
        let pair = sample_rsa_pair();
        storage
            .put_rsa_full_key(&mut fs, AppId::OpenPgp, KeySlot::DigitalSignature, &pair)
            .unwrap();

        assert!(storage.has_key(&fs, AppId::OpenPgp, KeySlot::DigitalSignature).unwrap());

        let loaded = storage
            .load_private_key(&fs, AppId::OpenPgp, KeySlot::DigitalSignature)
            .unwrap();
        match loaded {
            PrivateKeyMaterial::Rsa(k) => {
                assert_eq!(&*k.p, &*pair.private.p);
                assert_eq!(&*k.dq, &*pair.private.dq);
            }
            PrivateKeyMaterial::Ec(_) => panic!("expected RSA key"),
        }
    }

    #[test]
    fn rsa_public_key_template_has_modulus_and_exponent() {
        let mut fs = MemoryFileSystem::new();
        let storage = KeyStorage::new();
        let pair = sample_rsa_pair();
        storage
            .put_rsa_full_key(&mut fs, AppId::OpenPgp, KeySlot::DigitalSignature, &pair)
            .unwrap();

        let template = storage
            .get_public_key_7f49(&fs, AppId::OpenPgp, KeySlot::DigitalSignature)
            .unwrap();
        let (elem, _) = tlv::parse_one(&template).unwrap();
        assert_eq!(elem.tag, Tag::PUBLIC_KEY_TEMPLATE);
        assert!(tlv::find_tag(elem.value, Tag(0x81)).is_some());
        assert!(tlv::find_tag(elem.value, Tag(0x82)).is_some());
    }

    #[test]
    fn import_rsa_key_then_read_public_template() {
        let mut fs = MemoryFileSystem::new();
        let storage = KeyStorage::new();
        let attr = crate::algo::default_rsa2048();
        let components: Vec<(Tag, &[u8])> = vec![
            (component_tag::RSA_E, &[0x01, 0x00, 0x01]),
            (component_tag::RSA_N, &[0xAA; 32]),
            (component_tag::RSA_P, &[0x11; 16]),
            (component_tag::RSA_Q, &[0x22; 16]),
            (component_tag::RSA_QINV, &[0x33; 16]),
            (component_tag::RSA_DP1, &[0x44; 16]),
            (component_tag::RSA_DQ1, &[0x55; 16]),
        ];
        storage
            .import_key(&mut fs, AppId::OpenPgp, KeySlot::Authentication, attr, &components)
            .unwrap();

        assert!(storage.has_key(&fs, AppId::OpenPgp, KeySlot::Authentication).unwrap());
        let template = storage
            .get_public_key_7f49(&fs, AppId::OpenPgp, KeySlot::Authentication)
            .unwrap();
        assert_eq!(tlv::find_tag(&template, Tag(0x81)).unwrap(), &[0xAA; 32][..]);
        assert_eq!(tlv::find_tag(&template, Tag(0x82)).unwrap(), &[0x01, 0x00, 0x01][..]);
    }

    #[test]
    fn import_rsa_key_missing_component_is_wrong_data() {
        let mut fs = MemoryFileSystem::new();
        let storage = KeyStorage::new();
        let attr = crate::algo::default_rsa2048();
        let components: Vec<(Tag, &[u8])> = vec![(component_tag::RSA_E, &[0x01, 0x00, 0x01])];
        let err = storage
            .import_key(&mut fs, AppId::OpenPgp, KeySlot::Authentication, attr, &components)
            .unwrap_err();
        assert_eq!(err, Error::WrongData);
    }

    #[test]
    fn import_ec_key_then_read_public_point() {
        use crate::algo::{AlgorithmAttr, Curve, EcAttr};

        let mut fs = MemoryFileSystem::new();
        let storage = KeyStorage::new();
        let attr = AlgorithmAttr::Ec(EcAttr { curve: Curve::NistP256, key_format: 0xFF });
        let public = [0x04u8; 65];
        let components: Vec<(Tag, &[u8])> = vec![
            (component_tag::EC_PRIVATE, &[0x09; 32]),
            (component_tag::EC_PUBLIC, &public),
        ];
        storage
            .import_key(&mut fs, AppId::OpenPgp, KeySlot::Authentication, attr, &components)
            .unwrap();

        let template = storage
            .get_public_key_7f49(&fs, AppId::OpenPgp, KeySlot::Authentication)
            .unwrap();
        assert_eq!(tlv::find_tag(&template, Tag(0x86)).unwrap(), &public[..]);
    }

    #[test]
    fn missing_key_is_data_not_found() {
        let fs = MemoryFileSystem::new();
        let storage = KeyStorage::new();
        assert!(storage
            .get_public_key_7f49(&fs, AppId::OpenPgp, KeySlot::Confidentiality)
            .is_err());
    }

    #[test]
    fn ec_key_roundtrips_through_storage() {
        let mut fs = MemoryFileSystem::new();
        let storage = KeyStorage::new();
        let pair = EcKeyPair {
            private: EcPrivateKey {
                curve: crate::crypto::backend::EcCurve::NistP256,
                scalar: vec![0x09; 32].into(),
            },
            public: vec![0x04; 65],
        };
        storage
            .put_ec_full_key(&mut fs, AppId::OpenPgp, KeySlot::Authentication, Curve::NistP256, &pair)
            .unwrap();

        let template = storage
            .get_public_key_7f49(&fs, AppId::OpenPgp, KeySlot::Authentication)
            .unwrap();
        let (elem, _) = tlv::parse_one(&template).unwrap();
        assert_eq!(tlv::find_tag(elem.value, Tag(0x86)).unwrap(), &pair.public[..]);
    }
}
