//! The security state machine: password verification, the three
//! independently-tracked verified flags, the DS counter, and the
//! access-control checks PutData and PSO:CDS consult.
//!
//! No `security.h`/`.cpp` survived into `original_source`'s retained
//! file set; this module is built from the call sites in
//! `userapdu.cpp` (`VerifyPasswd`, `SetPasswd`, `ClearAuth`, `GetAuth`,
//! `PasswdTryRemains`, `PWIsEmpty`, `DataObjectInAllowedList`) and
//! `cryptoapdu.cpp` (`GetAuth(PSOCDS)`, `ClearAuth(PSOCDS)`,
//! `IncDSCounter()`), plus the standard's password-verification
//! algorithm (OpenPGP Card v3.3.1 §4.3).

pub mod kdf;
pub mod pw_status;

pub use kdf::KdfDo;
pub use pw_status::PwStatusBytes;

use log::warn;

use crate::crypto::backend::Backend;
use crate::crypto::mem::{secure_cmp, Protected};
use crate::fs::FileSystem;
use crate::types::{AppId, KeySlot, PasswordId, Region, Tag};
use crate::{Error, Result};

/// Factory-default PW1, used until the host changes it for the first
/// time (OpenPGP Card v3.3.1 §4.3.1).
const DEFAULT_PW1: &[u8] = b"123456";
/// Factory-default PW3.
const DEFAULT_PW3: &[u8] = b"12345678";

/// Data objects a restricted host may still write via PutData even
/// when [`SecurityConfig::restrict_puts`] is set.
const ALLOWED_PUT_TAGS: &[Tag] = &[
    Tag::NAME,
    Tag::LOGIN_DATA,
    Tag::LANGUAGE,
    Tag::SEX,
    Tag::CARDHOLDER_CERTIFICATE,
    Tag::ALGO_ATTR_SIG,
    Tag::ALGO_ATTR_DEC,
    Tag::ALGO_ATTR_AUT,
    Tag::AES_KEY,
    Tag::KDF_DO,
    Tag::PRIVATE_USE_1,
    Tag::PRIVATE_USE_2,
    Tag::PRIVATE_USE_3,
    Tag::PRIVATE_USE_4,
];

/// Deployment-time policy knobs that don't belong in the persistent
/// PW Status Bytes record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SecurityConfig {
    /// When set, PutData only accepts tags in [`ALLOWED_PUT_TAGS`];
    /// mirrors `original_source`'s compile-time
    /// `ReadWriteOnlyAllowedFiles` gate, exposed here as a runtime
    /// policy instead.
    pub restrict_puts: bool,
}

/// The volatile security state for the current card session: which of
/// the three password contexts are currently verified.
///
/// Reset to all-false on power-up/deselect; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Security {
    pw1_cds_verified: bool,
    pw1_verified: bool,
    pw3_verified: bool,
    /// Deployment policy in force for this session.
    pub config: SecurityConfig,
}

impl Security {
    /// A freshly reset session: no context verified.
    pub fn new(config: SecurityConfig) -> Self {
        Security { config, ..Default::default() }
    }

    /// Verifies `data` against the stored verifier for `id`.
    ///
    /// In strict mode (ChangeReferenceData, ResetRetryCounter) only a
    /// prefix of `data` is the old/resetting credential; the returned
    /// length tells the caller where the new password begins. In
    /// non-strict mode (Verify) `data` must be exactly the credential
    /// and the returned length can be ignored.
    pub fn verify_passwd(
        &mut self,
        fs: &mut dyn FileSystem,
        backend: &dyn Backend,
        app: AppId,
        id: PasswordId,
        data: &[u8],
        strict: bool,
    ) -> Result<usize> {
        let mut status = PwStatusBytes::load(fs, app)?;
        if status.passwd_try_remains(id) == 0 {
            return Err(Error::PasswordLocked);
        }

        let kdf = self.kdf_do(fs, app)?;
        let stored = fs.read_file(app, verifier_tag(id), Region::Secure)?;
        let effective_stored = if stored.is_empty() {
            match id {
                PasswordId::Pw1Cds | PasswordId::Pw1 => DEFAULT_PW1.to_vec(),
                PasswordId::Pw3 => DEFAULT_PW3.to_vec(),
                PasswordId::Rc => return Err(Error::ConditionsNotSatisfied),
            }
        } else {
            stored
        };

        let consumed = if kdf.is_active() {
            hash_output_len(kdf.hash_algorithm_enum())
        } else {
            effective_stored.len()
        };
        if data.len() < consumed {
            return Err(Error::WrongApduDataLength);
        }
        if !strict && data.len() != consumed {
            return Err(Error::WrongApduDataLength);
        }
        let candidate = &data[..consumed];

        let candidate_verifier: Protected = if kdf.is_active() {
            kdf.derive(backend, id, candidate)?
        } else {
            candidate.into()
        };

        if !secure_cmp(&candidate_verifier, &effective_stored) {
            status.dec_error_counter(id);
            status.save(fs, app)?;
            self.clear_auth(id);
            let remaining_tries = status.passwd_try_remains(id);
            if remaining_tries == 0 {
                warn!("{id:?} locked after repeated failed verification attempts");
            } else {
                warn!("{id:?} verification failed, {remaining_tries} tries remaining");
            }
            return Err(Error::WrongPassword { remaining_tries });
        }

        status.reset_error_counter(id);
        status.save(fs, app)?;
        match id {
            PasswordId::Pw1Cds => self.pw1_cds_verified = true,
            PasswordId::Pw1 => self.pw1_verified = true,
            PasswordId::Pw3 => self.pw3_verified = true,
            PasswordId::Rc => {}
        }
        Ok(consumed)
    }

    /// Sets a new verifier for `id`, hashing it through the active
    /// KDF-DO first if one is configured.
    pub fn set_passwd(
        &self,
        fs: &mut dyn FileSystem,
        backend: &dyn Backend,
        app: AppId,
        id: PasswordId,
        new_plain: &[u8],
    ) -> Result<()> {
        let mut status = PwStatusBytes::load(fs, app)?;
        if new_plain.len() > status.max_length(id) {
            return Err(Error::WrongApduDataLength);
        }
        let kdf = self.kdf_do(fs, app)?;
        let verifier: Protected = if kdf.is_active() {
            kdf.derive(backend, id, new_plain)?
        } else {
            new_plain.into()
        };
        fs.write_file(app, verifier_tag(id), Region::Secure, &verifier)?;
        status.reset_error_counter(id);
        status.save(fs, app)
    }

    /// Clears the verified flag for `id` (a no-op for RC, which has
    /// none).
    pub fn clear_auth(&mut self, id: PasswordId) {
        match id {
            PasswordId::Pw1Cds => self.pw1_cds_verified = false,
            PasswordId::Pw1 => self.pw1_verified = false,
            PasswordId::Pw3 => self.pw3_verified = false,
            PasswordId::Rc => {}
        }
    }

    /// Whether `id` is currently verified for this session.
    pub fn get_auth(&self, id: PasswordId) -> bool {
        match id {
            PasswordId::Pw1Cds => self.pw1_cds_verified,
            PasswordId::Pw1 => self.pw1_verified,
            PasswordId::Pw3 => self.pw3_verified,
            PasswordId::Rc => false,
        }
    }

    /// Tries remaining for `id` before it locks.
    pub fn passwd_try_remains(&self, fs: &dyn FileSystem, app: AppId, id: PasswordId) -> Result<u8> {
        Ok(PwStatusBytes::load(fs, app)?.passwd_try_remains(id))
    }

    /// Whether `id` has never had a verifier set (RC starts this way;
    /// PW1/PW3 read back the factory default but are not "empty").
    pub fn pw_is_empty(&self, fs: &dyn FileSystem, app: AppId, id: PasswordId) -> Result<bool> {
        Ok(fs.read_file(app, verifier_tag(id), Region::Secure)?.is_empty())
    }

    /// Increments the digital-signature counter, wrapping a 24-bit
    /// rollover back to zero.
    pub fn inc_ds_counter(&self, fs: &mut dyn FileSystem, app: AppId) -> Result<()> {
        let current = self.get_ds_counter(fs, app)?;
        let next = if current >= 0x00FF_FFFF { 0 } else { current + 1 };
        fs.write_file(app, Tag::DS_COUNTER, Region::File, &next.to_be_bytes()[1..])
    }

    /// Reads the current 24-bit digital-signature counter.
    pub fn get_ds_counter(&self, fs: &dyn FileSystem, app: AppId) -> Result<u32> {
        let data = fs.read_file(app, Tag::DS_COUNTER, Region::File)?;
        if data.is_empty() {
            return Ok(0);
        }
        if data.len() != 3 {
            return Err(Error::StoredKeyParamsError);
        }
        Ok(u32::from_be_bytes([0, data[0], data[1], data[2]]))
    }

    /// Enforces [`SecurityConfig::restrict_puts`] against `tag`.
    pub fn data_object_in_allowed_list(&self, tag: Tag) -> Result<()> {
        if !self.config.restrict_puts || ALLOWED_PUT_TAGS.contains(&tag) {
            Ok(())
        } else {
            Err(Error::AccessDenied)
        }
    }

    /// Whether `tag` must be written to [`Region::Secure`].
    pub fn data_object_in_secure_area(&self, tag: Tag) -> bool {
        tag.is_secure()
    }

    /// Side effects to run after a PutData write to `tag` completes:
    /// changing a slot's algorithm attributes invalidates whatever key
    /// material was generated under the old attributes.
    pub fn after_save_file_logic(&self, fs: &mut dyn FileSystem, app: AppId, tag: Tag) -> Result<()> {
        if let Some(slot) = slot_for_algo_attr_tag(tag) {
            crate::key::KeyStorage::new().delete_key(fs, app, slot)?;
        }
        Ok(())
    }

    fn kdf_do(&self, fs: &dyn FileSystem, app: AppId) -> Result<KdfDo> {
        let data = fs.read_file(app, Tag::KDF_DO, Region::Secure)?;
        KdfDo::decode(&data)
    }
}

fn slot_for_algo_attr_tag(tag: Tag) -> Option<KeySlot> {
    match tag {
        Tag::ALGO_ATTR_SIG => Some(KeySlot::DigitalSignature),
        Tag::ALGO_ATTR_DEC => Some(KeySlot::Confidentiality),
        Tag::ALGO_ATTR_AUT => Some(KeySlot::Authentication),
        _ => None,
    }
}

fn verifier_tag(id: PasswordId) -> Tag {
    // Above the 7F49 ceiling of the addressable GetData/PutData tag
    // space, same convention as `crate::key`'s private-key tags.
    let code: u16 = match id {
        PasswordId::Pw1Cds | PasswordId::Pw1 => 0x82,
        PasswordId::Pw3 => 0x83,
        PasswordId::Rc => 0x84,
    };
    Tag(0x9000 | code)
}

fn hash_output_len(algo: crate::crypto::backend::HashAlgorithm) -> usize {
    match algo {
        crate::crypto::backend::HashAlgorithm::Sha256 => 32,
        crate::crypto::backend::HashAlgorithm::Sha512 => 64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::backend::soft::SoftBackend;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn factory_default_pw1_verifies() {
        let mut fs = MemoryFileSystem::new();
        let backend = SoftBackend;
        let mut security = Security::new(SecurityConfig::default());
        security
            .verify_passwd(&mut fs, &backend, AppId::OpenPgp, PasswordId::Pw1, DEFAULT_PW1, false)
            .unwrap();
        assert!(security.get_auth(PasswordId::Pw1));
    }

    #[test]
    fn wrong_password_decrements_counter_and_denies_auth() {
        let mut fs = MemoryFileSystem::new();
        let backend = SoftBackend;
        let mut security = Security::new(SecurityConfig::default());
        let err = security
            .verify_passwd(&mut fs, &backend, AppId::OpenPgp, PasswordId::Pw1, b"000000", false)
            .unwrap_err();
        assert_eq!(err, Error::WrongPassword { remaining_tries: 2 });
        assert!(!security.get_auth(PasswordId::Pw1));
    }

    #[test]
    fn three_failures_lock_the_context() {
        let mut fs = MemoryFileSystem::new();
        let backend = SoftBackend;
        let mut security = Security::new(SecurityConfig::default());
        for _ in 0..3 {
            let _ = security.verify_passwd(
                &mut fs,
                &backend,
                AppId::OpenPgp,
                PasswordId::Pw3,
                b"wrong",
                false,
            );
        }
        let err = security
            .verify_passwd(&mut fs, &backend, AppId::OpenPgp, PasswordId::Pw3, DEFAULT_PW3, false)
            .unwrap_err();
        assert_eq!(err, Error::PasswordLocked);
    }

    #[test]
    fn set_passwd_resets_counter_and_changes_verifier() {
        let mut fs = MemoryFileSystem::new();
        let backend = SoftBackend;
        let mut security = Security::new(SecurityConfig::default());
        let _ = security.verify_passwd(
            &mut fs,
            &backend,
            AppId::OpenPgp,
            PasswordId::Pw1,
            b"wrong1",
            false,
        );
        security
            .set_passwd(&mut fs, &backend, AppId::OpenPgp, PasswordId::Pw1, b"654321")
            .unwrap();
        assert_eq!(security.passwd_try_remains(&fs, AppId::OpenPgp, PasswordId::Pw1).unwrap(), 3);

        security
            .verify_passwd(&mut fs, &backend, AppId::OpenPgp, PasswordId::Pw1, b"654321", false)
            .unwrap();
        assert!(security.get_auth(PasswordId::Pw1));
    }

    #[test]
    fn strict_verify_returns_consumed_length_for_old_credential() {
        let mut fs = MemoryFileSystem::new();
        let backend = SoftBackend;
        let mut security = Security::new(SecurityConfig::default());
        let mut combined = DEFAULT_PW3.to_vec();
        combined.extend_from_slice(b"newpw3pass");
        let consumed = security
            .verify_passwd(&mut fs, &backend, AppId::OpenPgp, PasswordId::Pw3, &combined, true)
            .unwrap();
        assert_eq!(consumed, DEFAULT_PW3.len());
        assert_eq!(&combined[consumed..], b"newpw3pass");
    }

    #[test]
    fn rc_with_no_verifier_is_conditions_not_satisfied() {
        let mut fs = MemoryFileSystem::new();
        let backend = SoftBackend;
        let mut security = Security::new(SecurityConfig::default());
        let err = security
            .verify_passwd(&mut fs, &backend, AppId::OpenPgp, PasswordId::Rc, b"123456", true)
            .unwrap_err();
        assert_eq!(err, Error::ConditionsNotSatisfied);
        assert!(security.pw_is_empty(&fs, AppId::OpenPgp, PasswordId::Rc).unwrap());
    }

    #[test]
    fn ds_counter_increments_and_survives_reload() {
        let mut fs = MemoryFileSystem::new();
        let security = Security::new(SecurityConfig::default());
        assert_eq!(security.get_ds_counter(&fs, AppId::OpenPgp).unwrap(), 0);
        security.inc_ds_counter(&mut fs, AppId::OpenPgp).unwrap();
        security.inc_ds_counter(&mut fs, AppId::OpenPgp).unwrap();
        assert_eq!(security.get_ds_counter(&fs, AppId::OpenPgp).unwrap(), 2);
    }

    #[test]
    fn restricted_puts_reject_unlisted_tags() {
        let security = Security::new(SecurityConfig { restrict_puts: true });
        assert!(security.data_object_in_allowed_list(Tag::LOGIN_DATA).is_ok());
        assert!(security.data_object_in_allowed_list(Tag::DS_COUNTER).is_err());
    }

    #[test]
    fn changing_algo_attrs_deletes_existing_key() {
        use crate::crypto::backend::{EcCurve, EcKeyPair, EcPrivateKey};
        use crate::key::KeyStorage;
        use crate::types::KeySlot;

        let mut fs = MemoryFileSystem::new();
        let storage = KeyStorage::new();
        let pair = EcKeyPair {
            private: EcPrivateKey { curve: EcCurve::NistP256, scalar: vec![1u8; 32].into() },
            public: vec![4u8; 65],
        };
        storage
            .put_ec_full_key(
                &mut fs,
                AppId::OpenPgp,
                KeySlot::Authentication,
                crate::algo::Curve::NistP256,
                &pair,
            )
            .unwrap();
        assert!(storage.has_key(&fs, AppId::OpenPgp, KeySlot::Authentication).unwrap());

        let security = Security::new(SecurityConfig::default());
        security
            .after_save_file_logic(&mut fs, AppId::OpenPgp, Tag::ALGO_ATTR_AUT)
            .unwrap();
        assert!(!storage.has_key(&fs, AppId::OpenPgp, KeySlot::Authentication).unwrap());
    }

    quickcheck::quickcheck! {
        // The DS counter strictly counts PSO:CDS operations: `n`
        // increments from a freshly reset store always read back as
        // exactly `n` (well below the 24-bit rollover any `u8` count
        // can reach).
        fn ds_counter_counts_increments(count: u8) -> bool {
            let mut fs = MemoryFileSystem::new();
            let security = Security::new(SecurityConfig::default());
            for _ in 0..count {
                if security.inc_ds_counter(&mut fs, AppId::OpenPgp).is_err() {
                    return false;
                }
            }
            security.get_ds_counter(&fs, AppId::OpenPgp).unwrap() == count as u32
        }
    }
}
