//! PERFORM SECURITY OPERATION (INS=0x2A): compute digital signature
//! (P1P2=9E9A), decipher (P1P2=8086), or encipher (P1P2=8680).
//!
//! Grounded on `APDUPSO::Check`/`Process` in `original_source`'s
//! `cryptoapdu.cpp`. PW1-CDS auth and the signature key are checked
//! first, same as `original_source` returning `AccessDenied`/
//! `DataNotFound` ahead of `IncDSCounter()`; only once both are
//! present does the oracle-defense ordering apply: the sign attempt,
//! the single-use auth clear, and the DS counter increment all happen
//! *before* the sign attempt's own error (if any) is returned, so a
//! host can't distinguish "signing failed" from "auth was already
//! cleared" by timing or by which side effect landed.

use super::Handler;
use crate::security::pw_status::PwStatusBytes;
use crate::services::Services;
use crate::tlv;
use crate::types::{KeySlot, PasswordId, Region, Tag};
use crate::{Error, Result};

/// Handles PERFORM SECURITY OPERATION.
pub struct Pso;

impl Handler for Pso {
    fn check(&self, cla: u8, p1: u8, p2: u8, lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        match (p1, p2) {
            (0x9E, 0x9A) | (0x80, 0x86) | (0x86, 0x80) => {}
            _ => return Err(Error::WrongApduP1P2),
        }
        if lc == 0 {
            return Err(Error::WrongApduDataLength);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, p1: u8, p2: u8, data: &[u8], _le: usize) -> Result<Vec<u8>> {
        match (p1, p2) {
            (0x9E, 0x9A) => compute_digital_signature(services, data),
            (0x80, 0x86) => decipher(services, data),
            (0x86, 0x80) => encipher(services, data),
            _ => Err(Error::WrongApduP1P2),
        }
    }
}

fn compute_digital_signature(services: &mut Services, data: &[u8]) -> Result<Vec<u8>> {
    let app = services.selected_app()?;

    if !services.security.get_auth(PasswordId::Pw1Cds) {
        return Err(Error::AccessDenied);
    }
    let key = services.keys.load_private_key(services.fs.as_ref(), app, KeySlot::DigitalSignature)?;

    let attempt = services.crypto().sign(&key, data);

    let status = PwStatusBytes::load(services.fs.as_ref(), app)?;
    if !status.pw1_valid_several_cds {
        services.security.clear_auth(PasswordId::Pw1Cds);
    }
    services.security.inc_ds_counter(services.fs.as_mut(), app)?;

    attempt
}

fn decipher(services: &mut Services, data: &[u8]) -> Result<Vec<u8>> {
    let app = services.selected_app()?;
    if !services.security.get_auth(PasswordId::Pw1) {
        return Err(Error::AccessDenied);
    }
    let &mode = data.first().ok_or(Error::WrongApduDataLength)?;
    match mode {
        0x00 => {
            let key = services.keys.load_private_key(services.fs.as_ref(), app, KeySlot::Confidentiality)?;
            services.crypto().decrypt_rsa(&key, &data[1..])
        }
        0x02 => {
            let ciphertext = &data[1..];
            if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
                return Err(Error::WrongApduDataLength);
            }
            let aes_key = services.fs.read_file(app, Tag::AES_KEY, Region::Secure)?;
            if aes_key.is_empty() {
                return Err(Error::DataNotFound);
            }
            services.crypto().aes_decrypt(&aes_key.into(), ciphertext)
        }
        0xA6 => {
            let point = tlv::find_tag(data, Tag(0x86)).ok_or(Error::WrongData)?;
            let key = services.keys.load_private_key(services.fs.as_ref(), app, KeySlot::Confidentiality)?;
            Ok(services.crypto().ecdh_shared_secret(&key, point)?.to_vec())
        }
        _ => Err(Error::WrongData),
    }
}

fn encipher(services: &mut Services, data: &[u8]) -> Result<Vec<u8>> {
    let app = services.selected_app()?;
    if !services.security.get_auth(PasswordId::Pw1) {
        return Err(Error::AccessDenied);
    }
    if data.is_empty() || data.len() % 16 != 0 {
        return Err(Error::WrongApduDataLength);
    }
    let aes_key = services.fs.read_file(app, Tag::AES_KEY, Region::Secure)?;
    if aes_key.is_empty() {
        return Err(Error::DataNotFound);
    }
    let ciphertext = services.crypto().aes_encrypt(&aes_key.into(), data)?;
    let mut out = Vec::with_capacity(ciphertext.len() + 1);
    out.push(0x02);
    out.extend(ciphertext);
    Ok(out)
}

#[cfg(all(test, feature = "backend-soft"))]
mod tests {
    use super::*;
    use crate::crypto::backend::soft::SoftBackend;
    use crate::fs::MemoryFileSystem;
    use crate::security::SecurityConfig;
    use crate::types::AppId;

    fn services_with_pw1_and_pw3() -> Services {
        let mut s = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        s.selected = Some(AppId::OpenPgp);
        super::super::verify::Verify.process(&mut s, 0x00, 0x82, b"123456", 0).unwrap();
        super::super::verify::Verify.process(&mut s, 0x00, 0x83, b"12345678", 0).unwrap();
        s
    }

    #[test]
    fn cds_without_verify_is_access_denied_and_counter_unchanged() {
        let mut services = services_with_pw1_and_pw3();
        let before = services.security.get_ds_counter(services.fs.as_ref(), AppId::OpenPgp).unwrap();
        let err = Pso.process(&mut services, 0x9E, 0x9A, b"digest-bytes-32-long------------", 0).unwrap_err();
        assert_eq!(err, Error::AccessDenied);
        let after = services.security.get_ds_counter(services.fs.as_ref(), AppId::OpenPgp).unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn cds_signs_after_pw1_cds_verified() {
        let mut services = services_with_pw1_and_pw3();
        super::super::verify::Verify.process(&mut services, 0x00, 0x81, b"123456", 0).unwrap();

        let pair = services.crypto().generate_ec_key(crate::crypto::backend::EcCurve::Ed25519).unwrap();
        services.keys.put_ec_full_key(
            services.fs.as_mut(),
            AppId::OpenPgp,
            crate::types::KeySlot::DigitalSignature,
            crate::algo::Curve::Ed25519,
            &pair,
        ).unwrap();

        let sig = Pso.process(&mut services, 0x9E, 0x9A, b"message to sign", 0).unwrap();
        assert_eq!(sig.len(), 64);
        // single-use PW1-CDS: auth is cleared after one signature.
        assert!(!services.security.get_auth(PasswordId::Pw1Cds));
    }

    #[test]
    fn encipher_then_decipher_roundtrips() {
        let mut services = services_with_pw1_and_pw3();
        services.fs.write_file(AppId::OpenPgp, Tag::AES_KEY, Region::Secure, &[0x11; 16]).unwrap();

        let plaintext = [0x42u8; 32];
        let enciphered = Pso.process(&mut services, 0x86, 0x80, &plaintext, 0).unwrap();
        assert_eq!(enciphered[0], 0x02);

        let mut decipher_input = vec![0x02];
        decipher_input.extend_from_slice(&enciphered[1..]);
        let deciphered = Pso.process(&mut services, 0x80, 0x86, &decipher_input, 0).unwrap();
        assert_eq!(deciphered, plaintext);
    }
}
