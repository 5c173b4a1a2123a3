//! INTERNAL AUTHENTICATE (INS=0x88): signs host-supplied challenge
//! data with the authentication key slot.
//!
//! Grounded on `APDUInternalAuthenticate::Check`/`Process` in
//! `original_source`'s `cryptoapdu.cpp`: requires PW1 verified for the
//! "other" context (P2=0x82), then dispatches RSA vs. EC signing from
//! the slot's stored algorithm attributes.

use super::Handler;
use crate::services::Services;
use crate::types::{KeySlot, PasswordId};
use crate::{Error, Result};

/// Handles INTERNAL AUTHENTICATE.
pub struct InternalAuthenticate;

impl Handler for InternalAuthenticate {
    fn check(&self, cla: u8, p1: u8, p2: u8, lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        if p1 != 0x00 || p2 != 0x00 {
            return Err(Error::WrongApduP1P2);
        }
        if lc == 0 {
            return Err(Error::WrongApduDataLength);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, _p1: u8, _p2: u8, data: &[u8], _le: usize) -> Result<Vec<u8>> {
        let app = services.selected_app()?;
        if !services.security.get_auth(PasswordId::Pw1) {
            return Err(Error::AccessDenied);
        }
        let key = services.keys.load_private_key(services.fs.as_ref(), app, KeySlot::Authentication)?;
        services.crypto().sign(&key, data)
    }
}

#[cfg(all(test, feature = "backend-soft"))]
mod tests {
    use super::*;
    use crate::crypto::backend::soft::SoftBackend;
    use crate::fs::MemoryFileSystem;
    use crate::security::SecurityConfig;
    use crate::types::AppId;

    #[test]
    fn requires_pw1() {
        let mut services = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        services.selected = Some(AppId::OpenPgp);
        let err = InternalAuthenticate.process(&mut services, 0x00, 0x00, b"challenge", 0).unwrap_err();
        assert_eq!(err, Error::AccessDenied);
    }

    #[test]
    fn signs_with_authentication_key() {
        let mut services = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        services.selected = Some(AppId::OpenPgp);
        super::super::verify::Verify.process(&mut services, 0x00, 0x82, b"123456", 0).unwrap();

        let pair = services.crypto().generate_ec_key(crate::crypto::backend::EcCurve::NistP256).unwrap();
        services.keys.put_ec_full_key(
            services.fs.as_mut(),
            AppId::OpenPgp,
            KeySlot::Authentication,
            crate::algo::Curve::NistP256,
            &pair,
        ).unwrap();

        let sig = InternalAuthenticate.process(&mut services, 0x00, 0x00, &[0x11; 32], 0).unwrap();
        assert_eq!(sig.len(), 64);
    }
}
