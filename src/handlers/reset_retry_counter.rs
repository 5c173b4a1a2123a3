//! RESET RETRY COUNTER (INS=0x2C): replaces PW1 via either the
//! resetting code (P1=0x00) or an authenticated PW3 session (P1=0x02).
//!
//! Grounded on `APDUResetRetryCounter::Check`/`Process` in
//! `original_source`'s `userapdu.cpp`. On success PW1 (and PW1-CDS) auth
//! is always cleared; if PW3 has never had a verifier set, PW3 auth is
//! cleared too (the uninitialized-admin-password case).

use super::Handler;
use crate::services::Services;
use crate::types::PasswordId;
use crate::{Error, Result};

/// Handles RESET RETRY COUNTER.
pub struct ResetRetryCounter;

impl Handler for ResetRetryCounter {
    fn check(&self, cla: u8, p1: u8, p2: u8, _lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        if p1 != 0x00 && p1 != 0x02 {
            return Err(Error::WrongApduP1P2);
        }
        if p2 != 0x81 {
            return Err(Error::WrongApduP1P2);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, p1: u8, _p2: u8, data: &[u8], _le: usize) -> Result<Vec<u8>> {
        let app = services.selected_app()?;

        let new_pw1: Vec<u8> = if p1 == 0x02 {
            if !services.security.get_auth(PasswordId::Pw3) {
                return Err(Error::AccessDenied);
            }
            data.to_vec()
        } else {
            let consumed = services.security.verify_passwd(
                services.fs.as_mut(),
                services.backend.as_ref(),
                app,
                PasswordId::Rc,
                data,
                true,
            )?;
            data[consumed..].to_vec()
        };
        if new_pw1.is_empty() {
            return Err(Error::WrongApduDataLength);
        }

        services.security.set_passwd(
            services.fs.as_mut(),
            services.backend.as_ref(),
            app,
            PasswordId::Pw1,
            &new_pw1,
        )?;
        services.security.clear_auth(PasswordId::Pw1);
        services.security.clear_auth(PasswordId::Pw1Cds);
        if services.security.pw_is_empty(services.fs.as_ref(), app, PasswordId::Pw3)? {
            services.security.clear_auth(PasswordId::Pw3);
        }
        Ok(Vec::new())
    }
}

#[cfg(all(test, feature = "backend-soft"))]
mod tests {
    use super::*;
    use crate::crypto::backend::soft::SoftBackend;
    use crate::fs::MemoryFileSystem;
    use crate::security::SecurityConfig;
    use crate::types::AppId;

    fn selected_services() -> Services {
        let mut s = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        s.selected = Some(AppId::OpenPgp);
        s
    }

    #[test]
    fn via_pw3_session_sets_new_pw1() {
        let mut services = selected_services();
        super::super::verify::Verify
            .process(&mut services, 0x00, 0x83, b"12345678", 0)
            .unwrap();

        ResetRetryCounter.process(&mut services, 0x02, 0x81, b"000000", 0).unwrap();

        super::super::verify::Verify
            .process(&mut services, 0x00, 0x82, b"000000", 0)
            .unwrap();
        assert!(services.security.get_auth(PasswordId::Pw1));
    }

    #[test]
    fn via_pw3_session_requires_auth() {
        let mut services = selected_services();
        let err = ResetRetryCounter
            .process(&mut services, 0x02, 0x81, b"000000", 0)
            .unwrap_err();
        assert_eq!(err, Error::AccessDenied);
    }

    #[test]
    fn via_rc_requires_rc_to_be_set_first() {
        let mut services = selected_services();
        let err = ResetRetryCounter
            .process(&mut services, 0x00, 0x81, b"somerc000000", 0)
            .unwrap_err();
        assert_eq!(err, Error::ConditionsNotSatisfied);
    }

    #[test]
    fn clears_pw3_auth_when_pw3_never_had_a_verifier_set() {
        let mut services = selected_services();
        super::super::verify::Verify
            .process(&mut services, 0x00, 0x83, b"12345678", 0)
            .unwrap();
        assert!(services.security.get_auth(PasswordId::Pw3));

        ResetRetryCounter.process(&mut services, 0x02, 0x81, b"000000", 0).unwrap();
        assert!(!services.security.get_auth(PasswordId::Pw3));
    }

    #[test]
    fn keeps_pw3_auth_once_an_explicit_pw3_verifier_exists() {
        let mut services = selected_services();
        let mut combined = b"12345678".to_vec();
        combined.extend_from_slice(b"newadminpw");
        super::super::change_reference_data::ChangeReferenceData
            .process(&mut services, 0x00, 0x83, &combined, 0)
            .unwrap();
        super::super::verify::Verify
            .process(&mut services, 0x00, 0x83, b"newadminpw", 0)
            .unwrap();

        ResetRetryCounter.process(&mut services, 0x02, 0x81, b"000000", 0).unwrap();
        assert!(services.security.get_auth(PasswordId::Pw3));
    }
}
