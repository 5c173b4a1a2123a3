//! VERIFY (INS=0x20): checks, clears, or queries one of PW1-CDS, PW1,
//! or PW3.
//!
//! Grounded on `APDUVerify::Check`/`Process` in `original_source`'s
//! `userapdu.cpp`: P1=0xFF with empty data clears the context; empty
//! data otherwise queries status (already-verified succeeds silently,
//! not-yet-verified reports the remaining tries via `63CX`); non-empty
//! data attempts verification.

use super::Handler;
use crate::services::Services;
use crate::types::PasswordId;
use crate::{Error, Result};

/// Handles VERIFY.
pub struct Verify;

impl Handler for Verify {
    fn check(&self, cla: u8, p1: u8, p2: u8, _lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        if p1 != 0x00 && p1 != 0xFF {
            return Err(Error::WrongApduP1P2);
        }
        if PasswordId::from_p2(p2).is_none() {
            return Err(Error::WrongApduP1P2);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, p1: u8, p2: u8, data: &[u8], _le: usize) -> Result<Vec<u8>> {
        let id = PasswordId::from_p2(p2).ok_or(Error::WrongApduP1P2)?;
        let app = services.selected_app()?;

        if p1 == 0xFF {
            if !data.is_empty() {
                return Err(Error::WrongApduDataLength);
            }
            services.security.clear_auth(id);
            return Ok(Vec::new());
        }

        if data.is_empty() {
            if services.security.get_auth(id) {
                return Ok(Vec::new());
            }
            let remaining = services.security.passwd_try_remains(services.fs.as_ref(), app, id)?;
            return Err(Error::ErrorPutInData(0x63C0 | (remaining as u16 & 0x0F)));
        }

        services.security.verify_passwd(
            services.fs.as_mut(),
            services.backend.as_ref(),
            app,
            id,
            data,
            false,
        )?;
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
    fn wrong_then_right_pw1() {
        let mut services = selected_services();
        let handler = Verify;
        let err = handler.process(&mut services, 0x00, 0x82, b"000000", 0).unwrap_err();
        assert_eq!(err, Error::WrongPassword { remaining_tries: 2 });

        handler.process(&mut services, 0x00, 0x82, b"123456", 0).unwrap();
        assert!(services.security.get_auth(PasswordId::Pw1));
    }

    #[test]
    fn query_with_empty_data_reports_remaining_tries() {
        let mut services = selected_services();
        let handler = Verify;
        let _ = handler.process(&mut services, 0x00, 0x83, b"wrong", 0);
        let err = handler.process(&mut services, 0x00, 0x83, &[], 0).unwrap_err();
        assert_eq!(err, Error::ErrorPutInData(0x63C2));
    }

    #[test]
    fn p1_ff_clears_auth() {
        let mut services = selected_services();
        let handler = Verify;
        handler.process(&mut services, 0x00, 0x82, b"123456", 0).unwrap();
        assert!(services.security.get_auth(PasswordId::Pw1));
        handler.process(&mut services, 0xFF, 0x82, &[], 0).unwrap();
        assert!(!services.security.get_auth(PasswordId::Pw1));
    }
}
