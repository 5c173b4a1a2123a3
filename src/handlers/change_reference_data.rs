//! CHANGE REFERENCE DATA (INS=0x24): replaces PW1 or PW3 with a
//! host-supplied new value, after verifying the current one.
//!
//! Grounded on `APDUChangeReferenceData::Check`/`Process` in
//! `original_source`'s `userapdu.cpp`: the data field is the old
//! credential immediately followed by the new one, with no separator;
//! strict verification of the old credential reports how many leading
//! bytes it consumed so the remainder can be taken as the new value.

use super::Handler;
use crate::services::Services;
use crate::types::PasswordId;
use crate::{Error, Result};

/// Handles CHANGE REFERENCE DATA.
pub struct ChangeReferenceData;

impl Handler for ChangeReferenceData {
    fn check(&self, cla: u8, p1: u8, p2: u8, _lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        if p1 != 0x00 {
            return Err(Error::WrongApduP1P2);
        }
        if p2 != 0x81 && p2 != 0x83 {
            return Err(Error::WrongApduP1P2);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, _p1: u8, p2: u8, data: &[u8], _le: usize) -> Result<Vec<u8>> {
        let id = PasswordId::from_p2(p2).ok_or(Error::WrongApduP1P2)?;
        let app = services.selected_app()?;

        let consumed = services.security.verify_passwd(
            services.fs.as_mut(),
            services.backend.as_ref(),
            app,
            id,
            data,
            true,
        )?;
        let new_password = &data[consumed..];
        if new_password.is_empty() {
            return Err(Error::WrongApduDataLength);
        }
        services.security.set_passwd(
            services.fs.as_mut(),
            services.backend.as_ref(),
            app,
            id,
            new_password,
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
    fn changes_pw3_from_factory_default() {
        let mut services = selected_services();
        let mut combined = b"12345678".to_vec();
        combined.extend_from_slice(b"newadminpw");
        ChangeReferenceData.process(&mut services, 0x00, 0x83, &combined, 0).unwrap();

        let err = super::super::verify::Verify
            .process(&mut services, 0x00, 0x83, b"12345678", 0)
            .unwrap_err();
        assert!(matches!(err, Error::WrongPassword { .. }));

        super::super::verify::Verify
            .process(&mut services, 0x00, 0x83, b"newadminpw", 0)
            .unwrap();
        assert!(services.security.get_auth(PasswordId::Pw3));
    }

    #[test]
    fn rejects_empty_new_password() {
        let mut services = selected_services();
        let err = ChangeReferenceData
            .process(&mut services, 0x00, 0x83, b"12345678", 0)
            .unwrap_err();
        assert_eq!(err, Error::WrongApduDataLength);
    }
}
