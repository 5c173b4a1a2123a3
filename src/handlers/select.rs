//! SELECT (INS=0xA4): matches a host-supplied AID against the applet
//! family this crate implements and returns its FCI template.
//!
//! Grounded on the applet dispatch `original_source`'s
//! `apduexecutor.cpp` performs ahead of routing to the OpenPGP
//! application object.

use super::Handler;
use crate::applet;
use crate::services::Services;
use crate::{Error, Result};

/// Handles SELECT by AID (P1=0x04, P2=0x00).
pub struct Select;

impl Handler for Select {
    fn check(&self, cla: u8, p1: u8, p2: u8, lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        if p1 != 0x04 || p2 != 0x00 {
            return Err(Error::WrongApduP1P2);
        }
        if lc == 0 {
            return Err(Error::WrongApduDataLength);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, _p1: u8, _p2: u8, data: &[u8], _le: usize) -> Result<Vec<u8>> {
        let (app, fci) = applet::select(data)?;
        services.selected = Some(app);
        services.security = crate::security::Security::new(services.security.config);
        Ok(fci)
    }
}

#[cfg(all(test, feature = "backend-soft"))]
mod tests {
    use super::*;
    use crate::crypto::backend::soft::SoftBackend;
    use crate::fs::MemoryFileSystem;
    use crate::security::SecurityConfig;
    use crate::types::OPENPGP_AID_PREFIX;

    #[test]
    fn select_openpgp_sets_selected_app() {
        let mut services = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        let mut aid = OPENPGP_AID_PREFIX.to_vec();
        aid.extend_from_slice(&[0x03, 0x04, 0x00, 0x00, 0x00, 0x00]);
        let handler = Select;
        handler.check(0x00, 0x04, 0x00, aid.len(), 0).unwrap();
        let response = handler.process(&mut services, 0x04, 0x00, &aid, 0).unwrap();
        assert!(!response.is_empty());
        assert_eq!(services.selected, Some(crate::types::AppId::OpenPgp));
    }

    #[test]
    fn select_resets_verified_flags() {
        let mut services = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        services.security.clear_auth(crate::types::PasswordId::Pw1);
        let mut aid = OPENPGP_AID_PREFIX.to_vec();
        aid.extend_from_slice(&[0x03, 0x04, 0x00, 0x00, 0x00, 0x00]);
        Select.process(&mut services, 0x04, 0x00, &aid, 0).unwrap();
        assert!(!services.security.get_auth(crate::types::PasswordId::Pw1));
    }
}
