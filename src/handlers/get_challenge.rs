//! GET CHALLENGE (INS=0x84): returns `Le` bytes of randomness (or 255
//! if `Le` is absent/zero).
//!
//! Grounded on `APDUGetChallenge::Check`/`Process` in
//! `original_source`'s `cryptoapdu.cpp`.

use super::Handler;
use crate::services::Services;
use crate::{Error, Result};

/// Handles GET CHALLENGE.
pub struct GetChallenge;

impl Handler for GetChallenge {
    fn check(&self, cla: u8, p1: u8, p2: u8, lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        if p1 != 0x00 || p2 != 0x00 {
            return Err(Error::WrongApduP1P2);
        }
        if lc != 0 {
            return Err(Error::WrongApduDataLength);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, _p1: u8, _p2: u8, _data: &[u8], le: usize) -> Result<Vec<u8>> {
        services.selected_app()?;
        let len = if le == 0 { 255 } else { le };
        let mut buf = vec![0u8; len];
        services.crypto().random(&mut buf)?;
        Ok(buf)
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
    fn zero_le_means_255_bytes() {
        let mut services = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        services.selected = Some(AppId::OpenPgp);
        let out = GetChallenge.process(&mut services, 0x00, 0x00, &[], 0).unwrap();
        assert_eq!(out.len(), 255);
    }

    #[test]
    fn explicit_le_is_honored() {
        let mut services = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        services.selected = Some(AppId::OpenPgp);
        let out = GetChallenge.process(&mut services, 0x00, 0x00, &[], 16).unwrap();
        assert_eq!(out.len(), 16);
    }
}
