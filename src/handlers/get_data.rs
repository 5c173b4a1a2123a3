//! GET DATA (INS=0xCA): reads back the data object addressed by
//! `(P1, P2)` as a tag.
//!
//! Grounded on `APDUGetData::Check`/`Process` in `original_source`'s
//! `userapdu.cpp`: no length/tag validation beyond the frame itself; a
//! data object that was never written reads back empty with a success
//! status, same as [`crate::fs::FileSystem::read_file`]'s own
//! contract.

use super::Handler;
use crate::services::Services;
use crate::types::{Region, Tag};
use crate::{Error, Result};

/// Handles GET DATA.
pub struct GetData;

impl Handler for GetData {
    fn check(&self, cla: u8, _p1: u8, _p2: u8, _lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, p1: u8, p2: u8, _data: &[u8], _le: usize) -> Result<Vec<u8>> {
        let app = services.selected_app()?;
        let tag = Tag::from((p1, p2));
        let region = if services.security.data_object_in_secure_area(tag) {
            Region::Secure
        } else {
            Region::File
        };
        services.fs.read_file(app, tag, region)
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
    fn missing_object_reads_back_empty() {
        let mut services = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        services.selected = Some(AppId::OpenPgp);
        let data = GetData.process(&mut services, 0x00, 0x5E, &[], 0).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn roundtrips_with_put_data() {
        let mut services = Services::new(
            Box::new(MemoryFileSystem::new()),
            Box::new(SoftBackend),
            SecurityConfig::default(),
        );
        services.selected = Some(AppId::OpenPgp);
        super::super::verify::Verify
            .process(&mut services, 0x00, 0x83, b"12345678", 0)
            .unwrap();
        super::super::put_data::PutData
            .process(&mut services, 0x00, 0x5E, b"login@example.com", 0)
            .unwrap();

        let data = GetData.process(&mut services, 0x00, 0x5E, &[], 0).unwrap();
        assert_eq!(data, b"login@example.com");
    }
}
