//! PUT DATA (INS=0xDA): writes (or, with empty data, deletes) the
//! object addressed by `(P1, P2)` as a tag. The odd instruction,
//! INS=0xDB, is a different command in everything but name (a key
//! import rather than a tag write) and lives in
//! [`crate::handlers::put_key`].
//!
//! Grounded on `APDUPutData::Check`/`Process` in `original_source`'s
//! `userapdu.cpp`, including the `ReadWriteOnlyAllowedFiles` gate
//! (here [`crate::security::SecurityConfig::restrict_puts`], a runtime
//! policy rather than a compile-time one; see `DESIGN.md`). Changing a
//! key slot's algorithm attributes drops its stored key through
//! [`crate::security::Security::after_save_file_logic`].
//!
//! `original_source`'s `Process` has no PW3 precondition of its own,
//! and spec.md §8 scenario 6 writes login data (tag 0x005E) with no
//! preceding VERIFY at all, so this handler carries none either;
//! per-tag confidentiality is enforced through the allow-list and
//! secure-area checks below, not a blanket admin gate.

use super::Handler;
use crate::algo::AlgorithmAttr;
use crate::services::Services;
use crate::types::{KeySlot, Region, Tag};
use crate::{Error, Result};

/// AES key sizes this applet accepts at tag 0x00D5 (AES-128/192/256).
const AES_KEY_LENGTHS: [usize; 3] = [16, 24, 32];

/// Handles PUT DATA.
pub struct PutData;

impl Handler for PutData {
    fn check(&self, cla: u8, _p1: u8, _p2: u8, _lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, p1: u8, p2: u8, data: &[u8], _le: usize) -> Result<Vec<u8>> {
        let app = services.selected_app()?;

        let tag = Tag::from((p1, p2));
        services.security.data_object_in_allowed_list(tag)?;
        if let Some(max) = tag.max_len() {
            if data.len() > max {
                return Err(Error::WrongApduDataLength);
            }
        }
        if !data.is_empty() {
            if let Some(slot) = algo_attr_slot(tag) {
                AlgorithmAttr::decode(data, slot)?;
            } else if tag == Tag::AES_KEY && !AES_KEY_LENGTHS.contains(&data.len()) {
                return Err(Error::WrongApduDataLength);
            }
        }

        let region = if services.security.data_object_in_secure_area(tag) {
            Region::Secure
        } else {
            Region::File
        };
        if data.is_empty() {
            services.fs.delete_file(app, tag, region)?;
        } else {
            services.fs.write_file(app, tag, region, data)?;
        }
        services.security.after_save_file_logic(services.fs.as_mut(), app, tag)?;
        Ok(Vec::new())
    }
}

/// The key slot whose algorithm-attribute encoding `tag` governs, if
/// any (OpenPGP Card v3.3.1 §4.3.3.6/7 — every PutData write to
/// 0xC1/0xC2/0xC3 must decode as that slot's attribute blob).
fn algo_attr_slot(tag: Tag) -> Option<KeySlot> {
    match tag {
        Tag::ALGO_ATTR_SIG => Some(KeySlot::DigitalSignature),
        Tag::ALGO_ATTR_DEC => Some(KeySlot::Confidentiality),
        Tag::ALGO_ATTR_AUT => Some(KeySlot::Authentication),
        _ => None,
    }
}
