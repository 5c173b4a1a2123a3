//! PUT DATA, odd instruction (INS=0xDB): imports a host-supplied
//! private key into a slot via an extended header list.
//!
//! Grounded on `APDUPutData::Check`/`Process`'s INS=`PutData2` branch
//! in `original_source`'s `userapdu.cpp`: P1 must be 0x3F and P2 0xFF,
//! and the data field is handed whole to key storage
//! (`key_storage.SetKeyExtHeader`). Parsing the extended header list
//! (tag 0x4D: a CRT selector, a 7F48 length list, and the 5F48
//! concatenated key data) is this handler's job rather than
//! [`crate::key::KeyStorage`]'s, since `original_source` leaves that
//! parsing to a caller this crate doesn't have an equivalent of; see
//! `DESIGN.md`.

use super::Handler;
use crate::algo::AlgorithmAttr;
use crate::services::Services;
use crate::tlv;
use crate::types::{KeySlot, PasswordId, Region, Tag};
use crate::{Error, Result};

/// Handles the PutKey form of PUT DATA.
pub struct PutKey;

impl Handler for PutKey {
    fn check(&self, cla: u8, p1: u8, p2: u8, lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        if p1 != 0x3F || p2 != 0xFF {
            return Err(Error::WrongApduP1P2);
        }
        if lc == 0 {
            return Err(Error::WrongApduDataLength);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, _p1: u8, _p2: u8, data: &[u8], _le: usize) -> Result<Vec<u8>> {
        let app = services.selected_app()?;
        if !services.security.get_auth(PasswordId::Pw3) {
            return Err(Error::AccessDenied);
        }

        let (header, _) = tlv::parse_one(data)?;
        if header.tag != Tag::EXTENDED_HEADER_LIST {
            return Err(Error::WrongData);
        }

        let mut slot = None;
        let mut lengths: &[u8] = &[];
        let mut key_data: &[u8] = &[];
        for element in tlv::parse_all(header.value)? {
            match element.tag.0 {
                0xB6 | 0xB8 | 0xA4 => slot = KeySlot::from_crt_selector(element.tag.0 as u8),
                _ if element.tag == Tag::PRIVATE_KEY_TEMPLATE => lengths = element.value,
                _ if element.tag == Tag::CONCATENATED_KEY_DATA => key_data = element.value,
                _ => {}
            }
        }
        let slot = slot.ok_or(Error::WrongData)?;
        let components = split_components(lengths, key_data)?;

        let blob = services.fs.read_file(app, slot.tag(), Region::Secure)?;
        let attr = if blob.is_empty() {
            crate::algo::default_rsa2048()
        } else {
            AlgorithmAttr::decode(&blob, slot)?
        };

        services
            .keys
            .import_key(services.fs.as_mut(), app, slot, attr, &components)?;
        Ok(Vec::new())
    }
}

/// Walks a 7F48 length list (tag, length pairs with no value bytes of
/// their own) and splits the matching number of bytes off the front
/// of `key_data` for each tag, in order.
fn split_components<'a>(mut lengths: &[u8], mut key_data: &'a [u8]) -> Result<Vec<(Tag, &'a [u8])>> {
    let mut components = Vec::new();
    while !lengths.is_empty() {
        let (tag, rest) = tlv::decode_tag(lengths)?;
        let (len, rest) = tlv::decode_len(rest)?;
        if key_data.len() < len {
            return Err(Error::WrongData);
        }
        let (value, remaining_data) = key_data.split_at(len);
        components.push((tag, value));
        key_data = remaining_data;
        lengths = rest;
    }
    Ok(components)
}
