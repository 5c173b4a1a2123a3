//! GENERATE ASYMMETRIC KEY PAIR (INS=0x47): generates (P1=0x80) or
//! reads back (P1=0x81) the public part of one of the three key
//! slots, selected by a 2-byte CRT-selector data field.
//!
//! Grounded on `APDUGenerateAsymmetricKeyPair::Check`/`Process` in
//! `original_source`'s `cryptoapdu.cpp`.
//!
//! Unlike that function, this handler requires PW3 before generating a
//! new key pair (P1=0x80); `original_source` has no such guard at all.
//! DESIGN.md records this as a deliberate hardening, the same call made
//! for [`crate::handlers::put_data`] and [`crate::handlers::put_key`].

use crate::algo::{AlgorithmAttr, Curve};
use crate::types::{KeySlot, PasswordId, Region};
use crate::{Error, Result};

use super::Handler;
use crate::services::Services;

/// Handles GENERATE ASYMMETRIC KEY PAIR.
pub struct GenerateAsymmetricKeyPair;

impl Handler for GenerateAsymmetricKeyPair {
    fn check(&self, cla: u8, p1: u8, p2: u8, lc: usize, _le: usize) -> Result<()> {
        if cla != 0x00 {
            return Err(Error::WrongApduCla);
        }
        if p1 != 0x80 && p1 != 0x81 {
            return Err(Error::WrongApduP1P2);
        }
        if p2 != 0x00 {
            return Err(Error::WrongApduP1P2);
        }
        if lc != 2 {
            return Err(Error::WrongApduDataLength);
        }
        Ok(())
    }

    fn process(&self, services: &mut Services, p1: u8, _p2: u8, data: &[u8], _le: usize) -> Result<Vec<u8>> {
        let app = services.selected_app()?;
        let &selector = data.first().ok_or(Error::WrongApduDataLength)?;
        let slot = KeySlot::from_crt_selector(selector).ok_or(Error::WrongData)?;

        if p1 == 0x81 {
            return services.keys.get_public_key_7f49(services.fs.as_ref(), app, slot);
        }

        if !services.security.get_auth(PasswordId::Pw3) {
            return Err(Error::AccessDenied);
        }

        let blob = services.fs.read_file(app, slot.tag(), Region::Secure)?;
        let attr = if blob.is_empty() {
            crate::algo::default_rsa2048()
        } else {
            AlgorithmAttr::decode(&blob, slot)?
        };

        match attr {
            AlgorithmAttr::Rsa(rsa_attr) => {
                let pair = services.crypto().generate_rsa_key(rsa_attr.modulus_bits as usize)?;
                services.keys.put_rsa_full_key(services.fs.as_mut(), app, slot, &pair)?;
            }
            AlgorithmAttr::Ec(ec_attr) | AlgorithmAttr::EdDsa(ec_attr) => {
                let pair = services.crypto().generate_ec_key(ec_attr.curve.backend_curve())?;
                let curve: Curve = ec_attr.curve;
                services.keys.put_ec_full_key(services.fs.as_mut(), app, slot, curve, &pair)?;
            }
        }

        services.keys.get_public_key_7f49(services.fs.as_ref(), app, slot)
    }
}
