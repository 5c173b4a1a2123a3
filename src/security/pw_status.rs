//! PW Status Bytes: the 7-byte record at tag 0x00C4 (OpenPGP Card
//! v3.3.1 §4.3.4) that records each password context's format limits
//! and remaining retry counters.

use crate::fs::FileSystem;
use crate::types::{AppId, PasswordId, Region, Tag};
use crate::{Error, Result};

const LEN: usize = 7;

/// Default tries before a context locks, as shipped from reset.
pub const DEFAULT_RETRIES: u8 = 3;
/// Default max PIN length/format byte: 32 bytes, UTF-8 (format 2).
const DEFAULT_MAX_LENGTH: u8 = 32;

/// A decoded PW Status Bytes record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PwStatusBytes {
    /// Whether PW1 may be presented once and reused for several
    /// PSO:CDS operations (`0x01`) or must be verified before each one
    /// (`0x00`).
    pub pw1_valid_several_cds: bool,
    /// Max length and format byte for PW1.
    pub max_length_pw1: u8,
    /// Max length and format byte for the resetting code.
    pub max_length_rc: u8,
    /// Max length and format byte for PW3.
    pub max_length_pw3: u8,
    /// Retries remaining for PW1 (shared by the PW1-CDS and PW1
    /// contexts: there is one PW1 secret).
    pub error_counter_pw1: u8,
    /// Retries remaining for the resetting code.
    pub error_counter_rc: u8,
    /// Retries remaining for PW3.
    pub error_counter_pw3: u8,
}

impl Default for PwStatusBytes {
    fn default() -> Self {
        PwStatusBytes {
            pw1_valid_several_cds: false,
            max_length_pw1: DEFAULT_MAX_LENGTH,
            max_length_rc: DEFAULT_MAX_LENGTH,
            max_length_pw3: DEFAULT_MAX_LENGTH,
            error_counter_pw1: DEFAULT_RETRIES,
            error_counter_rc: DEFAULT_RETRIES,
            error_counter_pw3: DEFAULT_RETRIES,
        }
    }
}

impl PwStatusBytes {
    /// Loads the record for `app`, defaulting to a freshly reset card
    /// if it was never written.
    pub fn load(fs: &dyn FileSystem, app: AppId) -> Result<Self> {
        let data = fs.read_file(app, Tag::PW_STATUS, Region::File)?;
        if data.is_empty() {
            return Ok(Self::default());
        }
        if data.len() != LEN {
            return Err(Error::StoredKeyParamsError);
        }
        Ok(PwStatusBytes {
            pw1_valid_several_cds: data[0] == 0x01,
            max_length_pw1: data[1],
            max_length_rc: data[2],
            max_length_pw3: data[3],
            error_counter_pw1: data[4],
            error_counter_rc: data[5],
            error_counter_pw3: data[6],
        })
    }

    /// Persists this record.
    pub fn save(&self, fs: &mut dyn FileSystem, app: AppId) -> Result<()> {
        let data = [
            self.pw1_valid_several_cds as u8,
            self.max_length_pw1,
            self.max_length_rc,
            self.max_length_pw3,
            self.error_counter_pw1,
            self.error_counter_rc,
            self.error_counter_pw3,
        ];
        fs.write_file(app, Tag::PW_STATUS, Region::File, &data)
    }

    fn counter(&self, id: PasswordId) -> u8 {
        match id {
            PasswordId::Pw1Cds | PasswordId::Pw1 => self.error_counter_pw1,
            PasswordId::Rc => self.error_counter_rc,
            PasswordId::Pw3 => self.error_counter_pw3,
        }
    }

    fn set_counter(&mut self, id: PasswordId, value: u8) {
        match id {
            PasswordId::Pw1Cds | PasswordId::Pw1 => self.error_counter_pw1 = value,
            PasswordId::Rc => self.error_counter_rc = value,
            PasswordId::Pw3 => self.error_counter_pw3 = value,
        }
    }

    /// Tries remaining for `id` before it locks.
    pub fn passwd_try_remains(&self, id: PasswordId) -> u8 {
        self.counter(id)
    }

    /// Records one failed verification, saturating at zero (locked).
    pub fn dec_error_counter(&mut self, id: PasswordId) {
        let current = self.counter(id);
        self.set_counter(id, current.saturating_sub(1));
    }

    /// Resets the context's retry counter after a successful
    /// verification or a password change.
    pub fn reset_error_counter(&mut self, id: PasswordId) {
        self.set_counter(id, DEFAULT_RETRIES);
    }

    /// The maximum accepted byte length for `id`'s verifier (the low 7
    /// bits of the length/format byte; the top bit flags PIN-block
    /// format 2 rather than free-form UTF-8).
    pub fn max_length(&self, id: PasswordId) -> usize {
        let byte = match id {
            PasswordId::Pw1Cds | PasswordId::Pw1 => self.max_length_pw1,
            PasswordId::Rc => self.max_length_rc,
            PasswordId::Pw3 => self.max_length_pw3,
        };
        (byte & 0x7F) as usize
    }
}
