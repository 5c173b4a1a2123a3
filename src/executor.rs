//! The APDU executor: parses a raw command frame, routes it to Select
//! or to the currently selected applet's handler table, and appends
//! the mapped status word to whatever the handler produced.
//!
//! Grounded on `APDUExecutor::ProcessAPDU` in `original_source`'s
//! `apduexecutor.cpp`: header length validation, the INS=0xA4 Select
//! special case, and the "no handler ⇒ 6D00 / no selection ⇒ 6985"
//! fallbacks are all load-bearing behavior carried over from there.
//! The polymorphic `Applet`/handler dispatch of that file becomes the
//! static `INS -> Handler` table below.

use log::{debug, trace};

use crate::applet;
use crate::handlers::change_reference_data::ChangeReferenceData;
use crate::handlers::generate_asymmetric_keypair::GenerateAsymmetricKeyPair;
use crate::handlers::get_challenge::GetChallenge;
use crate::handlers::get_data::GetData;
use crate::handlers::internal_authenticate::InternalAuthenticate;
use crate::handlers::pso::Pso;
use crate::handlers::put_data::PutData;
use crate::handlers::put_key::PutKey;
use crate::handlers::reset_retry_counter::ResetRetryCounter;
use crate::handlers::verify::Verify;
use crate::handlers::Handler;
use crate::services::Services;
use crate::{Error, Result, SW_SUCCESS};

/// INS byte of the ISO 7816-4 SELECT command.
const INS_SELECT: u8 = 0xA4;

/// The minimal header length (CLA INS P1 P2 Lc) every short-form APDU
/// must carry, even one with no data and no Le.
const HEADER_LEN: usize = 5;

/// Parses and dispatches one APDU, returning the complete response
/// (data field, if any, followed by SW1SW2).
///
/// This is the crate's single entry point: an embedder owning the
/// CCID/USB transport hands it the raw command bytes it received and
/// sends back exactly what this returns.
pub struct Executor {
    services: Services,
}

impl Executor {
    /// Wraps `services` for dispatching APDUs against it.
    pub fn new(services: Services) -> Self {
        Executor { services }
    }

    /// Borrows the underlying [`Services`], e.g. to seed test fixtures
    /// or inspect state between APDUs.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Mutably borrows the underlying [`Services`].
    pub fn services_mut(&mut self) -> &mut Services {
        &mut self.services
    }

    /// Parses `apdu` and dispatches it, returning the response bytes
    /// (data field followed by the two-byte status word). Never
    /// panics: any error this crate can produce is folded into a
    /// well-formed SW1SW2 trailer per [`Error::status_word`].
    pub fn execute(&mut self, apdu: &[u8]) -> Vec<u8> {
        match self.dispatch(apdu) {
            Ok(mut body) => {
                trace!("apdu dispatched ok, {} byte response", body.len());
                body.extend_from_slice(&SW_SUCCESS.to_be_bytes());
                body
            }
            Err(Error::ErrorPutInData(sw)) => {
                trace!("handler set sw={sw:04X} directly");
                sw.to_be_bytes().to_vec()
            }
            Err(err) => {
                let sw = err.status_word();
                debug!("apdu rejected: {err} (sw={sw:04X})");
                sw.to_be_bytes().to_vec()
            }
        }
    }

    fn dispatch(&mut self, apdu: &[u8]) -> Result<Vec<u8>> {
        if apdu.len() < HEADER_LEN {
            return Err(Error::WrongApduStructure);
        }
        let cla = apdu[0];
        let ins = apdu[1];
        let p1 = apdu[2];
        let p2 = apdu[3];
        let lc = apdu[4] as usize;

        // GetData's Le handling is lenient; every other
        // command requires the frame to be exactly the header, the Lc
        // data bytes, and an optional trailing Le.
        let (data, le) = if ins == 0xCA || ins == 0xCB {
            let data_end = (HEADER_LEN + lc).min(apdu.len());
            (&apdu[HEADER_LEN..data_end], 0usize)
        } else {
            let with_data = HEADER_LEN + lc;
            if apdu.len() == with_data {
                (&apdu[HEADER_LEN..with_data], 0usize)
            } else if apdu.len() == with_data + 1 {
                (&apdu[HEADER_LEN..with_data], apdu[with_data] as usize)
            } else {
                return Err(Error::WrongApduLength);
            }
        };

        trace!("apdu cla={cla:02X} ins={ins:02X} p1={p1:02X} p2={p2:02X} lc={lc}");

        if ins == INS_SELECT {
            return self.select(cla, p1, p2, data);
        }

        let app = self.services.selected_app()?;
        let _ = app; // every handler re-derives it; this just front-loads the 6985 check
        self.run(ins, cla, p1, p2, data, le)
    }

    fn select(&mut self, cla: u8, p1: u8, p2: u8, data: &[u8]) -> Result<Vec<u8>> {
        let handler = crate::handlers::select::Select;
        handler.check(cla, p1, p2, data.len(), 0)?;
        handler.process(&mut self.services, p1, p2, data, 0)
    }

    fn run(&mut self, ins: u8, cla: u8, p1: u8, p2: u8, data: &[u8], le: usize) -> Result<Vec<u8>> {
        macro_rules! dispatch {
            ($handler:expr) => {{
                let handler = $handler;
                handler.check(cla, p1, p2, data.len(), le)?;
                handler.process(&mut self.services, p1, p2, data, le)
            }};
        }

        match ins {
            0x20 => dispatch!(Verify),
            0x24 => dispatch!(ChangeReferenceData),
            0x2C => dispatch!(ResetRetryCounter),
            0xCA | 0xCB => dispatch!(GetData),
            0xDA => dispatch!(PutData),
            0xDB => dispatch!(PutKey),
            0x2A => dispatch!(Pso),
            0x88 => dispatch!(InternalAuthenticate),
            0x47 => dispatch!(GenerateAsymmetricKeyPair),
            0x84 => dispatch!(GetChallenge),
            _ => Err(Error::WrongApduIns),
        }
    }
}

/// Matches `aid` against this crate's known applet family without
/// going through an [`Executor`]; exposed for embedders that want to
/// decide selection out of band (e.g. a bootloader probing for an
/// OpenPGP applet before handing control to this crate).
pub fn probe_aid(aid: &[u8]) -> bool {
    applet::select(aid).is_ok()
}
