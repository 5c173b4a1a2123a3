//! Applet selection: matching a Select command's AID against the
//! applet family this crate implements, and building the FCI template
//! returned on success.
//!
//! Mirrors the `Select` handling `original_source`'s `apduexecutor.cpp`
//! performs ahead of dispatching to the OpenPGP application object.

use crate::tlv;
use crate::types::{AppId, Tag};
use crate::{Error, Result};

/// File Control Information template tag, wrapping the matched AID.
const FCI_TEMPLATE: Tag = Tag(0x006F);

/// Matches `aid` against every applet this crate knows, returning the
/// one selected and the FCI template to respond with.
///
/// `AppId` is `#[non_exhaustive]` with a single variant today; a
/// sibling applet added later only needs a new arm here.
pub fn select(aid: &[u8]) -> Result<(AppId, Vec<u8>)> {
    if AppId::OpenPgp.matches_aid(aid) {
        let fci = tlv::encode_constructed(FCI_TEMPLATE, &[tlv::encode(Tag::AID, aid)]);
        return Ok((AppId::OpenPgp, fci));
    }
    Err(Error::ApplicationNotFound)
}
