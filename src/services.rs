//! Bundles the process-wide collaborators a handler needs: the file
//! system, the security state machine, key storage, and the crypto
//! engine's backend.
//!
//! The standard's reference implementation keeps these as free-standing
//! globals (`FileSystem`, `Security`, `KeyStorage`, `CryptoEngine` in
//! `original_source`'s `cryptolib.h`/call sites); this crate threads
//! them explicitly through one struct instead; see `DESIGN.md`.

use crate::crypto::backend::Backend;
use crate::crypto::CryptoEngine;
use crate::fs::FileSystem;
use crate::key::KeyStorage;
use crate::security::{Security, SecurityConfig};
use crate::types::AppId;

/// Everything a command handler needs, bundled for one APDU exchange.
pub struct Services {
    /// The backing data-object store.
    pub fs: Box<dyn FileSystem>,
    /// The cryptographic accelerator.
    pub backend: Box<dyn Backend>,
    /// The password/auth state machine.
    pub security: Security,
    /// Key persistence and 7F49 template synthesis.
    pub keys: KeyStorage,
    /// Which applet the last successful Select chose, if any.
    pub selected: Option<AppId>,
}

impl Services {
    /// Assembles a fresh session: no applet selected, security state
    /// reset, using `fs` and `backend` as the process-wide collaborators.
    pub fn new(fs: Box<dyn FileSystem>, backend: Box<dyn Backend>, config: SecurityConfig) -> Self {
        Services {
            fs,
            backend,
            security: Security::new(config),
            keys: KeyStorage::new(),
            selected: None,
        }
    }

    /// A [`CryptoEngine`] over this session's backend, borrowed for
    /// the duration of one handler call.
    pub fn crypto(&self) -> CryptoEngine<'_> {
        CryptoEngine::new(self.backend.as_ref())
    }

    /// The currently selected applet, or an error if none has been
    /// selected yet.
    pub fn selected_app(&self) -> crate::Result<AppId> {
        self.selected.ok_or(crate::Error::ApplicationNotSelected)
    }
}
