//! Command handlers: one module per APDU this applet implements,
//! each grounded directly on the corresponding `Check`/`Process` pair
//! in `original_source`'s `cryptoapdu.cpp`/`userapdu.cpp`.

pub mod change_reference_data;
pub mod generate_asymmetric_keypair;
pub mod get_challenge;
pub mod get_data;
pub mod internal_authenticate;
pub mod pso;
pub mod put_data;
pub mod put_key;
pub mod reset_retry_counter;
pub mod select;
pub mod verify;

use crate::services::Services;
use crate::Result;

/// A command handler: validates the APDU's structural shape, then
/// performs the operation against the shared [`Services`].
///
/// Split the same way `original_source`'s APDU classes split
/// `Check`/`Process`: `check` never touches storage or security state,
/// so the executor can reject a malformed frame before anything it did
/// would need to be undone.
pub trait Handler {
    /// Structural validation: CLA, P1/P2, and the Lc/Le shape this
    /// command accepts. Must not read or write any shared state.
    fn check(&self, cla: u8, p1: u8, p2: u8, lc: usize, le: usize) -> Result<()>;

    /// Performs the command, returning the response data field. The
    /// executor appends the status word; `Err(Error::ErrorPutInData)`
    /// lets a handler dictate an exact status word for a query that
    /// isn't itself a failure (e.g. Verify's remaining-tries probe).
    fn process(&self, services: &mut Services, p1: u8, p2: u8, data: &[u8], le: usize) -> Result<Vec<u8>>;
}
