//! Secret-carrying byte buffers.
//!
//! [`Protected`] wraps a `Box<[u8]>` holding PIN verifiers, KDF
//! outputs, or private-key material, and wipes it on drop with
//! [`memsec::memzero`]. Comparisons go through [`secure_cmp`], which
//! runs in time independent of where the buffers first differ so a
//! timing side channel can't leak how many leading bytes of a guessed
//! PIN were correct.

use std::fmt;
use std::ops::Deref;

/// A secret byte buffer, zeroed when dropped.
#[derive(Clone)]
pub struct Protected(Box<[u8]>);

impl From<Vec<u8>> for Protected {
    fn from(v: Vec<u8>) -> Self {
        Protected(v.into_boxed_slice())
    }
}

impl From<Box<[u8]>> for Protected {
    fn from(v: Box<[u8]>) -> Self {
        Protected(v)
    }
}

impl From<&[u8]> for Protected {
    fn from(v: &[u8]) -> Self {
        Protected(v.to_vec().into_boxed_slice())
    }
}

impl Deref for Protected {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Protected {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if cfg!(debug_assertions) {
            write!(f, "Protected({} bytes)", self.0.len())
        } else {
            f.write_str("Protected(<redacted>)")
        }
    }
}

impl Drop for Protected {
    fn drop(&mut self) {
        if !self.0.is_empty() {
            unsafe {
                memsec::memzero(self.0.as_mut_ptr(), self.0.len());
            }
        }
    }
}

impl std::hash::Hash for Protected {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Compares two buffers in constant time with respect to their
/// shared length, returning whether they hold the same bytes.
///
/// Buffers of different length compare unequal immediately; this
/// leaks only the length, which a verifier (unlike a PIN) is allowed
/// to know.
pub fn secure_cmp(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a.is_empty() {
        return true;
    }
    let cmp = unsafe { memsec::memcmp(a.as_ptr(), b.as_ptr(), a.len()) };
    cmp == 0
}
