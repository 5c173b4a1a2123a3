//! Core of an OpenPGP Card Application v3.3.1 smart-card applet.
//!
//! This crate implements the part of an OpenPGP card that does not
//! depend on a specific transport, flash driver, or cryptographic
//! accelerator: APDU dispatch, the three-password security model, the
//! tagged data-object store, and the contract between command
//! handlers and the underlying key storage / crypto engine.
//!
//! A non-goal of this crate is to implement secure messaging (GlobalPlatform
//! / ISO 7816-4 CLA=0x0C encrypted channels), arbitrary extended-length
//! command chaining, or general-purpose ISO 7816 dispatch outside the
//! OpenPGP applet family. Embedders wire a [`fs::FileSystem`] backed by
//! real flash and a [`crypto::Backend`] backed by a real accelerator;
//! everything else in this crate is transport- and hardware-agnostic.
//!
//! [RFC 4880]: https://tools.ietf.org/html/rfc4880
//! [OpenPGP Card v3.3.1]: https://gnupg.org/ftp/specs/OpenPGP-smart-card-application-3.3.1.pdf

#![warn(missing_docs)]

pub mod algo;
pub mod applet;
pub mod crypto;
pub mod fs;
pub mod handlers;
pub mod key;
pub mod security;
pub mod services;
pub mod tlv;
pub mod types;

mod executor;
pub use executor::Executor;

/// Crate result specialization.
pub type Result<T> = ::std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// Every variant maps to exactly one ISO 7816-4 status word via
/// [`Error::status_word`]; that mapping is a total function, so every
/// APDU this crate dispatches produces a well-formed SW1SW2 trailer.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No applet is currently selected.
    #[error("No application selected")]
    ApplicationNotSelected,

    /// The AID in a Select command did not match any known applet.
    #[error("Application not found")]
    ApplicationNotFound,

    /// The APDU frame is shorter than the 5-byte header.
    #[error("Wrong APDU structure")]
    WrongApduStructure,

    /// Lc/data/Le did not agree with the frame's total length.
    #[error("Wrong APDU length")]
    WrongApduLength,

    /// CLA is not one this applet accepts for the given command.
    #[error("Wrong APDU CLA")]
    WrongApduCla,

    /// INS does not match any known command.
    #[error("Wrong APDU INS")]
    WrongApduIns,

    /// P1/P2 is not a combination the addressed command accepts.
    #[error("Wrong APDU P1 or P2")]
    WrongApduP1P2,

    /// The data field's length is wrong for this command.
    #[error("Wrong APDU data length")]
    WrongApduDataLength,

    /// A handler was invoked for an INS it does not implement.
    #[error("Wrong command")]
    WrongCommand,

    /// The data field's content (not merely its length) is malformed.
    #[error("Wrong data")]
    WrongData,

    /// The current security/auth state forbids this operation.
    #[error("Conditions of use not satisfied")]
    ConditionsNotSatisfied,

    /// The requested data object does not exist.
    #[error("Data not found")]
    DataNotFound,

    /// Password comparison failed; carries the tries remaining after
    /// the failure so `status_word` can fold it into 63CX.
    #[error("Wrong password ({remaining_tries} tries remaining)")]
    WrongPassword {
        /// Verification attempts left before the context is locked.
        remaining_tries: u8,
    },

    /// A referenced file does not exist in the backing store.
    #[error("File not found")]
    FileNotFound,

    /// The file system facade failed to persist a write.
    #[error("File write error")]
    FileWriteError,

    /// An invariant internal to this crate was violated.
    #[error("Internal error")]
    InternalError,

    /// A fixed-size buffer or slot was exhausted.
    #[error("Out of memory")]
    OutOfMemory,

    /// A BER-TLV tag could not be decoded.
    #[error("TLV decode: bad tag")]
    TlvDecodeTag,

    /// A BER-TLV length could not be decoded.
    #[error("TLV decode: bad length")]
    TlvDecodeLength,

    /// A BER-TLV value was shorter than its declared length.
    #[error("TLV decode: bad value")]
    TlvDecodeValue,

    /// The password context's retry counter has reached zero.
    #[error("Password locked")]
    PasswordLocked,

    /// Key material in storage is absent or cannot be used as-is.
    #[error("Stored key error")]
    StoredKeyError,

    /// Key parameters (algorithm attributes) in storage are malformed.
    #[error("Stored key parameters error")]
    StoredKeyParamsError,

    /// The operation is denied regardless of password state.
    #[error("Access denied")]
    AccessDenied,

    /// Input to a cryptographic primitive was malformed.
    #[error("Crypto data error")]
    CryptoDataError,

    /// The underlying cryptographic primitive failed.
    #[error("Crypto operation error")]
    CryptoOperationError,

    /// A cryptographic primitive produced an unusable result.
    #[error("Crypto result error")]
    CryptoResultError,

    /// The applet has been terminated and awaits an activate command.
    #[error("Application terminated")]
    ApplicationTerminated,

    /// Sentinel: the handler already wrote a complete response
    /// (including its own status word) into the output buffer; the
    /// executor must not overwrite it.
    #[error("Error already in response data")]
    ErrorPutInData(u16),
}

impl Error {
    /// Maps this error to the two-byte ISO 7816-4 status word that the
    /// executor appends to the response. This is a total function:
    /// every variant, including ones added in the future, falls back
    /// to `0x6F00` (no precise diagnosis) unless handled explicitly.
    pub fn status_word(&self) -> u16 {
        match self {
            Error::ApplicationNotFound => 0x6A82,
            Error::WrongApduCla => 0x6E00,
            Error::WrongApduIns | Error::WrongCommand => 0x6D00,
            Error::WrongApduP1P2 => 0x6B00,
            Error::WrongApduLength
            | Error::WrongApduStructure
            | Error::WrongApduDataLength => 0x6700,
            Error::DataNotFound => 0x6A88,
            Error::ConditionsNotSatisfied | Error::ApplicationNotSelected => 0x6985,
            Error::AccessDenied => 0x6982,
            Error::PasswordLocked => 0x6983,
            Error::WrongPassword { remaining_tries } =>
                0x63C0 | (*remaining_tries & 0x0F) as u16,
            Error::ErrorPutInData(sw) => *sw,
            _ => 0x6F00,
        }
    }
}

/// The status word signalling unqualified success.
pub const SW_SUCCESS: u16 = 0x9000;
