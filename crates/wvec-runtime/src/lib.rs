//! wvec runtime with stable ABI
//!
//! Provides the C ABI over a guarded global context, the thermal governor,
//! the shutdown flag and an epoch-level training session.

mod abi;
mod context;
pub mod session;
pub mod shutdown;
pub mod thermal;

pub use abi::*;
pub use context::{RuntimeConfig, RuntimeContext};
pub use session::{SessionConfig, SessionReport, ThermalConfig, TrainingSession};

use wvec_core::error::Error;

/// Runtime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Status codes for the C ABI
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Ok = 0,
    NotInitialized = 1,
    InvalidSize = 2,
    OutOfMemory = 3,
    FileIo = 4,
    InvalidMagic = 5,
    UnsupportedVersion = 6,
    InvalidArgument = 7,
}

impl From<&Error> for ErrorCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::NotInitialized => ErrorCode::NotInitialized,
            Error::InvalidSize(_) => ErrorCode::InvalidSize,
            Error::OutOfMemory(_) => ErrorCode::OutOfMemory,
            Error::FileIo(_) => ErrorCode::FileIo,
            Error::InvalidMagic(_) => ErrorCode::InvalidMagic,
            Error::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            Error::Config(_) => ErrorCode::InvalidArgument,
        }
    }
}

impl From<Error> for ErrorCode {
    fn from(e: Error) -> Self {
        ErrorCode::from(&e)
    }
}

/// Thread-local error message storage for C ABI
use std::cell::RefCell;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

pub(crate) fn set_last_error(msg: String) {
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(msg));
}

pub(crate) fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Serializes unit tests that touch process-wide state.
#[cfg(test)]
pub(crate) static TEST_LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_codes() {
        assert_eq!(ErrorCode::from(Error::NotInitialized), ErrorCode::NotInitialized);
        assert_eq!(ErrorCode::from(Error::InvalidSize("x".into())), ErrorCode::InvalidSize);
        assert_eq!(ErrorCode::from(Error::OutOfMemory("x".into())), ErrorCode::OutOfMemory);
        assert_eq!(
            ErrorCode::from(Error::FileIo(io::Error::new(io::ErrorKind::NotFound, "x"))),
            ErrorCode::FileIo
        );
        assert_eq!(ErrorCode::from(Error::InvalidMagic(*b"ABCD")), ErrorCode::InvalidMagic);
        assert_eq!(ErrorCode::from(Error::UnsupportedVersion(9)), ErrorCode::UnsupportedVersion);
        assert_eq!(ErrorCode::from(Error::Config("x".into())), ErrorCode::InvalidArgument);
        assert_eq!(ErrorCode::Ok as i32, 0);
    }

    #[test]
    fn test_last_error_is_taken_once() {
        set_last_error("boom".to_string());
        assert_eq!(take_last_error().as_deref(), Some("boom"));
        assert_eq!(take_last_error(), None);
    }
}
