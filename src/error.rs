use std::fmt;

/// Failure surfaced by a device factory or, rarely, by a fallible operation.
///
/// Operations against an already-created device are fire-and-forget: a
/// short write or a worker anomaly is logged (see the `tracing` calls
/// throughout this crate) rather than returned, matching the behaviour of
/// the system this crate emulates. `Error` only ever escapes from the
/// `create` family of functions.
#[derive(Debug)]
pub enum Error {
    /// A syscall (`open`, `write`, `ioctl`, `poll`, ...) failed.
    Io(std::io::Error),
    /// A failure with no errno behind it: a descriptor too long, a device
    /// that never appeared in sysfs, an invalid argument caught before any
    /// syscall was made.
    Device(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "{e}"),
            Error::Device(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Device(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<nix::Error> for Error {
    fn from(e: nix::Error) -> Self {
        Error::Io(std::io::Error::from(e))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
