use std::{error, fmt, io};

/// An error that occurred while processing an image.
#[derive(Debug)]
pub struct Error {
    inner: ErrorInner,
}

#[derive(Debug)]
enum ErrorInner {
    Io(io::Error),
    NotPe(&'static str),
    BadDebug(&'static str),
    Usage(&'static str),
}

/// The kind of error, for callers that want to match on failure class
/// without inspecting the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input is neither a valid PE image nor an ELF image.
    NotPe,
    /// A stabs or COFF debug record was internally inconsistent.
    BadDebug,
    /// Allocation failure.
    ///
    /// Never constructed by this crate: ordinary allocation failure in
    /// safe Rust aborts the process rather than being caught here. This
    /// variant exists so embedders can match on it without the match
    /// being non-exhaustive in the future.
    OutOfMemory,
    /// An I/O error occurred while reading or writing.
    Io(io::ErrorKind),
    /// The caller supplied a malformed argument sequence.
    UsageError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            ErrorInner::Io(e) => e.fmt(f),
            ErrorInner::NotPe(msg) => f.write_str(msg),
            ErrorInner::BadDebug(msg) => f.write_str(msg),
            ErrorInner::Usage(msg) => f.write_str(msg),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.inner {
            ErrorInner::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self {
            inner: ErrorInner::Io(e),
        }
    }
}

impl Error {
    /// Get the kind of error.
    pub fn kind(&self) -> ErrorKind {
        match &self.inner {
            ErrorInner::Io(e) => ErrorKind::Io(e.kind()),
            ErrorInner::NotPe(_) => ErrorKind::NotPe,
            ErrorInner::BadDebug(_) => ErrorKind::BadDebug,
            ErrorInner::Usage(_) => ErrorKind::UsageError,
        }
    }

    pub(crate) fn not_pe(message: &'static str) -> Self {
        Self {
            inner: ErrorInner::NotPe(message),
        }
    }

    pub(crate) fn bad_debug(message: &'static str) -> Self {
        Self {
            inner: ErrorInner::BadDebug(message),
        }
    }

    pub(crate) fn usage(message: &'static str) -> Self {
        Self {
            inner: ErrorInner::Usage(message),
        }
    }
}

/// The `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
