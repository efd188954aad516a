use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

macro_rules! invalid_format_error {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {
        crate::Error::InvalidFormat(format!($fmt $(, $arg)*))
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Errors fall into two severities. Format-fatal errors ([`Error::InvalidFormat`]) are raised
/// while decoding the DOS, NT and optional headers and reject the whole image. Every other
/// variant is directory-local: the loader logs it, drops the affected directory and keeps going
/// with the remaining ones.
///
/// # Error Categories
///
/// ## Format Errors
/// - [`Error::InvalidFormat`] - Bad DOS magic, NT signature or optional header magic
/// - [`Error::Empty`] - Empty input provided
///
/// ## Directory Errors
/// - [`Error::UnmappedAddress`] - An RVA or VA does not translate into the image
/// - [`Error::UnknownSubformat`] - A recognised structure uses a variant that is not handled
/// - [`Error::Malformed`] - Corrupted structure inside a directory
/// - [`Error::OutOfBounds`] - Attempted to read beyond the backing data
/// - [`Error::RecursionLimit`] - A recursive walk exceeded its depth budget
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::Error`] - Miscellaneous failures such as memory-mapping
///
/// # Examples
///
/// ```rust,no_run
/// use pescope::{Error, PeObject};
/// use std::path::Path;
///
/// match PeObject::from_file(Path::new("sample.exe")) {
///     Ok(object) => println!("Toolchain: {}", object.classification()),
///     Err(Error::InvalidFormat(reason)) => eprintln!("Not a PE image: {reason}"),
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {io_err}"),
///     Err(e) => eprintln!("Other error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The image headers are not a valid PE layout.
    ///
    /// Raised for a wrong DOS magic, a wrong NT signature, an optional header magic that is
    /// neither PE32 nor PE32+, or headers that are cut short. The image is rejected outright.
    #[error("Invalid PE format - {0}")]
    InvalidFormat(String),

    /// An address could not be translated into the mapped image.
    ///
    /// The associated value is the offending RVA or VA.
    #[error("Address 0x{0:X} is not mapped by any section")]
    UnmappedAddress(u64),

    /// A structure was recognised but uses a variant this crate does not decode.
    ///
    /// Used for CodeView records whose signature is neither `NB10` nor `RSDS`.
    #[error("Unknown sub-format - {0}")]
    UnknownSubformat(String),

    /// The file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing the file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// Recursion limit reached.
    ///
    /// The associated value shows the depth limit that was reached.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),
}
