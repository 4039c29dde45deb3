use alloc::borrow::Cow;
use core::fmt::{Debug, Display};

/// Error types used throughout the `elf_writer` library.
/// These errors represent the failure conditions that can occur while
/// planning the layout of an ELF image or while validating sections.
#[derive(Debug)]
pub enum Error {
    /// A structural rule of the ELF format was violated while planning
    /// the file layout.
    ///
    /// This error typically indicates issues such as:
    /// * The ELF header region not sitting at offset 0
    /// * A misaligned program-header table or section payload
    /// * Duplicate section or segment indices
    /// * A segment whose file offset and virtual address disagree
    ///   modulo its alignment
    Layout {
        /// A descriptive message naming the offending region, index or offset.
        msg: Cow<'static, str>,
    },

    /// A section failed validation when reinterpreted as a typed view,
    /// e.g. reading a plain section as a Global Offset Table.
    ///
    /// Unlike [`Error::Layout`], this is recoverable: the caller asked a
    /// question about external data and got a negative answer.
    Validation {
        /// A descriptive message about the mismatched field.
        msg: Cow<'static, str>,
    },

    /// An internal invariant of the layout engine was broken.
    ///
    /// This error indicates a bug in the engine itself, such as a string
    /// table lookup for a name that was never registered.
    Internal {
        /// A descriptive message about the broken invariant.
        msg: Cow<'static, str>,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Layout { msg } => write!(f, "Layout error: {msg}"),
            Error::Validation { msg } => write!(f, "Validation error: {msg}"),
            Error::Internal { msg } => write!(f, "Internal error: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

/// Creates a layout error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn layout_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Layout { msg: msg.into() }
}

/// Creates a validation error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn validation_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Validation { msg: msg.into() }
}

/// Creates an internal error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn internal_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Internal { msg: msg.into() }
}

pub type Result<T> = core::result::Result<T, Error>;
