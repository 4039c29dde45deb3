//! A pure layout-and-write engine for ELF images.
//!
//! The crate turns an editable, ordered tree of data regions — headers,
//! segments, sections, string tables, symbol tables and raw bytes — into a
//! byte-exact ELF image for both `ELFCLASS32` and `ELFCLASS64`, in either
//! byte order. The work happens in two phases: [`ElfFile::layout`] walks
//! the tree once and assigns every region its final file offset while
//! enforcing the format's alignment, ordering and cross-reference rules;
//! [`Layout::bytes`] then walks the tree a second time and writes the
//! image from the precomputed offsets.
//!
//! Parsing existing ELF bytes, applying relocations and interpreting
//! dynamic sections are out of scope; the engine produces a byte sequence
//! and callers persist it however they like.
#![cfg_attr(not(feature = "std"), no_std)]
extern crate alloc;

mod ehdr;
mod emit;
mod error;
mod file;
mod layout;
mod section;
mod segment;
pub mod strtab;
mod symtab;

pub use ehdr::{Class, ElfHeader, Encoding};
pub use error::{Error, Result};
pub use file::{DataRegion, ElfFile};
pub use layout::{Layout, Phdr, Shdr};
pub use section::{GotSection, Section};
pub use segment::{GnuRelroRegion, GnuStack, MemSize, Segment};
pub use symtab::{SymbolEntry, SymbolTable};
