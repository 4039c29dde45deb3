//! Sections and the typed Global Offset Table view.

use crate::error::validation_error;
use crate::Result;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use elf::abi::{SHF_ALLOC, SHF_WRITE, SHT_PROGBITS, SHT_STRTAB};

/// A named region of the file described by the section-header table.
///
/// All type and flag words are opaque to the layout engine; only the
/// structural fields (`index`, `addr`, `addr_align` and the payload)
/// participate in layout decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Index of this section in the section-header table.
    pub index: u16,
    /// Section name as raw bytes, resolved against `.shstrtab` at layout time.
    pub name: Vec<u8>,
    /// `sh_type` word.
    pub sh_type: u32,
    /// `sh_flags` word.
    pub flags: u64,
    /// Virtual address of the section in memory.
    pub addr: u64,
    /// Declared `sh_size`. May exceed the payload length for `SHT_NOBITS`-style
    /// sections that occupy memory but no file bytes.
    pub size: u64,
    /// `sh_link` word.
    pub link: u32,
    /// `sh_info` word.
    pub info: u32,
    /// Required alignment of `addr`, and of the file offset when the section
    /// carries data.
    pub addr_align: u64,
    /// Size of one table entry for sections that hold fixed-size records.
    pub entsize: u64,
    /// File payload.
    pub data: Vec<u8>,
}

const GOT_FLAGS: u64 = (SHF_ALLOC | SHF_WRITE) as u64;

impl Section {
    /// Number of bytes this section contributes to the file.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the section carries no file bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reinterprets this section as a Global Offset Table.
    ///
    /// This inspects external data, so every mismatch is reported as a
    /// recoverable [`crate::Error::Validation`] rather than aborting.
    pub fn as_got(&self) -> Result<GotSection> {
        let name = String::from_utf8_lossy(&self.name);
        if self.sh_type != SHT_PROGBITS {
            return Err(validation_error(format!(
                "section {name} has type {:#x}, a GOT must have type SHT_PROGBITS",
                self.sh_type
            )));
        }
        if self.flags != GOT_FLAGS {
            return Err(validation_error(format!(
                "section {name} has flags {:#x}, a GOT must be SHF_ALLOC|SHF_WRITE",
                self.flags
            )));
        }
        if self.size != self.data.len() as u64 {
            return Err(validation_error(format!(
                "section {name} declares size {} but carries {} bytes",
                self.size,
                self.data.len()
            )));
        }
        if self.link != 0 || self.info != 0 {
            return Err(validation_error(format!(
                "section {name} has link {} and info {}, a GOT uses neither",
                self.link, self.info
            )));
        }
        Ok(GotSection {
            index: self.index,
            name: self.name.clone(),
            addr: self.addr,
            addr_align: self.addr_align,
            entsize: self.entsize,
            data: self.data.clone(),
        })
    }

    /// The reserved index-0 null section: `SHT_NULL`, every field zero.
    pub(crate) fn null() -> Self {
        Self {
            index: 0,
            name: Vec::new(),
            sh_type: elf::abi::SHT_NULL,
            flags: 0,
            addr: 0,
            size: 0,
            link: 0,
            info: 0,
            addr_align: 0,
            entsize: 0,
            data: Vec::new(),
        }
    }

    /// Synthesizes the `.shstrtab` section from a finished name-table payload.
    pub(crate) fn shstrtab(index: u16, data: Vec<u8>) -> Self {
        Self::strtab_like(index, b".shstrtab".to_vec(), data)
    }

    /// Synthesizes the `.strtab` section from a finished symbol-name payload.
    pub(crate) fn strtab(index: u16, data: Vec<u8>) -> Self {
        Self::strtab_like(index, b".strtab".to_vec(), data)
    }

    fn strtab_like(index: u16, name: Vec<u8>, data: Vec<u8>) -> Self {
        Self {
            index,
            name,
            sh_type: SHT_STRTAB,
            flags: 0,
            addr: 0,
            size: data.len() as u64,
            link: 0,
            info: 0,
            addr_align: 1,
            entsize: 0,
            data,
        }
    }
}

/// A Global Offset Table section.
///
/// A GOT is an ordinary `SHT_PROGBITS` section with a fixed flag set; this
/// view keeps only the fields a GOT actually varies in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GotSection {
    /// Index in the section-header table.
    pub index: u16,
    /// Section name, conventionally `.got` or `.got.plt`.
    pub name: Vec<u8>,
    /// Virtual address of the table.
    pub addr: u64,
    /// Required alignment of `addr`.
    pub addr_align: u64,
    /// Size of one table slot.
    pub entsize: u64,
    /// Slot payload.
    pub data: Vec<u8>,
}

impl GotSection {
    /// Expands the GOT back into the section it is stored as.
    ///
    /// `Section::as_got` on the result reproduces this GOT, so the two
    /// conversions form a lossless round trip.
    pub fn as_section(&self) -> Section {
        Section {
            index: self.index,
            name: self.name.clone(),
            sh_type: SHT_PROGBITS,
            flags: GOT_FLAGS,
            addr: self.addr,
            size: self.data.len() as u64,
            link: 0,
            info: 0,
            addr_align: self.addr_align,
            entsize: self.entsize,
            data: self.data.clone(),
        }
    }
}
