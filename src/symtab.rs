//! Symbol tables and their class-specific serialization.

use crate::ehdr::{Class, Encoding};
use crate::emit::EmitBuf;
use crate::section::Section;
use crate::strtab::StringTable;
use crate::Result;
use alloc::vec::Vec;
use elf::abi::SHT_SYMTAB;

/// One `.symtab` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    /// Symbol name as raw bytes, resolved against `.strtab` at layout time.
    pub name: Vec<u8>,
    /// Binding half of `st_info`, e.g. `STB_LOCAL` or `STB_GLOBAL`.
    pub binding: u8,
    /// Type half of `st_info`, e.g. `STT_FUNC`.
    pub sym_type: u8,
    /// `st_other` visibility byte.
    pub other: u8,
    /// Index of the section this symbol is defined relative to.
    pub shndx: u16,
    /// Symbol value, usually an address.
    pub value: u64,
    /// Symbol size in bytes.
    pub size: u64,
}

impl SymbolEntry {
    /// The composite `st_info` byte.
    #[inline]
    pub fn st_info(&self) -> u8 {
        (self.binding << 4) | (self.sym_type & 0x0f)
    }
}

/// A full symbol table destined for a `.symtab` section.
///
/// Entries are serialized exactly as given; callers include the index-0
/// null entry themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    /// Index of the `.symtab` section in the section-header table.
    pub index: u16,
    /// The entries, in table order.
    pub entries: Vec<SymbolEntry>,
    /// Number of leading `STB_LOCAL` entries; becomes the section's `sh_info`.
    pub local_count: u32,
}

/// Serializes the table into the `.symtab` payload.
///
/// The 32-bit and 64-bit layouts differ in more than field width: the
/// 64-bit entry moves `value` and `size` to the end so the 8-byte fields
/// sit naturally aligned.
pub(crate) fn serialize(
    class: Class,
    encoding: Encoding,
    names: &StringTable,
    table: &SymbolTable,
) -> Result<Vec<u8>> {
    let mut buf = EmitBuf::new(encoding);
    for entry in &table.entries {
        let name_offset = names.offset(&entry.name)? as u32;
        match class {
            Class::Elf32 => {
                buf.write_u32(name_offset);
                buf.write_u32(entry.value as u32);
                buf.write_u32(entry.size as u32);
                buf.write_u8(entry.st_info());
                buf.write_u8(entry.other);
                buf.write_u16(entry.shndx);
            }
            Class::Elf64 => {
                buf.write_u32(name_offset);
                buf.write_u8(entry.st_info());
                buf.write_u8(entry.other);
                buf.write_u16(entry.shndx);
                buf.write_u64(entry.value);
                buf.write_u64(entry.size);
            }
        }
    }
    Ok(buf.into_vec())
}

/// Synthesizes the `.symtab` section wrapping a serialized payload.
///
/// `strtab_index` is the section-header index of `.strtab`, recorded in
/// `sh_link` so consumers can resolve the symbol names.
pub(crate) fn section(
    class: Class,
    table: &SymbolTable,
    strtab_index: u32,
    data: Vec<u8>,
) -> Section {
    Section {
        index: table.index,
        name: b".symtab".to_vec(),
        sh_type: SHT_SYMTAB,
        flags: 0,
        addr: 0,
        size: data.len() as u64,
        link: strtab_index,
        info: table.local_count,
        addr_align: class.sym_align(),
        entsize: class.sym_entry_size(),
        data,
    }
}
