//! ELF classes, data encodings and the file header.

use elf::abi::{ELFCLASS32, ELFCLASS64, ELFDATA2LSB, ELFDATA2MSB};

/// Address width of an ELF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// `ELFCLASS32`: 4-byte addresses and offsets.
    Elf32,
    /// `ELFCLASS64`: 8-byte addresses and offsets.
    Elf64,
}

impl Class {
    /// Size of the ELF header, including the 16-byte identification block.
    #[inline]
    pub const fn ehdr_size(self) -> u64 {
        match self {
            Class::Elf32 => 52,
            Class::Elf64 => 64,
        }
    }

    /// Size of one program-header table entry.
    #[inline]
    pub const fn phdr_entry_size(self) -> u64 {
        match self {
            Class::Elf32 => 32,
            Class::Elf64 => 56,
        }
    }

    /// Size of one section-header table entry.
    #[inline]
    pub const fn shdr_entry_size(self) -> u64 {
        match self {
            Class::Elf32 => 40,
            Class::Elf64 => 64,
        }
    }

    /// Size of one symbol-table entry.
    #[inline]
    pub const fn sym_entry_size(self) -> u64 {
        match self {
            Class::Elf32 => 16,
            Class::Elf64 => 24,
        }
    }

    /// Required file alignment of the program-header table.
    #[inline]
    pub const fn phdr_align(self) -> u64 {
        match self {
            Class::Elf32 => 4,
            Class::Elf64 => 8,
        }
    }

    /// File alignment of the section-header table.
    #[inline]
    pub const fn shdr_align(self) -> u64 {
        match self {
            Class::Elf32 => 4,
            Class::Elf64 => 8,
        }
    }

    /// Address alignment of a synthesized `.symtab` section.
    #[inline]
    pub const fn sym_align(self) -> u64 {
        match self {
            Class::Elf32 => 4,
            Class::Elf64 => 8,
        }
    }

    #[inline]
    pub(crate) const fn ident_byte(self) -> u8 {
        match self {
            Class::Elf32 => ELFCLASS32,
            Class::Elf64 => ELFCLASS64,
        }
    }
}

/// Byte order applied to every multibyte field of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// `ELFDATA2LSB`: little-endian.
    Lsb,
    /// `ELFDATA2MSB`: big-endian.
    Msb,
}

impl Encoding {
    #[inline]
    pub(crate) const fn ident_byte(self) -> u8 {
        match self {
            Encoding::Lsb => ELFDATA2LSB,
            Encoding::Msb => ELFDATA2MSB,
        }
    }
}

/// The ELF file header.
///
/// Holds everything the 16-byte identification block and the remaining
/// header fields need, except for the values that are derived during
/// layout (`e_phoff`, `e_shoff`, the table counts and `e_shstrndx`).
/// The header is immutable while a layout is being computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElfHeader {
    /// Address width of the file.
    pub class: Class,
    /// Byte order of the file.
    pub encoding: Encoding,
    /// OS ABI identification byte, e.g. `ELFOSABI_SYSV`.
    pub osabi: u8,
    /// ABI version byte, almost always 0.
    pub abi_version: u8,
    /// Object file type, e.g. `ET_REL` or `ET_DYN`. Opaque to the engine.
    pub e_type: u16,
    /// Target machine, e.g. `EM_X86_64`. Opaque to the engine.
    pub e_machine: u16,
    /// Entry point virtual address.
    pub e_entry: u64,
    /// Processor-specific flags.
    pub e_flags: u32,
}
