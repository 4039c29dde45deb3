//! Second-phase byte emission.
//!
//! [`Layout::bytes`] replays the planner's walk over the region tree and
//! writes the image. Every offset was already computed and validated, so
//! this phase cannot fail; any divergence from the planned offsets is a
//! bug in the engine and trips an assertion rather than producing a
//! corrupt image.

use crate::ehdr::{Class, Encoding};
use crate::file::DataRegion;
use crate::layout::{Layout, Phdr, Shdr};
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use elf::abi::EV_CURRENT;

/// An output buffer that routes every multibyte store through the image's
/// byte order.
pub(crate) struct EmitBuf {
    out: Vec<u8>,
    encoding: Encoding,
}

impl EmitBuf {
    pub(crate) fn new(encoding: Encoding) -> Self {
        Self {
            out: Vec::new(),
            encoding,
        }
    }

    pub(crate) fn with_capacity(encoding: Encoding, capacity: usize) -> Self {
        Self {
            out: Vec::with_capacity(capacity),
            encoding,
        }
    }

    #[inline]
    pub(crate) fn write_u8(&mut self, value: u8) {
        self.out.push(value);
    }

    #[inline]
    pub(crate) fn write_u16(&mut self, value: u16) {
        let mut bytes = [0u8; 2];
        match self.encoding {
            Encoding::Lsb => LittleEndian::write_u16(&mut bytes, value),
            Encoding::Msb => BigEndian::write_u16(&mut bytes, value),
        }
        self.out.extend_from_slice(&bytes);
    }

    #[inline]
    pub(crate) fn write_u32(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        match self.encoding {
            Encoding::Lsb => LittleEndian::write_u32(&mut bytes, value),
            Encoding::Msb => BigEndian::write_u32(&mut bytes, value),
        }
        self.out.extend_from_slice(&bytes);
    }

    #[inline]
    pub(crate) fn write_u64(&mut self, value: u64) {
        let mut bytes = [0u8; 8];
        match self.encoding {
            Encoding::Lsb => LittleEndian::write_u64(&mut bytes, value),
            Encoding::Msb => BigEndian::write_u64(&mut bytes, value),
        }
        self.out.extend_from_slice(&bytes);
    }

    /// Writes an address-sized word: 4 bytes in `ELFCLASS32`, 8 in `ELFCLASS64`.
    #[inline]
    pub(crate) fn write_word(&mut self, class: Class, value: u64) {
        match class {
            Class::Elf32 => self.write_u32(value as u32),
            Class::Elf64 => self.write_u64(value),
        }
    }

    #[inline]
    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.out.extend_from_slice(bytes);
    }

    /// Zero-pads the buffer up to the given alignment.
    pub(crate) fn pad_to(&mut self, align: u64) {
        while self.out.len() as u64 % align != 0 {
            self.out.push(0);
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> u64 {
        self.out.len() as u64
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.out
    }
}

impl Layout<'_> {
    /// Emits the planned image.
    ///
    /// The result is exactly [`Layout::size`] bytes long and reproduces
    /// byte-for-byte the offsets the planner assigned.
    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = EmitBuf::with_capacity(self.file.header.encoding, self.size as usize);
        self.emit_regions(&self.file.regions, false, &mut buf);
        assert_eq!(
            buf.len(),
            self.size,
            "emitted image diverged from the planned layout"
        );
        buf.into_vec()
    }

    fn emit_regions(&self, regions: &[DataRegion], in_load: bool, buf: &mut EmitBuf) {
        for region in regions {
            match region {
                DataRegion::ElfHeader => {
                    debug_assert_eq!(buf.len(), 0);
                    self.emit_ehdr(buf);
                }
                DataRegion::SegmentHeaders => {
                    debug_assert_eq!(buf.len(), self.phdr_table_offset());
                    for phdr in self.phdrs() {
                        emit_phdr(self.file.header.class, phdr, buf);
                    }
                }
                DataRegion::Segment(segment) => {
                    self.emit_regions(&segment.regions, true, buf);
                }
                DataRegion::SectionHeaders => {
                    buf.pad_to(self.file.header.class.shdr_align());
                    debug_assert_eq!(buf.len(), self.shdr_table_offset());
                    for (_, shdr) in self.shdrs() {
                        emit_shdr(self.file.header.class, shdr, buf);
                    }
                }
                DataRegion::SectionNameTable { index } | DataRegion::Strtab { index } => {
                    self.emit_section_payload(*index, in_load, buf);
                }
                DataRegion::Symtab(table) => {
                    self.emit_section_payload(table.index, in_load, buf);
                }
                DataRegion::Got(got) => {
                    self.emit_section_payload(got.index, in_load, buf);
                }
                DataRegion::Section(section) => {
                    self.emit_section_payload(section.index, in_load, buf);
                }
                DataRegion::Raw(bytes) => {
                    buf.write_bytes(bytes);
                }
            }
        }
    }

    fn emit_ehdr(&self, buf: &mut EmitBuf) {
        let header = &self.file.header;
        let class = header.class;
        // 16-byte identification block.
        buf.write_bytes(&[0x7f, b'E', b'L', b'F']);
        buf.write_u8(class.ident_byte());
        buf.write_u8(header.encoding.ident_byte());
        buf.write_u8(EV_CURRENT);
        buf.write_u8(header.osabi);
        buf.write_u8(header.abi_version);
        buf.write_bytes(&[0u8; 7]);

        buf.write_u16(header.e_type);
        buf.write_u16(header.e_machine);
        buf.write_u32(u32::from(EV_CURRENT));
        buf.write_word(class, header.e_entry);
        buf.write_word(class, self.phdr_table_offset());
        buf.write_word(class, self.shdr_table_offset());
        buf.write_u32(header.e_flags);
        buf.write_u16(class.ehdr_size() as u16);
        buf.write_u16(class.phdr_entry_size() as u16);
        buf.write_u16(self.phnum());
        buf.write_u16(class.shdr_entry_size() as u16);
        buf.write_u16(self.shnum());
        buf.write_u16(self.shstrndx());
    }

    fn emit_section_payload(&self, index: u16, in_load: bool, buf: &mut EmitBuf) {
        let shdr = self
            .shdr(index)
            .expect("every planned section has a header entry");
        let section = &shdr.section;
        if !section.data.is_empty() {
            let align = section.addr_align.max(1);
            if in_load {
                // The planner already rejected unaligned in-segment sections.
                debug_assert_eq!(buf.len() % align, 0);
            } else {
                buf.pad_to(align);
            }
        }
        debug_assert_eq!(buf.len(), shdr.offset);
        buf.write_bytes(&section.data);
    }
}

// The two classes order program-header fields differently: p_flags sits
// second in ELFCLASS64 but seventh in ELFCLASS32.
fn emit_phdr(class: Class, phdr: &Phdr, buf: &mut EmitBuf) {
    match class {
        Class::Elf64 => {
            buf.write_u32(phdr.p_type);
            buf.write_u32(phdr.flags);
            buf.write_u64(phdr.offset);
            buf.write_u64(phdr.vaddr);
            buf.write_u64(phdr.paddr);
            buf.write_u64(phdr.file_size);
            buf.write_u64(phdr.mem_size);
            buf.write_u64(phdr.align);
        }
        Class::Elf32 => {
            buf.write_u32(phdr.p_type);
            buf.write_u32(phdr.offset as u32);
            buf.write_u32(phdr.vaddr as u32);
            buf.write_u32(phdr.paddr as u32);
            buf.write_u32(phdr.file_size as u32);
            buf.write_u32(phdr.mem_size as u32);
            buf.write_u32(phdr.flags);
            buf.write_u32(phdr.align as u32);
        }
    }
}

fn emit_shdr(class: Class, shdr: &Shdr, buf: &mut EmitBuf) {
    let section = &shdr.section;
    buf.write_u32(shdr.name_offset as u32);
    buf.write_u32(section.sh_type);
    buf.write_word(class, section.flags);
    buf.write_word(class, section.addr);
    buf.write_word(class, shdr.file_offset());
    buf.write_word(class, section.size);
    buf.write_u32(section.link);
    buf.write_u32(section.info);
    buf.write_word(class, section.addr_align);
    buf.write_word(class, section.entsize);
}
