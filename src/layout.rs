//! The layout planner.
//!
//! Laying out an ELF file is circular on paper: the header records the
//! offset of the program-header table, the program headers record segment
//! offsets, and section alignment can push everything downstream further
//! out. The engine breaks the cycle with two phases. This module is phase
//! one: a walk over the region tree that assigns every region its final
//! file offset without emitting a byte. Phase two ([`Layout::bytes`]) then
//! replays the same walk and writes the image using only the precomputed
//! offsets.

use crate::error::layout_error;
use crate::file::{DataRegion, ElfFile};
use crate::section::Section;
use crate::segment::Segment;
use crate::strtab::StringTable;
use crate::symtab;
use crate::Result;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use elf::abi::{PF_R, PF_W, PF_X, PT_GNU_RELRO, PT_GNU_STACK};

/// A program-header table entry with its final file offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phdr {
    /// Index in the program-header table.
    pub index: u16,
    /// `p_type` word.
    pub p_type: u32,
    /// `p_flags` word.
    pub flags: u32,
    /// File offset of the first byte of the segment.
    pub offset: u64,
    /// Virtual address.
    pub vaddr: u64,
    /// Physical address.
    pub paddr: u64,
    /// Number of file bytes, padding included.
    pub file_size: u64,
    /// Number of memory bytes.
    pub mem_size: u64,
    /// Mapping alignment.
    pub align: u64,
}

/// A section bound to its name offset and final file offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Shdr {
    /// The section as it will be described by the header table. Synthesized
    /// sections (`.shstrtab`, `.strtab`, `.symtab`) appear here with their
    /// finished payloads.
    pub section: Section,
    /// Offset of the section's name inside `.shstrtab`.
    pub name_offset: u64,
    /// File offset of the section payload.
    pub offset: u64,
}

impl Shdr {
    /// The `sh_offset` value recorded in the section-header table.
    ///
    /// For an empty section the recorded offset is nudged forward until it
    /// agrees with the section's address modulo its alignment. Loaders
    /// read the offset of empty sections, so this quirk is preserved
    /// bit-exactly even though no payload bytes exist; the planner's size
    /// accounting is unaffected.
    pub fn file_offset(&self) -> u64 {
        let align = self.section.addr_align;
        if self.section.data.is_empty() && align > 1 {
            self.offset + (self.section.addr % align + align - self.offset % align) % align
        } else {
            self.offset
        }
    }
}

/// The fully planned layout of an [`ElfFile`].
///
/// A `Layout` is a snapshot: it borrows the file it was derived from, so
/// the borrow checker enforces that mutating the file invalidates any
/// outstanding layout.
#[derive(Debug)]
pub struct Layout<'file> {
    pub(crate) file: &'file ElfFile,
    pub(crate) shstrtab: StringTable,
    pub(crate) strtab: StringTable,
    pub(crate) strtab_index: u32,
    pub(crate) phnum: u16,
    pub(crate) shnum: u16,
    pub(crate) size: u64,
    pub(crate) phdr_table_offset: u64,
    pub(crate) shdr_table_offset: u64,
    pub(crate) shstrndx: u16,
    pub(crate) phdrs: BTreeMap<u16, Phdr>,
    pub(crate) shdrs: BTreeMap<u16, Shdr>,
}

pub(crate) fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

impl ElfFile {
    /// Plans the layout of this file.
    ///
    /// Walks the region tree in file order, assigning every region and
    /// table entry its final file offset and synthesizing the string and
    /// symbol table sections. Fails with [`crate::Error::Layout`] on any
    /// structural violation; on success the returned [`Layout`] can emit
    /// the image infallibly.
    pub fn layout(&self) -> Result<Layout<'_>> {
        let phnum = self.segment_count()
            + self.gnu_stack.is_some() as usize
            + self.relro_regions.len();
        if phnum > usize::from(u16::MAX) {
            return Err(layout_error(format!(
                "program header count {phnum} exceeds 65535"
            )));
        }
        let section_names = self.section_names();
        let shnum = section_names.len() + 1;
        if shnum > usize::from(u16::MAX) {
            return Err(layout_error(format!(
                "section header count {shnum} exceeds 65535"
            )));
        }

        let shstrtab = StringTable::build(&section_names);
        let strtab = StringTable::build(self.symbol_names());
        let strtab_index = u32::from(self.strtab_section_index().unwrap_or(0));

        let mut layout = Layout {
            file: self,
            shstrtab,
            strtab,
            strtab_index,
            phnum: phnum as u16,
            shnum: shnum as u16,
            size: 0,
            phdr_table_offset: 0,
            shdr_table_offset: 0,
            shstrndx: 0,
            phdrs: BTreeMap::new(),
            shdrs: BTreeMap::new(),
        };
        layout.shdrs.insert(
            0,
            Shdr {
                section: Section::null(),
                name_offset: 0,
                offset: 0,
            },
        );

        layout.plan_regions(&self.regions, false)?;
        layout.attach_gnu_phdrs()?;
        Ok(layout)
    }
}

impl<'file> Layout<'file> {
    /// Total size of the emitted image in bytes.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// File offset of the program-header table.
    #[inline]
    pub fn phdr_table_offset(&self) -> u64 {
        self.phdr_table_offset
    }

    /// File offset of the section-header table.
    #[inline]
    pub fn shdr_table_offset(&self) -> u64 {
        self.shdr_table_offset
    }

    /// Section-header index of `.shstrtab`.
    #[inline]
    pub fn shstrndx(&self) -> u16 {
        self.shstrndx
    }

    /// Number of program-header table entries.
    #[inline]
    pub fn phnum(&self) -> u16 {
        self.phnum
    }

    /// Number of section-header table entries, the null entry included.
    #[inline]
    pub fn shnum(&self) -> u16 {
        self.shnum
    }

    /// The program headers in index order.
    pub fn phdrs(&self) -> impl Iterator<Item = &Phdr> {
        self.phdrs.values()
    }

    /// The section headers keyed by section index.
    pub fn shdrs(&self) -> impl Iterator<Item = (u16, &Shdr)> {
        self.shdrs.iter().map(|(&index, shdr)| (index, shdr))
    }

    /// Point lookup of a program header.
    pub fn phdr(&self, index: u16) -> Option<&Phdr> {
        self.phdrs.get(&index)
    }

    /// Point lookup of a section header.
    pub fn shdr(&self, index: u16) -> Option<&Shdr> {
        self.shdrs.get(&index)
    }

    fn plan_regions(&mut self, regions: &[DataRegion], in_load: bool) -> Result<()> {
        for region in regions {
            self.plan_region(region, in_load)?;
        }
        Ok(())
    }

    fn plan_region(&mut self, region: &DataRegion, in_load: bool) -> Result<()> {
        let class = self.file.header.class;
        match region {
            DataRegion::ElfHeader => {
                if self.size != 0 {
                    return Err(layout_error(format!(
                        "ELF header must be at offset 0, found it at {:#x}",
                        self.size
                    )));
                }
                self.size += class.ehdr_size();
            }
            DataRegion::SegmentHeaders => {
                let align = class.phdr_align();
                if self.size % align != 0 {
                    return Err(layout_error(format!(
                        "program header table at offset {:#x} is not aligned to {align}",
                        self.size
                    )));
                }
                self.phdr_table_offset = self.size;
                self.size += u64::from(self.phnum) * class.phdr_entry_size();
            }
            DataRegion::Segment(segment) => {
                self.plan_segment(segment)?;
            }
            DataRegion::SectionHeaders => {
                if in_load {
                    return Err(layout_error(
                        "Section headers should not be within a segment",
                    ));
                }
                self.size = align_up(self.size, class.shdr_align());
                self.shdr_table_offset = self.size;
                self.size += u64::from(self.shnum) * class.shdr_entry_size();
            }
            DataRegion::SectionNameTable { index } => {
                self.shstrndx = *index;
                let section = Section::shstrtab(*index, self.shstrtab.data().to_vec());
                self.add_section(section, in_load)?;
            }
            DataRegion::Strtab { index } => {
                let section = Section::strtab(*index, self.strtab.data().to_vec());
                self.add_section(section, in_load)?;
            }
            DataRegion::Symtab(table) => {
                let data =
                    symtab::serialize(class, self.file.header.encoding, &self.strtab, table)?;
                let section = symtab::section(class, table, self.strtab_index, data);
                self.add_section(section, in_load)?;
            }
            DataRegion::Got(got) => {
                self.add_section(got.as_section(), in_load)?;
            }
            DataRegion::Section(section) => {
                self.add_section(section.clone(), in_load)?;
            }
            DataRegion::Raw(bytes) => {
                self.size += bytes.len() as u64;
            }
        }
        Ok(())
    }

    fn plan_segment(&mut self, segment: &Segment) -> Result<()> {
        let start = self.size;
        self.plan_regions(&segment.regions, true)?;
        let file_size = self.size - start;

        if file_size > 0
            && segment.align > 1
            && start % segment.align != segment.vaddr % segment.align
        {
            return Err(layout_error(format!(
                "segment {}: file offset {:#x} and virtual address {:#x} \
                 disagree modulo alignment {:#x}",
                segment.index, start, segment.vaddr, segment.align
            )));
        }
        if self.phdrs.contains_key(&segment.index) {
            return Err(layout_error(format!(
                "Segment index {} already exists",
                segment.index
            )));
        }
        self.phdrs.insert(
            segment.index,
            Phdr {
                index: segment.index,
                p_type: segment.p_type,
                flags: segment.flags,
                offset: start,
                vaddr: segment.vaddr,
                paddr: segment.paddr,
                file_size,
                mem_size: segment.mem_size.resolve(file_size),
                align: segment.align,
            },
        );
        Ok(())
    }

    fn add_section(&mut self, section: Section, in_load: bool) -> Result<()> {
        let align = section.addr_align.max(1);
        if !section.data.is_empty() {
            if section.addr % align != 0 {
                return Err(layout_error(format!(
                    "section {}: address {:#x} is not aligned to {align}",
                    String::from_utf8_lossy(&section.name),
                    section.addr
                )));
            }
            // Inside a segment the engine may not pad: padding would shift
            // the segment's own view of the file. The author arranges the
            // offset with preceding raw filler instead.
            if in_load && self.size % align != 0 {
                return Err(layout_error(format!(
                    "section {} inside a segment sits at offset {:#x}, \
                     which is not aligned to {align}",
                    String::from_utf8_lossy(&section.name),
                    self.size
                )));
            }
        }
        if self.shdrs.contains_key(&section.index) {
            return Err(layout_error(format!(
                "Section index {} already exists",
                section.index
            )));
        }
        if !in_load && !section.data.is_empty() {
            self.size = align_up(self.size, align);
        }
        let name_offset = self.shstrtab.offset(&section.name)?;
        let offset = self.size;
        self.size += section.data.len() as u64;
        self.shdrs.insert(
            section.index,
            Shdr {
                section,
                name_offset,
                offset,
            },
        );
        Ok(())
    }

    // PT_GNU_STACK and PT_GNU_RELRO have no region of their own; their
    // program headers are attached once every segment's Phdr is known.
    fn attach_gnu_phdrs(&mut self) -> Result<()> {
        let file = self.file;
        if let Some(stack) = &file.gnu_stack {
            if self.phdrs.contains_key(&stack.index) {
                return Err(layout_error(format!(
                    "Segment index {} already exists",
                    stack.index
                )));
            }
            let mut flags = PF_R | PF_W;
            if stack.is_executable {
                flags |= PF_X;
            }
            self.phdrs.insert(
                stack.index,
                Phdr {
                    index: stack.index,
                    p_type: PT_GNU_STACK,
                    flags,
                    offset: 0,
                    vaddr: 0,
                    paddr: 0,
                    file_size: 0,
                    mem_size: 0,
                    align: 8,
                },
            );
        }
        for relro in &file.relro_regions {
            let referenced = self.phdrs.get(&relro.ref_segment_index).ok_or_else(|| {
                layout_error(format!(
                    "relro region {} references segment index {}, which does not exist",
                    relro.index, relro.ref_segment_index
                ))
            })?;
            let delta = relro.vaddr.checked_sub(referenced.vaddr).ok_or_else(|| {
                layout_error(format!(
                    "relro region {} starts at {:#x}, below its segment's \
                     virtual address {:#x}",
                    relro.index, relro.vaddr, referenced.vaddr
                ))
            })?;
            let offset = referenced.offset + delta;
            if self.phdrs.contains_key(&relro.index) {
                return Err(layout_error(format!(
                    "Segment index {} already exists",
                    relro.index
                )));
            }
            self.phdrs.insert(
                relro.index,
                Phdr {
                    index: relro.index,
                    p_type: PT_GNU_RELRO,
                    flags: PF_R,
                    offset,
                    vaddr: relro.vaddr,
                    paddr: relro.vaddr,
                    file_size: relro.size,
                    mem_size: relro.size,
                    align: 1,
                },
            );
        }
        Ok(())
    }
}
