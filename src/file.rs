//! The editable region tree.
//!
//! An [`ElfFile`] is an ordered sequence of [`DataRegion`]s that mirrors the
//! final file from the first byte to the last: headers, segments, sections,
//! tables and raw filler all appear in the order they will be written.
//! Callers edit this tree freely and then ask for a [`crate::Layout`].

use crate::ehdr::ElfHeader;
use crate::section::{GotSection, Section};
use crate::segment::{GnuRelroRegion, GnuStack, Segment};
use crate::strtab::StringTable;
use crate::symtab::SymbolTable;
use crate::Result;
use alloc::vec::Vec;

/// One node of the editable tree.
///
/// The sentinel variants (`ElfHeader`, `SegmentHeaders`, `SectionHeaders`,
/// `SectionNameTable`, `Strtab`) carry no payload of their own; they mark
/// where the corresponding derived table is placed in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum DataRegion {
    /// Position of the 52/64-byte ELF header. Must be the first byte of the file.
    ElfHeader,
    /// Position of the program-header table.
    SegmentHeaders,
    /// A segment wrapping its own ordered sub-tree of regions.
    Segment(Segment),
    /// Position of the section-header table. Never valid inside a segment.
    SectionHeaders,
    /// Position of the `.shstrtab` section; the payload is synthesized from
    /// all section names during layout.
    SectionNameTable {
        /// Section-header index of `.shstrtab`.
        index: u16,
    },
    /// Position of the `.strtab` section; the payload is synthesized from
    /// all symbol names during layout.
    Strtab {
        /// Section-header index of `.strtab`.
        index: u16,
    },
    /// The `.symtab` section with its full entries.
    Symtab(SymbolTable),
    /// A Global Offset Table section.
    Got(GotSection),
    /// An ordinary section.
    Section(Section),
    /// Uninterpreted bytes, typically alignment filler inside segments.
    Raw(Vec<u8>),
}

/// An editable ELF file: the header plus the ordered region tree.
///
/// # Example
/// ```
/// use elf_writer::{Class, DataRegion, ElfFile, ElfHeader, Encoding};
///
/// let mut file = ElfFile::new(ElfHeader {
///     class: Class::Elf64,
///     encoding: Encoding::Lsb,
///     osabi: 0,
///     abi_version: 0,
///     e_type: elf::abi::ET_REL,
///     e_machine: elf::abi::EM_X86_64,
///     e_entry: 0,
///     e_flags: 0,
/// });
/// file.regions.push(DataRegion::ElfHeader);
/// file.regions.push(DataRegion::SectionHeaders);
/// let layout = file.layout().unwrap();
/// assert_eq!(layout.size(), 128);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ElfFile {
    /// The file header. Immutable during layout.
    pub header: ElfHeader,
    /// Top-level regions in file order.
    pub regions: Vec<DataRegion>,
    /// Optional `PT_GNU_STACK` descriptor.
    pub gnu_stack: Option<GnuStack>,
    /// `PT_GNU_RELRO` descriptors.
    pub relro_regions: Vec<GnuRelroRegion>,
}

impl ElfFile {
    /// Creates an empty file with the given header.
    pub fn new(header: ElfHeader) -> Self {
        Self {
            header,
            regions: Vec::new(),
            gnu_stack: None,
            relro_regions: Vec::new(),
        }
    }

    /// Offers every section-like region to `fun`, rebuilding the tree from
    /// its results. Returning `None` deletes the region.
    ///
    /// Besides ordinary sections, `fun` sees GOT regions and the
    /// `.shstrtab` sentinel expanded into their section form. Returned
    /// sections are re-normalized by name: `.shstrtab` becomes the name
    /// table sentinel again, and `.got`/`.got.plt` must validate as a GOT.
    /// Sibling order is preserved; segments are descended into.
    pub fn update_sections<F>(&mut self, mut fun: F) -> Result<()>
    where
        F: FnMut(Section) -> Option<Section>,
    {
        let names = StringTable::build(self.section_names());
        let updated = update_sections_in(self.regions.clone(), &mut fun, &names)?;
        self.regions = updated;
        Ok(())
    }

    /// Offers every segment (innermost first) to `fun`. Returning `None`
    /// deletes the segment together with its children.
    pub fn update_segments<F>(&mut self, mut fun: F)
    where
        F: FnMut(Segment) -> Option<Segment>,
    {
        let regions = core::mem::take(&mut self.regions);
        self.regions = update_segments_in(regions, &mut fun);
    }

    /// Offers every region (segment children first) to `fun`. Returning
    /// `None` deletes the region.
    pub fn update_regions<F>(&mut self, mut fun: F)
    where
        F: FnMut(DataRegion) -> Option<DataRegion>,
    {
        let regions = core::mem::take(&mut self.regions);
        self.regions = update_regions_in(regions, &mut fun);
    }

    /// All ordinary sections in file order, descending into segments.
    pub fn sections(&self) -> Vec<&Section> {
        let mut out = Vec::new();
        visit_regions(&self.regions, &mut |region| {
            if let DataRegion::Section(section) = region {
                out.push(section);
            }
        });
        out
    }

    /// All segments in file order, outermost first.
    pub fn segments(&self) -> Vec<&Segment> {
        let mut out = Vec::new();
        visit_regions(&self.regions, &mut |region| {
            if let DataRegion::Segment(segment) = region {
                out.push(segment);
            }
        });
        out
    }

    /// Finds the first ordinary section with the given name.
    pub fn find_section_by_name(&self, name: &[u8]) -> Option<&Section> {
        self.sections()
            .into_iter()
            .find(|section| section.name == name)
    }

    /// Deletes every section or GOT region with the given name.
    pub fn remove_section_by_name(&mut self, name: &[u8]) {
        self.update_regions(|region| match &region {
            DataRegion::Section(section) if section.name == name => None,
            DataRegion::Got(got) if got.name == name => None,
            _ => Some(region),
        });
    }

    /// Names of every section-like region in file order, including the
    /// synthesized table names. Feeds the `.shstrtab` builder.
    pub(crate) fn section_names(&self) -> Vec<Vec<u8>> {
        let mut names = Vec::new();
        visit_regions(&self.regions, &mut |region| match region {
            DataRegion::SectionNameTable { .. } => names.push(b".shstrtab".to_vec()),
            DataRegion::Strtab { .. } => names.push(b".strtab".to_vec()),
            DataRegion::Symtab(_) => names.push(b".symtab".to_vec()),
            DataRegion::Got(got) => names.push(got.name.clone()),
            DataRegion::Section(section) => names.push(section.name.clone()),
            _ => {}
        });
        names
    }

    /// Names of every symbol across all symbol tables. Feeds the `.strtab`
    /// builder.
    pub(crate) fn symbol_names(&self) -> Vec<Vec<u8>> {
        let mut names = Vec::new();
        visit_regions(&self.regions, &mut |region| {
            if let DataRegion::Symtab(table) = region {
                names.extend(table.entries.iter().map(|entry| entry.name.clone()));
            }
        });
        names
    }

    /// Number of segments in the tree, nested ones included.
    pub(crate) fn segment_count(&self) -> usize {
        self.segments().len()
    }

    /// Section-header index of the `.strtab` sentinel, if present.
    pub(crate) fn strtab_section_index(&self) -> Option<u16> {
        let mut found = None;
        visit_regions(&self.regions, &mut |region| {
            if let DataRegion::Strtab { index } = region {
                found.get_or_insert(*index);
            }
        });
        found
    }
}

fn visit_regions<'a, F>(regions: &'a [DataRegion], fun: &mut F)
where
    F: FnMut(&'a DataRegion),
{
    for region in regions {
        fun(region);
        if let DataRegion::Segment(segment) = region {
            visit_regions(&segment.regions, fun);
        }
    }
}

fn update_regions_in<F>(regions: Vec<DataRegion>, fun: &mut F) -> Vec<DataRegion>
where
    F: FnMut(DataRegion) -> Option<DataRegion>,
{
    let mut out = Vec::with_capacity(regions.len());
    for region in regions {
        let region = match region {
            DataRegion::Segment(mut segment) => {
                segment.regions = update_regions_in(segment.regions, fun);
                DataRegion::Segment(segment)
            }
            other => other,
        };
        if let Some(region) = fun(region) {
            out.push(region);
        }
    }
    out
}

fn update_segments_in<F>(regions: Vec<DataRegion>, fun: &mut F) -> Vec<DataRegion>
where
    F: FnMut(Segment) -> Option<Segment>,
{
    let mut out = Vec::with_capacity(regions.len());
    for region in regions {
        match region {
            DataRegion::Segment(mut segment) => {
                segment.regions = update_segments_in(segment.regions, fun);
                if let Some(segment) = fun(segment) {
                    out.push(DataRegion::Segment(segment));
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn update_sections_in<F>(
    regions: Vec<DataRegion>,
    fun: &mut F,
    names: &StringTable,
) -> Result<Vec<DataRegion>>
where
    F: FnMut(Section) -> Option<Section>,
{
    let mut out = Vec::with_capacity(regions.len());
    for region in regions {
        match region {
            DataRegion::Segment(mut segment) => {
                segment.regions = update_sections_in(segment.regions, fun, names)?;
                out.push(DataRegion::Segment(segment));
            }
            DataRegion::Section(section) => {
                if let Some(section) = fun(section) {
                    out.push(normalize_section(section)?);
                }
            }
            DataRegion::Got(got) => {
                if let Some(section) = fun(got.as_section()) {
                    out.push(normalize_section(section)?);
                }
            }
            DataRegion::SectionNameTable { index } => {
                let expanded = Section::shstrtab(index, names.data().to_vec());
                if let Some(section) = fun(expanded) {
                    out.push(normalize_section(section)?);
                }
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

// A section returned by the user callback goes back into the tree under the
// region variant its name implies.
fn normalize_section(section: Section) -> Result<DataRegion> {
    if section.name == b".shstrtab" {
        return Ok(DataRegion::SectionNameTable {
            index: section.index,
        });
    }
    if section.name == b".got" || section.name == b".got.plt" {
        return Ok(DataRegion::Got(section.as_got()?));
    }
    Ok(DataRegion::Section(section))
}
