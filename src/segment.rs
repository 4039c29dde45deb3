//! Segments, segment nesting, and the GNU stack/relro descriptors.

use crate::file::DataRegion;
use alloc::vec::Vec;

/// How a segment's `p_memsz` is derived from its file size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemSize {
    /// The memory size is at least this value; a larger file size wins.
    Absolute(u64),
    /// The memory size is the file size plus this many bytes (e.g. `.bss`).
    Relative(u64),
}

impl MemSize {
    #[inline]
    pub(crate) fn resolve(self, file_size: u64) -> u64 {
        match self {
            MemSize::Absolute(at_least) => file_size.max(at_least),
            MemSize::Relative(extra) => file_size + extra,
        }
    }
}

/// A loadable-segment wrapper around an ordered sub-tree of regions.
///
/// The segment's file footprint is exactly the footprint of its children;
/// the layout engine never inserts padding inside a segment, because that
/// would silently shift the loader's view of the mapped bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Index of this segment in the program-header table.
    pub index: u16,
    /// `p_type` word, e.g. `PT_LOAD`. Opaque to the engine.
    pub p_type: u32,
    /// `p_flags` word. Opaque to the engine.
    pub flags: u32,
    /// Virtual address the segment is mapped at.
    pub vaddr: u64,
    /// Physical address, usually equal to `vaddr`.
    pub paddr: u64,
    /// Mapping alignment. The file offset and `vaddr` must agree modulo
    /// this value whenever the segment carries file bytes.
    pub align: u64,
    /// Memory-size rule.
    pub mem_size: MemSize,
    /// The regions contained in this segment, in file order.
    pub regions: Vec<DataRegion>,
}

/// Descriptor for a `PT_GNU_STACK` program header.
///
/// Carries no file bytes; it only tells the loader whether the stack
/// needs to be executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GnuStack {
    /// Index of the synthesized program header.
    pub index: u16,
    /// Whether the stack is mapped with execute permission.
    pub is_executable: bool,
}

/// Descriptor for a `PT_GNU_RELRO` program header.
///
/// The file range is not stored: it is derived at layout time from the
/// referenced segment's program header, so the relro region always agrees
/// with wherever that segment ends up in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GnuRelroRegion {
    /// Index of the synthesized program header.
    pub index: u16,
    /// Index of the segment whose mapping this region covers.
    pub ref_segment_index: u16,
    /// Virtual address of the read-only-after-relocation range.
    pub vaddr: u64,
    /// Length of the range in bytes.
    pub size: u64,
}
