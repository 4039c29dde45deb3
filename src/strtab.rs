//! Shared string tables with suffix merging.
//!
//! ELF string tables may store a short name as the tail of a longer one:
//! `"o"` can live inside `"foo"` provided the terminating `NUL` is shared.
//! [`StringTable::build`] performs this merging for a whole batch of names
//! at once by sorting the names in reversed orientation, so that a name
//! which is a suffix of another becomes a prefix of its neighbour and can
//! be dropped in a single adjacent-pair pass.

use crate::error::internal_error;
use crate::Result;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use hashbrown::HashMap;

/// An immutable, suffix-merged string table.
///
/// The payload always begins with a `NUL` byte so that offset 0 names the
/// empty string, and every retained name is `NUL`-terminated. Lookups
/// resolve the original names *and* every suffix of them.
///
/// # Example
/// ```
/// use elf_writer::strtab::StringTable;
///
/// let table = StringTable::build(["foo", "o", "bar"]);
/// assert_eq!(table.data(), b"\0bar\0foo\0");
/// assert_eq!(table.offset(b"o").unwrap(), 7);
/// ```
#[derive(Debug, Clone)]
pub struct StringTable {
    data: Vec<u8>,
    offsets: HashMap<Vec<u8>, u64>,
}

fn cmp_reversed(a: &[u8], b: &[u8]) -> Ordering {
    a.iter().rev().cmp(b.iter().rev())
}

fn is_suffix_of(a: &[u8], b: &[u8]) -> bool {
    a.len() <= b.len() && &b[b.len() - a.len()..] == a
}

impl StringTable {
    /// Builds a table from an ordered batch of names.
    ///
    /// Duplicates are removed, and any name that is a suffix of another
    /// name shares the longer name's storage.
    pub fn build<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let mut uniq: Vec<Vec<u8>> = names
            .into_iter()
            .map(|name| name.as_ref().to_vec())
            .filter(|name| !name.is_empty())
            .collect();
        // Reversed order turns the suffix relation into a prefix relation
        // between adjacent entries.
        uniq.sort_by(|a, b| cmp_reversed(a, b));
        uniq.dedup();

        let mut data = Vec::with_capacity(uniq.iter().map(|n| n.len() + 1).sum::<usize>() + 1);
        data.push(0);
        let mut offsets = HashMap::new();
        offsets.insert(Vec::new(), 0);

        for idx in (0..uniq.len()).rev() {
            if idx + 1 < uniq.len() && is_suffix_of(&uniq[idx], &uniq[idx + 1]) {
                continue;
            }
            let name = &uniq[idx];
            let base = data.len() as u64;
            data.extend_from_slice(name);
            data.push(0);
            for start in 0..name.len() {
                offsets
                    .entry(name[start..].to_vec())
                    .or_insert(base + start as u64);
            }
        }

        Self { data, offsets }
    }

    /// The raw table payload.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the offset assigned to `name`.
    ///
    /// Every name passed to [`StringTable::build`] resolves; asking for any
    /// other name means the layout engine registered its names incorrectly,
    /// which surfaces as [`crate::Error::Internal`].
    pub fn offset(&self, name: &[u8]) -> Result<u64> {
        if name.is_empty() {
            return Ok(0);
        }
        self.offsets.get(name).copied().ok_or_else(|| {
            internal_error(format!(
                "string table has no entry for {:?}",
                String::from_utf8_lossy(name)
            ))
        })
    }
}
