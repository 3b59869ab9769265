//! ELF64 program headers (segments).

use crate::record::{FieldReader, Record};

/// Program header type: unused entry.
pub const PT_NULL: u32 = 0;

/// Program header type: loadable segment.
pub const PT_LOAD: u32 = 1;

/// Program header type: dynamic linking information.
pub const PT_DYNAMIC: u32 = 2;

/// Program header type: interpreter path.
pub const PT_INTERP: u32 = 3;

/// Program header type: auxiliary note.
pub const PT_NOTE: u32 = 4;

/// Program header type: the program header table itself.
pub const PT_PHDR: u32 = 6;

/// Program header type: thread-local storage template.
pub const PT_TLS: u32 = 7;

/// Size of an ELF64 program header entry (56 bytes).
pub const ELF64_PHDR_SIZE: usize = 56;

bitflags::bitflags! {
    /// Segment permission flags (`p_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SegmentFlags: u32 {
        /// Executable.
        const X = 1 << 0;
        /// Writable.
        const W = 1 << 1;
        /// Readable.
        const R = 1 << 2;
    }
}

/// Parsed ELF64 program header entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    /// Segment type.
    pub p_type: u32,
    /// Segment flags (read/write/execute).
    pub p_flags: u32,
    /// Offset of the segment data in the file.
    pub p_offset: u64,
    /// Virtual address of the segment.
    pub p_vaddr: u64,
    /// Physical address of the segment.
    pub p_paddr: u64,
    /// Size of the segment data in the file.
    pub p_filesz: u64,
    /// Size of the segment in memory.
    pub p_memsz: u64,
    /// Required alignment.
    pub p_align: u64,
}

impl Record for ProgramHeader {
    const SIZE: usize = ELF64_PHDR_SIZE;

    fn decode(r: &mut FieldReader<'_>) -> Self {
        Self {
            p_type: r.u32(),
            p_flags: r.u32(),
            p_offset: r.u64(),
            p_vaddr: r.u64(),
            p_paddr: r.u64(),
            p_filesz: r.u64(),
            p_memsz: r.u64(),
            p_align: r.u64(),
        }
    }
}

impl ProgramHeader {
    /// Permission flags, unknown bits dropped.
    #[must_use]
    pub fn flags(&self) -> SegmentFlags {
        SegmentFlags::from_bits_truncate(self.p_flags)
    }

    /// Returns `true` for `PT_LOAD` segments.
    #[must_use]
    pub fn is_load(&self) -> bool {
        self.p_type == PT_LOAD
    }
}

/// A loadable segment together with its file-backed bytes.
#[derive(Debug)]
pub struct LoadSegment<'a> {
    /// Virtual address where this segment should be mapped.
    pub vaddr: u64,
    /// File content of this segment (may be shorter than `memsz`; remainder is zero-filled).
    pub data: &'a [u8],
    /// Total size of the segment in memory.
    pub memsz: u64,
    /// Segment permission flags.
    pub flags: SegmentFlags,
}

impl<'a> LoadSegment<'a> {
    /// Pair a `PT_LOAD` header with its bytes in `data`.
    ///
    /// A segment whose file range runs past the end of `data` gets whatever
    /// part of it is present.
    pub(crate) fn new(phdr: &ProgramHeader, data: &'a [u8]) -> Self {
        let start = usize::try_from(phdr.p_offset)
            .unwrap_or(usize::MAX)
            .min(data.len());
        let size = usize::try_from(phdr.p_filesz).unwrap_or(usize::MAX);
        let end = start.saturating_add(size).min(data.len());
        Self {
            vaddr: phdr.p_vaddr,
            data: if size == 0 { &[] } else { &data[start..end] },
            memsz: phdr.p_memsz,
            flags: phdr.flags(),
        }
    }
}
