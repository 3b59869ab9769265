//! ELF64 section headers and string tables.

use alloc::string::String;

use crate::header::ElfError;
use crate::record::{FieldReader, Record};

/// Section type: inactive header.
pub const SHT_NULL: u32 = 0;

/// Section type: program-defined contents.
pub const SHT_PROGBITS: u32 = 1;

/// Section type: symbol table.
pub const SHT_SYMTAB: u32 = 2;

/// Section type: string table.
pub const SHT_STRTAB: u32 = 3;

/// Section type: relocation entries with addends.
pub const SHT_RELA: u32 = 4;

/// Section type: symbol hash table.
pub const SHT_HASH: u32 = 5;

/// Section type: dynamic linking information.
pub const SHT_DYNAMIC: u32 = 6;

/// Section type: notes.
pub const SHT_NOTE: u32 = 7;

/// Section type: occupies no file space (`.bss`).
pub const SHT_NOBITS: u32 = 8;

/// Section type: relocation entries without addends.
pub const SHT_REL: u32 = 9;

/// Section type: dynamic symbol table.
pub const SHT_DYNSYM: u32 = 11;

/// Special section index: undefined.
pub const SHN_UNDEF: u16 = 0;

/// Special section index: absolute value.
pub const SHN_ABS: u16 = 0xfff1;

/// Special section index: common symbol.
pub const SHN_COMMON: u16 = 0xfff2;

/// Name of the symbol table section.
pub const SYMTAB: &str = ".symtab";

/// Name of the symbol string table section.
pub const STRTAB: &str = ".strtab";

/// Size of an ELF64 section header entry (64 bytes).
pub const ELF64_SHDR_SIZE: usize = 64;

bitflags::bitflags! {
    /// Section attribute flags (`sh_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u64 {
        /// Writable data.
        const WRITE = 0x1;
        /// Occupies memory during execution.
        const ALLOC = 0x2;
        /// Executable machine instructions.
        const EXECINSTR = 0x4;
        /// May be merged to eliminate duplication.
        const MERGE = 0x10;
        /// Contains NUL-terminated strings.
        const STRINGS = 0x20;
        /// `sh_info` contains a section header table index.
        const INFO_LINK = 0x40;
        /// Preserve order after combining.
        const LINK_ORDER = 0x80;
        /// Member of a section group.
        const GROUP = 0x200;
        /// Holds thread-local storage.
        const TLS = 0x400;
    }
}

/// Parsed ELF64 section header entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    /// Offset into the section header string table for this section's name.
    pub sh_name: u32,
    /// Section type (`SHT_SYMTAB`, `SHT_STRTAB`, etc.).
    pub sh_type: u32,
    /// Section flags.
    pub sh_flags: u64,
    /// Virtual address of the section in memory (0 for non-loaded sections).
    pub sh_addr: u64,
    /// File offset of the section data.
    pub sh_offset: u64,
    /// Size of the section data in bytes.
    pub sh_size: u64,
    /// Associated section index (e.g., `.strtab` index for `.symtab`).
    pub sh_link: u32,
    /// Extra info (interpretation depends on section type).
    pub sh_info: u32,
    /// Required alignment of the section.
    pub sh_addralign: u64,
    /// Size of each entry (for sections with fixed-size entries).
    pub sh_entsize: u64,
}

impl Record for SectionHeader {
    const SIZE: usize = ELF64_SHDR_SIZE;

    fn decode(r: &mut FieldReader<'_>) -> Self {
        Self {
            sh_name: r.u32(),
            sh_type: r.u32(),
            sh_flags: r.u64(),
            sh_addr: r.u64(),
            sh_offset: r.u64(),
            sh_size: r.u64(),
            sh_link: r.u32(),
            sh_info: r.u32(),
            sh_addralign: r.u64(),
            sh_entsize: r.u64(),
        }
    }
}

impl SectionHeader {
    /// Attribute flags, unknown bits dropped.
    #[must_use]
    pub fn flags(&self) -> SectionFlags {
        SectionFlags::from_bits_truncate(self.sh_flags)
    }
}

/// A string table rooted at a file offset.
///
/// Strings are NUL-terminated and may extend to the end of the buffer; the
/// section's declared size is not used to bound them.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    data: &'a [u8],
    base: u64,
}

impl<'a> StringTable<'a> {
    /// Creates a string table whose first byte is at `base` in `data`.
    #[must_use]
    pub fn new(data: &'a [u8], base: u64) -> Self {
        Self { data, base }
    }

    /// Creates the string table described by a section header.
    #[must_use]
    pub fn for_section(data: &'a [u8], shdr: &SectionHeader) -> Self {
        Self::new(data, shdr.sh_offset)
    }

    /// Reads the NUL-terminated string at `offset` within the table.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::OutOfBounds`] if the string starts outside the
    /// buffer and [`ElfError::UnterminatedString`] if no NUL follows it.
    pub fn get(&self, offset: u32) -> Result<String, ElfError> {
        let oob = ElfError::OutOfBounds {
            offset: self.base,
            len: u64::from(offset) + 1,
            buffer_len: self.data.len(),
        };
        let start = self
            .base
            .checked_add(u64::from(offset))
            .and_then(|s| usize::try_from(s).ok())
            .filter(|&s| s < self.data.len())
            .ok_or(oob)?;

        let remaining = &self.data[start..];
        let nul = remaining
            .iter()
            .position(|&b| b == 0)
            .ok_or(ElfError::UnterminatedString {
                offset: start as u64,
            })?;
        Ok(String::from_utf8_lossy(&remaining[..nul]).into_owned())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::header::tests::{put_u16, put_u32, put_u64};
    use crate::record::{Endian, decode_records};

    /// Append a section header to the ELF buffer and bump `e_shnum`.
    ///
    /// Sets `e_shoff` to the current end of the buffer when this is the
    /// first entry, so all section data must already be in place.
    pub(crate) fn append_section(
        buf: &mut Vec<u8>,
        sh_name: u32,
        sh_type: u32,
        sh_flags: u64,
        sh_offset: u64,
        sh_size: u64,
        sh_link: u32,
        sh_entsize: u64,
    ) {
        let start = buf.len();
        let shnum = u16::from_le_bytes([buf[60], buf[61]]);
        if shnum == 0 {
            put_u64(buf, 40, start as u64);
        }
        buf.resize(start + ELF64_SHDR_SIZE, 0);
        let b = &mut buf[start..];

        put_u32(b, 0, sh_name);
        put_u32(b, 4, sh_type);
        put_u64(b, 8, sh_flags);
        // sh_addr mirrors the file offset for allocated sections
        let addr = if sh_flags & SectionFlags::ALLOC.bits() != 0 {
            sh_offset
        } else {
            0
        };
        put_u64(b, 16, addr);
        put_u64(b, 24, sh_offset);
        put_u64(b, 32, sh_size);
        put_u32(b, 40, sh_link);
        put_u64(b, 48, 1);
        put_u64(b, 56, sh_entsize);

        put_u16(buf, 60, shnum + 1);
    }

    /// Set `e_shstrndx` in the header.
    pub(crate) fn set_shstrndx(buf: &mut [u8], index: u16) {
        put_u16(buf, 62, index);
    }

    #[test]
    fn decode_section_header() {
        let mut buf = crate::header::tests::make_elf_header();
        append_section(
            &mut buf,
            7,
            SHT_PROGBITS,
            (SectionFlags::ALLOC | SectionFlags::EXECINSTR).bits(),
            0x40,
            0x10,
            0,
            0,
        );
        let shdr = decode_records::<SectionHeader>(&buf, 64, 1, Endian::Little)
            .expect("in bounds")
            .next()
            .expect("one record");
        assert_eq!(shdr.sh_name, 7);
        assert_eq!(shdr.sh_type, SHT_PROGBITS);
        assert_eq!(shdr.flags(), SectionFlags::ALLOC | SectionFlags::EXECINSTR);
        assert_eq!(shdr.sh_addr, 0x40);
        assert_eq!(shdr.sh_offset, 0x40);
        assert_eq!(shdr.sh_size, 0x10);
        assert_eq!(shdr.sh_addralign, 1);
    }

    #[test]
    fn string_table_lookup() {
        let data = b"xx\0hello\0world\0";
        let strtab = StringTable::new(data, 2);
        assert_eq!(strtab.get(0).as_deref(), Ok(""));
        assert_eq!(strtab.get(1).as_deref(), Ok("hello"));
        assert_eq!(strtab.get(7).as_deref(), Ok("world"));
        // Offsets may land mid-string.
        assert_eq!(strtab.get(4).as_deref(), Ok("lo"));
    }

    #[test]
    fn string_table_out_of_bounds() {
        let strtab = StringTable::new(b"\0hello\0", 0);
        assert!(matches!(
            strtab.get(100),
            Err(ElfError::OutOfBounds { .. })
        ));
        assert!(matches!(strtab.get(7), Err(ElfError::OutOfBounds { .. })));
    }

    #[test]
    fn string_table_base_overflow() {
        let strtab = StringTable::new(b"\0", u64::MAX);
        assert!(matches!(strtab.get(1), Err(ElfError::OutOfBounds { .. })));
    }

    #[test]
    fn string_table_no_nul_terminator() {
        let strtab = StringTable::new(b"\0abc", 0);
        assert_eq!(
            strtab.get(1),
            Err(ElfError::UnterminatedString { offset: 1 })
        );
    }

    #[test]
    fn string_table_lossy_utf8() {
        let strtab = StringTable::new(b"a\xffb\0", 0);
        assert_eq!(strtab.get(0).as_deref(), Ok("a\u{fffd}b"));
    }
}
