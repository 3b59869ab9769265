//! ELF64 file header parsing.
//!
//! Decodes the 16-byte identification block and the rest of the 64-byte
//! file header. The identification bytes decide the byte order used for
//! every other record in the file.

use core::fmt;

use crate::record::{Endian, FieldReader, Record, decode_records};

/// ELF magic bytes: `\x7fELF`.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// ELF class: 32-bit.
pub const ELFCLASS32: u8 = 1;

/// ELF class: 64-bit.
pub const ELFCLASS64: u8 = 2;

/// ELF data encoding: little-endian.
pub const ELFDATA2LSB: u8 = 1;

/// ELF data encoding: big-endian.
pub const ELFDATA2MSB: u8 = 2;

/// Current ELF version.
pub const EV_CURRENT: u8 = 1;

/// ELF type: no file type.
pub const ET_NONE: u16 = 0;

/// ELF type: relocatable object.
pub const ET_REL: u16 = 1;

/// ELF type: executable.
pub const ET_EXEC: u16 = 2;

/// ELF type: shared object (or PIE).
pub const ET_DYN: u16 = 3;

/// ELF type: core dump.
pub const ET_CORE: u16 = 4;

/// ELF machine: x86-64.
pub const EM_X86_64: u16 = 62;

/// ELF machine: `AArch64`.
pub const EM_AARCH64: u16 = 183;

/// ELF machine: RISC-V.
pub const EM_RISCV: u16 = 243;

/// Size of an ELF64 file header (64 bytes).
pub const ELF64_EHDR_SIZE: usize = 64;

/// Errors that can occur when loading or parsing an ELF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElfError {
    /// The source file could not be read.
    #[cfg(feature = "std")]
    Io {
        /// Kind of the underlying I/O error.
        kind: std::io::ErrorKind,
        /// Path that was being read.
        path: String,
    },
    /// The buffer is smaller than a required fixed structure.
    Truncated {
        /// Bytes the structure needs.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },
    /// A computed byte range lies outside the buffer.
    OutOfBounds {
        /// Start of the range.
        offset: u64,
        /// Length of the range.
        len: u64,
        /// Length of the buffer.
        buffer_len: usize,
    },
    /// A NUL-terminated string runs off the end of the buffer.
    UnterminatedString {
        /// File offset where the string starts.
        offset: u64,
    },
    /// A table index is out of range.
    InvalidIndex {
        /// The offending index.
        index: usize,
        /// Number of entries in the table.
        count: usize,
    },
    /// A section required for decoding is absent.
    MissingSection(&'static str),
    /// A table section declares an entry size of zero.
    InvalidEntrySize {
        /// Name of the section.
        section: &'static str,
        /// The declared `sh_entsize`.
        entsize: u64,
    },
    /// The file does not start with the ELF magic bytes.
    BadMagic,
    /// The ELF class is not `ELFCLASS64`.
    UnsupportedClass(u8),
    /// The data encoding is neither little- nor big-endian.
    UnsupportedEncoding(u8),
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "std")]
            Self::Io { kind, path } => write!(f, "failed to read '{path}': {kind}"),
            Self::Truncated { needed, available } => {
                write!(f, "input truncated: need {needed} bytes, have {available}")
            }
            Self::OutOfBounds {
                offset,
                len,
                buffer_len,
            } => write!(
                f,
                "range {offset:#x}+{len:#x} exceeds buffer of {buffer_len:#x} bytes"
            ),
            Self::UnterminatedString { offset } => {
                write!(f, "string at {offset:#x} is not NUL-terminated")
            }
            Self::InvalidIndex { index, count } => {
                write!(f, "index {index} out of range for table of {count} entries")
            }
            Self::MissingSection(name) => write!(f, "missing section '{name}'"),
            Self::InvalidEntrySize { section, entsize } => {
                write!(f, "section '{section}' has invalid entry size {entsize}")
            }
            Self::BadMagic => write!(f, "invalid ELF magic bytes"),
            Self::UnsupportedClass(class) => {
                write!(f, "unsupported ELF class {class} (expected ELFCLASS64)")
            }
            Self::UnsupportedEncoding(data) => {
                write!(f, "unsupported data encoding {data}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ElfError {}

/// The 16-byte `e_ident` block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident {
    /// Magic bytes, `\x7fELF` for a valid file.
    pub magic: [u8; 4],
    /// File class (`ELFCLASS64`).
    pub class: u8,
    /// Data encoding (`ELFDATA2LSB` or `ELFDATA2MSB`).
    pub data: u8,
    /// Identification version.
    pub version: u8,
    /// Target OS ABI.
    pub os_abi: u8,
    /// ABI version.
    pub abi_version: u8,
    /// Reserved padding.
    pub padding: [u8; 7],
}

impl Ident {
    /// Byte order declared by `data`.
    #[must_use]
    pub fn endian(&self) -> Endian {
        if self.data == ELFDATA2MSB {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

/// Object file type, from `e_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfType {
    /// `ET_NONE`.
    None,
    /// `ET_REL`.
    Relocatable,
    /// `ET_EXEC`.
    Executable,
    /// `ET_DYN`.
    SharedObject,
    /// `ET_CORE`.
    Core,
    /// Any OS- or processor-specific value.
    Other(u16),
}

impl From<u16> for ElfType {
    fn from(value: u16) -> Self {
        match value {
            ET_NONE => Self::None,
            ET_REL => Self::Relocatable,
            ET_EXEC => Self::Executable,
            ET_DYN => Self::SharedObject,
            ET_CORE => Self::Core,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ElfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Relocatable => write!(f, "REL"),
            Self::Executable => write!(f, "EXEC"),
            Self::SharedObject => write!(f, "DYN"),
            Self::Core => write!(f, "CORE"),
            Self::Other(v) => write!(f, "{v:#x}"),
        }
    }
}

/// Parsed ELF64 file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Identification block.
    pub ident: Ident,
    /// Object file type.
    pub e_type: u16,
    /// Target machine architecture.
    pub e_machine: u16,
    /// Object file version.
    pub e_version: u32,
    /// Virtual address of the entry point.
    pub e_entry: u64,
    /// Offset of the program header table in the file.
    pub e_phoff: u64,
    /// Offset of the section header table in the file.
    pub e_shoff: u64,
    /// Processor-specific flags.
    pub e_flags: u32,
    /// Size of this header.
    pub e_ehsize: u16,
    /// Size of each program header entry.
    pub e_phentsize: u16,
    /// Number of program header entries.
    pub e_phnum: u16,
    /// Size of each section header entry.
    pub e_shentsize: u16,
    /// Number of section header entries.
    pub e_shnum: u16,
    /// Section header string table index.
    pub e_shstrndx: u16,
}

impl Record for FileHeader {
    const SIZE: usize = ELF64_EHDR_SIZE;

    fn decode(r: &mut FieldReader<'_>) -> Self {
        let ident = Ident {
            magic: r.bytes(),
            class: r.u8(),
            data: r.u8(),
            version: r.u8(),
            os_abi: r.u8(),
            abi_version: r.u8(),
            padding: r.bytes(),
        };
        Self {
            ident,
            e_type: r.u16(),
            e_machine: r.u16(),
            e_version: r.u32(),
            e_entry: r.u64(),
            e_phoff: r.u64(),
            e_shoff: r.u64(),
            e_flags: r.u32(),
            e_ehsize: r.u16(),
            e_phentsize: r.u16(),
            e_phnum: r.u16(),
            e_shentsize: r.u16(),
            e_shnum: r.u16(),
            e_shstrndx: r.u16(),
        }
    }
}

impl FileHeader {
    /// Parse the file header at offset 0 of `data`.
    ///
    /// Only the identification bytes are validated: the magic, a 64-bit
    /// class, and a known data encoding. Everything else is decoded as-is.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Truncated`] if `data` is shorter than 64 bytes,
    /// or an identification error.
    pub fn parse(data: &[u8]) -> Result<Self, ElfError> {
        if data.len() < ELF64_EHDR_SIZE {
            return Err(ElfError::Truncated {
                needed: ELF64_EHDR_SIZE,
                available: data.len(),
            });
        }
        if data[..4] != ELF_MAGIC {
            return Err(ElfError::BadMagic);
        }
        if data[4] != ELFCLASS64 {
            return Err(ElfError::UnsupportedClass(data[4]));
        }
        let endian = match data[5] {
            ELFDATA2LSB => Endian::Little,
            ELFDATA2MSB => Endian::Big,
            other => return Err(ElfError::UnsupportedEncoding(other)),
        };

        decode_records::<Self>(data, 0, 1, endian)?
            .next()
            .ok_or(ElfError::Truncated {
                needed: ELF64_EHDR_SIZE,
                available: data.len(),
            })
    }

    /// Byte order of every record in this file.
    #[must_use]
    pub fn endian(&self) -> Endian {
        self.ident.endian()
    }

    /// Object file type.
    #[must_use]
    pub fn file_type(&self) -> ElfType {
        ElfType::from(self.e_type)
    }
}
