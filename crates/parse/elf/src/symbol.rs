//! ELF64 symbol table entries.

use crate::record::{FieldReader, Record};
use crate::section::{SHN_ABS, SHN_UNDEF};

/// Symbol binding: local.
pub const STB_LOCAL: u8 = 0;

/// Symbol binding: global.
pub const STB_GLOBAL: u8 = 1;

/// Symbol binding: weak.
pub const STB_WEAK: u8 = 2;

/// Symbol type: unspecified.
pub const STT_NOTYPE: u8 = 0;

/// Symbol type: data object.
pub const STT_OBJECT: u8 = 1;

/// Symbol type: function.
pub const STT_FUNC: u8 = 2;

/// Symbol type: section.
pub const STT_SECTION: u8 = 3;

/// Symbol type: source file.
pub const STT_FILE: u8 = 4;

/// Symbol type: thread-local storage.
pub const STT_TLS: u8 = 6;

/// Symbol visibility: default.
pub const STV_DEFAULT: u8 = 0;

/// Symbol visibility: internal.
pub const STV_INTERNAL: u8 = 1;

/// Symbol visibility: hidden.
pub const STV_HIDDEN: u8 = 2;

/// Symbol visibility: protected.
pub const STV_PROTECTED: u8 = 3;

/// Size of an ELF64 symbol entry (24 bytes).
pub const ELF64_SYM_SIZE: usize = 24;

/// Parsed ELF64 symbol table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// Offset into the associated string table for this symbol's name.
    pub st_name: u32,
    /// Symbol type and binding packed into one byte.
    pub st_info: u8,
    /// Visibility in the low two bits.
    pub st_other: u8,
    /// Section index this symbol is defined in.
    pub st_shndx: u16,
    /// Symbol value (address for defined symbols).
    pub st_value: u64,
    /// Symbol size in bytes.
    pub st_size: u64,
}

impl Record for Symbol {
    const SIZE: usize = ELF64_SYM_SIZE;

    fn decode(r: &mut FieldReader<'_>) -> Self {
        Self {
            st_name: r.u32(),
            st_info: r.u8(),
            st_other: r.u8(),
            st_shndx: r.u16(),
            st_value: r.u64(),
            st_size: r.u64(),
        }
    }
}

impl Symbol {
    /// Returns the symbol type (lower 4 bits of `st_info`).
    #[must_use]
    pub fn sym_type(&self) -> u8 {
        self.st_info & 0xf
    }

    /// Returns the symbol binding (upper 4 bits of `st_info`).
    #[must_use]
    pub fn binding(&self) -> u8 {
        self.st_info >> 4
    }

    /// Returns the symbol visibility (lower 2 bits of `st_other`).
    #[must_use]
    pub fn visibility(&self) -> u8 {
        self.st_other & 0x3
    }

    /// Returns `true` if the symbol is not defined in this file.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.st_shndx == SHN_UNDEF
    }

    /// Returns `true` for a function defined in a real section.
    #[must_use]
    pub fn is_defined_function(&self) -> bool {
        self.sym_type() == STT_FUNC && !self.is_undefined() && self.st_shndx != SHN_ABS
    }

    /// Returns `true` if `addr` falls inside this symbol.
    ///
    /// Zero-sized symbols only contain their own address.
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        if self.st_size == 0 {
            return addr == self.st_value;
        }
        addr >= self.st_value && addr - self.st_value < self.st_size
    }
}

/// Short name of a binding value.
#[must_use]
pub fn binding_name(binding: u8) -> &'static str {
    match binding {
        STB_LOCAL => "LOCAL",
        STB_GLOBAL => "GLOBAL",
        STB_WEAK => "WEAK",
        _ => "OTHER",
    }
}

/// Short name of a symbol type value.
#[must_use]
pub fn type_name(sym_type: u8) -> &'static str {
    match sym_type {
        STT_NOTYPE => "NOTYPE",
        STT_OBJECT => "OBJECT",
        STT_FUNC => "FUNC",
        STT_SECTION => "SECTION",
        STT_FILE => "FILE",
        STT_TLS => "TLS",
        _ => "OTHER",
    }
}

/// Short name of a visibility value.
#[must_use]
pub fn visibility_name(visibility: u8) -> &'static str {
    match visibility {
        STV_DEFAULT => "DEFAULT",
        STV_INTERNAL => "INTERNAL",
        STV_HIDDEN => "HIDDEN",
        _ => "PROTECTED",
    }
}
