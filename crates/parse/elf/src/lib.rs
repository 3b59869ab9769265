//! Staged ELF64 decoder for `elfscope`.
//!
//! Turns an in-memory ELF64 image into typed, named views of its file
//! header, program headers, section headers, and symbol table. Field
//! extraction goes through a bounds-checked record decoder; no unsafe code,
//! and nothing decoded borrows the input.
//!
//! Decoding happens in stages, each gated on the ones before it:
//!
//! 1. header (offset 0)
//! 2. program headers (`e_phnum` entries at `e_phoff`)
//! 3. section headers (`e_shnum` entries at `e_shoff`, named via `e_shstrndx`)
//! 4. symbols (`.symtab`, named via `.strtab`)
//!
//! # Usage
//!
//! ```no_run
//! use elfscope_elf::ElfParser;
//!
//! let mut parser = ElfParser::open("a.out");
//! parser.set_section_handler(|shdr, name| println!("{name}: {:#x}", shdr.sh_offset));
//! parser.parse().expect("valid ELF64");
//! if let Some(main) = parser.symbol("main") {
//!     println!("main at {:#x}", main.st_value);
//! }
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

pub mod handlers;
pub mod header;
pub mod parser;
pub mod record;
pub mod section;
pub mod segment;
pub mod status;
pub mod symbol;
pub mod table;

pub use handlers::{HeaderHandler, ProgramHeaderHandler, SectionHandler, SymbolHandler};
pub use header::{ElfError, ElfType, FileHeader, Ident};
pub use parser::ElfParser;
pub use record::{Endian, FieldReader, Record, RecordIter, decode_records};
pub use section::{
    SHN_ABS, SHN_UNDEF, SHT_NOBITS, SHT_PROGBITS, SHT_STRTAB, SHT_SYMTAB,
    SectionFlags, SectionHeader, StringTable,
};
pub use segment::{LoadSegment, PT_LOAD, ProgramHeader, SegmentFlags};
pub use status::ParseStatus;
pub use symbol::{STB_GLOBAL, STB_LOCAL, STB_WEAK, STT_FUNC, STT_OBJECT, Symbol};
pub use table::NamedTable;
