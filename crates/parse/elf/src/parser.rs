//! The staged ELF64 decoder.
//!
//! [`ElfParser`] owns the raw file bytes and decodes them in four stages:
//! header, program headers, section headers, symbols. Each stage runs at
//! most once, only after the stages it depends on, and either commits all
//! of its records or none of them.

use alloc::boxed::Box;
use alloc::vec::Vec;

#[cfg(feature = "std")]
use std::path::{Path, PathBuf};

use crate::handlers::Handlers;
use crate::header::{ElfError, FileHeader};
use crate::record::{check_range, decode_records, to_usize};
use crate::section::{SHT_NOBITS, STRTAB, SYMTAB, SectionHeader, StringTable};
use crate::segment::{LoadSegment, ProgramHeader};
use crate::status::ParseStatus;
use crate::symbol::Symbol;
use crate::table::NamedTable;

/// Section index escape: the real `e_shstrndx` is in section 0's `sh_link`.
pub const SHN_XINDEX: u16 = 0xffff;

/// Where the parser's bytes come from.
#[derive(Debug)]
enum Source {
    /// Supplied by the caller at construction.
    Bytes,
    /// Read from disk by [`ElfParser::load`].
    #[cfg(feature = "std")]
    Path(PathBuf),
}

/// Staged, demand-driven ELF64 parser.
///
/// ```
/// use elfscope_elf::ElfParser;
///
/// fn symbol_names(image: Vec<u8>) -> Result<Vec<String>, elfscope_elf::ElfError> {
///     let mut parser = ElfParser::from_bytes(image);
///     parser.parse()?;
///     Ok(parser.symbols().iter().map(|(name, _)| name.to_string()).collect())
/// }
/// ```
#[derive(Debug)]
pub struct ElfParser {
    source: Source,
    buffer: Vec<u8>,
    status: ParseStatus,
    handlers: Handlers,
    header: Option<FileHeader>,
    program_headers: Vec<ProgramHeader>,
    sections: NamedTable<SectionHeader>,
    symbols: NamedTable<Symbol>,
}

impl ElfParser {
    fn with_source(source: Source, buffer: Vec<u8>, status: ParseStatus) -> Self {
        Self {
            source,
            buffer,
            status,
            handlers: Handlers::default(),
            header: None,
            program_headers: Vec::new(),
            sections: NamedTable::new(),
            symbols: NamedTable::new(),
        }
    }

    /// Creates a parser over an in-memory image. The buffer counts as loaded.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::with_source(
            Source::Bytes,
            data,
            ParseStatus::default().advance(ParseStatus::LOADED),
        )
    }

    /// Creates a parser bound to a file. Nothing is read until [`load`](Self::load).
    #[cfg(feature = "std")]
    #[must_use]
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::with_source(
            Source::Path(path.as_ref().to_path_buf()),
            Vec::new(),
            ParseStatus::default(),
        )
    }

    /// Reads the bound file into memory, once.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Io`] if the file cannot be read. The parser stays
    /// unloaded and every stage remains a no-op.
    pub fn load(&mut self) -> Result<(), ElfError> {
        if self.status.loaded() {
            return Ok(());
        }
        match &self.source {
            Source::Bytes => {}
            #[cfg(feature = "std")]
            Source::Path(path) => {
                self.buffer = std::fs::read(path).map_err(|e| ElfError::Io {
                    kind: e.kind(),
                    path: path.display().to_string(),
                })?;
            }
        }
        self.status = self.status.advance(ParseStatus::LOADED);
        Ok(())
    }

    /// Loads the file if needed and runs every stage in order.
    ///
    /// Returns immediately once the file has been fully read.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by loading or by any stage.
    pub fn parse(&mut self) -> Result<(), ElfError> {
        self.load()?;
        if self.status.is_complete() {
            return Ok(());
        }
        self.read_header()?;
        self.read_program_headers()?;
        self.read_section_table()?;
        self.read_symbol_table()
    }

    /// Header stage: decodes the file header at offset 0.
    ///
    /// No-op until loaded, and after it has succeeded once.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::Truncated`] for a buffer shorter than 64 bytes, or
    /// an identification error for a non-ELF64 file.
    pub fn read_header(&mut self) -> Result<(), ElfError> {
        if !self.status.loaded() || self.status.header_read() {
            return Ok(());
        }
        let header = FileHeader::parse(&self.buffer)?;
        self.handlers.header(&header);
        self.header = Some(header);
        self.status = self.status.advance(ParseStatus::HEADER_READ);
        Ok(())
    }

    /// Program header stage: decodes `e_phnum` entries at `e_phoff`.
    ///
    /// A file with `e_phoff == 0` has no program headers; the stage then
    /// does nothing and stays incomplete.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::OutOfBounds`] if the table runs past the buffer.
    pub fn read_program_headers(&mut self) -> Result<(), ElfError> {
        let Some(hdr) = self.header else {
            return Ok(());
        };
        if self.status.program_headers_read() || hdr.e_phoff == 0 {
            return Ok(());
        }
        let phdrs: Vec<ProgramHeader> = decode_records(
            &self.buffer,
            hdr.e_phoff,
            usize::from(hdr.e_phnum),
            hdr.endian(),
        )?
        .collect();

        self.handlers.program_headers(&phdrs);
        self.program_headers = phdrs;
        self.status = self.status.advance(ParseStatus::PROGRAM_HEADERS_READ);
        Ok(())
    }

    /// Section stage: decodes the section header table and names every
    /// entry through the section at `e_shstrndx`.
    ///
    /// Once the table has been read, every call re-dispatches the section
    /// handler over it without decoding again.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::InvalidIndex`] if `e_shstrndx` is not a decoded
    /// section, or a bounds error if the table or a name lies outside the
    /// buffer.
    pub fn read_section_table(&mut self) -> Result<(), ElfError> {
        let Some(hdr) = self.header else {
            return Ok(());
        };
        if !self.status.section_table_read() && hdr.e_shoff > 0 {
            self.sections = self.decode_sections(&hdr)?;
            self.status = self.status.advance(ParseStatus::SECTION_TABLE_READ);
        }
        if self.status.section_table_read() {
            self.handlers.sections(self.sections.iter());
        }
        Ok(())
    }

    fn decode_sections(&self, hdr: &FileHeader) -> Result<NamedTable<SectionHeader>, ElfError> {
        let endian = hdr.endian();
        let mut count = usize::from(hdr.e_shnum);
        let mut strndx = usize::from(hdr.e_shstrndx);

        // Extended numbering keeps the real values in section 0.
        if hdr.e_shnum == 0 || hdr.e_shstrndx == SHN_XINDEX {
            let first = decode_records::<SectionHeader>(&self.buffer, hdr.e_shoff, 1, endian)?
                .next()
                .ok_or(ElfError::InvalidIndex { index: 0, count: 0 })?;
            if hdr.e_shnum == 0 {
                count = to_usize(first.sh_size, self.buffer.len())?;
            }
            if hdr.e_shstrndx == SHN_XINDEX {
                strndx = first.sh_link as usize;
            }
        }

        let decoded: Vec<SectionHeader> =
            decode_records(&self.buffer, hdr.e_shoff, count, endian)?.collect();
        let shstrtab = decoded.get(strndx).ok_or(ElfError::InvalidIndex {
            index: strndx,
            count: decoded.len(),
        })?;
        let names = StringTable::for_section(&self.buffer, shstrtab);

        let mut table = NamedTable::new();
        for shdr in &decoded {
            table.insert(names.get(shdr.sh_name)?, *shdr);
        }
        Ok(table)
    }

    /// Symbol stage: decodes `.symtab` and names each symbol through `.strtab`.
    ///
    /// No-op until the section table has been read, and after it has
    /// succeeded once.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::MissingSection`] if `.symtab` or `.strtab` is
    /// absent, [`ElfError::InvalidEntrySize`] for a zero `sh_entsize`, or a
    /// bounds error.
    pub fn read_symbol_table(&mut self) -> Result<(), ElfError> {
        let Some(hdr) = self.header else {
            return Ok(());
        };
        if !self.status.section_table_read() || self.status.symbol_table_read() {
            return Ok(());
        }
        let symtab = *self
            .sections
            .get(SYMTAB)
            .ok_or(ElfError::MissingSection(SYMTAB))?;
        let strtab = *self
            .sections
            .get(STRTAB)
            .ok_or(ElfError::MissingSection(STRTAB))?;
        if symtab.sh_entsize == 0 {
            return Err(ElfError::InvalidEntrySize {
                section: SYMTAB,
                entsize: 0,
            });
        }

        let count = to_usize(symtab.sh_size / symtab.sh_entsize, self.buffer.len())?;
        let names = StringTable::for_section(&self.buffer, &strtab);
        let mut table = NamedTable::new();
        for sym in decode_records::<Symbol>(&self.buffer, symtab.sh_offset, count, hdr.endian())? {
            table.insert(names.get(sym.st_name)?, sym);
        }

        self.symbols = table;
        self.status = self.status.advance(ParseStatus::SYMBOL_TABLE_READ);
        self.handlers.symbols(self.symbols.iter());
        Ok(())
    }

    /// Registers the header callback.
    pub fn set_header_handler(&mut self, handler: impl FnMut(&FileHeader) + 'static) {
        self.handlers.header = Some(Box::new(handler));
    }

    /// Registers the per-entry program header callback.
    pub fn set_program_header_handler(&mut self, handler: impl FnMut(&ProgramHeader) + 'static) {
        self.handlers.program_header = Some(Box::new(handler));
    }

    /// Registers the per-entry section callback.
    pub fn set_section_handler(&mut self, handler: impl FnMut(&SectionHeader, &str) + 'static) {
        self.handlers.section = Some(Box::new(handler));
    }

    /// Registers the per-entry symbol callback.
    pub fn set_symbol_handler(&mut self, handler: impl FnMut(&Symbol, &str) + 'static) {
        self.handlers.symbol = Some(Box::new(handler));
    }

    /// Current stage progress.
    #[must_use]
    pub fn status(&self) -> ParseStatus {
        self.status
    }

    /// The loaded bytes (empty before loading).
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// The decoded file header.
    #[must_use]
    pub fn header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    /// Program headers in file order.
    #[must_use]
    pub fn program_headers(&self) -> &[ProgramHeader] {
        &self.program_headers
    }

    /// `PT_LOAD` segments with their file-backed bytes.
    pub fn load_segments(&self) -> impl Iterator<Item = LoadSegment<'_>> {
        self.program_headers
            .iter()
            .filter(|p| p.is_load())
            .map(|p| LoadSegment::new(p, &self.buffer))
    }

    /// Sections by name.
    #[must_use]
    pub fn sections(&self) -> &NamedTable<SectionHeader> {
        &self.sections
    }

    /// The last section with the given name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&SectionHeader> {
        self.sections.get(name)
    }

    /// The first section (in file order) of the given type.
    #[must_use]
    pub fn find_section_by_type(&self, sh_type: u32) -> Option<(&str, &SectionHeader)> {
        self.sections.all().find(|(_, s)| s.sh_type == sh_type)
    }

    /// The bytes a section occupies in the file. `SHT_NOBITS` sections have none.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::OutOfBounds`] if the section lies outside the buffer.
    pub fn section_data(&self, shdr: &SectionHeader) -> Result<&[u8], ElfError> {
        if shdr.sh_type == SHT_NOBITS {
            return Ok(&[]);
        }
        let end = check_range(shdr.sh_offset, shdr.sh_size, self.buffer.len())?;
        let start = end - to_usize(shdr.sh_size, self.buffer.len())?;
        Ok(&self.buffer[start..end])
    }

    /// Symbols by name.
    #[must_use]
    pub fn symbols(&self) -> &NamedTable<Symbol> {
        &self.symbols
    }

    /// The last symbol with the given name.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Defined function symbols, sorted by address.
    #[must_use]
    pub fn functions(&self) -> Vec<(&str, &Symbol)> {
        let mut funcs: Vec<_> = self
            .symbols
            .iter()
            .filter(|(name, sym)| !name.is_empty() && sym.is_defined_function())
            .collect();
        funcs.sort_by_key(|(_, sym)| sym.st_value);
        funcs
    }

    /// The function symbol covering `addr`, if any.
    #[must_use]
    pub fn symbol_for_address(&self, addr: u64) -> Option<(&str, &Symbol)> {
        let funcs = self.functions();
        let idx = funcs.partition_point(|(_, sym)| sym.st_value <= addr);
        let (name, sym) = *funcs.get(idx.checked_sub(1)?)?;
        sym.contains(addr).then_some((name, sym))
    }
}
