//! Parse progress.

bitflags::bitflags! {
    /// Which stages of an [`ElfParser`](crate::ElfParser) have completed.
    ///
    /// Flags are only ever added, through [`ParseStatus::advance`]. Each one
    /// is set at most once per parser and gates re-execution of its stage.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ParseStatus: u8 {
        /// The raw buffer is available.
        const LOADED = 1 << 0;
        /// The file header has been decoded.
        const HEADER_READ = 1 << 1;
        /// The program header table has been decoded.
        const PROGRAM_HEADERS_READ = 1 << 2;
        /// The section header table has been decoded and named.
        const SECTION_TABLE_READ = 1 << 3;
        /// The symbol table has been decoded and named.
        const SYMBOL_TABLE_READ = 1 << 4;
    }
}

impl ParseStatus {
    /// Returns the status with `stage` marked complete.
    #[must_use]
    pub fn advance(self, stage: Self) -> Self {
        self | stage
    }

    /// Whether the buffer is loaded.
    #[must_use]
    pub fn loaded(self) -> bool {
        self.contains(Self::LOADED)
    }

    /// Whether the header stage has completed.
    #[must_use]
    pub fn header_read(self) -> bool {
        self.contains(Self::HEADER_READ)
    }

    /// Whether the program header stage has completed.
    #[must_use]
    pub fn program_headers_read(self) -> bool {
        self.contains(Self::PROGRAM_HEADERS_READ)
    }

    /// Whether the section stage has completed.
    #[must_use]
    pub fn section_table_read(self) -> bool {
        self.contains(Self::SECTION_TABLE_READ)
    }

    /// Whether the symbol stage has completed.
    #[must_use]
    pub fn symbol_table_read(self) -> bool {
        self.contains(Self::SYMBOL_TABLE_READ)
    }

    /// Whether the file has been fully read.
    #[must_use]
    pub fn is_complete(self) -> bool {
        self.symbol_table_read()
    }
}
