//! Per-region callbacks fired as stages complete.

use alloc::boxed::Box;

use crate::header::FileHeader;
use crate::section::SectionHeader;
use crate::segment::ProgramHeader;
use crate::symbol::Symbol;

/// Callback receiving the decoded file header.
pub type HeaderHandler = Box<dyn FnMut(&FileHeader)>;

/// Callback receiving each program header, in file order.
pub type ProgramHeaderHandler = Box<dyn FnMut(&ProgramHeader)>;

/// Callback receiving each section header and its resolved name.
pub type SectionHandler = Box<dyn FnMut(&SectionHeader, &str)>;

/// Callback receiving each symbol and its resolved name.
pub type SymbolHandler = Box<dyn FnMut(&Symbol, &str)>;

/// The set of registered callbacks. Any of them may be absent.
#[derive(Default)]
pub(crate) struct Handlers {
    pub(crate) header: Option<HeaderHandler>,
    pub(crate) program_header: Option<ProgramHeaderHandler>,
    pub(crate) section: Option<SectionHandler>,
    pub(crate) symbol: Option<SymbolHandler>,
}

impl Handlers {
    pub(crate) fn header(&mut self, hdr: &FileHeader) {
        if let Some(h) = self.header.as_mut() {
            h(hdr);
        }
    }

    pub(crate) fn program_headers<'a>(
        &mut self,
        phdrs: impl IntoIterator<Item = &'a ProgramHeader>,
    ) {
        if let Some(h) = self.program_header.as_mut() {
            for phdr in phdrs {
                h(phdr);
            }
        }
    }

    pub(crate) fn sections<'a>(
        &mut self,
        sections: impl IntoIterator<Item = (&'a str, &'a SectionHeader)>,
    ) {
        if let Some(h) = self.section.as_mut() {
            for (name, shdr) in sections {
                h(shdr, name);
            }
        }
    }

    pub(crate) fn symbols<'a>(
        &mut self,
        symbols: impl IntoIterator<Item = (&'a str, &'a Symbol)>,
    ) {
        if let Some(h) = self.symbol.as_mut() {
            for (name, sym) in symbols {
                h(sym, name);
            }
        }
    }
}

impl core::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Handlers")
            .field("header", &self.header.is_some())
            .field("program_header", &self.program_header.is_some())
            .field("section", &self.section.is_some())
            .field("symbol", &self.symbol.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn shdr(sh_size: u64) -> SectionHeader {
        SectionHeader {
            sh_name: 0,
            sh_type: 1,
            sh_flags: 0,
            sh_addr: 0,
            sh_offset: 0,
            sh_size,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 1,
            sh_entsize: 0,
        }
    }

    #[test]
    fn section_handler_sees_every_entry_in_order() {
        let seen: Rc<RefCell<Vec<(String, u64)>>> = Rc::default();
        let log = seen.clone();
        let handler: SectionHandler =
            Box::new(move |s, name| log.borrow_mut().push((name.to_string(), s.sh_size)));
        let mut handlers = Handlers {
            section: Some(handler),
            ..Handlers::default()
        };

        let (text, data) = (shdr(0x30), shdr(0x8));
        handlers.sections([(".text", &text), (".data", &data)]);
        assert_eq!(
            *seen.borrow(),
            [(".text".to_string(), 0x30), (".data".to_string(), 0x8)]
        );
    }

    #[test]
    fn absent_handlers_are_skipped() {
        let mut handlers = Handlers::default();
        let text = shdr(0x30);
        handlers.sections([(".text", &text)]);
        assert_eq!(
            format!("{handlers:?}"),
            "Handlers { header: false, program_header: false, section: false, symbol: false }"
        );
    }
}
