//! Report records collected from the parser's handlers, and their output.

use std::fmt::Write as _;

use elfscope_elf::section::SHN_ABS;
use elfscope_elf::symbol::{binding_name, type_name, visibility_name};
use elfscope_elf::{FileHeader, ProgramHeader, SHN_UNDEF, SectionHeader, Symbol};
use serde::Serialize;

/// Everything elfscope reports about one file.
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<HeaderRecord>,
    pub segments: Vec<SegmentRecord>,
    pub sections: Vec<SectionRecord>,
    pub symbols: Vec<SymbolRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// The file header.
#[derive(Debug, Serialize)]
pub struct HeaderRecord {
    pub magic: [u8; 4],
    pub class: u8,
    pub data: u8,
    pub version: u8,
    pub os_abi: u8,
    pub file_type: String,
    pub machine: u16,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub flags: u32,
    pub ehsize: u16,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

impl From<&FileHeader> for HeaderRecord {
    fn from(h: &FileHeader) -> Self {
        Self {
            magic: h.ident.magic,
            class: h.ident.class,
            data: h.ident.data,
            version: h.ident.version,
            os_abi: h.ident.os_abi,
            file_type: h.file_type().to_string(),
            machine: h.e_machine,
            entry: h.e_entry,
            phoff: h.e_phoff,
            shoff: h.e_shoff,
            flags: h.e_flags,
            ehsize: h.e_ehsize,
            phentsize: h.e_phentsize,
            phnum: h.e_phnum,
            shentsize: h.e_shentsize,
            shnum: h.e_shnum,
            shstrndx: h.e_shstrndx,
        }
    }
}

/// One program header.
#[derive(Debug, Serialize)]
pub struct SegmentRecord {
    pub kind: u32,
    pub flags: String,
    pub offset: u64,
    pub vaddr: u64,
    pub paddr: u64,
    pub filesz: u64,
    pub memsz: u64,
    pub align: u64,
}

impl From<&ProgramHeader> for SegmentRecord {
    fn from(p: &ProgramHeader) -> Self {
        let f = p.flags();
        let flags = [
            (f.contains(elfscope_elf::SegmentFlags::R), 'R'),
            (f.contains(elfscope_elf::SegmentFlags::W), 'W'),
            (f.contains(elfscope_elf::SegmentFlags::X), 'E'),
        ]
        .iter()
        .map(|&(set, c)| if set { c } else { ' ' })
        .collect();
        Self {
            kind: p.p_type,
            flags,
            offset: p.p_offset,
            vaddr: p.p_vaddr,
            paddr: p.p_paddr,
            filesz: p.p_filesz,
            memsz: p.p_memsz,
            align: p.p_align,
        }
    }
}

/// One section header with its resolved name.
#[derive(Debug, Serialize)]
pub struct SectionRecord {
    pub name: String,
    pub kind: u32,
    pub flags: u64,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
}

impl SectionRecord {
    pub fn new(s: &SectionHeader, name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: s.sh_type,
            flags: s.sh_flags,
            addr: s.sh_addr,
            offset: s.sh_offset,
            size: s.sh_size,
            link: s.sh_link,
            info: s.sh_info,
            addralign: s.sh_addralign,
            entsize: s.sh_entsize,
        }
    }
}

/// One symbol with its resolved (and possibly demangled) name.
#[derive(Debug, Serialize)]
pub struct SymbolRecord {
    pub name: String,
    pub value: u64,
    pub size: u64,
    pub kind: &'static str,
    pub binding: &'static str,
    pub visibility: &'static str,
    pub section: String,
}

impl SymbolRecord {
    pub fn new(sym: &Symbol, name: &str, demangle: bool) -> Self {
        let name = if demangle {
            format!("{:#}", rustc_demangle::demangle(name))
        } else {
            name.to_string()
        };
        let section = match sym.st_shndx {
            SHN_UNDEF => "UND".to_string(),
            SHN_ABS => "ABS".to_string(),
            idx => idx.to_string(),
        };
        Self {
            name,
            value: sym.st_value,
            size: sym.st_size,
            kind: type_name(sym.sym_type()),
            binding: binding_name(sym.binding()),
            visibility: visibility_name(sym.visibility()),
            section,
        }
    }
}

fn data_encoding(data: u8) -> &'static str {
    match data {
        0 => "Invalid data encoding",
        1 => "LSB",
        2 => "MSB",
        _ => "Unexpected",
    }
}

impl Report {
    /// Render the report as indented text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) -> std::fmt::Result {
        if let Some(h) = &self.header {
            writeln!(out, "Elf header:")?;
            writeln!(out, "\tElf identification:")?;
            writeln!(
                out,
                "\t\tMagic: {:#x} \"{}\"",
                h.magic[0],
                String::from_utf8_lossy(&h.magic[1..])
            )?;
            writeln!(out, "\t\tClass: {:#x}", h.class)?;
            writeln!(out, "\t\tData: {:#x} ({})", h.data, data_encoding(h.data))?;
            writeln!(out, "\t\tVersion: {:#x}", h.version)?;
            writeln!(out, "\t\tOS/ABI: {:#x}", h.os_abi)?;
            writeln!(out, "\tType: {}", h.file_type)?;
            writeln!(out, "\tMachine: {:#x}", h.machine)?;
            writeln!(out, "\tEntry: {:#x}", h.entry)?;
            writeln!(out, "\tPhoff: {:#x}", h.phoff)?;
            writeln!(out, "\tShoff: {:#x}", h.shoff)?;
            writeln!(out, "\tFlags: {:#x}", h.flags)?;
            writeln!(out, "\tEhsize: {}", h.ehsize)?;
            writeln!(out, "\tPhentsize: {}", h.phentsize)?;
            writeln!(out, "\tPhnum: {}", h.phnum)?;
            writeln!(out, "\tShentsize: {}", h.shentsize)?;
            writeln!(out, "\tShnum: {}", h.shnum)?;
            writeln!(out, "\tShstrndx: {}", h.shstrndx)?;
        }

        for (i, p) in self.segments.iter().enumerate() {
            writeln!(out, "Segment # {}", i + 1)?;
            writeln!(out, "\tType: {:#x}", p.kind)?;
            writeln!(out, "\tFlags: {}", p.flags)?;
            writeln!(out, "\tOffset: {:#x}", p.offset)?;
            writeln!(out, "\tVaddr: {:#x}", p.vaddr)?;
            writeln!(out, "\tPaddr: {:#x}", p.paddr)?;
            writeln!(out, "\tFilesz: {:#x}", p.filesz)?;
            writeln!(out, "\tMemsz: {:#x}", p.memsz)?;
            writeln!(out, "\tAlign: {:#x}", p.align)?;
        }

        for (i, s) in self.sections.iter().enumerate() {
            writeln!(out, "Section # {}", i + 1)?;
            writeln!(out, "\tName: {}", s.name)?;
            writeln!(out, "\tType: {:#x}", s.kind)?;
            writeln!(out, "\tFlags: {:#x}", s.flags)?;
            writeln!(out, "\tAddr: {:#x}", s.addr)?;
            writeln!(out, "\tOffset: {:#x}", s.offset)?;
            writeln!(out, "\tSize: {:#x}", s.size)?;
            writeln!(out, "\tLink: {:#x}", s.link)?;
            writeln!(out, "\tInfo: {:#x}", s.info)?;
            writeln!(out, "\tAddralign: {:#x}", s.addralign)?;
            writeln!(out, "\tEntsize: {:#x}", s.entsize)?;
        }

        if !self.symbols.is_empty() {
            self.write_symbol_table(out)?;
        }
        Ok(())
    }

    fn write_symbol_table(&self, out: &mut String) -> std::fmt::Result {
        let width = self
            .symbols
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(4)
            .max(4);

        writeln!(out, "Symbols:")?;
        writeln!(
            out,
            "  {:<width$}  {:>18}  {:>8}  {:<7}  {:<6}  {:<9}  {:>5}",
            "Name", "Value", "Size", "Type", "Bind", "Vis", "Ndx"
        )?;
        writeln!(
            out,
            "  {:-<width$}  {:->18}  {:->8}  {:-<7}  {:-<6}  {:-<9}  {:->5}",
            "", "", "", "", "", "", ""
        )?;
        for s in &self.symbols {
            writeln!(
                out,
                "  {:<width$}  {:#018x}  {:>8}  {:<7}  {:<6}  {:<9}  {:>5}",
                s.name, s.value, s.size, s.kind, s.binding, s.visibility, s.section
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(st_info: u8, st_shndx: u16) -> Symbol {
        Symbol {
            st_name: 0,
            st_info,
            st_other: 0,
            st_shndx,
            st_value: 0x1000,
            st_size: 0x20,
        }
    }

    #[test]
    fn symbol_record_names() {
        let rec = SymbolRecord::new(&symbol(0x12, 1), "main", false);
        assert_eq!(rec.name, "main");
        assert_eq!(rec.kind, "FUNC");
        assert_eq!(rec.binding, "GLOBAL");
        assert_eq!(rec.visibility, "DEFAULT");
        assert_eq!(rec.section, "1");

        let undef = SymbolRecord::new(&symbol(0x10, SHN_UNDEF), "puts", false);
        assert_eq!(undef.section, "UND");
    }

    #[test]
    fn demangles_rust_symbols() {
        let mangled = "_ZN4core3fmt5write17h0123456789abcdefE";
        let rec = SymbolRecord::new(&symbol(0x12, 1), mangled, true);
        assert_eq!(rec.name, "core::fmt::write");
        let raw = SymbolRecord::new(&symbol(0x12, 1), mangled, false);
        assert_eq!(raw.name, mangled);
    }

    #[test]
    fn text_lists_sections_in_order() {
        let shdr = SectionHeader {
            sh_name: 0,
            sh_type: 1,
            sh_flags: 6,
            sh_addr: 0x1000,
            sh_offset: 0x40,
            sh_size: 0x30,
            sh_link: 0,
            sh_info: 0,
            sh_addralign: 16,
            sh_entsize: 0,
        };
        let report = Report {
            sections: vec![
                SectionRecord::new(&shdr, ".text"),
                SectionRecord::new(&shdr, ".init"),
            ],
            ..Report::default()
        };
        let text = report.to_text();
        let first = text.find("Name: .text").expect(".text listed");
        let second = text.find("Name: .init").expect(".init listed");
        assert!(first < second);
        assert!(text.contains("Section # 2"));
        assert!(text.contains("\tSize: 0x30"));
    }

    #[test]
    fn segment_flags_render_as_letters() {
        let phdr = ProgramHeader {
            p_type: 1,
            p_flags: 5,
            p_offset: 0,
            p_vaddr: 0,
            p_paddr: 0,
            p_filesz: 0,
            p_memsz: 0,
            p_align: 0,
        };
        assert_eq!(SegmentRecord::from(&phdr).flags, "R E");
    }
}
