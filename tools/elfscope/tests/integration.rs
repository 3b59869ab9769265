//! Integration tests for the elfscope binary.
//!
//! Each test writes a small synthetic ELF64 file into a scratch directory
//! and runs the compiled binary against it.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// A scratch directory removed on drop.
struct Scratch(PathBuf);

impl Scratch {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("elfscope-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create scratch dir");
        Self(dir)
    }

    fn write(&self, file: &str, contents: &[u8]) -> PathBuf {
        let path = self.0.join(file);
        std::fs::write(&path, contents).expect("write scratch file");
        path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn elfscope(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_elfscope"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to execute elfscope")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// One 56-byte program header, little-endian.
fn phdr(p_type: u32, p_flags: u32, offset: u64, vaddr: u64, filesz: u64) -> Vec<u8> {
    let mut b = Vec::with_capacity(56);
    b.extend_from_slice(&p_type.to_le_bytes());
    b.extend_from_slice(&p_flags.to_le_bytes());
    for field in [offset, vaddr, vaddr, filesz, filesz, 0x1000] {
        b.extend_from_slice(&field.to_le_bytes());
    }
    b
}

/// One 64-byte section header, little-endian.
fn shdr(name: u32, sh_type: u32, offset: u64, size: u64, link: u32, entsize: u64) -> Vec<u8> {
    let mut b = Vec::with_capacity(64);
    b.extend_from_slice(&name.to_le_bytes());
    b.extend_from_slice(&sh_type.to_le_bytes());
    for field in [0, 0, offset, size] {
        b.extend_from_slice(&field.to_le_bytes());
    }
    b.extend_from_slice(&link.to_le_bytes());
    b.extend_from_slice(&0u32.to_le_bytes());
    b.extend_from_slice(&1u64.to_le_bytes());
    b.extend_from_slice(&entsize.to_le_bytes());
    b
}

/// One 24-byte symbol, little-endian.
fn sym(name: u32, info: u8, shndx: u16, value: u64, size: u64) -> Vec<u8> {
    let mut b = Vec::with_capacity(24);
    b.extend_from_slice(&name.to_le_bytes());
    b.push(info);
    b.push(0);
    b.extend_from_slice(&shndx.to_le_bytes());
    b.extend_from_slice(&value.to_le_bytes());
    b.extend_from_slice(&size.to_le_bytes());
    b
}

/// Assemble an executable with one `PT_LOAD` and sections
/// NULL, `.text`, `.shstrtab`, and (optionally) `.strtab` + `.symtab`.
fn build_elf(symbol_names: &[&str]) -> Vec<u8> {
    let with_symbols = !symbol_names.is_empty();
    let mut body = Vec::new();
    let base = 64 + 56;

    let text_off = base;
    body.extend_from_slice(&[0xc3; 16]);

    let shstrtab_data: &[u8] = b"\0.text\0.shstrtab\0.strtab\0.symtab\0";
    let shstrtab_off = base + body.len() as u64;
    body.extend_from_slice(shstrtab_data);

    let mut strtab = vec![0u8];
    let mut symtab = sym(0, 0, 0, 0, 0);
    for (i, name) in symbol_names.iter().enumerate() {
        let name_off = strtab.len() as u32;
        strtab.extend_from_slice(name.as_bytes());
        strtab.push(0);
        symtab.extend(sym(name_off, 0x12, 1, 0x1000 + 0x10 * i as u64, 0x10));
    }
    let strtab_off = base + body.len() as u64;
    body.extend_from_slice(&strtab);
    let symtab_off = base + body.len() as u64;
    body.extend_from_slice(&symtab);

    let shoff = base + body.len() as u64;
    let mut sections = Vec::new();
    sections.extend(shdr(0, 0, 0, 0, 0, 0));
    sections.extend(shdr(1, 1, text_off, 16, 0, 0));
    sections.extend(shdr(7, 3, shstrtab_off, shstrtab_data.len() as u64, 0, 0));
    if with_symbols {
        sections.extend(shdr(17, 3, strtab_off, strtab.len() as u64, 0, 0));
        sections.extend(shdr(25, 2, symtab_off, symtab.len() as u64, 3, 24));
    }
    let shnum: u16 = if with_symbols { 5 } else { 3 };

    let mut elf = vec![0u8; 64];
    elf[0..4].copy_from_slice(b"\x7fELF");
    elf[4] = 2;
    elf[5] = 1;
    elf[6] = 1;
    elf[16..18].copy_from_slice(&2u16.to_le_bytes());
    elf[18..20].copy_from_slice(&62u16.to_le_bytes());
    elf[20..24].copy_from_slice(&1u32.to_le_bytes());
    elf[24..32].copy_from_slice(&0x1000u64.to_le_bytes());
    elf[32..40].copy_from_slice(&64u64.to_le_bytes());
    elf[40..48].copy_from_slice(&shoff.to_le_bytes());
    elf[52..54].copy_from_slice(&64u16.to_le_bytes());
    elf[54..56].copy_from_slice(&56u16.to_le_bytes());
    elf[56..58].copy_from_slice(&1u16.to_le_bytes());
    elf[58..60].copy_from_slice(&64u16.to_le_bytes());
    elf[60..62].copy_from_slice(&shnum.to_le_bytes());
    elf[62..64].copy_from_slice(&2u16.to_le_bytes());

    elf.extend(phdr(1, 5, text_off, 0x1000, 16));
    elf.extend(body);
    elf.extend(sections);
    elf
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn missing_argument_prints_usage() {
    let scratch = Scratch::new("usage");
    let output = elfscope(&scratch.0, &[]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Usage"), "stderr: {}", stderr(&output));
}

#[test]
fn unreadable_file_fails() {
    let scratch = Scratch::new("missing");
    let output = elfscope(&scratch.0, &["does-not-exist.elf"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("does-not-exist.elf"));
}

#[test]
fn truncated_file_fails() {
    let scratch = Scratch::new("truncated");
    let path = scratch.write("short.elf", b"\x7fELF\x02\x01");
    let output = elfscope(&scratch.0, &[path.to_str().expect("utf-8 path")]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("failed to read ELF header"));
}

#[test]
fn text_report_lists_every_region() {
    let scratch = Scratch::new("text");
    let path = scratch.write("a.elf", &build_elf(&["main", "helper"]));
    let output = elfscope(&scratch.0, &[path.to_str().expect("utf-8 path")]);
    let out = stdout(&output);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert!(out.contains("Elf header:"));
    assert!(out.contains("Data: 0x1 (LSB)"));
    assert!(out.contains("Segment # 1"));
    assert!(out.contains("Name: .text"));
    assert!(out.contains("Name: .symtab"));
    assert!(out.contains("Section # 5"));
    assert!(out.contains("main"));
    assert!(out.contains("helper"));
}

#[test]
fn json_report_parses() {
    let scratch = Scratch::new("json");
    let path = scratch.write("a.elf", &build_elf(&["main"]));
    let output = elfscope(&scratch.0, &["--json", path.to_str().expect("utf-8 path")]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(report["header"]["entry"], 0x1000);
    assert_eq!(report["segments"].as_array().map(Vec::len), Some(1));
    assert_eq!(report["sections"].as_array().map(Vec::len), Some(5));
    let symbols = report["symbols"].as_array().expect("symbols array");
    let main = symbols
        .iter()
        .find(|s| s["name"] == "main")
        .expect("main symbol");
    assert_eq!(main["value"], 0x1000);
    assert_eq!(main["kind"], "FUNC");
}

#[test]
fn stripped_file_warns_but_succeeds() {
    let scratch = Scratch::new("stripped");
    let path = scratch.write("stripped.elf", &build_elf(&[]));
    let output = elfscope(&scratch.0, &[path.to_str().expect("utf-8 path")]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("no symbol table"));
    assert!(stdout(&output).contains("Name: .shstrtab"));

    let quiet = elfscope(&scratch.0, &["-q", path.to_str().expect("utf-8 path")]);
    assert!(quiet.status.success());
    assert!(stderr(&quiet).is_empty());
}

#[test]
fn config_file_selects_regions() {
    let scratch = Scratch::new("config");
    scratch.write("elfscope.toml", b"[report]\nsections = false\nsegments = false\n");
    let path = scratch.write("a.elf", &build_elf(&["main"]));
    let output = elfscope(&scratch.0, &[path.to_str().expect("utf-8 path")]);
    let out = stdout(&output);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(out.contains("Elf header:"));
    assert!(!out.contains("Section #"));
    assert!(!out.contains("Segment #"));
    assert!(out.contains("main"));
}

#[test]
fn flags_override_config_file() {
    let scratch = Scratch::new("override");
    let config = scratch.write("custom.toml", b"format = \"json\"\n");
    let path = scratch.write("a.elf", &build_elf(&["main"]));
    let output = elfscope(
        &scratch.0,
        &[
            "--config",
            config.to_str().expect("utf-8 path"),
            "--no-symbols",
            path.to_str().expect("utf-8 path"),
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(report["symbols"].as_array().map(Vec::len), Some(0));
}

#[test]
fn demangle_flag() {
    let scratch = Scratch::new("demangle");
    let mangled = "_ZN4core3fmt5write17h0123456789abcdefE";
    let path = scratch.write("rust.elf", &build_elf(&[mangled]));

    let plain = elfscope(&scratch.0, &[path.to_str().expect("utf-8 path")]);
    assert!(stdout(&plain).contains(mangled));

    let demangled = elfscope(&scratch.0, &["--demangle", path.to_str().expect("utf-8 path")]);
    assert!(demangled.status.success());
    assert!(stdout(&demangled).contains("core::fmt::write"));
    assert!(!stdout(&demangled).contains(mangled));
}

#[test]
fn verbose_traces_each_stage() {
    let scratch = Scratch::new("verbose");
    let image = build_elf(&["main"]);
    let path = scratch.write("a.elf", &image);
    let output = elfscope(&scratch.0, &["-v", "--json", path.to_str().expect("utf-8 path")]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let err = stderr(&output);
    assert!(err.contains(&format!("load: {} bytes in", image.len())), "stderr: {err}");
    assert!(err.contains("program headers: 1 entries in"), "stderr: {err}");
    assert!(err.contains("section table: 5 sections in"), "stderr: {err}");
    assert!(err.contains("symbol table: 2 symbols in"), "stderr: {err}");
    serde_json::from_slice::<serde_json::Value>(&output.stdout).expect("stdout stays JSON");
}
