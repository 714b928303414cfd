//! Compare CPU execution with nestest.log
//!
//! Needs `tests/roms/nestest.nes` and `tests/roms/nestest.log` in this
//! crate. The ROM is not redistributable, so the test skips when the files
//! are missing.

use std::fs;
use std::path::PathBuf;

use nes_core::cpu::StatusFlags;
use nes_core::system::NesSystem;

/// One line of the log: the machine state before the instruction at `pc`
#[derive(Debug, PartialEq, Eq)]
struct LogEntry {
    pc: u16,
    a: u8,
    x: u8,
    y: u8,
    p: u8,
    sp: u8,
    cycles: u64,
}

// C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD PPU:  0, 21 CYC:7
fn parse_log_line(line: &str) -> Option<LogEntry> {
    let pc = u16::from_str_radix(line.get(0..4)?, 16).ok()?;
    let registers = line.get(line.find("A:")?..)?;
    let cycles = registers.get(registers.find("CYC:")? + 4..)?.trim().parse().ok()?;
    Some(LogEntry {
        pc,
        a: parse_hex(registers, "A:")?,
        x: parse_hex(registers, "X:")?,
        y: parse_hex(registers, "Y:")?,
        p: parse_hex(registers, "P:")?,
        sp: parse_hex(registers, "SP:")?,
        cycles,
    })
}

fn parse_hex(s: &str, prefix: &str) -> Option<u8> {
    let start = s.find(prefix)? + prefix.len();
    u8::from_str_radix(s.get(start..start + 2)?, 16).ok()
}

fn rom_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("roms")
}

fn capture(system: &NesSystem) -> LogEntry {
    let cpu = system.cpu();
    let r = cpu.registers();
    LogEntry {
        pc: r.pc,
        a: r.a,
        x: r.x,
        y: r.y,
        // the log shows the pushed form: B clear, bit 5 set
        p: cpu.status().pushed(false),
        sp: r.sp,
        cycles: cpu.elapsed_cycles(),
    }
}

#[test]
fn test_parse_log_line() {
    let line = "C72A  D0 E0     BNE $C70C                       A:01 X:5A Y:0B P:27 SP:FB PPU: 30,105 CYC:3495";
    assert_eq!(
        parse_log_line(line),
        Some(LogEntry {
            pc: 0xC72A,
            a: 0x01,
            x: 0x5A,
            y: 0x0B,
            p: 0x27,
            sp: 0xFB,
            cycles: 3495,
        })
    );
    assert_eq!(parse_log_line(""), None);
}

#[test]
fn test_compare_with_nestest_log() {
    let dir = rom_dir();
    let (rom, log) = match (fs::read(dir.join("nestest.nes")), fs::read_to_string(dir.join("nestest.log"))) {
        (Ok(rom), Ok(log)) => (rom, log),
        _ => {
            eprintln!("skipping: nestest.nes / nestest.log not found in {}", dir.display());
            return;
        }
    };
    let entries: Vec<LogEntry> = log.lines().filter_map(parse_log_line).collect();
    assert!(entries.len() > 5000, "only {} log lines parsed", entries.len());

    let mut system = NesSystem::new().unwrap();
    system.load_rom(&rom).unwrap();
    // automation mode starts at $C000 instead of the reset vector
    system.cpu_mut().registers_mut().pc = 0xC000;
    *system.cpu_mut().status_mut() = StatusFlags::new(StatusFlags::INTERRUPT);

    for (line, expected) in entries.iter().enumerate() {
        let actual = capture(&system);
        assert_eq!(
            &actual,
            expected,
            "nestest.log line {}: P is {}",
            line + 1,
            system.cpu().status()
        );
        system.step();
    }
    // official opcode results
    assert_eq!(system.cpu().peek_ram(0x0002), 0x00);
    // undocumented opcode results
    assert_eq!(system.cpu().peek_ram(0x0003), 0x00);
}
